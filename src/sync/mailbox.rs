use std::collections::BTreeMap;

use bytes::Bytes;
use jiff::Zoned;

use crate::{
    config::Endpoint,
    error::SyncError,
    imap::Creation,
    repository::{SequenceSet, Uid, UidValidity},
    sync::SearchCriteria,
};

/// A source mail, kept only until its chunk has been checkpointed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteMail {
    uid: Uid,
    content: Bytes,
    received_at: Zoned,
}

impl RemoteMail {
    pub fn new(uid: Uid, content: Bytes, received_at: Zoned) -> Self {
        Self {
            uid,
            content,
            received_at,
        }
    }

    pub fn uid(&self) -> Uid {
        self.uid
    }

    /// The raw message, never parsed or rewritten.
    pub fn content(&self) -> &Bytes {
        &self.content
    }

    pub fn received_at(&self) -> &Zoned {
        &self.received_at
    }
}

/// A mailbox opened read-only for mirroring from.
pub trait SourceMailbox {
    fn uid_validity(&self) -> UidValidity;

    async fn search(&mut self, criteria: &SearchCriteria) -> Result<Vec<Uid>, SyncError>;

    async fn fetch_internal_dates(
        &mut self,
        uids: &SequenceSet,
    ) -> Result<BTreeMap<Uid, Zoned>, SyncError>;

    /// Mails that vanished since they were searched are missing from the result.
    async fn fetch(&mut self, uids: &SequenceSet) -> Result<BTreeMap<Uid, RemoteMail>, SyncError>;

    async fn logout(&mut self) -> Result<(), SyncError>;
}

/// The server mails are mirrored to.
pub trait DestinationMailbox {
    /// Must succeed with [`Creation::AlreadyExisted`] if `container` is present.
    async fn ensure_container(&mut self, container: &str) -> Result<Creation, SyncError>;

    async fn select_container(&mut self, container: &str) -> Result<(), SyncError>;

    /// Appends unread, keeping the received timestamp of `mail`.
    async fn append(&mut self, container: &str, mail: &RemoteMail) -> Result<(), SyncError>;

    async fn logout(&mut self) -> Result<(), SyncError>;
}

/// Opens connected and authenticated mailboxes.
pub trait Connector {
    type Source: SourceMailbox;
    type Destination: DestinationMailbox;

    async fn open_source(
        &self,
        endpoint: &Endpoint,
        mailbox: &str,
    ) -> Result<Self::Source, SyncError>;

    async fn open_destination(&self, endpoint: &Endpoint)
    -> Result<Self::Destination, SyncError>;
}
