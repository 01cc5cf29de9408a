use std::{
    cell::{RefCell, RefMut},
    collections::{BTreeMap, BTreeSet},
    rc::Rc,
};

use bytes::Bytes;
use jiff::{
    Zoned, civil,
    tz::{TimeZone, offset},
};

use crate::{
    config::Endpoint,
    error::SyncError,
    imap::{Creation, ImapError},
    progress::ProgressStore,
    repository::{SequenceSet, Uid, UidValidity},
    sync::{Connector, DestinationMailbox, RemoteMail, SearchCriteria, SourceMailbox},
};

pub fn uid(uid: u32) -> Uid {
    Uid::try_from(uid).expect("test uids are not zero")
}

pub fn uid_validity(uid_validity: u32) -> UidValidity {
    UidValidity::try_from(uid_validity).expect("test uid validities are not zero")
}

/// Received at 10:00 on the given day of January 2024, one hour east of UTC.
pub fn mail(number: u32, day: i8) -> RemoteMail {
    let received_at = civil::date(2024, 1, day)
        .at(10, 0, 0, 0)
        .to_zoned(TimeZone::fixed(offset(1)))
        .expect("test dates are valid");

    RemoteMail::new(
        uid(number),
        Bytes::from(format!("Subject: mail {number}\r\n\r\nbody {number}\r\n")),
        received_at,
    )
}

#[derive(Debug)]
pub struct Appended {
    pub container: String,
    pub mail: RemoteMail,
    /// What the progress store held while this mail was appended.
    pub checkpoint: Option<Uid>,
}

/// Both servers of a pairing, in memory.
#[derive(Debug)]
pub struct FakeServers {
    pub uid_validity: UidValidity,
    pub mails: BTreeMap<Uid, RemoteMail>,
    pub searches: Vec<String>,
    pub date_fetches: Vec<Vec<Uid>>,
    pub fetches: Vec<Vec<Uid>>,
    /// Found by search but gone by the time they are fetched.
    pub expunged: BTreeSet<Uid>,
    pub containers: BTreeSet<String>,
    pub ensured: usize,
    pub selected: Vec<String>,
    pub appended: Vec<Appended>,
    pub logouts: usize,
    pub unreachable: bool,
    pub destination_unreachable: bool,
    /// Answered by the server without its content.
    pub unreadable: Option<Uid>,
    pub failing_append: Option<Uid>,
    store: ProgressStore,
    key: String,
}

#[derive(Debug, Clone)]
pub struct FakeConnector {
    servers: Rc<RefCell<FakeServers>>,
}

impl FakeConnector {
    /// `store` and `key` are used to record the checkpoint seen by each append.
    pub fn new(uid_validity: UidValidity, store: &ProgressStore, key: &str) -> Self {
        Self {
            servers: Rc::new(RefCell::new(FakeServers {
                uid_validity,
                mails: BTreeMap::new(),
                searches: Vec::new(),
                date_fetches: Vec::new(),
                fetches: Vec::new(),
                expunged: BTreeSet::new(),
                containers: BTreeSet::new(),
                ensured: 0,
                selected: Vec::new(),
                appended: Vec::new(),
                logouts: 0,
                unreachable: false,
                destination_unreachable: false,
                unreadable: None,
                failing_append: None,
                store: store.clone(),
                key: key.to_string(),
            })),
        }
    }

    pub fn with_mails(self, mails: impl IntoIterator<Item = RemoteMail>) -> Self {
        self.servers()
            .mails
            .extend(mails.into_iter().map(|mail| (mail.uid(), mail)));
        self
    }

    pub fn servers(&self) -> RefMut<'_, FakeServers> {
        self.servers.borrow_mut()
    }

    pub fn appended_uids(&self) -> Vec<u32> {
        self.servers()
            .appended
            .iter()
            .map(|appended| u32::from(appended.mail.uid()))
            .collect()
    }
}

pub struct FakeSource {
    servers: Rc<RefCell<FakeServers>>,
}

pub struct FakeDestination {
    servers: Rc<RefCell<FakeServers>>,
}

impl Connector for FakeConnector {
    type Source = FakeSource;
    type Destination = FakeDestination;

    async fn open_source(
        &self,
        endpoint: &Endpoint,
        _mailbox: &str,
    ) -> Result<Self::Source, SyncError> {
        if self.servers().unreachable {
            return Err(SyncError::Connection {
                host: endpoint.host().clone(),
                source: ImapError::Closed,
            });
        }
        Ok(FakeSource {
            servers: Rc::clone(&self.servers),
        })
    }

    async fn open_destination(
        &self,
        endpoint: &Endpoint,
    ) -> Result<Self::Destination, SyncError> {
        let servers = self.servers();
        if servers.unreachable || servers.destination_unreachable {
            return Err(SyncError::Connection {
                host: endpoint.host().clone(),
                source: ImapError::Closed,
            });
        }
        Ok(FakeDestination {
            servers: Rc::clone(&self.servers),
        })
    }
}

impl SourceMailbox for FakeSource {
    fn uid_validity(&self) -> UidValidity {
        self.servers.borrow().uid_validity
    }

    /// Answers with every mail, newest first and one of them twice, like a
    /// server that ignores the criteria.
    async fn search(&mut self, criteria: &SearchCriteria) -> Result<Vec<Uid>, SyncError> {
        let mut servers = self.servers.borrow_mut();
        servers.searches.push(criteria.to_string());
        let mut found: Vec<Uid> = servers.mails.keys().rev().copied().collect();
        if let Some(&first) = found.first() {
            found.push(first);
        }
        Ok(found)
    }

    async fn fetch_internal_dates(
        &mut self,
        uids: &SequenceSet,
    ) -> Result<BTreeMap<Uid, Zoned>, SyncError> {
        let mut servers = self.servers.borrow_mut();
        let requested: Vec<Uid> = uids.iter().collect();
        let dates = requested
            .iter()
            .filter_map(|uid| servers.mails.get(uid))
            .map(|mail| (mail.uid(), mail.received_at().clone()))
            .collect();
        servers.date_fetches.push(requested);
        Ok(dates)
    }

    async fn fetch(&mut self, uids: &SequenceSet) -> Result<BTreeMap<Uid, RemoteMail>, SyncError> {
        let mut servers = self.servers.borrow_mut();
        let requested: Vec<Uid> = uids.iter().collect();
        if let Some(uid) = servers.unreadable.filter(|uid| requested.contains(uid)) {
            servers.fetches.push(requested);
            return Err(SyncError::Transfer(ImapError::Protocol(format!(
                "FETCH response lacks RFC822 for uid {uid}"
            ))));
        }
        let mails = requested
            .iter()
            .filter(|uid| !servers.expunged.contains(*uid))
            .filter_map(|uid| servers.mails.get(uid))
            .map(|mail| (mail.uid(), mail.clone()))
            .collect();
        servers.fetches.push(requested);
        Ok(mails)
    }

    async fn logout(&mut self) -> Result<(), SyncError> {
        self.servers.borrow_mut().logouts += 1;
        Ok(())
    }
}

impl DestinationMailbox for FakeDestination {
    async fn ensure_container(&mut self, container: &str) -> Result<Creation, SyncError> {
        let mut servers = self.servers.borrow_mut();
        servers.ensured += 1;
        if servers.containers.insert(container.to_string()) {
            Ok(Creation::Created)
        } else {
            Ok(Creation::AlreadyExisted)
        }
    }

    async fn select_container(&mut self, container: &str) -> Result<(), SyncError> {
        self.servers
            .borrow_mut()
            .selected
            .push(container.to_string());
        Ok(())
    }

    async fn append(&mut self, container: &str, mail: &RemoteMail) -> Result<(), SyncError> {
        let mut servers = self.servers.borrow_mut();
        if servers.failing_append == Some(mail.uid()) {
            return Err(SyncError::Transfer(ImapError::No(
                "quota exceeded".to_string(),
            )));
        }
        let checkpoint = servers.store.load(&servers.key).last_uid();
        servers.appended.push(Appended {
            container: container.to_string(),
            mail: mail.clone(),
            checkpoint,
        });
        Ok(())
    }

    async fn logout(&mut self) -> Result<(), SyncError> {
        self.servers.borrow_mut().logouts += 1;
        Ok(())
    }
}
