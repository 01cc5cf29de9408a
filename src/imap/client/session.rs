use bytes::Bytes;
use enumflags2::BitFlags;
use imap_proto::{AttributeValue, MailboxDatum, Response, ResponseCode, Status};
use jiff::Zoned;
use log::{debug, trace};
use tokio::io::{AsyncRead, AsyncWrite};

use crate::{
    imap::{
        ImapError,
        client::quote,
        codec::ResponseData,
        connection::Connection,
        internal_date,
        mailbox::{Creation, Mailbox, MailboxBuilder},
    },
    repository::{Flag, SequenceSet, Uid, UidValidity},
};

/// The attributes of one `FETCH` response.
#[derive(Debug, Default)]
pub struct Fetched {
    pub uid: Option<Uid>,
    pub internal_date: Option<Zoned>,
    pub content: Option<Bytes>,
}

impl Fetched {
    fn from_response(response: &ResponseData) -> Result<Option<Self>, ImapError> {
        let Response::Fetch(_, attributes) = response.parsed() else {
            trace!("ignoring unrelated response {response:?}");
            return Ok(None);
        };
        let mut fetched = Self::default();
        for attribute in &attributes {
            match attribute {
                AttributeValue::Uid(uid) => fetched.uid = Uid::try_from(uid).ok(),
                AttributeValue::InternalDate(date) => {
                    fetched.internal_date = Some(internal_date::parse(date).map_err(|error| {
                        ImapError::Protocol(format!("invalid INTERNALDATE {date}: {error}"))
                    })?);
                }
                AttributeValue::Rfc822(Some(content)) => {
                    fetched.content = Some(response.share(content));
                }
                _ => trace!("ignoring fetch attribute {attribute:?}"),
            }
        }

        Ok(Some(fetched))
    }
}

/// An authenticated connection.
#[derive(Debug)]
pub struct Session<S> {
    connection: Connection<S>,
}

impl<S: AsyncRead + AsyncWrite + Unpin> Session<S> {
    pub(super) fn new(connection: Connection<S>) -> Self {
        Self { connection }
    }

    /// Selects `mailbox` read-only, so fetching never marks mails as seen.
    pub async fn examine(&mut self, mailbox: &str) -> Result<Mailbox, ImapError> {
        self.do_select("EXAMINE", mailbox).await
    }

    pub async fn select(&mut self, mailbox: &str) -> Result<Mailbox, ImapError> {
        self.do_select("SELECT", mailbox).await
    }

    async fn do_select(&mut self, command: &str, mailbox: &str) -> Result<Mailbox, ImapError> {
        let command = format!("{command} {}", quote(mailbox));
        debug!("{command}");
        let exchange = self.connection.send(&command).await?;

        let mut new_mailbox = MailboxBuilder::default();
        new_mailbox.name(mailbox.to_string());
        for response in &exchange.untagged {
            match response.parsed() {
                Response::MailboxData(MailboxDatum::Exists(exists)) => {
                    new_mailbox.exists(exists);
                }
                Response::Data {
                    status: Status::Ok,
                    code: Some(code),
                    ..
                } => match code {
                    ResponseCode::UidValidity(validity) => {
                        new_mailbox.uid_validity(UidValidity::try_from(validity).map_err(
                            |error| ImapError::Protocol(format!("UIDVALIDITY {validity}: {error}")),
                        )?);
                    }
                    ResponseCode::UidNext(next) => {
                        if let Ok(next) = Uid::try_from(next) {
                            new_mailbox.uid_next(next);
                        }
                    }
                    _ => trace!("ignoring response code {code:?} to {command}"),
                },
                other => trace!("ignoring response {other:?} to {command}"),
            }
        }
        if let Response::Done {
            code: Some(ResponseCode::ReadOnly),
            ..
        } = exchange.done.parsed()
        {
            new_mailbox.readonly(true);
        }

        let mailbox = new_mailbox
            .build()
            .map_err(|error| ImapError::Protocol(format!("incomplete {command} response: {error}")))?;
        trace!("selected_mailbox = {mailbox:?}");
        Ok(mailbox)
    }

    pub async fn uid_search(&mut self, criteria: &str) -> Result<Vec<Uid>, ImapError> {
        let command = format!("UID SEARCH {criteria}");
        debug!("{command}");
        let exchange = self.connection.send(&command).await?;

        let mut uids = Vec::new();
        for response in &exchange.untagged {
            if let Response::MailboxData(MailboxDatum::Search(found)) = response.parsed() {
                uids.extend(found.iter().filter_map(|uid| Uid::try_from(uid).ok()));
            }
        }
        trace!("search found {} uids", uids.len());
        Ok(uids)
    }

    /// `items` is the list of fetch attributes without parentheses; `UID` is always included.
    pub async fn uid_fetch(
        &mut self,
        uids: &SequenceSet,
        items: &str,
    ) -> Result<Vec<Fetched>, ImapError> {
        let command = format!("UID FETCH {uids} (UID {items})");
        debug!("{command}");
        let exchange = self.connection.send(&command).await?;

        let mut fetched = Vec::with_capacity(exchange.untagged.len());
        for response in &exchange.untagged {
            if let Some(attributes) = Fetched::from_response(response)? {
                fetched.push(attributes);
            }
        }
        Ok(fetched)
    }

    pub async fn contains_mailbox(&mut self, mailbox: &str) -> Result<bool, ImapError> {
        let command = format!("LIST \"\" {}", quote(mailbox));
        debug!("{command}");
        let exchange = self.connection.send(&command).await?;

        Ok(exchange.untagged.iter().any(|response| {
            matches!(
                response.parsed(),
                Response::MailboxData(MailboxDatum::List { name, .. }) if name == mailbox
            )
        }))
    }

    /// Creates `mailbox` unless it is already there. A failing `CREATE` only
    /// counts as "already exists" if the mailbox shows up afterwards.
    pub async fn ensure_mailbox(&mut self, mailbox: &str) -> Result<Creation, ImapError> {
        if self.contains_mailbox(mailbox).await? {
            return Ok(Creation::AlreadyExisted);
        }
        let command = format!("CREATE {}", quote(mailbox));
        debug!("{command}");
        match self.connection.send(&command).await {
            Ok(_) => Ok(Creation::Created),
            Err(ImapError::No(information)) => {
                if self.contains_mailbox(mailbox).await? {
                    debug!("{mailbox} appeared concurrently: {information}");
                    Ok(Creation::AlreadyExisted)
                } else {
                    Err(ImapError::No(information))
                }
            }
            Err(error) => Err(error),
        }
    }

    pub async fn append(
        &mut self,
        mailbox: &str,
        content: &[u8],
        internal_date: &Zoned,
        flags: BitFlags<Flag>,
    ) -> Result<(), ImapError> {
        let command = format!(
            "APPEND {} {} \"{}\"",
            quote(mailbox),
            Flag::format_list(flags),
            internal_date::format(internal_date)
        );
        trace!("{command} <{} bytes>", content.len());
        self.connection.send_literal(&command, content).await?;

        Ok(())
    }

    pub async fn logout(&mut self) -> Result<(), ImapError> {
        debug!("LOGOUT");
        self.connection.send("LOGOUT").await?;

        Ok(())
    }
}
