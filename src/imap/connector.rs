use std::collections::BTreeMap;

use enumflags2::BitFlags;
use jiff::Zoned;
use log::{info, trace, warn};
use tokio::{
    io::{AsyncRead, AsyncWrite},
    net::TcpStream,
};
use tokio_native_tls::TlsStream;

use crate::{
    config::Endpoint,
    error::SyncError,
    imap::{Client, Creation, ImapError, Session, client::Fetched},
    repository::{SequenceSet, Uid, UidValidity},
    sync::{Connector, DestinationMailbox, RemoteMail, SearchCriteria, SourceMailbox},
};

/// Opens TLS sessions to real servers.
#[derive(Debug, Default)]
pub struct ImapConnector;

impl Connector for ImapConnector {
    type Source = ImapSource<TlsStream<TcpStream>>;
    type Destination = ImapDestination<TlsStream<TcpStream>>;

    async fn open_source(
        &self,
        endpoint: &Endpoint,
        mailbox: &str,
    ) -> Result<Self::Source, SyncError> {
        let password = endpoint.auth().password()?;
        let client = connect(endpoint).await?;
        let session = login(client, endpoint, &password).await?;

        ImapSource::examine(session, mailbox).await
    }

    async fn open_destination(
        &self,
        endpoint: &Endpoint,
    ) -> Result<Self::Destination, SyncError> {
        let password = endpoint.auth().password()?;
        let client = connect(endpoint).await?;
        let session = login(client, endpoint, &password).await?;

        Ok(ImapDestination { session })
    }
}

async fn connect(endpoint: &Endpoint) -> Result<Client<TlsStream<TcpStream>>, SyncError> {
    Client::connect(endpoint.host(), endpoint.port())
        .await
        .map_err(|source| SyncError::Connection {
            host: endpoint.host().clone(),
            source,
        })
}

async fn login<S: AsyncRead + AsyncWrite + Unpin>(
    client: Client<S>,
    endpoint: &Endpoint,
    password: &str,
) -> Result<Session<S>, SyncError> {
    let user = endpoint.auth().user();
    client
        .login(user, password)
        .await
        .map_err(|source| match source {
            ImapError::No(_) | ImapError::Bad(_) => SyncError::Authentication {
                host: endpoint.host().clone(),
                user: user.to_string(),
                source,
            },
            source => SyncError::Connection {
                host: endpoint.host().clone(),
                source,
            },
        })
}

/// A source mailbox selected with `EXAMINE`.
#[derive(Debug)]
pub struct ImapSource<S> {
    session: Session<S>,
    mailbox: String,
    uid_validity: UidValidity,
}

impl<S: AsyncRead + AsyncWrite + Unpin> ImapSource<S> {
    async fn examine(mut session: Session<S>, mailbox: &str) -> Result<Self, SyncError> {
        let selected = session
            .examine(mailbox)
            .await
            .map_err(|source| SyncError::Mailbox {
                mailbox: mailbox.to_string(),
                source,
            })?;
        info!(
            "{} holds {} mails, uid validity {}, next uid {}",
            selected.name(),
            selected.exists(),
            selected.uid_validity(),
            selected
                .uid_next()
                .map_or_else(|| "unknown".to_string(), |uid| uid.to_string())
        );
        if !selected.readonly() {
            warn!("{mailbox} was not opened read-only");
        }

        Ok(Self {
            session,
            mailbox: mailbox.to_string(),
            uid_validity: selected.uid_validity(),
        })
    }
}

impl<S: AsyncRead + AsyncWrite + Unpin> SourceMailbox for ImapSource<S> {
    fn uid_validity(&self) -> UidValidity {
        self.uid_validity
    }

    async fn search(&mut self, criteria: &SearchCriteria) -> Result<Vec<Uid>, SyncError> {
        self.session
            .uid_search(&criteria.to_string())
            .await
            .map_err(|source| SyncError::Mailbox {
                mailbox: self.mailbox.clone(),
                source,
            })
    }

    async fn fetch_internal_dates(
        &mut self,
        uids: &SequenceSet,
    ) -> Result<BTreeMap<Uid, Zoned>, SyncError> {
        let fetched = self
            .session
            .uid_fetch(uids, "INTERNALDATE")
            .await
            .map_err(SyncError::Transfer)?;

        let mut dates = BTreeMap::new();
        for fetched in fetched {
            let Some(uid) = requested_uid(&fetched, uids)? else {
                continue;
            };
            let received_at = fetched
                .internal_date
                .ok_or_else(|| incomplete(format!("INTERNALDATE for uid {uid}")))?;
            dates.insert(uid, received_at);
        }
        Ok(dates)
    }

    async fn fetch(&mut self, uids: &SequenceSet) -> Result<BTreeMap<Uid, RemoteMail>, SyncError> {
        let fetched = self
            .session
            .uid_fetch(uids, "RFC822 INTERNALDATE")
            .await
            .map_err(SyncError::Transfer)?;

        let mut mails = BTreeMap::new();
        for fetched in fetched {
            let Some(uid) = requested_uid(&fetched, uids)? else {
                continue;
            };
            let content = fetched
                .content
                .ok_or_else(|| incomplete(format!("RFC822 for uid {uid}")))?;
            let received_at = fetched
                .internal_date
                .ok_or_else(|| incomplete(format!("INTERNALDATE for uid {uid}")))?;
            mails.insert(uid, RemoteMail::new(uid, content, received_at));
        }
        Ok(mails)
    }

    async fn logout(&mut self) -> Result<(), SyncError> {
        self.session.logout().await.map_err(SyncError::Transfer)
    }
}

/// The uid of a `FETCH` response to `UID FETCH uids`. Responses for other
/// uids are unsolicited updates and skipped.
fn requested_uid(fetched: &Fetched, uids: &SequenceSet) -> Result<Option<Uid>, SyncError> {
    let uid = fetched
        .uid
        .ok_or_else(|| incomplete("UID".to_string()))?;
    if uids.contains(uid) {
        Ok(Some(uid))
    } else {
        trace!("ignoring unsolicited fetch response for uid {uid}");
        Ok(None)
    }
}

/// A mail that exists but could not be read must not be skipped, or its uid
/// would be checkpointed without it ever being mirrored.
fn incomplete(missing: String) -> SyncError {
    SyncError::Transfer(ImapError::Protocol(format!(
        "FETCH response lacks {missing}"
    )))
}

#[derive(Debug)]
pub struct ImapDestination<S> {
    session: Session<S>,
}

impl<S: AsyncRead + AsyncWrite + Unpin> DestinationMailbox for ImapDestination<S> {
    async fn ensure_container(&mut self, container: &str) -> Result<Creation, SyncError> {
        self.session
            .ensure_mailbox(container)
            .await
            .map_err(|source| SyncError::Mailbox {
                mailbox: container.to_string(),
                source,
            })
    }

    async fn select_container(&mut self, container: &str) -> Result<(), SyncError> {
        self.session
            .select(container)
            .await
            .map_err(|source| SyncError::Mailbox {
                mailbox: container.to_string(),
                source,
            })?;

        Ok(())
    }

    async fn append(&mut self, container: &str, mail: &RemoteMail) -> Result<(), SyncError> {
        self.session
            .append(container, mail.content(), mail.received_at(), BitFlags::empty())
            .await
            .map_err(SyncError::Transfer)
    }

    async fn logout(&mut self) -> Result<(), SyncError> {
        self.session.logout().await.map_err(SyncError::Transfer)
    }
}

#[cfg(test)]
mod tests {
    use assertables::*;
    use bytes::Bytes;
    use rstest::*;
    use tokio::io::DuplexStream;

    use super::*;
    use crate::{
        config::testing::pairing,
        imap::connection::{
            Connection,
            testing::{ScriptedServer, Step, step},
        },
    };

    async fn client(script: Vec<Step>) -> Client<DuplexStream> {
        let (stream, _server) = ScriptedServer::start("* OK ready\r\n", script);
        let (connection, greeting) = assert_ok!(Connection::start(stream).await);
        assert_ok!(Client::new(connection, &greeting))
    }

    fn uid(uid: u32) -> Uid {
        assert_ok!(Uid::try_from(uid))
    }

    #[rstest]
    #[tokio::test]
    async fn test_rejected_login_is_an_authentication_error() {
        let pairing = pairing(100, None);
        let client = client(vec![step(
            r#"0000 LOGIN "source" "wrong""#,
            "0000 NO LOGIN failed\r\n",
        )])
        .await;

        let error = assert_err!(login(client, pairing.source(), "wrong").await);

        assert_matches!(
            error,
            SyncError::Authentication { host, user, .. }
                if host == "source.example.org" && user == "source"
        );
    }

    #[rstest]
    #[tokio::test]
    async fn test_missing_source_mailbox_is_a_mailbox_error() {
        let pairing = pairing(100, None);
        let client = client(vec![
            step(r#"0000 LOGIN "source" "secret""#, "0000 OK logged in\r\n"),
            step(r#"0001 EXAMINE "Gone""#, "0001 NO Mailbox doesn't exist\r\n"),
        ])
        .await;
        let session = assert_ok!(login(client, pairing.source(), "secret").await);

        assert_matches!(
            ImapSource::examine(session, "Gone").await,
            Err(SyncError::Mailbox { mailbox, .. }) if mailbox == "Gone"
        );
    }

    async fn examined_source(fetch: &'static str, reply: &'static str) -> ImapSource<DuplexStream> {
        let pairing = pairing(100, None);
        let client = client(vec![
            step(r#"0000 LOGIN "source" "secret""#, "0000 OK logged in\r\n"),
            step(
                r#"0001 EXAMINE "INBOX""#,
                "* 2 EXISTS\r\n* OK [UIDVALIDITY 42] ok\r\n0001 OK [READ-ONLY] done\r\n",
            ),
            step(fetch, reply),
        ])
        .await;
        let session = assert_ok!(login(client, pairing.source(), "secret").await);
        assert_ok!(ImapSource::examine(session, "INBOX").await)
    }

    fn uids_10_to_12() -> SequenceSet {
        assert_ok!(SequenceSet::try_from([uid(10), uid(11), uid(12)].as_slice()))
    }

    #[rstest]
    #[tokio::test]
    async fn test_source_fetch_leaves_out_expunged_and_unsolicited_mails() {
        let mut source = examined_source(
            "0002 UID FETCH 10:12 (UID RFC822 INTERNALDATE)",
            "* 1 FETCH (UID 10 INTERNALDATE \"04-Jan-2024 10:00:00 +0100\" RFC822 {4}\r\nmail)\r\n\
             * 5 FETCH (UID 30 FLAGS (\\Seen))\r\n\
             * 2 FETCH (UID 12 RFC822 {5}\r\nmail2 INTERNALDATE \"05-Jan-2024 10:00:00 +0100\")\r\n\
             0002 OK done\r\n",
        )
        .await;

        let mails = assert_ok!(source.fetch(&uids_10_to_12()).await);

        assert_eq!(
            assert_ok!(UidValidity::try_from(42u32)),
            source.uid_validity()
        );
        assert_eq!(
            vec![uid(10), uid(12)],
            mails.keys().copied().collect::<Vec<_>>()
        );
        let mail = assert_some!(mails.get(&uid(10)));
        assert_eq!(&Bytes::from_static(b"mail"), mail.content());
        assert_eq!(2024, mail.received_at().year());
    }

    #[rstest]
    #[case::nil_content(
        "* 1 FETCH (UID 10 INTERNALDATE \"04-Jan-2024 10:00:00 +0100\" RFC822 NIL)\r\n\
         * 2 FETCH (UID 11 INTERNALDATE \"05-Jan-2024 10:00:00 +0100\" RFC822 {4}\r\nmail)\r\n\
         0002 OK done\r\n"
    )]
    #[case::missing_internal_date(
        "* 1 FETCH (UID 10 RFC822 {4}\r\nmail)\r\n\
         * 2 FETCH (UID 11 INTERNALDATE \"05-Jan-2024 10:00:00 +0100\" RFC822 {4}\r\nmail)\r\n\
         0002 OK done\r\n"
    )]
    #[case::missing_uid(
        "* 1 FETCH (INTERNALDATE \"04-Jan-2024 10:00:00 +0100\" RFC822 {4}\r\nmail)\r\n\
         * 2 FETCH (UID 11 INTERNALDATE \"05-Jan-2024 10:00:00 +0100\" RFC822 {4}\r\nmail)\r\n\
         0002 OK done\r\n"
    )]
    #[tokio::test]
    async fn test_source_fetch_refuses_to_skip_unreadable_mail(#[case] reply: &'static str) {
        let mut source =
            examined_source("0002 UID FETCH 10:12 (UID RFC822 INTERNALDATE)", reply).await;

        assert_matches!(
            source.fetch(&uids_10_to_12()).await,
            Err(SyncError::Transfer(ImapError::Protocol(_)))
        );
    }

    #[rstest]
    #[tokio::test]
    async fn test_internal_dates_without_date_are_an_error() {
        let mut source = examined_source(
            "0002 UID FETCH 10:12 (UID INTERNALDATE)",
            "* 1 FETCH (UID 10 INTERNALDATE \"04-Jan-2024 10:00:00 +0100\")\r\n\
             * 2 FETCH (UID 11)\r\n\
             0002 OK done\r\n",
        )
        .await;

        assert_matches!(
            source.fetch_internal_dates(&uids_10_to_12()).await,
            Err(SyncError::Transfer(ImapError::Protocol(_)))
        );
    }

    #[rstest]
    #[tokio::test]
    async fn test_internal_dates_keep_their_offset() {
        let mut source = examined_source(
            "0002 UID FETCH 10:12 (UID INTERNALDATE)",
            "* 1 FETCH (UID 10 INTERNALDATE \"01-Mar-2024 23:30:00 -0500\")\r\n\
             0002 OK done\r\n",
        )
        .await;

        let dates = assert_ok!(source.fetch_internal_dates(&uids_10_to_12()).await);

        assert_eq!(1, dates.len());
        let received_at = assert_some!(dates.get(&uid(10)));
        assert_eq!(jiff::civil::date(2024, 3, 1), received_at.date());
    }

    #[rstest]
    #[tokio::test]
    async fn test_failed_append_is_a_transfer_error() {
        let pairing = pairing(100, None);
        let client = client(vec![
            step(r#"0000 LOGIN "destination" "secret""#, "0000 OK logged in\r\n"),
            step(
                r#"0001 APPEND "Imported/FromServerA" () "04-Jan-2024 10:00:00 +0100" {4}"#,
                "0001 NO Quota exceeded\r\n",
            ),
        ])
        .await;
        let session = assert_ok!(login(client, pairing.destination(), "secret").await);
        let mut destination = ImapDestination { session };
        let received_at = assert_ok!("2024-01-04T10:00:00+01:00[+01:00]".parse::<Zoned>());
        let mail = RemoteMail::new(uid(10), Bytes::from_static(b"mail"), received_at);

        assert_matches!(
            destination.append(pairing.container(), &mail).await,
            Err(SyncError::Transfer(ImapError::No(_)))
        );
    }
}
