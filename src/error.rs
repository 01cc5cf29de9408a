use thiserror::Error;

use crate::{config::ConfigError, imap::ImapError, progress::ProgressStoreError};

/// Why a pass was aborted. Every kind except `Transfer` and `ProgressStore`
/// happens before any progress is written.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("could not reach {host}: {source}")]
    Connection { host: String, source: ImapError },
    #[error("{host} rejected the credentials of {user}: {source}")]
    Authentication {
        host: String,
        user: String,
        source: ImapError,
    },
    #[error("invalid configuration: {0}")]
    Configuration(#[from] ConfigError),
    #[error("mailbox {mailbox} is unusable: {source}")]
    Mailbox { mailbox: String, source: ImapError },
    #[error("transferring mails failed: {0}")]
    Transfer(ImapError),
    #[error("recording progress failed: {0}")]
    ProgressStore(#[from] ProgressStoreError),
}
