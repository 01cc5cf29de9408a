use std::io;

use thiserror::Error;
use tokio_native_tls::native_tls;

#[derive(Debug, Error)]
pub enum ImapError {
    #[error("IO issue talking to server: {0}")]
    Io(#[from] io::Error),
    #[error("TLS issue talking to server: {0}")]
    Tls(#[from] native_tls::Error),
    #[error("server closed the connection")]
    Closed,
    #[error("server refused: {0}")]
    No(String),
    #[error("server rejected command as malformed: {0}")]
    Bad(String),
    #[error("unexpected server response: {0}")]
    Protocol(String),
}
