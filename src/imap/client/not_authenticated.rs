use imap_proto::{Response, Status};
use log::{debug, trace};
use tokio::{
    io::{AsyncRead, AsyncWrite},
    net::TcpStream,
};
use tokio_native_tls::TlsStream;

use crate::imap::{
    ImapError,
    client::{Session, quote},
    codec::ResponseData,
    connection::{Connection, TlsConnection},
};

#[derive(Debug)]
pub struct Client<S> {
    connection: Connection<S>,
}

impl Client<TlsStream<TcpStream>> {
    pub async fn connect(host: &str, port: u16) -> Result<Self, ImapError> {
        debug!("connecting to {host}:{port}");
        let (connection, greeting) = TlsConnection::connect_to(host, port).await?;
        Self::new(connection, &greeting)
    }
}

impl<S: AsyncRead + AsyncWrite + Unpin> Client<S> {
    pub fn new(connection: Connection<S>, greeting: &ResponseData) -> Result<Self, ImapError> {
        match greeting.parsed() {
            Response::Data {
                status: Status::Ok | Status::PreAuth,
                information,
                ..
            } => {
                trace!("greeting: {information:?}");
                Ok(Self { connection })
            }
            Response::Data {
                status: Status::Bye,
                information,
                ..
            } => Err(ImapError::No(
                information.map(|information| information.to_string()).unwrap_or_default(),
            )),
            other => Err(ImapError::Protocol(format!(
                "greeting should only ever be ok, preauth or bye, got {other:?}"
            ))),
        }
    }

    pub async fn login(mut self, username: &str, password: &str) -> Result<Session<S>, ImapError> {
        debug!("LOGIN <user> <password>");
        self.connection
            .send(&format!("LOGIN {} {}", quote(username), quote(password)))
            .await?;

        Ok(Session::new(self.connection))
    }
}
