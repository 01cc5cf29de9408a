use std::borrow::Cow;

use futures::{SinkExt, StreamExt};
use imap_proto::{Request, Response, Status};
use log::trace;
use tokio::{
    io::{AsyncRead, AsyncWrite},
    net::TcpStream,
};
use tokio_native_tls::{TlsConnector, TlsStream, native_tls};
use tokio_util::codec::Framed;

use crate::imap::{
    ImapError,
    codec::{ImapCodec, ResponseData},
    tag_generator::TagGenerator,
};

pub type TlsConnection = Connection<TlsStream<TcpStream>>;

/// Untagged responses of one command together with its tagged completion.
#[derive(Debug)]
pub struct Exchange {
    pub untagged: Vec<ResponseData>,
    pub done: ResponseData,
}

enum Frame {
    Continue,
    Done { tag: String, outcome: Result<(), ImapError> },
    Untagged,
}

impl Frame {
    fn of(response: &ResponseData) -> Self {
        match response.parsed() {
            Response::Continue { .. } => Self::Continue,
            Response::Done {
                tag,
                status,
                information,
                ..
            } => {
                let information = information.map(Cow::into_owned).unwrap_or_default();
                let outcome = match status {
                    Status::Ok => Ok(()),
                    Status::No => Err(ImapError::No(information)),
                    Status::Bad => Err(ImapError::Bad(information)),
                    Status::PreAuth | Status::Bye => Err(ImapError::Protocol(format!(
                        "tagged {status:?} response is not allowed by RFC 3501"
                    ))),
                };
                Self::Done {
                    tag: tag.0,
                    outcome,
                }
            }
            _ => Self::Untagged,
        }
    }
}

#[derive(Debug)]
pub struct Connection<S> {
    stream: Framed<S, ImapCodec>,
    tag_generator: TagGenerator,
}

impl TlsConnection {
    pub async fn connect_to(host: &str, port: u16) -> Result<(Self, ResponseData), ImapError> {
        trace!("connecting to {host}:{port}");
        let tls = TlsConnector::from(native_tls::TlsConnector::new()?);
        let stream = TcpStream::connect((host, port)).await?;
        let stream = tls.connect(host, stream).await?;

        Self::start(stream).await
    }
}

impl<S: AsyncRead + AsyncWrite + Unpin> Connection<S> {
    /// Wraps an established stream and waits for the server greeting.
    pub async fn start(stream: S) -> Result<(Self, ResponseData), ImapError> {
        let mut connection = Self {
            stream: Framed::new(stream, ImapCodec),
            tag_generator: TagGenerator::default(),
        };
        let greeting = connection.receive().await?;
        trace!("greeting {greeting:?}");

        Ok((connection, greeting))
    }

    pub async fn send(&mut self, command: &str) -> Result<Exchange, ImapError> {
        let tag = self.tag_generator.next();
        self.write(&tag, command.as_bytes()).await?;
        self.finish(&tag, Vec::new()).await
    }

    /// Sends `command` followed by `literal` as a synchronizing literal.
    pub async fn send_literal(
        &mut self,
        command: &str,
        literal: &[u8],
    ) -> Result<Exchange, ImapError> {
        let tag = self.tag_generator.next();
        let line = format!("{command} {{{}}}", literal.len());
        self.write(&tag, line.as_bytes()).await?;

        let mut untagged = Vec::new();
        loop {
            let response = self.receive().await?;
            match Frame::of(&response) {
                Frame::Continue => break,
                Frame::Done { outcome, .. } => {
                    outcome?;
                    return Err(ImapError::Protocol(
                        "command completed before literal was sent".to_string(),
                    ));
                }
                Frame::Untagged => untagged.push(response),
            }
        }
        trace!("{tag}: sending literal of {} bytes", literal.len());
        self.write("", literal).await?;

        self.finish(&tag, untagged).await
    }

    async fn write(&mut self, tag: &str, line: &[u8]) -> Result<(), ImapError> {
        let request = Request(Cow::Borrowed(tag.as_bytes()), Cow::Borrowed(line));
        self.stream.send(&request).await?;

        Ok(())
    }

    async fn receive(&mut self) -> Result<ResponseData, ImapError> {
        self.stream.next().await.ok_or(ImapError::Closed)?.map_err(ImapError::from)
    }

    async fn finish(
        &mut self,
        tag: &str,
        mut untagged: Vec<ResponseData>,
    ) -> Result<Exchange, ImapError> {
        loop {
            let response = self.receive().await?;
            match Frame::of(&response) {
                Frame::Done {
                    tag: done_tag,
                    outcome,
                } => {
                    if done_tag != tag {
                        return Err(ImapError::Protocol(format!(
                            "response tag {done_tag} did not match request tag {tag}"
                        )));
                    }
                    trace!("{tag}: done {outcome:?}");
                    outcome?;
                    return Ok(Exchange {
                        untagged,
                        done: response,
                    });
                }
                Frame::Continue => {
                    return Err(ImapError::Protocol(
                        "unexpected continuation request".to_string(),
                    ));
                }
                Frame::Untagged => untagged.push(response),
            }
        }
    }
}
