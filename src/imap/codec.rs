use std::io;

use bytes::{BufMut, Bytes, BytesMut};
#[cfg(test)]
use imap_proto::RequestId;
use imap_proto::{Request, Response};
use log::trace;
use tokio_util::codec::{Decoder, Encoder};

/// One complete server response, including any literals it carries.
#[derive(Clone)]
pub struct ResponseData {
    raw: Bytes,
}

impl ResponseData {
    pub fn parsed(&self) -> Response<'_> {
        imap_proto::parser::parse_response(&self.raw)
            .map(|(_, response)| response)
            .expect("decoder should only yield complete responses")
    }

    /// Returns `subset` as a view into this response without copying it.
    pub fn share(&self, subset: &[u8]) -> Bytes {
        let start = self.raw.as_ptr() as usize;
        let position = subset.as_ptr() as usize;
        if position >= start && position + subset.len() <= start + self.raw.len() {
            self.raw.slice_ref(subset)
        } else {
            Bytes::copy_from_slice(subset)
        }
    }

    #[cfg(test)]
    pub fn request_id(&self) -> Option<RequestId> {
        if let Response::Done { tag, .. } = self.parsed() {
            Some(tag)
        } else {
            None
        }
    }
}

impl std::fmt::Debug for ResponseData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.parsed())
    }
}

#[derive(Debug, Default)]
pub struct ImapCodec;

impl Decoder for ImapCodec {
    type Item = ResponseData;
    type Error = io::Error;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if buf.is_empty() {
            return Ok(None);
        }
        let consumed = match imap_proto::parser::parse_response(&buf[..]) {
            Ok((rest, _)) => buf.len() - rest.len(),
            Err(nom::Err::Incomplete(_)) => return Ok(None),
            Err(nom::Err::Error(error) | nom::Err::Failure(error)) => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!(
                        "unparsable response ({:?}): {}",
                        error.code,
                        String::from_utf8_lossy(error.input)
                    ),
                ));
            }
        };
        trace!("decoded response of {consumed} bytes");

        Ok(Some(ResponseData {
            raw: buf.split_to(consumed).freeze(),
        }))
    }
}

/// An empty tag sends the line as is, used for literal continuations.
impl<'a, 'b> Encoder<&'a Request<'b>> for ImapCodec {
    type Error = io::Error;

    fn encode(&mut self, request: &'a Request<'b>, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let Request(tag, line) = request;
        dst.reserve(tag.len() + line.len() + 3);
        if !tag.is_empty() {
            dst.put_slice(tag);
            dst.put_u8(b' ');
        }
        dst.put_slice(line);
        dst.put_slice(b"\r\n");

        Ok(())
    }
}
