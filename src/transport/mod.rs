//! HTTP transport seam.
//!
//! The client never talks to an HTTP library directly; it hands a fully built
//! and signed [`TransportRequest`] to a [`Transport`]. [`UreqTransport`] is the
//! default implementation. Tests and callers with special needs (proxies,
//! deadlines, recording) can supply their own through
//! [`ClientBuilder::transport`](crate::ClientBuilder::transport).

use std::{fmt, io::Read};

use bytes::Bytes;
use http::{HeaderMap, Method, StatusCode};
use url::Url;

use crate::error::Result;

#[cfg(feature = "rustls")]
pub(crate) mod tls;
mod ureq_transport;

pub(crate) use ureq_transport::response_error;
pub use ureq_transport::UreqTransport;

/// Request body handed to a [`Transport`].
pub enum RequestBody<'a> {
    /// No body.
    Empty,
    /// Fully buffered body.
    Bytes(Bytes),
    /// Streamed body of a known length. The transport must send it with a
    /// `Content-Length` of `content_length`, never chunked.
    Reader {
        reader: &'a mut dyn Read,
        content_length: u64,
    },
}

impl RequestBody<'_> {
    /// Returns the body length when it is known up front.
    pub fn content_length(&self) -> Option<u64> {
        match self {
            Self::Empty => Some(0),
            Self::Bytes(b) => Some(b.len() as u64),
            Self::Reader { content_length, .. } => Some(*content_length),
        }
    }
}

impl fmt::Debug for RequestBody<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("Empty"),
            Self::Bytes(b) => f.debug_tuple("Bytes").field(&b.len()).finish(),
            Self::Reader { content_length, .. } => f
                .debug_struct("Reader")
                .field("content_length", content_length)
                .finish(),
        }
    }
}

/// A resolved, signed request ready to go on the wire.
#[derive(Debug)]
pub struct TransportRequest<'a> {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: RequestBody<'a>,
}

/// Response returned by a [`Transport`]. Non-success statuses are responses,
/// not errors.
pub struct TransportResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Box<dyn Read + Send>,
}

impl TransportResponse {
    /// Builds a response with an in-memory body.
    pub fn new(status: StatusCode, headers: HeaderMap, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers,
            body: Box::new(std::io::Cursor::new(body.into())),
        }
    }

    /// Reads the whole body as (lossy) UTF-8.
    pub(crate) fn body_string(self) -> Result<String> {
        let mut body = self.body;
        let mut out = Vec::new();
        body.read_to_end(&mut out).map_err(|e| {
            crate::Error::transport("failed to read response body", Some(Box::new(e)))
        })?;
        Ok(String::from_utf8_lossy(&out).into_owned())
    }

    /// Converts a non-success response into an API error.
    pub(crate) fn into_error(self) -> crate::Error {
        let status = self.status;
        let headers = self.headers.clone();
        match self.body_string() {
            Ok(body) => response_error(status, &headers, &body),
            Err(err) => err,
        }
    }
}

impl fmt::Debug for TransportResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("body", &"<reader>")
            .finish()
    }
}

/// Executes HTTP requests on behalf of the client.
///
/// A single transport is shared by every request and upload worker of a
/// client, so implementations must be thread safe. Exactly one `execute` call
/// is made per upload; the transport must not retry a streamed body.
pub trait Transport: Send + Sync {
    fn execute(&self, request: TransportRequest<'_>) -> Result<TransportResponse>;
}
