//! Declarative response values.
//!
//! A handler built with [`Responder`](crate::Responder) never touches the
//! wire. It returns a [`Response`] describing what should be sent: a status,
//! some headers and, optionally, a procedure that writes the body. The
//! responder decides *how* it reaches the client.

use bytes::Bytes;
use http::header::{CONTENT_TYPE, HeaderName};
use http::{HeaderMap, HeaderValue};
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::error::Error;
use crate::handler::BoxFuture;

// ── ContentType ───────────────────────────────────────────────────────────────

/// Common content-type values for use with [`Response::bytes`].
#[derive(Clone, Copy, Debug)]
pub enum ContentType {
    Csv,          // text/csv
    EventStream,  // text/event-stream  (SSE)
    Html,         // text/html; charset=utf-8
    Json,         // application/json
    OctetStream,  // application/octet-stream  (binary / file download)
    Text,         // text/plain; charset=utf-8
    Xml,          // application/xml
}

impl ContentType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Csv         => "text/csv",
            Self::EventStream => "text/event-stream",
            Self::Html        => "text/html; charset=utf-8",
            Self::Json        => "application/json",
            Self::OctetStream => "application/octet-stream",
            Self::Text        => "text/plain; charset=utf-8",
            Self::Xml         => "application/xml",
        }
    }
}

// ── Body procedure ────────────────────────────────────────────────────────────

/// The sink a body procedure writes into: the live connection when
/// streaming, an in-memory buffer when buffering.
pub type BodySink<'a> = &'a mut (dyn AsyncWrite + Send + Unpin + 'a);

/// A one-shot procedure that writes a response body.
pub type WriteBody = Box<dyn for<'a> FnOnce(BodySink<'a>) -> BoxFuture<'a, Result<(), Error>> + Send>;

// ── Response ─────────────────────────────────────────────────────────────────

/// A response, described rather than written.
///
/// # Shortcuts
///
/// ```rust
/// use mantle::{ContentType, Response};
///
/// Response::text(200, "hello");
/// Response::json(201, br#"{"id":42}"#.to_vec());
/// Response::bytes(200, ContentType::Xml, "<ok/>");
/// Response::new(204);
/// ```
///
/// # Streaming a body
///
/// ```rust
/// use mantle::{Error, Response};
/// use tokio::io::AsyncWriteExt;
///
/// Response::new(200).body(|w| Box::pin(async move {
///     for row in ["a", "b", "c"] {
///         w.write_all(row.as_bytes()).await?;
///     }
///     Ok::<_, Error>(())
/// }));
/// ```
///
/// The status is a plain `u16` so that a handler *can* return nonsense;
/// the responder answers an out-of-range status with a logged 500.
pub struct Response {
    pub(crate) status: u16,
    pub(crate) headers: HeaderMap,
    pub(crate) body: Option<WriteBody>,
}

impl Response {
    /// Status only: no headers, no body.
    pub fn new(status: u16) -> Self {
        Self { status, headers: HeaderMap::new(), body: None }
    }

    /// `text/plain; charset=utf-8`.
    pub fn text(status: u16, body: impl Into<String>) -> Self {
        Self::bytes(status, ContentType::Text, body.into())
    }

    /// `application/json`. Pass bytes straight from your serializer.
    pub fn json(status: u16, body: Vec<u8>) -> Self {
        Self::bytes(status, ContentType::Json, body)
    }

    /// Any of the common [`ContentType`]s with a fixed body.
    pub fn bytes(status: u16, content_type: ContentType, body: impl Into<Bytes>) -> Self {
        let body: Bytes = body.into();
        Self::new(status)
            .header(CONTENT_TYPE, HeaderValue::from_static(content_type.as_str()))
            .body(move |w| Box::pin(async move { w.write_all(&body).await.map_err(Error::from) }))
    }

    /// Appends a header value. Existing values under the same name are kept.
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Replaces the whole header map.
    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// Sets the procedure that writes the body.
    pub fn body<F>(mut self, write: F) -> Self
    where
        F: for<'a> FnOnce(BodySink<'a>) -> BoxFuture<'a, Result<(), Error>> + Send + 'static,
    {
        self.body = Some(Box::new(write));
        self
    }

    pub fn status(&self) -> u16 { self.status }
    pub fn header_map(&self) -> &HeaderMap { &self.headers }
    pub fn has_body(&self) -> bool { self.body.is_some() }
}

impl std::fmt::Debug for Response {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Response")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("body", &self.body.as_ref().map(|_| ".."))
            .finish()
    }
}
