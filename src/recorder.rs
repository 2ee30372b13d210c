//! In-memory [`ResponseWriter`] for tests.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use http::{HeaderMap, StatusCode};
use tokio::io::AsyncWrite;
use tracing::warn;

use crate::writer::ResponseWriter;

/// Records everything a handler writes.
///
/// ```rust
/// use mantle::{Handler, Recorder, Request, Responder, Response};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let handler = Responder::new().handler(|_req| Response::text(200, "hello"));
///
/// let mut rec = Recorder::new();
/// let req = Request::from(http::Request::new(bytes::Bytes::new()));
/// handler.serve(&mut rec, &req).await;
///
/// assert_eq!(rec.status(), 200);
/// assert_eq!(rec.body_string(), "hello");
/// # }
/// ```
#[derive(Debug, Default)]
pub struct Recorder {
    headers: HeaderMap,
    status: Option<StatusCode>,
    body: Vec<u8>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// The committed status, or `200 OK` if nothing was committed.
    pub fn status(&self) -> StatusCode {
        self.status.unwrap_or(StatusCode::OK)
    }

    pub fn is_committed(&self) -> bool {
        self.status.is_some()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn body_string(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

impl ResponseWriter for Recorder {
    fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    fn write_status(&mut self, status: StatusCode) {
        match self.status {
            Some(committed) => warn!(
                committed = committed.as_u16(),
                ignored = status.as_u16(),
                "superfluous write_status call"
            ),
            None => self.status = Some(status),
        }
    }
}

impl AsyncWrite for Recorder {
    fn poll_write(self: Pin<&mut Self>, _cx: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        if this.status.is_none() {
            this.status = Some(StatusCode::OK);
        }
        this.body.extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}
