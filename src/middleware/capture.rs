//! Captures the status a handler commits, for the access log.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use http::{HeaderMap, StatusCode};
use tokio::io::AsyncWrite;

use crate::writer::ResponseWriter;

pub(crate) struct Capture<'w> {
    inner: &'w mut dyn ResponseWriter,
    status: Option<StatusCode>,
}

impl<'w> Capture<'w> {
    pub(crate) fn new(inner: &'w mut dyn ResponseWriter) -> Self {
        Self { inner, status: None }
    }

    /// The first status committed, or `200 OK` if the handler never set one.
    pub(crate) fn status(&self) -> StatusCode {
        self.status.unwrap_or(StatusCode::OK)
    }
}

impl ResponseWriter for Capture<'_> {
    fn headers_mut(&mut self) -> &mut HeaderMap {
        self.inner.headers_mut()
    }

    fn write_status(&mut self, status: StatusCode) {
        self.status.get_or_insert(status);
        self.inner.write_status(status);
    }
}

impl AsyncWrite for Capture<'_> {
    fn poll_write(self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        this.status.get_or_insert(StatusCode::OK);
        Pin::new(&mut *this.inner).poll_write(cx, buf)
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut *self.get_mut().inner).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut *self.get_mut().inner).poll_shutdown(cx)
    }
}
