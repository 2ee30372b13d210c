//! Shared helpers for the integration tests.

#![allow(dead_code)]

use std::io;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use bytes::Bytes;
use http::{HeaderMap, StatusCode};
use mantle::{Logger, Recorder, Request, ResponseWriter};
use tokio::io::AsyncWrite;
use tracing_subscriber::fmt::MakeWriter;

/// An in-memory log sink that can be read back after the fact.
#[derive(Clone, Default)]
pub struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }

    /// Non-empty lines written so far, one per event.
    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().filter(|l| !l.is_empty()).map(str::to_owned).collect()
    }

    /// A plain-text fmt subscriber writing into this buffer.
    pub fn subscriber(&self) -> impl tracing::Subscriber + Send + Sync + 'static {
        tracing_subscriber::fmt()
            .with_writer(self.clone())
            .with_ansi(false)
            .finish()
    }

    pub fn logger(&self) -> Logger {
        Logger::new(self.subscriber())
    }
}

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogBuffer {
    type Writer = LogBuffer;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// A writer whose body writes always fail; headers and status still land in
/// the inner recorder.
#[derive(Default)]
pub struct FailingWriter(pub Recorder);

impl ResponseWriter for FailingWriter {
    fn headers_mut(&mut self) -> &mut HeaderMap {
        self.0.headers_mut()
    }

    fn write_status(&mut self, status: StatusCode) {
        self.0.write_status(status);
    }
}

impl AsyncWrite for FailingWriter {
    fn poll_write(self: Pin<&mut Self>, _cx: &mut Context<'_>, _buf: &[u8]) -> Poll<io::Result<usize>> {
        Poll::Ready(Err(io::Error::other("write failure")))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

pub fn get(uri: &str) -> Request {
    Request::from(http::Request::get(uri).body(Bytes::new()).unwrap())
}
