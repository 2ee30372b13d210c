//! hyper integration.
//!
//! mantle does not accept connections. [`respond`] runs one handler for one
//! hyper request and has the signature `hyper::service::service_fn` expects,
//! so plugging it into a connection loop is a closure away:
//!
//! ```rust,ignore
//! let svc = service_fn(move |req| respond(Arc::clone(&handler), req, Some(peer)));
//! ConnBuilder::new(TokioExecutor::new()).serve_connection(io, svc).await
//! ```
//!
//! # How the body streams
//!
//! hyper wants a complete `Response` head before it sends anything, while a
//! [`ResponseWriter`] commits its status whenever the handler decides to. The
//! handler therefore runs on its own task and talks to hyper through two
//! channels:
//!
//! ```text
//! handler task                          hyper
//! write_status ── oneshot(head) ──────▶ respond() returns Response<Body>
//! poll_write   ── mpsc(Bytes) ────────▶ body frames
//! task ends    ── senders dropped ────▶ end of body
//! ```
//!
//! A handler panic before the status commit drops the head sender and the
//! client gets a plain 500. A panic after it ends the body with an error
//! frame, so hyper aborts the response instead of terminating it cleanly
//! and the client can tell the body is incomplete.

use std::convert::Infallible;
use std::fmt;
use std::io;
use std::mem;
use std::net::SocketAddr;
use std::pin::Pin;
use std::task::{Context, Poll, ready};

use bytes::Bytes;
use futures::channel::{mpsc, oneshot};
use futures::{StreamExt, future, stream};
use http::header::CONTENT_TYPE;
use http::{HeaderMap, HeaderValue, StatusCode};
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, Full, StreamBody};
use hyper::body::{Body, Frame};
use tokio::io::AsyncWrite;
use tracing::{error, warn};

use crate::error::Error;
use crate::handler::BoxedHandler;
use crate::request::Request;
use crate::writer::ResponseWriter;

/// The response body type produced by [`respond`].
///
/// The body fails with an [`Error`] when the handler dies after the status
/// was sent.
pub type ResponseBody = UnsyncBoxBody<Bytes, Error>;

/// Body chunks buffered between the handler task and hyper.
const CHANNEL_CAPACITY: usize = 16;

/// Runs `handler` for a single hyper request.
///
/// The request body is read fully before the handler starts. The error type
/// is [`Infallible`]: failures before the status commit are answered with an
/// HTTP status, later ones surface as an error in the body stream.
pub async fn respond<B>(
    handler: BoxedHandler,
    req: hyper::Request<B>,
    remote_addr: Option<SocketAddr>,
) -> Result<http::Response<ResponseBody>, Infallible>
where
    B: Body<Data = Bytes> + Send + 'static,
    B::Error: fmt::Display,
{
    let (parts, body) = req.into_parts();
    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            warn!(error = %e, "failed to read request body");
            return Ok(plain(StatusCode::BAD_REQUEST));
        }
    };
    let req = Request::from_parts(parts, body, remote_addr);

    let (head_tx, head_rx) = oneshot::channel();
    let (body_tx, body_rx) = mpsc::channel(CHANNEL_CAPACITY);

    let task = tokio::spawn(async move {
        let mut w = ChannelWriter::new(head_tx, body_tx);
        handler.serve(&mut w, &req).await;
        w.finish();
    });

    let Ok(head) = head_rx.await else {
        return Ok(plain(StatusCode::INTERNAL_SERVER_ERROR));
    };
    let frames = body_rx.map(|chunk: Bytes| Ok::<_, Error>(Frame::data(chunk)));
    // The channel closes when the task ends either way; its outcome decides
    // whether the body ends cleanly.
    let outcome = stream::once(task).filter_map(|joined| future::ready(match joined {
        Ok(()) => None,
        Err(e) => {
            error!(error = %e, "handler failed after the response head was sent");
            Some(Err(Error::other(e)))
        }
    }));
    Ok(head.map(|()| StreamBody::new(frames.chain(outcome)).boxed_unsync()))
}

/// A plain-text reply carrying the status reason phrase.
fn plain(status: StatusCode) -> http::Response<ResponseBody> {
    let text = format!("{}\n", status.canonical_reason().unwrap_or_default());
    let body = Full::new(Bytes::from(text)).map_err(|never: Infallible| -> Error { match never {} });
    let mut res = http::Response::new(body.boxed_unsync());
    *res.status_mut() = status;
    res.headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));
    res
}

// ── ChannelWriter ─────────────────────────────────────────────────────────────

/// [`ResponseWriter`] that hands the head and body chunks over to hyper.
struct ChannelWriter {
    headers: HeaderMap,
    head: Option<oneshot::Sender<http::Response<()>>>,
    body: mpsc::Sender<Bytes>,
}

impl ChannelWriter {
    fn new(head: oneshot::Sender<http::Response<()>>, body: mpsc::Sender<Bytes>) -> Self {
        Self { headers: HeaderMap::new(), head: Some(head), body }
    }

    /// A handler that returned without committing answers `200 OK`.
    fn finish(mut self) {
        if self.head.is_some() {
            self.write_status(StatusCode::OK);
        }
    }
}

impl ResponseWriter for ChannelWriter {
    fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    fn write_status(&mut self, status: StatusCode) {
        let Some(tx) = self.head.take() else {
            warn!(ignored = status.as_u16(), "superfluous write_status call");
            return;
        };
        let mut head = http::Response::new(());
        *head.status_mut() = status;
        *head.headers_mut() = mem::take(&mut self.headers);
        // The receiver is gone only if hyper dropped the request; nobody is
        // left to tell.
        let _ = tx.send(head);
    }
}

impl AsyncWrite for ChannelWriter {
    fn poll_write(self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        if this.head.is_some() {
            this.write_status(StatusCode::OK);
        }
        if buf.is_empty() {
            return Poll::Ready(Ok(0));
        }
        ready!(this.body.poll_ready(cx)).map_err(|_| closed())?;
        this.body.start_send(Bytes::copy_from_slice(buf)).map_err(|_| closed())?;
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        self.get_mut().body.close_channel();
        Poll::Ready(Ok(()))
    }
}

fn closed() -> io::Error {
    io::Error::new(io::ErrorKind::BrokenPipe, "client connection closed")
}
