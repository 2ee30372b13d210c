//! Turns declarative [`Response`]s into bytes on the wire.
//!
//! # Streaming vs buffering
//!
//! The status line goes out before the body. Once it has been sent, nothing
//! about it can change, so *when* a body failure happens decides what the
//! client sees:
//!
//! | Mode | Body fails | Client sees |
//! |---|---|---|
//! | streaming | after the status commit | intended status, truncated body |
//! | buffered  | before the status commit | clean `500 Internal Server Error` |
//! | buffered  | while copying the buffer out | intended status, truncated body |
//!
//! Buffering costs the full body in memory per request. No size cap is
//! enforced here.

use std::sync::Arc;

use http::StatusCode;
use tokio::io::AsyncWriteExt;
use tracing::error;

use crate::handler::{BoxFuture, BoxedHandler, Handler};
use crate::logger::Logger;
use crate::request::Request;
use crate::response::{BodySink, Response};
use crate::writer::{ResponseWriter, write_error};

/// A declarative handler: computes a [`Response`], never writes it.
pub type ResponseHandler = dyn Fn(&Request) -> Response + Send + Sync;

/// Configuration shared by every handler a responder produces.
///
/// ```rust
/// use mantle::{Responder, Response};
///
/// let atomic = Responder::new().buffer(true);
/// let handler = atomic.handler(|req| Response::text(200, format!("you asked for {}", req.path())));
/// ```
#[derive(Clone, Debug, Default)]
pub struct Responder {
    logger: Option<Logger>,
    buffer: bool,
}

impl Responder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Logger for write failures. Unset means [`Logger::current`] at the
    /// time [`handler`](Responder::handler) is called.
    pub fn logger(mut self, logger: Logger) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Buffer bodies in memory and only commit the status once the body
    /// procedure has succeeded.
    pub fn buffer(mut self, buffer: bool) -> Self {
        self.buffer = buffer;
        self
    }

    /// Wraps `f` into a handler that writes its responses.
    pub fn handler<F>(&self, f: F) -> BoxedHandler
    where
        F: Fn(&Request) -> Response + Send + Sync + 'static,
    {
        Arc::new(Respond {
            f: Box::new(f),
            logger: Logger::or_current(self.logger.clone()),
            buffer: self.buffer,
        })
    }
}

struct Respond {
    f: Box<ResponseHandler>,
    logger: Logger,
    buffer: bool,
}

impl Handler for Respond {
    fn serve<'a>(&'a self, w: &'a mut dyn ResponseWriter, req: &'a Request) -> BoxFuture<'a> {
        Box::pin(async move {
            let Response { status, headers, body } = (self.f)(req);

            let Some(status) = valid_status(status) else {
                self.logger.scope(|| error!(
                    method = %req.method(),
                    path = %req.path(),
                    status,
                    "handler returned a response with invalid status code"
                ));
                write_error(w, StatusCode::INTERNAL_SERVER_ERROR).await;
                return;
            };

            let out = w.headers_mut();
            for (name, value) in &headers {
                out.append(name, value.clone());
            }

            let Some(write_body) = body else {
                w.write_status(status);
                return;
            };

            if !self.buffer {
                w.write_status(status);
                let mut live = &mut *w;
                let sink: BodySink<'_> = &mut live;
                if let Err(e) = write_body(sink).await {
                    // Status already committed; the client gets a truncated body.
                    self.logger.scope(|| error!(
                        path = %req.path(),
                        error = %e,
                        "error streaming response body"
                    ));
                }
                return;
            }

            let mut buf: Vec<u8> = Vec::new();
            if let Err(e) = write_body(&mut buf).await {
                self.logger.scope(|| error!(
                    path = %req.path(),
                    error = %e,
                    "error buffering response body"
                ));
                write_error(w, StatusCode::INTERNAL_SERVER_ERROR).await;
                return;
            }

            w.write_status(status);
            if let Err(e) = w.write_all(&buf).await {
                self.logger.scope(|| error!(
                    path = %req.path(),
                    error = %e,
                    "error flushing buffered response"
                ));
            }
        })
    }
}

/// Accepts `100..=599`; everything else is a handler bug.
fn valid_status(code: u16) -> Option<StatusCode> {
    if !(100..=599).contains(&code) {
        return None;
    }
    StatusCode::from_u16(code).ok()
}
