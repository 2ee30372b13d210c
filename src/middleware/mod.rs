//! Middleware layer.
//!
//! Middleware is a function from handler to handler. It is the right place
//! for cross-cutting concerns: access logging, panic recovery, request-id
//! injection, authentication-header inspection.
//!
//! Built-in middleware:
//! - [`access_logger`] — one structured `INFO` event per request
//! - [`recover_and_handle`] — turns a handler panic into a fallback response
//!
//! Chains are assembled with [`stack`] (first listed runs first) or
//! [`queue`] (first listed runs last):
//!
//! ```rust
//! use mantle::middleware::{access_logger, recover_and_handle, stack};
//! use mantle::{Responder, Response};
//!
//! let oops = Responder::new().handler(|_req| Response::text(500, "oops"));
//! let app = Responder::new().handler(|_req| Response::text(200, "hello"));
//!
//! // access log sees the fallback's 500 because recovery sits inside it
//! let chain = stack([access_logger(None, "http"), recover_and_handle(oops, None)]);
//! let handler = chain(app);
//! ```

use std::sync::Arc;

use crate::handler::BoxedHandler;

mod access_log;
mod capture;
mod recover;

pub use access_log::access_logger;
pub use recover::recover_and_handle;

/// A function that wraps a handler in another handler.
pub type Middleware = Arc<dyn Fn(BoxedHandler) -> BoxedHandler + Send + Sync>;

/// Composes middleware in iteration order: each one wraps everything
/// applied before it.
///
/// `queue([m1, m2])(h) == m2(m1(h))`, so `m1` ends up innermost, closest to
/// the handler, and `m2` runs first.
pub fn queue(ms: impl IntoIterator<Item = Middleware>) -> Middleware {
    let ms: Vec<Middleware> = ms.into_iter().collect();
    Arc::new(move |h: BoxedHandler| ms.iter().fold(h, |h, m| m(h)))
}

/// Composes middleware in reverse iteration order.
///
/// `stack([m1, m2])(h) == m1(m2(h))`, so `m1` ends up outermost and runs
/// first; `m2` is closest to the handler.
pub fn stack(ms: impl IntoIterator<Item = Middleware>) -> Middleware {
    let ms: Vec<Middleware> = ms.into_iter().collect();
    Arc::new(move |h: BoxedHandler| ms.iter().rev().fold(h, |h, m| m(h)))
}
