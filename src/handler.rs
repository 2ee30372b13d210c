//! Handler trait and type erasure.
//!
//! # How handlers are stored
//!
//! Middleware takes a handler and returns a new one, so every layer of a
//! chain must have the *same* type. We hide concrete handler types behind
//! `dyn Handler` and share them through `Arc`:
//!
//! ```text
//! |w, req| Box::pin(async move { … })      ← user writes this
//!        ↓ handler_fn(closure)
//! Arc::new(FnHandler(closure))              ← heap-allocated wrapper
//!        ↓  stored as BoxedHandler = Arc<dyn Handler>
//! handler.serve(w, req)  at request time    ← one vtable dispatch
//! ```
//!
//! The writer and the request are *borrowed* for the duration of the call,
//! which is why the returned future carries the `'a` lifetime.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::request::Request;
use crate::writer::ResponseWriter;

/// A heap-allocated, type-erased future borrowing the request and writer.
///
/// `Send` lets tokio move the future across worker threads.
pub type BoxFuture<'a, T = ()> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A terminal request handler: receives a request, writes a response.
///
/// Implemented by the built-in middleware and by [`Responder`](crate::Responder)
/// handlers. Wrap plain closures with [`handler_fn`].
pub trait Handler: Send + Sync + 'static {
    fn serve<'a>(&'a self, w: &'a mut dyn ResponseWriter, req: &'a Request) -> BoxFuture<'a>;
}

/// A type-erased handler shared across concurrent requests.
///
/// `Arc` gives cheap, thread-safe shared ownership: wrapping a handler in
/// middleware clones the pointer, never the handler.
pub type BoxedHandler = Arc<dyn Handler>;

/// Adapts a closure into a [`BoxedHandler`].
///
/// ```rust
/// use mantle::handler_fn;
/// use tokio::io::AsyncWriteExt;
///
/// let hello = handler_fn(|w, _req| Box::pin(async move {
///     let _ = w.write_all(b"hello").await;
/// }));
/// ```
pub fn handler_fn<F>(f: F) -> BoxedHandler
where
    F: for<'a> Fn(&'a mut dyn ResponseWriter, &'a Request) -> BoxFuture<'a> + Send + Sync + 'static,
{
    Arc::new(FnHandler(f))
}

/// Newtype wrapper that holds a concrete closure `F` and implements
/// [`Handler`], bridging the typed world to the trait-object world.
struct FnHandler<F>(F);

impl<F> Handler for FnHandler<F>
where
    F: for<'a> Fn(&'a mut dyn ResponseWriter, &'a Request) -> BoxFuture<'a> + Send + Sync + 'static,
{
    fn serve<'a>(&'a self, w: &'a mut dyn ResponseWriter, req: &'a Request) -> BoxFuture<'a> {
        (self.0)(w, req)
    }
}
