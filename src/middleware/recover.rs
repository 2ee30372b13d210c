//! Panic recovery.
//!
//! The backtrace logged for a caught panic is taken by a panic hook while the
//! panicking frames are still on the stack. The hook chains to whatever hook
//! was installed before the first [`recover_and_handle`] call and only records
//! anything while a wrapped handler is being polled. If the application
//! replaces the hook afterwards, the backtrace falls back to the catch site.

use std::any::Any;
use std::backtrace::Backtrace;
use std::cell::Cell;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::{Arc, Once};
use std::task::{Context, Poll};

use futures::FutureExt;
use tracing::error;

use super::Middleware;
use crate::handler::{BoxFuture, BoxedHandler, Handler};
use crate::logger::Logger;
use crate::request::Request;
use crate::writer::ResponseWriter;

thread_local! {
    // Nesting depth of `Armed` polls on this thread.
    static ARMED: Cell<usize> = const { Cell::new(0) };
    static PANIC_TRACE: Cell<Option<Backtrace>> = const { Cell::new(None) };
}

/// Catches panics from the wrapped handler and answers with `fallback`.
///
/// A caught panic is logged once at `ERROR` with the panic message (`error`)
/// and a backtrace of the panicking thread (`stack`, one entry per line),
/// then `fallback` runs against the same writer and request. Anything the
/// panicking handler already wrote stays written; if it committed a status,
/// the fallback's status is ignored by the writer.
///
/// With `logger` unset, events go to [`Logger::current`] as of this call, or
/// to the ambient dispatcher if no subscriber was installed yet.
pub fn recover_and_handle(fallback: BoxedHandler, logger: Option<Logger>) -> Middleware {
    install_panic_hook();
    let logger = Logger::or_current(logger);
    Arc::new(move |next: BoxedHandler| -> BoxedHandler {
        Arc::new(Recover {
            next,
            fallback: Arc::clone(&fallback),
            logger: logger.clone(),
        })
    })
}

struct Recover {
    next: BoxedHandler,
    fallback: BoxedHandler,
    logger: Logger,
}

impl Handler for Recover {
    fn serve<'a>(&'a self, w: &'a mut dyn ResponseWriter, req: &'a Request) -> BoxFuture<'a> {
        Box::pin(async move {
            // `serve` itself may panic before handing back a future, so the
            // call has to happen inside the guarded one.
            let guarded: BoxFuture<'_> = Box::pin(async { self.next.serve(&mut *w, req).await });
            let outcome = AssertUnwindSafe(Armed(guarded)).catch_unwind().await;
            let Err(payload) = outcome else { return };

            let message = panic_message(payload.as_ref());
            let trace = PANIC_TRACE.take().unwrap_or_else(Backtrace::force_capture);
            let stack: Vec<String> = trace.to_string().lines().map(str::to_owned).collect();
            self.logger.scope(|| error!(
                error = %message,
                stack = ?stack,
                "panic caught by middleware"
            ));

            self.fallback.serve(w, req).await;
        })
    }
}

/// Polls the wrapped handler with panic-site capture switched on.
struct Armed<'a>(BoxFuture<'a>);

impl Future for Armed<'_> {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        PANIC_TRACE.set(None);
        let _armed = ArmGuard::new();
        self.0.as_mut().poll(cx)
    }
}

/// Keeps [`ARMED`] raised for one poll, including while unwinding out of it.
struct ArmGuard;

impl ArmGuard {
    fn new() -> Self {
        ARMED.set(ARMED.get() + 1);
        ArmGuard
    }
}

impl Drop for ArmGuard {
    fn drop(&mut self) {
        ARMED.set(ARMED.get() - 1);
    }
}

fn install_panic_hook() {
    static HOOK: Once = Once::new();
    HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            // `try_with`: the hook may run while this thread's locals are torn down.
            if ARMED.try_with(Cell::get).unwrap_or(0) > 0 {
                let _ = PANIC_TRACE.try_with(|slot| slot.set(Some(Backtrace::force_capture())));
            }
            previous(info);
        }));
    });
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}
