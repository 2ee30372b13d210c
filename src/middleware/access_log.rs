//! Request access logging.

use std::sync::Arc;
use std::time::Instant;

use tracing::info;

use super::Middleware;
use super::capture::Capture;
use crate::handler::{BoxFuture, BoxedHandler, Handler};
use crate::logger::Logger;
use crate::request::Request;
use crate::writer::ResponseWriter;

/// Logs one `INFO` event per request once the wrapped handler returns.
///
/// The event's message is `prefix`; its fields are `src` (peer address),
/// `method`, `dest` (path and query), `proto`, `status`, `user_agent` and
/// `duration`. A handler that never sets a status is logged as `200`.
///
/// With `logger` unset, events go to [`Logger::current`] as of this call, or
/// to the ambient dispatcher if no subscriber was installed yet.
pub fn access_logger(logger: Option<Logger>, prefix: &str) -> Middleware {
    let logger = Logger::or_current(logger);
    let prefix: Arc<str> = Arc::from(prefix);
    Arc::new(move |next: BoxedHandler| -> BoxedHandler {
        Arc::new(AccessLog {
            next,
            logger: logger.clone(),
            prefix: Arc::clone(&prefix),
        })
    })
}

struct AccessLog {
    next: BoxedHandler,
    logger: Logger,
    prefix: Arc<str>,
}

impl Handler for AccessLog {
    fn serve<'a>(&'a self, w: &'a mut dyn ResponseWriter, req: &'a Request) -> BoxFuture<'a> {
        Box::pin(async move {
            let start = Instant::now();
            let mut capture = Capture::new(w);
            self.next.serve(&mut capture, req).await;
            let status = capture.status();

            let src = req.remote_addr().map(|addr| addr.to_string()).unwrap_or_default();
            self.logger.scope(|| info!(
                src = %src,
                method = %req.method(),
                dest = %req.path_and_query(),
                proto = ?req.version(),
                status = status.as_u16(),
                user_agent = %req.header("user-agent").unwrap_or_default(),
                duration = ?start.elapsed(),
                "{}",
                self.prefix
            ));
        })
    }
}
