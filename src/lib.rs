//! # mantle
//!
//! Composable HTTP middleware and declarative responses for tokio/hyper
//! services. Nothing more. Nothing less.
//!
//! ## The contract
//!
//! mantle does not route, terminate TLS or accept connections. It wraps
//! handlers. You bring the server loop and the router; mantle brings:
//!
//! - **Declarative responses** — a handler returns a [`Response`] value and a
//!   [`Responder`] writes it, streaming or buffered, with one logged outcome
//!   per failure
//! - **Middleware** — [`middleware::access_logger`],
//!   [`middleware::recover_and_handle`], and the [`middleware::stack`] /
//!   [`middleware::queue`] combinators that order them
//! - **hyper glue** — [`service::respond`] drives any [`BoxedHandler`] from a
//!   `hyper::service::service_fn`
//!
//! Logging goes through `tracing`. Pass a [`Logger`] to route a component's
//! events somewhere specific; leave it out and the subscriber current at
//! construction time is used.
//!
//! ## Quick start
//!
//! ```rust
//! use mantle::middleware::{access_logger, recover_and_handle, stack};
//! use mantle::{Handler, Recorder, Request, Responder, Response};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let responder = Responder::new().buffer(true);
//!
//! let app = responder.handler(|req| match req.query() {
//!     Some("fail") => Response::new(0), // logged, answered with 500
//!     _ => Response::json(200, br#"{"status":"ok"}"#.to_vec()),
//! });
//! let oops = responder.handler(|_req| Response::text(500, "something broke"));
//!
//! let handler = stack([access_logger(None, "http"), recover_and_handle(oops, None)])(app);
//!
//! let mut rec = Recorder::new();
//! let req = Request::from(http::Request::get("/health").body(bytes::Bytes::new()).unwrap());
//! handler.serve(&mut rec, &req).await;
//! assert_eq!(rec.status(), 200);
//! # }
//! ```

mod error;
mod handler;
mod logger;
mod recorder;
mod request;
mod responder;
mod response;
mod writer;

pub mod middleware;
pub mod service;

pub use error::Error;
pub use handler::{BoxFuture, BoxedHandler, Handler, handler_fn};
pub use logger::Logger;
pub use recorder::Recorder;
pub use request::Request;
pub use responder::{Responder, ResponseHandler};
pub use response::{BodySink, ContentType, Response, WriteBody};
pub use writer::{ResponseWriter, write_error};
