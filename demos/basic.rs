//! Minimal mantle example — a middleware chain over declarative handlers,
//! served by hyper with graceful shutdown.
//!
//! Run with:
//!   RUST_LOG=info cargo run --example basic [addr]
//!
//! Try:
//!   curl -i http://localhost:3000/hello?name=alice
//!   curl -i http://localhost:3000/report       (buffered, fails → clean 500)
//!   curl -i http://localhost:3000/panic        (recovered → fallback 500)
//!
//! Every request prints one access-log line.

use std::net::SocketAddr;
use std::sync::Arc;

use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use mantle::middleware::{access_logger, recover_and_handle, stack};
use mantle::service::respond;
use mantle::{BoxedHandler, Error, Handler, Request, Responder, Response};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let addr: SocketAddr = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "0.0.0.0:3000".to_owned())
        .parse()
        .map_err(std::io::Error::other)?;

    serve(addr, app()).await
}

/// Routing is not mantle's job; a `match` on the path stands in for a router.
fn app() -> BoxedHandler {
    let streaming = Responder::new();
    let buffered = Responder::new().buffer(true);

    let hello = streaming.handler(say_hello);
    let report = buffered.handler(flaky_report);
    let not_found = streaming.handler(|_req| Response::text(404, "not found"));
    let routes = mantle::handler_fn(move |w, req| {
        let target = match req.path() {
            "/hello" => Arc::clone(&hello),
            "/report" => Arc::clone(&report),
            "/panic" => panic!("handler for {} gave up", req.path()),
            _ => Arc::clone(&not_found),
        };
        Box::pin(async move { target.serve(w, req).await })
    });

    let fallback = streaming.handler(|_req| Response::text(500, "something went wrong"));
    stack([access_logger(None, "http"), recover_and_handle(fallback, None)])(routes)
}

// GET /hello?name=alice
fn say_hello(req: &Request) -> Response {
    let name = req
        .query()
        .and_then(|q| q.strip_prefix("name="))
        .unwrap_or("world")
        .to_owned();
    Response::text(200, format!("hello, {name}\n"))
}

// GET /report — the body fails halfway; buffering turns that into a clean 500.
fn flaky_report(_req: &Request) -> Response {
    Response::new(200).body(|w| Box::pin(async move {
        w.write_all(b"row 1\n").await?;
        Err::<(), _>(Error::other("report source went away"))
    }))
}

async fn serve(addr: SocketAddr, handler: BoxedHandler) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %addr, "mantle demo listening");

    // JoinSet tracks every spawned connection task so we can wait for
    // them all to finish during graceful shutdown.
    let mut tasks = tokio::task::JoinSet::new();

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            // Check shutdown first so a SIGTERM stops accepting immediately,
            // even if more connections are queued.
            biased;

            () = &mut shutdown => {
                info!(in_flight = tasks.len(), "shutdown signal received, draining connections");
                break;
            }

            res = listener.accept() => {
                let (stream, peer) = match res {
                    Ok(v) => v,
                    Err(e) => {
                        error!("accept error: {e}");
                        continue;
                    }
                };

                let handler = Arc::clone(&handler);
                let io = TokioIo::new(stream);

                tasks.spawn(async move {
                    // Called once per request on the connection.
                    let svc = service_fn(move |req| respond(Arc::clone(&handler), req, Some(peer)));

                    if let Err(e) = ConnBuilder::new(TokioExecutor::new())
                        .serve_connection(io, svc)
                        .await
                    {
                        error!(peer = %peer, "connection error: {e}");
                    }
                });
            }

            // Reap finished connection tasks so the JoinSet does not grow
            // without bound on long-running servers.
            Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
        }
    }

    while tasks.join_next().await.is_some() {}

    info!("mantle demo stopped");
    Ok(())
}

/// Resolves on SIGTERM or Ctrl-C (Ctrl-C only on non-Unix platforms).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let sigterm = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c  => {}
        () = sigterm => {}
    }
}
