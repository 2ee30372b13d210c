use std::sync::Arc;

use http::StatusCode;
use mantle::middleware::{Middleware, access_logger, queue, recover_and_handle, stack};
use mantle::{BoxedHandler, Handler, Recorder, Request, Responder, Response, ResponseWriter, handler_fn};
use tokio::io::AsyncWriteExt;

mod common;
use common::{LogBuffer, get};

fn core() -> BoxedHandler {
    handler_fn(|w, _req| Box::pin(async move {
        w.write_all(b"core").await.unwrap();
    }))
}

/// Middleware that writes `msg` before delegating, revealing execution order.
fn sign(msg: &'static str) -> Middleware {
    Arc::new(move |next: BoxedHandler| -> BoxedHandler {
        handler_fn(move |w, req| {
            let next = Arc::clone(&next);
            Box::pin(async move {
                w.write_all(msg.as_bytes()).await.unwrap();
                next.serve(w, req).await;
            })
        })
    })
}

async fn run(handler: &BoxedHandler, req: &Request) -> Recorder {
    let mut rec = Recorder::new();
    handler.serve(&mut rec, req).await;
    rec
}

// ── queue / stack ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn queue_runs_last_supplied_first() {
    let h = queue([sign("m1_"), sign("m2_")])(core());
    assert_eq!(run(&h, &get("/")).await.body_string(), "m2_m1_core");
}

#[tokio::test]
async fn stack_runs_first_supplied_first() {
    let h = stack([sign("m1_"), sign("m2_")])(core());
    assert_eq!(run(&h, &get("/")).await.body_string(), "m1_m2_core");
}

#[tokio::test]
async fn longer_chains_keep_their_order() {
    let ms = || [sign("a_"), sign("b_"), sign("c_")];
    assert_eq!(run(&queue(ms())(core()), &get("/")).await.body_string(), "c_b_a_core");
    assert_eq!(run(&stack(ms())(core()), &get("/")).await.body_string(), "a_b_c_core");
}

#[test]
fn empty_chains_are_identity() {
    let h = core();
    assert!(Arc::ptr_eq(&queue(Vec::<Middleware>::new())(Arc::clone(&h)), &h));
    assert!(Arc::ptr_eq(&stack(Vec::<Middleware>::new())(Arc::clone(&h)), &h));
}

// ── access_logger ─────────────────────────────────────────────────────────────

fn ok_handler() -> BoxedHandler {
    handler_fn(|w, _req| Box::pin(async move { w.write_status(StatusCode::OK) }))
}

const DEFAULT_FIELDS: [&str; 7] = [
    "src=",
    "method=GET",
    "dest=/",
    "proto=HTTP/1.1",
    "status=200",
    "user_agent=",
    "duration=",
];

#[tokio::test]
async fn access_log_fields() {
    for prefix in ["", "foo"] {
        let buf = LogBuffer::default();
        let h = access_logger(Some(buf.logger()), prefix)(ok_handler());

        let rec = run(&h, &get("/")).await;
        assert_eq!(rec.status(), StatusCode::OK);

        let lines = buf.lines();
        assert_eq!(lines.len(), 1, "expected one event, got {lines:?}");
        for field in DEFAULT_FIELDS {
            assert!(lines[0].contains(field), "missing {field} in {}", lines[0]);
        }
        assert!(lines[0].contains(&format!("{prefix} src=")), "prefix not the message: {}", lines[0]);
    }
}

#[tokio::test]
async fn access_log_keeps_the_default_it_was_built_with() {
    let built_with = LogBuffer::default();
    let h = {
        let _guard = tracing::subscriber::set_default(built_with.subscriber());
        access_logger(None, "foo")(ok_handler())
    };

    let later = LogBuffer::default();
    let _guard = tracing::subscriber::set_default(later.subscriber());
    run(&h, &get("/")).await;

    assert!(later.contents().is_empty(), "{}", later.contents());
    assert_eq!(built_with.lines().len(), 1);
}

#[tokio::test]
async fn access_log_built_before_any_subscriber_uses_the_ambient_one() {
    let h = access_logger(None, "early")(ok_handler());

    let buf = LogBuffer::default();
    let _guard = tracing::subscriber::set_default(buf.subscriber());
    run(&h, &get("/")).await;

    assert_eq!(buf.lines().len(), 1);
    assert!(buf.contents().contains("early"));
}

#[tokio::test]
async fn access_log_falls_back_to_default_at_construction() {
    let buf = LogBuffer::default();
    let h = {
        let _guard = tracing::subscriber::set_default(buf.subscriber());
        access_logger(None, "late")(ok_handler())
    };

    run(&h, &get("/")).await;

    assert_eq!(buf.lines().len(), 1);
    assert!(buf.contents().contains("late"));
}

#[tokio::test]
async fn access_log_reports_captured_status_and_request_details() {
    let buf = LogBuffer::default();
    let not_found = Responder::new().handler(|_req| Response::text(404, "nope"));
    let h = access_logger(Some(buf.logger()), "http")(not_found);

    let req = Request::from(
        http::Request::post("/search?q=rust")
            .header("User-Agent", "curl/8.0")
            .body(bytes::Bytes::new())
            .unwrap(),
    )
    .with_remote_addr("10.0.0.7:51234".parse().unwrap());
    run(&h, &req).await;

    let line = buf.contents();
    assert!(line.contains("src=10.0.0.7:51234"), "{line}");
    assert!(line.contains("method=POST"), "{line}");
    assert!(line.contains("dest=/search?q=rust"), "{line}");
    assert!(line.contains("status=404"), "{line}");
    assert!(line.contains("user_agent=curl/8.0"), "{line}");
}

#[tokio::test]
async fn access_log_counts_body_only_handlers_as_ok() {
    let buf = LogBuffer::default();
    let h = access_logger(Some(buf.logger()), "")(core());

    let rec = run(&h, &get("/")).await;

    assert_eq!(rec.body_string(), "core");
    assert!(buf.contents().contains("status=200"));
}

// ── recover_and_handle ────────────────────────────────────────────────────────

/// Panics unless the query is `id=<integer>`.
fn parse_id() -> BoxedHandler {
    handler_fn(|w, req| Box::pin(async move {
        let id = req.query().and_then(|q| q.strip_prefix("id="));
        if id.and_then(|id| id.parse::<i64>().ok()).is_none() {
            panic!("reached panic");
        }
        w.write_all(b"ok").await.unwrap();
    }))
}

fn fallback() -> BoxedHandler {
    handler_fn(|w, _req| Box::pin(async move {
        w.write_status(StatusCode::INTERNAL_SERVER_ERROR);
        w.write_all(b"caught panic").await.unwrap();
    }))
}

fn panic_events(buf: &LogBuffer) -> Vec<String> {
    buf.lines().into_iter().filter(|l| l.contains("panic caught by middleware")).collect()
}

#[tokio::test]
async fn recover_serves_fallback_with_explicit_logger() {
    let buf = LogBuffer::default();
    let h = recover_and_handle(fallback(), Some(buf.logger()))(parse_id());

    let rec = run(&h, &get("/?id=foo")).await;

    assert_eq!(rec.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(rec.body_string(), "caught panic");
    let events = panic_events(&buf);
    assert_eq!(events.len(), 1);
    assert!(events[0].contains("ERROR"));
    assert!(events[0].contains("error=reached panic"));
    assert!(events[0].contains("stack=["));
}

#[tokio::test]
async fn recover_serves_fallback_with_default_logger() {
    let buf = LogBuffer::default();
    let _guard = tracing::subscriber::set_default(buf.subscriber());
    let h = recover_and_handle(fallback(), None)(parse_id());

    let rec = run(&h, &get("/?id=foo")).await;

    assert_eq!(rec.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(rec.body_string(), "caught panic");
    let events = panic_events(&buf);
    assert_eq!(events.len(), 1);
    assert!(events[0].contains("reached panic"));
}

#[tokio::test]
async fn recover_leaves_healthy_handlers_alone() {
    let buf = LogBuffer::default();
    let h = recover_and_handle(fallback(), Some(buf.logger()))(parse_id());

    let rec = run(&h, &get("/?id=10")).await;

    assert_eq!(rec.status(), StatusCode::OK);
    assert_eq!(rec.body_string(), "ok");
    assert!(buf.contents().is_empty());
}

#[tokio::test]
async fn recover_catches_panics_raised_before_the_future_exists() {
    let buf = LogBuffer::default();
    let eager = handler_fn(|w, req| {
        if req.path() == "/eager" {
            panic!("eager panic");
        }
        Box::pin(async move { w.write_status(StatusCode::OK) })
    });
    let h = recover_and_handle(fallback(), Some(buf.logger()))(eager);

    let rec = run(&h, &get("/eager")).await;

    assert_eq!(rec.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(panic_events(&buf)[0].contains("eager panic"));
}

#[inline(never)]
fn detonate_deep_inside_handler() {
    panic!("detonated");
}

#[tokio::test]
async fn recover_logs_the_panicking_frames() {
    let buf = LogBuffer::default();
    let deep = handler_fn(|_w, _req| Box::pin(async move { detonate_deep_inside_handler() }));
    let h = recover_and_handle(fallback(), Some(buf.logger()))(deep);

    run(&h, &get("/")).await;

    let events = panic_events(&buf);
    assert_eq!(events.len(), 1);
    assert!(events[0].contains("error=detonated"));
    assert!(events[0].contains("detonate_deep_inside_handler"), "{}", events[0]);
}

#[tokio::test]
async fn access_log_outside_recovery_sees_fallback_status() {
    let buf = LogBuffer::default();
    let chain = stack([
        access_logger(Some(buf.logger()), "http"),
        recover_and_handle(fallback(), Some(buf.logger())),
    ]);

    run(&chain(parse_id()), &get("/?id=nope")).await;

    let lines = buf.lines();
    assert_eq!(lines.len(), 2, "{lines:?}");
    assert!(lines[0].contains("panic caught by middleware"));
    assert!(lines[1].contains("status=500"));
}
