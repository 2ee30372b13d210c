//! The output side of a request: headers, a status line, then body bytes.

use http::header::{CONTENT_LENGTH, CONTENT_TYPE, X_CONTENT_TYPE_OPTIONS};
use http::{HeaderMap, HeaderValue, StatusCode};
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// A live response sink.
///
/// The contract mirrors the wire: mutate [`headers_mut`](Self::headers_mut),
/// commit the status once with [`write_status`](Self::write_status), then
/// write body bytes through [`AsyncWrite`]. Writing body bytes before any
/// status commits `200 OK`. Implementations in this crate ignore a second
/// commit and emit a `WARN` event instead.
pub trait ResponseWriter: AsyncWrite + Unpin + Send {
    fn headers_mut(&mut self) -> &mut HeaderMap;
    fn write_status(&mut self, status: StatusCode);
}

/// Sends a generic plain-text error reply: `"<reason phrase>\n"`.
///
/// Overrides any `content-type` already set and drops `content-length`, since
/// the body no longer matches whatever the handler intended. Write failures
/// are swallowed; by the time this runs the caller has already logged the
/// root cause.
pub async fn write_error(w: &mut dyn ResponseWriter, status: StatusCode) {
    let headers = w.headers_mut();
    headers.remove(CONTENT_LENGTH);
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));
    headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    w.write_status(status);

    let body = format!("{}\n", status.canonical_reason().unwrap_or_default());
    let _ = w.write_all(body.as_bytes()).await;
}
