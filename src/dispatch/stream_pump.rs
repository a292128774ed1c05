//! Drives a credential-leased upstream byte stream through dialect
//! translation and into an axum streaming response body.
//!
//! The upstream response is pumped on a detached task that writes into an
//! unbounded channel; the SSE response body reads from the receiver side.
//! If the client disconnects, axum drops the response body, which drops the
//! receiver, which makes every subsequent `send` on the pump task fail —
//! that failure is the disconnect signal that stops the pump and releases
//! the credential lock without waiting for the full upstream stream.

use std::future::Future;

use axum::body::Body;
use axum::http::{HeaderValue, header};
use axum::response::{IntoResponse, Response};
use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::warn;

use meridian_schema::{CanonicalChunk, CanonicalResponse};

use crate::dialect::{Dialect, StreamTranslator};
use crate::dispatch::cloudcode::parse_stream_line;
use crate::error::ApiError;

/// Drives `upstream` to completion or client disconnect, whichever comes
/// first, then always calls `release` exactly once (e.g. to free the
/// credential lock held for this request).
pub async fn pump<F, Fut>(
    dialect: Dialect,
    id: String,
    model: String,
    created: i64,
    upstream: reqwest::Response,
    release: F,
) -> Response
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel::<Bytes>();

    tokio::spawn(async move {
        let mut translator = StreamTranslator::new(dialect, id, model, created);
        let mut buf = BytesMut::new();
        let mut byte_stream = upstream.bytes_stream();

        let mut mid_stream_error = None;

        'outer: while let Some(next) = byte_stream.next().await {
            let chunk = match next {
                Ok(chunk) => chunk,
                Err(err) => {
                    warn!(error = %err, "upstream stream read error");
                    mid_stream_error = Some(ApiError::upstream(err.to_string()).retryable(false));
                    break;
                }
            };
            buf.extend_from_slice(&chunk);

            while let Some(pos) = buf.iter().position(|&b| b == b'\n') {
                let line = buf.split_to(pos + 1);
                let line = String::from_utf8_lossy(&line[..line.len() - 1]).into_owned();
                match parse_stream_line(&line) {
                    Ok(Some(canonical_chunk)) => {
                        let frame = translator.translate(&canonical_chunk);
                        if tx.send(frame).is_err() {
                            break 'outer;
                        }
                    }
                    Ok(None) => {}
                    Err(err) => {
                        warn!(error = %err.message, "failed to parse upstream stream line");
                    }
                }
            }
        }

        if let Some(err) = &mid_stream_error {
            let _ = tx.send(translator.error_event(err));
        }
        let _ = tx.send(translator.terminate());
        release().await;
    });

    let body = Body::from_stream(UnboundedReceiverStream::new(rx).map(Ok::<_, std::io::Error>));

    let mut response = body.into_response();
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static("text/event-stream"));
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    response
        .headers_mut()
        .insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
    response
        .headers_mut()
        .insert("x-accel-buffering", HeaderValue::from_static("no"));
    response
}

/// Error path: the dispatcher couldn't even open the upstream stream (no
/// credential available, upstream 5xx before headers, etc).
pub fn error_response(dialect: Dialect, err: &ApiError) -> Response {
    err.render(dialect)
}

/// `fakeStream` path (`spec.md` §4.5/§9): the upstream call was made
/// non-streaming, and the caller asked for a stream anyway, so the whole
/// response is reframed as a single chunk followed by the usual terminator.
pub fn synthetic(dialect: Dialect, id: String, model: String, created: i64, response: CanonicalResponse) -> Response {
    let mut translator = StreamTranslator::new(dialect, id, model, created);
    let chunk = CanonicalChunk {
        delta_text: Some(response.choice.content),
        delta_reasoning: response.choice.reasoning_content,
        finish_reason: Some(response.choice.finish_reason),
        usage: Some(response.usage),
    };

    let mut buf = BytesMut::new();
    buf.extend_from_slice(&translator.translate(&chunk));
    buf.extend_from_slice(&translator.terminate());

    let mut resp = Body::from(buf.freeze()).into_response();
    resp.headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static("text/event-stream"));
    resp.headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    resp.headers_mut()
        .insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
    resp.headers_mut()
        .insert("x-accel-buffering", HeaderValue::from_static("no"));
    resp
}
