use axum::{
    body::{Body, Bytes},
    extract::Request,
    http::{HeaderValue, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use http_body_util::{BodyExt, LengthLimitError, Limited};
use std::time::Instant;
use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

use crate::error::ServerError;

pub static X_TRACE_ID: &str = "x-trace-id";

/// Bodies larger than this are summarised instead of logged.
const MAX_LOGGED_BODY: usize = 1024;

/// Request bodies are buffered up to this size; larger ones get a 413.
/// Matches axum's default body limit.
pub const MAX_BUFFERED_BODY: usize = 2 * 1024 * 1024;

/// Wraps each request in an `http_request` span keyed by a trace id.
///
/// The id is taken from an incoming `x-trace-id` header when it parses as a
/// UUID, otherwise a fresh v4 id is generated. It is echoed on the response.
pub async fn trace_middleware(req: Request<Body>, next: Next) -> Response {
    let start_time = Instant::now();

    let trace_id = req
        .headers()
        .get(X_TRACE_ID)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| Uuid::parse_str(s).ok())
        .unwrap_or_else(Uuid::new_v4);

    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let span = info_span!(
        "http_request",
        trace_id = %trace_id,
        method = %method,
        path = %path,
    );

    async move {
        info!("request received");
        let header_value = HeaderValue::from_str(&trace_id.to_string()).ok();

        let (parts, body) = req.into_parts();
        let mut response = match buffer_and_log("request", &parts.headers, body).await {
            Ok(req_bytes) => {
                let mut req = Request::from_parts(parts, Body::from(req_bytes));
                if let Some(v) = header_value.clone() {
                    req.headers_mut().insert(X_TRACE_ID, v);
                }
                next.run(req).await
            }
            Err(e) => e.into_response(),
        };
        if let Some(v) = header_value {
            response.headers_mut().insert(X_TRACE_ID, v);
        }

        info!(
            status = response.status().as_u16(),
            latency_ms = start_time.elapsed().as_millis() as u64,
            "response sent"
        );
        response
    }
    .instrument(span)
    .await
}

/// Collect a body up to [`MAX_BUFFERED_BODY`], logging it at `debug` when it
/// is small JSON.
async fn buffer_and_log(
    direction: &str,
    headers: &header::HeaderMap,
    body: Body,
) -> Result<Bytes, ServerError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let bytes = match Limited::new(body, MAX_BUFFERED_BODY).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
            warn!(direction, limit = MAX_BUFFERED_BODY, "body too large");
            return Err(ServerError::PayloadTooLarge(format!(
                "request body exceeds {MAX_BUFFERED_BODY} bytes"
            )));
        }
        Err(e) => {
            warn!(direction, error = %e, "failed to read body");
            return Err(ServerError::BadRequest("failed to read request body".into()));
        }
    };

    if content_type.contains("application/json") && bytes.len() < MAX_LOGGED_BODY {
        if let Ok(text) = std::str::from_utf8(&bytes) {
            debug!(direction, body = text, "body");
        }
    } else if !bytes.is_empty() {
        debug!(direction, content_type, size = bytes.len(), "body skipped");
    }

    Ok(bytes)
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn small_bodies_pass_through() {
        let bytes = buffer_and_log("request", &header::HeaderMap::new(), Body::from("{}"))
            .await
            .unwrap();
        assert_eq!(&bytes[..], b"{}");
    }

    #[tokio::test]
    async fn oversized_bodies_are_refused() {
        let body = Body::from(vec![b' '; MAX_BUFFERED_BODY + 1]);
        let err = buffer_and_log("request", &header::HeaderMap::new(), body)
            .await
            .unwrap_err();
        assert!(matches!(err, ServerError::PayloadTooLarge(_)));
    }
}
