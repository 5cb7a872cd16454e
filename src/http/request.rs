//! Request identification.
//!
//! Every request gets an `X-Request-Id` (generated when the client did not send
//! one) that is echoed on the response and recorded on the request's span.

use axum::{
    body::Body,
    http::{HeaderMap, Request},
};
use tracing::Span;

pub const X_REQUEST_ID: &str = "x-request-id";

pub fn request_id(headers: &HeaderMap) -> &str {
    headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
}

/// Span for `TraceLayer::make_span_with`.
pub fn make_request_span(request: &Request<Body>) -> Span {
    tracing::info_span!(
        "request",
        request_id = %request_id(request.headers()),
        method = %request.method(),
        path = %request.uri().path(),
    )
}
