//! Upstream response relay.
//!
//! # Responsibilities
//! - Buffer the complete upstream response
//! - Rebuild it for the caller with blocklisted headers removed
//! - Map relay failures to a 500 with a short diagnostic
//!
//! # Design Decisions
//! - The body is fully materialized before anything is written, so the
//!   caller gets either the whole upstream response or the error response
//! - Upstream 4xx/5xx are relayed as-is; they are not proxy failures

use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::BoxError;
use http_body_util::BodyExt;

use crate::http::relay::RelayError;
use crate::security::headers::filter_response_headers;

/// Characters of the response body echoed into the trace.
pub const PREVIEW_CHARS: usize = 200;

/// A fully buffered upstream response.
#[derive(Debug)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl UpstreamResponse {
    /// Drain `response` into memory. The upstream client has already undone
    /// any content encoding it negotiated.
    pub async fn collect<B>(response: axum::http::Response<B>) -> Result<Self, RelayError>
    where
        B: hyper::body::Body,
        B::Error: Into<BoxError>,
    {
        let (parts, body) = response.into_parts();
        let body = body
            .collect()
            .await
            .map_err(|e| RelayError::UpstreamBody(e.into()))?
            .to_bytes();
        Ok(Self {
            status: parts.status,
            headers: parts.headers,
            body,
        })
    }

    /// Lossy text rendering of the first `PREVIEW_CHARS` characters.
    pub fn preview(&self) -> String {
        preview(&self.body, PREVIEW_CHARS)
    }
}

impl IntoResponse for UpstreamResponse {
    fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = filter_response_headers(&self.headers);
        response
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Proxy error: {self}"),
        )
            .into_response()
    }
}

/// Decode `bytes` as UTF-8, replacing invalid sequences, and keep at most
/// `max_chars` characters.
pub fn preview(bytes: &[u8], max_chars: usize) -> String {
    String::from_utf8_lossy(bytes).chars().take(max_chars).collect()
}
