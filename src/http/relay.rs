//! The sign-and-forward handler.
//!
//! Every inbound request walks the same linear pipeline:
//!
//! ```text
//! AwaitingBody → Signing → Forwarding → AwaitingUpstream → RelayingResponse → Done
//!       └────────────┴──────────┴──────────────┴─────────────────┴──→ Errored → 500
//! ```
//!
//! Nothing survives between requests except the read-only [`RelayState`].

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::extract::State;
use axum::http::header::InvalidHeaderValue;
use axum::http::uri::InvalidUri;
use axum::http::{HeaderName, Request, Uri};
use axum::response::{IntoResponse, Response};
use axum::BoxError;
use http_body_util::Full;
use thiserror::Error;

use crate::http::client::UpstreamClient;
use crate::http::request::{read_body, upstream_target};
use crate::http::response::UpstreamResponse;
use crate::observability::metrics;
use crate::security::headers::outbound_headers;
use crate::security::signature::Signer;

/// Read-only state shared by every request.
#[derive(Debug, Clone)]
pub struct RelayState {
    /// Upstream scheme and authority, no trailing slash.
    pub base_url: String,
    pub signer: Signer,
    pub signature_header: HeaderName,
    pub client: UpstreamClient,
    /// Budget for one exchange, from sending the request to the last body byte.
    pub upstream_timeout: Duration,
    pub max_body_size: usize,
}

/// Pipeline position of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayStage {
    AwaitingBody,
    Signing,
    Forwarding,
    AwaitingUpstream,
    RelayingResponse,
    Done,
}

impl RelayStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelayStage::AwaitingBody => "awaiting_body",
            RelayStage::Signing => "signing",
            RelayStage::Forwarding => "forwarding",
            RelayStage::AwaitingUpstream => "awaiting_upstream",
            RelayStage::RelayingResponse => "relaying_response",
            RelayStage::Done => "done",
        }
    }
}

impl fmt::Display for RelayStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failures that end a request with a 500.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Caller disconnected, body exceeded the limit, or framing was broken.
    #[error("failed to read request body: {0}")]
    Body(#[source] axum::Error),

    #[error("signature is not a valid header value: {0}")]
    Signature(#[source] InvalidHeaderValue),

    #[error("invalid upstream URL {target:?}: {source}")]
    Target {
        target: String,
        #[source]
        source: InvalidUri,
    },

    /// Connect failure or reset before response headers.
    #[error("upstream request failed: {}", describe(.0))]
    Upstream(#[source] hyper_util::client::legacy::Error),

    #[error("upstream request failed: no complete response within {0:?}")]
    UpstreamTimeout(Duration),

    #[error("failed to read upstream response: {}", describe_boxed(.0))]
    UpstreamBody(#[source] BoxError),
}

impl RelayError {
    /// The stage the request was in when it failed.
    pub fn stage(&self) -> RelayStage {
        match self {
            RelayError::Body(_) => RelayStage::AwaitingBody,
            RelayError::Signature(_) => RelayStage::Signing,
            RelayError::Target { .. } => RelayStage::Forwarding,
            RelayError::Upstream(_) | RelayError::UpstreamTimeout(_) => {
                RelayStage::AwaitingUpstream
            }
            RelayError::UpstreamBody(_) => RelayStage::RelayingResponse,
        }
    }
}

/// hyper's top-level message omits the cause ("client error (Connect)"),
/// so walk the source chain down to e.g. "Connection refused".
fn describe<E: StdError + ?Sized>(err: &E) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

fn describe_boxed(err: &BoxError) -> String {
    describe(&**err)
}

/// Axum handler for every method and path.
pub async fn relay_handler(
    State(state): State<Arc<RelayState>>,
    request: Request<Body>,
) -> Response {
    let start = Instant::now();
    let method = request.method().clone();

    match relay(&state, request).await {
        Ok(upstream) => {
            metrics::record_request(method.as_str(), upstream.status.as_u16(), start);
            upstream.into_response()
        }
        Err(err) => {
            tracing::error!(
                method = %method,
                stage = %err.stage(),
                error = %err,
                "Relay failed"
            );
            metrics::record_failure(err.stage());
            metrics::record_request(method.as_str(), 500, start);
            err.into_response()
        }
    }
}

/// Run the pipeline for one request.
pub async fn relay(
    state: &RelayState,
    request: Request<Body>,
) -> Result<UpstreamResponse, RelayError> {
    let (parts, body) = request.into_parts();

    let body = read_body(body, state.max_body_size).await?;

    let signature = state.signer.sign(&body);
    let headers =
        outbound_headers(&state.signature_header, &signature).map_err(RelayError::Signature)?;

    let target = upstream_target(&state.base_url, &parts.uri);
    let uri: Uri = target.parse().map_err(|source| RelayError::Target {
        target: target.clone(),
        source,
    })?;

    tracing::info!(
        method = %parts.method,
        target = %target,
        body = %String::from_utf8_lossy(&body),
        signature = %signature,
        "Forwarding request"
    );

    let mut outbound = Request::new(Full::new(body));
    *outbound.method_mut() = parts.method;
    *outbound.uri_mut() = uri;
    *outbound.headers_mut() = headers;

    let exchange = async {
        let response = state
            .client
            .send(outbound)
            .await
            .map_err(RelayError::Upstream)?;
        UpstreamResponse::collect(response).await
    };
    let upstream = tokio::time::timeout(state.upstream_timeout, exchange)
        .await
        .map_err(|_| RelayError::UpstreamTimeout(state.upstream_timeout))??;

    tracing::info!(
        status = upstream.status.as_u16(),
        body = %upstream.preview(),
        "Upstream responded"
    );

    Ok(upstream)
}
