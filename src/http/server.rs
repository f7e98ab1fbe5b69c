//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Build the shared relay state from the validated config
//! - Create the Axum Router sending every method and path to the relay
//! - Wire up middleware (request ID, tracing, inbound timeout)
//! - Serve on a listener until shutdown is signalled

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::header::InvalidHeaderName;
use axum::http::{HeaderName, Request};
use axum::Router;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::request_id::SetRequestIdLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::ProxyConfig;
use crate::http::client::{build_upstream_client, ClientError};
use crate::http::relay::{relay_handler, RelayState};
use crate::http::request::{request_id, UuidRequestId, X_REQUEST_ID};
use crate::lifecycle::shutdown::wait_for_shutdown;
use crate::security::signature::{Signer, SignerError};

/// Errors building the server from a configuration.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid signing key: {0}")]
    Signer(#[from] SignerError),

    #[error("invalid signature header name: {0}")]
    SignatureHeader(#[from] InvalidHeaderName),

    #[error("invalid signing key: {0}")]
    KeyEncoding(#[from] base64::DecodeError),

    #[error("failed to build upstream client: {0}")]
    Client(#[from] ClientError),
}

/// HTTP server for the HMAC proxy.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: ProxyConfig) -> Result<Self, ServerError> {
        let state = Arc::new(Self::build_state(&config)?);
        let router = Self::build_router(&config, state);
        Ok(Self { router, config })
    }

    fn build_state(config: &ProxyConfig) -> Result<RelayState, ServerError> {
        let upstream = &config.upstream;
        Ok(RelayState {
            base_url: upstream.base_url.clone(),
            signer: Signer::new(&upstream.signing_key()?)?,
            signature_header: HeaderName::from_bytes(upstream.signature_header.as_bytes())?,
            client: build_upstream_client(upstream, &config.timeouts)?,
            upstream_timeout: Duration::from_secs(config.timeouts.upstream_secs),
            max_body_size: config.security.max_body_size,
        })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ProxyConfig, state: Arc<RelayState>) -> Router {
        Router::new()
            .fallback(relay_handler)
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(
                config.timeouts.request_secs,
            )))
            .layer(
                TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                    tracing::info_span!(
                        "request",
                        request_id = %request_id(request),
                        method = %request.method(),
                        uri = %request.uri(),
                    )
                }),
            )
            .layer(SetRequestIdLayer::new(X_REQUEST_ID, UuidRequestId))
    }

    /// Run the server, accepting connections on the given listener until
    /// `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            upstream = %self.config.upstream.base_url,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(wait_for_shutdown(shutdown))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
