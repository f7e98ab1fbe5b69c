//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate the upstream base URL shape (scheme + authority only)
//! - Validate value ranges (timeouts > 0, ports valid) and key encoding
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use axum::http::{HeaderName, Uri};
use thiserror::Error;
use url::Url;

use crate::config::schema::ProxyConfig;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("upstream.base_url is not set")]
    MissingUpstream,

    #[error("upstream.base_url {url:?} is not a valid URL: {reason}")]
    InvalidUpstream { url: String, reason: String },

    #[error("upstream.base_url {0:?} must use http or https")]
    UnsupportedScheme(String),

    #[error("upstream.base_url {0:?} must not contain a path, query or fragment")]
    UpstreamHasPath(String),

    #[error("upstream.secret and upstream.secret_base64 are both set")]
    ConflictingSecrets,

    #[error("upstream.secret_base64 is not valid base64: {0}")]
    InvalidSecretBase64(String),

    #[error("upstream.signature_header {0:?} is not a valid header name")]
    InvalidSignatureHeader(String),

    #[error("listener.port must not be 0")]
    ZeroPort,

    #[error("timeouts.{0} must be greater than 0")]
    ZeroTimeout(&'static str),

    #[error("timeouts.request_secs ({request}) must exceed timeouts.upstream_secs ({upstream})")]
    RequestTimeoutTooShort { request: u64, upstream: u64 },

    #[error("security.max_body_size must be greater than 0")]
    ZeroBodyLimit,

    #[error("observability.metrics_address {0:?} is not a socket address")]
    InvalidMetricsAddress(String),
}

/// Check every semantic rule and report all violations at once.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if let Err(e) = validate_base_url(&config.upstream.base_url) {
        errors.push(e);
    }

    let upstream = &config.upstream;
    if upstream.secret_base64.is_some() && !upstream.secret.is_empty() {
        errors.push(ValidationError::ConflictingSecrets);
    }
    if let Err(e) = upstream.signing_key() {
        errors.push(ValidationError::InvalidSecretBase64(e.to_string()));
    }

    if HeaderName::from_bytes(config.upstream.signature_header.as_bytes()).is_err() {
        errors.push(ValidationError::InvalidSignatureHeader(
            config.upstream.signature_header.clone(),
        ));
    }

    if config.listener.port == 0 {
        errors.push(ValidationError::ZeroPort);
    }

    let timeouts = &config.timeouts;
    for (name, value) in [
        ("connect_secs", timeouts.connect_secs),
        ("upstream_secs", timeouts.upstream_secs),
        ("request_secs", timeouts.request_secs),
    ] {
        if value == 0 {
            errors.push(ValidationError::ZeroTimeout(name));
        }
    }
    if timeouts.upstream_secs > 0 && timeouts.request_secs <= timeouts.upstream_secs {
        errors.push(ValidationError::RequestTimeoutTooShort {
            request: timeouts.request_secs,
            upstream: timeouts.upstream_secs,
        });
    }

    if config.security.max_body_size == 0 {
        errors.push(ValidationError::ZeroBodyLimit);
    }

    let observability = &config.observability;
    if observability.metrics_enabled
        && observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_base_url(base_url: &str) -> Result<(), ValidationError> {
    if base_url.is_empty() {
        return Err(ValidationError::MissingUpstream);
    }

    let url = Url::parse(base_url).map_err(|e| ValidationError::InvalidUpstream {
        url: base_url.to_string(),
        reason: e.to_string(),
    })?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ValidationError::UnsupportedScheme(base_url.to_string()));
    }
    if url.host_str().is_none() {
        return Err(ValidationError::InvalidUpstream {
            url: base_url.to_string(),
            reason: "missing host".to_string(),
        });
    }
    if url.path() != "/" || url.query().is_some() || url.fragment().is_some() {
        return Err(ValidationError::UpstreamHasPath(base_url.to_string()));
    }
    // Requests are built by appending the raw inbound path to this string,
    // so it must also be acceptable as-is to the HTTP client.
    if let Err(e) = base_url.parse::<Uri>() {
        return Err(ValidationError::InvalidUpstream {
            url: base_url.to_string(),
            reason: e.to_string(),
        });
    }

    Ok(())
}
