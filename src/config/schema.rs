//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

/// Default listening port on the loopback interface.
pub const DEFAULT_PORT: u16 = 8090;

/// Default name of the outbound signature header.
pub const DEFAULT_SIGNATURE_HEADER: &str = "hmac-signature";

/// Root configuration for the HMAC proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (loopback port).
    pub listener: ListenerConfig,

    /// The single upstream every request is relayed to.
    pub upstream: UpstreamConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Request size limits.
    pub security: SecurityConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
///
/// The proxy only ever binds the loopback interface, so the port is the
/// sole knob.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// TCP port on 127.0.0.1.
    pub port: u16,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self { port: DEFAULT_PORT }
    }
}

/// Upstream configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Scheme and authority of the upstream, without a path
    /// (e.g., "https://api.example.com").
    pub base_url: String,

    /// Pre-shared HMAC key. The raw UTF-8 bytes of this string are the key.
    pub secret: Secret,

    /// Pre-shared HMAC key as standard base64, for key material that is not
    /// valid UTF-8. Mutually exclusive with a non-empty `secret`.
    pub secret_base64: Option<Secret>,

    /// Outbound header carrying `sha256=<hex>`.
    pub signature_header: String,

    /// Skip upstream certificate validation.
    ///
    /// WARNING: on by default. This is debugging tooling pointed at test
    /// endpoints; never run it this way in front of production traffic.
    pub accept_invalid_certs: bool,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            secret: Secret::default(),
            secret_base64: None,
            signature_header: DEFAULT_SIGNATURE_HEADER.to_string(),
            accept_invalid_certs: true,
        }
    }
}

impl UpstreamConfig {
    /// Raw HMAC key bytes: `secret_base64` decoded when set, otherwise the
    /// bytes of `secret`. May be empty.
    pub fn signing_key(&self) -> Result<Vec<u8>, base64::DecodeError> {
        match &self.secret_base64 {
            Some(encoded) => STANDARD.decode(encoded.as_bytes().trim_ascii()),
            None => Ok(self.secret.as_bytes().to_vec()),
        }
    }
}

/// Secret text from a config file, flag or environment variable.
/// `Debug` never prints it.
#[derive(Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Secret(<{} bytes redacted>)", self.0.len())
    }
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Upstream connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Total time allowed for one upstream exchange, in seconds.
    pub upstream_secs: u64,

    /// Total time allowed for one inbound request, in seconds.
    /// Must exceed `upstream_secs` so upstream timeouts surface as 500s.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 10,
            upstream_secs: 30,
            request_secs: 60,
        }
    }
}

/// Request size limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Maximum inbound body size in bytes.
    pub max_body_size: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_body_size: 10 * 1024 * 1024, // 10MB
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` overrides it.
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

/// Log line format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable output for terminals.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}
