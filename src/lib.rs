//! HMAC-signing forward proxy library.
//!
//! Accepts plain HTTP on loopback, signs each request body with
//! HMAC-SHA256, and relays the request to one fixed upstream.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod security;

pub use config::ProxyConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use security::{Signature, Signer};
