//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Relay pipeline produces:
//!     → logging.rs (structured log events via `tracing`)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → stdout (pretty or JSON lines)
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```
//!
//! # Design Decisions
//! - Emitting a log line or metric can never fail a request
//! - Request ID is attached to every span but stays local to the proxy
//! - The signing key is never logged

pub mod logging;
pub mod metrics;
