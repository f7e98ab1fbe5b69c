//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection (loopback)
//!     → server.rs (Axum setup, request ID, tracing, timeout)
//!     → relay.rs (the sign-and-forward pipeline)
//!         → request.rs (buffer body, build upstream target)
//!         → security::signature + security::headers
//!         → client.rs (hyper, target sent verbatim, no redirects)
//!         → response.rs (buffer, filter headers, map errors to 500)
//!     → Send to caller
//! ```

pub mod client;
pub mod relay;
pub mod request;
pub mod response;
pub mod server;

pub use relay::{RelayError, RelayStage, RelayState};
pub use request::{UuidRequestId, X_REQUEST_ID};
pub use server::{HttpServer, ServerError};
