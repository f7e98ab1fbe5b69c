//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection on 127.0.0.1:<port>
//!     → listener.rs (bind loopback only)
//!     → axum::serve (one task per connection)
//!     → Hand off to HTTP layer
//! ```
//!
//! # Design Decisions
//! - Loopback only: the proxy holds a signing key and must not be reachable
//!   from other hosts
//! - Plain HTTP; there is no TLS on the inbound leg

pub mod listener;

pub use listener::{bind_loopback, ListenerError};
