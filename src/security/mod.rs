//! Request signing and header policy.
//!
//! # Data Flow
//! ```text
//! inbound body bytes
//!     → signature.rs (HMAC-SHA256 with the pre-shared key)
//!     → headers.rs (fixed outbound set + signature header)
//!     → upstream
//!
//! upstream response headers
//!     → headers.rs (drop blocklisted hop-by-hop/encoding headers)
//!     → caller
//! ```

pub mod headers;
pub mod signature;

pub use headers::{filter_response_headers, outbound_headers, RESPONSE_HEADER_BLOCKLIST};
pub use signature::{Signature, Signer, SignerError};
