//! HMAC-SHA256 body signing.
//!
//! The key is absorbed once at startup; each request clones the keyed
//! state, so signing never fails and no buffer is shared between requests.
//! Any key length is accepted, including zero.

use std::fmt;

use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Algorithm label used as the header value prefix.
pub const ALGORITHM: &str = "sha256";

/// Errors raised while building a signer from key material.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignerError {
    #[error("signing key was rejected by the HMAC implementation")]
    InvalidKey,
}

/// Keyed HMAC-SHA256 signer.
#[derive(Clone)]
pub struct Signer {
    keyed: HmacSha256,
}

impl Signer {
    pub fn new(key: &[u8]) -> Result<Self, SignerError> {
        let keyed = HmacSha256::new_from_slice(key).map_err(|_| SignerError::InvalidKey)?;
        Ok(Self { keyed })
    }

    /// Sign `payload`. Deterministic for a given key, including the empty payload.
    pub fn sign(&self, payload: &[u8]) -> Signature {
        let mut mac = self.keyed.clone();
        mac.update(payload);
        Signature(format!("{:x}", mac.finalize().into_bytes()))
    }
}

impl fmt::Debug for Signer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signer")
            .field("algorithm", &ALGORITHM)
            .finish_non_exhaustive()
    }
}

/// A 32-byte tag rendered as 64 lowercase hex characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Signature(String);

impl Signature {
    /// Bare lowercase hex digest.
    pub fn hex(&self) -> &str {
        &self.0
    }

    /// Header value in the `sha256=<hex>` form.
    pub fn header_value(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", ALGORITHM, self.0)
    }
}
