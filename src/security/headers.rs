//! Header policy for both legs of the relay.
//!
//! # Responsibilities
//! - Build the fixed outbound header set plus the signature header
//! - Strip hop-by-hop and encoding headers from upstream responses
//!
//! # Design Decisions
//! - Inbound headers are never copied upstream; the upstream sees the same
//!   fixed set for every request
//! - The response blocklist is a named constant so the policy can be
//!   checked on its own

use axum::http::header::{
    HeaderMap, HeaderName, HeaderValue, InvalidHeaderValue, ACCEPT, ACCEPT_ENCODING, CONNECTION,
    CONTENT_TYPE,
};

use crate::security::signature::Signature;

/// Upstream response headers never relayed to the caller. The body has
/// already been decoded and fully buffered, so the proxy cannot honour the
/// upstream's encoding or connection semantics.
pub const RESPONSE_HEADER_BLOCKLIST: [&str; 4] = [
    "content-encoding",
    "transfer-encoding",
    "connection",
    "keep-alive",
];

/// Whether an upstream response header is dropped before relaying.
pub fn is_blocked_response_header(name: &HeaderName) -> bool {
    RESPONSE_HEADER_BLOCKLIST.contains(&name.as_str())
}

/// Copy `upstream` into a new map, skipping blocklisted names.
/// Repeated headers (e.g. several `set-cookie`) keep every value.
pub fn filter_response_headers(upstream: &HeaderMap) -> HeaderMap {
    let mut relayed = HeaderMap::with_capacity(upstream.len());
    for (name, value) in upstream {
        if !is_blocked_response_header(name) {
            relayed.append(name.clone(), value.clone());
        }
    }
    relayed
}

/// The fixed outbound header set with the signature attached under
/// `signature_header`. Fails rather than sending an unsigned request.
pub fn outbound_headers(
    signature_header: &HeaderName,
    signature: &Signature,
) -> Result<HeaderMap, InvalidHeaderValue> {
    let mut headers = HeaderMap::with_capacity(5);
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
    headers.insert(
        ACCEPT_ENCODING,
        HeaderValue::from_static("gzip, deflate, br"),
    );
    headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));

    headers.insert(
        signature_header.clone(),
        HeaderValue::from_str(&signature.header_value())?,
    );
    Ok(headers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::signature::Signer;
    use axum::http::header::{CONTENT_ENCODING, CONTENT_LENGTH, SET_COOKIE, TRANSFER_ENCODING};

    #[test]
    fn blocklist_covers_encoding_and_connection_headers() {
        for name in [CONTENT_ENCODING, TRANSFER_ENCODING, CONNECTION] {
            assert!(is_blocked_response_header(&name), "{name}");
        }
        assert!(is_blocked_response_header(&HeaderName::from_static("keep-alive")));
        assert!(!is_blocked_response_header(&CONTENT_TYPE));
        assert!(!is_blocked_response_header(&CONTENT_LENGTH));
    }

    #[test]
    fn filter_drops_blocked_and_keeps_the_rest() {
        let mut upstream = HeaderMap::new();
        upstream.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        upstream.insert(CONTENT_ENCODING, HeaderValue::from_static("gzip"));
        upstream.insert(TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
        upstream.insert(CONNECTION, HeaderValue::from_static("close"));
        upstream.insert("x-upstream", HeaderValue::from_static("yes"));
        upstream.append(SET_COOKIE, HeaderValue::from_static("a=1"));
        upstream.append(SET_COOKIE, HeaderValue::from_static("b=2"));

        let relayed = filter_response_headers(&upstream);

        assert!(relayed.get(CONTENT_ENCODING).is_none());
        assert!(relayed.get(TRANSFER_ENCODING).is_none());
        assert!(relayed.get(CONNECTION).is_none());
        assert_eq!(relayed.get(CONTENT_TYPE).unwrap(), "text/plain");
        assert_eq!(relayed.get("x-upstream").unwrap(), "yes");
        let cookies: Vec<_> = relayed.get_all(SET_COOKIE).iter().collect();
        assert_eq!(cookies, ["a=1", "b=2"]);
    }

    #[test]
    fn outbound_set_is_fixed_and_signed() {
        let signature = Signer::new(b"SECRET_HERE").unwrap().sign(b"{}");
        let name = HeaderName::from_static("hmac-signature");

        let headers = outbound_headers(&name, &signature).unwrap();

        assert_eq!(headers.len(), 5);
        assert_eq!(headers.get(CONTENT_TYPE).unwrap(), "application/json");
        assert_eq!(headers.get(ACCEPT).unwrap(), "*/*");
        assert_eq!(headers.get(ACCEPT_ENCODING).unwrap(), "gzip, deflate, br");
        assert_eq!(headers.get(CONNECTION).unwrap(), "keep-alive");
        assert_eq!(
            headers.get("hmac-signature").unwrap().to_str().unwrap(),
            format!("sha256={}", signature.hex())
        );
    }

    #[test]
    fn every_outbound_set_carries_the_signature() {
        let signer = Signer::new(b"SECRET_HERE").unwrap();
        let name = HeaderName::from_static("x-hub-signature-256");
        for payload in [&b""[..], b"{}", &[0xff; 64]] {
            let signature = signer.sign(payload);
            let headers = outbound_headers(&name, &signature).unwrap();
            assert_eq!(
                headers.get(&name).unwrap().to_str().unwrap(),
                signature.header_value()
            );
        }
    }
}
