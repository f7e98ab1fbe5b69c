//! Inbound request handling.
//!
//! # Responsibilities
//! - Generate a request ID (UUID v4) for tracing
//! - Buffer the inbound body under a size limit
//! - Build the upstream target from the inbound path and query
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing, but never forwarded
//!   upstream or returned to the caller
//! - Path and query are concatenated verbatim, with no re-encoding

use axum::body::{Body, Bytes};
use axum::http::{HeaderName, HeaderValue, Request, Uri};
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

use crate::http::relay::RelayError;

/// Header carrying the per-request correlation ID.
pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Request ID generator for `SetRequestIdLayer`.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidRequestId;

impl MakeRequestId for UuidRequestId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// Request ID previously attached by `SetRequestIdLayer`, if any.
pub fn request_id<B>(request: &Request<B>) -> &str {
    request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
}

/// Read the whole inbound body.
///
/// hyper has already resolved the framing: `Content-Length` bodies yield
/// exactly that many bytes, chunked bodies are decoded, and a request with
/// neither yields an empty body.
pub async fn read_body(body: Body, limit: usize) -> Result<Bytes, RelayError> {
    axum::body::to_bytes(body, limit)
        .await
        .map_err(RelayError::Body)
}

/// `base` immediately followed by the inbound path and query, as received.
pub fn upstream_target(base: &str, uri: &Uri) -> String {
    let path_and_query = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
    format!("{base}{path_and_query}")
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://hooks.example.com";

    fn target(uri: &str) -> String {
        upstream_target(BASE, &uri.parse::<Uri>().unwrap())
    }

    #[test]
    fn path_and_query_are_appended_verbatim() {
        assert_eq!(target("/"), "https://hooks.example.com/");
        assert_eq!(
            target("/api/v1/users?id=1&name=a%20b"),
            "https://hooks.example.com/api/v1/users?id=1&name=a%20b"
        );
        assert_eq!(
            target("/search?q=%2F%3F&empty=&flag"),
            "https://hooks.example.com/search?q=%2F%3F&empty=&flag"
        );
    }

    #[test]
    fn dot_segments_and_reserved_characters_survive() {
        for raw in ["/a/../b", "/a/%2e%2e/b", "/a/./b", "/q?x='y'", "/q?a=1;b=2&c=$"] {
            let target = target(raw);
            assert_eq!(target, format!("{BASE}{raw}"));

            // The client sends the parsed URI, which must keep the same bytes.
            let uri: Uri = target.parse().unwrap();
            assert_eq!(uri.path_and_query().unwrap().as_str(), raw);
        }
    }

    #[test]
    fn concatenation_neither_adds_nor_removes_slashes() {
        assert_eq!(target("//double"), "https://hooks.example.com//double");
        assert_eq!(target("/trailing/"), "https://hooks.example.com/trailing/");
    }

    #[test]
    fn absolute_form_keeps_only_path_and_query() {
        assert_eq!(
            target("http://elsewhere.test:8080/hook?x=1"),
            "https://hooks.example.com/hook?x=1"
        );
    }

    #[test]
    fn request_ids_are_unique_uuids() {
        let request = Request::new(());
        let mut maker = UuidRequestId;
        let a = maker.make_request_id(&request).unwrap();
        let b = maker.make_request_id(&request).unwrap();

        let a = a.header_value().to_str().unwrap().to_string();
        assert!(Uuid::parse_str(&a).is_ok());
        assert_ne!(a, b.header_value().to_str().unwrap());
    }

    #[test]
    fn missing_request_id_reads_as_unknown() {
        assert_eq!(request_id(&Request::new(())), "unknown");
    }

    #[tokio::test]
    async fn body_is_read_whole() {
        let bytes = read_body(Body::from(r#"{"user":"a"}"#), 1024).await.unwrap();
        assert_eq!(&bytes[..], br#"{"user":"a"}"#);

        let empty = read_body(Body::empty(), 1024).await.unwrap();
        assert!(empty.is_empty());
    }

    #[tokio::test]
    async fn oversized_body_is_an_error() {
        let err = read_body(Body::from(vec![0u8; 2048]), 1024).await.unwrap_err();
        assert!(matches!(err, RelayError::Body(_)));
    }
}
