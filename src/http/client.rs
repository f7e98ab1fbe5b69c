//! Upstream HTTP client.
//!
//! # Design Decisions
//! - hyper writes the request target exactly as given, so the inbound path
//!   and query reach the upstream byte for byte
//! - Redirects are never followed; a 3xx is just another response
//! - gzip, deflate and br response bodies are decoded before relaying
//! - Certificate validation follows `upstream.accept_invalid_certs`, which
//!   defaults to off for test tooling and is unsafe anywhere else

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::http::{Request, Response};
use http_body_util::Full;
use hyper::body::Incoming;
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::{Client, Error as HyperClientError};
use hyper_util::rt::TokioExecutor;
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{ring, verify_tls12_signature, verify_tls13_signature, CryptoProvider};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{ClientConfig, DigitallySignedStruct, SignatureScheme};
use thiserror::Error;
use tower::ServiceExt;
use tower_http::decompression::{Decompression, DecompressionBody};

use crate::config::{TimeoutConfig, UpstreamConfig};

/// Response body as handed back by [`UpstreamClient::send`], already decoded.
pub type UpstreamBody = DecompressionBody<Incoming>;

type HttpsClient = Client<HttpsConnector<HttpConnector>, Full<Bytes>>;

/// Errors building the upstream client.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("failed to set up upstream TLS: {0}")]
    Tls(#[from] rustls::Error),
}

/// Pooled client used for every upstream call.
#[derive(Clone)]
pub struct UpstreamClient {
    inner: Decompression<HttpsClient>,
}

impl UpstreamClient {
    /// Send one request. The URI must be absolute.
    pub async fn send(
        &self,
        request: Request<Full<Bytes>>,
    ) -> Result<Response<UpstreamBody>, HyperClientError> {
        self.inner.clone().oneshot(request).await
    }
}

impl fmt::Debug for UpstreamClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpstreamClient").finish_non_exhaustive()
    }
}

/// Build the client used for every upstream call.
pub fn build_upstream_client(
    upstream: &UpstreamConfig,
    timeouts: &TimeoutConfig,
) -> Result<UpstreamClient, ClientError> {
    let mut http = HttpConnector::new();
    http.enforce_http(false);
    http.set_connect_timeout(Some(Duration::from_secs(timeouts.connect_secs)));

    let provider = Arc::new(ring::default_provider());
    let tls = if upstream.accept_invalid_certs {
        HttpsConnectorBuilder::new().with_tls_config(insecure_tls_config(provider)?)
    } else {
        HttpsConnectorBuilder::new().with_provider_and_webpki_roots(provider)?
    };
    let connector = tls.https_or_http().enable_http1().wrap_connector(http);

    let client = Client::builder(TokioExecutor::new()).build(connector);
    Ok(UpstreamClient {
        inner: Decompression::new(client),
    })
}

fn insecure_tls_config(provider: Arc<CryptoProvider>) -> Result<ClientConfig, rustls::Error> {
    Ok(ClientConfig::builder_with_provider(provider.clone())
        .with_safe_default_protocol_versions()?
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(AcceptAnyCertificate(provider)))
        .with_no_client_auth())
}

/// Trusts any certificate chain and name. Handshake signatures are still
/// checked so the peer must hold the key for the certificate it sent.
#[derive(Debug)]
struct AcceptAnyCertificate(Arc<CryptoProvider>);

impl ServerCertVerifier for AcceptAnyCertificate {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls12_signature(message, cert, dss, &self.0.signature_verification_algorithms)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(message, cert, dss, &self.0.signature_verification_algorithms)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.0.signature_verification_algorithms.supported_schemes()
    }
}
