//! Shared utilities for integration and load testing.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use hmac_proxy::config::{ProxyConfig, Secret};
use hmac_proxy::net::bind_loopback;
use hmac_proxy::{HttpServer, Shutdown};
use sha2::{Digest, Sha256};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

pub const SECRET: &[u8] = b"SECRET_HERE";

/// A request as it arrived at the mock upstream.
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub method: String,
    pub target: String,
    /// Lowercased names, in arrival order.
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl CapturedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

/// What the mock upstream does after reading a request.
#[allow(dead_code)]
pub enum MockReply {
    /// Write these raw bytes, then close.
    Respond(Vec<u8>),
    /// Sleep, then write the raw bytes.
    Delayed(Duration, Vec<u8>),
    /// Close the connection without answering.
    Hangup,
}

pub struct MockUpstream {
    pub addr: SocketAddr,
    captured: Arc<Mutex<Vec<CapturedRequest>>>,
}

#[allow(dead_code)]
impl MockUpstream {
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn requests(&self) -> Vec<CapturedRequest> {
        self.captured.lock().unwrap().clone()
    }

    pub fn last_request(&self) -> CapturedRequest {
        self.requests().pop().expect("upstream saw no request")
    }
}

/// Raw HTTP/1.1 response with a `Content-Length` and `Connection: close`.
pub fn http_response(status: &str, headers: &[(&str, &str)], body: &[u8]) -> Vec<u8> {
    let mut raw = format!("HTTP/1.1 {status}\r\n");
    for (name, value) in headers {
        raw.push_str(&format!("{name}: {value}\r\n"));
    }
    raw.push_str(&format!(
        "Content-Length: {}\r\nConnection: close\r\n\r\n",
        body.len()
    ));
    let mut raw = raw.into_bytes();
    raw.extend_from_slice(body);
    raw
}

/// Start a programmable mock upstream that records every request it reads.
pub async fn start_mock_upstream<F>(respond: F) -> MockUpstream
where
    F: Fn(&CapturedRequest) -> MockReply + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let captured = Arc::new(Mutex::new(Vec::new()));
    let respond = Arc::new(respond);

    let log = captured.clone();
    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            let respond = respond.clone();
            let log = log.clone();
            tokio::spawn(async move {
                let mut reader = BufReader::new(socket);
                let Some(request) = read_request(&mut reader).await else {
                    return;
                };
                let reply = respond(&request);
                log.lock().unwrap().push(request);

                let mut socket = reader.into_inner();
                match reply {
                    MockReply::Respond(raw) => {
                        let _ = socket.write_all(&raw).await;
                    }
                    MockReply::Delayed(delay, raw) => {
                        tokio::time::sleep(delay).await;
                        let _ = socket.write_all(&raw).await;
                    }
                    MockReply::Hangup => return,
                }
                let _ = socket.shutdown().await;
            });
        }
    });

    MockUpstream { addr, captured }
}

async fn read_request(reader: &mut BufReader<TcpStream>) -> Option<CapturedRequest> {
    let mut line = String::new();
    reader.read_line(&mut line).await.ok()?;
    let mut parts = line.trim_end().splitn(3, ' ');
    let method = parts.next()?.to_string();
    let target = parts.next()?.to_string();

    let mut headers = Vec::new();
    loop {
        let mut line = String::new();
        reader.read_line(&mut line).await.ok()?;
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        let (name, value) = line.split_once(':')?;
        headers.push((name.trim().to_ascii_lowercase(), value.trim().to_string()));
    }

    let length = headers
        .iter()
        .find(|(n, _)| n == "content-length")
        .and_then(|(_, v)| v.parse().ok())
        .unwrap_or(0);
    let mut body = vec![0; length];
    reader.read_exact(&mut body).await.ok()?;

    Some(CapturedRequest {
        method,
        target,
        headers,
        body,
    })
}

/// Config pointing at `base_url`, signing with [`SECRET`].
pub fn proxy_config(base_url: &str) -> ProxyConfig {
    let mut config = ProxyConfig::default();
    config.upstream.base_url = base_url.to_string();
    config.upstream.secret = Secret::new(String::from_utf8(SECRET.to_vec()).unwrap());
    config
}

/// Start the proxy on an ephemeral loopback port.
pub async fn start_proxy(config: ProxyConfig) -> (SocketAddr, Shutdown) {
    let server = HttpServer::new(config).expect("proxy config should build");
    let listener = bind_loopback(0).await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    (addr, shutdown)
}

/// Caller-side client: no env proxies, no redirect following.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}

/// Send raw bytes to the proxy and read until it closes the connection.
#[allow(dead_code)]
pub async fn raw_exchange(addr: SocketAddr, request: &[u8]) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(request).await.unwrap();
    let mut response = Vec::new();
    tokio::time::timeout(Duration::from_secs(10), stream.read_to_end(&mut response))
        .await
        .expect("proxy should answer and close")
        .unwrap();
    String::from_utf8_lossy(&response).into_owned()
}

/// Textbook HMAC-SHA256 (RFC 2104) built on plain SHA-256, used as an
/// independent reference for the proxy's signatures.
pub fn reference_signature(key: &[u8], message: &[u8]) -> String {
    const BLOCK: usize = 64;
    let mut block_key = [0u8; BLOCK];
    if key.len() > BLOCK {
        block_key[..32].copy_from_slice(&Sha256::digest(key));
    } else {
        block_key[..key.len()].copy_from_slice(key);
    }

    let ipad: Vec<u8> = block_key.iter().map(|b| b ^ 0x36).collect();
    let opad: Vec<u8> = block_key.iter().map(|b| b ^ 0x5c).collect();
    let inner = Sha256::new().chain_update(&ipad).chain_update(message).finalize();
    let outer = Sha256::new().chain_update(&opad).chain_update(inner).finalize();

    let hex: String = outer.iter().map(|b| format!("{b:02x}")).collect();
    format!("sha256={hex}")
}
