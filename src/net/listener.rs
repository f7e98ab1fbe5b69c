//! Loopback TCP listener.

use std::net::{Ipv4Addr, SocketAddr};

use thiserror::Error;
use tokio::net::TcpListener;

/// Error type for listener operations.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// Failed to bind to address.
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
}

/// Bind `127.0.0.1:<port>`. Port 0 picks an ephemeral port.
pub async fn bind_loopback(port: u16) -> Result<TcpListener, ListenerError> {
    let addr = SocketAddr::from((Ipv4Addr::LOCALHOST, port));
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| ListenerError::Bind { addr, source })?;

    tracing::info!(
        address = %listener.local_addr().unwrap_or(addr),
        "Listener bound"
    );
    Ok(listener)
}
