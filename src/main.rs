//! HMAC Signing Proxy
//!
//! Sits between a client that cannot sign its requests and a service that
//! insists on an HMAC header.
//!
//! # Architecture Overview
//!
//! ```text
//!                    ┌──────────────────────────────────────────────┐
//!                    │                 HMAC PROXY                    │
//!   Caller           │  ┌──────────┐   ┌─────────┐   ┌───────────┐  │
//!   ─────────────────┼─▶│   net    │──▶│  http   │──▶│  relay    │──┼──▶ Upstream
//!   127.0.0.1:8090   │  │ listener │   │ server  │   │ sign+fwd  │  │   (fixed base URL)
//!                    │  └──────────┘   └─────────┘   └─────┬─────┘  │
//!   ◀────────────────┼───────────── filtered response ◀────┘        │
//!                    │                                               │
//!                    │  config · observability · lifecycle           │
//!                    └──────────────────────────────────────────────┘
//! ```

use std::io::Read;
use std::path::PathBuf;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use clap::{Args, Parser, Subcommand};

use hmac_proxy::config::{load_config, resolve_config, Overrides};
use hmac_proxy::lifecycle::{wait_for_signal, Shutdown};
use hmac_proxy::net::bind_loopback;
use hmac_proxy::observability::{logging, metrics};
use hmac_proxy::{HttpServer, Signer};

#[derive(Parser)]
#[command(name = "hmac-proxy", version)]
#[command(about = "Local proxy that signs request bodies with HMAC-SHA256 and forwards them upstream")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    serve: ServeArgs,
}

#[derive(Subcommand)]
enum Command {
    /// Run the proxy (the default)
    Serve(ServeArgs),
    /// Sign a payload from a file or stdin and print the header value
    Sign(SignArgs),
    /// Load and validate a configuration file
    CheckConfig {
        /// TOML configuration file
        config: PathBuf,
    },
}

#[derive(Args)]
struct ServeArgs {
    /// TOML configuration file
    #[arg(short, long, env = "HMAC_PROXY_CONFIG")]
    config: Option<PathBuf>,

    /// Upstream base URL, scheme and host only (e.g. https://api.example.com)
    #[arg(short, long, env = "HMAC_PROXY_UPSTREAM")]
    upstream: Option<String>,

    /// Pre-shared HMAC key
    #[arg(short, long, env = "HMAC_PROXY_SECRET", hide_env_values = true)]
    secret: Option<String>,

    /// Pre-shared HMAC key as base64, for keys that are not UTF-8 text
    #[arg(
        long,
        env = "HMAC_PROXY_SECRET_BASE64",
        hide_env_values = true,
        conflicts_with = "secret"
    )]
    secret_base64: Option<String>,

    /// Loopback port to listen on
    #[arg(short, long, env = "HMAC_PROXY_PORT")]
    port: Option<u16>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,
}

#[derive(Args)]
struct SignArgs {
    #[command(flatten)]
    key: SignKey,

    /// Payload file; stdin when omitted
    #[arg(short, long)]
    file: Option<PathBuf>,
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct SignKey {
    /// Pre-shared HMAC key
    #[arg(short, long, env = "HMAC_PROXY_SECRET", hide_env_values = true)]
    secret: Option<String>,

    /// Pre-shared HMAC key as base64
    #[arg(long, env = "HMAC_PROXY_SECRET_BASE64", hide_env_values = true)]
    secret_base64: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        None => serve(cli.serve).await,
        Some(Command::Serve(args)) => serve(args).await,
        Some(Command::Sign(args)) => sign(args),
        Some(Command::CheckConfig { config }) => {
            let config = load_config(&config)?;
            println!(
                "configuration OK: 127.0.0.1:{} -> {}",
                config.listener.port, config.upstream.base_url
            );
            Ok(())
        }
    }
}

async fn serve(args: ServeArgs) -> Result<(), Box<dyn std::error::Error>> {
    let overrides = Overrides {
        upstream: args.upstream,
        secret: args.secret,
        secret_base64: args.secret_base64,
        port: args.port,
        log_level: args.log_level,
    };
    let config = resolve_config(args.config.as_deref(), overrides)?;

    logging::init_logging(&config.observability).map_err(|e| e as Box<dyn std::error::Error>)?;

    tracing::info!("hmac-proxy v{} starting", env!("CARGO_PKG_VERSION"));
    let key_bytes = config.upstream.signing_key()?.len();
    tracing::info!(
        upstream = %config.upstream.base_url,
        signature_header = %config.upstream.signature_header,
        key_bytes,
        upstream_timeout_secs = config.timeouts.upstream_secs,
        "Configuration loaded"
    );
    if key_bytes == 0 {
        tracing::warn!("Signing key is empty; set upstream.secret or --secret");
    }
    if config.upstream.accept_invalid_certs {
        tracing::warn!(
            "Upstream TLS certificate validation is DISABLED; use only against test endpoints"
        );
    }

    if config.observability.metrics_enabled {
        let addr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr)?;
    }

    let listener = bind_loopback(config.listener.port).await?;
    let server = HttpServer::new(config)?;

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        match wait_for_signal().await {
            Ok(name) => {
                tracing::info!(signal = name, "Shutting down proxy");
                shutdown.trigger();
            }
            Err(e) => {
                // Keep the coordinator alive; dropping it would stop the server.
                tracing::error!(error = %e, "Failed to listen for shutdown signals");
                std::future::pending::<()>().await;
            }
        }
    });

    server.run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

fn sign(args: SignArgs) -> Result<(), Box<dyn std::error::Error>> {
    let payload = match args.file {
        Some(path) => std::fs::read(path)?,
        None => {
            let mut buf = Vec::new();
            std::io::stdin().read_to_end(&mut buf)?;
            buf
        }
    };

    let key = match (args.key.secret, args.key.secret_base64) {
        (_, Some(encoded)) => STANDARD.decode(encoded.trim())?,
        (Some(secret), None) => secret.into_bytes(),
        (None, None) => Vec::new(),
    };

    let signature = Signer::new(&key)?.sign(&payload);
    println!("{signature}");
    Ok(())
}
