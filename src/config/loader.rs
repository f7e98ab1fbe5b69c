//! Configuration loading from disk and command-line overrides.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::{ProxyConfig, Secret};
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Values supplied on the command line or through the environment.
/// Each one that is set wins over the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub upstream: Option<String>,
    pub secret: Option<String>,
    pub secret_base64: Option<String>,
    pub port: Option<u16>,
    pub log_level: Option<String>,
}

impl Overrides {
    fn apply(self, config: &mut ProxyConfig) {
        if let Some(upstream) = self.upstream {
            config.upstream.base_url = upstream;
        }
        // A key given here replaces the file's key in either form.
        if let Some(secret) = self.secret {
            config.upstream.secret = Secret::new(secret);
            config.upstream.secret_base64 = None;
        }
        if let Some(encoded) = self.secret_base64 {
            config.upstream.secret = Secret::default();
            config.upstream.secret_base64 = Some(Secret::new(encoded));
        }
        if let Some(port) = self.port {
            config.listener.port = port;
        }
        if let Some(level) = self.log_level {
            config.observability.log_level = level;
        }
    }
}

/// Parse a TOML document into a configuration without validating it.
pub fn parse_config(content: &str) -> Result<ProxyConfig, ConfigError> {
    Ok(toml::from_str(content)?)
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ProxyConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    finalize(parse_config(&content)?)
}

/// Build the effective configuration: defaults, then the optional file,
/// then overrides. The result is validated.
pub fn resolve_config(
    path: Option<&Path>,
    overrides: Overrides,
) -> Result<ProxyConfig, ConfigError> {
    let mut config = match path {
        Some(path) => parse_config(&fs::read_to_string(path)?)?,
        None => ProxyConfig::default(),
    };
    overrides.apply(&mut config);
    finalize(config)
}

fn finalize(mut config: ProxyConfig) -> Result<ProxyConfig, ConfigError> {
    // "https://host/" and "https://host" name the same upstream; keep the
    // form that concatenates cleanly with an inbound "/path".
    if let Some(trimmed) = config.upstream.base_url.strip_suffix('/') {
        config.upstream.base_url = trimmed.to_string();
    }

    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}
