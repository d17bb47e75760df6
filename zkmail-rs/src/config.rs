use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub server: ServerConfig,
    pub federation: FederationConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    pub listen_addr: String,
    /// Domain used for synthesized addresses when the request host is
    /// a bare loopback name (local development parity).
    pub domain: String,
    /// This server's own mail-exchange identity. A recipient host whose
    /// MX target equals this value is delivered locally.
    pub mx_host: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FederationConfig {
    /// Scheme used for outbound key lookups ("https" in production).
    pub scheme: String,
    /// Global deadline for one whole fan-out round, in seconds.
    pub lookup_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    pub database_url: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| crate::error::MailError::Config(e.to_string()))?;

        toml::from_str(&content)
            .map_err(|e| crate::error::MailError::Config(e.to_string()))
    }

    pub fn default() -> Self {
        Self {
            server: ServerConfig {
                listen_addr: "0.0.0.0:8888".to_string(),
                domain: "zkmail.local".to_string(),
                mx_host: "mx.zkmail.local".to_string(),
            },
            federation: FederationConfig {
                scheme: "https".to_string(),
                lookup_timeout_secs: 5,
            },
            storage: StorageConfig {
                database_url: "sqlite://zkmail.db".to_string(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        }
    }
}
