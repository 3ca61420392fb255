//! Configuration management for Kondate
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from a YAML file and environment variables.

use crate::error::{KondateError, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use url::Url;

/// Main configuration structure for Kondate
///
/// Holds everything the relay server and the chat client need: the listen
/// address, the vendor API settings, and the chat client settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Relay server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Vendor AI API configuration
    #[serde(default)]
    pub vendor: VendorConfig,

    /// Chat client configuration
    #[serde(default)]
    pub chat: ChatConfig,
}

/// Relay server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address for the relay
    #[serde(default = "default_server_addr")]
    pub addr: String,
}

fn default_server_addr() -> String {
    "127.0.0.1:3000".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: default_server_addr(),
        }
    }
}

/// Vendor AI API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VendorConfig {
    /// Base URL of the vendor API
    #[serde(default = "default_vendor_api_url")]
    pub api_url: String,

    /// Vendor API credential; `DIFY_API_KEY` overrides this
    #[serde(default)]
    pub api_key: Option<String>,

    /// Timeout for vendor requests (seconds)
    #[serde(default = "default_vendor_timeout")]
    pub timeout_seconds: u64,
}

fn default_vendor_api_url() -> String {
    "https://api.dify.ai/v1".to_string()
}

fn default_vendor_timeout() -> u64 {
    60
}

impl Default for VendorConfig {
    fn default() -> Self {
        Self {
            api_url: default_vendor_api_url(),
            api_key: None,
            timeout_seconds: default_vendor_timeout(),
        }
    }
}

/// Chat client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Base URL of the relay the chat client talks to
    #[serde(default = "default_relay_url")]
    pub relay_url: String,

    /// Local data directory; defaults to the platform data dir.
    /// `KONDATE_DATA_DIR` overrides this.
    #[serde(default)]
    pub data_dir: Option<String>,
}

fn default_relay_url() -> String {
    "http://127.0.0.1:3000".to_string()
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            relay_url: default_relay_url(),
            data_dir: None,
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    ///
    /// A missing file is not an error: defaults apply, which is the common
    /// case for the chat client. After parsing, environment overrides are
    /// applied (`DIFY_API_KEY`, `DIFY_API_URL`).
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use kondate::config::Config;
    ///
    /// # fn main() -> kondate::error::Result<()> {
    /// let config = Config::load("config/config.yaml")?;
    /// config.validate()?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let mut config = if path.exists() {
            let raw = std::fs::read_to_string(path)
                .map_err(|e| KondateError::Config(format!("Failed to read {}: {}", path.display(), e)))?;
            serde_yaml::from_str(&raw)
                .map_err(|e| KondateError::Config(format!("Failed to parse {}: {}", path.display(), e)))?
        } else {
            tracing::debug!("Config file {} not found, using defaults", path.display());
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment-variable overrides to the loaded configuration
    fn apply_env_overrides(&mut self) {
        if let Ok(api_key) = std::env::var("DIFY_API_KEY") {
            if !api_key.trim().is_empty() {
                self.vendor.api_key = Some(api_key);
            }
        }
        if let Ok(api_url) = std::env::var("DIFY_API_URL") {
            if !api_url.trim().is_empty() {
                self.vendor.api_url = api_url;
            }
        }
    }

    /// Validate the configuration
    ///
    /// Checks that addresses and URLs parse and that the vendor timeout is
    /// non-zero. A missing vendor credential is deliberately not an error:
    /// the relay starts without one and reports it through the health
    /// endpoint instead.
    pub fn validate(&self) -> Result<()> {
        self.server
            .addr
            .parse::<SocketAddr>()
            .map_err(|e| KondateError::Config(format!("Invalid server.addr: {}", e)))?;

        Url::parse(&self.vendor.api_url)
            .map_err(|e| KondateError::Config(format!("Invalid vendor.api_url: {}", e)))?;

        Url::parse(&self.chat.relay_url)
            .map_err(|e| KondateError::Config(format!("Invalid chat.relay_url: {}", e)))?;

        if self.vendor.timeout_seconds == 0 {
            return Err(
                KondateError::Config("vendor.timeout_seconds must be positive".to_string()).into(),
            );
        }

        Ok(())
    }
}
