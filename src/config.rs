// src/config.rs
//! Application configuration.
//!
//! Values are layered, later sources winning:
//! 1. built-in defaults
//! 2. optional `config/default.toml`
//! 3. `CREDENTIAL_SEAL_*` environment variables (a `.env` file is loaded
//!    into the environment first by `main`)
//!
//! ## Recognised keys
//! - `bind_address`: HTTP listen address (default `127.0.0.1:3000`)
//! - `private_key`: hex secp256k1 key for the server signer (optional)
//! - `signing_timeout_secs`: signing timeout, `0` waits indefinitely (default 120)
//! - `default_chain_id`: chain id used when a request omits one (default 1)

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::net::SocketAddr;
use std::time::Duration;

pub const ENV_PREFIX: &str = "CREDENTIAL_SEAL";

#[derive(Deserialize, Clone)]
pub struct AppConfig {
    pub bind_address: SocketAddr,
    #[serde(default)]
    pub private_key: Option<String>,
    pub signing_timeout_secs: u64,
    pub default_chain_id: u64,
}

impl AppConfig {
    /// Loads configuration from the default file and the environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::builder()?
            .add_source(File::with_name("config/default").required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX))
            .build()?
            .try_deserialize()
    }

    fn builder() -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        Config::builder()
            .set_default("bind_address", "127.0.0.1:3000")?
            .set_default("signing_timeout_secs", 120_i64)?
            .set_default("default_chain_id", 1_i64)
    }

    /// `None` means wait for the signer indefinitely.
    pub fn signing_timeout(&self) -> Option<Duration> {
        match self.signing_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("bind_address", &self.bind_address)
            .field("private_key", &self.private_key.as_ref().map(|_| "<redacted>"))
            .field("signing_timeout_secs", &self.signing_timeout_secs)
            .field("default_chain_id", &self.default_chain_id)
            .finish()
    }
}
