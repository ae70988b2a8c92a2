// src/main.rs

//! # credential-seal - Main Entry Point
//!
//! Loads configuration, sets up logging, wires the credential services and
//! starts the API server.
//!
//! ## Environment Variables
//! - `CREDENTIAL_SEAL_PRIVATE_KEY`: (Optional) hex key of the server signer;
//!   without it issuance answers "signing unavailable"
//! - `CREDENTIAL_SEAL_BIND_ADDRESS`: (Optional) default `127.0.0.1:3000`
//! - `CREDENTIAL_SEAL_SIGNING_TIMEOUT_SECS`: (Optional) default 120, 0 disables
//! - `CREDENTIAL_SEAL_DEFAULT_CHAIN_ID`: (Optional) default 1
//! - `RUST_LOG`: (Optional) log filter, default `info`

use anyhow::Context;
use credential_seal::config::AppConfig;
use credential_seal::services::api_server::ApiServer;
use credential_seal::services::credential_issuer::CredentialIssuer;
use credential_seal::storage::credential_repository::InMemoryCredentialRepository;
use credential_seal::wallet::key_management::KeyManager;
use dotenv::dotenv;
use std::sync::Arc;

/// Main application entry point
///
/// # Initialization Sequence
/// 1. Load environment configuration
/// 2. Initialize logging
/// 3. Initialize service components
/// 4. Start API server
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = AppConfig::load().context("failed to load configuration")?;
    log::debug!("loaded {:?}", config);

    let repository = Arc::new(InMemoryCredentialRepository::new());
    let mut credential_issuer =
        CredentialIssuer::new(repository.clone()).with_signing_timeout(config.signing_timeout());

    match config.private_key.as_deref() {
        Some(key) => {
            let keys = KeyManager::from_private_key(key).context("invalid signer key")?;
            log::info!("server signer address 0x{:x}", keys.address());
            credential_issuer = credential_issuer.with_signer(Arc::new(keys));
        }
        None => log::warn!("no signer key configured; issuance requests will be refused"),
    }

    let api_server = ApiServer::new(credential_issuer, repository, config.default_chain_id);

    log::info!("Available endpoints:");
    log::info!("- POST   /credentials");
    log::info!("- GET    /credentials?holder=0x...");
    log::info!("- POST   /credentials/verify");
    log::info!("- GET    /credentials/:id");
    log::info!("- DELETE /credentials/:id");
    log::info!("- POST   /credentials/:id/verify");
    log::info!("- POST   /capsules");
    log::info!("- GET    /capsules?state=locked|unlocked&type=...&viewer=0x...");
    log::info!("- GET    /capsules/:id");
    log::info!("- PATCH  /capsules/:id");
    log::info!("- DELETE /capsules/:id");
    log::info!("- POST   /capsules/:id/view");
    log::info!("- POST   /capsules/:id/comments");
    log::info!("- POST   /capsules/:id/reactions");
    log::info!("- GET    /dids/:subject");

    api_server
        .run(config.bind_address)
        .await
        .context("API server terminated")
}
