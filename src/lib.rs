// src/lib.rs

//! # credential-seal
//!
//! Issuance and verification of wallet-signed credentials, plus a small
//! time-capsule store.
//!
//! ## Architecture Overview
//! 1. **Credential Layer**: canonical encoding, Keccak-256 digest, signer capability, verification
//! 2. **Wallet Layer**: local secp256k1 keys and prompt-mediated signing
//! 3. **Storage Layer**: credential repository interface and capsule store
//! 4. **Services Layer**: issuer, verifier and the HTTP API

pub mod config;
pub mod credential; // Canonicalize, digest, sign-request, verify
pub mod error;
pub mod models; // Data structures
pub mod services; // Business logic and API
pub mod storage; // Persistence interfaces
pub mod utils; // Helper functions
pub mod wallet; // Signing agents

pub use error::{Error, Result};
