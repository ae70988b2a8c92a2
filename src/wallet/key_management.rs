// src/wallet/key_management.rs
//! Local secp256k1 key management.
//!
//! [`KeyManager`] is the in-process signing agent: it holds one secp256k1
//! key and signs credential digests without any user prompt. It backs the
//! HTTP issuance endpoint and the tests; a browser wallet would implement
//! [`CredentialSigner`] instead.
//!
//! Uses the following cryptographic primitives:
//! - secp256k1 curve (via `k256` crate)
//! - Keccak-256 hashing and EIP-191 message signing (via `ethers` crate)
//! - Cryptographically secure random number generation

use crate::credential::{CredentialDigest, CredentialSigner, SignatureResponse, SigningError};
use crate::error::{Error, Result};
use async_trait::async_trait;
use ethers::signers::{LocalWallet, Signer};
use ethers::types::{Address, Signature};
use k256::ecdsa::SigningKey;
use std::fmt;
use std::str::FromStr;

/// Key management for a single secp256k1 signing key.
///
/// # Security Notes
/// - The secret key is never exposed
/// - Signatures are deterministic ECDSA (RFC 6979)
#[derive(Clone)]
pub struct KeyManager {
    wallet: LocalWallet,
}

impl KeyManager {
    /// Generates a KeyManager with a fresh random key.
    pub fn generate() -> Self {
        let signing_key = SigningKey::random(&mut rand::thread_rng());
        KeyManager {
            wallet: LocalWallet::from(signing_key),
        }
    }

    /// Loads a key from hex (with or without a 0x prefix).
    ///
    /// # Errors
    /// Returns a validation error if the hex is malformed or not a valid
    /// secp256k1 scalar. The key material is never echoed back.
    pub fn from_private_key(private_key: &str) -> Result<Self> {
        let digits = private_key.trim().trim_start_matches("0x");
        let wallet = LocalWallet::from_str(digits)
            .map_err(|_| Error::validation("private_key", "not a valid secp256k1 private key"))?;
        Ok(KeyManager { wallet })
    }

    /// Ethereum address derived from the public key.
    pub fn address(&self) -> Address {
        self.wallet.address()
    }

    /// Signs a digest with EIP-191 personal-message semantics.
    pub fn sign(&self, digest: &CredentialDigest) -> Result<Signature> {
        self.wallet
            .sign_hash(digest.signing_hash())
            .map_err(|e| Error::SigningFailed(e.to_string()))
    }
}

impl fmt::Debug for KeyManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyManager")
            .field("address", &self.address())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl CredentialSigner for KeyManager {
    fn address(&self) -> std::result::Result<Address, SigningError> {
        Ok(KeyManager::address(self))
    }

    async fn sign_digest(
        &self,
        digest: &CredentialDigest,
    ) -> std::result::Result<SignatureResponse, SigningError> {
        let signature = self
            .sign(digest)
            .map_err(|e| SigningError::Failed(e.to_string()))?;
        Ok(SignatureResponse {
            signature,
            address: KeyManager::address(self),
        })
    }
}
