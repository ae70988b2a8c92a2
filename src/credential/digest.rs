// src/credential/digest.rs
//! Keccak-256 digest of the canonical credential bytes.
//!
//! Signing agents sign the digest with EIP-191 `personal_sign` semantics, so
//! the 32-byte hash that actually goes into ECDSA is
//! `keccak256("\x19Ethereum Signed Message:\n32" || digest)`. This is what a
//! browser wallet produces for `signMessage(digestBytes)`.

use super::canonical::{canonicalize, encode_fields};
use crate::error::{Error, Result};
use crate::models::credential::{CredentialDraft, SignedFields};
use crate::utils::crypto::{decode_hex, hash_data, to_prefixed_hex};
use ethers::types::H256;
use ethers::utils::hash_message;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CredentialDigest([u8; 32]);

impl CredentialDigest {
    /// Digest of already-validated fields.
    pub fn of(fields: &SignedFields) -> Self {
        Self::from_canonical(&encode_fields(fields))
    }

    pub fn from_canonical(canonical: &[u8]) -> Self {
        CredentialDigest(hash_data(canonical))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// The EIP-191 prefixed hash a wallet signs for this digest.
    pub fn signing_hash(&self) -> H256 {
        hash_message(self.0)
    }

    pub fn to_hex(&self) -> String {
        to_prefixed_hex(&self.0)
    }

    /// Parses a 0x-hex digest as stored alongside a credential.
    pub fn from_hex(value: &str) -> Result<Self> {
        let bytes = decode_hex("digest", value)?;
        let array: [u8; 32] = bytes.try_into().map_err(|b: Vec<u8>| {
            Error::validation("digest", format!("expected 32 bytes, got {}", b.len()))
        })?;
        Ok(CredentialDigest(array))
    }
}

impl fmt::Display for CredentialDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Validates, canonicalizes and hashes a draft.
pub fn digest(draft: &CredentialDraft) -> Result<CredentialDigest> {
    Ok(CredentialDigest::from_canonical(&canonicalize(draft)?))
}
