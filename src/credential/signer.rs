// src/credential/signer.rs
//! Signing-agent capability.
//!
//! This crate never holds an issuer's key on the issuance path. It asks a
//! [`CredentialSigner`] (a connected wallet, a key-management service, or
//! the local [`KeyManager`](crate::wallet::key_management::KeyManager)) to
//! sign a digest, then checks the answer by public-key recovery.

use super::digest::CredentialDigest;
use crate::error::{Error, Result};
use crate::utils::crypto::{decode_hex, to_prefixed_hex};
use async_trait::async_trait;
use ethers::types::{Address, RecoveryMessage, Signature};
use thiserror::Error;

/// What a signing agent returns for a digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureResponse {
    pub signature: Signature,
    /// Address the agent claims to have signed with
    pub address: Address,
}

/// Failure modes of a signing agent.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SigningError {
    /// The key holder refused or abandoned the request.
    #[error("declined: {0}")]
    Declined(String),

    /// No key holder is connected.
    #[error("signer unavailable")]
    Unavailable,

    #[error("signer failed: {0}")]
    Failed(String),
}

impl From<SigningError> for Error {
    fn from(e: SigningError) -> Self {
        match e {
            SigningError::Declined(reason) => Error::SigningDeclined(reason),
            SigningError::Unavailable => Error::SigningUnavailable,
            SigningError::Failed(reason) => Error::SigningFailed(reason),
        }
    }
}

/// An external agent able to sign credential digests.
///
/// `sign_digest` may wait on a human decision and may never complete;
/// callers bound it with a timeout or drop the future to cancel.
#[async_trait]
pub trait CredentialSigner: Send + Sync {
    /// The address this agent signs with. Must not prompt.
    fn address(&self) -> std::result::Result<Address, SigningError>;

    /// Signs `digest` with EIP-191 personal-message semantics.
    async fn sign_digest(
        &self,
        digest: &CredentialDigest,
    ) -> std::result::Result<SignatureResponse, SigningError>;
}

/// Recovery ids accepted in the `v` byte of a personal-message signature.
const RECOVERY_V: [u64; 2] = [27, 28];

/// Recovers the address that produced `signature` over `digest`.
///
/// Returns `None` when the signature does not describe a valid curve point
/// or when `v` is anything other than 27 or 28. Ethers would otherwise fold
/// EIP-155 style values back onto a recovery id, so a corrupted `v` could
/// still recover the original signer.
pub fn recover_signer(digest: &CredentialDigest, signature: &Signature) -> Option<Address> {
    if !RECOVERY_V.contains(&signature.v) {
        return None;
    }
    signature
        .recover(RecoveryMessage::Data(digest.as_bytes().to_vec()))
        .ok()
}

/// Parses a stored 65-byte `r || s || v` signature.
///
/// Wallets that emit a bare recovery id (`v` of 0 or 1) are normalized to
/// 27 or 28. Any other `v` is kept as is and fails recovery later.
pub fn parse_signature(value: &str) -> Result<Signature> {
    if value.trim().is_empty() {
        return Err(Error::validation("signature", "missing"));
    }
    let bytes = decode_hex("signature", value)?;
    if bytes.len() != 65 {
        return Err(Error::validation(
            "signature",
            format!("expected 65 bytes, got {}", bytes.len()),
        ));
    }
    Signature::try_from(bytes.as_slice())
        .map(normalize_recovery_id)
        .map_err(|e| Error::validation("signature", e.to_string()))
}

/// Maps a bare recovery id (`v` of 0 or 1) onto 27 or 28.
pub fn normalize_recovery_id(mut signature: Signature) -> Signature {
    if signature.v < 2 {
        signature.v += 27;
    }
    signature
}

pub fn format_signature(signature: &Signature) -> String {
    to_prefixed_hex(&signature.to_vec())
}
