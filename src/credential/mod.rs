// src/credential/mod.rs
//! Credential signing and verification.
//!
//! One function set covers the whole protocol:
//! - [`canonicalize`]: deterministic bytes from the six signed fields
//! - [`digest`]: Keccak-256 of those bytes
//! - [`CredentialSigner`]: the external agent that signs a digest
//! - [`verify_record`]: recover the signer and decide the current status

pub mod canonical;
pub mod digest;
pub mod signer;
pub mod verify;

pub use canonical::{canonicalize, CANONICAL_DOMAIN};
pub use digest::{digest, CredentialDigest};
pub use signer::{
    format_signature, normalize_recovery_id, parse_signature, recover_signer, CredentialSigner,
    SignatureResponse, SigningError,
};
pub use verify::{verify_record, verify_record_at, verify_signed_fields, VerificationReport};
