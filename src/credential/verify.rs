// src/credential/verify.rs
//! Credential verification.
//!
//! Verification recomputes the digest from the persisted field values,
//! recovers the signer from the signature and compares it with the recorded
//! issuer, then checks expiry. It needs no private key and has no side
//! effects. Given the same record and the same `now` it always returns the
//! same report.
//!
//! Status priority when several conditions hold: `expired`, then `invalid`,
//! then `verified`. The report keeps `signature_valid` and `expired`
//! separately so callers can tell an expired genuine credential from an
//! expired forged one.

use super::digest::CredentialDigest;
use super::signer::{parse_signature, recover_signer};
use crate::error::Result;
use crate::models::credential::{CredentialDraft, CredentialRecord, VerificationStatus};
use chrono::{DateTime, Utc};
use ethers::types::Address;
use serde::Serialize;

/// Outcome of one verification pass.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VerificationReport {
    pub status: VerificationStatus,
    /// Signature recovers to the recorded issuer over the recomputed digest
    pub signature_valid: bool,
    pub expired: bool,
    /// Address recovered from the signature, if recovery succeeded
    pub recovered_signer: Option<Address>,
    pub checked_at: DateTime<Utc>,
}

/// Verifies a set of signed fields against a signature.
///
/// `stored_digest` is the digest recorded at issuance, if any; when present
/// it must decode, and a mismatch with the recomputed digest makes the
/// credential invalid.
///
/// # Errors
/// Only malformed input is an error: invalid fields, a missing or
/// undecodable signature, or an undecodable stored digest.
pub fn verify_signed_fields(
    fields: &CredentialDraft,
    signature: &str,
    stored_digest: Option<&str>,
    now: DateTime<Utc>,
) -> Result<VerificationReport> {
    let signed = fields.validate()?;
    let signature = parse_signature(signature)?;
    let stored_digest = stored_digest.map(CredentialDigest::from_hex).transpose()?;

    let digest = CredentialDigest::of(&signed);
    let recovered_signer = recover_signer(&digest, &signature);

    let digest_matches = stored_digest.map_or(true, |stored| stored == digest);
    // Address equality is byte equality, so hex casing in the record is irrelevant.
    let signature_valid = digest_matches && recovered_signer == Some(signed.issuer());
    let expired = signed.is_expired_at(now);
    let status = resolve_status(expired, signature_valid);

    log::debug!(
        "verified credential digest {}: status={} signature_valid={} expired={}",
        digest,
        status,
        signature_valid,
        expired
    );

    Ok(VerificationReport {
        status,
        signature_valid,
        expired,
        recovered_signer,
        checked_at: now,
    })
}

/// Verifies a persisted record as of `now`.
pub fn verify_record_at(record: &CredentialRecord, now: DateTime<Utc>) -> Result<VerificationReport> {
    verify_signed_fields(record.fields(), record.signature(), record.digest(), now)
}

/// Verifies a persisted record against the current wall-clock time.
pub fn verify_record(record: &CredentialRecord) -> Result<VerificationReport> {
    verify_record_at(record, Utc::now())
}

fn resolve_status(expired: bool, signature_valid: bool) -> VerificationStatus {
    if expired {
        VerificationStatus::Expired
    } else if !signature_valid {
        VerificationStatus::Invalid
    } else {
        VerificationStatus::Verified
    }
}
