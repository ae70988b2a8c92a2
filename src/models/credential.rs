// src/models/credential.rs
//! Signed credential data model.
//!
//! A credential is signed over exactly six fields (title, issuer, holder,
//! type, expiry date, chain id). [`CredentialDraft`] carries them as raw
//! input, [`SignedFields`] is their validated form, and [`CredentialRecord`]
//! is what gets persisted once a signature exists.

use crate::error::{Error, Result};
use crate::utils::crypto::parse_address;
use chrono::{DateTime, SecondsFormat, Utc};
use ethers::types::Address;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The six signed credential fields, as supplied by a caller or read back
/// from storage.
///
/// Nothing here is validated. `chain_id` is signed so that a negative value
/// coming from JSON reaches validation instead of failing deserialization.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CredentialDraft {
    /// Human-readable label, e.g. "BSc CS"
    pub title: String,

    /// Address of the signer vouching for the claim
    pub issuer: String,

    /// Address of the subject/owner of the credential
    pub holder: String,

    /// Free-form category tag, e.g. "academic"
    #[serde(rename = "type")]
    pub credential_type: String,

    /// ISO-8601 / RFC 3339 timestamp after which the credential is expired
    pub expiry_date: String,

    /// Network the signature is scoped to
    pub chain_id: i64,
}

impl CredentialDraft {
    /// Validates every signed field and converts it to its typed form.
    pub fn validate(&self) -> Result<SignedFields> {
        let title = non_empty("title", &self.title)?;
        let credential_type = non_empty("type", &self.credential_type)?;
        let issuer = parse_address("issuer", &self.issuer)?;
        let holder = parse_address("holder", &self.holder)?;
        let expiry = parse_expiry(&self.expiry_date)?;
        let chain_id = u64::try_from(self.chain_id)
            .map_err(|_| Error::validation("chainId", "must be a non-negative integer"))?;

        Ok(SignedFields {
            title,
            issuer,
            holder,
            credential_type,
            expiry,
            chain_id,
        })
    }
}

fn non_empty(field: &str, value: &str) -> Result<String> {
    if value.trim().is_empty() {
        return Err(Error::validation(field, "must not be empty"));
    }
    Ok(value.to_string())
}

/// Parses an RFC 3339 timestamp and normalizes it to UTC.
pub fn parse_expiry(value: &str) -> Result<DateTime<Utc>> {
    if value.trim().is_empty() {
        return Err(Error::validation("expiryDate", "must not be empty"));
    }
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            Error::validation(
                "expiryDate",
                format!("expected an ISO-8601 timestamp such as 2030-01-01T00:00:00Z: {}", e),
            )
        })
}

/// Validated, typed signed fields. Only obtainable through
/// [`CredentialDraft::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedFields {
    pub(crate) title: String,
    pub(crate) issuer: Address,
    pub(crate) holder: Address,
    pub(crate) credential_type: String,
    pub(crate) expiry: DateTime<Utc>,
    pub(crate) chain_id: u64,
}

impl SignedFields {
    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn issuer(&self) -> Address {
        self.issuer
    }

    pub fn holder(&self) -> Address {
        self.holder
    }

    pub fn credential_type(&self) -> &str {
        &self.credential_type
    }

    pub fn expiry(&self) -> DateTime<Utc> {
        self.expiry
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Expiry rendered as a UTC ISO-8601 string with a `Z` suffix.
    pub fn expiry_iso(&self) -> String {
        self.expiry.to_rfc3339_opts(SecondsFormat::AutoSi, true)
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expiry
    }
}

/// Derived verification state. Never used as input to a verification
/// decision.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum VerificationStatus {
    #[default]
    Unverified,
    Verified,
    Expired,
    Invalid,
}

impl fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            VerificationStatus::Unverified => "unverified",
            VerificationStatus::Verified => "verified",
            VerificationStatus::Expired => "expired",
            VerificationStatus::Invalid => "invalid",
        };
        f.write_str(label)
    }
}

/// A persisted, signed credential.
///
/// Signed fields have no setters: the only way to change them is to issue a
/// new credential. The verification cache (`verificationStatus` and friends)
/// is the only mutable part.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CredentialRecord {
    id: String,

    #[serde(flatten)]
    fields: CredentialDraft,

    /// 65-byte r || s || v signature, 0x-hex
    #[serde(default)]
    signature: String,

    /// Digest recorded at issuance, 0x-hex
    #[serde(default, skip_serializing_if = "Option::is_none")]
    digest: Option<String>,

    issued_at: DateTime<Utc>,

    #[serde(default)]
    verification_status: VerificationStatus,

    #[serde(default)]
    verification_count: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_verified_at: Option<DateTime<Utc>>,
}

impl CredentialRecord {
    pub(crate) fn new(
        id: String,
        fields: CredentialDraft,
        signature: String,
        digest: String,
        issued_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            fields,
            signature,
            digest: Some(digest),
            issued_at,
            verification_status: VerificationStatus::Unverified,
            verification_count: 0,
            last_verified_at: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// The persisted signed field values.
    pub fn fields(&self) -> &CredentialDraft {
        &self.fields
    }

    pub fn signature(&self) -> &str {
        &self.signature
    }

    pub fn digest(&self) -> Option<&str> {
        self.digest.as_deref()
    }

    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    /// Last cached verification outcome.
    pub fn verification_status(&self) -> VerificationStatus {
        self.verification_status
    }

    pub fn verification_count(&self) -> u64 {
        self.verification_count
    }

    pub fn last_verified_at(&self) -> Option<DateTime<Utc>> {
        self.last_verified_at
    }

    /// Caches a verification outcome on the record.
    pub fn record_verification(&mut self, status: VerificationStatus, at: DateTime<Utc>) {
        self.verification_status = status;
        self.verification_count += 1;
        self.last_verified_at = Some(at);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn draft() -> CredentialDraft {
        CredentialDraft {
            title: "BSc CS".into(),
            issuer: "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266".into(),
            holder: "0x70997970C51812dc3A010C7d01b50e0d17dc79C8".into(),
            credential_type: "academic".into(),
            expiry_date: "2030-01-01T00:00:00Z".into(),
            chain_id: 1,
        }
    }

    #[test]
    fn test_validate_accepts_well_formed_draft() {
        let fields = draft().validate().unwrap();
        assert_eq!(fields.title(), "BSc CS");
        assert_eq!(fields.chain_id(), 1);
        assert_eq!(fields.expiry(), Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(fields.expiry_iso(), "2030-01-01T00:00:00Z");
    }

    #[test]
    fn test_validate_rejects_empty_strings() {
        let mut blank_title = draft();
        blank_title.title = "   ".into();
        assert!(matches!(
            blank_title.validate(),
            Err(Error::Validation { field, .. }) if field == "title"
        ));

        let mut blank_type = draft();
        blank_type.credential_type = String::new();
        assert!(matches!(
            blank_type.validate(),
            Err(Error::Validation { field, .. }) if field == "type"
        ));
    }

    #[test]
    fn test_validate_rejects_negative_chain_id() {
        let mut d = draft();
        d.chain_id = -1;
        assert!(matches!(
            d.validate(),
            Err(Error::Validation { field, .. }) if field == "chainId"
        ));
    }

    #[test]
    fn test_validate_rejects_locale_formatted_dates() {
        for bad in ["1/1/2030", "January 1, 2030", "2030-01-01", ""] {
            let mut d = draft();
            d.expiry_date = bad.into();
            assert!(
                matches!(d.validate(), Err(Error::Validation { ref field, .. }) if field == "expiryDate"),
                "accepted {:?}",
                bad
            );
        }
    }

    #[test]
    fn test_expiry_normalizes_offsets_to_utc() {
        let mut d = draft();
        d.expiry_date = "2030-01-01T01:00:00+01:00".into();
        assert_eq!(d.validate().unwrap().expiry_iso(), "2030-01-01T00:00:00Z");
    }

    #[test]
    fn test_expiry_boundary_counts_as_expired() {
        let fields = draft().validate().unwrap();
        let expiry = fields.expiry();
        assert!(!fields.is_expired_at(expiry - chrono::Duration::seconds(1)));
        assert!(fields.is_expired_at(expiry));
    }

    #[test]
    fn test_draft_uses_camel_case_wire_names() {
        let json = serde_json::to_value(draft()).unwrap();
        assert_eq!(json["type"], "academic");
        assert_eq!(json["expiryDate"], "2030-01-01T00:00:00Z");
        assert_eq!(json["chainId"], 1);
    }

    #[test]
    fn test_record_verification_updates_cache_only() {
        let mut record = CredentialRecord::new(
            "id-1".into(),
            draft(),
            "0x00".into(),
            "0x11".into(),
            Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
        );
        let at = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
        record.record_verification(VerificationStatus::Verified, at);
        record.record_verification(VerificationStatus::Verified, at);

        assert_eq!(record.verification_status(), VerificationStatus::Verified);
        assert_eq!(record.verification_count(), 2);
        assert_eq!(record.last_verified_at(), Some(at));
        assert_eq!(record.fields(), &draft());
    }
}
