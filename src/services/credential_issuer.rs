// src/services/credential_issuer.rs
//! Credential Issuer Service
//!
//! Orchestrates issuance: assemble the signed fields, have the connected
//! signing agent sign their digest, check the signature by recovery, then
//! persist the record through the injected repository.

use crate::credential::{
    format_signature, normalize_recovery_id, recover_signer, CredentialDigest, CredentialSigner,
};
use crate::error::{Error, Result};
use crate::models::credential::{CredentialDraft, CredentialRecord};
use crate::storage::credential_repository::CredentialRepository;
use crate::utils::crypto::format_address;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Caller-supplied fields for a new credential. The issuer is always the
/// connected signer's address.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct IssuanceRequest {
    pub title: String,
    pub holder: String,
    #[serde(rename = "type")]
    pub credential_type: String,
    pub expiry_date: String,
    pub chain_id: i64,
}

impl IssuanceRequest {
    fn into_draft(self, issuer: String) -> CredentialDraft {
        CredentialDraft {
            title: self.title,
            issuer,
            holder: self.holder,
            credential_type: self.credential_type,
            expiry_date: self.expiry_date,
            chain_id: self.chain_id,
        }
    }
}

/// Service issuing signed credentials.
///
/// Handles:
/// - signer availability and timeouts
/// - signature checking by public-key recovery
/// - persistence of the issued record
#[derive(Clone)]
pub struct CredentialIssuer {
    repository: Arc<dyn CredentialRepository>,
    signer: Option<Arc<dyn CredentialSigner>>,
    signing_timeout: Option<Duration>,
}

impl CredentialIssuer {
    /// Creates an issuer with no signer connected.
    pub fn new(repository: Arc<dyn CredentialRepository>) -> Self {
        Self {
            repository,
            signer: None,
            signing_timeout: None,
        }
    }

    pub fn with_signer(mut self, signer: Arc<dyn CredentialSigner>) -> Self {
        self.signer = Some(signer);
        self
    }

    /// Bounds how long a signature request may wait. `None` waits forever.
    pub fn with_signing_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.signing_timeout = timeout;
        self
    }

    pub fn has_signer(&self) -> bool {
        self.signer.is_some()
    }

    /// Issues a credential signed by the connected signer.
    ///
    /// Dropping the returned future cancels the pending signature request;
    /// nothing is persisted unless a verified signature came back.
    ///
    /// # Errors
    /// - `SigningUnavailable` if no signer is connected
    /// - `Validation` if a field is malformed (checked before prompting)
    /// - `SigningDeclined` / `SigningFailed` / `SigningTimedOut` from the signer
    /// - `SignerMismatch` if the signature recovers to another address
    pub async fn issue(&self, request: IssuanceRequest) -> Result<CredentialRecord> {
        let signer = self.signer.as_ref().ok_or(Error::SigningUnavailable)?;
        let issuer = signer.address()?;

        let draft = request.into_draft(format_address(issuer));
        let fields = draft.validate()?;
        let digest = CredentialDigest::of(&fields);

        log::debug!("requesting signature from 0x{:x} for digest {}", issuer, digest);
        let sign = signer.sign_digest(&digest);
        let response = match self.signing_timeout {
            Some(limit) => match tokio::time::timeout(limit, sign).await {
                Ok(response) => response,
                Err(_) => {
                    log::warn!("signing request for digest {} timed out after {:?}", digest, limit);
                    return Err(Error::SigningTimedOut(limit));
                }
            },
            None => sign.await,
        }
        .map_err(|e| {
            log::warn!("signing request for digest {} failed: {}", digest, e);
            Error::from(e)
        })?;

        let signature = normalize_recovery_id(response.signature);
        let recovered = recover_signer(&digest, &signature).ok_or_else(|| {
            Error::SigningFailed("signer returned an unrecoverable signature".into())
        })?;
        for expected in [fields.issuer(), response.address] {
            if recovered != expected {
                return Err(Error::SignerMismatch {
                    expected,
                    recovered,
                });
            }
        }

        let record = CredentialRecord::new(
            Uuid::new_v4().to_string(),
            draft,
            format_signature(&signature),
            digest.to_hex(),
            Utc::now(),
        );
        self.repository.insert(record.clone()).await?;

        log::info!(
            "issued credential {} ({}) from 0x{:x} to {} on chain {}",
            record.id(),
            record.fields().credential_type,
            issuer,
            record.fields().holder,
            record.fields().chain_id
        );
        Ok(record)
    }
}
