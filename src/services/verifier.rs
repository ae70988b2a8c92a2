// src/services/verifier.rs
//! Credential verification service.
//!
//! Verifies credentials held in the repository and caches the derived
//! status back onto the stored record. The decision itself is always
//! recomputed from the signed fields; the cached status is never read.

use crate::credential::{verify_record_at, VerificationReport};
use crate::error::{Error, Result};
use crate::models::credential::CredentialRecord;
use crate::storage::credential_repository::CredentialRepository;
use chrono::{DateTime, Utc};
use ethers::types::Address;
use futures::future::try_join_all;
use std::sync::Arc;

/// Verifier for credentials held in a [`CredentialRepository`].
///
/// The Verifier provides:
/// - Single-record verification with the result cached on the record
/// - Bulk verification of everything a holder owns
#[derive(Clone)]
pub struct Verifier {
    /// Shared credential store, also written by the issuer
    repository: Arc<dyn CredentialRepository>,
}

impl Verifier {
    /// Constructs a new Verifier.
    ///
    /// # Arguments
    /// * `repository` - Store the verified records are read from
    pub fn new(repository: Arc<dyn CredentialRepository>) -> Self {
        Self { repository }
    }

    /// Verifies the stored credential `id` against the current time.
    ///
    /// # Errors
    /// - `NotFound` if no record has this id
    /// - `Validation` if the stored record is malformed
    pub async fn verify_stored(&self, id: &str) -> Result<VerificationReport> {
        self.verify_stored_at(id, Utc::now()).await
    }

    /// Verifies the stored credential `id` as of `now`.
    ///
    /// # Arguments
    /// * `id` - Identifier of the stored record
    /// * `now` - Instant the expiry check is made against
    ///
    /// # Returns
    /// The report, which is also cached on the record.
    ///
    /// # Errors
    /// Same as [`verify_stored`](Self::verify_stored).
    pub async fn verify_stored_at(&self, id: &str, now: DateTime<Utc>) -> Result<VerificationReport> {
        let record = self
            .repository
            .get(id)
            .await?
            .ok_or_else(|| Error::NotFound(id.to_string()))?;
        self.verify_and_cache(&record, now).await
    }

    /// Verifies every credential held by `holder`.
    ///
    /// # Arguments
    /// * `holder` - Holder address
    /// * `now` - Instant the expiry checks are made against
    ///
    /// # Returns
    /// `(id, report)` pairs, newest first. A malformed record fails the
    /// whole call.
    pub async fn verify_holder(
        &self,
        holder: Address,
        now: DateTime<Utc>,
    ) -> Result<Vec<(String, VerificationReport)>> {
        let records = self.repository.list_for_holder(holder).await?;
        try_join_all(records.iter().map(|record| async move {
            let report = self.verify_and_cache(record, now).await?;
            Ok::<_, Error>((record.id().to_string(), report))
        }))
        .await
    }

    async fn verify_and_cache(
        &self,
        record: &CredentialRecord,
        now: DateTime<Utc>,
    ) -> Result<VerificationReport> {
        let report = verify_record_at(record, now)?;
        self.repository.record_verification(record.id(), &report).await?;
        log::info!("credential {} verified as {}", record.id(), report.status);
        Ok(report)
    }
}
