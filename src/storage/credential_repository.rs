// src/storage/credential_repository.rs
//! Persistence interface for issued credentials.
//!
//! Issuance and verification services receive a repository explicitly
//! instead of reaching for process-wide state. The repository only stores
//! records; it cannot rewrite signed fields, only the cached verification
//! outcome.

use crate::credential::VerificationReport;
use crate::error::{Error, Result};
use crate::models::credential::CredentialRecord;
use crate::utils::crypto::parse_address;
use async_trait::async_trait;
use ethers::types::Address;
use std::collections::HashMap;
use std::sync::Mutex;

/// Storage for issued credential records.
///
/// Implementations must be shareable across request handlers; every method
/// takes `&self`.
#[async_trait]
pub trait CredentialRepository: Send + Sync {
    /// Stores a newly issued record.
    ///
    /// # Arguments
    /// * `record` - Record produced by issuance
    ///
    /// # Errors
    /// `Storage` if a record with the same id already exists.
    async fn insert(&self, record: CredentialRecord) -> Result<()>;

    /// Fetches a record by id.
    ///
    /// # Returns
    /// `Ok(None)` if no record has this id.
    async fn get(&self, id: &str) -> Result<Option<CredentialRecord>>;

    /// All records held by `holder`, newest first.
    ///
    /// # Arguments
    /// * `holder` - Holder address; stored hex casing is irrelevant
    async fn list_for_holder(&self, holder: Address) -> Result<Vec<CredentialRecord>>;

    /// Caches a verification outcome on the stored record.
    ///
    /// # Arguments
    /// * `id` - Record to update
    /// * `report` - Outcome whose status and timestamp are cached
    ///
    /// # Errors
    /// `NotFound` if no record has this id.
    async fn record_verification(&self, id: &str, report: &VerificationReport) -> Result<()>;

    /// Removes a record.
    ///
    /// # Returns
    /// `true` if a record was removed.
    async fn delete(&self, id: &str) -> Result<bool>;

    /// Number of stored records.
    async fn count(&self) -> Result<usize>;
}

/// In-memory repository backed by a hashmap.
///
/// Records whose holder field does not parse as an address are skipped by
/// [`list_for_holder`](CredentialRepository::list_for_holder).
#[derive(Default)]
pub struct InMemoryCredentialRepository {
    credentials: Mutex<HashMap<String, CredentialRecord>>,
}

impl InMemoryCredentialRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialRepository for InMemoryCredentialRepository {
    async fn insert(&self, record: CredentialRecord) -> Result<()> {
        let mut credentials = self.credentials.lock()?;
        if credentials.contains_key(record.id()) {
            return Err(Error::Storage(format!(
                "credential `{}` already exists",
                record.id()
            )));
        }
        credentials.insert(record.id().to_string(), record);
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<CredentialRecord>> {
        Ok(self.credentials.lock()?.get(id).cloned())
    }

    async fn list_for_holder(&self, holder: Address) -> Result<Vec<CredentialRecord>> {
        let credentials = self.credentials.lock()?;
        let mut held: Vec<CredentialRecord> = credentials
            .values()
            .filter(|record| {
                parse_address("holder", &record.fields().holder)
                    .map(|addr| addr == holder)
                    .unwrap_or(false)
            })
            .cloned()
            .collect();
        held.sort_by(|a, b| b.issued_at().cmp(&a.issued_at()));
        Ok(held)
    }

    async fn record_verification(&self, id: &str, report: &VerificationReport) -> Result<()> {
        let mut credentials = self.credentials.lock()?;
        let record = credentials
            .get_mut(id)
            .ok_or_else(|| Error::NotFound(id.to_string()))?;
        record.record_verification(report.status, report.checked_at);
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        Ok(self.credentials.lock()?.remove(id).is_some())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.credentials.lock()?.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::credential::{CredentialDraft, VerificationStatus};
    use chrono::{TimeZone, Utc};

    const ALICE: &str = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8";
    const BOB: &str = "0x3C44CdDdB6a900fa2b585dd299e03d12FA4293BC";

    fn record(id: &str, holder: &str, day: u32) -> CredentialRecord {
        CredentialRecord::new(
            id.to_string(),
            CredentialDraft {
                title: format!("credential {}", id),
                issuer: "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266".into(),
                holder: holder.into(),
                credential_type: "membership".into(),
                expiry_date: "2030-01-01T00:00:00Z".into(),
                chain_id: 1,
            },
            "0x00".into(),
            "0x00".into(),
            Utc.with_ymd_and_hms(2025, 1, day, 0, 0, 0).unwrap(),
        )
    }

    fn report(status: VerificationStatus) -> VerificationReport {
        VerificationReport {
            status,
            signature_valid: status == VerificationStatus::Verified,
            expired: false,
            recovered_signer: None,
            checked_at: Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_insert_rejects_duplicate_id() {
        let repo = InMemoryCredentialRepository::new();
        repo.insert(record("id1", ALICE, 1)).await.unwrap();

        assert!(matches!(
            repo.insert(record("id1", ALICE, 2)).await,
            Err(Error::Storage(_))
        ));
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_list_for_holder_matches_case_insensitively_newest_first() {
        let repo = InMemoryCredentialRepository::new();
        repo.insert(record("old", ALICE, 1)).await.unwrap();
        repo.insert(record("new", &ALICE.to_lowercase(), 9)).await.unwrap();
        repo.insert(record("bobs", BOB, 5)).await.unwrap();

        let alice = parse_address("holder", ALICE).unwrap();
        let ids: Vec<String> = repo
            .list_for_holder(alice)
            .await
            .unwrap()
            .iter()
            .map(|r| r.id().to_string())
            .collect();
        assert_eq!(ids, vec!["new", "old"]);
    }

    #[tokio::test]
    async fn test_record_verification_updates_cached_status() {
        let repo = InMemoryCredentialRepository::new();
        repo.insert(record("id1", ALICE, 1)).await.unwrap();

        repo.record_verification("id1", &report(VerificationStatus::Invalid))
            .await
            .unwrap();
        let stored = repo.get("id1").await.unwrap().unwrap();
        assert_eq!(stored.verification_status(), VerificationStatus::Invalid);
        assert_eq!(stored.verification_count(), 1);

        assert!(matches!(
            repo.record_verification("missing", &report(VerificationStatus::Verified))
                .await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_and_get_after_delete() {
        let repo = InMemoryCredentialRepository::new();
        repo.insert(record("membership-card", ALICE, 1)).await.unwrap();

        assert!(repo.delete("membership-card").await.unwrap());
        assert!(repo.get("membership-card").await.unwrap().is_none());
        assert!(!repo.delete("membership-card").await.unwrap());
        assert_eq!(repo.count().await.unwrap(), 0);
    }
}
