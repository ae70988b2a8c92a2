// src/error.rs
//! Error taxonomy for credential issuance, verification and storage.
//!
//! Verification never produces an error for a well-formed credential that
//! simply fails to verify: those outcomes are reported as
//! [`VerificationStatus`](crate::models::credential::VerificationStatus)
//! values. Errors are reserved for malformed input and for the signing path.

use chrono::{DateTime, Utc};
use ethers::types::Address;
use std::time::Duration;
use thiserror::Error;

/// Errors raised by this crate.
#[derive(Debug, Error)]
pub enum Error {
    /// A signed field is missing or malformed. Requires corrected input.
    #[error("invalid `{field}`: {reason}")]
    Validation { field: String, reason: String },

    /// The signing agent explicitly refused the request.
    #[error("signing declined: {0}")]
    SigningDeclined(String),

    /// No signing agent is connected.
    #[error("no signing agent connected")]
    SigningUnavailable,

    /// The signing agent did not answer within the configured timeout.
    #[error("signing request timed out after {0:?}")]
    SigningTimedOut(Duration),

    /// The signing agent failed for a reason other than a refusal.
    #[error("signing agent failed: {0}")]
    SigningFailed(String),

    /// The returned signature does not recover to the expected issuer.
    #[error("signature recovers to 0x{recovered:x}, expected 0x{expected:x}")]
    SignerMismatch { expected: Address, recovered: Address },

    /// No record exists under the given identifier.
    #[error("`{0}` not found")]
    NotFound(String),

    /// The capsule cannot be opened before its unlock instant.
    #[error("capsule `{id}` stays locked until {unlock_at}")]
    CapsuleLocked { id: String, unlock_at: DateTime<Utc> },

    /// The backing store failed.
    #[error("storage error: {0}")]
    Storage(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Whether retrying the same call unchanged can succeed.
    ///
    /// Validation errors need corrected input and declines need a new user
    /// decision, so neither is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::SigningUnavailable
                | Error::SigningTimedOut(_)
                | Error::SigningFailed(_)
                | Error::Storage(_)
        )
    }

    /// Stable machine-readable name used in API error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Validation { .. } => "validation_error",
            Error::SigningDeclined(_) => "signing_declined",
            Error::SigningUnavailable => "signing_unavailable",
            Error::SigningTimedOut(_) => "signing_timed_out",
            Error::SigningFailed(_) => "signing_failed",
            Error::SignerMismatch { .. } => "signer_mismatch",
            Error::NotFound(_) => "not_found",
            Error::CapsuleLocked { .. } => "capsule_locked",
            Error::Storage(_) => "storage_error",
        }
    }
}

impl<T> From<std::sync::PoisonError<T>> for Error {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        Error::Storage(format!("lock poisoned: {}", e))
    }
}
