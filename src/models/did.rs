// src/models/did.rs
//! Decentralized Identifier (DID) data model.
//!
//! Every wallet address maps to exactly one identifier of the form
//! `did:XDigi:<lowercase 0x address>`. The identifier is derived, never
//! registered, so resolving it needs nothing but the address.

use crate::error::{Error, Result};
use crate::utils::crypto::{format_address, parse_address};
use chrono::{DateTime, Utc};
use ethers::types::Address;
use ethers::utils::to_checksum;
use serde::{Deserialize, Serialize};

/// DID method name used for wallet-derived identifiers.
pub const DID_METHOD: &str = "XDigi";

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DidStatus {
    #[default]
    Active,
    Revoked,
}

/// A DID Document for a wallet-controlled identity.
///
/// # Fields
/// - `id`: The DID string, `did:XDigi:0x...`
/// - `controller`: EIP-55 checksummed address that controls the identifier
/// - `created` / `updated`: Document timestamps
/// - `status`: Whether the identifier is still in use
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DidDocument {
    pub id: String,
    pub controller: String,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    pub status: DidStatus,
}

impl DidDocument {
    /// Builds the active document for `address` as of `now`.
    pub fn for_address(address: Address, now: DateTime<Utc>) -> Self {
        DidDocument {
            id: did_for_address(address),
            controller: to_checksum(&address, None),
            created: now,
            updated: now,
            status: DidStatus::Active,
        }
    }

    pub fn revoke(&mut self, now: DateTime<Utc>) {
        self.status = DidStatus::Revoked;
        self.updated = now;
    }
}

/// Derives the identifier for `address`. Casing of the input never matters.
pub fn did_for_address(address: Address) -> String {
    format!("did:{}:{}", DID_METHOD, format_address(address))
}

/// Resolves a subject given either as a DID or as a bare `0x` address.
///
/// # Errors
/// Validation error for another DID method or a malformed address.
pub fn resolve_subject(subject: &str) -> Result<Address> {
    let subject = subject.trim();
    match subject.strip_prefix("did:") {
        Some(rest) => {
            let (method, id) = rest
                .split_once(':')
                .ok_or_else(|| Error::validation("did", "expected did:<method>:<id>"))?;
            if method != DID_METHOD {
                return Err(Error::validation(
                    "did",
                    format!("unsupported method `{}`", method),
                ));
            }
            parse_address("did", id)
        }
        None => parse_address("address", subject),
    }
}
