// src/credential/canonical.rs
//! Canonical byte encoding of the signed credential fields.
//!
//! The encoding is the Ethereum ABI encoding of the tuple
//!
//! ```text
//! (string domain, string title, address issuer, address holder,
//!  string type, string expiryDate, uint256 chainId)
//! ```
//!
//! Strings carry ABI length prefixes, addresses are raw 20-byte values (so
//! hex casing never reaches the digest), the expiry date is normalized to a
//! UTC ISO-8601 string and the chain id is a 256-bit big-endian integer. A
//! contract can recompute the same bytes with `abi.encode(...)`.

use crate::error::Result;
use crate::models::credential::{CredentialDraft, SignedFields};
use ethers::abi::{self, Token};
use ethers::types::U256;

/// Domain tag prefixed to every encoding. Changing the field set or order
/// requires a new tag.
pub const CANONICAL_DOMAIN: &str = "credential-seal/v1";

/// Validates a draft and returns its canonical bytes.
pub fn canonicalize(draft: &CredentialDraft) -> Result<Vec<u8>> {
    let fields = draft.validate()?;
    Ok(encode_fields(&fields))
}

/// Canonical bytes of already-validated fields.
pub fn encode_fields(fields: &SignedFields) -> Vec<u8> {
    abi::encode(&[
        Token::String(CANONICAL_DOMAIN.to_string()),
        Token::String(fields.title.clone()),
        Token::Address(fields.issuer),
        Token::Address(fields.holder),
        Token::String(fields.credential_type.clone()),
        Token::String(fields.expiry_iso()),
        Token::Uint(U256::from(fields.chain_id)),
    ])
}
