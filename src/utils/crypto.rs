// src/utils/crypto.rs
//! Cryptographic utilities optimized for blockchain compatibility.
//!
//! Uses Keccak-256 (Ethereum's standard hash function) for all operations.

use crate::error::{Error, Result};
use ethers::types::Address;
use ethers::utils::{hex, keccak256};
use std::str::FromStr;

/// Computes a Keccak-256 hash of the input data (Ethereum-compatible).
///
/// # Arguments
/// * `data` - Binary data to hash (as bytes slice)
///
/// # Returns
/// Fixed-size 32-byte array (`[u8; 32]`) containing the hash.
pub fn hash_data(data: &[u8]) -> [u8; 32] {
    keccak256(data)
}

/// Parses a `0x`-prefixed, 20-byte hex Ethereum address.
///
/// Hex digits are accepted in any case; EIP-55 checksum casing is not
/// enforced. `field` names the input in the returned validation error.
pub fn parse_address(field: &str, value: &str) -> Result<Address> {
    let digits = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .ok_or_else(|| Error::validation(field, "address must start with 0x"))?;
    if digits.len() != 40 {
        return Err(Error::validation(
            field,
            format!("address must be 40 hex digits, got {}", digits.len()),
        ));
    }
    Address::from_str(digits)
        .map_err(|e| Error::validation(field, format!("address is not valid hex: {}", e)))
}

/// Formats an address as lowercase hex with a 0x prefix.
pub fn format_address(addr: Address) -> String {
    format!("0x{:x}", addr)
}

/// Formats arbitrary bytes as lowercase hex with a 0x prefix.
pub fn to_prefixed_hex(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

/// Decodes hex with an optional 0x prefix.
pub fn decode_hex(field: &str, value: &str) -> Result<Vec<u8>> {
    let digits = value.strip_prefix("0x").unwrap_or(value);
    hex::decode(digits).map_err(|e| Error::validation(field, format!("not valid hex: {}", e)))
}
