//! Credential generation and accessor derivation.

use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};

use castellan_contracts::error::{BrokerError, BrokerResult};

/// Prefix marking a CASTELLAN session token.
pub const TOKEN_PREFIX: &str = "cst.";

const TOKEN_BYTES: usize = 32;

/// A fresh bearer token: `cst.` followed by 256 bits of OS randomness in hex.
pub fn generate_token() -> BrokerResult<String> {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| BrokerError::IssuanceFailed {
            reason: format!("OS random source unavailable: {}", e),
        })?;
    Ok(format!("{}{}", TOKEN_PREFIX, hex::encode(bytes)))
}

/// SHA-256 of the token, hex-encoded. Safe to log; cannot be presented as a
/// credential.
pub fn accessor(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}
