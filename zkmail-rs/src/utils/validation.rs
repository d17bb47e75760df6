//! Input validators
//!
//! Every client-supplied scalar passes through one of these before it
//! reaches storage or routing. All validators fail closed: anything that
//! does not match the restricted character class is rejected with
//! [`MailError::InvalidInput`].

use crate::error::{MailError, Result};
use regex::Regex;
use std::sync::LazyLock;

static TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9][a-z0-9_-]{2,31}$").unwrap());

/// Lowercase hex SHA-256, used for both password hashes and public-key
/// hashes.
static HASH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9a-f]{64}$").unwrap());

static HEX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:[0-9a-f]{2})+$").unwrap());

static MESSAGE_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9][a-z0-9.-]{0,79}$").unwrap());

pub fn validate_token(token: &str) -> Result<&str> {
    if TOKEN_RE.is_match(token) {
        Ok(token)
    } else {
        Err(MailError::InvalidInput(format!("bad token: {:?}", token)))
    }
}

pub fn validate_hash(hash: &str) -> Result<&str> {
    if HASH_RE.is_match(hash) {
        Ok(hash)
    } else {
        Err(MailError::InvalidInput("bad hash".to_string()))
    }
}

/// Opaque ciphertext blobs travel as lowercase hex.
pub fn validate_hex(hex: &str) -> Result<&str> {
    if HEX_RE.is_match(hex) {
        Ok(hex)
    } else {
        Err(MailError::InvalidInput("bad hex blob".to_string()))
    }
}

pub fn validate_message_id(id: &str) -> Result<&str> {
    if MESSAGE_ID_RE.is_match(id) {
        Ok(id)
    } else {
        Err(MailError::InvalidInput(format!("bad message id: {:?}", id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token() {
        assert!(validate_token("alice").is_ok());
        assert!(validate_token("a1_b-2").is_ok());
        assert!(validate_token("ab").is_err());
        assert!(validate_token("Alice").is_err());
        assert!(validate_token("").is_err());
    }

    #[test]
    fn test_hash() {
        let h = "a".repeat(64);
        assert!(validate_hash(&h).is_ok());
        assert!(validate_hash("deadbeef").is_err());
        assert!(validate_hash(&"A".repeat(64)).is_err());
    }

    #[test]
    fn test_hex() {
        assert!(validate_hex("deadbeef").is_ok());
        assert!(validate_hex("abc").is_err()); // odd length
        assert!(validate_hex("").is_err());
        assert!(validate_hex("zzzz").is_err());
    }

    #[test]
    fn test_message_id() {
        assert!(validate_message_id("b7a9c2d0-4e11-4d0a-9f3b-2c7d8e9f0a1b").is_ok());
        assert!(validate_message_id("msg.1").is_ok());
        assert!(validate_message_id("").is_err());
        assert!(validate_message_id("../../etc/passwd").is_err());
    }
}
