// src/crypto/keys.rs

//! Loading and encoding of the recipient public key.
//!
//! Key files hold the 32 raw key bytes, base64 encoded, optionally wrapped
//! in `-----BEGIN ...-----` / `-----END ...-----` armor lines.

use std::fs;
use std::path::Path;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use crypto_box::{KEY_SIZE, PublicKey};

use crate::errors::{FunsizeError, Result};

const ARMOR_LABEL: &str = "FUNSIZE WORKER PUBLIC KEY";

/// Parse an (optionally armored) base64 public key.
pub fn parse_public_key(text: &str) -> Result<PublicKey> {
    let body: String = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with("-----"))
        .collect();

    let bytes = STANDARD
        .decode(body.as_bytes())
        .map_err(|e| FunsizeError::EncryptionFailure(format!("public key is not base64: {e}")))?;

    let raw: [u8; KEY_SIZE] = bytes.as_slice().try_into().map_err(|_| {
        FunsizeError::EncryptionFailure(format!(
            "public key must be {KEY_SIZE} bytes, got {}",
            bytes.len()
        ))
    })?;

    Ok(PublicKey::from(raw))
}

/// Read a public key file.
pub fn load_public_key(path: impl AsRef<Path>) -> Result<PublicKey> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|e| {
        FunsizeError::EncryptionFailure(format!("reading public key {}: {e}", path.display()))
    })?;
    parse_public_key(&text)
}

/// Armored text form accepted by [`parse_public_key`].
pub fn armor_public_key(key: &PublicKey) -> String {
    format!(
        "-----BEGIN {ARMOR_LABEL}-----\n{}\n-----END {ARMOR_LABEL}-----\n",
        STANDARD.encode(key.as_bytes())
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn armored_and_bare_forms_parse_to_the_same_key() {
        let key = PublicKey::from([7u8; KEY_SIZE]);
        let armored = armor_public_key(&key);
        let bare = STANDARD.encode(key.as_bytes());

        assert_eq!(parse_public_key(&armored).unwrap().as_bytes(), key.as_bytes());
        assert_eq!(parse_public_key(&bare).unwrap().as_bytes(), key.as_bytes());
    }

    #[test]
    fn wrong_length_is_rejected() {
        let short = STANDARD.encode([1u8; 16]);
        let err = parse_public_key(&short).unwrap_err();
        assert!(err.to_string().contains("32 bytes"));
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(matches!(
            parse_public_key("not base64 at all!"),
            Err(FunsizeError::EncryptionFailure(_))
        ));
    }
}
