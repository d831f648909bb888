// src/crypto/mod.rs

//! Encrypted environment variables for downstream tasks.
//!
//! A secret is wrapped in a versioned [`Envelope`] bound to one task id and
//! one validity window, sealed to the worker's public key, and carried in
//! the task definition as base64 text. Only the worker holding the matching
//! secret key can open it.
//!
//! - [`envelope`] defines the plaintext format.
//! - [`keys`] loads the recipient public key.

pub mod envelope;
pub mod keys;

use std::fmt;
use std::path::Path;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use crypto_box::aead::OsRng;

pub use crypto_box::{PublicKey, SecretKey};
pub use envelope::Envelope;
pub use keys::{armor_public_key, load_public_key, parse_public_key};

use crate::errors::{FunsizeError, Result};
use crate::graph::ids::TaskId;

/// A secret sealed for exactly one task and time window.
#[derive(Clone, PartialEq, Eq)]
pub struct EncryptedEnvVar {
    pub task_id: TaskId,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
    pub name: String,
    /// Base64 of the sealed envelope bytes.
    pub ciphertext: String,
}

impl fmt::Debug for EncryptedEnvVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptedEnvVar")
            .field("task_id", &self.task_id)
            .field("name", &self.name)
            .field("valid_from", &self.valid_from)
            .field("valid_until", &self.valid_until)
            .finish_non_exhaustive()
    }
}

/// Seals secret values for downstream tasks.
///
/// The graph builder depends on this trait rather than on a concrete key so
/// tests can observe or fail encryption.
pub trait EnvEncryptor: Send + Sync {
    fn encrypt_env_var(
        &self,
        task_id: &TaskId,
        valid_from: DateTime<Utc>,
        valid_until: DateTime<Utc>,
        name: &str,
        plaintext: &str,
    ) -> Result<EncryptedEnvVar>;
}

/// Anonymous sealed-box encryption to a fixed recipient key.
///
/// Sealing uses a fresh ephemeral key each time, so two encryptions of the
/// same envelope differ.
#[derive(Clone)]
pub struct SealedBoxEncryptor {
    recipient: PublicKey,
}

impl fmt::Debug for SealedBoxEncryptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SealedBoxEncryptor").finish_non_exhaustive()
    }
}

impl SealedBoxEncryptor {
    pub fn new(recipient: PublicKey) -> Self {
        Self { recipient }
    }

    /// Load the recipient key once, at start-up.
    pub fn from_key_file(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(load_public_key(path)?))
    }
}

impl EnvEncryptor for SealedBoxEncryptor {
    fn encrypt_env_var(
        &self,
        task_id: &TaskId,
        valid_from: DateTime<Utc>,
        valid_until: DateTime<Utc>,
        name: &str,
        plaintext: &str,
    ) -> Result<EncryptedEnvVar> {
        let envelope = Envelope::new(task_id.as_str(), valid_from, valid_until, name, plaintext);
        let message = envelope.to_canonical_json()?;

        let sealed = self
            .recipient
            .seal(&mut OsRng, message.as_bytes())
            .map_err(|e| FunsizeError::EncryptionFailure(format!("sealing {name}: {e}")))?;

        Ok(EncryptedEnvVar {
            task_id: task_id.clone(),
            valid_from,
            valid_until,
            name: name.to_string(),
            ciphertext: STANDARD.encode(sealed),
        })
    }
}

/// Open an encrypted variable with the recipient's secret key.
///
/// This is what the consuming worker does; here it serves tooling and tests.
pub fn open_env_var(secret: &SecretKey, var: &EncryptedEnvVar) -> Result<Envelope> {
    let sealed = STANDARD
        .decode(var.ciphertext.as_bytes())
        .map_err(|e| FunsizeError::EncryptionFailure(format!("ciphertext is not base64: {e}")))?;
    let message = secret
        .unseal(&sealed)
        .map_err(|e| FunsizeError::EncryptionFailure(format!("unsealing {}: {e}", var.name)))?;
    Envelope::from_json(&message)
}
