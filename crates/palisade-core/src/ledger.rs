//! Encrypted-value ledger.
//!
//! Sensitive attributes are declared as plaintext but stored by the
//! device in an opaque ciphertext form. Without a record of which
//! ciphertext corresponds to which declared plaintext, every Read would
//! report the attribute as drifted. The ledger keeps both halves of the
//! pair, keyed by the attribute's xpath, and is persisted alongside the
//! resource state.
//!
//! The hashing type of a key is fixed at first insertion; rebinding it
//! is a programmer error and fails loudly.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from ledger mutation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum LedgerError {
    /// Attempted to rebind a key to a different hashing type.
    #[error(
        "hashing mismatch for '{xpath}': stored {stored}, attempted {attempted}"
    )]
    HashingMismatch {
        /// The ledger key.
        xpath: String,
        /// The hashing type recorded at first insertion.
        stored: HashingType,
        /// The hashing type of the rejected store.
        attempted: HashingType,
    },
}

/// How the device hashes the stored value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HashingType {
    /// The device-wide master-key scheme.
    Solo,
    /// A resource-specific scheme.
    Custom,
}

impl fmt::Display for HashingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Solo => f.write_str("solo"),
            Self::Custom => f.write_str("custom"),
        }
    }
}

/// One plaintext⇄ciphertext pair.
///
/// Field order is part of the wire contract: re-marshalling a ledger
/// must reproduce the input bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedValue {
    /// Hashing discipline for this key; immutable after first insertion.
    pub hashing_type: HashingType,

    /// The device-side ciphertext, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encrypted: Option<String>,

    /// The declared plaintext, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plaintext: Option<String>,
}

/// The ledger: attribute xpath → [`EncryptedValue`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedValues {
    /// Stored pairs, ordered by key for deterministic output.
    #[serde(default)]
    pub values: BTreeMap<String, EncryptedValue>,

    /// When set, translators prefer the server-side form over the
    /// declared one. Transient; never persisted.
    #[serde(skip)]
    pub prefer_server_state: bool,
}

impl EncryptedValues {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn store(
        &mut self,
        xpath: &str,
        hashing_type: HashingType,
        value: String,
        ciphertext: bool,
    ) -> Result<(), LedgerError> {
        if let Some(existing) = self.values.get_mut(xpath) {
            if existing.hashing_type != hashing_type {
                return Err(LedgerError::HashingMismatch {
                    xpath: xpath.to_string(),
                    stored: existing.hashing_type,
                    attempted: hashing_type,
                });
            }
            if ciphertext {
                existing.encrypted = Some(value);
            } else {
                existing.plaintext = Some(value);
            }
            return Ok(());
        }
        let entry = if ciphertext {
            EncryptedValue {
                hashing_type,
                encrypted: Some(value),
                plaintext: None,
            }
        } else {
            EncryptedValue {
                hashing_type,
                encrypted: None,
                plaintext: Some(value),
            }
        };
        self.values.insert(xpath.to_string(), entry);
        Ok(())
    }

    /// Stores the declared plaintext half of a pair.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::HashingMismatch`] when the key already
    /// exists with a different hashing type.
    pub fn store_plaintext(
        &mut self,
        xpath: &str,
        hashing_type: HashingType,
        value: impl Into<String>,
    ) -> Result<(), LedgerError> {
        self.store(xpath, hashing_type, value.into(), false)
    }

    /// Stores the device-side ciphertext half of a pair.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::HashingMismatch`] when the key already
    /// exists with a different hashing type.
    pub fn store_ciphertext(
        &mut self,
        xpath: &str,
        hashing_type: HashingType,
        value: impl Into<String>,
    ) -> Result<(), LedgerError> {
        self.store(xpath, hashing_type, value.into(), true)
    }

    /// Returns the plaintext recorded for a key.
    #[must_use]
    pub fn plaintext(&self, xpath: &str) -> Option<&str> {
        self.values.get(xpath).and_then(|v| v.plaintext.as_deref())
    }

    /// Returns the ciphertext recorded for a key.
    #[must_use]
    pub fn ciphertext(&self, xpath: &str) -> Option<&str> {
        self.values.get(xpath).and_then(|v| v.encrypted.as_deref())
    }
}
