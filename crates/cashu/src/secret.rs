//! Proof secrets.
//!
//! A secret is an arbitrary byte string chosen by the wallet. Most secrets
//! are opaque random values; some parse as a structured [`crate::nuts::nut10`]
//! secret carrying a spending condition.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Length, in bytes, of a freshly generated random secret.
pub const DEFAULT_SECRET_LENGTH: usize = 32;

/// A proof secret.
///
/// Wraps the string form used on the wire; `as_bytes` is what feeds
/// `hash_to_curve`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Secret(String);

impl Secret {
    /// Build a secret from an existing string (as received from the wire).
    pub fn new<S: Into<String>>(secret: S) -> Self {
        Self(secret.into())
    }

    /// The raw bytes fed to `hash_to_curve`.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// The string form of the secret.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for Secret {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for Secret {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}
