//! NUT-10: Spending conditions
//!
//! <https://github.com/cashubtc/nuts/blob/main/10.md>
//!
//! A proof's secret is either an opaque random string, or it JSON-decodes as
//! `[kind, { nonce, data, tags? }]` — a "well-known" secret embedding a
//! spending condition that a witness must satisfy.

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::secret::Secret;

/// The kind of spending condition embedded in a well-known secret.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Kind {
    /// Pay-to-pubkey: witness must carry a signature valid under `data`.
    P2PK,
    /// Hashed time-lock contract: witness must carry a preimage of `data`.
    HTLC,
}

/// The inner payload of a well-known secret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretData {
    /// Per-secret random nonce, makes the secret unique even for a fixed
    /// policy
    pub nonce: String,
    /// Policy-specific data: a pubkey for P2PK, a hash for HTLC
    pub data: String,
    /// Optional policy tags (`pubkeys`, `n_sigs`, `locktime`, `refund`,
    /// `sig_flag`, ...), each itself a `[name, ...values]` array
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Vec<String>>,
}

/// A parsed well-known secret: `[kind, data]` on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WellKnownSecret {
    /// The spending-condition kind
    pub kind: Kind,
    /// The policy payload
    pub secret_data: SecretData,
}

impl WellKnownSecret {
    /// Try to parse a proof secret as a well-known secret. Secrets that are
    /// not a `[kind, data]` JSON tuple place no spending condition beyond
    /// the BDHKE signature and are not an error here.
    pub fn try_parse(secret: &Secret) -> Option<Self> {
        let (kind, data): (Kind, SecretData) = serde_json::from_str(secret.as_str()).ok()?;
        Some(Self { kind, secret_data: data })
    }

    /// Value of a named tag, if present (first match)
    pub fn tag(&self, name: &str) -> Option<&[String]> {
        self.secret_data
            .tags
            .iter()
            .find(|t| t.first().map(|n| n == name).unwrap_or(false))
            .map(|t| &t[1..])
    }
}

impl TryFrom<&Secret> for WellKnownSecret {
    type Error = Error;

    fn try_from(secret: &Secret) -> Result<Self, Self::Error> {
        WellKnownSecret::try_parse(secret)
            .ok_or_else(|| Error::InvalidSecret("not a well-known secret".into()))
    }
}
