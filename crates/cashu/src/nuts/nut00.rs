//! NUT-00: Notation, utilization, and terminology
//!
//! <https://github.com/cashubtc/nuts/blob/main/00.md>
//!
//! Defines the core wire types shared by every operation: blinded messages
//! (outputs), blinded signatures (promises), and proofs (spent inputs).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::nut01::PublicKey;
use super::nut02::Id;
use super::nut11::Witness;
use super::nut12::DleqProof;
use crate::amount::Amount;
use crate::secret::Secret;

/// The monetary unit a keyset, quote or proof is denominated in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CurrencyUnit {
    /// Satoshi
    Sat,
    /// Millisatoshi
    Msat,
    /// US Dollar
    Usd,
    /// Euro
    Eur,
    /// Any other unit, by its string tag
    #[serde(untagged)]
    Custom(String),
}

impl fmt::Display for CurrencyUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sat => write!(f, "sat"),
            Self::Msat => write!(f, "msat"),
            Self::Usd => write!(f, "usd"),
            Self::Eur => write!(f, "eur"),
            Self::Custom(s) => write!(f, "{s}"),
        }
    }
}

impl FromStr for CurrencyUnit {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "sat" => Self::Sat,
            "msat" => Self::Msat,
            "usd" => Self::Usd,
            "eur" => Self::Eur,
            other => Self::Custom(other.to_string()),
        })
    }
}

/// The settlement method for a mint/melt quote. Only `bolt11` is modelled;
/// other methods (e.g. bolt12) are out of scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    /// BOLT11 Lightning invoices
    Bolt11,
}

/// A blinded output submitted by a wallet to be signed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlindedMessage {
    /// Keyset the signature should be issued from
    pub id: Id,
    /// Requested amount; must be a supported amount of `id`
    pub amount: Amount,
    /// Blinded secret point `B_`
    #[serde(rename = "B_")]
    pub blinded_secret: PublicKey,
    /// Optional spending-condition witness carried through to the promise's
    /// pairing proof (rarely used; most outputs carry none)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub witness: Option<Witness>,
}

/// A mint-issued blind signature over a [`BlindedMessage`] — a "promise".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlindedSignature {
    /// Keyset the signature was issued from
    pub id: Id,
    /// Signed amount
    pub amount: Amount,
    /// Signed point `C_`
    #[serde(rename = "C_")]
    pub c: PublicKey,
    /// DLEQ proof that `C_` was produced with the same key as `id`'s
    /// published public key for `amount`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dleq: Option<DleqProof>,
}

/// An unblinded, spendable token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proof {
    /// Keyset the proof was issued from
    pub id: Id,
    /// Proof amount
    pub amount: Amount,
    /// The secret chosen by the wallet when blinding
    pub secret: Secret,
    /// Unblinded signature point `C`
    #[serde(rename = "C")]
    pub c: PublicKey,
    /// DLEQ proof, carried over (with blinding factor `r`) from the promise
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dleq: Option<DleqProof>,
    /// Spending-condition witness, required if `secret` is a well-known
    /// secret with a non-trivial policy
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub witness: Option<Witness>,
}

impl Proof {
    /// Sum the amounts of a proof list, in declaration order (no overflow
    /// checking — callers needing overflow safety should use
    /// `Amount::try_sum`).
    pub fn total_amount<'a, I: IntoIterator<Item = &'a Proof>>(proofs: I) -> Amount {
        proofs.into_iter().fold(Amount::ZERO, |acc, p| acc + p.amount)
    }
}

impl BlindedMessage {
    /// Sum the amounts of an output list.
    pub fn total_amount<'a, I: IntoIterator<Item = &'a BlindedMessage>>(outputs: I) -> Amount {
        outputs.into_iter().fold(Amount::ZERO, |acc, o| acc + o.amount)
    }
}
