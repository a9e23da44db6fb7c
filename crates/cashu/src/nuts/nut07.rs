//! NUT-07: Check proof state (spent/pending/unspent)
//!
//! <https://github.com/cashubtc/nuts/blob/main/07.md>

use std::fmt;

use serde::{Deserialize, Serialize};

use super::nut01::PublicKey;

/// Spend state of a proof, keyed by `Y = hash_to_curve(secret)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum State {
    /// Never spent, not held in any pending reservation
    Unspent,
    /// Permanently recorded as spent
    Spent,
    /// Reserved by an in-flight melt awaiting Lightning backend settlement
    Pending,
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unspent => write!(f, "UNSPENT"),
            Self::Spent => write!(f, "SPENT"),
            Self::Pending => write!(f, "PENDING"),
        }
    }
}

/// `POST /v1/checkstate` request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckStateRequest {
    /// `Y` values to check, one per proof secret
    #[serde(rename = "Ys")]
    pub ys: Vec<PublicKey>,
}

/// One entry of a [`CheckStateResponse`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofState {
    /// The `Y` value this entry answers for
    #[serde(rename = "Y")]
    pub y: PublicKey,
    /// Its current state
    pub state: State,
    /// A NUT-11 witness attached to the matching pending/spent proof, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub witness: Option<String>,
}

/// `POST /v1/checkstate` response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckStateResponse {
    /// One entry per requested `Y`, same order as the request
    pub states: Vec<ProofState>,
}
