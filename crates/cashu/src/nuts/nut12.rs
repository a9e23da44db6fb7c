//! NUT-12: Offline ecash signature verification (DLEQ proofs)
//!
//! <https://github.com/cashubtc/nuts/blob/main/12.md>

use serde::{Deserialize, Serialize};

use super::nut01::SecretKey;

/// A DLEQ proof attached to a [`super::nut00::BlindedSignature`] (mint-issued)
/// or to a [`super::nut00::Proof`] (wallet-retained, after unblinding).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DleqProof {
    /// Challenge scalar
    pub e: SecretKey,
    /// Response scalar
    pub s: SecretKey,
    /// Blinding factor `r`, present only on the wallet-side (unblinded) copy
    #[serde(skip_serializing_if = "Option::is_none")]
    pub r: Option<SecretKey>,
}
