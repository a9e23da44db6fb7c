//! NUT-03: Swap
//!
//! <https://github.com/cashubtc/nuts/blob/main/03.md>

use serde::{Deserialize, Serialize};

use super::nut00::{BlindedMessage, BlindedSignature, Proof};

/// `POST /v1/swap` request: inputs to consume, outputs to issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapRequest {
    /// Proofs being spent
    pub inputs: Vec<Proof>,
    /// Blinded messages to sign in exchange, total amount (less fees) must
    /// equal the inputs' total amount
    pub outputs: Vec<BlindedMessage>,
}

impl SwapRequest {
    /// Convenience constructor
    pub fn new(inputs: Vec<Proof>, outputs: Vec<BlindedMessage>) -> Self {
        Self { inputs, outputs }
    }
}

/// `POST /v1/swap` response: one signature per requested output, same order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapResponse {
    /// Blind signatures, in the order `outputs` was submitted
    pub signatures: Vec<BlindedSignature>,
}
