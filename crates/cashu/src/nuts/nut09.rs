//! NUT-09: Restore signatures
//!
//! <https://github.com/cashubtc/nuts/blob/main/09.md>
//!
//! Lets a wallet that has lost its local proof database recover blind
//! signatures for outputs it previously submitted, by re-deriving the same
//! deterministic secrets/blinding factors and resubmitting the blinded
//! messages. The mint only answers for messages it has in fact signed
//! before; it never signs on a restore request.

use serde::{Deserialize, Serialize};

use super::nut00::{BlindedMessage, BlindedSignature};

/// `POST /v1/restore` request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestoreRequest {
    /// Candidate blinded messages to look up
    pub outputs: Vec<BlindedMessage>,
}

/// `POST /v1/restore` response. `outputs`/`signatures` are parallel arrays
/// restricted to the subset of the request the mint previously signed; a
/// wallet probing a gap of unused derivation indices should expect both to
/// come back empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestoreResponse {
    /// The subset of requested outputs the mint had previously signed
    pub outputs: Vec<BlindedMessage>,
    /// Their previously issued signatures, same order as `outputs`
    pub signatures: Vec<BlindedSignature>,
}
