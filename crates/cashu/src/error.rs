//! Crate-wide error type for `cashu`'s types and crypto primitives.

use thiserror::Error;

use crate::util::hex;

/// Errors arising from the wire types and cryptographic primitives in this
/// crate. The ledger engine (`cdk-mint`) wraps this error rather than
/// duplicating its variants.
#[derive(Debug, Error)]
pub enum Error {
    /// Hex decode error
    #[error(transparent)]
    Hex(#[from] hex::Error),
    /// Secp256k1 error
    #[error(transparent)]
    Secp256k1(#[from] bitcoin::secp256k1::Error),
    /// Bip32 derivation error
    #[error(transparent)]
    Bip32(#[from] bitcoin::bip32::Error),
    /// Amount arithmetic overflowed
    #[error("Amount overflow")]
    AmountOverflow,
    /// Split values must sum to less than or equal to the amount being split
    #[error("Split values must be less than or equal to amount")]
    SplitValuesGreater,
    /// A point could not be mapped to the curve within the retry budget
    #[error("Could not map message to curve point")]
    HashToCurveExhausted,
    /// A DLEQ proof failed verification
    #[error("Could not verify DLEQ proof")]
    CouldNotVerifyDleq,
    /// A BDHKE signature failed verification
    #[error("Token not verified")]
    TokenNotVerified,
    /// A keyset id string had the wrong length or version byte
    #[error("Invalid keyset id")]
    InvalidKeysetId,
    /// An amount is not one of a keyset's supported powers of two
    #[error("Amount not a supported keyset amount")]
    UnsupportedAmount,
    /// JSON (de)serialization error
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    /// A structured (NUT-10) secret failed to parse
    #[error("Invalid structured secret: `{0}`")]
    InvalidSecret(String),
    /// A spending condition witness did not satisfy its policy
    #[error("Spending condition not met: `{0}`")]
    SpendConditionsNotMet(String),
    /// A required witness was not provided
    #[error("Witness not provided")]
    WitnessMissing,
}
