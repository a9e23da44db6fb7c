//! Mint-level error type and the wire-facing error code mapping (NUT-00
//! "Error codes").

use serde::{Deserialize, Serialize};
use thiserror::Error;

use cashu::nuts::nut02::Id;
use cashu::Amount;

/// Errors arising anywhere in the ledger engine or keyset manager.
#[derive(Debug, Error)]
pub enum Error {
    /// Wire-type or cryptographic error from the `cashu` crate
    #[error(transparent)]
    Cashu(#[from] cashu::Error),
    /// Database error
    #[error(transparent)]
    Database(#[from] crate::database::Error),
    /// Lightning backend error
    #[error(transparent)]
    Lightning(#[from] crate::lightning::Error),

    /// A referenced keyset id is not known to this mint
    #[error("Unknown keyset: {0}")]
    KeysetUnknown(Id),
    /// A keyset id was referenced that exists but is retired
    #[error("Inactive keyset")]
    InactiveKeyset,
    /// Unit not accepted for the requested operation
    #[error("Unsupported unit")]
    UnsupportedUnit,
    /// Amount falls outside the mint's configured [min, max] range
    #[error("Amount out of range: min {0}, max {1}, requested {2}")]
    AmountOutofLimitRange(Amount, Amount, Amount),
    /// Minting is disabled mint-wide or for this unit
    #[error("Minting disabled")]
    MintingDisabled,
    /// Melting is disabled mint-wide or for this unit
    #[error("Melting disabled")]
    MeltingDisabled,

    /// No quote exists with the given id
    #[error("Unknown quote")]
    UnknownQuote,
    /// The quote has passed its expiry
    #[error("Quote expired at {0}, now {1}")]
    ExpiredQuote(u64, u64),
    /// A mint was attempted against a quote that has not been paid
    #[error("Quote not paid")]
    UnpaidQuote,
    /// A mint was attempted against a quote that was already fully issued
    #[error("Quote already issued")]
    IssuedQuote,
    /// A melt was attempted against a quote still pending settlement
    #[error("Quote pending")]
    PendingQuote,
    /// A melt was attempted against a quote that already settled
    #[error("Quote already paid")]
    PaidQuote,

    /// One of the submitted blinded messages has already been signed
    #[error("Blinded message already signed")]
    BlindedMessageAlreadySigned,
    /// Sum of inputs does not equal sum of outputs plus fees
    #[error("Transaction unbalanced: inputs {0}, outputs {1}, fee {2}")]
    TransactionUnbalanced(u64, u64, u64),
    /// The same proof secret appears more than once in a request
    #[error("Duplicate proofs")]
    DuplicateProofs,
    /// Inputs or outputs mix more than one unit in a single request
    #[error("Multiple units")]
    MultipleUnits,
    /// SIG_ALL was requested on a melt, which has no outputs to co-sign
    #[error("SIG_ALL cannot be used on a melt request")]
    SigAllUsedInMelt,
    /// A multi-part-payment amount was requested where the backend or path
    /// does not support it (internal settlement, or a backend lacking MPP)
    #[error("Multi-part payment not supported for this request")]
    MppNotSupported,
    /// An input proof has already been spent
    #[error("Token already spent")]
    TokenAlreadySpent,
    /// An input proof is reserved by an in-flight melt
    #[error("Token pending")]
    TokenPending,
    /// A proof's spending condition witness did not satisfy its policy
    #[error("Spending conditions not met")]
    SpendingConditionsNotMet,
    /// Operation refused by a mint-wide policy (balance cap, peg-out-only)
    #[error("Not allowed: {0}")]
    NotAllowed(String),

    /// Catch-all for invariants that should be unreachable
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Numeric error codes shared with wallets across implementations, per the
/// NUT-00 error response format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Blinded message was already signed
    BlindedMessageAlreadySigned,
    /// A signature or proof failed cryptographic verification
    TokenNotVerified,
    /// A proof has already been spent
    TokenAlreadySpent,
    /// Sum of inputs/outputs/fees did not balance
    TransactionUnbalanced,
    /// Unit not supported for this operation
    UnitUnsupported,
    /// Amount outside the mint's configured range
    AmountOutofLimitRange,
    /// Proof reserved by a pending melt
    TokenPending,
    /// Keyset id not recognised
    KeysetNotFound,
    /// Keyset is retired
    KeysetInactive,
    /// Quote has not been paid
    QuoteNotPaid,
    /// Quote has already been fully issued
    TokensAlreadyIssued,
    /// Minting is disabled
    MintingDisabled,
    /// Quote is pending settlement
    QuotePending,
    /// Invoice has already been paid
    InvoiceAlreadyPaid,
    /// Quote has expired
    QuoteExpired,
    /// Lightning backend error
    LightningError,
    /// Unmapped error
    Unknown(u16),
}

impl ErrorCode {
    /// The numeric code sent on the wire.
    pub fn to_code(self) -> u16 {
        match self {
            Self::BlindedMessageAlreadySigned => 10002,
            Self::TokenNotVerified => 10003,
            Self::TokenAlreadySpent => 11001,
            Self::TransactionUnbalanced => 11002,
            Self::UnitUnsupported => 11005,
            Self::AmountOutofLimitRange => 11006,
            Self::TokenPending => 11007,
            Self::KeysetNotFound => 12001,
            Self::KeysetInactive => 12002,
            Self::LightningError => 20000,
            Self::QuoteNotPaid => 20001,
            Self::TokensAlreadyIssued => 20002,
            Self::MintingDisabled => 20003,
            Self::QuotePending => 20005,
            Self::InvoiceAlreadyPaid => 20006,
            Self::QuoteExpired => 20007,
            Self::Unknown(code) => code,
        }
    }

    /// Recover a known code from its numeric value, falling back to
    /// `Unknown` for anything not in the table above.
    pub fn from_code(code: u16) -> Self {
        match code {
            10002 => Self::BlindedMessageAlreadySigned,
            10003 => Self::TokenNotVerified,
            11001 => Self::TokenAlreadySpent,
            11002 => Self::TransactionUnbalanced,
            11005 => Self::UnitUnsupported,
            11006 => Self::AmountOutofLimitRange,
            11007 => Self::TokenPending,
            12001 => Self::KeysetNotFound,
            12002 => Self::KeysetInactive,
            20000 => Self::LightningError,
            20001 => Self::QuoteNotPaid,
            20002 => Self::TokensAlreadyIssued,
            20003 => Self::MintingDisabled,
            20005 => Self::QuotePending,
            20006 => Self::InvoiceAlreadyPaid,
            20007 => Self::QuoteExpired,
            other => Self::Unknown(other),
        }
    }
}

/// The JSON body returned on any mint API error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Numeric error code
    pub code: u16,
    /// Human-readable error summary
    pub error: String,
    /// Optional additional detail
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ErrorResponse {
    /// Parse from a response body.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

impl From<&Error> for ErrorResponse {
    fn from(err: &Error) -> Self {
        let code = match err {
            Error::BlindedMessageAlreadySigned => ErrorCode::BlindedMessageAlreadySigned,
            Error::TokenAlreadySpent => ErrorCode::TokenAlreadySpent,
            Error::TransactionUnbalanced(..) => ErrorCode::TransactionUnbalanced,
            Error::UnsupportedUnit | Error::MultipleUnits => ErrorCode::UnitUnsupported,
            Error::AmountOutofLimitRange(..) => ErrorCode::AmountOutofLimitRange,
            Error::TokenPending => ErrorCode::TokenPending,
            Error::KeysetUnknown(_) => ErrorCode::KeysetNotFound,
            Error::InactiveKeyset => ErrorCode::KeysetInactive,
            Error::UnpaidQuote => ErrorCode::QuoteNotPaid,
            Error::IssuedQuote => ErrorCode::TokensAlreadyIssued,
            Error::MintingDisabled | Error::MeltingDisabled => ErrorCode::MintingDisabled,
            Error::PendingQuote => ErrorCode::QuotePending,
            Error::PaidQuote => ErrorCode::InvoiceAlreadyPaid,
            Error::ExpiredQuote(..) => ErrorCode::QuoteExpired,
            Error::Lightning(_) => ErrorCode::LightningError,
            _ => ErrorCode::Unknown(9999),
        };

        Self {
            code: code.to_code(),
            error: err.to_string(),
            detail: None,
        }
    }
}
