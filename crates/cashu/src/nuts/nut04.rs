//! NUT-04: Mint tokens (Lightning top-up)
//!
//! <https://github.com/cashubtc/nuts/blob/main/04.md>

use std::fmt;

use serde::{Deserialize, Serialize};

use super::nut00::{BlindedMessage, BlindedSignature, CurrencyUnit, PaymentMethod};
use crate::amount::Amount;

/// Lifecycle of a mint quote.
///
/// A quote starts `Unpaid`, moves to `Paid` once the mint observes the
/// backend invoice settle, and finally to `Issued` once a wallet has
/// successfully exchanged it for blind signatures. `Issued` is terminal: a
/// quote can only ever be minted against once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MintQuoteState {
    /// Invoice not yet paid
    Unpaid,
    /// Invoice paid, not yet exchanged for signatures
    Paid,
    /// Already exchanged for signatures
    Issued,
}

impl fmt::Display for MintQuoteState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unpaid => write!(f, "UNPAID"),
            Self::Paid => write!(f, "PAID"),
            Self::Issued => write!(f, "ISSUED"),
        }
    }
}

/// `POST /v1/mint/quote/bolt11` request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintQuoteBolt11Request {
    /// Amount to mint
    pub amount: Amount,
    /// Unit the amount is denominated in
    pub unit: CurrencyUnit,
    /// Optional NUT-20 pubkey the eventual mint request must be signed by
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pubkey: Option<super::nut01::PublicKey>,
}

/// `POST /v1/mint/quote/bolt11` response and `GET .../{quote_id}` response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintQuoteBolt11Response {
    /// Opaque quote identifier
    pub quote: String,
    /// BOLT11 invoice the wallet must pay
    pub request: String,
    /// Current quote state
    pub state: MintQuoteState,
    /// Unix timestamp after which the quote can no longer be paid or minted
    pub expiry: Option<u64>,
}

/// `POST /v1/mint/bolt11` request: proof of payment (the quote id) plus the
/// outputs to sign.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintBolt11Request {
    /// The paid quote being redeemed
    pub quote: String,
    /// Blinded messages to sign; total must equal the quote's amount
    pub outputs: Vec<BlindedMessage>,
}

impl MintBolt11Request {
    /// Total requested output amount
    pub fn total_amount(&self) -> Amount {
        BlindedMessage::total_amount(&self.outputs)
    }
}

/// `POST /v1/mint/bolt11` response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintBolt11Response {
    /// Blind signatures, in the order `outputs` was submitted
    pub signatures: Vec<BlindedSignature>,
}

/// One entry of `/v1/info`'s NUT-04 settings: per-(method, unit) limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintMethodSettings {
    /// Settlement method (only `bolt11` is modelled)
    pub method: PaymentMethod,
    /// Unit this entry applies to
    pub unit: CurrencyUnit,
    /// Minimum mintable amount, if bounded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_amount: Option<Amount>,
    /// Maximum mintable amount, if bounded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_amount: Option<Amount>,
    /// Whether minting is currently disabled for this (method, unit)
    #[serde(default)]
    pub disabled: bool,
}
