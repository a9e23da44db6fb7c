//! NUT-05: Melt tokens (pay a Lightning invoice with ecash)
//!
//! <https://github.com/cashubtc/nuts/blob/main/05.md>

use std::fmt;

use serde::{Deserialize, Serialize};

use super::nut00::{BlindedMessage, BlindedSignature, CurrencyUnit, PaymentMethod, Proof};
use crate::amount::Amount;

/// Lifecycle of a melt quote.
///
/// `Pending` is entered when the mint has dispatched a payment to its
/// Lightning backend but has not yet learned the outcome (crash, backend
/// timeout, or a payment genuinely still in flight); it resolves to either
/// `Paid` or `Failed` once the backend's status is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MeltQuoteState {
    /// Not yet attempted
    Unpaid,
    /// Payment dispatched, outcome not yet known
    Pending,
    /// Payment settled
    Paid,
    /// Payment definitively failed; quote inputs were never spent and may be
    /// retried
    Failed,
}

impl fmt::Display for MeltQuoteState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unpaid => write!(f, "UNPAID"),
            Self::Pending => write!(f, "PENDING"),
            Self::Paid => write!(f, "PAID"),
            Self::Failed => write!(f, "FAILED"),
        }
    }
}

/// `POST /v1/melt/quote/bolt11` request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeltQuoteBolt11Request {
    /// BOLT11 invoice to be paid
    pub request: String,
    /// Unit the quote's `amount`/`fee_reserve` are denominated in
    pub unit: CurrencyUnit,
}

/// `POST /v1/melt/quote/bolt11` response and `GET .../{quote_id}` response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeltQuoteBolt11Response {
    /// Opaque quote identifier
    pub quote: String,
    /// Invoice amount, excluding the routing fee reserve
    pub amount: Amount,
    /// Upper bound on the Lightning routing fee, reserved in addition to
    /// `amount` when inputs are provided to `/v1/melt/bolt11`
    pub fee_reserve: Amount,
    /// Current quote state
    pub state: MeltQuoteState,
    /// Unix timestamp after which the quote can no longer be melted
    pub expiry: Option<u64>,
    /// Payment preimage, present once `state` is `Paid`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_preimage: Option<String>,
    /// Change returned from an overpaid fee reserve, present once settled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change: Option<Vec<BlindedSignature>>,
}

/// `POST /v1/melt/bolt11` request: inputs covering `amount + fee_reserve`,
/// plus optional blank outputs to receive overpaid-fee change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeltBolt11Request {
    /// The quote being settled
    pub quote: String,
    /// Proofs being spent to cover the payment and its fee reserve
    pub inputs: Vec<Proof>,
    /// Optional blank outputs for overpaid-fee change, signed only up to the
    /// actual unused portion of the fee reserve
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outputs: Option<Vec<BlindedMessage>>,
}

impl MeltBolt11Request {
    /// Total amount committed by the spent inputs
    pub fn total_input_amount(&self) -> Amount {
        Proof::total_amount(&self.inputs)
    }
}

/// `POST /v1/melt/bolt11` response. Mirrors [`MeltQuoteBolt11Response`]: the
/// wallet may need to poll the quote afterward if the response arrives while
/// the payment is still `Pending`.
pub type MeltBolt11Response = MeltQuoteBolt11Response;

/// One entry of `/v1/info`'s NUT-05 settings: per-(method, unit) limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeltMethodSettings {
    /// Settlement method (only `bolt11` is modelled)
    pub method: PaymentMethod,
    /// Unit this entry applies to
    pub unit: CurrencyUnit,
    /// Minimum meltable amount, if bounded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_amount: Option<Amount>,
    /// Maximum meltable amount, if bounded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_amount: Option<Amount>,
    /// Whether melting is currently disabled for this (method, unit)
    #[serde(default)]
    pub disabled: bool,
}
