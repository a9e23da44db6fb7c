//! Ledger-internal domain types for quotes: the full record the mint keeps,
//! as opposed to the trimmed-down NUT-04/NUT-05 wire responses built from
//! them.

use cashu::nuts::nut00::{BlindedMessage, BlindedSignature};
use cashu::nuts::nut01::PublicKey;
use cashu::nuts::nut04::{MintQuoteBolt11Response, MintQuoteState};
use cashu::nuts::nut05::{MeltQuoteBolt11Response, MeltQuoteState};
use cashu::nuts::nut00::CurrencyUnit;
use cashu::Amount;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A mint quote: a Lightning invoice the mint issued in exchange for a
/// promise to mint `amount` once it is paid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintQuote {
    /// Opaque quote id
    pub id: String,
    /// Amount to be minted once paid
    pub amount: Amount,
    /// Unit the amount is denominated in
    pub unit: CurrencyUnit,
    /// BOLT11 invoice the wallet must pay
    pub request: String,
    /// Current state
    pub state: MintQuoteState,
    /// Unix timestamp after which the quote can no longer be paid or minted
    pub expiry: u64,
    /// Opaque id the Lightning backend uses to report this invoice's status
    pub request_lookup_id: String,
    /// Optional NUT-20 pubkey the eventual mint request must be signed by
    pub pubkey: Option<PublicKey>,
    /// Unix time this quote was issued
    pub created_time: u64,
    /// Unix time the backend invoice was observed paid, set on the
    /// `Unpaid` -> `Paid` transition
    pub paid_time: Option<u64>,
}

impl MintQuote {
    /// Build a freshly issued (`Unpaid`) quote.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        amount: Amount,
        unit: CurrencyUnit,
        request: String,
        expiry: u64,
        request_lookup_id: String,
        pubkey: Option<PublicKey>,
        created_time: u64,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            amount,
            unit,
            request,
            state: MintQuoteState::Unpaid,
            expiry,
            request_lookup_id,
            pubkey,
            created_time,
            paid_time: None,
        }
    }
}

impl From<MintQuote> for MintQuoteBolt11Response {
    fn from(quote: MintQuote) -> Self {
        Self {
            quote: quote.id,
            request: quote.request,
            state: quote.state,
            expiry: Some(quote.expiry),
        }
    }
}

/// A melt quote: a request to pay a Lightning invoice in exchange for
/// burning `amount + fee_reserve` worth of ecash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeltQuote {
    /// Opaque quote id
    pub id: String,
    /// Unit the amount/fee_reserve are denominated in
    pub unit: CurrencyUnit,
    /// Invoice amount, excluding the routing fee reserve
    pub amount: Amount,
    /// Normalized BOLT11 invoice to be paid
    pub request: String,
    /// Upper bound on the Lightning routing fee
    pub fee_reserve: Amount,
    /// Current state
    pub state: MeltQuoteState,
    /// Unix timestamp after which the quote can no longer be melted
    pub expiry: u64,
    /// Opaque id the Lightning backend uses to report this payment's status
    pub request_lookup_id: String,
    /// Payment preimage, set once `state` is `Paid`
    pub payment_preimage: Option<String>,
    /// Blank outputs reserved for overpaid-fee change, set when the melt
    /// request is first submitted
    pub change_outputs: Option<Vec<BlindedMessage>>,
    /// Signed overpaid-fee change, set once the quote settles
    pub change: Option<Vec<BlindedSignature>>,
    /// Unix time this quote was issued
    pub created_time: u64,
    /// Unix time the payment settled, set once `state` reaches `Paid`
    pub paid_time: Option<u64>,
}

impl MeltQuote {
    /// Build a freshly issued (`Unpaid`) quote.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        unit: CurrencyUnit,
        amount: Amount,
        request: String,
        fee_reserve: Amount,
        expiry: u64,
        request_lookup_id: String,
        created_time: u64,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            unit,
            amount,
            request,
            fee_reserve,
            state: MeltQuoteState::Unpaid,
            expiry,
            request_lookup_id,
            payment_preimage: None,
            change_outputs: None,
            change: None,
            created_time,
            paid_time: None,
        }
    }
}

/// Outcome of a completed (or failed) [`crate::mint::Mint::melt`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Melted {
    /// Final state of the underlying melt quote
    pub state: MeltQuoteState,
    /// Invoice amount paid, excluding routing fee
    pub amount: Amount,
    /// Routing fee actually paid (zero for internal settlement or a failed
    /// payment)
    pub fee_paid: Amount,
    /// Payment preimage, present only once `state` is `Paid`
    pub preimage: Option<String>,
    /// Signed overpaid-fee change, if any blank outputs were supplied and
    /// the payment settled for less than the reserved fee
    pub change: Option<Vec<BlindedSignature>>,
}

impl From<MeltQuote> for MeltQuoteBolt11Response {
    fn from(quote: MeltQuote) -> Self {
        Self {
            quote: quote.id,
            amount: quote.amount,
            fee_reserve: quote.fee_reserve,
            state: quote.state,
            expiry: Some(quote.expiry),
            payment_preimage: quote.payment_preimage,
            change: quote.change,
        }
    }
}
