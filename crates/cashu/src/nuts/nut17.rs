//! NUT-17: WebSocket subscriptions
//!
//! <https://github.com/cashubtc/nuts/blob/main/17.md>
//!
//! Wire types only: JSON-RPC-ish envelopes a wallet uses to subscribe to
//! mint/melt quote and proof-state changes over the mint's WebSocket
//! endpoint. The dispatcher that actually fans events out to subscribers
//! lives in `cdk_mint::pub_sub`.

use serde::{Deserialize, Serialize};

use super::nut04::MintQuoteBolt11Response;
use super::nut05::MeltQuoteBolt11Response;
use super::nut07::ProofState;

/// The kind of event a client can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WsSubscriptionKind {
    /// Mint quote state changes, indexed by quote id
    Bolt11MintQuote,
    /// Melt quote state changes, indexed by quote id
    Bolt11MeltQuote,
    /// Proof state changes, indexed by `Y`
    ProofState,
}

/// JSON-RPC method name used on the subscription channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WsMethod {
    /// Open a subscription
    Subscribe,
    /// Close a subscription
    Unsubscribe,
}

/// `subscribe`/`unsubscribe` request params.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WsSubscribeParams {
    /// What kind of event to subscribe to
    pub kind: WsSubscriptionKind,
    /// Client-chosen subscription id, echoed back on every notification
    #[serde(rename = "subId")]
    pub sub_id: String,
    /// The quote ids / `Y` values to watch, depending on `kind`
    pub filters: Vec<String>,
}

/// The event body of a subscription notification, tagged by which kind of
/// subscription produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NotificationPayload {
    /// A mint quote's state changed
    MintQuote(MintQuoteBolt11Response),
    /// A melt quote's state changed
    MeltQuote(MeltQuoteBolt11Response),
    /// A proof's state changed
    ProofState(ProofState),
}
