//! Event dispatcher (NUT-17): push per-entity state changes to subscribers.
//!
//! A generic, type-erased publish/subscribe engine is more machinery than
//! this ledger needs: it only ever publishes three concrete event kinds
//! (mint quote, melt quote, proof state), each keyed by its own entity id.
//! A bounded `tokio::sync::broadcast` channel per topic covers the same
//! ground without the generic layer: a slow subscriber that falls behind
//! the channel's capacity observes `Lagged`, which is an acceptable
//! drop-oldest-on-overflow outcome for a notification feed wallets already
//! poll as a fallback.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::RwLock;

use cashu::nuts::nut01::PublicKey;
use cashu::nuts::nut04::MintQuoteBolt11Response;
use cashu::nuts::nut05::MeltQuoteBolt11Response;
use cashu::nuts::nut07::ProofState;
use cashu::nuts::nut17::NotificationPayload;
use tokio::sync::broadcast;

/// Bounded capacity of each per-entity broadcast channel.
const TOPIC_CAPACITY: usize = 16;

struct TopicChannels<K, T> {
    senders: RwLock<HashMap<K, broadcast::Sender<T>>>,
}

impl<K, T> Default for TopicChannels<K, T> {
    fn default() -> Self {
        Self { senders: RwLock::new(HashMap::new()) }
    }
}

impl<K: Eq + Hash + Clone, T: Clone> TopicChannels<K, T> {
    fn subscribe(&self, key: K) -> broadcast::Receiver<T> {
        let existing = self.senders.read().expect("lock not poisoned").get(&key).map(|s| s.subscribe());
        if let Some(rx) = existing {
            return rx;
        }
        let mut senders = self.senders.write().expect("lock not poisoned");
        senders
            .entry(key)
            .or_insert_with(|| broadcast::channel(TOPIC_CAPACITY).0)
            .subscribe()
    }

    /// Deliver `value` to every current subscriber of `key`. Best-effort:
    /// no subscribers is not an error, and a lagged subscriber simply misses
    /// the notification (it can still poll the REST read endpoint).
    fn publish(&self, key: &K, value: T) {
        if let Some(sender) = self.senders.read().expect("lock not poisoned").get(key) {
            let _ = sender.send(value);
        }
    }
}

/// Dispatches NUT-17 notifications to WebSocket (or any other) subscribers.
/// Owned by [`crate::mint::Mint`] and shared by reference with every ledger
/// operation that changes quote or proof state.
#[derive(Default)]
pub struct PubSubManager {
    mint_quotes: TopicChannels<String, MintQuoteBolt11Response>,
    melt_quotes: TopicChannels<String, MeltQuoteBolt11Response>,
    proof_states: TopicChannels<PublicKey, ProofState>,
}

impl std::fmt::Debug for PubSubManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PubSubManager").finish_non_exhaustive()
    }
}

impl PubSubManager {
    /// A dispatcher with no subscribers yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to state changes for one mint quote id.
    pub fn subscribe_mint_quote(&self, quote_id: &str) -> broadcast::Receiver<MintQuoteBolt11Response> {
        self.mint_quotes.subscribe(quote_id.to_string())
    }

    /// Subscribe to state changes for one melt quote id.
    pub fn subscribe_melt_quote(&self, quote_id: &str) -> broadcast::Receiver<MeltQuoteBolt11Response> {
        self.melt_quotes.subscribe(quote_id.to_string())
    }

    /// Subscribe to state changes for one proof, by its `Y` value.
    pub fn subscribe_proof_state(&self, y: PublicKey) -> broadcast::Receiver<ProofState> {
        self.proof_states.subscribe(y)
    }

    /// Publish a mint quote's new state.
    pub fn publish_mint_quote(&self, quote_id: &str, event: MintQuoteBolt11Response) {
        self.mint_quotes.publish(&quote_id.to_string(), event);
    }

    /// Publish a melt quote's new state.
    pub fn publish_melt_quote(&self, quote_id: &str, event: MeltQuoteBolt11Response) {
        self.melt_quotes.publish(&quote_id.to_string(), event);
    }

    /// Publish a proof's new state.
    pub fn publish_proof_state(&self, event: ProofState) {
        self.proof_states.publish(&event.y, event);
    }
}

impl From<MintQuoteBolt11Response> for NotificationPayload {
    fn from(value: MintQuoteBolt11Response) -> Self {
        NotificationPayload::MintQuote(value)
    }
}

impl From<MeltQuoteBolt11Response> for NotificationPayload {
    fn from(value: MeltQuoteBolt11Response) -> Self {
        NotificationPayload::MeltQuote(value)
    }
}

impl From<ProofState> for NotificationPayload {
    fn from(value: ProofState) -> Self {
        NotificationPayload::ProofState(value)
    }
}

#[cfg(test)]
mod tests {
    use cashu::nuts::nut04::MintQuoteState;
    use cashu::nuts::nut07::State;

    use super::*;

    #[tokio::test]
    async fn subscriber_receives_published_event() {
        let manager = PubSubManager::new();
        let mut rx = manager.subscribe_mint_quote("quote-1");

        manager.publish_mint_quote(
            "quote-1",
            MintQuoteBolt11Response {
                quote: "quote-1".into(),
                request: "lnbc1".into(),
                state: MintQuoteState::Paid,
                expiry: None,
            },
        );

        let event = rx.recv().await.expect("event delivered");
        assert_eq!(event.state, MintQuoteState::Paid);
    }

    #[tokio::test]
    async fn publish_with_no_subscribers_is_not_an_error() {
        let manager = PubSubManager::new();
        let secp = bitcoin::secp256k1::Secp256k1::new();
        let sk = bitcoin::secp256k1::SecretKey::from_slice(&[4u8; 32]).expect("valid scalar");
        let y: PublicKey = sk.public_key(&secp).into();
        manager.publish_proof_state(ProofState { y, state: State::Spent, witness: None });
    }
}
