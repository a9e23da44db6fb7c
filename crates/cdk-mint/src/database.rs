//! Database boundary: the storage traits the ledger engine is generic over,
//! plus the one in-memory implementation this crate ships.
//!
//! The boundary splits concerns one trait's worth of methods per table, but compound
//! writes that must be atomic are not exposed as free-standing methods on
//! those traits — they live on [`MintTransaction`], returned by
//! [`MintDatabase::begin_transaction`], so a caller cannot accidentally split
//! a state transition across two non-atomic calls.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use cashu::nuts::nut00::{BlindedMessage, BlindedSignature};
use cashu::nuts::nut01::PublicKey;
use cashu::nuts::nut02::Id;
use cashu::nuts::nut04::MintQuoteState;
use cashu::nuts::nut05::MeltQuoteState;
use cashu::nuts::nut07::State;
use cashu::Amount;
use thiserror::Error;

use crate::keysets::MintKeySetInfo;
use crate::types::{MeltQuote, MintQuote};

/// Errors arising from the storage layer.
#[derive(Debug, Error)]
pub enum Error {
    /// A row that was expected to exist was not found
    #[error("Not found")]
    NotFound,
    /// A unique-key constraint was violated — the caller lost a race
    #[error("Duplicate: {0}")]
    Duplicate(String),
    /// Catch-all for an implementation's own backing store
    #[error(transparent)]
    Internal(Box<dyn std::error::Error + Send + Sync>),
}

/// Keyset reads: active keyset lookup and historical keyset metadata.
#[async_trait]
pub trait MintKeysDatabase {
    /// The active keyset id for a unit, if one has been activated
    async fn get_active_keyset_id(&self, unit: &cashu::nuts::nut00::CurrencyUnit) -> Result<Option<Id>, Error>;
    /// Every unit's currently active keyset id
    async fn get_active_keysets(&self) -> Result<HashMap<cashu::nuts::nut00::CurrencyUnit, Id>, Error>;
    /// Metadata for one keyset, active or retired
    async fn get_keyset_info(&self, id: &Id) -> Result<Option<MintKeySetInfo>, Error>;
    /// Metadata for every keyset this mint has ever used
    async fn get_keyset_infos(&self) -> Result<Vec<MintKeySetInfo>, Error>;
}

/// Quote reads: mint and melt quotes by id.
#[async_trait]
pub trait MintQuotesDatabase {
    /// Look up a mint quote by id
    async fn get_mint_quote(&self, quote_id: &str) -> Result<Option<MintQuote>, Error>;
    /// Look up a mint quote by its normalized payment request, used to find
    /// an internal-settlement counterpart for a melt
    async fn get_mint_quote_by_request(&self, request: &str) -> Result<Option<MintQuote>, Error>;
    /// Every mint quote ever issued
    async fn get_mint_quotes(&self) -> Result<Vec<MintQuote>, Error>;
    /// Look up a melt quote by id
    async fn get_melt_quote(&self, quote_id: &str) -> Result<Option<MeltQuote>, Error>;
    /// Every melt quote ever issued
    async fn get_melt_quotes(&self) -> Result<Vec<MeltQuote>, Error>;
    /// Every melt quote id that currently has at least one pending proof,
    /// used to drive startup recovery
    async fn get_melt_quotes_with_pending_proofs(&self) -> Result<Vec<String>, Error>;
}

/// Proof reads: spend and reservation state, keyed by `Y`.
#[async_trait]
pub trait MintProofsDatabase {
    /// The state of a set of proofs, `Unspent` for any `Y` not on record
    async fn get_proofs_states(&self, ys: &[PublicKey]) -> Result<Vec<State>, Error>;
    /// The melt quote id a pending proof is reserved for, if any
    async fn get_pending_proof_quote_id(&self, y: &PublicKey) -> Result<Option<String>, Error>;
    /// Every `Y` currently reserved pending for a given melt quote, used by
    /// startup recovery to re-check each quote's outstanding proofs
    async fn get_pending_proof_ys(&self, quote_id: &str) -> Result<Vec<PublicKey>, Error>;
}

/// Promise (blind signature) reads, keyed by `B_`.
#[async_trait]
pub trait MintSignaturesDatabase {
    /// Look up a previously issued promise by the blinded message it signed
    async fn get_blind_signature(&self, blinded_secret: &PublicKey) -> Result<Option<BlindedSignature>, Error>;
    /// Batch form of [`Self::get_blind_signature`], preserving input order,
    /// with `None` for messages never signed
    async fn get_blind_signatures(
        &self,
        blinded_secrets: &[PublicKey],
    ) -> Result<Vec<Option<BlindedSignature>>, Error>;
}

/// A handle over which the ledger's atomic compound writes are performed.
/// Each method is named for the operation it backs
/// rather than exposing a generic `execute`, so atomicity is a property of
/// the type rather than of caller discipline.
#[async_trait]
pub trait MintTransaction: Send {
    /// Persist a freshly generated keyset and mark it active for its unit
    async fn set_active_keyset(
        &mut self,
        unit: cashu::nuts::nut00::CurrencyUnit,
        id: Id,
    ) -> Result<(), Error>;
    /// Persist a keyset's metadata (used both on first generation and when
    /// loading historical keysets at startup)
    async fn add_keyset_info(&mut self, info: MintKeySetInfo) -> Result<(), Error>;

    /// Persist a freshly created mint quote
    async fn add_mint_quote(&mut self, quote: MintQuote) -> Result<(), Error>;
    /// Overwrite a mint quote's state. `paid_time` is recorded (and never
    /// cleared) on the `Unpaid` -> `Paid` transition.
    async fn update_mint_quote_state(
        &mut self,
        quote_id: &str,
        state: MintQuoteState,
        paid_time: Option<u64>,
    ) -> Result<(), Error>;
    /// Persist a freshly created melt quote
    async fn add_melt_quote(&mut self, quote: MeltQuote) -> Result<(), Error>;
    /// Overwrite a melt quote's state (e.g. `Unpaid` -> `Pending`). `paid_time`
    /// is only meaningful on a transition to `Paid`.
    async fn update_melt_quote_state(
        &mut self,
        quote_id: &str,
        state: MeltQuoteState,
        paid_time: Option<u64>,
    ) -> Result<(), Error>;

    /// Reserve every `Y` in `ys` against `quote_id`. Fails with
    /// [`Error::Duplicate`] — without having reserved any of them — if any
    /// `Y` is already pending or spent.
    async fn insert_pending_proofs(&mut self, ys: &[PublicKey], quote_id: &str) -> Result<(), Error>;
    /// Release a melt's pending reservation. A no-op for any `Y` that has
    /// since settled to `Spent` — this only clears entries still `Pending`,
    /// so calling it after a successful settlement (to drop the now-stale
    /// quote_id association) cannot un-spend a proof.
    async fn remove_pending_proofs(&mut self, ys: &[PublicKey]) -> Result<(), Error>;

    /// Atomically transition a mint quote to `Issued` and persist the
    /// promises generated for its outputs, so a crash between the two can
    /// never leave a quote issuable twice.
    async fn commit_mint_issuance(
        &mut self,
        quote_id: &str,
        promises: Vec<(PublicKey, BlindedSignature)>,
    ) -> Result<(), Error>;

    /// Atomically mark a swap's inputs spent and persist its output
    /// promises.
    async fn commit_swap(
        &mut self,
        spent: Vec<(PublicKey, Amount, Id)>,
        promises: Vec<(PublicKey, BlindedSignature)>,
    ) -> Result<(), Error>;

    /// Atomically mark both sides of an internal settlement `Paid`, sharing
    /// one `paid_time`, and spend the melt's input proofs.
    async fn commit_internal_melt_settlement(
        &mut self,
        mint_quote_id: &str,
        melt_quote_id: &str,
        paid_time: u64,
        spent: Vec<(PublicKey, Amount, Id)>,
    ) -> Result<(), Error>;

    /// Atomically record a melt's outcome: fee paid, preimage, final state,
    /// spent-proof insertion, and change promises.
    #[allow(clippy::too_many_arguments)]
    async fn commit_melt_settlement(
        &mut self,
        melt_quote_id: &str,
        fee_paid: Amount,
        payment_preimage: Option<String>,
        spent: Vec<(PublicKey, Amount, Id)>,
        change: Vec<(PublicKey, BlindedSignature)>,
        paid_time: u64,
    ) -> Result<(), Error>;

    /// Mark a melt quote `Failed` (payment did not go through).
    async fn fail_melt_quote(&mut self, melt_quote_id: &str) -> Result<(), Error>;

    /// Finalize a melt quote discovered `Paid` at startup recovery.
    /// Unlike [`Self::commit_melt_settlement`], only the reserved `Y`s are
    /// available at this point — the original proofs are long gone, only
    /// their pending reservation survived the restart — so this spends by
    /// `Y` alone with no change promises (blank outputs were never
    /// persisted either, so overpaid fees from a payment that settled
    /// between shutdown and recovery are forfeit; a deployment that cannot
    /// accept that should persist blank outputs alongside the reservation).
    #[allow(clippy::too_many_arguments)]
    async fn commit_recovered_melt_settlement(
        &mut self,
        melt_quote_id: &str,
        fee_paid: Amount,
        payment_preimage: Option<String>,
        ys: &[PublicKey],
        paid_time: u64,
    ) -> Result<(), Error>;

    /// Commit every write performed through this handle.
    async fn commit(self: Box<Self>) -> Result<(), Error>;
    /// Discard every write performed through this handle.
    async fn rollback(self: Box<Self>) -> Result<(), Error>;
}

/// The full database a [`crate::mint::Mint`] is constructed with.
#[async_trait]
pub trait MintDatabase:
    MintKeysDatabase + MintQuotesDatabase + MintProofsDatabase + MintSignaturesDatabase + Send + Sync
{
    /// Begin a transaction backed by this store.
    async fn begin_transaction(&self) -> Result<Box<dyn MintTransaction>, Error>;
}

#[derive(Default)]
struct Inner {
    active_keysets: HashMap<cashu::nuts::nut00::CurrencyUnit, Id>,
    keyset_infos: HashMap<Id, MintKeySetInfo>,
    mint_quotes: HashMap<String, MintQuote>,
    melt_quotes: HashMap<String, MeltQuote>,
    proof_states: HashMap<[u8; 33], State>,
    pending_quote_ids: HashMap<[u8; 33], String>,
    promises: HashMap<[u8; 33], BlindedSignature>,
}

/// Reference in-memory store. All state lives behind a single `RwLock`: a
/// "transaction" is simply a write-guard held for the duration of the
/// compound operation — sufficient atomicity since there is no real backing
/// store to roll back.
pub struct MintMemoryDatabase {
    inner: Arc<RwLock<Inner>>,
}

impl std::fmt::Debug for MintMemoryDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MintMemoryDatabase").finish_non_exhaustive()
    }
}

impl Default for MintMemoryDatabase {
    fn default() -> Self {
        Self::new()
    }
}

impl MintMemoryDatabase {
    /// An empty store.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner::default())),
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Inner> {
        self.inner.read().expect("lock not poisoned")
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Inner> {
        self.inner.write().expect("lock not poisoned")
    }
}

#[async_trait]
impl MintKeysDatabase for MintMemoryDatabase {
    async fn get_active_keyset_id(&self, unit: &cashu::nuts::nut00::CurrencyUnit) -> Result<Option<Id>, Error> {
        Ok(self.read().active_keysets.get(unit).copied())
    }

    async fn get_active_keysets(&self) -> Result<HashMap<cashu::nuts::nut00::CurrencyUnit, Id>, Error> {
        Ok(self.read().active_keysets.clone())
    }

    async fn get_keyset_info(&self, id: &Id) -> Result<Option<MintKeySetInfo>, Error> {
        Ok(self.read().keyset_infos.get(id).cloned())
    }

    async fn get_keyset_infos(&self) -> Result<Vec<MintKeySetInfo>, Error> {
        Ok(self.read().keyset_infos.values().cloned().collect())
    }
}

#[async_trait]
impl MintQuotesDatabase for MintMemoryDatabase {
    async fn get_mint_quote(&self, quote_id: &str) -> Result<Option<MintQuote>, Error> {
        Ok(self.read().mint_quotes.get(quote_id).cloned())
    }

    async fn get_mint_quote_by_request(&self, request: &str) -> Result<Option<MintQuote>, Error> {
        Ok(self
            .read()
            .mint_quotes
            .values()
            .find(|q| q.request == request)
            .cloned())
    }

    async fn get_mint_quotes(&self) -> Result<Vec<MintQuote>, Error> {
        Ok(self.read().mint_quotes.values().cloned().collect())
    }

    async fn get_melt_quote(&self, quote_id: &str) -> Result<Option<MeltQuote>, Error> {
        Ok(self.read().melt_quotes.get(quote_id).cloned())
    }

    async fn get_melt_quotes(&self) -> Result<Vec<MeltQuote>, Error> {
        Ok(self.read().melt_quotes.values().cloned().collect())
    }

    async fn get_melt_quotes_with_pending_proofs(&self) -> Result<Vec<String>, Error> {
        let inner = self.read();
        let mut ids: Vec<String> = inner.pending_quote_ids.values().cloned().collect();
        ids.sort();
        ids.dedup();
        Ok(ids)
    }
}

#[async_trait]
impl MintProofsDatabase for MintMemoryDatabase {
    async fn get_proofs_states(&self, ys: &[PublicKey]) -> Result<Vec<State>, Error> {
        let inner = self.read();
        Ok(ys
            .iter()
            .map(|y| inner.proof_states.get(&y.to_bytes()).copied().unwrap_or(State::Unspent))
            .collect())
    }

    async fn get_pending_proof_quote_id(&self, y: &PublicKey) -> Result<Option<String>, Error> {
        Ok(self.read().pending_quote_ids.get(&y.to_bytes()).cloned())
    }

    async fn get_pending_proof_ys(&self, quote_id: &str) -> Result<Vec<PublicKey>, Error> {
        let inner = self.read();
        Ok(inner
            .pending_quote_ids
            .iter()
            .filter(|(_, q)| q.as_str() == quote_id)
            .map(|(bytes, _)| PublicKey::from_slice(bytes).expect("stored bytes are a valid point"))
            .collect())
    }
}

#[async_trait]
impl MintSignaturesDatabase for MintMemoryDatabase {
    async fn get_blind_signature(&self, blinded_secret: &PublicKey) -> Result<Option<BlindedSignature>, Error> {
        Ok(self.read().promises.get(&blinded_secret.to_bytes()).cloned())
    }

    async fn get_blind_signatures(
        &self,
        blinded_secrets: &[PublicKey],
    ) -> Result<Vec<Option<BlindedSignature>>, Error> {
        let inner = self.read();
        Ok(blinded_secrets
            .iter()
            .map(|b| inner.promises.get(&b.to_bytes()).cloned())
            .collect())
    }
}

#[async_trait]
impl MintDatabase for MintMemoryDatabase {
    async fn begin_transaction(&self) -> Result<Box<dyn MintTransaction>, Error> {
        Ok(Box::new(MemoryTransaction {
            inner: self.inner.clone(),
        }))
    }
}

struct MemoryTransaction {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryTransaction {
    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Inner> {
        self.inner.write().expect("lock not poisoned")
    }
}

#[async_trait]
impl MintTransaction for MemoryTransaction {
    async fn set_active_keyset(&mut self, unit: cashu::nuts::nut00::CurrencyUnit, id: Id) -> Result<(), Error> {
        self.write().active_keysets.insert(unit, id);
        Ok(())
    }

    async fn add_keyset_info(&mut self, info: MintKeySetInfo) -> Result<(), Error> {
        self.write().keyset_infos.insert(info.id, info);
        Ok(())
    }

    async fn add_mint_quote(&mut self, quote: MintQuote) -> Result<(), Error> {
        self.write().mint_quotes.insert(quote.id.clone(), quote);
        Ok(())
    }

    async fn update_mint_quote_state(
        &mut self,
        quote_id: &str,
        state: MintQuoteState,
        paid_time: Option<u64>,
    ) -> Result<(), Error> {
        let mut inner = self.write();
        let quote = inner.mint_quotes.get_mut(quote_id).ok_or(Error::NotFound)?;
        quote.state = state;
        if let Some(paid_time) = paid_time {
            quote.paid_time = Some(paid_time);
        }
        Ok(())
    }

    async fn add_melt_quote(&mut self, quote: MeltQuote) -> Result<(), Error> {
        self.write().melt_quotes.insert(quote.id.clone(), quote);
        Ok(())
    }

    async fn update_melt_quote_state(
        &mut self,
        quote_id: &str,
        state: MeltQuoteState,
        paid_time: Option<u64>,
    ) -> Result<(), Error> {
        let mut inner = self.write();
        let quote = inner.melt_quotes.get_mut(quote_id).ok_or(Error::NotFound)?;
        quote.state = state;
        if let Some(paid_time) = paid_time {
            quote.paid_time = Some(paid_time);
        }
        Ok(())
    }

    async fn insert_pending_proofs(&mut self, ys: &[PublicKey], quote_id: &str) -> Result<(), Error> {
        let mut inner = self.write();
        for y in ys {
            let bytes = y.to_bytes();
            if inner.proof_states.get(&bytes).is_some() || inner.pending_quote_ids.contains_key(&bytes) {
                return Err(Error::Duplicate(y.to_string()));
            }
        }
        for y in ys {
            let bytes = y.to_bytes();
            inner.proof_states.insert(bytes, State::Pending);
            inner.pending_quote_ids.insert(bytes, quote_id.to_string());
        }
        Ok(())
    }

    async fn remove_pending_proofs(&mut self, ys: &[PublicKey]) -> Result<(), Error> {
        let mut inner = self.write();
        for y in ys {
            let bytes = y.to_bytes();
            if inner.proof_states.get(&bytes) == Some(&State::Pending) {
                inner.proof_states.remove(&bytes);
            }
            inner.pending_quote_ids.remove(&bytes);
        }
        Ok(())
    }

    async fn commit_mint_issuance(
        &mut self,
        quote_id: &str,
        promises: Vec<(PublicKey, BlindedSignature)>,
    ) -> Result<(), Error> {
        let mut inner = self.write();
        let quote = inner.mint_quotes.get_mut(quote_id).ok_or(Error::NotFound)?;
        quote.state = MintQuoteState::Issued;
        for (blinded_secret, signature) in promises {
            inner.promises.insert(blinded_secret.to_bytes(), signature);
        }
        Ok(())
    }

    async fn commit_swap(
        &mut self,
        spent: Vec<(PublicKey, Amount, Id)>,
        promises: Vec<(PublicKey, BlindedSignature)>,
    ) -> Result<(), Error> {
        let mut inner = self.write();
        // Check-then-insert happens under one write-lock acquisition (no
        // await in between), so two concurrent swaps of the same Y cannot
        // both observe Unspent: this is what makes S5 (double-spend) safe
        // without a separate pending-proof reservation for plain swaps.
        for (y, _amount, _keyset_id) in &spent {
            if inner.proof_states.get(&y.to_bytes()).is_some() {
                return Err(Error::Duplicate(y.to_string()));
            }
        }
        for (y, _amount, _keyset_id) in spent {
            inner.proof_states.insert(y.to_bytes(), State::Spent);
        }
        for (blinded_secret, signature) in promises {
            inner.promises.insert(blinded_secret.to_bytes(), signature);
        }
        Ok(())
    }

    async fn commit_internal_melt_settlement(
        &mut self,
        mint_quote_id: &str,
        melt_quote_id: &str,
        paid_time: u64,
        spent: Vec<(PublicKey, Amount, Id)>,
    ) -> Result<(), Error> {
        let mut inner = self.write();
        {
            let mint_quote = inner.mint_quotes.get_mut(mint_quote_id).ok_or(Error::NotFound)?;
            mint_quote.state = MintQuoteState::Paid;
            mint_quote.paid_time = Some(paid_time);
        }
        {
            let melt_quote = inner.melt_quotes.get_mut(melt_quote_id).ok_or(Error::NotFound)?;
            melt_quote.state = MeltQuoteState::Paid;
            melt_quote.payment_preimage = None;
            melt_quote.paid_time = Some(paid_time);
        }
        for (y, _amount, _keyset_id) in spent {
            inner.proof_states.insert(y.to_bytes(), State::Spent);
        }
        Ok(())
    }

    async fn commit_melt_settlement(
        &mut self,
        melt_quote_id: &str,
        fee_paid: Amount,
        payment_preimage: Option<String>,
        spent: Vec<(PublicKey, Amount, Id)>,
        change: Vec<(PublicKey, BlindedSignature)>,
        paid_time: u64,
    ) -> Result<(), Error> {
        let mut inner = self.write();
        for (y, _amount, _keyset_id) in spent {
            inner.proof_states.insert(y.to_bytes(), State::Spent);
        }
        for (blinded_secret, signature) in change {
            inner.promises.insert(blinded_secret.to_bytes(), signature);
        }
        let quote = inner.melt_quotes.get_mut(melt_quote_id).ok_or(Error::NotFound)?;
        quote.state = MeltQuoteState::Paid;
        quote.payment_preimage = payment_preimage;
        quote.paid_time = Some(paid_time);
        let _ = fee_paid;
        Ok(())
    }

    async fn commit_recovered_melt_settlement(
        &mut self,
        melt_quote_id: &str,
        fee_paid: Amount,
        payment_preimage: Option<String>,
        ys: &[PublicKey],
        paid_time: u64,
    ) -> Result<(), Error> {
        let mut inner = self.write();
        for y in ys {
            let bytes = y.to_bytes();
            inner.proof_states.insert(bytes, State::Spent);
            inner.pending_quote_ids.remove(&bytes);
        }
        let quote = inner.melt_quotes.get_mut(melt_quote_id).ok_or(Error::NotFound)?;
        quote.state = MeltQuoteState::Paid;
        quote.payment_preimage = payment_preimage;
        quote.paid_time = Some(paid_time);
        let _ = fee_paid;
        Ok(())
    }

    async fn fail_melt_quote(&mut self, melt_quote_id: &str) -> Result<(), Error> {
        let mut inner = self.write();
        let quote = inner.melt_quotes.get_mut(melt_quote_id).ok_or(Error::NotFound)?;
        quote.state = MeltQuoteState::Failed;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), Error> {
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), Error> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use cashu::nuts::nut00::CurrencyUnit;

    use super::*;

    fn pubkey(byte: u8) -> PublicKey {
        let secp = bitcoin::secp256k1::Secp256k1::new();
        let sk = bitcoin::secp256k1::SecretKey::from_slice(&[byte; 32]).expect("valid scalar");
        sk.public_key(&secp).into()
    }

    #[tokio::test]
    async fn pending_reservation_is_exclusive() {
        let db = MintMemoryDatabase::new();
        let y = pubkey(3);

        let mut tx1 = db.begin_transaction().await.expect("begin");
        tx1.insert_pending_proofs(&[y], "quote-a").await.expect("first reservation succeeds");
        tx1.commit().await.expect("commit");

        let mut tx2 = db.begin_transaction().await.expect("begin");
        let result = tx2.insert_pending_proofs(&[y], "quote-b").await;
        assert!(matches!(result, Err(Error::Duplicate(_))));
    }

    #[tokio::test]
    async fn mint_issuance_is_atomic_with_state_transition() {
        let db = MintMemoryDatabase::new();
        let quote = MintQuote::new(Amount::from(8), CurrencyUnit::Sat, "lnbc1".into(), 0, "lookup".into(), None, 0);
        let quote_id = quote.id.clone();

        let mut tx = db.begin_transaction().await.expect("begin");
        tx.add_mint_quote(quote).await.expect("add");
        tx.commit().await.expect("commit");

        let keyset_id = Id::from_str("00456a94ab4e1c46").expect("valid id");
        let promise_key = pubkey(9);
        let signature = BlindedSignature {
            id: keyset_id,
            amount: Amount::from(8),
            c: pubkey(10),
            dleq: None,
        };

        let mut tx = db.begin_transaction().await.expect("begin");
        tx.commit_mint_issuance(&quote_id, vec![(promise_key, signature)])
            .await
            .expect("issuance commits");
        tx.commit().await.expect("commit");

        let stored = db.get_mint_quote(&quote_id).await.expect("lookup").expect("present");
        assert_eq!(stored.state, MintQuoteState::Issued);
        assert!(db
            .get_blind_signature(&promise_key)
            .await
            .expect("lookup")
            .is_some());
    }
}
