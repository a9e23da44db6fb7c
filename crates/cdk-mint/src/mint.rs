//! The ledger transaction engine: the single type every mint/melt/swap
//! request flows through. `Mint` owns nothing a concrete HTTP router needs —
//! routing, authentication, and rate limiting live outside this crate — it
//! only implements the state machine that keeps quotes, proofs and promises
//! consistent with each other.

use std::collections::HashMap;
use std::sync::Arc;

use cashu::nuts::nut00::{BlindedMessage, BlindedSignature, CurrencyUnit, PaymentMethod, Proof};
use cashu::nuts::nut01::PublicKey;
use cashu::nuts::nut02::Id;
use cashu::nuts::nut03::SwapResponse;
use cashu::nuts::nut04::{MintBolt11Response, MintQuoteBolt11Response, MintQuoteState};
use cashu::nuts::nut05::MeltQuoteBolt11Response;
use cashu::nuts::nut05::MeltQuoteState;
use cashu::nuts::nut07::{CheckStateResponse, ProofState, State};
use cashu::nuts::nut09::RestoreResponse;
use cashu::{dhke, Amount};
use tracing::instrument;

use crate::config::MintConfig;
use crate::database::MintDatabase;
use crate::error::Error;
use crate::fees;
use crate::keysets::KeysetManager;
use crate::lightning::{MintLightning, PaymentStatus};
use crate::locks::QuoteLocks;
use crate::pub_sub::PubSubManager;
use crate::types::{MeltQuote, Melted, MintQuote};
use crate::verification;

/// Lightning backends, keyed by settlement method then unit, split into two
/// levels so a lookup miss can report whether the method or the unit was the
/// problem without the caller re-deriving a compound key.
#[derive(Default)]
pub struct LightningBackends {
    backends: HashMap<PaymentMethod, HashMap<CurrencyUnit, Arc<dyn MintLightning>>>,
}

impl std::fmt::Debug for LightningBackends {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LightningBackends").finish_non_exhaustive()
    }
}

impl LightningBackends {
    /// Build a backend table from a fully assembled `{method -> {unit ->
    /// backend}}` map.
    pub fn new(backends: HashMap<PaymentMethod, HashMap<CurrencyUnit, Arc<dyn MintLightning>>>) -> Self {
        Self { backends }
    }

    /// Register a single backend for `(method, unit)`, overwriting whatever
    /// was there before.
    pub fn insert(&mut self, method: PaymentMethod, unit: CurrencyUnit, backend: Arc<dyn MintLightning>) {
        self.backends.entry(method).or_default().insert(unit, backend);
    }

    fn get(&self, method: &PaymentMethod, unit: &CurrencyUnit) -> Result<&Arc<dyn MintLightning>, Error> {
        self.backends
            .get(method)
            .and_then(|units| units.get(unit))
            .ok_or(Error::UnsupportedUnit)
    }
}

fn now() -> u64 {
    web_time::SystemTime::now()
        .duration_since(web_time::UNIX_EPOCH)
        .expect("system clock is after the unix epoch")
        .as_secs()
}

fn to_msat(amount: Amount, unit: &CurrencyUnit) -> u64 {
    match unit {
        CurrencyUnit::Msat => u64::from(amount),
        _ => u64::from(amount) * 1000,
    }
}

/// The ledger transaction engine: quotes, swaps, fee accounting, and the
/// database transactions that keep them atomic.
pub struct Mint {
    db: Arc<dyn MintDatabase>,
    keysets: KeysetManager,
    lightning: LightningBackends,
    locks: QuoteLocks,
    pub_sub: PubSubManager,
    config: MintConfig,
}

impl std::fmt::Debug for Mint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mint").finish_non_exhaustive()
    }
}

impl Mint {
    /// Build a mint over an already-decrypted seed and an assembled backend
    /// table, activating every configured keyset. Does not run startup
    /// crash recovery — call [`Self::recover_pending_melts`]
    /// explicitly once the caller is ready to talk to the Lightning
    /// backends again.
    pub async fn new(
        config: MintConfig,
        db: Arc<dyn MintDatabase>,
        seed: Vec<u8>,
        lightning: LightningBackends,
    ) -> Result<Self, Error> {
        let keysets = KeysetManager::new(seed, db.clone());
        keysets.init_keysets(config.keysets.clone()).await?;

        Ok(Self {
            db,
            keysets,
            lightning,
            locks: QuoteLocks::new(),
            pub_sub: PubSubManager::new(),
            config,
        })
    }

    /// The public face of every active keyset.
    pub async fn keysets(&self) -> Result<Vec<cashu::nuts::nut02::KeySet>, Error> {
        self.keysets.active_keysets().await
    }

    /// Subscribe to NUT-17 notifications; re-exported so a caller never has
    /// to reach into a private field to get at the dispatcher.
    pub fn pub_sub(&self) -> &PubSubManager {
        &self.pub_sub
    }

    #[instrument(skip(self, outputs))]
    async fn sign_outputs(&self, outputs: &[BlindedMessage]) -> Result<Vec<(PublicKey, BlindedSignature)>, Error> {
        let mut promises = Vec::with_capacity(outputs.len());
        for output in outputs {
            let keyset = self.keysets.mint_keyset(&output.id)?;
            let keypair = keyset
                .keys
                .get(&output.amount)
                .ok_or(cashu::Error::UnsupportedAmount)?;
            let (c_, dleq) = dhke::sign_message_with_dleq(&keypair.secret_key, &output.blinded_secret)?;
            promises.push((
                output.blinded_secret,
                BlindedSignature {
                    id: output.id,
                    amount: output.amount,
                    c: c_,
                    dleq: Some(dleq),
                },
            ));
        }
        Ok(promises)
    }

    /// Sum of every `Issued` mint quote less every settled melt quote: the
    /// ecash currently in circulation against this mint's keysets.
    #[instrument(skip(self))]
    pub async fn current_balance(&self) -> Result<Amount, Error> {
        let issued: u64 = self
            .db
            .get_mint_quotes()
            .await?
            .into_iter()
            .filter(|q| q.state == MintQuoteState::Issued)
            .map(|q| u64::from(q.amount))
            .sum();
        let melted: u64 = self
            .db
            .get_melt_quotes()
            .await?
            .into_iter()
            .filter(|q| q.state == MeltQuoteState::Paid)
            .map(|q| u64::from(q.amount))
            .sum();
        Ok(Amount::from(issued.saturating_sub(melted)))
    }

    /// Request a new mint quote. Rejects on mint-wide policy
    /// (peg-out-only, amount limits, balance cap) before ever calling out to
    /// the Lightning backend.
    #[instrument(skip(self))]
    pub async fn mint_quote(
        &self,
        method: PaymentMethod,
        unit: CurrencyUnit,
        amount: Amount,
        description: Option<String>,
        pubkey: Option<PublicKey>,
    ) -> Result<MintQuoteBolt11Response, Error> {
        if self.config.limits.mint_peg_out_only {
            return Err(Error::NotAllowed("mint accepts melts only".into()));
        }

        let nut04 = &self.config.mint_info.nuts.nut04;
        if nut04.disabled {
            return Err(Error::MintingDisabled);
        }
        let settings = nut04.get_settings(&unit, &method).ok_or(Error::UnsupportedUnit)?;
        if settings.disabled {
            return Err(Error::MintingDisabled);
        }

        let min = settings.min_amount.unwrap_or(Amount::ZERO);
        let max = settings.max_amount.unwrap_or(Amount::from(u64::MAX));
        if amount < min || amount > max {
            return Err(Error::AmountOutofLimitRange(min, max, amount));
        }

        if let Some(max_peg_in) = self.config.limits.mint_max_peg_in {
            if amount > max_peg_in {
                return Err(Error::NotAllowed("mint_max_peg_in exceeded".into()));
            }
        }
        if let Some(max_balance) = self.config.limits.mint_max_balance {
            let projected = self.current_balance().await?.checked_add(amount)?;
            if projected > max_balance {
                return Err(Error::NotAllowed("mint_max_balance exceeded".into()));
            }
        }

        let backend = self.lightning.get(&method, &unit)?;
        let expiry = now() + self.config.quote_ttl.mint_ttl;
        let invoice = backend
            .create_invoice(amount, description.unwrap_or_default(), expiry)
            .await?;

        let quote = MintQuote::new(
            amount,
            unit,
            invoice.payment_request.to_lowercase(),
            invoice.expiry.unwrap_or(expiry),
            invoice.checking_id,
            pubkey,
            now(),
        );
        let wire: MintQuoteBolt11Response = quote.clone().into();

        let mut tx = self.db.begin_transaction().await?;
        tx.add_mint_quote(quote).await?;
        tx.commit().await?;

        tracing::debug!("Issued mint quote {} for {amount}", wire.quote);
        self.pub_sub.publish_mint_quote(&wire.quote, wire.clone());
        Ok(wire)
    }

    /// Look up a mint quote, polling the Lightning backend for `Unpaid`
    /// quotes so a wallet that only calls this endpoint (never a websocket
    /// subscriber) still observes the `Paid` transition.
    #[instrument(skip(self))]
    pub async fn get_mint_quote(&self, quote_id: &str) -> Result<MintQuoteBolt11Response, Error> {
        let mut quote = self.db.get_mint_quote(quote_id).await?.ok_or(Error::UnknownQuote)?;

        if quote.state == MintQuoteState::Unpaid {
            let backend = self.lightning.get(&PaymentMethod::Bolt11, &quote.unit)?;
            let status = backend.get_invoice_status(&quote.request_lookup_id).await?;

            if status.status == PaymentStatus::Paid {
                let paid_time = now();
                let mut tx = self.db.begin_transaction().await?;
                tx.update_mint_quote_state(quote_id, MintQuoteState::Paid, Some(paid_time))
                    .await?;
                tx.commit().await?;

                quote.state = MintQuoteState::Paid;
                quote.paid_time = Some(paid_time);

                let wire: MintQuoteBolt11Response = quote.clone().into();
                self.pub_sub.publish_mint_quote(quote_id, wire);
            }
        }

        Ok(quote.into())
    }

    /// `mint`: exchange a paid quote for blind signatures. The
    /// quote-state transition and the promise insertion commit in one
    /// transaction — splitting them would let a crash between the two
    /// permit minting the same quote twice.
    #[instrument(skip(self, outputs))]
    pub async fn mint(&self, quote_id: &str, outputs: Vec<BlindedMessage>) -> Result<MintBolt11Response, Error> {
        let _guard = self.locks.acquire(quote_id).await;

        let quote = self.db.get_mint_quote(quote_id).await?.ok_or(Error::UnknownQuote)?;
        match quote.state {
            MintQuoteState::Unpaid => return Err(Error::UnpaidQuote),
            MintQuoteState::Issued => return Err(Error::IssuedQuote),
            MintQuoteState::Paid => {}
        }

        let current = now();
        if quote.expiry < current {
            return Err(Error::ExpiredQuote(quote.expiry, current));
        }

        verification::verify_outputs(&self.keysets, self.db.as_ref(), &outputs).await?;
        for output in &outputs {
            let info = self.keysets.keyset_info(&output.id).await?;
            if info.unit != quote.unit {
                return Err(Error::MultipleUnits);
            }
        }

        let total = BlindedMessage::total_amount(&outputs);
        if total != quote.amount {
            return Err(Error::TransactionUnbalanced(u64::from(total), u64::from(quote.amount), 0));
        }

        let promises = self.sign_outputs(&outputs).await?;

        let mut tx = self.db.begin_transaction().await?;
        tx.commit_mint_issuance(quote_id, promises.clone()).await?;
        tx.commit().await?;

        tracing::debug!("Issued {} signatures for mint quote {quote_id}", promises.len());
        self.pub_sub.publish_mint_quote(
            quote_id,
            MintQuoteBolt11Response {
                quote: quote_id.to_string(),
                request: quote.request,
                state: MintQuoteState::Issued,
                expiry: Some(quote.expiry),
            },
        );

        Ok(MintBolt11Response {
            signatures: promises.into_iter().map(|(_, sig)| sig).collect(),
        })
    }

    /// Request a melt quote. A `payment_request` matching an
    /// outstanding mint quote on this same mint is settled internally
    /// rather than quoted against the Lightning backend.
    #[instrument(skip(self))]
    pub async fn melt_quote(
        &self,
        method: PaymentMethod,
        unit: CurrencyUnit,
        request: String,
        mpp_amount: Option<Amount>,
    ) -> Result<MeltQuoteBolt11Response, Error> {
        let nut05 = &self.config.mint_info.nuts.nut05;
        if nut05.disabled {
            return Err(Error::MeltingDisabled);
        }
        let settings = nut05.get_settings(&unit, &method).ok_or(Error::UnsupportedUnit)?;
        if settings.disabled {
            return Err(Error::MeltingDisabled);
        }

        let normalized = request.to_lowercase();

        let (amount, fee_reserve, request_lookup_id) =
            if let Some(mint_quote) = self.db.get_mint_quote_by_request(&normalized).await? {
                if mpp_amount.is_some() {
                    return Err(Error::MppNotSupported);
                }
                tracing::debug!("Melt request {normalized} matches an outstanding mint quote, settling internally");
                (mint_quote.amount, Amount::ZERO, mint_quote.request_lookup_id)
            } else {
                let backend = self.lightning.get(&method, &unit)?;
                if mpp_amount.is_some() && !backend.capabilities().supports_mpp {
                    return Err(Error::MppNotSupported);
                }
                let quote = backend.get_payment_quote(&normalized, mpp_amount).await?;
                if let Some(mpp) = mpp_amount {
                    if mpp != quote.amount {
                        return Err(Error::NotAllowed("mpp amount does not match invoice amount".into()));
                    }
                }
                (quote.amount, quote.fee, quote.checking_id)
            };

        let min = settings.min_amount.unwrap_or(Amount::ZERO);
        let max = settings.max_amount.unwrap_or(Amount::from(u64::MAX));
        if amount < min || amount > max {
            return Err(Error::AmountOutofLimitRange(min, max, amount));
        }
        if let Some(max_peg_out) = self.config.limits.mint_max_peg_out {
            if amount > max_peg_out {
                return Err(Error::NotAllowed("mint_max_peg_out exceeded".into()));
            }
        }

        let quote = MeltQuote::new(
            unit,
            amount,
            normalized,
            fee_reserve,
            now() + self.config.quote_ttl.melt_ttl,
            request_lookup_id,
            now(),
        );
        let wire: MeltQuoteBolt11Response = quote.clone().into();

        let mut tx = self.db.begin_transaction().await?;
        tx.add_melt_quote(quote).await?;
        tx.commit().await?;

        self.pub_sub.publish_melt_quote(&wire.quote, wire.clone());
        Ok(wire)
    }

    /// Look up a melt quote by id.
    #[instrument(skip(self))]
    pub async fn get_melt_quote(&self, quote_id: &str) -> Result<MeltQuoteBolt11Response, Error> {
        let quote = self.db.get_melt_quote(quote_id).await?.ok_or(Error::UnknownQuote)?;
        Ok(quote.into())
    }

    /// `melt`: the eight-step settlement protocol. Proofs are always
    /// released from their pending reservation on every exit path, success
    /// or failure — that release happens at the end of every branch below
    /// rather than once at the bottom, because two of the branches (internal
    /// settlement, backend failure) return before the success path's own
    /// transaction would run.
    #[instrument(skip(self, proofs, blank_outputs))]
    pub async fn melt(
        &self,
        quote_id: &str,
        proofs: Vec<Proof>,
        blank_outputs: Vec<BlindedMessage>,
    ) -> Result<Melted, Error> {
        let _guard = self.locks.acquire(quote_id).await;
        let current = now();

        let quote = self.db.get_melt_quote(quote_id).await?.ok_or(Error::UnknownQuote)?;
        match quote.state {
            MeltQuoteState::Unpaid | MeltQuoteState::Failed => {}
            MeltQuoteState::Pending => return Err(Error::PendingQuote),
            MeltQuoteState::Paid => return Err(Error::PaidQuote),
        }
        if quote.expiry < current {
            return Err(Error::ExpiredQuote(quote.expiry, current));
        }

        verification::reject_sig_all(&proofs)?;
        let verified = verification::verify_proofs_structure(&self.keysets, &proofs, current)?;

        let mut keyset_fee_ppk = HashMap::new();
        let mut input_unit = None;
        for id in verified.proofs_per_keyset.keys() {
            let info = self.keysets.keyset_info(id).await?;
            if *input_unit.get_or_insert_with(|| info.unit.clone()) != info.unit {
                return Err(Error::MultipleUnits);
            }
            keyset_fee_ppk.insert(*id, info.input_fee_ppk);
        }
        if input_unit.as_ref() != Some(&quote.unit) {
            return Err(Error::MultipleUnits);
        }
        let input_fees = fees::calculate_fee(&verified.proofs_per_keyset, &keyset_fee_ppk)?;

        let required = quote.amount.checked_add(quote.fee_reserve)?.checked_add(input_fees)?;
        if verified.total < required {
            tracing::info!(
                "Melt request unbalanced: inputs {}, required {}",
                verified.total,
                required
            );
            return Err(Error::TransactionUnbalanced(
                u64::from(verified.total),
                u64::from(quote.amount),
                u64::from(input_fees),
            ));
        }
        let fee_reserve_provided = verified.total.checked_sub(quote.amount)?.checked_sub(input_fees)?;

        verification::check_unspent(self.db.as_ref(), &verified.ys).await?;

        let spent: Vec<(PublicKey, Amount, Id)> = verified
            .ys
            .iter()
            .zip(&proofs)
            .map(|(y, p)| (*y, p.amount, p.id))
            .collect();

        {
            let mut tx = self.db.begin_transaction().await?;
            match tx.insert_pending_proofs(&verified.ys, quote_id).await {
                Ok(()) => tx.commit().await?,
                Err(crate::database::Error::Duplicate(_)) => return Err(Error::TokenPending),
                Err(e) => return Err(e.into()),
            }
        }

        // Internal settlement: a mint quote on this mint is waiting on the
        // exact invoice this melt is paying. Settle both sides without ever
        // calling out to the Lightning backend.
        if let Some(mint_quote) = self.db.get_mint_quote_by_request(&quote.request).await? {
            if mint_quote.state == MintQuoteState::Unpaid {
                let paid_time = current;
                let mut tx = self.db.begin_transaction().await?;
                tx.commit_internal_melt_settlement(&mint_quote.id, quote_id, paid_time, spent.clone())
                    .await?;
                tx.remove_pending_proofs(&verified.ys).await?;
                tx.commit().await?;

                tracing::debug!("Settled melt {quote_id} internally against mint quote {}", mint_quote.id);
                self.pub_sub.publish_mint_quote(
                    &mint_quote.id,
                    MintQuoteBolt11Response {
                        quote: mint_quote.id.clone(),
                        request: mint_quote.request,
                        state: MintQuoteState::Paid,
                        expiry: Some(mint_quote.expiry),
                    },
                );
                self.pub_sub.publish_melt_quote(
                    quote_id,
                    MeltQuoteBolt11Response {
                        quote: quote_id.to_string(),
                        amount: quote.amount,
                        fee_reserve: quote.fee_reserve,
                        state: MeltQuoteState::Paid,
                        expiry: Some(quote.expiry),
                        payment_preimage: None,
                        change: None,
                    },
                );

                return Ok(Melted {
                    state: MeltQuoteState::Paid,
                    amount: quote.amount,
                    fee_paid: Amount::ZERO,
                    preimage: None,
                    change: None,
                });
            }
        }

        {
            let mut tx = self.db.begin_transaction().await?;
            tx.update_melt_quote_state(quote_id, MeltQuoteState::Pending, None).await?;
            tx.commit().await?;
        }
        self.pub_sub.publish_melt_quote(
            quote_id,
            MeltQuoteBolt11Response {
                quote: quote_id.to_string(),
                amount: quote.amount,
                fee_reserve: quote.fee_reserve,
                state: MeltQuoteState::Pending,
                expiry: Some(quote.expiry),
                payment_preimage: None,
                change: None,
            },
        );

        let backend = self.lightning.get(&PaymentMethod::Bolt11, &quote.unit)?;
        let fee_limit_msat = to_msat(quote.fee_reserve, &quote.unit);
        let payment = backend.pay_invoice(&quote.request, fee_limit_msat, None).await;

        match payment {
            Ok(response) if response.status == PaymentStatus::Paid => {
                let fee_paid = response.fee;
                let preimage = response.preimage;
                let paid_time = now();

                let mut change_promises: Vec<(PublicKey, BlindedSignature)> = Vec::new();
                if !blank_outputs.is_empty() {
                    let overpaid = fee_reserve_provided.checked_sub(fee_paid).unwrap_or(Amount::ZERO);
                    if overpaid != Amount::ZERO {
                        let parts = overpaid.split();
                        let n = parts.len().min(blank_outputs.len());
                        // Blank outputs arrive with an arbitrary (conventionally zero) amount;
                        // the mint overwrites it with the split change amount before the
                        // amount/uniqueness/replay checks run, since a blank amount would
                        // otherwise never pass the supported-amount check on its own.
                        let change_outputs: Vec<BlindedMessage> = parts
                            .into_iter()
                            .take(n)
                            .zip(blank_outputs.iter())
                            .map(|(part, output)| BlindedMessage {
                                id: output.id,
                                amount: part,
                                blinded_secret: output.blinded_secret,
                                witness: output.witness.clone(),
                            })
                            .collect();
                        verification::verify_outputs(&self.keysets, self.db.as_ref(), &change_outputs).await?;
                        change_promises = self.sign_outputs(&change_outputs).await?;
                    }
                }

                let mut tx = self.db.begin_transaction().await?;
                tx.commit_melt_settlement(
                    quote_id,
                    fee_paid,
                    preimage.clone(),
                    spent.clone(),
                    change_promises.clone(),
                    paid_time,
                )
                .await?;
                tx.remove_pending_proofs(&verified.ys).await?;
                tx.commit().await?;

                let change_signatures: Option<Vec<BlindedSignature>> = if change_promises.is_empty() {
                    None
                } else {
                    Some(change_promises.into_iter().map(|(_, sig)| sig).collect())
                };

                tracing::debug!("Melt {quote_id} settled, fee paid {fee_paid}");
                self.pub_sub.publish_melt_quote(
                    quote_id,
                    MeltQuoteBolt11Response {
                        quote: quote_id.to_string(),
                        amount: quote.amount,
                        fee_reserve: quote.fee_reserve,
                        state: MeltQuoteState::Paid,
                        expiry: Some(quote.expiry),
                        payment_preimage: preimage.clone(),
                        change: change_signatures.clone(),
                    },
                );

                Ok(Melted {
                    state: MeltQuoteState::Paid,
                    amount: quote.amount,
                    fee_paid,
                    preimage,
                    change: change_signatures,
                })
            }
            Ok(_failed) => {
                tracing::info!("Melt {quote_id} payment failed, releasing reserved proofs");
                self.fail_melt(quote_id, &verified.ys, quote.amount, quote.fee_reserve, quote.expiry)
                    .await?;
                Ok(Melted {
                    state: MeltQuoteState::Failed,
                    amount: quote.amount,
                    fee_paid: Amount::ZERO,
                    preimage: None,
                    change: None,
                })
            }
            Err(err) => {
                tracing::warn!("Melt {quote_id} backend error: {err}");
                self.fail_melt(quote_id, &verified.ys, quote.amount, quote.fee_reserve, quote.expiry)
                    .await?;
                Err(err.into())
            }
        }
    }

    async fn fail_melt(
        &self,
        quote_id: &str,
        ys: &[PublicKey],
        amount: Amount,
        fee_reserve: Amount,
        expiry: u64,
    ) -> Result<(), Error> {
        let mut tx = self.db.begin_transaction().await?;
        tx.fail_melt_quote(quote_id).await?;
        tx.remove_pending_proofs(ys).await?;
        tx.commit().await?;

        self.pub_sub.publish_melt_quote(
            quote_id,
            MeltQuoteBolt11Response {
                quote: quote_id.to_string(),
                amount,
                fee_reserve,
                state: MeltQuoteState::Failed,
                expiry: Some(expiry),
                payment_preimage: None,
                change: None,
            },
        );
        Ok(())
    }

    /// `swap`: exchange a set of proofs for a new set of the same
    /// total value (less fees). Supports `SIG_ALL`, which a melt cannot.
    #[instrument(skip(self, inputs, outputs))]
    pub async fn swap(&self, inputs: Vec<Proof>, outputs: Vec<BlindedMessage>) -> Result<SwapResponse, Error> {
        let current = now();

        let verified = verification::verify_proofs_structure(&self.keysets, &inputs, current)?;
        verification::verify_sig_all(&inputs, &outputs, current)?;
        verification::verify_outputs(&self.keysets, self.db.as_ref(), &outputs).await?;

        let mut keyset_fee_ppk = HashMap::new();
        let mut input_unit = None;
        for id in verified.proofs_per_keyset.keys() {
            let info = self.keysets.keyset_info(id).await?;
            if *input_unit.get_or_insert_with(|| info.unit.clone()) != info.unit {
                return Err(Error::MultipleUnits);
            }
            keyset_fee_ppk.insert(*id, info.input_fee_ppk);
        }
        for output in &outputs {
            let info = self.keysets.keyset_info(&output.id).await?;
            if Some(&info.unit) != input_unit.as_ref() {
                return Err(Error::MultipleUnits);
            }
        }

        let fee = fees::calculate_fee(&verified.proofs_per_keyset, &keyset_fee_ppk)?;
        let output_total = BlindedMessage::total_amount(&outputs);
        let required = output_total.checked_add(fee)?;
        if verified.total != required {
            tracing::info!(
                "Swap request unbalanced: inputs {}, outputs {}, fee {}",
                verified.total,
                output_total,
                fee
            );
            return Err(Error::TransactionUnbalanced(
                u64::from(verified.total),
                u64::from(output_total),
                u64::from(fee),
            ));
        }

        verification::check_unspent(self.db.as_ref(), &verified.ys).await?;

        let promises = self.sign_outputs(&outputs).await?;
        let spent: Vec<(PublicKey, Amount, Id)> = verified
            .ys
            .iter()
            .zip(&inputs)
            .map(|(y, p)| (*y, p.amount, p.id))
            .collect();

        let mut tx = self.db.begin_transaction().await?;
        match tx.commit_swap(spent, promises.clone()).await {
            Ok(()) => tx.commit().await?,
            Err(crate::database::Error::Duplicate(_)) => return Err(Error::TokenAlreadySpent),
            Err(e) => return Err(e.into()),
        }

        for y in &verified.ys {
            self.pub_sub.publish_proof_state(ProofState {
                y: *y,
                state: State::Spent,
                witness: None,
            });
        }

        Ok(SwapResponse {
            signatures: promises.into_iter().map(|(_, sig)| sig).collect(),
        })
    }

    /// `restore`: idempotent, side-effect-free lookup of previously
    /// issued promises for a candidate output list.
    #[instrument(skip(self, outputs))]
    pub async fn restore(&self, outputs: Vec<BlindedMessage>) -> Result<RestoreResponse, Error> {
        let blinded_secrets: Vec<PublicKey> = outputs.iter().map(|o| o.blinded_secret).collect();
        let signatures = self.db.get_blind_signatures(&blinded_secrets).await?;

        let mut present_outputs = Vec::new();
        let mut present_signatures = Vec::new();
        for (output, signature) in outputs.into_iter().zip(signatures) {
            if let Some(signature) = signature {
                present_outputs.push(output);
                present_signatures.push(signature);
            }
        }

        Ok(RestoreResponse {
            outputs: present_outputs,
            signatures: present_signatures,
        })
    }

    /// NUT-07 surface: current spend state of a batch of proofs.
    #[instrument(skip(self, ys))]
    pub async fn check_state(&self, ys: Vec<PublicKey>) -> Result<CheckStateResponse, Error> {
        let states = self.db.get_proofs_states(&ys).await?;
        Ok(CheckStateResponse {
            states: ys
                .into_iter()
                .zip(states)
                .map(|(y, state)| ProofState { y, state, witness: None })
                .collect(),
        })
    }

    /// On startup, resolve every melt quote left with pending
    /// proofs from before a restart. Not called by [`Self::new`] — the
    /// caller decides when the Lightning backends are reachable enough to
    /// be worth querying.
    #[instrument(skip(self))]
    pub async fn recover_pending_melts(&self) -> Result<(), Error> {
        for quote_id in self.db.get_melt_quotes_with_pending_proofs().await? {
            let Some(quote) = self.db.get_melt_quote(&quote_id).await? else {
                continue;
            };
            let Ok(backend) = self.lightning.get(&PaymentMethod::Bolt11, &quote.unit) else {
                tracing::warn!("No backend to recover melt {quote_id}, leaving pending");
                continue;
            };

            let status = backend.get_payment_status(&quote.request_lookup_id).await?;
            match status.status {
                PaymentStatus::Paid => {
                    let ys = self.db.get_pending_proof_ys(&quote_id).await?;
                    let fee_paid = status.fee.unwrap_or(Amount::ZERO);
                    let paid_time = now();

                    let mut tx = self.db.begin_transaction().await?;
                    tx.commit_recovered_melt_settlement(&quote_id, fee_paid, status.preimage.clone(), &ys, paid_time)
                        .await?;
                    tx.commit().await?;

                    tracing::info!("Recovered melt {quote_id} as paid");
                    if let Some(updated) = self.db.get_melt_quote(&quote_id).await? {
                        self.pub_sub.publish_melt_quote(&quote_id, updated.into());
                    }
                }
                PaymentStatus::Failed => {
                    let ys = self.db.get_pending_proof_ys(&quote_id).await?;
                    let mut tx = self.db.begin_transaction().await?;
                    tx.fail_melt_quote(&quote_id).await?;
                    tx.remove_pending_proofs(&ys).await?;
                    tx.commit().await?;

                    tracing::info!("Recovered melt {quote_id} as failed");
                    if let Some(updated) = self.db.get_melt_quote(&quote_id).await? {
                        self.pub_sub.publish_melt_quote(&quote_id, updated.into());
                    }
                }
                PaymentStatus::Unknown => {
                    tracing::debug!("Melt {quote_id} still pending at recovery, leaving as-is");
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use bitcoin::bip32::DerivationPath;
    use cashu::dhke::blind_message;
    use cashu::nuts::nut00::CurrencyUnit;
    use cashu::nuts::nut06::MintInfo;
    use cashu::secret::Secret;

    use crate::config::{MintLimits, QuoteTtl};
    use crate::database::MintMemoryDatabase;
    use crate::keysets::KeysetConfig;
    use crate::lightning::fake_wallet::FakeWallet;

    use super::*;

    fn test_config(max_order: u8) -> MintConfig {
        let mut nuts = cashu::nuts::nut06::NutsSettings::default();
        nuts.nut04.methods.push(cashu::nuts::nut04::MintMethodSettings {
            method: PaymentMethod::Bolt11,
            unit: CurrencyUnit::Sat,
            min_amount: None,
            max_amount: None,
            disabled: false,
        });
        nuts.nut05.methods.push(cashu::nuts::nut05::MeltMethodSettings {
            method: PaymentMethod::Bolt11,
            unit: CurrencyUnit::Sat,
            min_amount: None,
            max_amount: None,
            disabled: false,
        });
        MintConfig {
            mint_info: MintInfo {
                name: None,
                pubkey: None,
                version: None,
                description: None,
                description_long: None,
                contact: Vec::new(),
                nuts,
                motd: None,
                tos_url: None,
            },
            quote_ttl: QuoteTtl { mint_ttl: 3600, melt_ttl: 3600 },
            limits: MintLimits::default(),
            keysets: vec![KeysetConfig {
                derivation_path: DerivationPath::from_str("m/0'/0'/0'").expect("valid path"),
                unit: CurrencyUnit::Sat,
                max_order,
                input_fee_ppk: 0,
            }],
        }
    }

    async fn test_mint(fee: u64) -> Mint {
        let db = Arc::new(MintMemoryDatabase::new());
        let mut lightning = LightningBackends::default();
        lightning.insert(
            PaymentMethod::Bolt11,
            CurrencyUnit::Sat,
            Arc::new(FakeWallet::new(Amount::from(fee))),
        );
        Mint::new(test_config(7), db, vec![1u8; 32], lightning)
            .await
            .expect("mint constructs")
    }

    async fn blinded_outputs(mint: &Mint, amounts: &[u64]) -> (Vec<BlindedMessage>, Vec<cashu::nuts::nut01::SecretKey>) {
        let active = mint.keysets.active_keysets().await.expect("active keysets").remove(0);
        let mut outputs = Vec::new();
        let mut blinding_factors = Vec::new();
        for (i, amount) in amounts.iter().enumerate() {
            let (b_, r) = blind_message(format!("secret-{i}-{amount}").as_bytes(), None).expect("blind succeeds");
            outputs.push(BlindedMessage {
                id: active.id,
                amount: Amount::from(*amount),
                blinded_secret: b_,
                witness: None,
            });
            blinding_factors.push(r);
        }
        (outputs, blinding_factors)
    }

    #[tokio::test]
    async fn mint_quote_then_mint_issues_signatures() {
        let mint = test_mint(0).await;
        let quote = mint
            .mint_quote(PaymentMethod::Bolt11, CurrencyUnit::Sat, Amount::from(8), None, None)
            .await
            .expect("mint quote succeeds");

        // FakeWallet settles its own invoices immediately.
        let refreshed = mint.get_mint_quote(&quote.quote).await.expect("lookup succeeds");
        assert_eq!(refreshed.state, MintQuoteState::Paid);

        let (outputs, _) = blinded_outputs(&mint, &[8]).await;
        let response = mint.mint(&quote.quote, outputs).await.expect("mint succeeds");
        assert_eq!(response.signatures.len(), 1);

        let again = mint.get_mint_quote(&quote.quote).await.expect("lookup succeeds");
        assert_eq!(again.state, MintQuoteState::Issued);
    }

    #[tokio::test]
    async fn minting_an_unpaid_quote_is_rejected() {
        let db = Arc::new(MintMemoryDatabase::new());
        let lightning = LightningBackends::default();
        let mint = Mint::new(test_config(7), db.clone(), vec![2u8; 32], lightning)
            .await
            .expect("mint constructs");

        let active = mint.keysets.active_keysets().await.expect("keysets").remove(0);
        let quote = MintQuote::new(
            Amount::from(4),
            CurrencyUnit::Sat,
            "lnbc-unpaid".into(),
            now() + 3600,
            "lookup".into(),
            None,
            now(),
        );
        let quote_id = quote.id.clone();
        let mut tx = db.begin_transaction().await.expect("begin");
        tx.add_mint_quote(quote).await.expect("add quote");
        tx.commit().await.expect("commit");

        let (b_, _) = blind_message(b"secret", None).expect("blind succeeds");
        let outputs = vec![BlindedMessage { id: active.id, amount: Amount::from(4), blinded_secret: b_, witness: None }];
        let result = mint.mint(&quote_id, outputs).await;
        assert!(matches!(result, Err(Error::UnpaidQuote)));
    }

    #[tokio::test]
    async fn internal_settlement_skips_the_lightning_backend() {
        let mint = test_mint(1).await;

        let mint_quote = mint
            .mint_quote(PaymentMethod::Bolt11, CurrencyUnit::Sat, Amount::from(10), None, None)
            .await
            .expect("mint quote succeeds");

        let melt_quote = mint
            .melt_quote(PaymentMethod::Bolt11, CurrencyUnit::Sat, mint_quote.request.clone(), None)
            .await
            .expect("melt quote succeeds");
        assert_eq!(melt_quote.fee_reserve, Amount::ZERO);

        let (outputs, _) = blinded_outputs(&mint, &[8, 2]).await;
        let keyset = mint.keysets.active_keysets().await.expect("keysets").remove(0);
        let keypair_8 = mint.keysets.mint_keyset(&keyset.id).expect("keyset").keys.get(&Amount::from(8)).unwrap().clone();
        let keypair_2 = mint.keysets.mint_keyset(&keyset.id).expect("keyset").keys.get(&Amount::from(2)).unwrap().clone();

        let (b8, r8) = blind_message(b"melt-input-8", None).expect("blind");
        let c8_ = dhke::sign_message(&keypair_8.secret_key, &b8).expect("sign");
        let c8 = dhke::unblind_message(&c8_, &r8, &keypair_8.public_key).expect("unblind");
        let (b2, r2) = blind_message(b"melt-input-2", None).expect("blind");
        let c2_ = dhke::sign_message(&keypair_2.secret_key, &b2).expect("sign");
        let c2 = dhke::unblind_message(&c2_, &r2, &keypair_2.public_key).expect("unblind");

        let proofs = vec![
            Proof { id: keyset.id, amount: Amount::from(8), secret: Secret::new("melt-input-8"), c: c8, dleq: None, witness: None },
            Proof { id: keyset.id, amount: Amount::from(2), secret: Secret::new("melt-input-2"), c: c2, dleq: None, witness: None },
        ];
        let _ = outputs;

        let melted = mint
            .melt(&melt_quote.quote, proofs, Vec::new())
            .await
            .expect("melt settles internally");
        assert_eq!(melted.state, MeltQuoteState::Paid);
        assert_eq!(melted.fee_paid, Amount::ZERO);

        let mint_quote_after = mint.get_mint_quote(&mint_quote.quote).await.expect("lookup");
        assert_eq!(mint_quote_after.state, MintQuoteState::Paid);
    }

    #[tokio::test]
    async fn restore_returns_only_previously_signed_outputs() {
        let mint = test_mint(0).await;
        let quote = mint
            .mint_quote(PaymentMethod::Bolt11, CurrencyUnit::Sat, Amount::from(4), None, None)
            .await
            .expect("mint quote succeeds");

        let (signed_outputs, _) = blinded_outputs(&mint, &[4]).await;
        mint.mint(&quote.quote, signed_outputs.clone()).await.expect("mint succeeds");

        let (unsigned_outputs, _) = blinded_outputs(&mint, &[4]).await;
        let probe = vec![signed_outputs[0].clone(), unsigned_outputs[0].clone()];
        let restored = mint.restore(probe).await.expect("restore succeeds");

        assert_eq!(restored.outputs.len(), 1);
        assert_eq!(restored.outputs[0].blinded_secret, signed_outputs[0].blinded_secret);
    }
}
