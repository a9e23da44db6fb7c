//! Proof and output verification: the checks run on every mint,
//! melt and swap request before any state is mutated.

use std::collections::{HashMap, HashSet};

use cashu::nuts::nut00::{BlindedMessage, CurrencyUnit, Proof};
use cashu::nuts::nut01::PublicKey;
use cashu::nuts::nut02::Id;
use cashu::nuts::nut07::State;
use cashu::nuts::nut10::WellKnownSecret;
use cashu::nuts::nut11::{self, SigFlag};
use cashu::{dhke, Amount};
use tracing::instrument;

use crate::database::MintDatabase;
use crate::error::Error;
use crate::keysets::KeysetManager;

/// Every input proof's `Y`, its keyset, and the amount it claims.
pub struct VerifiedInputs {
    /// `Y = hash_to_curve(secret)` for each proof, same order as the input
    pub ys: Vec<PublicKey>,
    /// Total claimed amount
    pub total: Amount,
    /// Number of proofs drawn from each keyset, for fee calculation
    pub proofs_per_keyset: HashMap<Id, u64>,
}

/// Run every per-input check (uniqueness, known keyset,
/// signature, spending condition) over a batch of proofs sharing one unit.
/// Does not check spent/pending state — callers run that against the live
/// database themselves, typically just before reserving the proofs, to keep
/// the race window as small as possible.
#[instrument(skip(keysets, proofs))]
pub fn verify_proofs_structure(
    keysets: &KeysetManager,
    proofs: &[Proof],
    now: u64,
) -> Result<VerifiedInputs, Error> {
    if proofs.is_empty() {
        return Err(Error::Internal("empty proof list".into()));
    }

    let mut seen_secrets = HashSet::with_capacity(proofs.len());
    for proof in proofs {
        if !seen_secrets.insert(&proof.secret) {
            return Err(Error::DuplicateProofs);
        }
    }

    let mut units = HashSet::new();
    let mut ys = Vec::with_capacity(proofs.len());
    let mut total = Amount::ZERO;
    let mut proofs_per_keyset: HashMap<Id, u64> = HashMap::new();

    for proof in proofs {
        let keyset = keysets.mint_keyset(&proof.id)?;
        units.insert(keyset.unit.clone());

        let keypair = keyset
            .keys
            .get(&proof.amount)
            .ok_or(cashu::Error::UnsupportedAmount)?;
        dhke::verify_message(&keypair.secret_key, &proof.c, proof.secret.as_bytes())?;

        nut11::verify_spending_condition(&proof.secret, proof.witness.as_ref(), now)?;

        let y = dhke::hash_to_curve(proof.secret.as_bytes())?;
        ys.push(y);
        total = total.checked_add(proof.amount)?;
        *proofs_per_keyset.entry(proof.id).or_insert(0) += 1;
    }

    if units.len() > 1 {
        return Err(Error::MultipleUnits);
    }

    Ok(VerifiedInputs { ys, total, proofs_per_keyset })
}

/// Check a `SIG_ALL` spending condition spanning every input and output of a
/// swap. Melt requests have no outputs to co-sign, so `SIG_ALL` there is
/// rejected outright by the caller before this is reached.
#[instrument(skip(proofs, outputs))]
pub fn verify_sig_all(proofs: &[Proof], outputs: &[BlindedMessage], now: u64) -> Result<(), Error> {
    let secrets: Vec<_> = proofs.iter().map(|p| p.secret.clone()).collect();
    if nut11::enforce_sig_flag(&secrets) != SigFlag::SigAll {
        return Ok(());
    }

    let message = nut11::transaction_sig_all_message(&secrets, outputs.iter().map(|o| &o.blinded_secret));
    for proof in proofs {
        if WellKnownSecret::try_parse(&proof.secret).is_some() {
            nut11::verify_spending_condition_over(&proof.secret, proof.witness.as_ref(), now, &message)?;
        }
    }
    Ok(())
}

/// Reject a `SIG_ALL`-flagged input list outright — melt has no outputs to
/// co-sign, so the condition can never be satisfied.
pub fn reject_sig_all(proofs: &[Proof]) -> Result<(), Error> {
    let secrets: Vec<_> = proofs.iter().map(|p| p.secret.clone()).collect();
    if nut11::enforce_sig_flag(&secrets) == SigFlag::SigAll {
        return Err(Error::SigAllUsedInMelt);
    }
    Ok(())
}

/// Run every per-output check (uniqueness, known active keyset,
/// supported amount, one unit, replay protection via the promise table).
#[instrument(skip(keysets, db, outputs))]
pub async fn verify_outputs(
    keysets: &KeysetManager,
    db: &dyn MintDatabase,
    outputs: &[BlindedMessage],
) -> Result<(), Error> {
    if outputs.is_empty() {
        return Ok(());
    }

    let mut seen = HashSet::with_capacity(outputs.len());
    let mut units: HashSet<CurrencyUnit> = HashSet::new();

    for output in outputs {
        if !seen.insert(&output.blinded_secret) {
            return Err(Error::BlindedMessageAlreadySigned);
        }

        let info = keysets.keyset_info(&output.id).await?;
        if !info.active {
            return Err(Error::InactiveKeyset);
        }
        units.insert(info.unit.clone());

        if output.amount.bit_index().map(|i| i >= info.max_order as u32).unwrap_or(true) {
            return Err(cashu::Error::UnsupportedAmount.into());
        }
    }

    if units.len() > 1 {
        return Err(Error::MultipleUnits);
    }

    let blinded_secrets: Vec<PublicKey> = outputs.iter().map(|o| o.blinded_secret).collect();
    for existing in db.get_blind_signatures(&blinded_secrets).await? {
        if existing.is_some() {
            return Err(Error::BlindedMessageAlreadySigned);
        }
    }

    Ok(())
}

/// Check that none of `ys` is already spent or reserved pending. Run this as
/// late as practical before reserving the proofs, since it is inherently
/// racy against a concurrent operation until the reservation itself lands.
#[instrument(skip(db, ys))]
pub async fn check_unspent(db: &dyn MintDatabase, ys: &[PublicKey]) -> Result<(), Error> {
    for (y, state) in ys.iter().zip(db.get_proofs_states(ys).await?) {
        match state {
            State::Spent => return Err(Error::TokenAlreadySpent),
            State::Pending => return Err(Error::TokenPending),
            State::Unspent => {}
        }
        let _ = y;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;
    use std::sync::Arc;

    use bitcoin::bip32::DerivationPath;
    use cashu::dhke::blind_message;
    use cashu::nuts::nut02::Id;
    use cashu::secret::Secret;

    use crate::database::MintMemoryDatabase;
    use crate::keysets::KeysetConfig;

    use super::*;

    async fn keysets_with_active_sat() -> (KeysetManager, Id) {
        let db = Arc::new(MintMemoryDatabase::new());
        let manager = KeysetManager::new(vec![9u8; 32], db);
        let info = manager
            .activate_keyset(KeysetConfig {
                derivation_path: DerivationPath::from_str("m/0'/0'/0'").expect("valid path"),
                unit: CurrencyUnit::Sat,
                max_order: 6,
                input_fee_ppk: 0,
            })
            .await
            .expect("activation succeeds");
        (manager, info.id)
    }

    fn proof_for(manager: &KeysetManager, keyset_id: Id, amount: Amount, secret: &str) -> Proof {
        let keyset = manager.mint_keyset(&keyset_id).expect("keyset present");
        let keypair = keyset.keys.get(&amount).expect("amount supported");
        let (b_, r) = blind_message(secret.as_bytes(), None).expect("blind succeeds");
        let c_ = dhke::sign_message(&keypair.secret_key, &b_).expect("sign succeeds");
        let c = dhke::unblind_message(&c_, &r, &keypair.public_key).expect("unblind succeeds");
        Proof {
            id: keyset_id,
            amount,
            secret: Secret::new(secret),
            c,
            dleq: None,
            witness: None,
        }
    }

    #[tokio::test]
    async fn duplicate_secrets_are_rejected() {
        let (manager, keyset_id) = keysets_with_active_sat().await;
        let proof = proof_for(&manager, keyset_id, Amount::from(1), "dup");
        let result = verify_proofs_structure(&manager, &[proof.clone(), proof], 0);
        assert!(matches!(result, Err(Error::DuplicateProofs)));
    }

    #[tokio::test]
    async fn well_formed_proof_verifies() {
        let (manager, keyset_id) = keysets_with_active_sat().await;
        let proof = proof_for(&manager, keyset_id, Amount::from(4), "ok");
        let verified = verify_proofs_structure(&manager, &[proof], 0).expect("verifies");
        assert_eq!(verified.total, Amount::from(4));
    }

    #[tokio::test]
    async fn tampered_signature_is_rejected() {
        let (manager, keyset_id) = keysets_with_active_sat().await;
        let mut proof = proof_for(&manager, keyset_id, Amount::from(2), "tamper");
        let other = proof_for(&manager, keyset_id, Amount::from(2), "other");
        proof.c = other.c;
        let result = verify_proofs_structure(&manager, &[proof], 0);
        assert!(result.is_err());
    }
}
