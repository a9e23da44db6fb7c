//! Shared fixtures for the end-to-end scenario tests (S1-S6).

use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bitcoin::bip32::DerivationPath;
use cashu::dhke::{blind_message, unblind_message};
use cashu::nuts::nut00::{BlindedMessage, CurrencyUnit, PaymentMethod, Proof};
use cashu::nuts::nut01::PublicKey;
use cashu::nuts::nut04::MintMethodSettings;
use cashu::nuts::nut05::MeltMethodSettings;
use cashu::nuts::nut06::{MintInfo, NutsSettings};
use cashu::secret::Secret;
use cashu::Amount;
use cdk_mint::config::{MintConfig, MintLimits, QuoteTtl};
use cdk_mint::database::MintMemoryDatabase;
use cdk_mint::keysets::KeysetConfig;
use cdk_mint::lightning::fake_wallet::FakeWallet;
use cdk_mint::mint::{LightningBackends, Mint};

pub fn test_config(max_order: u8) -> MintConfig {
    let mut nuts = NutsSettings::default();
    nuts.nut04.methods.push(MintMethodSettings {
        method: PaymentMethod::Bolt11,
        unit: CurrencyUnit::Sat,
        min_amount: None,
        max_amount: None,
        disabled: false,
    });
    nuts.nut05.methods.push(MeltMethodSettings {
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

/// A mint over a fresh in-memory database, backed by a `FakeWallet` that
/// charges `fee` sat on every outgoing Lightning payment. Every invoice the
/// `FakeWallet` issues is considered paid the instant it's created, so a
/// mint quote only shows `Paid` once something has explicitly polled it
/// (`get_mint_quote`) — until then it sits `Unpaid` in the database, which
/// the internal-settlement test relies on.
pub async fn test_mint(fee: u64) -> Mint {
    let db = Arc::new(MintMemoryDatabase::new());
    let mut lightning = LightningBackends::default();
    lightning.insert(
        PaymentMethod::Bolt11,
        CurrencyUnit::Sat,
        Arc::new(FakeWallet::new(Amount::from(fee))),
    );
    Mint::new(test_config(7), db, vec![7u8; 32], lightning)
        .await
        .expect("mint constructs")
}

fn unique_label() -> u64 {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// Blind one output per requested amount against the mint's active keyset,
/// with a never-repeated secret, returning the outputs alongside the
/// `(secret, blinding factor)` pair needed to unblind each one later.
pub async fn blinded_outputs(
    mint: &Mint,
    amounts: &[u64],
) -> (Vec<BlindedMessage>, Vec<(Secret, cashu::nuts::nut01::SecretKey)>) {
    let active = mint.keysets().await.expect("active keysets").remove(0);
    let mut outputs = Vec::new();
    let mut blinding = Vec::new();
    for amount in amounts {
        let secret = Secret::new(format!("e2e-secret-{}-{amount}", unique_label()));
        let (b_, r) = blind_message(secret.as_bytes(), None).expect("blind succeeds");
        outputs.push(BlindedMessage {
            id: active.id,
            amount: Amount::from(*amount),
            blinded_secret: b_,
            witness: None,
        });
        blinding.push((secret, r));
    }
    (outputs, blinding)
}

/// The mint's published public key for `amount` on its (sole) active keyset.
pub async fn active_pubkey(mint: &Mint, amount: u64) -> PublicKey {
    let active = mint.keysets().await.expect("active keysets").remove(0);
    *active.keys.get(&Amount::from(amount)).expect("amount is supported")
}

/// Pay a fresh mint quote for `amounts.sum()` and mint it into spendable
/// proofs of exactly those denominations, the way a real wallet would:
/// blind, submit, then unblind each returned signature under the mint's
/// published per-amount key. No private key material crosses this boundary.
pub async fn mint_proofs(mint: &Mint, amounts: &[u64]) -> Vec<Proof> {
    let total: u64 = amounts.iter().sum();
    let quote = mint
        .mint_quote(PaymentMethod::Bolt11, CurrencyUnit::Sat, Amount::from(total), None, None)
        .await
        .expect("mint quote succeeds");
    // The FakeWallet settled the invoice already; poll once so the quote's
    // stored state catches up to `Paid` before `mint()` will accept it.
    mint.get_mint_quote(&quote.quote).await.expect("poll succeeds");

    let (outputs, blinding) = blinded_outputs(mint, amounts).await;
    let response = mint.mint(&quote.quote, outputs).await.expect("mint succeeds");

    let mut proofs = Vec::with_capacity(amounts.len());
    for ((amount, (secret, r)), signature) in amounts.iter().zip(blinding).zip(response.signatures) {
        let pubkey = active_pubkey(mint, *amount).await;
        let c = unblind_message(&signature.c, &r, &pubkey).expect("unblind succeeds");
        proofs.push(Proof {
            id: signature.id,
            amount: signature.amount,
            secret,
            c,
            dleq: None,
            witness: None,
        });
    }
    proofs
}
