//! End-to-end scenarios S1-S6: a mint exercised only through its public
//! `Mint` API, the way a wallet (or an HTTP router sitting in front of this
//! crate) would drive it.

mod common;

use cashu::nuts::nut00::{CurrencyUnit, PaymentMethod};
use cashu::nuts::nut04::MintQuoteState;
use cashu::nuts::nut05::MeltQuoteState;
use cashu::nuts::nut07::State;
use cashu::Amount;
use cdk_mint::error::Error;

use common::{blinded_outputs, mint_proofs, test_mint};

/// S1: mint 64 sat against 7 outputs of mixed denomination.
#[tokio::test]
async fn s1_mint_issues_signatures_for_every_output() {
    let mint = test_mint(0).await;

    let quote = mint
        .mint_quote(PaymentMethod::Bolt11, CurrencyUnit::Sat, Amount::from(64), None, None)
        .await
        .expect("mint quote succeeds");
    let paid = mint.get_mint_quote(&quote.quote).await.expect("poll succeeds");
    assert_eq!(paid.state, MintQuoteState::Paid);

    let (outputs, _) = blinded_outputs(&mint, &[32, 16, 8, 4, 2, 1, 1]).await;
    let response = mint.mint(&quote.quote, outputs).await.expect("mint succeeds");
    assert_eq!(response.signatures.len(), 7);

    let issued = mint.get_mint_quote(&quote.quote).await.expect("lookup succeeds");
    assert_eq!(issued.state, MintQuoteState::Issued);
    assert_eq!(mint.current_balance().await.expect("balance"), Amount::from(64));
}

/// S2: swap a 64-sat proof set for two denominations that sum back to 64,
/// invalidating every input.
#[tokio::test]
async fn s2_swap_preserves_value_and_spends_inputs() {
    let mint = test_mint(0).await;
    let proofs = mint_proofs(&mint, &[32, 16, 8, 4, 2, 1, 1]).await;

    // 44 kept + 20 sent, both from the same swap call.
    let (outputs, _) = blinded_outputs(&mint, &[32, 8, 4, 16, 4]).await;
    let output_total = cashu::nuts::nut00::BlindedMessage::total_amount(&outputs);
    assert_eq!(output_total, Amount::from(64));

    let response = mint.swap(proofs.clone(), outputs).await.expect("swap succeeds");
    assert_eq!(
        response.signatures.iter().fold(Amount::ZERO, |acc, s| acc + s.amount),
        Amount::from(64)
    );

    let ys: Vec<_> = proofs
        .iter()
        .map(|p| cashu::dhke::hash_to_curve(p.secret.as_bytes()).expect("hash_to_curve"))
        .collect();
    let states = mint.check_state(ys).await.expect("check_state succeeds");
    assert!(states.states.iter().all(|s| s.state == State::Spent));
}

/// S3: a melt that overpays its fee reserve returns change for the
/// difference. This exercises blank outputs submitted with a placeholder
/// zero amount, which the mint must overwrite before validating them.
#[tokio::test]
async fn s3_melt_overpay_returns_change() {
    let mint = test_mint(1).await;
    let proofs = mint_proofs(&mint, &[8, 4]).await; // 12 sat: 10 invoice + 2 fee reserve

    let melt_quote = mint
        .melt_quote(PaymentMethod::Bolt11, CurrencyUnit::Sat, "lnbc1unmatchedinvoiceforsss".into(), None)
        .await
        .expect("melt quote succeeds");
    assert_eq!(melt_quote.amount, Amount::from(10));

    let (blank_outputs, _) = blinded_outputs(&mint, &[0]).await;
    let melted = mint
        .melt(&melt_quote.quote, proofs, blank_outputs)
        .await
        .expect("melt succeeds");

    assert_eq!(melted.state, MeltQuoteState::Paid);
    assert_eq!(melted.fee_paid, Amount::from(1));
    let change = melted.change.expect("change promises present");
    assert_eq!(change.len(), 1);
    assert_eq!(change[0].amount, Amount::from(1));
}

/// S4: a melt quote whose invoice matches an outstanding mint quote settles
/// internally — both quotes land `Paid`, no routing fee is charged, and the
/// Lightning backend is never asked to pay anything.
#[tokio::test]
async fn s4_internal_settlement_skips_the_backend() {
    let mint = test_mint(1).await;

    // Wallet A's mint quote is left unpolled, so it stays `Unpaid` in the
    // database even though the FakeWallet already considers it paid.
    let mint_quote_a = mint
        .mint_quote(PaymentMethod::Bolt11, CurrencyUnit::Sat, Amount::from(10), None, None)
        .await
        .expect("mint quote succeeds");

    // Wallet B mints its own spendable ecash to pay wallet A's invoice with.
    let proofs = mint_proofs(&mint, &[8, 2]).await;

    let melt_quote_b = mint
        .melt_quote(PaymentMethod::Bolt11, CurrencyUnit::Sat, mint_quote_a.request.clone(), None)
        .await
        .expect("melt quote succeeds");
    assert_eq!(melt_quote_b.fee_reserve, Amount::ZERO);

    let melted = mint
        .melt(&melt_quote_b.quote, proofs, Vec::new())
        .await
        .expect("melt settles internally");
    assert_eq!(melted.state, MeltQuoteState::Paid);
    assert_eq!(melted.fee_paid, Amount::ZERO);

    let mint_quote_a_after = mint.get_mint_quote(&mint_quote_a.quote).await.expect("lookup succeeds");
    assert_eq!(mint_quote_a_after.state, MintQuoteState::Paid);
}

/// S5: the same proof submitted to two concurrent swaps is accepted by
/// exactly one of them.
#[tokio::test]
async fn s5_concurrent_swap_double_spend_is_rejected() {
    let mint = test_mint(0).await;
    let proofs = mint_proofs(&mint, &[4]).await;

    let (outputs_a, _) = blinded_outputs(&mint, &[4]).await;
    let (outputs_b, _) = blinded_outputs(&mint, &[4]).await;

    let (result_a, result_b) = tokio::join!(mint.swap(proofs.clone(), outputs_a), mint.swap(proofs, outputs_b));

    let successes = [&result_a, &result_b].into_iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1, "exactly one concurrent swap of the same proof should succeed");

    let failure = if result_a.is_err() { result_a } else { result_b };
    assert!(matches!(failure, Err(Error::TokenAlreadySpent) | Err(Error::TokenPending)));
}

/// S6: restoring a candidate output list is a pure, idempotent lookup
/// against the promise table — calling it twice returns identical results.
#[tokio::test]
async fn s6_restore_is_idempotent() {
    let mint = test_mint(0).await;
    let quote = mint
        .mint_quote(PaymentMethod::Bolt11, CurrencyUnit::Sat, Amount::from(4), None, None)
        .await
        .expect("mint quote succeeds");
    mint.get_mint_quote(&quote.quote).await.expect("poll succeeds");

    let (signed_outputs, _) = blinded_outputs(&mint, &[4]).await;
    mint.mint(&quote.quote, signed_outputs.clone()).await.expect("mint succeeds");

    let (unsigned_outputs, _) = blinded_outputs(&mint, &[4]).await;
    let probe = vec![signed_outputs[0].clone(), unsigned_outputs[0].clone()];

    let first = mint.restore(probe.clone()).await.expect("restore succeeds");
    assert_eq!(first.outputs.len(), 1);
    assert_eq!(first.outputs[0], signed_outputs[0]);

    let second = mint.restore(probe).await.expect("restore succeeds");
    assert_eq!(second.outputs, first.outputs);
    assert_eq!(second.signatures, first.signatures);
}
