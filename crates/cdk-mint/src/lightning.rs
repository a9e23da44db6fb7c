//! Lightning backend port.
//!
//! The ledger engine only ever talks to a Lightning wallet through
//! [`MintLightning`]; no concrete backend (CLN, LND, lnbits, fake-wallet) is
//! implemented here. The port surface is trimmed to the bolt11-only
//! operations this crate's ledger actually calls.

use async_trait::async_trait;
use cashu::Amount;
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors a Lightning backend can report back to the ledger.
#[derive(Debug, Error)]
pub enum Error {
    /// The invoice has already been paid (duplicate `pay_invoice`)
    #[error("Invoice already paid")]
    InvoiceAlreadyPaid,
    /// The backend cannot currently determine payment state
    #[error("Payment state is unknown")]
    UnknownPaymentState,
    /// The unit requested is not handled by this backend
    #[error("Unsupported unit")]
    UnsupportedUnit,
    /// A bolt11 invoice failed to parse
    #[error(transparent)]
    Parse(#[from] lightning_invoice::ParseOrSemanticError),
    /// Backend-specific failure, opaque to the ledger
    #[error(transparent)]
    Backend(Box<dyn std::error::Error + Send + Sync>),
}

/// Whether a payment has settled, from the backend's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentStatus {
    /// Settled
    Paid,
    /// Definitively did not settle
    Failed,
    /// Neither observed yet; still in flight or unknown to the backend
    Unknown,
}

/// `status()` response: the backend's available spending balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackendStatus {
    /// Balance available to fund outgoing payments, in millisatoshi
    pub balance_msat: u64,
}

/// `create_invoice` response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateInvoiceResponse {
    /// Opaque id the backend uses to report this invoice's status later
    pub checking_id: String,
    /// The bolt11 payment request text
    pub payment_request: String,
    /// Unix expiry parsed from the invoice, if any
    pub expiry: Option<u64>,
}

/// `pay_invoice` response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayInvoiceResponse {
    /// Opaque id the backend uses to report this payment's status later
    pub checking_id: String,
    /// Actual routing fee paid
    pub fee: Amount,
    /// Payment preimage, proof of payment
    pub preimage: Option<String>,
    /// Outcome of the attempt
    pub status: PaymentStatus,
}

/// `get_invoice_status` / `get_payment_status` response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentStatusResponse {
    /// Outcome observed by the backend
    pub status: PaymentStatus,
    /// Routing fee, known once `status` is `Paid`
    pub fee: Option<Amount>,
    /// Payment preimage, known once `status` is `Paid`
    pub preimage: Option<String>,
}

/// `get_payment_quote` response: what it would cost to pay a given request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentQuoteResponse {
    /// Opaque id the backend will use to report this payment's status
    pub checking_id: String,
    /// Amount the request asks for (excluding fee)
    pub amount: Amount,
    /// Upper bound on the routing fee
    pub fee: Amount,
}

/// Capability flags a backend advertises, used by the ledger to decide
/// whether MPP melt quotes or the paid-invoice push stream are available.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// Whether `melt_quote` may be given an `mpp_amount`
    pub supports_mpp: bool,
    /// Whether `paid_invoices_stream` yields a usable receiver
    pub supports_incoming_payment_stream: bool,
}

/// The Lightning backend port the ledger engine is generic over.
///
/// `async_trait`, as `cdk::cdk_lightning::MintLightning` is, so the engine
/// can `.await` a backend that may itself be remote (an RPC client to CLN or
/// LND) without assuming it runs in-process.
#[async_trait]
pub trait MintLightning: Send + Sync {
    /// This backend's capability flags.
    fn capabilities(&self) -> Capabilities;

    /// Current backend status (spendable balance).
    async fn status(&self) -> Result<BackendStatus, Error>;

    /// Request a new incoming bolt11 invoice for `amount`.
    async fn create_invoice(
        &self,
        amount: Amount,
        description: String,
        unix_expiry: u64,
    ) -> Result<CreateInvoiceResponse, Error>;

    /// Pay a bolt11 invoice, reserving at most `fee_limit_msat` for routing.
    async fn pay_invoice(
        &self,
        payment_request: &str,
        fee_limit_msat: u64,
        mpp_amount: Option<Amount>,
    ) -> Result<PayInvoiceResponse, Error>;

    /// Current status of a previously created incoming invoice.
    async fn get_invoice_status(&self, checking_id: &str) -> Result<PaymentStatusResponse, Error>;

    /// Current status of a previously dispatched outgoing payment.
    async fn get_payment_status(&self, checking_id: &str) -> Result<PaymentStatusResponse, Error>;

    /// Quote the cost of paying `payment_request` without paying it yet.
    async fn get_payment_quote(
        &self,
        payment_request: &str,
        mpp_amount: Option<Amount>,
    ) -> Result<PaymentQuoteResponse, Error>;

    /// A push channel of `checking_id`s for invoices the backend observed
    /// being paid, for backends that support server-initiated notification
    /// instead of polling. `None` if [`Capabilities::supports_incoming_payment_stream`]
    /// is false.
    async fn paid_invoices_stream(&self) -> Option<mpsc::Receiver<String>> {
        None
    }
}

#[cfg(any(test, feature = "test-utils"))]
pub mod fake_wallet {
    //! An in-memory Lightning backend double implementing [`MintLightning`]
    //! directly, without the hold-invoice simulation a full fake wallet would
    //! need. Every invoice it creates is considered paid immediately;
    //! every payment it's asked to make succeeds at a fee fixed at
    //! construction time, unless the request was pre-registered as failing.

    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;

    /// Fixed-fee, always-succeeds (unless told otherwise) Lightning double.
    pub struct FakeWallet {
        fee: Amount,
        failing_requests: Mutex<std::collections::HashSet<String>>,
        paid: Mutex<HashMap<String, PaymentStatus>>,
        next_id: Mutex<u64>,
    }

    impl FakeWallet {
        /// A fake backend that charges `fee` on every outgoing payment.
        pub fn new(fee: Amount) -> Self {
            Self {
                fee,
                failing_requests: Mutex::new(Default::default()),
                paid: Mutex::new(HashMap::new()),
                next_id: Mutex::new(0),
            }
        }

        /// Mark `payment_request` as one that will fail when paid.
        pub fn fail_request(&self, payment_request: &str) {
            self.failing_requests.lock().expect("not poisoned").insert(payment_request.to_string());
        }

        fn fresh_id(&self) -> String {
            let mut next = self.next_id.lock().expect("not poisoned");
            *next += 1;
            format!("fake-{next}")
        }
    }

    #[async_trait]
    impl MintLightning for FakeWallet {
        fn capabilities(&self) -> Capabilities {
            Capabilities {
                supports_mpp: false,
                supports_incoming_payment_stream: false,
            }
        }

        async fn status(&self) -> Result<BackendStatus, Error> {
            Ok(BackendStatus { balance_msat: u64::MAX })
        }

        async fn create_invoice(
            &self,
            _amount: Amount,
            _description: String,
            unix_expiry: u64,
        ) -> Result<CreateInvoiceResponse, Error> {
            let checking_id = self.fresh_id();
            self.paid.lock().expect("not poisoned").insert(checking_id.clone(), PaymentStatus::Paid);
            Ok(CreateInvoiceResponse {
                payment_request: format!("lnbc-fake-{checking_id}"),
                checking_id,
                expiry: Some(unix_expiry),
            })
        }

        async fn pay_invoice(
            &self,
            payment_request: &str,
            _fee_limit_msat: u64,
            _mpp_amount: Option<Amount>,
        ) -> Result<PayInvoiceResponse, Error> {
            let checking_id = self.fresh_id();
            if self.failing_requests.lock().expect("not poisoned").contains(payment_request) {
                self.paid.lock().expect("not poisoned").insert(checking_id.clone(), PaymentStatus::Failed);
                return Ok(PayInvoiceResponse {
                    checking_id,
                    fee: Amount::ZERO,
                    preimage: None,
                    status: PaymentStatus::Failed,
                });
            }
            self.paid.lock().expect("not poisoned").insert(checking_id.clone(), PaymentStatus::Paid);
            Ok(PayInvoiceResponse {
                checking_id,
                fee: self.fee,
                preimage: Some("00".repeat(32)),
                status: PaymentStatus::Paid,
            })
        }

        async fn get_invoice_status(&self, checking_id: &str) -> Result<PaymentStatusResponse, Error> {
            let status = self
                .paid
                .lock()
                .expect("not poisoned")
                .get(checking_id)
                .copied()
                .unwrap_or(PaymentStatus::Unknown);
            Ok(PaymentStatusResponse { status, fee: None, preimage: None })
        }

        async fn get_payment_status(&self, checking_id: &str) -> Result<PaymentStatusResponse, Error> {
            self.get_invoice_status(checking_id).await
        }

        async fn get_payment_quote(
            &self,
            payment_request: &str,
            _mpp_amount: Option<Amount>,
        ) -> Result<PaymentQuoteResponse, Error> {
            Ok(PaymentQuoteResponse {
                checking_id: format!("quote-{payment_request}"),
                amount: Amount::from(10),
                fee: self.fee,
            })
        }
    }

    #[tokio::test]
    async fn paid_invoice_reports_paid() {
        let wallet = FakeWallet::new(Amount::from(1));
        let invoice = wallet
            .create_invoice(Amount::from(10), "test".into(), 0)
            .await
            .expect("create_invoice succeeds");
        let status = wallet
            .get_invoice_status(&invoice.checking_id)
            .await
            .expect("status lookup succeeds");
        assert_eq!(status.status, PaymentStatus::Paid);
    }

    #[tokio::test]
    async fn registered_failing_request_fails_payment() {
        let wallet = FakeWallet::new(Amount::from(1));
        wallet.fail_request("lnbc-bad");
        let result = wallet.pay_invoice("lnbc-bad", 1000, None).await.expect("backend call succeeds");
        assert_eq!(result.status, PaymentStatus::Failed);
    }
}
