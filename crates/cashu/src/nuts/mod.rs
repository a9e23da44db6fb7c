//! Cashu NUT (Notation, Utilization, and Terminology) wire types.
//!
//! Each module implements one NUT (or a closely related pair). Types here
//! are pure data: request/response shapes, keyset representations, and the
//! spending-condition policy evaluator. The cryptographic engine lives in
//! [`crate::dhke`].

pub mod nut00;
pub mod nut01;
pub mod nut02;
pub mod nut03;
pub mod nut04;
pub mod nut05;
pub mod nut06;
pub mod nut07;
pub mod nut09;
pub mod nut10;
pub mod nut11;
pub mod nut12;
pub mod nut17;

pub use nut00::{BlindedMessage, BlindedSignature, CurrencyUnit, PaymentMethod, Proof};
pub use nut01::{Keys, KeysResponse, MintKeyPair, MintKeys, PublicKey, SecretKey};
pub use nut02::{Id, KeySet, KeySetInfo, KeySetVersion, KeysetResponse, MintKeySet};
pub use nut03::{SwapRequest, SwapResponse};
pub use nut04::{
    MintBolt11Request, MintBolt11Response, MintMethodSettings, MintQuoteBolt11Request,
    MintQuoteBolt11Response, MintQuoteState,
};
pub use nut05::{
    MeltBolt11Request, MeltBolt11Response, MeltMethodSettings, MeltQuoteBolt11Request,
    MeltQuoteBolt11Response, MeltQuoteState,
};
pub use nut06::{ContactInfo, MintInfo, MintVersion, NutsSettings};
pub use nut07::{CheckStateRequest, CheckStateResponse, ProofState, State};
pub use nut09::{RestoreRequest, RestoreResponse};
pub use nut10::{Kind, SecretData, WellKnownSecret};
pub use nut11::{
    enforce_sig_flag, transaction_sig_all_message, verify_spending_condition,
    verify_spending_condition_over, SigFlag, Witness,
};
pub use nut12::DleqProof;
pub use nut17::{NotificationPayload, WsMethod, WsSubscriptionKind};
