//! Ledger transaction engine and keyset manager for a Cashu mint.
//!
//! This crate is the core of a mint process with the HTTP/WebSocket router,
//! CLI wallet, database migrations, and Lightning backend adapters left out
//! as external collaborators: [`Mint`] is the single type every mint, melt
//! and swap request flows through, [`KeysetManager`] owns the active/retired
//! keyset lifecycle, and [`MintDatabase`]/[`MintLightning`] are the ports a
//! concrete storage layer and Lightning node adapter satisfy.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

pub mod config;
pub mod database;
pub mod error;
pub mod fees;
pub mod keysets;
pub mod lightning;
pub mod locks;
pub mod mint;
pub mod pub_sub;
pub mod types;
pub mod verification;

pub use config::{MintConfig, MintLimits, QuoteTtl};
pub use database::{MintDatabase, MintMemoryDatabase};
pub use error::Error;
pub use keysets::KeysetManager;
pub use lightning::MintLightning;
pub use mint::{LightningBackends, Mint};
pub use types::{MeltQuote, Melted, MintQuote};
