//! Ledger engine configuration: the fields a [`crate::mint::Mint`] is
//! constructed with, besides its storage, Lightning backends and master
//! seed — each of those has its own lifecycle (decrypted once out-of-band,
//! or owned by the hosting process) and so is passed to the constructor
//! separately rather than folded into this struct.
//!
//! Loading these fields from TOML/env is out of scope; this is the shape
//! the loader would populate.

use cashu::nuts::nut06::MintInfo;
use cashu::Amount;

use crate::keysets::KeysetConfig;

/// Mint and melt quote lifetimes, in seconds from issuance.
#[derive(Debug, Clone, Copy)]
pub struct QuoteTtl {
    /// Mint quote lifetime
    pub mint_ttl: u64,
    /// Melt quote lifetime
    pub melt_ttl: u64,
}

/// Ledger-wide operating limits, independent of any one (method, unit)'s
/// NUT-04/NUT-05 settings carried in [`MintConfig::mint_info`].
#[derive(Debug, Clone, Copy, Default)]
pub struct MintLimits {
    /// Upper bound on a single mint quote's amount
    pub mint_max_peg_in: Option<Amount>,
    /// Upper bound on a single melt quote's amount
    pub mint_max_peg_out: Option<Amount>,
    /// Upper bound on total outstanding (minted, unmelted) balance
    pub mint_max_balance: Option<Amount>,
    /// If true, reject every mint quote: the mint only ever melts
    pub mint_peg_out_only: bool,
    /// Requests per minute per client, enforced by the (out-of-scope) HTTP
    /// router rather than by the ledger engine itself; carried here only so
    /// a config loader has one place to populate every documented field.
    pub mint_transaction_rate_limit_per_minute: Option<u32>,
}

/// Everything the ledger transaction engine is constructed with apart from
/// its storage, Lightning backends, and master seed.
#[derive(Debug, Clone)]
pub struct MintConfig {
    /// `/v1/info` payload: name, description, contact, per-NUT settings.
    /// Reused directly for its embedded NUT-04/NUT-05 per-(method, unit)
    /// amount limits and disabled flags, which `mint_quote`/`melt_quote`
    /// consult.
    pub mint_info: MintInfo,
    /// Mint/melt quote expiry
    pub quote_ttl: QuoteTtl,
    /// Ledger-wide limits
    pub limits: MintLimits,
    /// Keysets to activate on startup, one set of per-unit derivation
    /// parameters per entry
    pub keysets: Vec<KeysetConfig>,
}
