//! Cashu wire types and blind-signature primitives.
//!
//! This crate holds everything a Cashu (Chaumian ecash) implementation needs
//! that is not specific to being a mint or a wallet: the NUT wire formats
//! (`nuts`), token amounts and their power-of-two split (`amount`), proof
//! secrets (`secret`), and the BDHKE/DLEQ cryptographic engine (`dhke`).
//!
//! The `mint` feature additionally pulls in keypair-generation types
//! (`MintKeySet`, `MintKeyPair`) used to derive and hold a mint's private
//! signing keys; it is enabled by default since this workspace only ships a
//! mint.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

pub mod amount;
pub mod dhke;
pub mod error;
pub mod nuts;
pub mod secret;
pub mod util;

pub use amount::Amount;
pub use error::Error;
pub use secret::Secret;
