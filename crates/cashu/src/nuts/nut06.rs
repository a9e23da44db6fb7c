//! NUT-06: Mint information
//!
//! <https://github.com/cashubtc/nuts/blob/main/06.md>

use serde::{Deserialize, Serialize};

use super::nut00::{CurrencyUnit, PaymentMethod};
use super::nut01::PublicKey;
use super::nut04::MintMethodSettings;
use super::nut05::MeltMethodSettings;

/// A mint operator's published contact method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInfo {
    /// Contact method, e.g. `"email"`, `"nostr"`
    pub method: String,
    /// Contact value
    pub info: String,
}

/// Mint software name and version, as a single `"name/version"` wire string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintVersion {
    /// Software name
    pub name: String,
    /// Software version
    pub version: String,
}

impl std::fmt::Display for MintVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.name, self.version)
    }
}

/// `supported` block of `/v1/info`'s `nuts` map, for NUTs that are either
/// fully on or off (no per-method settings).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupportedSettings {
    /// Whether this NUT is supported
    pub supported: bool,
}

/// The `nuts` object of `/v1/info`: per-NUT capability and limit settings.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NutsSettings {
    /// NUT-04 (mint) settings
    #[serde(rename = "4", default)]
    pub nut04: Nut04Settings,
    /// NUT-05 (melt) settings
    #[serde(rename = "5", default)]
    pub nut05: Nut05Settings,
    /// NUT-07 (check state) support
    #[serde(rename = "7", default)]
    pub nut07: SupportedSettings,
    /// NUT-08 (overpaid-fee change on melt) support
    #[serde(rename = "8", default)]
    pub nut08: SupportedSettings,
    /// NUT-09 (restore) support
    #[serde(rename = "9", default)]
    pub nut09: SupportedSettings,
    /// NUT-10 (spending conditions) support
    #[serde(rename = "10", default)]
    pub nut10: SupportedSettings,
    /// NUT-11 (P2PK) support
    #[serde(rename = "11", default)]
    pub nut11: SupportedSettings,
    /// NUT-12 (DLEQ proofs) support
    #[serde(rename = "12", default)]
    pub nut12: SupportedSettings,
    /// NUT-14 (HTLC) support
    #[serde(rename = "14", default)]
    pub nut14: SupportedSettings,
}

impl Default for SupportedSettings {
    fn default() -> Self {
        Self { supported: true }
    }
}

/// NUT-04 block: per-(method, unit) mint settings, plus whether mint quotes
/// may be issued without eventually minting against them (disposable
/// quotes).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Nut04Settings {
    /// Supported (method, unit) combinations and their limits
    pub methods: Vec<MintMethodSettings>,
    /// Whether minting is disabled mint-wide
    pub disabled: bool,
}

impl Nut04Settings {
    /// Settings for a single (method, unit) pair, if the mint offers it.
    pub fn get_settings(&self, unit: &CurrencyUnit, method: &PaymentMethod) -> Option<MintMethodSettings> {
        self.methods
            .iter()
            .find(|m| m.method == *method && m.unit == *unit)
            .cloned()
    }
}

/// NUT-05 block: per-(method, unit) melt settings.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Nut05Settings {
    /// Supported (method, unit) combinations and their limits
    pub methods: Vec<MeltMethodSettings>,
    /// Whether melting is disabled mint-wide
    pub disabled: bool,
}

impl Nut05Settings {
    /// Settings for a single (method, unit) pair, if the mint offers it.
    pub fn get_settings(&self, unit: &CurrencyUnit, method: &PaymentMethod) -> Option<MeltMethodSettings> {
        self.methods
            .iter()
            .find(|m| m.method == *method && m.unit == *unit)
            .cloned()
    }
}

/// `GET /v1/info` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintInfo {
    /// Operator-chosen display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Mint's long-term identity public key (NUT-06)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pubkey: Option<PublicKey>,
    /// Mint software name/version
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<MintVersion>,
    /// Free-text description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Longer free-text description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description_long: Option<String>,
    /// Operator contact methods
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub contact: Vec<ContactInfo>,
    /// Per-NUT capability and limit settings
    pub nuts: NutsSettings,
    /// Operator message-of-the-day
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub motd: Option<String>,
    /// Terms-of-service URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tos_url: Option<String>,
}
