//! NUT-02: Keysets and keyset ID
//!
//! <https://github.com/cashubtc/nuts/blob/main/02.md>

use std::array::TryFromSliceError;
use std::fmt;
use std::str::FromStr;

use bitcoin::bip32::{ChildNumber, DerivationPath, Xpriv};
use bitcoin::hashes::sha256::Hash as Sha256;
use bitcoin::hashes::Hash;
use bitcoin::secp256k1::{self, Secp256k1};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use super::nut00::CurrencyUnit;
use super::nut01::{mint_keys_to_keys, Keys, MintKeyPair, MintKeys};
use crate::amount::Amount;
use crate::util::hex;

/// NUT-02 errors
#[derive(Debug, Error)]
pub enum Error {
    /// Hex decode error
    #[error(transparent)]
    Hex(#[from] hex::Error),
    /// Id string had the wrong length
    #[error("Keyset id: invalid length")]
    Length,
    /// Unrecognised version byte
    #[error("Keyset id: unknown version")]
    UnknownVersion,
    /// Slice-to-array conversion failed
    #[error(transparent)]
    Slice(#[from] TryFromSliceError),
}

/// Keyset id version byte. Only one version is defined by NUT-02 today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum KeySetVersion {
    /// Version 0x00: id = first 7 bytes of sha256(sorted pubkeys)
    Version00,
}

impl KeySetVersion {
    fn to_byte(self) -> u8 {
        match self {
            Self::Version00 => 0,
        }
    }

    fn from_byte(byte: u8) -> Result<Self, Error> {
        match byte {
            0 => Ok(Self::Version00),
            _ => Err(Error::UnknownVersion),
        }
    }
}

impl fmt::Display for KeySetVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Version00 => f.write_str("00"),
        }
    }
}

/// A keyset id: a version byte followed by a 7-byte hash prefix, 16 hex
/// characters on the wire.
///
/// `Id` is a pure function of a keyset's sorted public keys (see
/// `Id::from(&Keys)`), so two mints that happen to derive the same keys
/// produce the same id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Id {
    version: KeySetVersion,
    id: [u8; Self::BYTELEN],
}

impl Id {
    const STRLEN: usize = 14;
    const BYTELEN: usize = 7;

    /// Raw bytes: version byte followed by the hash prefix.
    pub fn to_bytes(self) -> Vec<u8> {
        [vec![self.version.to_byte()], self.id.to_vec()].concat()
    }

    /// Parse from raw bytes (version byte + hash prefix).
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        if bytes.is_empty() {
            return Err(Error::Length);
        }
        Ok(Self {
            version: KeySetVersion::from_byte(bytes[0])?,
            id: bytes[1..].try_into()?,
        })
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.version, hex::encode(self.id))
    }
}

impl FromStr for Id {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 16 {
            return Err(Error::Length);
        }

        Ok(Self {
            version: KeySetVersion::Version00,
            id: hex::decode(&s[2..])?.try_into().map_err(|_| Error::Length)?,
        })
    }
}

impl Serialize for Id {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Id {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Id::from_str(&s).map_err(serde::de::Error::custom)
    }
}

impl From<&Keys> for Id {
    fn from(map: &Keys) -> Self {
        // NUT-02: sort public keys by amount ascending, concatenate,
        // sha256, take the first STRLEN hex chars, prefix with the version
        // byte.
        let mut keys: Vec<(&Amount, &super::nut01::PublicKey)> = map.iter().collect();
        keys.sort_by_key(|(amt, _)| **amt);

        let pubkeys_concat: Vec<u8> = keys
            .iter()
            .flat_map(|(_, pubkey)| pubkey.to_bytes())
            .collect();

        let hash = Sha256::hash(&pubkeys_concat);
        let hex_of_hash = hex::encode(hash.to_byte_array());

        Self {
            version: KeySetVersion::Version00,
            id: hex::decode(&hex_of_hash[0..Self::STRLEN])
                .expect("hex encoding of a hash is always valid hex")
                .try_into()
                .expect("STRLEN/2 == BYTELEN"),
        }
    }
}

/// A keyset's public face: id, unit, and its per-amount public keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeySet {
    /// Keyset id
    pub id: Id,
    /// Monetary unit
    pub unit: CurrencyUnit,
    /// Per-amount public keys
    pub keys: Keys,
}

/// `/v1/keysets` entry: a keyset's metadata, without its keys.
#[derive(Debug, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeySetInfo {
    /// Keyset id
    pub id: Id,
    /// Monetary unit
    pub unit: CurrencyUnit,
    /// Whether the mint currently signs new promises from this keyset
    pub active: bool,
    /// Fee, in parts-per-thousand, charged per input spent from this keyset
    #[serde(default)]
    pub input_fee_ppk: u64,
}

/// `/v1/keysets` response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeysetResponse {
    /// One entry per keyset the mint has ever used
    pub keysets: Vec<KeySetInfo>,
}

/// A mint's full keyset: id, unit, and the per-amount keypairs (private
/// material included).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintKeySet {
    /// Keyset id, derived from `keys`
    pub id: Id,
    /// Monetary unit
    pub unit: CurrencyUnit,
    /// Per-amount keypairs
    pub keys: MintKeys,
}

impl MintKeySet {
    /// Derive a keyset's per-amount keypairs from an already-derived
    /// extended private key, one hardened child per supported amount
    /// (amount `2^i` is hardened child `i`).
    pub fn generate<C: secp256k1::Signing>(
        secp: &Secp256k1<C>,
        xpriv: Xpriv,
        unit: CurrencyUnit,
        max_order: u8,
    ) -> Self {
        let mut map = std::collections::BTreeMap::new();
        for i in 0..max_order {
            let amount = Amount::from(2_u64.pow(i as u32));
            let secret_key = xpriv
                .derive_priv(
                    secp,
                    &[ChildNumber::from_hardened_idx(i as u32)
                        .expect("max_order is bounded well below 2^31")],
                )
                .expect("derivation from a valid xpriv cannot fail")
                .private_key;
            let public_key = secret_key.public_key(secp);
            map.insert(
                amount,
                MintKeyPair {
                    secret_key: secret_key.into(),
                    public_key: public_key.into(),
                },
            );
        }

        let keys = map;
        let public_keys = mint_keys_to_keys(&keys);
        Self {
            id: Id::from(&public_keys),
            unit,
            keys,
        }
    }

    /// Derive a keyset from a master seed and a full derivation path.
    pub fn generate_from_seed<C: secp256k1::Signing>(
        secp: &Secp256k1<C>,
        seed: &[u8],
        max_order: u8,
        unit: CurrencyUnit,
        derivation_path: DerivationPath,
    ) -> Self {
        let master = Xpriv::new_master(bitcoin::Network::Bitcoin, seed)
            .expect("a 16-64 byte seed always produces a valid master xpriv");
        let xpriv = master
            .derive_priv(secp, &derivation_path)
            .expect("derivation from a valid xpriv cannot fail");
        Self::generate(secp, xpriv, unit, max_order)
    }
}

impl From<MintKeySet> for KeySet {
    fn from(keyset: MintKeySet) -> Self {
        Self {
            id: keyset.id,
            unit: keyset.unit,
            keys: mint_keys_to_keys(&keyset.keys),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    const SHORT_KEYSET_ID: &str = "00456a94ab4e1c46";
    const SHORT_KEYSET: &str = r#"
        {
            "1":"03a40f20667ed53513075dc51e715ff2046cad64eb68960632269ba7f0210e38bc",
            "2":"03fd4ce5a16b65576145949e6f99f445f8249fee17c606b688b504a849cdc452de",
            "4":"02648eccfa4c026960966276fa5a4cae46ce0fd432211a4f449bf84f13aa5f8303",
            "8":"02fdfd6796bfeac490cbee12f778f867f0a2c68f6508d17c649759ea0dc3547528"
        }
    "#;

    #[test]
    fn test_deserialization_and_id_generation() {
        let keys: Keys = serde_json::from_str(SHORT_KEYSET).expect("valid keyset json");
        let id: Id = (&keys).into();
        assert_eq!(id, Id::from_str(SHORT_KEYSET_ID).expect("valid id"));
    }

    #[test]
    fn test_keyset_id_roundtrips_bytes() {
        let id = Id::from_str(SHORT_KEYSET_ID).expect("valid id");
        let bytes = id.to_bytes();
        assert_eq!(bytes.len(), 8);
        assert_eq!(Id::from_bytes(&bytes).expect("valid bytes"), id);
    }

    #[test]
    fn test_generate_keyset_deterministic() {
        let secp = Secp256k1::new();
        let seed = [7u8; 32];
        let path = DerivationPath::from_str("m/0'/0'/0'").expect("valid path");
        let a = MintKeySet::generate_from_seed(&secp, &seed, 8, CurrencyUnit::Sat, path.clone());
        let b = MintKeySet::generate_from_seed(&secp, &seed, 8, CurrencyUnit::Sat, path);
        assert_eq!(a.id, b.id);
        assert_eq!(a.keys, b.keys);
    }
}
