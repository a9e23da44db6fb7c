//! NUT-01: Mint public keys
//!
//! <https://github.com/cashubtc/nuts/blob/main/01.md>

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::amount::Amount;
use crate::error::Error;
use crate::util::hex;

/// A secp256k1 public key, serialized on the wire as 33-byte compressed hex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PublicKey(bitcoin::secp256k1::PublicKey);

impl PublicKey {
    /// Wrap an existing secp256k1 public key
    pub fn new(inner: bitcoin::secp256k1::PublicKey) -> Self {
        Self(inner)
    }

    /// The inner secp256k1 public key
    pub fn inner(&self) -> bitcoin::secp256k1::PublicKey {
        self.0
    }

    /// 33-byte SEC1 compressed encoding
    pub fn to_bytes(&self) -> [u8; 33] {
        self.0.serialize()
    }

    /// Parse from a 33-byte compressed SEC1 encoding
    pub fn from_slice(bytes: &[u8]) -> Result<Self, Error> {
        Ok(Self(bitcoin::secp256k1::PublicKey::from_slice(bytes)?))
    }
}

impl From<bitcoin::secp256k1::PublicKey> for PublicKey {
    fn from(inner: bitcoin::secp256k1::PublicKey) -> Self {
        Self(inner)
    }
}

impl From<PublicKey> for bitcoin::secp256k1::PublicKey {
    fn from(value: PublicKey) -> Self {
        value.0
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.to_bytes()))
    }
}

impl FromStr for PublicKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_slice(&hex::decode(s)?)
    }
}

impl Serialize for PublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_str(&s).map_err(serde::de::Error::custom)
    }
}

/// A secp256k1 secret key, serialized on the wire as 32-byte hex.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SecretKey(bitcoin::secp256k1::SecretKey);

impl SecretKey {
    /// Wrap an existing secp256k1 secret key
    pub fn new(inner: bitcoin::secp256k1::SecretKey) -> Self {
        Self(inner)
    }

    /// The inner secp256k1 secret key
    pub fn inner(&self) -> bitcoin::secp256k1::SecretKey {
        self.0
    }

    /// The corresponding public key, on the standard (`secp256k1::All`) context
    pub fn public_key<C: bitcoin::secp256k1::Signing>(
        &self,
        secp: &bitcoin::secp256k1::Secp256k1<C>,
    ) -> PublicKey {
        PublicKey(self.0.public_key(secp))
    }

    /// 32-byte encoding
    pub fn to_bytes(&self) -> [u8; 32] {
        self.0.secret_bytes()
    }
}

impl From<bitcoin::secp256k1::SecretKey> for SecretKey {
    fn from(inner: bitcoin::secp256k1::SecretKey) -> Self {
        Self(inner)
    }
}

impl From<SecretKey> for bitcoin::secp256k1::SecretKey {
    fn from(value: SecretKey) -> Self {
        value.0
    }
}

impl fmt::Display for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.to_bytes()))
    }
}

impl FromStr for SecretKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(bitcoin::secp256k1::SecretKey::from_slice(
            &hex::decode(s)?,
        )?))
    }
}

impl Serialize for SecretKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for SecretKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_str(&s).map_err(serde::de::Error::custom)
    }
}

/// A keyset's public keys, one per supported amount.
pub type Keys = BTreeMap<Amount, PublicKey>;

/// A mint-held keypair for one amount of a keyset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MintKeyPair {
    /// Secret signing key
    pub secret_key: SecretKey,
    /// Corresponding public key
    pub public_key: PublicKey,
}

/// A mint's full per-amount keypairs for one keyset.
pub type MintKeys = BTreeMap<Amount, MintKeyPair>;

/// Project a mint's keypairs down to their public halves.
pub fn mint_keys_to_keys(keys: &MintKeys) -> Keys {
    keys.iter().map(|(amt, pair)| (*amt, pair.public_key)).collect()
}

/// `/v1/keys` response: the active keysets and their public keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeysResponse {
    /// One entry per returned keyset
    pub keysets: Vec<super::nut02::KeySet>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_key_roundtrip() {
        let secp = bitcoin::secp256k1::Secp256k1::new();
        let sk = SecretKey::new(bitcoin::secp256k1::SecretKey::from_slice(&[1u8; 32]).expect("valid"));
        let pk = sk.public_key(&secp);
        let s = pk.to_string();
        let pk2: PublicKey = s.parse().expect("valid hex");
        assert_eq!(pk, pk2);
    }
}
