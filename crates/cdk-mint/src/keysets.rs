//! Keyset manager: generates, loads and activates per-unit keysets.
//!
//! Key material is generated and held in-process rather than delegated to an
//! external signer service, which is out of scope here.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use bitcoin::bip32::DerivationPath;
use bitcoin::secp256k1::{All, Secp256k1};
use cashu::nuts::nut00::CurrencyUnit;
use cashu::nuts::nut02::{Id, KeySet, KeySetInfo, MintKeySet};

use crate::database::MintDatabase;
use crate::error::Error;

/// A keyset's metadata, as persisted by [`crate::database::MintKeysDatabase`].
/// Distinct from [`KeySetInfo`] (the wire type) because it additionally
/// carries the derivation path needed to regenerate the keyset's private
/// material from the master seed at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintKeySetInfo {
    /// Keyset id, derived from its public keys
    pub id: Id,
    /// Monetary unit
    pub unit: CurrencyUnit,
    /// Whether this keyset currently signs new promises
    pub active: bool,
    /// Unix time this keyset was first generated
    pub valid_from: u64,
    /// Full BIP32 path this keyset's keys were derived under
    pub derivation_path: DerivationPath,
    /// Number of supported amounts (powers of two `0..max_order`)
    pub max_order: u8,
    /// Fee, in parts-per-thousand, charged per input spent from this keyset
    pub input_fee_ppk: u64,
    /// Unix time after which proofs from this keyset are no longer honored,
    /// if the keyset has been scheduled for final retirement
    pub final_expiry: Option<u64>,
}

impl From<&MintKeySetInfo> for KeySetInfo {
    fn from(info: &MintKeySetInfo) -> Self {
        Self {
            id: info.id,
            unit: info.unit.clone(),
            active: info.active,
            input_fee_ppk: info.input_fee_ppk,
        }
    }
}

/// Parameters for one keyset a mint should have active on startup.
#[derive(Debug, Clone)]
pub struct KeysetConfig {
    /// Derivation path this keyset's keys come from
    pub derivation_path: DerivationPath,
    /// Unit this keyset issues
    pub unit: CurrencyUnit,
    /// Number of supported amounts
    pub max_order: u8,
    /// Input fee, parts-per-thousand
    pub input_fee_ppk: u64,
}

/// Owns every keyset's private material in memory and keeps the database's
/// metadata table in sync with it.
pub struct KeysetManager {
    secp: Secp256k1<All>,
    seed: Vec<u8>,
    db: Arc<dyn MintDatabase>,
    keysets: RwLock<HashMap<Id, MintKeySet>>,
}

impl std::fmt::Debug for KeysetManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeysetManager").finish_non_exhaustive()
    }
}

impl KeysetManager {
    /// Build a manager over an already-decrypted master seed. Seed
    /// decryption (AES, out-of-band key) happens before construction;
    /// this type only ever holds the decrypted bytes.
    pub fn new(seed: Vec<u8>, db: Arc<dyn MintDatabase>) -> Self {
        Self {
            secp: Secp256k1::new(),
            seed,
            db,
            keysets: RwLock::new(HashMap::new()),
        }
    }

    fn now() -> u64 {
        web_time::SystemTime::now()
            .duration_since(web_time::UNIX_EPOCH)
            .expect("system clock is after the unix epoch")
            .as_secs()
    }

    /// Generate (or regenerate, deterministically) a keyset for `config`,
    /// persist its metadata, and mark it active for its unit — deactivating
    /// whatever keyset previously held that unit's active slot.
    pub async fn activate_keyset(&self, config: KeysetConfig) -> Result<MintKeySetInfo, Error> {
        let keyset = MintKeySet::generate_from_seed(
            &self.secp,
            &self.seed,
            config.max_order,
            config.unit.clone(),
            config.derivation_path.clone(),
        );
        let id = keyset.id;

        let info = match self.db.get_keyset_info(&id).await? {
            Some(existing) => MintKeySetInfo { active: true, ..existing },
            None => MintKeySetInfo {
                id,
                unit: config.unit.clone(),
                active: true,
                valid_from: Self::now(),
                derivation_path: config.derivation_path,
                max_order: config.max_order,
                input_fee_ppk: config.input_fee_ppk,
                final_expiry: None,
            },
        };

        let previously_active = self.db.get_active_keyset_id(&config.unit).await?;

        let mut tx = self.db.begin_transaction().await?;
        if let Some(old_id) = previously_active {
            if old_id != id {
                if let Some(old_info) = self.db.get_keyset_info(&old_id).await? {
                    tx.add_keyset_info(MintKeySetInfo { active: false, ..old_info }).await?;
                }
            }
        }
        tx.add_keyset_info(info.clone()).await?;
        tx.set_active_keyset(config.unit, id).await?;
        tx.commit().await?;

        self.keysets.write().expect("lock not poisoned").insert(id, keyset);
        Ok(info)
    }

    /// Load every historical keyset from the database, regenerating its
    /// private material from the seed, then activate every keyset in
    /// `configured`. Fails if no keyset ends up active for any unit.
    pub async fn init_keysets(&self, configured: Vec<KeysetConfig>) -> Result<(), Error> {
        for info in self.db.get_keyset_infos().await? {
            let keyset = MintKeySet::generate_from_seed(
                &self.secp,
                &self.seed,
                info.max_order,
                info.unit.clone(),
                info.derivation_path.clone(),
            );
            self.keysets.write().expect("lock not poisoned").insert(info.id, keyset);
        }

        for config in configured {
            self.activate_keyset(config).await?;
        }

        if self.db.get_active_keysets().await?.is_empty() {
            return Err(Error::Internal("no active keyset after startup".into()));
        }

        Ok(())
    }

    /// The full keyset (private material included), for signing.
    pub fn mint_keyset(&self, id: &Id) -> Result<MintKeySet, Error> {
        self.keysets
            .read()
            .expect("lock not poisoned")
            .get(id)
            .cloned()
            .ok_or(Error::KeysetUnknown(*id))
    }

    /// The public face of one keyset, active or retired.
    pub fn keyset(&self, id: &Id) -> Result<KeySet, Error> {
        self.mint_keyset(id).map(KeySet::from)
    }

    /// Every currently active keyset's public face, one per unit.
    pub async fn active_keysets(&self) -> Result<Vec<KeySet>, Error> {
        let active_ids = self.db.get_active_keysets().await?;
        active_ids.values().map(|id| self.keyset(id)).collect()
    }

    /// Metadata for every keyset this mint has ever used.
    pub async fn keyset_infos(&self) -> Result<Vec<MintKeySetInfo>, Error> {
        Ok(self.db.get_keyset_infos().await?)
    }

    /// Metadata for one keyset.
    pub async fn keyset_info(&self, id: &Id) -> Result<MintKeySetInfo, Error> {
        self.db
            .get_keyset_info(id)
            .await?
            .ok_or(Error::KeysetUnknown(*id))
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use crate::database::MintMemoryDatabase;

    use super::*;

    fn config() -> KeysetConfig {
        KeysetConfig {
            derivation_path: DerivationPath::from_str("m/0'/0'/0'").expect("valid path"),
            unit: CurrencyUnit::Sat,
            max_order: 8,
            input_fee_ppk: 0,
        }
    }

    #[tokio::test]
    async fn init_activates_the_configured_keyset() {
        let db = Arc::new(MintMemoryDatabase::new());
        let manager = KeysetManager::new(vec![7u8; 32], db);
        manager.init_keysets(vec![config()]).await.expect("init succeeds");

        let active = manager.active_keysets().await.expect("lookup succeeds");
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].unit, CurrencyUnit::Sat);
    }

    #[tokio::test]
    async fn rotating_a_unit_deactivates_the_old_keyset() {
        let db = Arc::new(MintMemoryDatabase::new());
        let manager = KeysetManager::new(vec![7u8; 32], db);
        let first = manager.activate_keyset(config()).await.expect("first activation");

        let mut second_config = config();
        second_config.derivation_path = DerivationPath::from_str("m/0'/0'/1'").expect("valid path");
        manager.activate_keyset(second_config).await.expect("second activation");

        let first_info = manager.keyset_info(&first.id).await.expect("lookup succeeds");
        assert!(!first_info.active);
    }

    #[tokio::test]
    async fn unknown_keyset_is_an_error() {
        let db = Arc::new(MintMemoryDatabase::new());
        let manager = KeysetManager::new(vec![7u8; 32], db);
        let bogus = Id::from_str("00456a94ab4e1c46").expect("valid id");
        assert!(manager.keyset(&bogus).is_err());
    }
}
