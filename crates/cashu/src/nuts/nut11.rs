//! NUT-11: Pay-to-pubkey (P2PK) and NUT-14: HTLC spending conditions
//!
//! <https://github.com/cashubtc/nuts/blob/main/11.md>
//! <https://github.com/cashubtc/nuts/blob/main/14.md>

use bitcoin::hashes::sha256::Hash as Sha256Hash;
use bitcoin::hashes::Hash;
use bitcoin::secp256k1::schnorr::Signature as SchnorrSignature;
use bitcoin::secp256k1::{Secp256k1, XOnlyPublicKey};
use serde::{Deserialize, Serialize};

use super::nut10::{Kind, WellKnownSecret};
use crate::error::Error;
use crate::secret::Secret;
use crate::util::hex;

/// Whether a spending condition requires only the inputs (default) or all
/// inputs *and* outputs of the enclosing transaction to be signed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SigFlag {
    /// Only the proof carrying the condition needs a witness signature
    #[default]
    SigInputs,
    /// Every input and output of the transaction must be co-signed
    SigAll,
}

impl std::str::FromStr for SigFlag {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SIG_ALL" => Ok(Self::SigAll),
            "SIG_INPUTS" => Ok(Self::SigInputs),
            other => Err(Error::InvalidSecret(format!("unknown sig_flag `{other}`"))),
        }
    }
}

/// A witness attached to a [`super::nut00::Proof`] spending a well-known
/// secret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Witness {
    /// P2PK witness: one or more Schnorr signatures over the secret.
    P2PK {
        /// hex-encoded BIP-340 Schnorr signatures
        signatures: Vec<String>,
    },
    /// HTLC witness: the hash preimage, plus optional signatures (the
    /// refund/locktime path behaves like P2PK).
    HTLC {
        /// hex-encoded preimage
        preimage: String,
        /// hex-encoded BIP-340 Schnorr signatures, required after locktime
        /// or when a refund pubkey set is configured
        #[serde(default, skip_serializing_if = "Option::is_none")]
        signatures: Option<Vec<String>>,
    },
}

/// The message a spending-condition signature is computed over: the proof
/// secret's raw bytes (SIG_INPUTS) or additionally a digest of the
/// transaction's other inputs/outputs (SIG_ALL). This crate only implements
/// the SIG_INPUTS message; SIG_ALL enforcement at the transaction level is
/// the caller's responsibility (see `cdk_mint::mint::verification`).
fn signed_message(secret: &Secret) -> [u8; 32] {
    Sha256Hash::hash(secret.as_bytes()).to_byte_array()
}

fn verify_one_signature(
    secp: &Secp256k1<bitcoin::secp256k1::VerifyOnly>,
    pubkey_hex: &str,
    message: &[u8; 32],
    signature_hex: &str,
) -> bool {
    let Ok(pubkey_bytes) = hex::decode(pubkey_hex) else {
        return false;
    };
    // Accept both 32-byte x-only and 33-byte compressed encodings for the
    // embedded policy pubkey, dropping the leading parity byte if present.
    let xonly_bytes: &[u8] = match pubkey_bytes.len() {
        32 => &pubkey_bytes,
        33 => &pubkey_bytes[1..],
        _ => return false,
    };
    let Ok(xonly) = XOnlyPublicKey::from_slice(xonly_bytes) else {
        return false;
    };
    let Ok(sig_bytes) = hex::decode(signature_hex) else {
        return false;
    };
    let Ok(sig) = SchnorrSignature::from_slice(&sig_bytes) else {
        return false;
    };

    if secp.verify_schnorr(&sig, message, &xonly).is_ok() {
        true
    } else {
        tracing::debug!("Could not verify signature: {signature_hex} on message: {}", hex::encode(message));
        false
    }
}

/// Number of valid signatures, against the given candidate pubkeys, found in
/// `signatures`. Each pubkey is matched at most once.
fn count_valid_signatures(
    candidate_pubkeys: &[String],
    message: &[u8; 32],
    signatures: &[String],
) -> usize {
    let secp = Secp256k1::verification_only();
    let mut used = vec![false; signatures.len()];
    let mut valid = 0;

    for pubkey in candidate_pubkeys {
        for (i, sig) in signatures.iter().enumerate() {
            if used[i] {
                continue;
            }
            if verify_one_signature(&secp, pubkey, message, sig) {
                used[i] = true;
                valid += 1;
                break;
            }
        }
    }

    valid
}

/// Verify a proof's P2PK/HTLC spending condition against its witness.
///
/// `now` is the current unix time, used to evaluate an optional `locktime`
/// tag: before locktime the primary `data` pubkey (plus any `pubkeys` tag)
/// must satisfy `n_sigs`; at or after locktime, a `refund` pubkey list
/// (single signature) is accepted instead. Secrets without a well-known
/// structure place no spending condition and always pass.
///
/// The signed message is this proof's own secret; use
/// [`verify_spending_condition_over`] when the secret's `sig_flag` tag is
/// `SIG_ALL` and the witness instead signs the whole enclosing transaction.
pub fn verify_spending_condition(
    secret: &Secret,
    witness: Option<&Witness>,
    now: u64,
) -> Result<(), Error> {
    verify_spending_condition_over(secret, witness, now, &signed_message(secret))
}

/// As [`verify_spending_condition`], but the signature is checked against an
/// explicit `message` rather than this secret's own hash. Callers enforcing
/// a `SIG_ALL` spending condition across a whole swap/melt transaction pass
/// the transaction-wide digest here.
pub fn verify_spending_condition_over(
    secret: &Secret,
    witness: Option<&Witness>,
    now: u64,
    message: &[u8; 32],
) -> Result<(), Error> {
    let Some(well_known) = WellKnownSecret::try_parse(secret) else {
        return Ok(());
    };

    let message = *message;

    let locktime: Option<u64> = well_known
        .tag("locktime")
        .and_then(|v| v.first())
        .and_then(|s| s.parse().ok());
    let expired = locktime.map(|lt| now >= lt).unwrap_or(false);

    match well_known.kind {
        Kind::P2PK => {
            let Some(Witness::P2PK { signatures }) = witness else {
                return Err(Error::WitnessMissing);
            };

            if expired {
                let refund_keys = well_known.tag("refund").unwrap_or(&[]);
                if refund_keys.is_empty() {
                    // No refund path configured: locktime expiry places no
                    // further restriction.
                    return Ok(());
                }
                if count_valid_signatures(refund_keys, &message, signatures) >= 1 {
                    return Ok(());
                }
                return Err(Error::SpendConditionsNotMet(
                    "refund signature not satisfied".into(),
                ));
            }

            let mut candidates = vec![well_known.secret_data.data.clone()];
            if let Some(extra) = well_known.tag("pubkeys") {
                candidates.extend(extra.iter().cloned());
            }
            let n_sigs: usize = well_known
                .tag("n_sigs")
                .and_then(|v| v.first())
                .and_then(|s| s.parse().ok())
                .unwrap_or(1);

            if count_valid_signatures(&candidates, &message, signatures) >= n_sigs {
                Ok(())
            } else {
                Err(Error::SpendConditionsNotMet(
                    "insufficient P2PK signatures".into(),
                ))
            }
        }
        Kind::HTLC => {
            let Some(Witness::HTLC { preimage, signatures }) = witness else {
                return Err(Error::WitnessMissing);
            };

            let preimage_bytes = hex::decode(preimage)?;
            let computed = Sha256Hash::hash(&preimage_bytes).to_byte_array();
            let expected = hex::decode(&well_known.secret_data.data)?;
            if computed.as_slice() != expected.as_slice() {
                return Err(Error::SpendConditionsNotMet(
                    "preimage does not match hash".into(),
                ));
            }

            // An HTLC may additionally require a P2PK-style signature; if a
            // `pubkeys` tag is present, treat it the same as P2PK above.
            if let Some(pubkeys) = well_known.tag("pubkeys") {
                let signatures = signatures
                    .as_ref()
                    .ok_or(Error::WitnessMissing)?;
                let n_sigs: usize = well_known
                    .tag("n_sigs")
                    .and_then(|v| v.first())
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(1);
                if count_valid_signatures(pubkeys, &message, signatures) < n_sigs {
                    return Err(Error::SpendConditionsNotMet(
                        "insufficient HTLC signatures".into(),
                    ));
                }
            }

            Ok(())
        }
    }
}

/// The message a `SIG_ALL` witness signs: the secrets of every input
/// followed by the blinded secrets of every output, in request order.
pub fn transaction_sig_all_message<'a, O: IntoIterator<Item = &'a crate::nuts::nut01::PublicKey>>(
    secrets: &[Secret],
    outputs: O,
) -> [u8; 32] {
    let mut buf = Vec::new();
    for secret in secrets {
        buf.extend_from_slice(secret.as_bytes());
    }
    for output in outputs {
        buf.extend_from_slice(&output.to_bytes());
    }
    Sha256Hash::hash(&buf).to_byte_array()
}

/// The strictest [`SigFlag`] across a batch of secrets: `SigAll` if any
/// secret's `sig_flag` tag requests it, `SigInputs` otherwise.
pub fn enforce_sig_flag(secrets: &[Secret]) -> SigFlag {
    for secret in secrets {
        if let Some(well_known) = WellKnownSecret::try_parse(secret) {
            if let Some(flag) = well_known.tag("sig_flag").and_then(|v| v.first()) {
                if flag == "SIG_ALL" {
                    return SigFlag::SigAll;
                }
            }
        }
    }
    SigFlag::SigInputs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_structured_secret_has_no_condition() {
        let secret = Secret::new("just a random opaque string");
        assert!(verify_spending_condition(&secret, None, 0).is_ok());
    }

    #[test]
    fn test_sig_flag_defaults_to_sig_inputs() {
        let secret = Secret::new("opaque");
        assert_eq!(enforce_sig_flag(&[secret]), SigFlag::SigInputs);
    }
}
