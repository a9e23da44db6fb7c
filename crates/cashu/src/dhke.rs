//! Blind Diffie-Hellman Key Exchange (BDHKE) and its DLEQ proof.
//!
//! This is the cryptographic core of the mint: `hash_to_curve` maps an
//! arbitrary secret to a curve point deterministically, `blind_message` /
//! `unblind_message` are the wallet-side blinding steps, `sign_message` /
//! `verify_message` are the mint-side signing and verification steps, and
//! `sign_message_with_dleq` / `verify_dleq_on_*` let a party prove or check
//! that a signature was produced with a specific keypair without revealing
//! the private key (NUT-12).

use bitcoin::hashes::sha256::Hash as Sha256Hash;
use bitcoin::hashes::Hash;
use bitcoin::secp256k1::{Parity, PublicKey as Secp256PublicKey, Scalar, Secp256k1, XOnlyPublicKey};

use crate::error::Error;
use crate::nuts::nut01::{PublicKey, SecretKey};
use crate::nuts::nut12::DleqProof;
use crate::secret::Secret;

const DOMAIN_SEPARATOR: &[u8; 28] = b"Secp256k1_HashToCurve_Cashu_";
const HASH_TO_CURVE_MAX_ITERATIONS: u32 = 1 << 16;

/// Map a message to a curve point deterministically, domain-separated so
/// this hash cannot be reused as an ordinary hash elsewhere in the protocol.
///
/// Iterates a counter until `sha256(sha256(DOMAIN_SEPARATOR || message) ||
/// counter_le)` happens to be a valid x-coordinate, then normalizes to the
/// point with even y. In practice this succeeds on the first or second
/// attempt; `HASH_TO_CURVE_MAX_ITERATIONS` is a denial-of-service backstop
/// that should never be hit.
pub fn hash_to_curve(message: &[u8]) -> Result<PublicKey, Error> {
    let msg_hash: [u8; 32] = Sha256Hash::hash(&[&DOMAIN_SEPARATOR[..], message].concat()).to_byte_array();

    for counter in 0..HASH_TO_CURVE_MAX_ITERATIONS {
        let mut to_hash = Vec::with_capacity(36);
        to_hash.extend_from_slice(&msg_hash);
        to_hash.extend_from_slice(&counter.to_le_bytes());
        let attempt: [u8; 32] = Sha256Hash::hash(&to_hash).to_byte_array();

        if let Ok(xonly) = XOnlyPublicKey::from_slice(&attempt) {
            return Ok(Secp256PublicKey::from_x_only_public_key(xonly, Parity::Even).into());
        }
    }

    Err(Error::HashToCurveExhausted)
}

/// The Fiat-Shamir challenge hash for a DLEQ proof: the sha256 of the
/// hex-encoded compressed-point concatenation of its inputs, in order.
pub fn hash_e<'a, I: IntoIterator<Item = &'a PublicKey>>(points: I) -> [u8; 32] {
    let mut buf = String::new();
    for point in points {
        buf.push_str(&point.to_string());
    }
    Sha256Hash::hash(buf.as_bytes()).to_byte_array()
}

fn combine(points: &[PublicKey]) -> Result<PublicKey, Error> {
    let inner: Vec<Secp256PublicKey> = points.iter().map(|p| p.inner()).collect();
    let refs: Vec<&Secp256PublicKey> = inner.iter().collect();
    Ok(Secp256PublicKey::combine_keys(&refs)?.into())
}

fn negate(secp: &Secp256k1<impl bitcoin::secp256k1::Verification>, point: &PublicKey) -> PublicKey {
    point.inner().negate(secp).into()
}

fn sub(
    secp: &Secp256k1<impl bitcoin::secp256k1::Verification>,
    a: &PublicKey,
    b: &PublicKey,
) -> Result<PublicKey, Error> {
    combine(&[*a, negate(secp, b)])
}

fn point_mul_scalar(
    secp: &Secp256k1<impl bitcoin::secp256k1::Verification>,
    point: &PublicKey,
    scalar: &SecretKey,
) -> Result<PublicKey, Error> {
    Ok(point.inner().mul_tweak(secp, &Scalar::from(scalar.inner()))?.into())
}

fn scalar_mul(a: &SecretKey, b: &SecretKey) -> Result<SecretKey, Error> {
    Ok(a.inner().mul_tweak(&Scalar::from(b.inner()))?.into())
}

fn scalar_add(a: &SecretKey, b: &SecretKey) -> Result<SecretKey, Error> {
    Ok(a.inner().add_tweak(&Scalar::from(b.inner()))?.into())
}

fn random_secret_key() -> SecretKey {
    bitcoin::secp256k1::SecretKey::new(&mut rand::thread_rng()).into()
}

/// Blind a secret: `B_ = Y + rG`, generating a fresh blinding factor `r` if
/// none is supplied. Returns `(B_, r)`.
pub fn blind_message(
    secret: &[u8],
    blinding_factor: Option<SecretKey>,
) -> Result<(PublicKey, SecretKey), Error> {
    let secp = Secp256k1::new();
    let y = hash_to_curve(secret)?;
    let r = blinding_factor.unwrap_or_else(random_secret_key);
    let b_ = combine(&[y, r.public_key(&secp)])?;
    Ok((b_, r))
}

/// Mint-side signing step: `C_ = k * B_`, where `k` is the mint's private
/// key for the requested amount.
pub fn sign_message(secret_key: &SecretKey, blinded_message: &PublicKey) -> Result<PublicKey, Error> {
    let secp = Secp256k1::new();
    point_mul_scalar(&secp, blinded_message, secret_key)
}

/// Unblind a mint signature: `C = C_ - rK`, where `K` is the mint's public
/// key for the signed amount.
pub fn unblind_message(
    c_: &PublicKey,
    r: &SecretKey,
    mint_public_key: &PublicKey,
) -> Result<PublicKey, Error> {
    let secp = Secp256k1::new();
    let r_k = point_mul_scalar(&secp, mint_public_key, r)?;
    sub(&secp, c_, &r_k)
}

/// Verify that `c` is the mint's signature, under `secret_key`, of `secret`:
/// `C == k * hash_to_curve(secret)`.
pub fn verify_message(secret_key: &SecretKey, c: &PublicKey, secret: &[u8]) -> Result<(), Error> {
    let secp = Secp256k1::new();
    let y = hash_to_curve(secret)?;
    let expected = point_mul_scalar(&secp, &y, secret_key)?;
    if &expected == c {
        Ok(())
    } else {
        Err(Error::TokenNotVerified)
    }
}

/// Sign a blinded message and attach a DLEQ proof that the signature was
/// produced with `secret_key` (Chaum-Pedersen, per NUT-12):
///
/// ```text
/// p random; R1 = pG; R2 = p*B_
/// e = hash_e(R1, R2, A, C_)
/// s = p + e*k
/// ```
pub fn sign_message_with_dleq(
    secret_key: &SecretKey,
    blinded_message: &PublicKey,
) -> Result<(PublicKey, DleqProof), Error> {
    let secp = Secp256k1::new();
    let c_ = point_mul_scalar(&secp, blinded_message, secret_key)?;

    let p = random_secret_key();
    let r1 = p.public_key(&secp);
    let r2 = point_mul_scalar(&secp, blinded_message, &p)?;
    let mint_public_key = secret_key.public_key(&secp);

    let e_bytes = hash_e([&r1, &r2, &mint_public_key, &c_]);
    let e: SecretKey = bitcoin::secp256k1::SecretKey::from_slice(&e_bytes)?.into();
    let s = scalar_add(&p, &scalar_mul(&e, secret_key)?)?;

    Ok((c_, DleqProof { e, s, r: None }))
}

/// Verify a DLEQ proof over a blinded message and its signature (the
/// wallet's check, before unblinding): recomputes `R1 = sG - eA`,
/// `R2 = sB_ - eC_` and checks `e == hash_e(R1, R2, A, C_)`.
pub fn verify_dleq_on_blinded(
    mint_public_key: &PublicKey,
    blinded_message: &PublicKey,
    c_: &PublicKey,
    dleq: &DleqProof,
) -> Result<(), Error> {
    let secp = Secp256k1::new();

    let sg = dleq.s.public_key(&secp);
    let e_a = point_mul_scalar(&secp, mint_public_key, &dleq.e)?;
    let r1 = sub(&secp, &sg, &e_a)?;

    let s_b = point_mul_scalar(&secp, blinded_message, &dleq.s)?;
    let e_c = point_mul_scalar(&secp, c_, &dleq.e)?;
    let r2 = sub(&secp, &s_b, &e_c)?;

    let expected_e = hash_e([&r1, &r2, mint_public_key, c_]);
    if expected_e == dleq.e.to_bytes() {
        Ok(())
    } else {
        Err(Error::CouldNotVerifyDleq)
    }
}

/// Verify a DLEQ proof carried on an unblinded [`crate::nuts::nut00::Proof`].
/// The proof's blinding factor `r` lets a verifier reconstruct `B_` and `C_`
/// (`B_ = Y + rG`, `C_ = C + rA`) and re-run the blinded-side check.
pub fn verify_dleq_on_proof(
    mint_public_key: &PublicKey,
    secret: &Secret,
    c: &PublicKey,
    dleq: &DleqProof,
) -> Result<(), Error> {
    let r = dleq.r.ok_or(Error::CouldNotVerifyDleq)?;
    let secp = Secp256k1::new();

    let y = hash_to_curve(secret.as_bytes())?;
    let b_ = combine(&[y, r.public_key(&secp)])?;
    let r_a = point_mul_scalar(&secp, mint_public_key, &r)?;
    let c_ = combine(&[*c, r_a])?;

    verify_dleq_on_blinded(mint_public_key, &b_, &c_, dleq)
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;
    use crate::nuts::nut00::{BlindedSignature, Proof};
    use crate::nuts::nut02::Id;
    use crate::util::hex;

    #[test]
    fn test_hash_to_curve() {
        let vectors = [
            (
                "0000000000000000000000000000000000000000000000000000000000000000",
                "024cce997d3b518f739663b757deaec95bcd9473c30a14ac2fd04023a739d1a725",
            ),
            (
                "0000000000000000000000000000000000000000000000000000000000000001",
                "022e7158e11c9506f1aa4248bf531298daa7febd6194f003edcd9b93ade6253acf",
            ),
            (
                "0000000000000000000000000000000000000000000000000000000000000002",
                "026cdbe15362df59cd1dd3c9c11de8aedac2106eca69236ecd9fbe117af897be4f",
            ),
        ];

        for (secret_hex, expected_hex) in vectors {
            let secret = hex::decode(secret_hex).expect("valid hex");
            let y = hash_to_curve(&secret).expect("valid point found");
            let expected: PublicKey = expected_hex.parse().expect("valid hex pubkey");
            assert_eq!(y, expected);
        }
    }

    #[test]
    fn test_hash_e() {
        let c = PublicKey::from_str(
            "02a9acc1e48c25eeeb9289b5031cc57da9fe72f3fe2861d264bdc074209b107ba2",
        )
        .expect("valid");
        let k = PublicKey::from_str(
            "020000000000000000000000000000000000000000000000000000000000000001",
        )
        .expect("valid");
        let r1 = k;
        let r2 = k;

        let e = hash_e([&r1, &r2, &k, &c]);
        assert_eq!(
            hex::encode(e),
            "a4dc034b74338c28c6bc3ea49731f2a24440fc7c4affc08b31a93fc9fbe6401e"
        );
    }

    #[test]
    fn test_blind_message() {
        let message =
            hex::decode("d341ee4871f1f889041e63cf0d3823c713eea6aff01e80f1719f08f9e5be98f6")
                .expect("valid hex");
        let sec: SecretKey =
            "99fce58439fc37412ab3468b73db0569322588f62fb3a49182d67e23d877824a"
                .parse()
                .expect("valid hex secret");

        let (b, r) = blind_message(&message, Some(sec)).expect("blinding succeeds");
        assert_eq!(sec, r);
        assert_eq!(
            b,
            "033b1a9737a40cc3fd9b6af4b723632b76a67a36782596304612a6c2bfb5197e6d"
                .parse()
                .expect("valid hex pubkey")
        );
    }

    #[test]
    fn test_unblind_message() {
        let blinded_key: PublicKey =
            "02a9acc1e48c25eeeb9289b5031cc57da9fe72f3fe2861d264bdc074209b107ba2"
                .parse()
                .expect("valid");
        let r: SecretKey =
            "0000000000000000000000000000000000000000000000000000000000000001"
                .parse()
                .expect("valid");
        let a: PublicKey =
            "020000000000000000000000000000000000000000000000000000000000000001"
                .parse()
                .expect("valid");

        let unblinded = unblind_message(&blinded_key, &r, &a).expect("unblinding succeeds");
        assert_eq!(
            unblinded,
            "03c724d7e6a5443b39ac8acf11f40420adc4f99a02e7cc1b57703d9391f6d129cd"
                .parse()
                .expect("valid")
        );
    }

    #[test]
    fn test_sign_message() {
        let message = "test_message";
        let sec: SecretKey =
            "0000000000000000000000000000000000000000000000000000000000000001"
                .parse()
                .expect("valid");
        let (blinded_message, _r) =
            blind_message(message.as_bytes(), Some(sec)).expect("blinding succeeds");

        let bob_sec: SecretKey =
            "0000000000000000000000000000000000000000000000000000000000000001"
                .parse()
                .expect("valid");
        let signed = sign_message(&bob_sec, &blinded_message).expect("signing succeeds");
        assert_eq!(
            signed,
            "025cc16fe33b953e2ace39653efb3e7a7049711ae1d8a2f7a9108753f1cdea742b"
                .parse()
                .expect("valid")
        );

        let bob_sec: SecretKey =
            "7f7f7f7f7f7f7f7f7f7f7f7f7f7f7f7f7f7f7f7f7f7f7f7f7f7f7f7f7f7f7f7f"
                .parse()
                .expect("valid");
        let signed = sign_message(&bob_sec, &blinded_message).expect("signing succeeds");
        assert_eq!(
            signed,
            "027726f0e5757b4202a27198369a3477a17bc275b7529da518fc7cb4a1d927cc0d"
                .parse()
                .expect("valid")
        );
    }

    #[test]
    fn test_round_trip_with_dleq() {
        let secp = Secp256k1::new();
        let secret_key = random_secret_key();
        let mint_public_key = secret_key.public_key(&secp);

        let secret = Secret::new("an opaque wallet-chosen secret");
        let (b_, r) = blind_message(secret.as_bytes(), None).expect("blinding succeeds");

        let (c_, dleq) = sign_message_with_dleq(&secret_key, &b_).expect("signing succeeds");
        verify_dleq_on_blinded(&mint_public_key, &b_, &c_, &dleq).expect("dleq checks out");

        let c = unblind_message(&c_, &r, &mint_public_key).expect("unblinding succeeds");
        verify_message(&secret_key, &c, secret.as_bytes()).expect("signature checks out");

        let proof_dleq = DleqProof { r: Some(r), ..dleq };
        verify_dleq_on_proof(&mint_public_key, &secret, &c, &proof_dleq)
            .expect("proof-side dleq checks out");
    }

    #[test]
    fn test_blind_signature_dleq_fixture() {
        let blinded_sig = r#"{"id":"00882760bfa2eb41","amount":8,"C_":"02a9acc1e48c25eeeb9289b5031cc57da9fe72f3fe2861d264bdc074209b107ba2","dleq":{"e":"9818e061ee51d5c8edc3342369a554998ff7b4381c8652d724cdf46429be73d9","s":"9818e061ee51d5c8edc3342369a554998ff7b4381c8652d724cdf46429be73da"}}"#;
        let blinded: BlindedSignature = serde_json::from_str(blinded_sig).expect("valid json");
        let dleq = blinded.dleq.expect("fixture carries a dleq proof");

        let secret_key: SecretKey =
            "0000000000000000000000000000000000000000000000000000000000000001"
                .parse()
                .expect("valid");
        let mint_public_key = secret_key.public_key(&Secp256k1::new());
        let blinded_secret: PublicKey =
            "02a9acc1e48c25eeeb9289b5031cc57da9fe72f3fe2861d264bdc074209b107ba2"
                .parse()
                .expect("valid");

        verify_dleq_on_blinded(&mint_public_key, &blinded_secret, &blinded.c, &dleq)
            .expect("fixture dleq verifies");
    }

    #[test]
    fn test_proof_dleq_fixture() {
        let proof_json = r#"{"id":"00882760bfa2eb41","amount":1,"secret":"daf4dd00a2b68a0858a80450f52c8a7d2ccf87d375e43e216e0c571f089f63e9","C":"024369d2d22a80ecf78f3937da9d5f30c1b9f74f0c32684d583cca0fa6a61cdcfc","dleq":{"e":"b31e58ac6527f34975ffab13e70a48b6d2b0d35abc4b03f0151f09ee1a9763d4","s":"8fbae004c59e754d71df67e392b6ae4e29293113ddc2ec86592a0431d16306d8","r":"a6d13fcd7a18442e6076f5e1e7c887ad5de40a019824bdfa9fe740d302e8d861"}}"#;
        let proof: Proof = serde_json::from_str(proof_json).expect("valid json");
        let dleq = proof.dleq.expect("fixture carries a dleq proof");

        let mint_public_key: PublicKey =
            "0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798"
                .parse()
                .expect("valid");

        verify_dleq_on_proof(&mint_public_key, &proof.secret, &proof.c, &dleq)
            .expect("fixture dleq verifies");
        let _ = Id::from_str("00882760bfa2eb41").expect("fixture keyset id parses");
    }
}
