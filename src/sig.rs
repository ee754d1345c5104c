//! RSA Sign and Verify
//!
//! Signature Generation
//! The signature is the deciphering process (m = c^d mod n) applied to the file digest,
//! reduced into the ring first:
//! s = (h mod n)^d mod n, where h = SHA-256(file) read as an integer
//!
//! Signature Verification
//! Given a signature `s`, we can verify that it was actually signed by the holder of the
//! private key `d` by verifying it with the corresponding public key `e`. This is done
//! computing h' = s^e mod n
//!
//! The signature is valid iff h' = h mod n.

use crate::container::{self, SignatureRecord};
use crate::digest::{digest, FileDigest};
use crate::error::Result;
use crate::keygen::{KeyPair, PrivateKey, PublicKey};
use crate::math::mod_pow;

use num_bigint::BigUint;
use num_traits::identities::Zero;

/// A signature, plus the digest it was computed from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureOutput {
    pub signature: BigUint,
    pub digest: FileDigest,
}

/// s = (h mod n)^d mod n
///
/// # Panics
///
/// If the key's modulus is zero.
pub fn sign(message: &[u8], key: &PrivateKey) -> SignatureOutput {
    let digest = digest(message);
    let signature = sign_digest(&digest, key);

    SignatureOutput { signature, digest }
}

pub fn sign_digest(digest: &FileDigest, key: &PrivateKey) -> BigUint {
    let reduced = &digest.value % &key.n;
    mod_pow(&reduced, &key.d, &key.n)
}

/// h' = s^e mod n
pub fn verify(message: &[u8], signature: &BigUint, key: &PublicKey) -> bool {
    verify_digest(&digest(message), signature, key)
}

/// A signature outside [0, n) is not an error, it just doesn't match
pub fn verify_digest(digest: &FileDigest, signature: &BigUint, key: &PublicKey) -> bool {
    if key.n.is_zero() || *signature >= key.n {
        return false;
    }

    let reduced = &digest.value % &key.n;
    let recovered = mod_pow(signature, &key.e, &key.n);

    // check if h mod n = h'
    recovered == reduced
}

/// Sign `payload` and wrap it in a signed container
///
/// Only the public half of `keypair` is written into the container.
pub fn sign_document(
    payload: &[u8],
    keypair: &KeyPair,
    user: &str,
    timestamp: &str,
) -> (Vec<u8>, SignatureOutput) {
    let output = sign(payload, &keypair.private);

    let record = SignatureRecord {
        user: user.to_string(),
        timestamp: timestamp.to_string(),
        digest_hex: output.digest.hex.clone(),
        signature: output.signature.clone(),
        public_key: keypair.public.clone(),
    };

    (container::encode(payload, &record), output)
}

/// Outcome of checking a signed container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verification {
    pub record: SignatureRecord,
    /// digest of the recovered payload
    pub digest: FileDigest,
    /// recomputed digest equals the recorded File Hash
    pub hash_matches: bool,
    pub signature_valid: bool,
    /// the embedded public key is the trusted one (always true without a trusted key)
    pub key_matches: bool,
}

impl Verification {
    pub fn is_authentic(&self) -> bool {
        self.hash_matches && self.signature_valid && self.key_matches
    }

    /// Human readable outcome
    pub fn reason(&self) -> &'static str {
        if !self.key_matches {
            "file was signed with a different public key"
        } else if !self.signature_valid {
            "signature does not match the file contents"
        } else if !self.hash_matches {
            "recorded file hash does not match the file contents"
        } else {
            "file is authentic"
        }
    }
}

/// Decode `container` and check its payload against the embedded signature
///
/// With a `trusted` key the signature is checked against that key instead of the
/// one the container claims.
pub fn verify_document(container: &[u8], trusted: Option<&PublicKey>) -> Result<Verification> {
    let decoded = container::decode(container)?;
    let record = decoded.record;

    let digest = digest(decoded.payload);
    let hash_matches = digest.hex.eq_ignore_ascii_case(&record.digest_hex);

    let key = trusted.unwrap_or(&record.public_key);
    let signature_valid = verify_digest(&digest, &record.signature, key);
    let key_matches = trusted.map_or(true, |trusted| *trusted == record.public_key);

    Ok(Verification {
        record,
        digest,
        hash_matches,
        signature_valid,
        key_matches,
    })
}
