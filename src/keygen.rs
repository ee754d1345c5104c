//! RSA key generation
//!
//! Choose two distinct primes, `p` and `q`, uniformly from the primes of a
//! configurable range `[low, high)`.
//!
//! Derive `n`, the modulus, such that `n` = `p` * `q`.
//!
//! Calculate Euler's totient of `n`: `φ(n)` = `(p-1)` × `(q-1)`.
//!
//! Choose a public exponent `e` coprime to `φ(n)`. `2^16 + 1` is preferred; when it
//! shares a factor with `φ(n)` the smallest odd candidate >= 3 that doesn't is used.
//!
//! Calculate the private exponent `d`, such that (`d` * `e`) mod `φ(n)` = 1, by extended Euclidean algorithm.
//!
//! We end up with:
//!   - Pubkey: (e, n)
//!   - Privkey: (d, n)

use crate::error::{Error, Result};
use crate::math::{gcd, is_prime, mod_inverse};

use num_bigint::BigUint;
use num_traits::identities::One;
use rand::seq::SliceRandom;
use rand::{thread_rng, Rng};
use std::fmt::{self, Debug, Display, Formatter};

/// usually defined as 2^16 + 1
pub const DEFAULT_PUBLIC_EXPONENT: u32 = 65537;

/// Largest accepted upper bound of a `PrimeRange`
///
/// Every candidate is tested by trial division, so listing the primes below
/// 2^22 already takes on the order of a second.
pub const MAX_PRIME_BOUND: u64 = 1 << 22;

/// Half-open range `[low, high)` the primes `p` and `q` are drawn from
///
/// `high` is capped at `MAX_PRIME_BOUND`: all primes of the range are listed up
/// front by trial division.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrimeRange {
    low: u64,
    high: u64,
}

impl PrimeRange {
    pub fn new(low: u64, high: u64) -> Result<Self> {
        if low >= high {
            return Err(Error::InvalidPrimeRange { low, high });
        }
        if high > MAX_PRIME_BOUND {
            return Err(Error::PrimeRangeTooLarge {
                high,
                max: MAX_PRIME_BOUND,
            });
        }
        Ok(Self { low, high })
    }

    pub fn low(&self) -> u64 {
        self.low
    }

    pub fn high(&self) -> u64 {
        self.high
    }

    /// Every prime in the range, ascending
    pub fn primes(&self) -> Vec<u64> {
        (self.low..self.high).filter(|&n| is_prime(n)).collect()
    }
}

impl Default for PrimeRange {
    fn default() -> Self {
        Self { low: 200, high: 500 }
    }
}

/// (e, n)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PublicKey {
    pub e: BigUint,
    pub n: BigUint,
}

/// (d, n)
#[derive(Clone, PartialEq, Eq)]
pub struct PrivateKey {
    pub d: BigUint,
    pub n: BigUint,
}

// keeps `d` out of logs and panic messages
impl Debug for PrivateKey {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.debug_struct("PrivateKey")
            .field("d", &"<redacted>")
            .field("n", &self.n)
            .finish()
    }
}

impl Display for PublicKey {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "({}, {})", self.e, self.n)
    }
}

impl Display for PrivateKey {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "({}, {})", self.d, self.n)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPair {
    pub public: PublicKey,
    pub private: PrivateKey,
}

impl KeyPair {
    pub fn into_parts(self) -> (PublicKey, PrivateKey) {
        (self.public, self.private)
    }
}

impl Display for KeyPair {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        writeln!(f, "KeyPair {{")?;
        writeln!(f, "\tn: {},", self.public.n)?;
        writeln!(f, "\te: {},", self.public.e)?;
        writeln!(f, "\td: {},", self.private.d)?;
        write!(f, "}}")
    }
}

/// Generate a `KeyPair` from primes drawn out of `range`
pub fn generate_keypair(range: &PrimeRange) -> Result<KeyPair> {
    generate_keypair_with(range, &mut thread_rng())
}

/// Same as `generate_keypair`, with a caller supplied source of randomness
pub fn generate_keypair_with<R: Rng + ?Sized>(range: &PrimeRange, rng: &mut R) -> Result<KeyPair> {
    let primes = range.primes();
    if primes.len() < 2 {
        return Err(Error::NotEnoughPrimes {
            low: range.low,
            high: range.high,
        });
    }

    let p = pick(&primes, rng)?;
    // the range holds at least two primes, so this terminates
    let q = loop {
        let q = pick(&primes, rng)?;
        if q != p {
            break q;
        }
    };

    derive_keypair(p, q)
}

fn pick<R: Rng + ?Sized>(primes: &[u64], rng: &mut R) -> Result<u64> {
    primes
        .choose(rng)
        .copied()
        .ok_or_else(|| Error::KeyGenerationFailed("empty prime list".into()))
}

/// Derive the `KeyPair` for two distinct primes
pub fn derive_keypair(p: u64, q: u64) -> Result<KeyPair> {
    if p == q {
        return Err(Error::KeyGenerationFailed(format!("p and q are both {p}")));
    }
    if !is_prime(p) || !is_prime(q) {
        return Err(Error::KeyGenerationFailed(format!(
            "{p} and {q} must both be prime"
        )));
    }

    let (p, q) = (BigUint::from(p), BigUint::from(q));
    let n = &p * &q;

    // `φ(n)` = `(p-1)` × `(q-1)`
    let phi_n = (p - BigUint::one()) * (q - BigUint::one());

    let e = choose_public_exponent(&phi_n);

    // `d` is the modular inverse of `e` mod `phi_n`
    let d = mod_inverse(&e, &phi_n).map_err(|err| {
        Error::KeyGenerationFailed(format!("failed to compute `d`: {err}"))
    })?;

    Ok(KeyPair {
        public: PublicKey { e, n: n.clone() },
        private: PrivateKey { d, n },
    })
}

/// `DEFAULT_PUBLIC_EXPONENT` if it's coprime to `phi_n`, otherwise the smallest
/// odd number >= 3 that is.
///
/// Any prime larger than `phi_n` is coprime to it, so the scan always ends.
pub fn choose_public_exponent(phi_n: &BigUint) -> BigUint {
    let preferred = BigUint::from(DEFAULT_PUBLIC_EXPONENT);
    if gcd(&preferred, phi_n).is_one() {
        return preferred;
    }

    let two = BigUint::from(2u32);
    let mut e = BigUint::from(3u32);
    while !gcd(&e, phi_n).is_one() {
        e += &two;
    }

    e
}
