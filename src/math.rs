//! Number theory primitives
//!
//! Everything the key generator, signer and verifier need:
//!   - primality by trial division (only ever run over small search ranges)
//!   - greatest common divisor, by the Euclidean algorithm
//!   - modular inverse, by the extended Euclidean algorithm
//!   - modular exponentiation, by repeated squaring

use crate::error::{Error, Result};

use num_bigint::{BigInt, BigUint};
use num_traits::identities::{One, Zero};

/// Deterministic trial division up to floor(sqrt(n))
pub fn is_prime(n: u64) -> bool {
    if n < 2 {
        return false;
    }

    let mut i = 2u64;
    // `i <= n / i` instead of `i * i <= n` so that `i * i` never overflows
    while i <= n / i {
        if n % i == 0 {
            return false;
        }
        i += 1;
    }

    true
}

/// Greatest Common Divisor
pub fn gcd(a: &BigUint, b: &BigUint) -> BigUint {
    let (mut a, mut b) = (a.clone(), b.clone());

    while !b.is_zero() {
        let r = &a % &b;
        a = b;
        b = r;
    }

    a
}

/// Modular inverse (a * a^-1 (mod m) = 1)
/// The result is normalized into [0, m)
pub fn mod_inverse(a: &BigUint, m: &BigUint) -> Result<BigUint> {
    if m.is_zero() {
        return Err(Error::NoModularInverse);
    }

    let (mut t, mut newt) = (BigInt::zero(), BigInt::one());
    let (mut r, mut newr) = (BigInt::from(m.clone()), BigInt::from(a.clone()));

    while !newr.is_zero() {
        let quotient = &r / &newr;

        let next_t = &t - &quotient * &newt;
        t = std::mem::replace(&mut newt, next_t);

        let next_r = &r - &quotient * &newr;
        r = std::mem::replace(&mut newr, next_r);
    }

    // `r` ends up as gcd(a, m)
    if !r.is_one() {
        return Err(Error::NoModularInverse);
    }

    let m = BigInt::from(m.clone());
    let t = ((t % &m) + &m) % &m;

    t.to_biguint().ok_or(Error::NoModularInverse)
}

/// base^exponent mod modulus, square-and-multiply over the bits of `exponent`
///
/// Every intermediate product is reduced before the next step, so nothing grows
/// past twice the width of `modulus`.
///
/// # Panics
///
/// If `modulus` is zero.
pub fn mod_pow(base: &BigUint, exponent: &BigUint, modulus: &BigUint) -> BigUint {
    if modulus.is_one() {
        return BigUint::zero();
    }

    let mut result = BigUint::one();
    let mut base = base % modulus;

    for bit in 0..exponent.bits() {
        if exponent.bit(bit) {
            result = (&result * &base) % modulus;
        }
        base = (&base * &base) % modulus;
    }

    result
}
