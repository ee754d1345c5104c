//! Error type shared by every module of the crate

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// gcd(a, m) != 1, so `a` has no inverse modulo `m`
    #[error("no modular inverse exists")]
    NoModularInverse,

    #[error("key generation failed: {0}")]
    KeyGenerationFailed(String),

    #[error("invalid prime range [{low}, {high})")]
    InvalidPrimeRange { low: u64, high: u64 },

    #[error("prime range upper bound {high} exceeds {max}")]
    PrimeRangeTooLarge { high: u64, max: u64 },

    #[error("prime range [{low}, {high}) holds fewer than two primes")]
    NotEnoughPrimes { low: u64, high: u64 },

    #[error("no signature found")]
    NoSignatureFound,

    #[error("malformed signature metadata: {0}")]
    MalformedMetadata(String),

    #[error("key store: {0}")]
    KeyStore(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
