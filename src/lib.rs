//! File signatures over textbook RSA
//!
//! A file is reduced to its SHA-256 digest, the digest is signed with a small RSA
//! key, and the signature travels inside the file itself as a text trailer.
//! This is a teaching protocol: no padding, tiny moduli, no key management.
//!
//! ```
//! use rsa_filesig::{container, derive_keypair, sign_document, verify_document};
//!
//! let keypair = derive_keypair(1_000_003, 999_983).unwrap();
//! let (signed, _) = sign_document(b"hello", &keypair, "alice", "2025-01-01 12:00:00");
//!
//! assert_eq!(container::decode(&signed).unwrap().payload, b"hello");
//! assert!(verify_document(&signed, Some(&keypair.public)).unwrap().is_authentic());
//! ```

pub mod container;
pub mod digest;
pub mod error;
pub mod io;
pub mod keygen;
pub mod math;
pub mod sig;

pub use container::{decode, encode, SignatureRecord, SignedContainer};
pub use digest::{digest, FileDigest};
pub use error::{Error, Result};
pub use keygen::{
    derive_keypair, generate_keypair, generate_keypair_with, KeyPair, PrimeRange, PrivateKey,
    PublicKey,
};
pub use sig::{sign, sign_document, verify, verify_document, SignatureOutput, Verification};
