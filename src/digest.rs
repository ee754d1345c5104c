//! SHA-256 file digests
//!
//! A digest is kept in two forms: the lowercase hex string shown to users and
//! written into signed containers, and the same string read as a base-16
//! integer, which is what gets signed.

use num_bigint::BigUint;
use sha2::{Digest, Sha256};
use std::fmt::{Display, Formatter, Result};
use std::io::{self, Read};

const CHUNK_SIZE: usize = 4096;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileDigest {
    pub hex: String,
    pub value: BigUint,
}

impl FileDigest {
    fn from_hash(hash: &[u8]) -> Self {
        FileDigest {
            hex: to_hex(hash),
            value: BigUint::from_bytes_be(hash),
        }
    }
}

impl Display for FileDigest {
    fn fmt(&self, f: &mut Formatter) -> Result {
        f.write_str(&self.hex)
    }
}

/// Digest of an in-memory byte sequence
pub fn digest(bytes: &[u8]) -> FileDigest {
    FileDigest::from_hash(&Sha256::digest(bytes))
}

/// Digest of everything `reader` yields, read in 4 KiB chunks
pub fn digest_reader<R: Read>(mut reader: R) -> io::Result<FileDigest> {
    let mut hasher = Sha256::new();
    let mut buf = [0u8; CHUNK_SIZE];

    loop {
        let read = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(read) => read,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        };
        hasher.update(&buf[..read]);
    }

    Ok(FileDigest::from_hash(&hasher.finalize()))
}

pub fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
