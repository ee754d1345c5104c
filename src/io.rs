//! I/O operations
//!
//! Read/Write Keys
//! Sign a file into a signed container
//! Verify a signed container
//! Extract the original payload from a signed container

use crate::container::{self, SignatureRecord, SignedContainer};
use crate::error::{Error, Result};
use crate::keygen::{KeyPair, PrivateKey, PublicKey};
use crate::sig::{sign_document, verify_document, SignatureOutput, Verification};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use num_bigint::BigUint;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const FILE_PUBKEY: &str = "public.pem";
pub const FILE_PRIVKEY: &str = "private.pem";

const LABEL_PUBKEY: &str = "RSA PUBLIC KEY";
const LABEL_PRIVKEY: &str = "RSA PRIVATE KEY";

const SIGNED_EXTENSION: &str = "signed";

/// Where keypairs live between runs
pub trait KeyStore {
    fn save(&self, keypair: &KeyPair) -> Result<()>;
    fn load(&self) -> Result<KeyPair>;
}

/// `public.pem` and `private.pem` inside a directory
#[derive(Debug, Clone)]
pub struct PemKeyStore {
    dir: PathBuf,
}

impl PemKeyStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Only the public key, for callers that just verify
    pub fn load_public(&self) -> Result<PublicKey> {
        let pem = fs::read_to_string(self.dir.join(FILE_PUBKEY))?;
        let (e, n) = decode_pem(&pem, LABEL_PUBKEY)?;
        checked_modulus(&n)?;

        Ok(PublicKey { e, n })
    }
}

impl KeyStore for PemKeyStore {
    fn save(&self, keypair: &KeyPair) -> Result<()> {
        // Create directory if it doesn't exist
        fs::create_dir_all(&self.dir)?;

        // pubkey (e, n)
        let pub_pem = encode_pem(LABEL_PUBKEY, &keypair.public.e, &keypair.public.n);
        fs::write(self.dir.join(FILE_PUBKEY), pub_pem)?;

        // privkey (d, n)
        let priv_pem = encode_pem(LABEL_PRIVKEY, &keypair.private.d, &keypair.private.n);
        fs::write(self.dir.join(FILE_PRIVKEY), priv_pem)?;

        info!(dir = %self.dir.display(), "keypair saved");
        Ok(())
    }

    fn load(&self) -> Result<KeyPair> {
        let public = self.load_public()?;

        let priv_pem = fs::read_to_string(self.dir.join(FILE_PRIVKEY))?;
        let (d, n) = decode_pem(&priv_pem, LABEL_PRIVKEY)?;

        if n != public.n {
            return Err(Error::KeyStore(
                "public and private key moduli differ".into(),
            ));
        }

        debug!(dir = %self.dir.display(), bits = n.bits(), "keypair loaded");
        Ok(KeyPair {
            public,
            private: PrivateKey { d, n },
        })
    }
}

fn checked_modulus(n: &BigUint) -> Result<()> {
    if *n < BigUint::from(2u32) {
        return Err(Error::KeyStore("modulus must be at least 2".into()));
    }
    Ok(())
}

/// PEM block whose body is `len(exponent) || exponent || len(n) || n`,
/// lengths as 4 byte big-endian
fn encode_pem(label: &str, exponent: &BigUint, n: &BigUint) -> String {
    let mut data = Vec::new();
    for value in [exponent, n] {
        let bytes = value.to_bytes_be();
        data.extend((bytes.len() as u32).to_be_bytes());
        data.extend(bytes);
    }

    let b64 = STANDARD.encode(&data);
    let body = b64
        .as_bytes()
        .chunks(64)
        .map(|chunk| String::from_utf8_lossy(chunk))
        .collect::<Vec<_>>()
        .join("\n");

    format!("-----BEGIN {label}-----\n{body}\n-----END {label}-----\n")
}

fn decode_pem(pem: &str, label: &str) -> Result<(BigUint, BigUint)> {
    let begin = format!("-----BEGIN {label}-----");
    let end = format!("-----END {label}-----");

    let body = pem
        .lines()
        .map(str::trim)
        .skip_while(|line| *line != begin)
        .skip(1)
        .take_while(|line| *line != end)
        .collect::<String>();
    if body.is_empty() {
        return Err(Error::KeyStore(format!("no {label} block")));
    }

    let data = STANDARD
        .decode(body)
        .map_err(|err| Error::KeyStore(format!("invalid base64 in {label}: {err}")))?;

    let mut rest = data.as_slice();
    let exponent = take_field(&mut rest, label)?;
    let n = take_field(&mut rest, label)?;
    if !rest.is_empty() {
        return Err(Error::KeyStore(format!("trailing bytes in {label}")));
    }

    Ok((exponent, n))
}

fn take_field(rest: &mut &[u8], label: &str) -> Result<BigUint> {
    let truncated = || Error::KeyStore(format!("truncated {label}"));

    let data = *rest;
    if data.len() < 4 {
        return Err(truncated());
    }

    let (len, tail) = data.split_at(4);
    let len = u32::from_be_bytes([len[0], len[1], len[2], len[3]]) as usize;
    if tail.len() < len {
        return Err(truncated());
    }

    let (field, tail) = tail.split_at(len);
    *rest = tail;

    Ok(BigUint::from_bytes_be(field))
}

/// `<path>.signed`
pub fn signed_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".");
    name.push(SIGNED_EXTENSION);
    PathBuf::from(name)
}

/// Read `input`, sign it and write the signed container to `output`
pub fn sign_file(
    input: &Path,
    output: &Path,
    keypair: &KeyPair,
    user: &str,
    timestamp: &str,
) -> Result<SignatureOutput> {
    let payload = fs::read(input)?;
    debug!(path = %input.display(), bytes = payload.len(), "signing file");

    if !container::decodes_intact(&payload) {
        warn!(
            path = %input.display(),
            "file already contains the signature marker, the signed copy will not decode back intact"
        );
    }

    let (signed, signature) = sign_document(&payload, keypair, user, timestamp);
    fs::write(output, signed)?;

    info!(
        path = %output.display(),
        hash = %signature.digest,
        signature = %signature.signature,
        "file signed"
    );
    Ok(signature)
}

/// Verify the signed container at `path`
pub fn verify_file(path: &Path, trusted: Option<&PublicKey>) -> Result<Verification> {
    let signed = fs::read(path)?;
    debug!(path = %path.display(), bytes = signed.len(), "verifying file");

    let verification = verify_document(&signed, trusted)?;

    info!(
        path = %path.display(),
        authentic = verification.is_authentic(),
        reason = verification.reason(),
        "file verified"
    );
    Ok(verification)
}

/// Write the original payload of the signed container at `path` to `output`
pub fn extract_file(path: &Path, output: &Path) -> Result<SignatureRecord> {
    let signed = fs::read(path)?;
    let SignedContainer { payload, record } = container::decode(&signed)?;

    fs::write(output, payload)?;

    debug!(path = %output.display(), bytes = payload.len(), "payload extracted");
    Ok(record)
}
