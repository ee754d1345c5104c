//! Signed containers
//!
//! A signed container is the original file bytes, untouched, followed by a text
//! trailer describing the signature:
//!
//! ```text
//! <original bytes>
//!
//! ---DIGITAL SIGNATURE DATA---
//! User: alice
//! Timestamp: 2025-01-01 12:00:00
//! File Hash: ba7816bf...
//! Signature: 12345
//! Public Key: (65537, 104723)
//! ---END SIGNATURE DATA---
//! ```
//!
//! Decoding searches for the start marker as raw bytes, so any payload works,
//! binary or not. The first occurrence wins: a payload that already contains the
//! start marker, or ends with a prefix of it that the real marker completes, is
//! split at the wrong place. `decodes_intact` tells callers about that beforehand.

use crate::error::{Error, Result};
use crate::keygen::PublicKey;

use num_bigint::BigUint;

pub const START_MARKER: &str = "\n\n---DIGITAL SIGNATURE DATA---\n";
pub const END_MARKER: &str = "---END SIGNATURE DATA---\n";

pub const DEFAULT_USER: &str = "Anonymous";
pub const DEFAULT_TIMESTAMP: &str = "Unknown";

const KEY_USER: &str = "User";
const KEY_TIMESTAMP: &str = "Timestamp";
const KEY_FILE_HASH: &str = "File Hash";
const KEY_SIGNATURE: &str = "Signature";
const KEY_PUBLIC_KEY: &str = "Public Key";

/// Everything the trailer carries
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureRecord {
    pub user: String,
    pub timestamp: String,
    pub digest_hex: String,
    pub signature: BigUint,
    pub public_key: PublicKey,
}

/// A decoded container: the payload is borrowed from the container bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedContainer<'a> {
    pub payload: &'a [u8],
    pub record: SignatureRecord,
}

/// Append the trailer for `record` to `payload`
///
/// Line breaks inside `user` and `timestamp` become spaces so every field stays on
/// its own line.
pub fn encode(payload: &[u8], record: &SignatureRecord) -> Vec<u8> {
    let trailer = format!(
        "{START_MARKER}\
         {KEY_USER}: {}\n\
         {KEY_TIMESTAMP}: {}\n\
         {KEY_FILE_HASH}: {}\n\
         {KEY_SIGNATURE}: {}\n\
         {KEY_PUBLIC_KEY}: ({}, {})\n\
         {END_MARKER}",
        single_line(&record.user),
        single_line(&record.timestamp),
        single_line(&record.digest_hex),
        record.signature,
        record.public_key.e,
        record.public_key.n,
    );

    let mut container = Vec::with_capacity(payload.len() + trailer.len());
    container.extend_from_slice(payload);
    container.extend_from_slice(trailer.as_bytes());

    container
}

fn single_line(value: &str) -> String {
    value.replace("\r\n", " ").replace(['\r', '\n'], " ")
}

/// Split `container` at the first start marker and parse the trailer
pub fn decode(container: &[u8]) -> Result<SignedContainer<'_>> {
    let at = find_marker(container).ok_or(Error::NoSignatureFound)?;
    let payload = &container[..at];
    let trailer = &container[at + START_MARKER.len()..];

    let trailer = std::str::from_utf8(trailer)
        .map_err(|_| Error::MalformedMetadata("trailer is not valid UTF-8".into()))?;

    let record = parse_trailer(trailer)?;

    Ok(SignedContainer { payload, record })
}

/// Whether `bytes` holds a copy of the start marker
pub fn contains_marker(bytes: &[u8]) -> bool {
    find_marker(bytes).is_some()
}

/// Whether `encode(payload, ..)` splits back exactly at `payload.len()`
///
/// Stricter than `contains_marker`: it also catches a payload whose tail plus the
/// start of the appended marker forms a complete marker.
pub fn decodes_intact(payload: &[u8]) -> bool {
    let marker = START_MARKER.as_bytes();
    // only the last marker.len() - 1 bytes can overlap the appended marker
    let tail = &payload[payload.len().saturating_sub(marker.len() - 1)..];

    !contains_marker(payload) && find_marker(&[tail, marker].concat()) == Some(tail.len())
}

fn find_marker(bytes: &[u8]) -> Option<usize> {
    let marker = START_MARKER.as_bytes();
    bytes.windows(marker.len()).position(|window| window == marker)
}

#[derive(Default)]
struct Fields<'a> {
    user: Option<&'a str>,
    timestamp: Option<&'a str>,
    file_hash: Option<&'a str>,
    signature: Option<&'a str>,
    public_key: Option<&'a str>,
}

fn parse_trailer(trailer: &str) -> Result<SignatureRecord> {
    let mut fields = Fields::default();

    for line in trailer.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == END_MARKER.trim_end() {
            break;
        }

        let (key, value) = line
            .split_once(':')
            .ok_or_else(|| malformed(format!("line without a key: {line:?}")))?;
        let (key, value) = (key.trim(), value.trim());

        let slot = match key {
            KEY_USER => &mut fields.user,
            KEY_TIMESTAMP => &mut fields.timestamp,
            KEY_FILE_HASH => &mut fields.file_hash,
            KEY_SIGNATURE => &mut fields.signature,
            KEY_PUBLIC_KEY => &mut fields.public_key,
            // unknown keys are ignored
            _ => continue,
        };
        if slot.replace(value).is_some() {
            return Err(malformed(format!("duplicate {key:?}")));
        }
    }

    let digest_hex = parse_hex(required(fields.file_hash, KEY_FILE_HASH)?)?;
    let signature = parse_decimal(required(fields.signature, KEY_SIGNATURE)?)
        .ok_or_else(|| malformed(format!("{KEY_SIGNATURE} is not a decimal integer")))?;
    let public_key = parse_public_key(required(fields.public_key, KEY_PUBLIC_KEY)?)?;

    Ok(SignatureRecord {
        user: fields.user.unwrap_or(DEFAULT_USER).to_string(),
        timestamp: fields.timestamp.unwrap_or(DEFAULT_TIMESTAMP).to_string(),
        digest_hex,
        signature,
        public_key,
    })
}

fn malformed(reason: String) -> Error {
    Error::MalformedMetadata(reason)
}

fn required<'a>(value: Option<&'a str>, key: &str) -> Result<&'a str> {
    value.ok_or_else(|| malformed(format!("missing {key:?}")))
}

fn parse_hex(value: &str) -> Result<String> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(malformed(format!("{KEY_FILE_HASH} is not a hex string")));
    }
    Ok(value.to_string())
}

/// Only plain ASCII digits: no sign, no separators
fn parse_decimal(value: &str) -> Option<BigUint> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    BigUint::parse_bytes(value.as_bytes(), 10)
}

/// `(e, n)`
fn parse_public_key(value: &str) -> Result<PublicKey> {
    let invalid = || malformed(format!("{KEY_PUBLIC_KEY} is not an (e, n) pair"));

    let inner = value
        .strip_prefix('(')
        .and_then(|rest| rest.strip_suffix(')'))
        .ok_or_else(invalid)?;
    let (e, n) = inner.split_once(',').ok_or_else(invalid)?;

    let e = parse_decimal(e.trim()).ok_or_else(invalid)?;
    let n = parse_decimal(n.trim()).ok_or_else(invalid)?;
    if n < BigUint::from(2u32) {
        return Err(malformed(format!("{KEY_PUBLIC_KEY} modulus must be at least 2")));
    }

    Ok(PublicKey { e, n })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> SignatureRecord {
        SignatureRecord {
            user: "alice".into(),
            timestamp: "2025-01-01 12:00:00".into(),
            digest_hex: "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824".into(),
            signature: BigUint::from(12345u32),
            public_key: PublicKey {
                e: BigUint::from(65537u32),
                n: BigUint::from(104723u32),
            },
        }
    }

    fn container_with(payload: &[u8], lines: &str) -> Vec<u8> {
        let mut container = payload.to_vec();
        container.extend_from_slice(START_MARKER.as_bytes());
        container.extend_from_slice(lines.as_bytes());
        container
    }

    #[test]
    fn test_encode_layout() {
        let container = encode(b"hello", &record());
        let expected = "hello\n\n---DIGITAL SIGNATURE DATA---\n\
                        User: alice\n\
                        Timestamp: 2025-01-01 12:00:00\n\
                        File Hash: 2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824\n\
                        Signature: 12345\n\
                        Public Key: (65537, 104723)\n\
                        ---END SIGNATURE DATA---\n";
        assert_eq!(String::from_utf8(container).unwrap(), expected);
    }

    #[test]
    fn test_decode_hand_written_container() {
        let container = container_with(
            b"hello",
            "User: bob\n\
             Timestamp: yesterday\n\
             File Hash: abc123\n\
             Signature: 12345\n\
             Public Key: (65537, 104723)\n\
             ---END SIGNATURE DATA---\n",
        );

        let decoded = decode(&container).unwrap();
        assert_eq!(decoded.payload, b"hello");
        assert_eq!(decoded.record.signature, BigUint::from(12345u32));
        assert_eq!(decoded.record.digest_hex, "abc123");
        assert_eq!(decoded.record.user, "bob");
        assert_eq!(decoded.record.timestamp, "yesterday");
        assert_eq!(
            decoded.record.public_key,
            PublicKey {
                e: BigUint::from(65537u32),
                n: BigUint::from(104723u32),
            }
        );
    }

    #[test]
    fn test_round_trip_binary_payloads() {
        let payloads: Vec<Vec<u8>> = vec![
            Vec::new(),
            b"hello".to_vec(),
            (0..=255u8).collect(),
            vec![0xff, 0xfe, 0x00, 0x0a, 0x0a, 0x2d, 0x2d, 0x2d],
            b"ends with newlines\n\n".to_vec(),
            b"---DIGITAL SIGNATURE DATA---".to_vec(),
            b"\r\n\r\n---DIGITAL SIGNATURE DATA---\r\n".to_vec(),
        ];

        for payload in payloads {
            let container = encode(&payload, &record());
            let decoded = decode(&container).unwrap();
            assert_eq!(decoded.payload, &payload[..]);
            assert_eq!(decoded.record, record());
        }
    }

    #[test]
    fn test_no_signature_found() {
        assert!(matches!(decode(b"plain file"), Err(Error::NoSignatureFound)));
        assert!(matches!(decode(b""), Err(Error::NoSignatureFound)));
        assert!(matches!(
            decode(b"---DIGITAL SIGNATURE DATA---\nSignature: 1\n"),
            Err(Error::NoSignatureFound)
        ));
    }

    #[test]
    fn test_missing_required_fields() {
        let cases = [
            "File Hash: ab\nPublic Key: (3, 33)\n",
            "Signature: 1\nPublic Key: (3, 33)\n",
            "Signature: 1\nFile Hash: ab\n",
        ];
        for lines in cases {
            assert!(matches!(
                decode(&container_with(b"x", lines)),
                Err(Error::MalformedMetadata(_))
            ));
        }
    }

    #[test]
    fn test_malformed_fields() {
        let cases = [
            "Signature: twelve\nFile Hash: ab\nPublic Key: (3, 33)\n",
            "Signature: -1\nFile Hash: ab\nPublic Key: (3, 33)\n",
            "Signature: 1_000\nFile Hash: ab\nPublic Key: (3, 33)\n",
            "Signature: 1\nFile Hash: xyz\nPublic Key: (3, 33)\n",
            "Signature: 1\nFile Hash:\nPublic Key: (3, 33)\n",
            "Signature: 1\nFile Hash: ab\nPublic Key: 3, 33\n",
            "Signature: 1\nFile Hash: ab\nPublic Key: (3)\n",
            "Signature: 1\nFile Hash: ab\nPublic Key: (3, 33, 5)\n",
            "Signature: 1\nFile Hash: ab\nPublic Key: (3, 1)\n",
            "Signature: 1\nSignature: 2\nFile Hash: ab\nPublic Key: (3, 33)\n",
            "Signature: 1\nFile Hash: ab\nPublic Key: (3, 33)\nno colon here\n",
        ];
        for lines in cases {
            assert!(
                matches!(
                    decode(&container_with(b"x", lines)),
                    Err(Error::MalformedMetadata(_))
                ),
                "{lines:?}"
            );
        }
    }

    #[test]
    fn test_trailer_must_be_utf8() {
        let mut container = container_with(b"x", "Signature: 1\n");
        container.extend_from_slice(&[0xff, 0xfe]);
        assert!(matches!(
            decode(&container),
            Err(Error::MalformedMetadata(_))
        ));
    }

    #[test]
    fn test_defaults_and_unknown_keys() {
        let container = container_with(
            b"x",
            "Comment: signed: twice\n\
             \n\
             Signature: 7\n\
             File Hash: ABCDEF\n\
             Public Key:   ( 3 ,  33 )  \n",
        );

        let record = decode(&container).unwrap().record;
        assert_eq!(record.user, DEFAULT_USER);
        assert_eq!(record.timestamp, DEFAULT_TIMESTAMP);
        assert_eq!(record.digest_hex, "ABCDEF");
        assert_eq!(record.signature, BigUint::from(7u32));
        assert_eq!(record.public_key.e, BigUint::from(3u32));
        assert_eq!(record.public_key.n, BigUint::from(33u32));
    }

    #[test]
    fn test_values_split_on_first_colon() {
        let container = container_with(
            b"x",
            "User: mallory: the admin\n\
             Timestamp: 12:30:00\n\
             Signature: 7\n\
             File Hash: ab\n\
             Public Key: (3, 33)\n",
        );

        let record = decode(&container).unwrap().record;
        assert_eq!(record.user, "mallory: the admin");
        assert_eq!(record.timestamp, "12:30:00");
    }

    #[test]
    fn test_lines_after_end_marker_are_ignored() {
        let container = container_with(
            b"x",
            "Signature: 7\n\
             File Hash: ab\n\
             Public Key: (3, 33)\n\
             ---END SIGNATURE DATA---\n\
             Signature: not even a number\n",
        );
        assert_eq!(
            decode(&container).unwrap().record.signature,
            BigUint::from(7u32)
        );
    }

    #[test]
    fn test_line_breaks_in_fields_are_normalized() {
        let mut record = record();
        record.user = "line one\r\nline two\rthree\nfour".into();

        let container = encode(b"payload", &record);
        let decoded = decode(&container).unwrap();
        assert_eq!(decoded.record.user, "line one line two three four");
        assert_eq!(decoded.record.signature, record.signature);
    }

    #[test]
    fn test_crlf_trailer_lines_are_accepted() {
        let container = container_with(
            b"x",
            "Signature: 7\r\nFile Hash: ab\r\nPublic Key: (3, 33)\r\n---END SIGNATURE DATA---\r\n",
        );
        assert_eq!(
            decode(&container).unwrap().record.public_key.n,
            BigUint::from(33u32)
        );
    }

    #[test]
    fn test_embedded_marker_splits_at_first_occurrence() {
        let payload = [b"before".as_slice(), START_MARKER.as_bytes(), b"after"].concat();
        assert!(contains_marker(&payload));
        assert!(!contains_marker(b"clean payload"));

        // the split happens inside the payload, and "after" is not a key: value line
        let container = encode(&payload, &record());
        assert!(matches!(
            decode(&container),
            Err(Error::MalformedMetadata(_))
        ));
    }

    #[test]
    fn test_payload_ending_in_partial_marker() {
        let payload = b"report\n\n---DIGITAL SIGNATURE DATA---";
        assert!(!contains_marker(payload));
        assert!(!decodes_intact(payload));

        // the payload's tail and the appended "\n" complete a marker
        let container = encode(payload, &record());
        assert!(matches!(
            decode(&container),
            Err(Error::MalformedMetadata(_))
        ));

        let before = [b"before".as_slice(), START_MARKER.as_bytes()].concat();
        assert!(!decodes_intact(&before));
    }

    #[test]
    fn test_decodes_intact_for_ordinary_payloads() {
        let payloads: [&[u8]; 5] = [
            b"",
            b"\n",
            b"hello\n\n",
            b"notes\n\n---",
            b"\r\n\r\n---DIGITAL SIGNATURE DATA---\r\n",
        ];
        for payload in payloads {
            assert!(decodes_intact(payload), "{payload:?}");
            let container = encode(payload, &record());
            assert_eq!(decode(&container).unwrap().payload, payload);
        }
    }
}
