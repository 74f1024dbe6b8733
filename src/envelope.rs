//! Binary envelope framing for sealed blobs
//!
//! The wire layout is fixed and self-describing:
//!
//! - magic: 4 bytes, `b"SBOX"`
//! - version: 1 byte
//! - compression algorithm id: 1 byte
//! - cipher algorithm id: 1 byte
//! - KDF algorithm id: 1 byte
//! - KDF iterations: 4 bytes (big-endian u32)
//! - salt length: 1 byte, followed by the salt (16 bytes)
//! - nonce length: 1 byte, followed by the nonce (12 bytes)
//! - ciphertext length: 8 bytes (big-endian u64), followed by the ciphertext
//! - authentication tag: 16 bytes
//!
//! All multi-byte integers are big-endian so blobs are byte-identical across
//! platforms. Parsing validates structure in full and fails before any
//! cryptographic work is attempted on a malformed blob.

use crate::cipher::{EncryptionAlgorithm, NONCE_LEN, TAG_LEN};
use crate::compress::CompressionAlgorithm;
use crate::error::{ErrorCategory, ErrorKind, Result, SealboxError};
use crate::kdf::{KdfAlgorithm, MAX_ITERATIONS, MIN_ITERATIONS, SALT_LEN};

/// Identifies the sealed-blob format.
pub const MAGIC: [u8; 4] = *b"SBOX";

/// Format version produced and understood by this implementation.
pub const VERSION: u8 = 1;

/// Fixed-size fields preceding the salt length byte.
const FIXED_PREFIX_LEN: usize = 4 + 1 + 1 + 1 + 1 + 4;

/// Smallest structurally possible blob: empty ciphertext, all fixed fields.
pub const MIN_BLOB_LEN: usize =
    FIXED_PREFIX_LEN + 1 + SALT_LEN + 1 + NONCE_LEN + 8 + TAG_LEN;

/// A parsed (or to-be-serialized) sealed blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub compression: CompressionAlgorithm,
    pub cipher: EncryptionAlgorithm,
    pub kdf: KdfAlgorithm,
    pub iterations: u32,
    pub salt: [u8; SALT_LEN],
    pub nonce: [u8; NONCE_LEN],
    pub ciphertext: Vec<u8>,
    pub tag: [u8; TAG_LEN],
}

impl Envelope {
    /// Serializes the header fields up to and including the nonce.
    ///
    /// This prefix doubles as the AEAD associated data: it is the exact byte
    /// sequence the sealing side authenticated, so `open` reconstructs it
    /// from the parsed fields and any header alteration breaks the tag.
    pub fn header_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(FIXED_PREFIX_LEN + 1 + SALT_LEN + 1 + NONCE_LEN);
        out.extend_from_slice(&MAGIC);
        out.push(VERSION);
        out.push(self.compression.wire_id());
        out.push(self.cipher.wire_id());
        out.push(self.kdf.wire_id());
        out.extend_from_slice(&self.iterations.to_be_bytes());
        out.push(SALT_LEN as u8);
        out.extend_from_slice(&self.salt);
        out.push(NONCE_LEN as u8);
        out.extend_from_slice(&self.nonce);
        out
    }

    /// Serializes the complete blob.
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = self.header_bytes();
        out.reserve(8 + self.ciphertext.len() + TAG_LEN);
        out.extend_from_slice(&(self.ciphertext.len() as u64).to_be_bytes());
        out.extend_from_slice(&self.ciphertext);
        out.extend_from_slice(&self.tag);
        out
    }

    /// Parses and validates a blob.
    ///
    /// Validation order: overall length, magic, version, algorithm ids,
    /// iteration range, declared salt/nonce lengths, declared ciphertext
    /// length against the actual remaining bytes. Every violation is a
    /// `MalformedEnvelope`; nothing cryptographic runs on a blob that fails
    /// here.
    pub fn parse(blob: &[u8]) -> Result<Envelope> {
        if blob.len() < MIN_BLOB_LEN {
            return Err(malformed(
                "input shorter than the smallest possible sealed blob; likely truncated",
            ));
        }

        let mut pos = 0;

        if blob[pos..pos + 4] != MAGIC {
            return Err(malformed("input unrecognized as a sealed blob (bad magic)"));
        }
        pos += 4;

        let version = blob[pos];
        pos += 1;
        if version != VERSION {
            return Err(malformed(format!(
                "input claims to be a sealed blob, but version {} is not supported",
                version
            )));
        }

        let compression = CompressionAlgorithm::from_wire_id(blob[pos])
            .ok_or_else(|| malformed(format!("unknown compression algorithm id {}", blob[pos])))?;
        pos += 1;

        let cipher = EncryptionAlgorithm::from_wire_id(blob[pos])
            .ok_or_else(|| malformed(format!("unknown cipher algorithm id {}", blob[pos])))?;
        pos += 1;

        let kdf = KdfAlgorithm::from_wire_id(blob[pos])
            .ok_or_else(|| malformed(format!("unknown KDF algorithm id {}", blob[pos])))?;
        pos += 1;

        let iterations = u32::from_be_bytes(
            blob[pos..pos + 4]
                .try_into()
                .map_err(|_| malformed("failed to read iteration count"))?,
        );
        pos += 4;
        if !(MIN_ITERATIONS..=MAX_ITERATIONS).contains(&iterations) {
            return Err(malformed(format!(
                "KDF iteration count {} outside the accepted range",
                iterations
            )));
        }

        let salt_len = blob[pos] as usize;
        pos += 1;
        if salt_len != SALT_LEN {
            return Err(malformed(format!(
                "declared salt length {} does not match the {} bytes required by {}",
                salt_len,
                SALT_LEN,
                kdf.name()
            )));
        }
        let salt: [u8; SALT_LEN] = blob[pos..pos + SALT_LEN]
            .try_into()
            .map_err(|_| malformed("failed to read salt"))?;
        pos += SALT_LEN;

        let nonce_len = blob[pos] as usize;
        pos += 1;
        if nonce_len != cipher.nonce_len() {
            return Err(malformed(format!(
                "declared nonce length {} does not match the {} bytes required by {}",
                nonce_len,
                cipher.nonce_len(),
                cipher.name()
            )));
        }
        let nonce: [u8; NONCE_LEN] = blob[pos..pos + NONCE_LEN]
            .try_into()
            .map_err(|_| malformed("failed to read nonce"))?;
        pos += NONCE_LEN;

        let ciphertext_len = u64::from_be_bytes(
            blob[pos..pos + 8]
                .try_into()
                .map_err(|_| malformed("failed to read ciphertext length"))?,
        );
        pos += 8;

        // *Valid* input can fail this check if the platform's usize is
        // smaller than the declared length.
        if ciphertext_len > isize::MAX as u64 {
            return Err(malformed(
                "declared ciphertext length exceeds this system's max isize",
            ));
        }
        let ciphertext_len = ciphertext_len as usize;

        let remaining = blob.len() - pos;
        let expected = ciphertext_len
            .checked_add(TAG_LEN)
            .ok_or_else(|| malformed("declared ciphertext length overflows"))?;
        if remaining < expected {
            return Err(malformed(
                "truncated or corrupt input; declared ciphertext length greater than available input",
            ));
        }
        if remaining > expected {
            return Err(malformed("invalid input: unexpected data after the tag"));
        }

        let ciphertext = blob[pos..pos + ciphertext_len].to_vec();
        pos += ciphertext_len;

        let tag: [u8; TAG_LEN] = blob[pos..pos + TAG_LEN]
            .try_into()
            .map_err(|_| malformed("failed to read authentication tag"))?;

        Ok(Envelope {
            compression,
            cipher,
            kdf,
            iterations,
            salt,
            nonce,
            ciphertext,
            tag,
        })
    }
}

fn malformed(msg: impl Into<String>) -> SealboxError {
    SealboxError::with_kind(ErrorCategory::User, ErrorKind::MalformedEnvelope, msg)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Envelope {
        Envelope {
            compression: CompressionAlgorithm::Zlib,
            cipher: EncryptionAlgorithm::Aes256Gcm,
            kdf: KdfAlgorithm::Pbkdf2HmacSha256,
            iterations: 100_000,
            salt: [0x11; SALT_LEN],
            nonce: [0x22; NONCE_LEN],
            ciphertext: vec![0xAA, 0xBB, 0xCC, 0xDD],
            tag: [0x33; TAG_LEN],
        }
    }

    #[test]
    fn test_serialize_parse_roundtrip() {
        let envelope = sample();
        let blob = envelope.serialize();
        let parsed = Envelope::parse(&blob).unwrap();
        assert_eq!(parsed, envelope);
    }

    #[test]
    fn test_roundtrip_empty_ciphertext() {
        let mut envelope = sample();
        envelope.ciphertext = Vec::new();
        let blob = envelope.serialize();
        assert_eq!(blob.len(), MIN_BLOB_LEN);
        let parsed = Envelope::parse(&blob).unwrap();
        assert_eq!(parsed, envelope);
    }

    #[test]
    fn test_exact_layout() {
        let envelope = sample();
        let blob = envelope.serialize();
        assert_eq!(&blob[0..4], b"SBOX");
        assert_eq!(blob[4], VERSION);
        assert_eq!(blob[5], CompressionAlgorithm::Zlib.wire_id());
        assert_eq!(blob[6], EncryptionAlgorithm::Aes256Gcm.wire_id());
        assert_eq!(blob[7], KdfAlgorithm::Pbkdf2HmacSha256.wire_id());
        assert_eq!(&blob[8..12], &100_000u32.to_be_bytes());
        assert_eq!(blob[12] as usize, SALT_LEN);
        assert_eq!(&blob[13..29], &[0x11; SALT_LEN]);
        assert_eq!(blob[29] as usize, NONCE_LEN);
        assert_eq!(&blob[30..42], &[0x22; NONCE_LEN]);
        assert_eq!(&blob[42..50], &4u64.to_be_bytes());
        assert_eq!(&blob[50..54], &[0xAA, 0xBB, 0xCC, 0xDD]);
        assert_eq!(&blob[54..70], &[0x33; TAG_LEN]);
        assert_eq!(blob.len(), 70);
    }

    #[test]
    fn test_header_bytes_is_blob_prefix() {
        let envelope = sample();
        let blob = envelope.serialize();
        let header = envelope.header_bytes();
        assert_eq!(&blob[..header.len()], &header[..]);
    }

    #[test]
    fn test_too_short_input() {
        let err = Envelope::parse(&[0x53, 0x42]).unwrap_err();
        assert_eq!(err.kind, Some(ErrorKind::MalformedEnvelope));
    }

    #[test]
    fn test_bad_magic() {
        let mut blob = sample().serialize();
        blob[0] = b'X';
        let err = Envelope::parse(&blob).unwrap_err();
        assert_eq!(err.kind, Some(ErrorKind::MalformedEnvelope));
        assert!(err.message().contains("bad magic"));
    }

    #[test]
    fn test_unsupported_version() {
        let mut blob = sample().serialize();
        blob[4] = 99;
        let err = Envelope::parse(&blob).unwrap_err();
        assert!(err.message().contains("version 99"));
    }

    #[test]
    fn test_unknown_compression_id() {
        let mut blob = sample().serialize();
        blob[5] = 200;
        let err = Envelope::parse(&blob).unwrap_err();
        assert!(err.message().contains("compression algorithm id 200"));
    }

    #[test]
    fn test_unknown_cipher_id() {
        let mut blob = sample().serialize();
        blob[6] = 0;
        let err = Envelope::parse(&blob).unwrap_err();
        assert!(err.message().contains("cipher algorithm id 0"));
    }

    #[test]
    fn test_unknown_kdf_id() {
        let mut blob = sample().serialize();
        blob[7] = 0;
        let err = Envelope::parse(&blob).unwrap_err();
        assert!(err.message().contains("KDF algorithm id 0"));
    }

    #[test]
    fn test_iteration_count_out_of_range() {
        let mut blob = sample().serialize();
        blob[8..12].copy_from_slice(&100u32.to_be_bytes());
        let err = Envelope::parse(&blob).unwrap_err();
        assert_eq!(err.kind, Some(ErrorKind::MalformedEnvelope));

        let mut blob = sample().serialize();
        blob[8..12].copy_from_slice(&u32::MAX.to_be_bytes());
        let err = Envelope::parse(&blob).unwrap_err();
        assert_eq!(err.kind, Some(ErrorKind::MalformedEnvelope));
    }

    #[test]
    fn test_wrong_salt_length() {
        let mut blob = sample().serialize();
        blob[12] = 8;
        let err = Envelope::parse(&blob).unwrap_err();
        assert!(err.message().contains("salt length"));
    }

    #[test]
    fn test_wrong_nonce_length() {
        let mut blob = sample().serialize();
        blob[29] = 24;
        let err = Envelope::parse(&blob).unwrap_err();
        assert!(err.message().contains("nonce length"));
    }

    #[test]
    fn test_declared_length_exceeds_input() {
        let mut blob = sample().serialize();
        blob[42..50].copy_from_slice(&1_000_000u64.to_be_bytes());
        let err = Envelope::parse(&blob).unwrap_err();
        assert!(err
            .message()
            .contains("declared ciphertext length greater than available input"));
    }

    #[test]
    fn test_trailing_data_rejected() {
        let mut blob = sample().serialize();
        blob.push(0xFF);
        let err = Envelope::parse(&blob).unwrap_err();
        assert!(err.message().contains("unexpected data after the tag"));
    }

    #[test]
    fn test_truncated_tag_rejected() {
        let blob = sample().serialize();
        let err = Envelope::parse(&blob[..blob.len() - 1]).unwrap_err();
        assert_eq!(err.kind, Some(ErrorKind::MalformedEnvelope));
    }

    #[test]
    fn test_huge_declared_length_rejected() {
        let mut blob = sample().serialize();
        blob[42..50].copy_from_slice(&u64::MAX.to_be_bytes());
        let err = Envelope::parse(&blob).unwrap_err();
        assert_eq!(err.kind, Some(ErrorKind::MalformedEnvelope));
    }
}
