//! Interchangeable AEAD ciphers
//!
//! Both supported ciphers take a 32-byte key and a 12-byte nonce and produce
//! a detached 16-byte authentication tag. Associated data binds the envelope
//! header into the tag, so swapped algorithm ids or altered parameters are
//! caught by verification and not just ciphertext edits.

use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Nonce};
use chacha20poly1305::ChaCha20Poly1305;

use crate::error::{ErrorCategory, ErrorKind, Result, SealboxError};

/// Key length in bytes, shared by both ciphers.
pub const KEY_LEN: usize = 32;

/// Nonce length in bytes, shared by both ciphers.
pub const NONCE_LEN: usize = 12;

/// Authentication tag length in bytes, shared by both ciphers.
pub const TAG_LEN: usize = 16;

/// AEAD ciphers understood by the envelope format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncryptionAlgorithm {
    Aes256Gcm,
    ChaCha20Poly1305,
}

impl EncryptionAlgorithm {
    /// The identifier stored in the envelope header.
    pub fn wire_id(self) -> u8 {
        match self {
            EncryptionAlgorithm::Aes256Gcm => 1,
            EncryptionAlgorithm::ChaCha20Poly1305 => 2,
        }
    }

    /// Resolves a header identifier back to an algorithm.
    pub fn from_wire_id(id: u8) -> Option<Self> {
        match id {
            1 => Some(EncryptionAlgorithm::Aes256Gcm),
            2 => Some(EncryptionAlgorithm::ChaCha20Poly1305),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            EncryptionAlgorithm::Aes256Gcm => "aes-256-gcm",
            EncryptionAlgorithm::ChaCha20Poly1305 => "chacha20-poly1305",
        }
    }

    pub fn key_len(self) -> usize {
        KEY_LEN
    }

    pub fn nonce_len(self) -> usize {
        NONCE_LEN
    }

    pub fn tag_len(self) -> usize {
        TAG_LEN
    }
}

/// Encrypt `plaintext`, returning the ciphertext and a detached tag.
///
/// The nonce must be fresh for every call with a given key; the orchestrator
/// guarantees this by generating both a fresh salt (hence a fresh key) and a
/// fresh nonce per seal.
pub fn encrypt(
    algorithm: EncryptionAlgorithm,
    key: &[u8; KEY_LEN],
    nonce: &[u8; NONCE_LEN],
    plaintext: &[u8],
    aad: &[u8],
) -> Result<(Vec<u8>, [u8; TAG_LEN])> {
    let payload = Payload {
        msg: plaintext,
        aad,
    };
    let mut sealed = match algorithm {
        EncryptionAlgorithm::Aes256Gcm => {
            let cipher = Aes256Gcm::new_from_slice(key).map_err(key_error)?;
            cipher.encrypt(Nonce::from_slice(nonce), payload)
        }
        EncryptionAlgorithm::ChaCha20Poly1305 => {
            let cipher = ChaCha20Poly1305::new_from_slice(key).map_err(key_error)?;
            cipher.encrypt(chacha20poly1305::Nonce::from_slice(nonce), payload)
        }
    }
    .map_err(|e| {
        SealboxError::new(ErrorCategory::Internal, format!("encryption failed: {}", e))
    })?;

    // The aead crates append the tag to the ciphertext; detach it for the
    // envelope, which frames the two separately.
    if sealed.len() < TAG_LEN {
        return Err(SealboxError::new(
            ErrorCategory::Internal,
            "cipher produced output shorter than the tag",
        ));
    }
    let tag_bytes = sealed.split_off(sealed.len() - TAG_LEN);
    let mut tag = [0u8; TAG_LEN];
    tag.copy_from_slice(&tag_bytes);
    Ok((sealed, tag))
}

/// Decrypt and verify `ciphertext` against its detached tag.
///
/// Any mismatch - wrong key (wrong password), altered ciphertext, altered
/// tag, or altered associated data - fails identically.
pub fn decrypt(
    algorithm: EncryptionAlgorithm,
    key: &[u8; KEY_LEN],
    nonce: &[u8; NONCE_LEN],
    ciphertext: &[u8],
    tag: &[u8; TAG_LEN],
    aad: &[u8],
) -> Result<Vec<u8>> {
    let mut sealed = Vec::with_capacity(ciphertext.len() + TAG_LEN);
    sealed.extend_from_slice(ciphertext);
    sealed.extend_from_slice(tag);
    let payload = Payload {
        msg: sealed.as_slice(),
        aad,
    };
    match algorithm {
        EncryptionAlgorithm::Aes256Gcm => {
            let cipher = Aes256Gcm::new_from_slice(key).map_err(key_error)?;
            cipher.decrypt(Nonce::from_slice(nonce), payload)
        }
        EncryptionAlgorithm::ChaCha20Poly1305 => {
            let cipher = ChaCha20Poly1305::new_from_slice(key).map_err(key_error)?;
            cipher.decrypt(chacha20poly1305::Nonce::from_slice(nonce), payload)
        }
    }
    .map_err(|_| {
        SealboxError::with_kind(
            ErrorCategory::User,
            ErrorKind::AuthenticationFailed,
            "authentication failed: wrong password or tampered data",
        )
    })
}

fn key_error(e: impl std::fmt::Display) -> SealboxError {
    SealboxError::new(ErrorCategory::Internal, format!("invalid key length: {}", e))
}
