//! Sealing and opening of password-protected blobs
//!
//! `seal` runs compress -> derive -> encrypt -> frame; `open` runs the exact
//! reverse. Every seal generates a fresh random salt and nonce, so repeated
//! seals of identical input never produce identical blobs, and the derived
//! key is unique per call. All derivation parameters travel in the envelope,
//! so `open` never consults local configuration for them.

use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::Zeroizing;

use crate::cipher::{self, EncryptionAlgorithm, KEY_LEN, NONCE_LEN, TAG_LEN};
use crate::compress::{self, CompressionAlgorithm, CompressionLevel};
use crate::envelope::Envelope;
use crate::error::{ErrorCategory, ErrorKind, Result, SealboxError};
use crate::kdf::{self, KdfAlgorithm, DEFAULT_ITERATIONS, MAX_ITERATIONS, MIN_ITERATIONS, SALT_LEN};

/// Minimum accepted password length, in characters.
pub const MIN_PASSWORD_LEN: usize = 8;

/// Configuration accepted by [`Sealbox::new`].
///
/// Holds no secrets; a password is borrowed per call instead, so the derived
/// key is the only secret material the library ever owns, and only for the
/// duration of a single operation.
#[derive(Debug, Clone)]
pub struct SealOptions {
    /// Algorithm used when `auto_select` is off.
    pub compression: CompressionAlgorithm,
    pub level: CompressionLevel,
    /// Compress with every algorithm and keep the smallest output.
    pub auto_select: bool,
    pub cipher: EncryptionAlgorithm,
    pub kdf: KdfAlgorithm,
    pub iterations: u32,
}

impl Default for SealOptions {
    fn default() -> Self {
        Self {
            compression: CompressionAlgorithm::Zlib,
            level: CompressionLevel::BALANCED,
            auto_select: true,
            cipher: EncryptionAlgorithm::Aes256Gcm,
            kdf: KdfAlgorithm::Pbkdf2HmacSha256,
            iterations: DEFAULT_ITERATIONS,
        }
    }
}

/// Seals and opens blobs with a fixed configuration.
///
/// Stateless between calls; a single instance may be shared freely across
/// threads.
#[derive(Debug, Clone)]
pub struct Sealbox {
    options: SealOptions,
}

impl Sealbox {
    pub fn new(options: SealOptions) -> Result<Self> {
        if !(MIN_ITERATIONS..=MAX_ITERATIONS).contains(&options.iterations) {
            return Err(SealboxError::with_kind(
                ErrorCategory::User,
                ErrorKind::InvalidParameters,
                format!(
                    "KDF iterations must be between {} and {}, got {}",
                    MIN_ITERATIONS, MAX_ITERATIONS, options.iterations
                ),
            ));
        }
        Ok(Self { options })
    }

    pub fn options(&self) -> &SealOptions {
        &self.options
    }

    /// Compress and encrypt `plaintext` under `password` into a sealed blob.
    pub fn seal(&self, plaintext: &[u8], password: &str) -> Result<Vec<u8>> {
        let mut salt = [0u8; SALT_LEN];
        OsRng.fill_bytes(&mut salt);
        let mut nonce = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce);
        self.seal_with_params(plaintext, password, &salt, &nonce)
    }

    /// Seal with a caller-provided salt and nonce.
    ///
    /// This function is ONLY for testing purposes to generate deterministic
    /// output. NEVER use this in production - always use [`Sealbox::seal`],
    /// which generates a fresh random salt and nonce per call.
    pub fn seal_with_params(
        &self,
        plaintext: &[u8],
        password: &str,
        salt: &[u8; SALT_LEN],
        nonce: &[u8; NONCE_LEN],
    ) -> Result<Vec<u8>> {
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(SealboxError::with_kind(
                ErrorCategory::User,
                ErrorKind::WeakPassword,
                format!(
                    "password must be at least {} characters long",
                    MIN_PASSWORD_LEN
                ),
            ));
        }

        let (compression, compressed) = if self.options.auto_select {
            let (algorithm, data) = compress::auto_select(plaintext, self.options.level);
            (algorithm, Zeroizing::new(data))
        } else {
            let data = compress::compress(plaintext, self.options.compression, self.options.level)?;
            (self.options.compression, Zeroizing::new(data))
        };

        let key = kdf::derive(
            self.options.kdf,
            password.as_bytes(),
            salt,
            self.options.iterations,
            KEY_LEN,
        )?;
        let key: &[u8; KEY_LEN] = key.as_slice().try_into().map_err(|_| {
            SealboxError::new(ErrorCategory::Internal, "derived key has unexpected length")
        })?;

        let mut envelope = Envelope {
            compression,
            cipher: self.options.cipher,
            kdf: self.options.kdf,
            iterations: self.options.iterations,
            salt: *salt,
            nonce: *nonce,
            ciphertext: Vec::new(),
            tag: [0u8; TAG_LEN],
        };
        // Authenticate the header exactly as it will appear on the wire.
        let aad = envelope.header_bytes();
        let (ciphertext, tag) =
            cipher::encrypt(self.options.cipher, key, nonce, &compressed, &aad)?;
        envelope.ciphertext = ciphertext;
        envelope.tag = tag;

        Ok(envelope.serialize())
    }

    /// Parse, decrypt, verify, and decompress a sealed blob.
    ///
    /// All parameters - algorithms, iteration count, salt, nonce - are taken
    /// from the blob itself, never from this instance's configuration, so a
    /// blob sealed under any configuration opens with only its password.
    pub fn open(&self, blob: &[u8], password: &str) -> Result<Vec<u8>> {
        let envelope = Envelope::parse(blob)?;

        let key = kdf::derive(
            envelope.kdf,
            password.as_bytes(),
            &envelope.salt,
            envelope.iterations,
            KEY_LEN,
        )?;
        let key: &[u8; KEY_LEN] = key.as_slice().try_into().map_err(|_| {
            SealboxError::new(ErrorCategory::Internal, "derived key has unexpected length")
        })?;

        let aad = envelope.header_bytes();
        let compressed = Zeroizing::new(cipher::decrypt(
            envelope.cipher,
            key,
            &envelope.nonce,
            &envelope.ciphertext,
            &envelope.tag,
            &aad,
        )?);

        // The payload authenticated, but it is still run through a decoder,
        // so a decode failure must surface as an error rather than a panic
        // or silent truncation.
        compress::decompress(&compressed, envelope.compression)
    }
}

/// Seal `plaintext` under `password` with the default configuration.
pub fn seal(plaintext: &[u8], password: &str) -> Result<Vec<u8>> {
    Sealbox::new(SealOptions::default())?.seal(plaintext, password)
}

/// Open a sealed blob with `password`.
///
/// Works for blobs produced under any configuration; everything needed is in
/// the blob.
pub fn open(blob: &[u8], password: &str) -> Result<Vec<u8>> {
    Sealbox::new(SealOptions::default())?.open(blob, password)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::{MAGIC, VERSION};

    const PASSWORD: &str = "correct horse battery staple";

    fn fast_sealbox() -> Sealbox {
        Sealbox::new(SealOptions {
            iterations: MIN_ITERATIONS,
            ..SealOptions::default()
        })
        .unwrap()
    }

    #[test]
    fn test_roundtrip() {
        let sealbox = fast_sealbox();
        let plaintext = b"hello world";
        let blob = sealbox.seal(plaintext, PASSWORD).unwrap();
        let opened = sealbox.open(&blob, PASSWORD).unwrap();
        assert_eq!(plaintext, &opened[..]);
    }

    #[test]
    fn test_roundtrip_empty_plaintext() {
        let sealbox = fast_sealbox();
        let blob = sealbox.seal(b"", PASSWORD).unwrap();
        let opened = sealbox.open(&blob, PASSWORD).unwrap();
        assert!(opened.is_empty());
    }

    #[test]
    fn test_roundtrip_all_byte_values() {
        let sealbox = fast_sealbox();
        let plaintext: Vec<u8> = (0..=255).collect();
        let blob = sealbox.seal(&plaintext, PASSWORD).unwrap();
        assert_eq!(sealbox.open(&blob, PASSWORD).unwrap(), plaintext);
    }

    #[test]
    fn test_blob_starts_with_magic() {
        let sealbox = fast_sealbox();
        let blob = sealbox.seal(b"data", PASSWORD).unwrap();
        assert_eq!(&blob[..4], &MAGIC);
        assert_eq!(blob[4], VERSION);
    }

    #[test]
    fn test_weak_password_rejected() {
        let sealbox = fast_sealbox();
        let err = sealbox.seal(b"data", "short").unwrap_err();
        assert_eq!(err.kind, Some(ErrorKind::WeakPassword));
        // Exactly at the floor is accepted.
        assert!(sealbox.seal(b"data", "12345678").is_ok());
    }

    #[test]
    fn test_wrong_password_fails_authentication() {
        let sealbox = fast_sealbox();
        let blob = sealbox.seal(b"secret", PASSWORD).unwrap();
        let err = sealbox.open(&blob, "not the password").unwrap_err();
        assert_eq!(err.kind, Some(ErrorKind::AuthenticationFailed));
    }

    #[test]
    fn test_two_seals_differ() {
        let sealbox = fast_sealbox();
        let a = sealbox.seal(b"same input", PASSWORD).unwrap();
        let b = sealbox.seal(b"same input", PASSWORD).unwrap();
        assert_ne!(a, b);
        assert_eq!(sealbox.open(&a, PASSWORD).unwrap(), b"same input");
        assert_eq!(sealbox.open(&b, PASSWORD).unwrap(), b"same input");
    }

    #[test]
    fn test_deterministic_with_fixed_params() {
        let sealbox = fast_sealbox();
        let salt = [1u8; SALT_LEN];
        let nonce = [2u8; NONCE_LEN];
        let a = sealbox
            .seal_with_params(b"input", PASSWORD, &salt, &nonce)
            .unwrap();
        let b = sealbox
            .seal_with_params(b"input", PASSWORD, &salt, &nonce)
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_open_uses_blob_parameters_not_configuration() {
        // Seal with chacha20/scrypt, open with a default-configured instance.
        let sealer = Sealbox::new(SealOptions {
            cipher: EncryptionAlgorithm::ChaCha20Poly1305,
            kdf: KdfAlgorithm::Scrypt,
            iterations: MIN_ITERATIONS,
            ..SealOptions::default()
        })
        .unwrap();
        let blob = sealer.seal(b"cross-config", PASSWORD).unwrap();

        let opener = fast_sealbox();
        assert_eq!(opener.open(&blob, PASSWORD).unwrap(), b"cross-config");
    }

    #[test]
    fn test_fixed_compression_respected() {
        let sealbox = Sealbox::new(SealOptions {
            compression: CompressionAlgorithm::Store,
            auto_select: false,
            iterations: MIN_ITERATIONS,
            ..SealOptions::default()
        })
        .unwrap();
        let blob = sealbox.seal(b"aaaaaaaaaaaaaaaaaaaaaaaa", PASSWORD).unwrap();
        let envelope = Envelope::parse(&blob).unwrap();
        assert_eq!(envelope.compression, CompressionAlgorithm::Store);
        assert_eq!(sealbox.open(&blob, PASSWORD).unwrap(), b"aaaaaaaaaaaaaaaaaaaaaaaa");
    }

    #[test]
    fn test_iteration_floor_enforced() {
        let err = Sealbox::new(SealOptions {
            iterations: 5_000,
            ..SealOptions::default()
        })
        .unwrap_err();
        assert_eq!(err.kind, Some(ErrorKind::InvalidParameters));
    }

    #[test]
    fn test_header_tamper_detected_by_tag() {
        // Swap the compression id for another *valid* id: parsing still
        // succeeds, so the authentication tag is the layer that must catch it.
        let sealbox = Sealbox::new(SealOptions {
            compression: CompressionAlgorithm::Store,
            auto_select: false,
            iterations: MIN_ITERATIONS,
            ..SealOptions::default()
        })
        .unwrap();
        let mut blob = sealbox.seal(b"bound header", PASSWORD).unwrap();
        blob[5] = CompressionAlgorithm::Zlib.wire_id();
        let err = sealbox.open(&blob, PASSWORD).unwrap_err();
        assert_eq!(err.kind, Some(ErrorKind::AuthenticationFailed));
    }

    #[test]
    fn test_module_level_convenience() {
        let blob = seal(b"hello", PASSWORD).unwrap();
        assert_eq!(open(&blob, PASSWORD).unwrap(), b"hello");
    }
}
