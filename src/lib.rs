//! sealbox - password-based sealed blobs
//!
//! A sealed blob is a single reversible transform over an in-memory buffer:
//! [`seal`] compresses the input, derives a key from a password via a slow
//! KDF, encrypts with an AEAD cipher, and frames everything in a
//! self-describing binary envelope; [`open`] reverses the pipeline and fails
//! deterministically for any blob that was altered, truncated, or opened
//! with the wrong password.

#![forbid(unsafe_code)]

pub mod cipher;
pub mod compress;
pub mod envelope;
pub mod error;
pub mod file_ops;
pub mod kdf;
pub mod passphrase;
pub mod sealcrypt;
pub mod varmor;

pub use cipher::EncryptionAlgorithm;
pub use compress::{CompressionAlgorithm, CompressionLevel};
pub use error::{ErrorCategory, ErrorKind, Result, SealboxError};
pub use kdf::KdfAlgorithm;
pub use sealcrypt::{open, seal, SealOptions, Sealbox};
