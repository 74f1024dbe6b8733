//! Versioned armoring for sealed blobs
//!
//! Provides base64url encoding with a version prefix so a blob can travel
//! through text-only channels. The armored form is:
//! - Free of whitespace (including newlines)
//! - Safe to embed in URLs
//! - Safe to pass unescaped in a POSIX shell
//!
//! Armor is layered strictly on top of the binary envelope; unwrapping
//! yields the raw blob bytes untouched.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};

use crate::error::{ErrorCategory, ErrorKind, Result, SealboxError};

/// Magic prefix shared by all armor versions.
const MAGIC_PREFIX: &str = "sealbox";

/// Version 1 marker.
const V1_MAGIC: &str = "sealbox1:";

/// Wrap raw blob bytes in armor, returning the armored string.
///
/// Format: `sealbox1:{base64url-no-padding}`
pub fn wrap(body: &[u8]) -> String {
    let encoded = URL_SAFE_NO_PAD.encode(body);
    format!("{}{}", V1_MAGIC, encoded)
}

/// Unwrap an armored string, returning the original bytes.
pub fn unwrap(armored: &str) -> Result<Vec<u8>> {
    if armored.len() < V1_MAGIC.len() {
        return Err(SealboxError::with_kind(
            ErrorCategory::User,
            ErrorKind::ArmoringInvalid,
            "input size smaller than magic marker; likely truncated",
        ));
    }

    if let Some(encoded) = armored.strip_prefix(V1_MAGIC) {
        let body = URL_SAFE_NO_PAD.decode(encoded).map_err(|e| {
            SealboxError::with_kind_and_source(
                ErrorCategory::User,
                ErrorKind::ArmoringDecode,
                format!("base64 decoding failed: {}", e),
                e,
            )
        })?;
        Ok(body)
    } else if armored.starts_with(MAGIC_PREFIX) {
        Err(SealboxError::with_kind(
            ErrorCategory::User,
            ErrorKind::ArmoringFromFuture,
            "input claims to be sealbox armor, but not a version we support",
        ))
    } else {
        Err(SealboxError::with_kind(
            ErrorCategory::User,
            ErrorKind::ArmoringInvalid,
            "input unrecognized as sealbox armor",
        ))
    }
}

/// Returns true if `data` plausibly starts with sealbox armor.
///
/// Used by callers that accept either raw blobs or armored text and need to
/// pick a decode path without attempting both.
pub fn looks_armored(data: &[u8]) -> bool {
    data.starts_with(MAGIC_PREFIX.as_bytes())
}
