use std::error::Error as StdError;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorCategory {
    /// Any failure that cannot be confidently attributed to any other error
    /// category in this enum.
    ///
    /// In particular this means that use of Internal is never a guarantee
    /// the error is not, for example, due to a user error - merely that it
    /// cannot be confidently determined by the code.
    Internal,

    /// The user provided invalid input or performed an action that is
    /// unsupported or impossible to complete.
    User,
}

/// Fine-grained condition flags for consumers that want to branch on error kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorKind {
    /// The password is shorter than the enforced minimum. Rejected before
    /// any compression or key derivation work is done.
    WeakPassword,
    /// The blob is not structurally a sealed envelope: bad magic, unsupported
    /// version, unknown algorithm id, length mismatch, truncation, or
    /// trailing bytes.
    MalformedEnvelope,
    /// The authentication tag did not verify. Covers a wrong password, a
    /// tampered ciphertext, and a tampered header alike; the cases are
    /// deliberately not distinguished.
    AuthenticationFailed,
    /// Decompression of an authenticated payload failed.
    CorruptPayload,
    /// A primitive was invoked with unusable parameters: zero iterations,
    /// empty salt, zero output length, or an out-of-range configuration.
    InvalidParameters,
    /// The armored representation is malformed (prefix or encoding).
    ArmoringInvalid,
    /// Base64 decoding of the armored payload failed.
    ArmoringDecode,
    /// Input claimed to be sealbox armor but used a future/unsupported version.
    ArmoringFromFuture,
    /// Passphrase could not be obtained from the configured reader.
    PassphraseUnavailable,
    /// Interaction with the filesystem, stdin/stdout, or other I/O failed.
    Io,
}

#[derive(Debug, Error)]
#[error("{msg}")]
pub struct SealboxError {
    /// Broad error category, always provided.
    pub category: ErrorCategory,
    /// Optional specific condition tag for consumers that need to
    /// branch their behavior. Any code consuming errors MUST handle
    /// the absence of a defined kind.
    pub kind: Option<ErrorKind>,
    #[source]
    source: Option<Box<dyn StdError + Send + Sync + 'static>>,
    msg: String,
}

impl SealboxError {
    /// Creates a new error with a required category and display message.
    pub fn new(category: ErrorCategory, msg: impl Into<String>) -> Self {
        Self {
            category,
            kind: None,
            source: None,
            msg: msg.into(),
        }
    }

    /// Creates a new error that also tags the failure with a kind.
    pub fn with_kind(category: ErrorCategory, kind: ErrorKind, msg: impl Into<String>) -> Self {
        Self {
            category,
            kind: Some(kind),
            source: None,
            msg: msg.into(),
        }
    }

    /// Creates a new error that retains the originating source error.
    pub fn with_source(
        category: ErrorCategory,
        msg: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self {
            category,
            kind: None,
            source: Some(Box::new(source)),
            msg: msg.into(),
        }
    }

    /// Creates a new error that carries both a kind tag and the originating source error.
    pub fn with_kind_and_source(
        category: ErrorCategory,
        kind: ErrorKind,
        msg: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self {
            category,
            kind: Some(kind),
            source: Some(Box::new(source)),
            msg: msg.into(),
        }
    }

    /// The user-facing message carried by the error.
    pub fn message(&self) -> &str {
        &self.msg
    }

    /// Returns the preserved source error if present.
    pub fn source_error(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        self.source.as_deref()
    }

    /// Wraps the current error with a higher-level message while preserving the original as source.
    pub fn with_context(self, msg: impl Into<String>) -> Self {
        let category = self.category;
        let kind = self.kind;
        Self {
            category,
            kind,
            source: Some(Box::new(self)),
            msg: msg.into(),
        }
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, SealboxError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_preserved_through_context() {
        let err = SealboxError::with_kind(
            ErrorCategory::User,
            ErrorKind::MalformedEnvelope,
            "bad magic",
        );
        let wrapped = err.with_context("failed to open blob");
        assert_eq!(wrapped.kind, Some(ErrorKind::MalformedEnvelope));
        assert_eq!(wrapped.category, ErrorCategory::User);
        assert_eq!(wrapped.message(), "failed to open blob");
        assert!(wrapped.source_error().is_some());
    }

    #[test]
    fn test_plain_error_has_no_kind() {
        let err = SealboxError::new(ErrorCategory::Internal, "something odd");
        assert_eq!(err.kind, None);
        assert!(err.source_error().is_none());
    }
}
