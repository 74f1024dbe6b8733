//! Passphrase acquisition and strength reporting

use std::io::{self, IsTerminal, Read, Write};

use zeroize::Zeroizing;

use crate::error::{ErrorCategory, ErrorKind, Result, SealboxError};

/// Trait for reading passphrases from various sources
pub trait PassphraseReader {
    /// Read a passphrase.
    ///
    /// Returns the passphrase wrapped in `Zeroizing` to ensure it is securely
    /// wiped from memory when dropped. Sealing requires the bytes to be
    /// valid UTF-8; readers themselves do not enforce that.
    fn read_passphrase(&mut self) -> Result<Zeroizing<Vec<u8>>>;
}

/// Returns a fixed passphrase (for testing)
pub struct ConstantPassphraseReader {
    passphrase: Zeroizing<Vec<u8>>,
}

impl ConstantPassphraseReader {
    pub fn new(passphrase: Vec<u8>) -> Self {
        Self {
            passphrase: Zeroizing::new(passphrase),
        }
    }
}

impl PassphraseReader for ConstantPassphraseReader {
    fn read_passphrase(&mut self) -> Result<Zeroizing<Vec<u8>>> {
        Ok(Zeroizing::new((*self.passphrase).clone()))
    }
}

/// Reads a passphrase from any `io::Read` source
pub struct ReaderPassphraseReader {
    reader: Box<dyn Read>,
}

impl ReaderPassphraseReader {
    pub fn new(reader: Box<dyn Read>) -> Self {
        Self { reader }
    }
}

impl PassphraseReader for ReaderPassphraseReader {
    fn read_passphrase(&mut self) -> Result<Zeroizing<Vec<u8>>> {
        let mut data = Zeroizing::new(Vec::new());
        self.reader.read_to_end(&mut data).map_err(|e| {
            SealboxError::with_kind_and_source(
                ErrorCategory::Internal,
                ErrorKind::Io,
                format!("error reading passphrase: {}", e),
                e,
            )
        })?;
        // Strip one trailing newline so piped input behaves like typed input.
        if data.last() == Some(&b'\n') {
            data.pop();
            if data.last() == Some(&b'\r') {
                data.pop();
            }
        }
        Ok(data)
    }
}

/// Reads a passphrase from the terminal with no echo
pub struct TerminalPassphraseReader;

impl TerminalPassphraseReader {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TerminalPassphraseReader {
    fn default() -> Self {
        Self::new()
    }
}

impl PassphraseReader for TerminalPassphraseReader {
    fn read_passphrase(&mut self) -> Result<Zeroizing<Vec<u8>>> {
        if !io::stdin().is_terminal() {
            return Err(SealboxError::with_kind(
                ErrorCategory::User,
                ErrorKind::PassphraseUnavailable,
                "cannot read passphrase from terminal - stdin is not a terminal",
            ));
        }

        io::stderr()
            .write_all(b"Password (sealbox): ")
            .map_err(|e| {
                SealboxError::with_kind_and_source(
                    ErrorCategory::Internal,
                    ErrorKind::Io,
                    format!("failed to write prompt: {}", e),
                    e,
                )
            })?;
        io::stderr().flush().map_err(|e| {
            SealboxError::with_kind_and_source(
                ErrorCategory::Internal,
                ErrorKind::Io,
                format!("failed to flush prompt: {}", e),
                e,
            )
        })?;

        // Read password *without echo*
        let passphrase = rpassword::read_password().map_err(|e| {
            SealboxError::with_kind_and_source(
                ErrorCategory::Internal,
                ErrorKind::PassphraseUnavailable,
                format!("failure reading passphrase: {}", e),
                e,
            )
        })?;

        Ok(Zeroizing::new(passphrase.into_bytes()))
    }
}

/// Wraps another `PassphraseReader` and caches the result
///
/// Provides "at most once" semantics - the upstream reader is called
/// only on the first invocation, and subsequent calls return the cached
/// value. The cached passphrase is wiped when this reader is dropped.
pub struct CachingPassphraseReader {
    upstream: Box<dyn PassphraseReader>,
    cached: Option<Zeroizing<Vec<u8>>>,
}

impl CachingPassphraseReader {
    pub fn new(upstream: Box<dyn PassphraseReader>) -> Self {
        Self {
            upstream,
            cached: None,
        }
    }
}

impl PassphraseReader for CachingPassphraseReader {
    fn read_passphrase(&mut self) -> Result<Zeroizing<Vec<u8>>> {
        if self.cached.is_none() {
            let passphrase = self.upstream.read_passphrase()?;
            self.cached = Some(passphrase);
        }
        match self.cached.as_ref() {
            Some(inner) => Ok(Zeroizing::new((**inner).clone())),
            None => Err(SealboxError::with_kind(
                ErrorCategory::Internal,
                ErrorKind::PassphraseUnavailable,
                "passphrase cache unexpectedly empty",
            )),
        }
    }
}

/// Overall strength verdict for a password.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrengthLevel {
    Weak,
    Medium,
    Strong,
}

/// Result of analyzing a password, advisory only.
///
/// Sealing enforces just the hard length floor; everything reported here is
/// guidance a caller may surface to the user.
#[derive(Debug, Clone)]
pub struct PasswordStrength {
    pub level: StrengthLevel,
    /// Points scored out of [`PasswordStrength::MAX_SCORE`].
    pub score: u8,
    pub length_ok: bool,
    pub has_uppercase: bool,
    pub has_lowercase: bool,
    pub has_digits: bool,
    pub has_symbols: bool,
    pub recommendations: Vec<&'static str>,
}

impl PasswordStrength {
    pub const MAX_SCORE: u8 = 6;
}

/// Analyze a password: one point each for meeting the length floor, reaching
/// 12+ characters, and containing upper case, lower case, digits, and
/// symbols. 5+ points is Strong, 3+ is Medium, anything less is Weak.
pub fn strength(password: &str) -> PasswordStrength {
    let length = password.chars().count();
    let length_ok = length >= crate::sealcrypt::MIN_PASSWORD_LEN;
    let has_uppercase = password.chars().any(|c| c.is_uppercase());
    let has_lowercase = password.chars().any(|c| c.is_lowercase());
    let has_digits = password.chars().any(|c| c.is_ascii_digit());
    let has_symbols = password.chars().any(|c| !c.is_alphanumeric());

    let mut score = 0u8;
    for hit in [
        length_ok,
        length >= 12,
        has_uppercase,
        has_lowercase,
        has_digits,
        has_symbols,
    ] {
        if hit {
            score += 1;
        }
    }

    let level = if score >= 5 {
        StrengthLevel::Strong
    } else if score >= 3 {
        StrengthLevel::Medium
    } else {
        StrengthLevel::Weak
    };

    let mut recommendations = Vec::new();
    if !length_ok {
        recommendations.push("use at least 8 characters");
    } else if length < 12 {
        recommendations.push("consider 12 or more characters");
    }
    if !has_uppercase {
        recommendations.push("add uppercase letters");
    }
    if !has_lowercase {
        recommendations.push("add lowercase letters");
    }
    if !has_digits {
        recommendations.push("add digits");
    }
    if !has_symbols {
        recommendations.push("add symbols");
    }

    PasswordStrength {
        level,
        score,
        length_ok,
        has_uppercase,
        has_lowercase,
        has_digits,
        has_symbols,
        recommendations,
    }
}
