//! File sealing/opening operations
//!
//! Convenience wrappers that run the sealed-blob codec over whole file
//! contents and own all path I/O. Sealed files hold either the raw binary
//! blob or, optionally, its armored text form; opening detects which one it
//! is reading.

use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::str;

use crate::error::{ErrorCategory, ErrorKind, Result, SealboxError};
use crate::passphrase::PassphraseReader;
use crate::sealcrypt::Sealbox;
use crate::varmor;

/// Seal a file's contents with a password
///
/// Reads plaintext from `input_path`, seals it using a password from
/// `passphrase_reader`, and writes the blob to `output_path` - armored text
/// if `armor` is set, the raw binary blob otherwise.
///
/// The output file is created with mode 0o600 (read/write for owner only) on
/// Unix systems.
pub fn seal_file(
    sealbox: &Sealbox,
    input_path: &Path,
    output_path: &Path,
    passphrase_reader: &mut dyn PassphraseReader,
    armor: bool,
) -> Result<()> {
    let plaintext = fs::read(input_path).map_err(|e| read_error(input_path, e))?;
    let passphrase = passphrase_reader.read_passphrase()?;
    let password = password_str(&passphrase)?;
    let blob = sealbox
        .seal(&plaintext, password)
        .map_err(|e| e.with_context("sealing failed"))?;
    let contents = if armor {
        varmor::wrap(&blob).into_bytes()
    } else {
        blob
    };
    write_file_secure(output_path, &contents)
        .map_err(|e| e.with_context(format!("failed to write to {}", output_path.display())))?;
    Ok(())
}

/// Open a sealed file with a password
///
/// Reads a blob (raw or armored) from `input_path`, opens it using a
/// password from `passphrase_reader`, and writes the plaintext to
/// `output_path`.
///
/// The output file is created with mode 0o600 (read/write for owner only) on
/// Unix systems.
pub fn open_file(
    sealbox: &Sealbox,
    input_path: &Path,
    output_path: &Path,
    passphrase_reader: &mut dyn PassphraseReader,
) -> Result<()> {
    let contents = fs::read(input_path).map_err(|e| read_error(input_path, e))?;
    let passphrase = passphrase_reader.read_passphrase()?;
    let password = password_str(&passphrase)?;
    let blob = decode_contents(&contents)?;
    let plaintext = sealbox
        .open(&blob, password)
        .map_err(|e| e.with_context("failed to open sealed data"))?;
    write_file_secure(output_path, &plaintext)
        .map_err(|e| e.with_context(format!("failed to write to {}", output_path.display())))?;
    Ok(())
}

/// Update a sealed file with new plaintext using the same password
///
/// This function:
/// 1. Opens the existing file at `sealed_path` to validate the password
/// 2. Reads new plaintext from `plain_path`
/// 3. Seals the new plaintext with the validated password
/// 4. Atomically replaces `sealed_path` (tempfile + fsync + rename)
///
/// The atomic replace ensures that either the old file or the new file
/// exists, never a partial one. The validation step prevents accidental
/// password changes. The file's encoding (raw or armored) is preserved.
pub fn update_file(
    sealbox: &Sealbox,
    plain_path: &Path,
    sealed_path: &Path,
    passphrase_reader: &mut dyn PassphraseReader,
) -> Result<()> {
    let contents = fs::read(sealed_path).map_err(|e| read_error(sealed_path, e))?;
    let passphrase = passphrase_reader.read_passphrase()?;
    let password = password_str(&passphrase)?;

    let was_armored = varmor::looks_armored(&contents);
    let blob = decode_contents(&contents)?;
    sealbox
        .open(&blob, password)
        .map_err(|e| e.with_context("failed to open existing sealed file"))?;

    // Password checks out; re-seal the new content (atomically).
    let sealed_dir = sealed_path.parent().ok_or_else(|| {
        SealboxError::with_kind(
            ErrorCategory::User,
            ErrorKind::Io,
            "sealed path has no parent directory",
        )
    })?;
    let mut temp_file = tempfile::NamedTempFile::new_in(sealed_dir).map_err(|e| {
        SealboxError::with_kind_and_source(
            ErrorCategory::Internal,
            ErrorKind::Io,
            "failed to create tempfile",
            e,
        )
    })?;
    let new_plaintext = fs::read(plain_path).map_err(|e| read_error(plain_path, e))?;
    let new_blob = sealbox
        .seal(&new_plaintext, password)
        .map_err(|e| e.with_context("sealing failed"))?;
    let new_contents = if was_armored {
        varmor::wrap(&new_blob).into_bytes()
    } else {
        new_blob
    };

    temp_file.write_all(&new_contents).map_err(|e| {
        SealboxError::with_kind_and_source(
            ErrorCategory::Internal,
            ErrorKind::Io,
            "failed to write to tempfile",
            e,
        )
    })?;
    // Flush and fsync() such that the rename later, if it succeeds, will
    // always point to a valid file.
    temp_file.flush().map_err(|e| {
        SealboxError::with_kind_and_source(
            ErrorCategory::Internal,
            ErrorKind::Io,
            "failed to flush tempfile",
            e,
        )
    })?;
    temp_file.as_file().sync_all().map_err(|e| {
        SealboxError::with_kind_and_source(
            ErrorCategory::Internal,
            ErrorKind::Io,
            "failed to sync file prior to rename",
            e,
        )
    })?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = temp_file
            .as_file()
            .metadata()
            .map_err(|e| {
                SealboxError::with_kind_and_source(
                    ErrorCategory::Internal,
                    ErrorKind::Io,
                    "failed to get tempfile metadata",
                    e,
                )
            })?
            .permissions();
        perms.set_mode(0o600);
        temp_file.as_file().set_permissions(perms).map_err(|e| {
            SealboxError::with_kind_and_source(
                ErrorCategory::Internal,
                ErrorKind::Io,
                "failed to set tempfile permissions",
                e,
            )
        })?;
    }
    temp_file.persist(sealed_path).map_err(|e| {
        SealboxError::with_kind_and_source(
            ErrorCategory::Internal,
            ErrorKind::Io,
            format!("failed to rename to target file {}", sealed_path.display()),
            e,
        )
    })?;
    Ok(())
}

/// Interpret file contents as either armored text or a raw blob.
fn decode_contents(contents: &[u8]) -> Result<Vec<u8>> {
    if varmor::looks_armored(contents) {
        let text = str::from_utf8(contents).map_err(|e| {
            SealboxError::with_kind_and_source(
                ErrorCategory::User,
                ErrorKind::ArmoringInvalid,
                "armored file is not valid UTF-8",
                e,
            )
        })?;
        varmor::unwrap(text.trim_end()).map_err(|e| e.with_context("failed to unarmor"))
    } else {
        Ok(contents.to_vec())
    }
}

fn password_str(passphrase: &[u8]) -> Result<&str> {
    str::from_utf8(passphrase).map_err(|e| {
        SealboxError::with_kind_and_source(
            ErrorCategory::User,
            ErrorKind::PassphraseUnavailable,
            "passphrase is not valid UTF-8",
            e,
        )
    })
}

/// Write file with secure permissions (0o600 on Unix)
fn write_file_secure(path: &Path, contents: &[u8]) -> Result<()> {
    #[cfg(unix)]
    {
        use std::fs::OpenOptions;
        use std::os::unix::fs::OpenOptionsExt;

        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)
            .map_err(|e| {
                SealboxError::with_kind_and_source(
                    ErrorCategory::User,
                    ErrorKind::Io,
                    format!("failed to open {}", path.display()),
                    e,
                )
            })?;

        file.write_all(contents).map_err(|e| {
            SealboxError::with_kind_and_source(
                ErrorCategory::Internal,
                ErrorKind::Io,
                format!("failed to write {}", path.display()),
                e,
            )
        })?;
        Ok(())
    }

    #[cfg(not(unix))]
    {
        fs::write(path, contents).map_err(|e| {
            SealboxError::with_kind_and_source(
                ErrorCategory::User,
                ErrorKind::Io,
                format!("failed to write {}", path.display()),
                e,
            )
        })?;
        Ok(())
    }
}

fn read_error(path: &Path, err: io::Error) -> SealboxError {
    let category = if err.kind() == io::ErrorKind::NotFound {
        ErrorCategory::User
    } else {
        ErrorCategory::Internal
    };
    SealboxError::with_kind_and_source(
        category,
        ErrorKind::Io,
        format!("failed to read from {}", path.display()),
        err,
    )
}
