//! File encryption/decryption operations
//!
//! This module provides high-level file operations for encrypting, decrypting,
//! updating and inspecting files using the sealfile envelope format.

use crate::container;
use crate::envelope;
use crate::error::{ErrorCategory, ErrorKind, Result, SealError};
use crate::kdf;
use crate::passphrase::PassphraseReader;
use crate::record::EnvelopeRecord;
use std::ffi::OsStr;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::debug;
use zeroize::Zeroizing;

/// Conventional extension of encrypted files.
pub const ENCRYPTED_EXTENSION: &str = "enc";

/// `notes.txt` -> `notes.txt.enc`
pub fn default_encrypted_path(input: &Path) -> PathBuf {
    let mut path = input.as_os_str().to_owned();
    path.push(".");
    path.push(ENCRYPTED_EXTENSION);
    PathBuf::from(path)
}

/// `notes.txt.enc` -> `notes.txt`; anything else gets a `.dec` suffix.
pub fn default_decrypted_path(input: &Path) -> PathBuf {
    if input.extension() == Some(OsStr::new(ENCRYPTED_EXTENSION)) {
        input.with_extension("")
    } else {
        let mut path = input.as_os_str().to_owned();
        path.push(".dec");
        PathBuf::from(path)
    }
}

/// Encrypt a file with a password
///
/// Reads plaintext from `input_path`, encrypts it using a password from
/// `passphrase_reader`, and writes the envelope to `output_path` (default
/// `<input_path>.enc`). Returns the path written.
///
/// The password is checked against the strength policy before the input is
/// read, and nothing is written unless the whole envelope was produced.
/// The output is written atomically with mode 0o600 on Unix systems; a
/// failed write leaves no file at `output_path`.
pub fn encrypt_file(
    input_path: &Path,
    output_path: Option<&Path>,
    passphrase_reader: &mut dyn PassphraseReader,
) -> Result<PathBuf> {
    let output_path = output_path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| default_encrypted_path(input_path));

    let passphrase = passphrase_reader.read_passphrase()?;
    kdf::check_password_strength(&passphrase)?;

    let plaintext = Zeroizing::new(fs::read(input_path).map_err(|e| read_error(input_path, e))?);
    debug!(path = %input_path.display(), bytes = plaintext.len(), "encrypting file");

    let blob = envelope::encrypt(&plaintext, &passphrase)
        .map_err(|e| e.with_context("encryption failed"))?;
    write_file_atomic(&output_path, &blob)?;

    debug!(path = %output_path.display(), bytes = blob.len(), "wrote envelope");
    Ok(output_path)
}

/// Decrypt a file with a password
///
/// Reads an envelope from `input_path`, decrypts it using a password from
/// `passphrase_reader`, and writes the plaintext to `output_path` (default:
/// see [`default_decrypted_path`]). Returns the path written.
///
/// The output is written atomically with mode 0o600 on Unix systems.
pub fn decrypt_file(
    input_path: &Path,
    output_path: Option<&Path>,
    passphrase_reader: &mut dyn PassphraseReader,
) -> Result<PathBuf> {
    let output_path = output_path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| default_decrypted_path(input_path));

    let blob = fs::read(input_path).map_err(|e| read_error(input_path, e))?;
    debug!(path = %input_path.display(), bytes = blob.len(), "decrypting file");

    let passphrase = passphrase_reader.read_passphrase()?;
    let plaintext = Zeroizing::new(
        envelope::decrypt(&blob, &passphrase).map_err(|e| e.with_context("failed to decrypt"))?,
    );
    write_file_atomic(&output_path, &plaintext)?;

    debug!(path = %output_path.display(), bytes = plaintext.len(), "wrote plaintext");
    Ok(output_path)
}

/// Update an encrypted file with new plaintext using the same password
///
/// This function:
/// 1. Decrypts the existing file at `crypt_path` to validate the password
/// 2. Reads new plaintext from `plain_path`
/// 3. Encrypts the new plaintext with the validated password (fresh salt and nonce)
/// 4. Atomically writes to `crypt_path` (tempfile + fsync + rename)
///
/// The atomic write ensures that either the old file or the new file exists,
/// never a partial/corrupted file.
///
/// The password validation prevents accidental password changes.
pub fn update_file(
    plain_path: &Path,
    crypt_path: &Path,
    passphrase_reader: &mut dyn PassphraseReader,
) -> Result<()> {
    let blob = fs::read(crypt_path).map_err(|e| read_error(crypt_path, e))?;
    let passphrase = passphrase_reader.read_passphrase()?;

    // Validate password by decrypting existing file (discard plaintext)
    drop(Zeroizing::new(
        envelope::decrypt(&blob, &passphrase).map_err(|e| e.with_context("failed to decrypt"))?,
    ));
    debug!(path = %crypt_path.display(), "password validated against existing envelope");

    let new_plaintext =
        Zeroizing::new(fs::read(plain_path).map_err(|e| read_error(plain_path, e))?);
    let new_blob = envelope::encrypt(&new_plaintext, &passphrase)
        .map_err(|e| e.with_context("failed to encrypt"))?;

    write_file_atomic(crypt_path, &new_blob)?;
    debug!(path = %crypt_path.display(), bytes = new_blob.len(), "replaced envelope");
    Ok(())
}

/// Read the raw record of an envelope without decrypting it.
///
/// Only the container is decoded; the record is returned as stored, even
/// if its version is unsupported or fields are missing.
pub fn inspect_file(input_path: &Path) -> Result<EnvelopeRecord> {
    let blob = fs::read(input_path).map_err(|e| read_error(input_path, e))?;
    container::decode(&blob)
        .map_err(|e| e.with_context(format!("failed to inspect {}", input_path.display())))
}

/// Write to a tempfile next to `path`, fsync, then rename over `path`.
///
/// Either the previous file (or no file) or the complete new contents end
/// up at `path`. The tempfile is removed when any step fails.
fn write_file_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    replace_atomically(path, contents)
        .map_err(|e| e.with_context(format!("failed to write {}", path.display())))
}

fn replace_atomically(path: &Path, contents: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        Some(_) => Path::new("."),
        None => {
            return Err(SealError::with_kind(
                ErrorCategory::User,
                ErrorKind::Io,
                "path has no parent directory",
            ));
        }
    };
    let mut temp_file = tempfile::NamedTempFile::new_in(dir)
        .map_err(|e| io_error("failed to create tempfile", e))?;

    temp_file
        .write_all(contents)
        .map_err(|e| io_error("failed to write to tempfile", e))?;
    // Flush and fsync() such that the rename later, if it succeeds, will
    // always point to a valid file.
    temp_file
        .flush()
        .map_err(|e| io_error("failed to flush tempfile", e))?;
    temp_file
        .as_file()
        .sync_all()
        .map_err(|e| io_error("failed to sync file prior to rename", e))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = temp_file
            .as_file()
            .metadata()
            .map_err(|e| io_error("failed to get tempfile metadata", e))?
            .permissions();
        perms.set_mode(0o600);
        temp_file
            .as_file()
            .set_permissions(perms)
            .map_err(|e| io_error("failed to set tempfile permissions", e))?;
    }

    temp_file.persist(path).map_err(|e| {
        SealError::with_kind_and_source(
            ErrorCategory::Internal,
            ErrorKind::Io,
            "failed to rename tempfile into place",
            e.error,
        )
    })?;
    Ok(())
}

fn io_error(msg: impl Into<String>, err: io::Error) -> SealError {
    SealError::with_kind_and_source(ErrorCategory::Internal, ErrorKind::Io, msg, err)
}

fn read_error(path: &Path, err: io::Error) -> SealError {
    let category = if err.kind() == io::ErrorKind::NotFound {
        ErrorCategory::User
    } else {
        ErrorCategory::Internal
    };
    SealError::with_kind_and_source(
        category,
        ErrorKind::Io,
        format!("failed to read from {}", path.display()),
        err,
    )
}
