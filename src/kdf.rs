//! Password-based key derivation using scrypt.
//!
//! The work factor is fixed: every envelope of a given protocol version is
//! derived with the same parameters, so nothing about the cost has to be
//! stored alongside the salt.

use crate::error::{ErrorCategory, ErrorKind, Result, SealError};
use scrypt::{Params, scrypt};
use zeroize::Zeroizing;

/// Length of salt in bytes
pub const SALT_LEN: usize = 16;

/// Length of derived key in bytes
pub const KEY_LEN: usize = 32;

/// Minimum password length, in characters.
pub const MIN_PASSWORD_LEN: usize = 8;

/// scrypt log2(N) parameter (CPU/memory cost, N = 32768)
const SCRYPT_LOG_N: u8 = 15;

/// scrypt r parameter (block size)
const SCRYPT_R: u32 = 8;

/// scrypt p parameter (parallelization)
const SCRYPT_P: u32 = 1;

/// Checks a password against the minimum strength policy.
///
/// Length is counted in characters when the password is valid UTF-8 and
/// in bytes otherwise. A password consisting only of whitespace is
/// rejected regardless of length.
pub fn check_password_strength(password: &[u8]) -> Result<()> {
    let length = match std::str::from_utf8(password) {
        Ok(text) => {
            if text.trim().is_empty() {
                return Err(SealError::with_kind(
                    ErrorCategory::User,
                    ErrorKind::WeakPassword,
                    "password cannot be empty or only whitespace",
                ));
            }
            text.chars().count()
        }
        Err(_) => password.len(),
    };

    if length < MIN_PASSWORD_LEN {
        return Err(SealError::with_kind(
            ErrorCategory::User,
            ErrorKind::WeakPassword,
            format!(
                "password must be at least {} characters (got {})",
                MIN_PASSWORD_LEN, length
            ),
        ));
    }

    Ok(())
}

/// Derive a 32-byte key from a password and a 16-byte salt.
///
/// The key is returned in a `Zeroizing` buffer and is wiped when dropped.
pub fn derive_key(password: &[u8], salt: &[u8]) -> Result<Zeroizing<[u8; KEY_LEN]>> {
    check_password_strength(password)?;

    if salt.len() != SALT_LEN {
        return Err(SealError::with_kind(
            ErrorCategory::Internal,
            ErrorKind::InvalidKeyMaterial,
            format!("salt must be {} bytes, got {}", SALT_LEN, salt.len()),
        ));
    }

    let params = Params::new(SCRYPT_LOG_N, SCRYPT_R, SCRYPT_P, KEY_LEN).map_err(|e| {
        SealError::with_kind(
            ErrorCategory::Internal,
            ErrorKind::InvalidKeyMaterial,
            format!("failed to create scrypt params: {}", e),
        )
    })?;

    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    scrypt(password, salt, &params, &mut key[..]).map_err(|e| {
        SealError::with_kind(
            ErrorCategory::Internal,
            ErrorKind::InvalidKeyMaterial,
            format!("scrypt key derivation failed: {}", e),
        )
    })?;

    Ok(key)
}
