//! AES-256-GCM with a detached authentication tag.

use aes_gcm::Aes256Gcm;
use aes_gcm::aead::{AeadInPlace, KeyInit, Nonce, Tag};

use crate::error::{ErrorCategory, ErrorKind, Result, SealError};
use crate::kdf::KEY_LEN;

/// Length of nonce in bytes
pub const NONCE_LEN: usize = 12;

/// Length of the GCM authentication tag in bytes
pub const TAG_LEN: usize = 16;

fn new_cipher(key: &[u8; KEY_LEN]) -> Result<Aes256Gcm> {
    Aes256Gcm::new_from_slice(&key[..]).map_err(|_| {
        SealError::with_kind(
            ErrorCategory::Internal,
            ErrorKind::InvalidKeyMaterial,
            "invalid AES-256 key length",
        )
    })
}

/// Encrypts `plaintext` without associated data.
///
/// Returns the ciphertext (same length as the plaintext) and the tag.
pub fn seal(
    key: &[u8; KEY_LEN],
    nonce: &[u8; NONCE_LEN],
    plaintext: &[u8],
) -> Result<(Vec<u8>, [u8; TAG_LEN])> {
    let cipher = new_cipher(key)?;
    let mut buffer = plaintext.to_vec();
    let tag = cipher
        .encrypt_in_place_detached(Nonce::<Aes256Gcm>::from_slice(nonce), b"", &mut buffer)
        .map_err(|_| {
            SealError::with_kind(
                ErrorCategory::Internal,
                ErrorKind::InternalInvariant,
                "AES-GCM encryption failed",
            )
        })?;

    let mut tag_bytes = [0u8; TAG_LEN];
    tag_bytes.copy_from_slice(&tag);
    Ok((buffer, tag_bytes))
}

/// Verifies `tag` and decrypts `ciphertext`.
///
/// The tag is checked before any plaintext is produced; every failure maps
/// to the same `DecryptionFailed` error.
pub fn open(
    key: &[u8; KEY_LEN],
    nonce: &[u8; NONCE_LEN],
    ciphertext: &[u8],
    tag: &[u8; TAG_LEN],
) -> Result<Vec<u8>> {
    let cipher = new_cipher(key)?;
    let mut buffer = ciphertext.to_vec();
    cipher
        .decrypt_in_place_detached(
            Nonce::<Aes256Gcm>::from_slice(nonce),
            b"",
            &mut buffer,
            Tag::<Aes256Gcm>::from_slice(tag),
        )
        .map_err(|_| SealError::decryption_failed())?;
    Ok(buffer)
}
