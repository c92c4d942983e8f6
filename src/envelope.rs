//! Password-based envelope encryption.
//!
//! This module implements the envelope protocol using:
//! - scrypt for key derivation from the password
//! - AES-256-GCM for authenticated encryption
//! - a versioned, hex-encoded record for the parameters needed to decrypt
//! - CBOR + zstd for the on-disk container
//!
//! Every call is self-contained; nothing is cached between calls and the
//! derived key is wiped before returning.

use rand::RngCore;
use rand::rngs::OsRng;
use tracing::trace;

use crate::cipher::{self, NONCE_LEN};
use crate::container;
use crate::error::Result;
use crate::kdf::{self, SALT_LEN};
use crate::record::{Envelope, FORMAT_VERSION};

/// Progress of a single decrypt call. Only used for tracing.
#[derive(Debug, Clone, Copy)]
enum Stage {
    Start,
    Deserialized,
    VersionChecked,
    FieldsValidated,
    KeyDerived,
    Decrypted,
}

/// Encrypts `plaintext` with `password`, returning the container bytes
/// ready to be written to disk.
///
/// Fails with `WeakPassword` before doing any work if the password does
/// not meet the strength policy.
pub fn encrypt(plaintext: &[u8], password: &[u8]) -> Result<Vec<u8>> {
    let envelope = seal_envelope(plaintext, password)?;
    container::encode(&envelope.to_record())
}

/// Decrypts container bytes produced by [`encrypt`].
///
/// A wrong password and a tampered envelope both fail with the same
/// `DecryptionFailed` error. No plaintext is returned unless the
/// authentication tag verifies.
pub fn decrypt(blob: &[u8], password: &[u8]) -> Result<Vec<u8>> {
    trace!(stage = ?Stage::Start, bytes = blob.len());

    let record = container::decode(blob)?;
    trace!(stage = ?Stage::Deserialized);

    record.check_version()?;
    trace!(stage = ?Stage::VersionChecked, version = FORMAT_VERSION);

    let envelope = record.decode_fields()?;
    trace!(stage = ?Stage::FieldsValidated);

    open_envelope(&envelope, password)
}

/// Encrypts into a validated envelope using a fresh random salt and nonce.
pub fn seal_envelope(plaintext: &[u8], password: &[u8]) -> Result<Envelope> {
    kdf::check_password_strength(password)?;

    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);

    let mut nonce = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce);

    seal_envelope_with(plaintext, password, &salt, &nonce)
}

/// Encrypts into an envelope using the provided salt and nonce.
///
/// This function is ONLY for testing purposes to generate deterministic output.
/// NEVER use this in production - always use `encrypt()` which generates random salt/nonce.
pub fn seal_envelope_with(
    plaintext: &[u8],
    password: &[u8],
    salt: &[u8; SALT_LEN],
    nonce: &[u8; NONCE_LEN],
) -> Result<Envelope> {
    let key = kdf::derive_key(password, salt)?;
    let (ciphertext, tag) = cipher::seal(&key, nonce, plaintext)?;

    Ok(Envelope {
        salt: *salt,
        nonce: *nonce,
        ciphertext,
        tag,
    })
}

/// Decrypts a validated envelope.
pub fn open_envelope(envelope: &Envelope, password: &[u8]) -> Result<Vec<u8>> {
    let key = kdf::derive_key(password, &envelope.salt)?;
    trace!(stage = ?Stage::KeyDerived);

    let plaintext = cipher::open(&key, &envelope.nonce, &envelope.ciphertext, &envelope.tag)?;
    trace!(stage = ?Stage::Decrypted, bytes = plaintext.len());

    Ok(plaintext)
}
