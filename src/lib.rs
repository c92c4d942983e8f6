//! sealfile - password-based file encryption envelopes
//!
//! A file is sealed with a key derived from a password (scrypt) using
//! AES-256-GCM, and stored together with its salt, nonce, tag and protocol
//! version in a single compressed container.
//!
//! ```no_run
//! let blob = sealfile::encrypt(b"hello world", b"correct-horse-battery")?;
//! let plaintext = sealfile::decrypt(&blob, b"correct-horse-battery")?;
//! assert_eq!(plaintext, b"hello world");
//! # Ok::<(), sealfile::SealError>(())
//! ```

#![forbid(unsafe_code)]

mod cipher;
mod container;
mod envelope;
mod kdf;
mod record;

pub mod error;
pub mod file_ops;
pub mod passphrase;

pub use envelope::{decrypt, encrypt};
pub use error::{ErrorCategory, ErrorKind, Result, SealError};
pub use kdf::{MIN_PASSWORD_LEN, check_password_strength};
pub use record::{EnvelopeRecord, FORMAT_VERSION};

/// Low-level building blocks of the envelope protocol.
///
/// Unstable: exposed for test vectors and tooling only, and may change
/// without notice in any release.
#[doc(hidden)]
pub mod internals {
    pub use crate::cipher::{NONCE_LEN, TAG_LEN, open, seal};
    pub use crate::container::{decode, encode};
    pub use crate::envelope::{open_envelope, seal_envelope, seal_envelope_with};
    pub use crate::kdf::{KEY_LEN, SALT_LEN, derive_key};
    pub use crate::record::Envelope;
}
