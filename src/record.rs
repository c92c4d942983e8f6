//! The envelope record and its validation.
//!
//! `EnvelopeRecord` is the logical, string-keyed record exactly as it is
//! stored: every field optional, binary values hex-encoded. `Envelope` is
//! the validated form with fixed-width binary fields, produced only by
//! [`EnvelopeRecord::validate`].

use serde::{Deserialize, Serialize};

use crate::cipher::{NONCE_LEN, TAG_LEN};
use crate::error::{ErrorCategory, ErrorKind, Result, SealError};
use crate::kdf::SALT_LEN;

/// The only protocol version this implementation reads and writes.
///
/// Version `1.0.0` (AES-CBC, no authentication tag) is not supported.
pub const FORMAT_VERSION: &str = "2.0.0";

/// The stored form of an envelope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvelopeRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salt: Option<String>,
    #[serde(default, alias = "iv", skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,
    #[serde(
        rename = "authTag",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub auth_tag: Option<String>,
}

/// A validated envelope of the current protocol version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub salt: [u8; SALT_LEN],
    pub nonce: [u8; NONCE_LEN],
    pub ciphertext: Vec<u8>,
    pub tag: [u8; TAG_LEN],
}

impl Envelope {
    /// Converts to the stored form, stamped with [`FORMAT_VERSION`].
    pub fn to_record(&self) -> EnvelopeRecord {
        EnvelopeRecord {
            version: Some(FORMAT_VERSION.to_string()),
            salt: Some(hex::encode(self.salt)),
            nonce: Some(hex::encode(self.nonce)),
            payload: Some(hex::encode(&self.ciphertext)),
            auth_tag: Some(hex::encode(self.tag)),
        }
    }
}

impl EnvelopeRecord {
    /// Checks the version, then the presence and shape of every field.
    ///
    /// The version is checked first so that an envelope from another
    /// protocol revision is reported as such, not as corrupted.
    pub fn validate(&self) -> Result<Envelope> {
        self.check_version()?;
        self.decode_fields()
    }

    /// Fails with `MissingVersion` or `UnsupportedVersion` unless the record
    /// carries exactly [`FORMAT_VERSION`]. Other fields are not looked at.
    pub fn check_version(&self) -> Result<()> {
        let version = self.version.as_deref().ok_or_else(|| {
            SealError::with_kind(
                ErrorCategory::User,
                ErrorKind::MissingVersion,
                "envelope has no version",
            )
        })?;
        if version != FORMAT_VERSION {
            return Err(SealError::with_kind(
                ErrorCategory::User,
                ErrorKind::UnsupportedVersion(version.to_string()),
                format!(
                    "unsupported envelope version {:?} (expected {:?})",
                    version, FORMAT_VERSION
                ),
            ));
        }
        Ok(())
    }

    /// Decodes the fixed-width fields and the payload. The version must
    /// already have been checked.
    pub(crate) fn decode_fields(&self) -> Result<Envelope> {
        let salt = decode_fixed::<SALT_LEN>("salt", self.salt.as_deref())?;
        let nonce = decode_fixed::<NONCE_LEN>("nonce", self.nonce.as_deref())?;
        let tag = decode_fixed::<TAG_LEN>("authTag", self.auth_tag.as_deref())?;
        let payload = required("payload", self.payload.as_deref())?;
        let ciphertext = hex::decode(payload).map_err(|e| {
            SealError::with_kind_and_source(
                ErrorCategory::User,
                ErrorKind::CorruptedFile,
                "envelope field payload is not valid hex",
                e,
            )
        })?;

        Ok(Envelope {
            salt,
            nonce,
            ciphertext,
            tag,
        })
    }
}

fn required<'a>(field: &str, value: Option<&'a str>) -> Result<&'a str> {
    value.ok_or_else(|| SealError::corrupted(format!("envelope is missing field {}", field)))
}

fn decode_fixed<const N: usize>(field: &str, value: Option<&str>) -> Result<[u8; N]> {
    let encoded = required(field, value)?;
    let mut out = [0u8; N];
    hex::decode_to_slice(encoded, &mut out).map_err(|e| {
        SealError::with_kind_and_source(
            ErrorCategory::User,
            ErrorKind::CorruptedFile,
            format!("envelope field {} must be {} hex-encoded bytes", field, N),
            e,
        )
    })?;
    Ok(out)
}
