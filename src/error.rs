use std::error::Error as StdError;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorCategory {
    /// Any failure that cannot be confidently attributed to any other error
    /// category in this enum.
    ///
    /// In particular this means that use of Internal is never a guarantee
    /// the error is not, for example due to a user error - merely that it
    /// cannot be confidently determined by the code.
    Internal,

    /// The user provided invalid input or performed an action that is
    /// unsupported or impossible to complete.
    User,
}

/// Fine-grained condition flags for consumers that want to branch on error kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorKind {
    /// The password does not meet the minimum strength policy.
    WeakPassword,
    /// A key, salt or nonce had the wrong size. Always a bug in the caller.
    InvalidKeyMaterial,
    /// The container could not be decompressed or decoded, or a required
    /// envelope field is missing or malformed.
    CorruptedFile,
    /// The envelope carries no version field.
    MissingVersion,
    /// The envelope was produced by a protocol version we do not support.
    /// Carries the version string found in the envelope.
    UnsupportedVersion(String),
    /// Authenticated decryption failed. Wrong password, tampering and
    /// corruption of the sealed fields are deliberately indistinguishable.
    DecryptionFailed,
    /// Password could not be obtained from the configured reader.
    PassphraseUnavailable,
    /// The password and its confirmation did not match.
    PassphraseMismatch,
    /// Unexpected state reached within sealfile logic.
    InternalInvariant,
    /// Interaction with the filesystem, stdin/stdout, or other I/O failed.
    Io,
}

#[derive(Debug, Error)]
#[error("{msg}")]
pub struct SealError {
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

impl SealError {
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

    /// A malformed container or envelope.
    pub(crate) fn corrupted(msg: impl Into<String>) -> Self {
        Self::with_kind(ErrorCategory::User, ErrorKind::CorruptedFile, msg)
    }

    /// The single opaque authentication failure.
    pub(crate) fn decryption_failed() -> Self {
        Self::with_kind(
            ErrorCategory::User,
            ErrorKind::DecryptionFailed,
            "wrong password or corrupted data",
        )
    }

    /// The user-facing message carried by the error.
    pub fn message(&self) -> &str {
        &self.msg
    }

    /// Returns the preserved source error if present.
    pub fn source_error(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        self.source.as_deref()
    }

    /// The version string carried by an `UnsupportedVersion` error.
    pub fn unsupported_version(&self) -> Option<&str> {
        match &self.kind {
            Some(ErrorKind::UnsupportedVersion(found)) => Some(found),
            _ => None,
        }
    }

    /// Wraps the current error with a higher-level message while preserving the original as source.
    pub fn with_context(self, msg: impl Into<String>) -> Self {
        let category = self.category;
        let kind = self.kind.clone();
        Self {
            category,
            kind,
            source: Some(Box::new(self)),
            msg: msg.into(),
        }
    }

    /// Renders the message followed by every source in the chain,
    /// separated by `": "`.
    pub fn chain_message(&self) -> String {
        let mut out = self.msg.clone();
        let mut next = StdError::source(self);
        while let Some(err) = next {
            out.push_str(": ");
            out.push_str(&err.to_string());
            next = err.source();
        }
        out
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, SealError>;
