//! On-disk container: CBOR-encoded record, zstd-compressed.

use tracing::trace;

use crate::error::{ErrorCategory, ErrorKind, Result, SealError};
use crate::record::EnvelopeRecord;

/// Hex-encoded ciphertext compresses to roughly half its size, so a genuine
/// container never expands by more than this factor.
const MAX_EXPANSION: usize = 4;

/// Allowance for the record keys and the fixed-width fields of tiny
/// envelopes.
const DECODE_HEADROOM: usize = 4096;

/// Upper bound on the decompressed size of a `compressed_len`-byte container.
fn max_decoded_len(compressed_len: usize) -> usize {
    compressed_len
        .saturating_mul(MAX_EXPANSION)
        .saturating_add(DECODE_HEADROOM)
}

/// Serializes and compresses a record at the maximum zstd level.
pub fn encode(record: &EnvelopeRecord) -> Result<Vec<u8>> {
    let mut cbor = Vec::new();
    ciborium::into_writer(record, &mut cbor).map_err(|e| {
        SealError::with_kind(
            ErrorCategory::Internal,
            ErrorKind::InternalInvariant,
            format!("failed to encode envelope: {}", e),
        )
    })?;

    let level = *zstd::compression_level_range().end();
    let compressed = zstd::bulk::compress(&cbor, level).map_err(|e| {
        SealError::with_kind_and_source(
            ErrorCategory::Internal,
            ErrorKind::InternalInvariant,
            "failed to compress envelope",
            e,
        )
    })?;

    trace!(
        encoded = cbor.len(),
        compressed = compressed.len(),
        zstd_level = level,
        "encoded envelope container"
    );
    Ok(compressed)
}

/// Decompresses and deserializes a container into its record.
///
/// Any failure is reported as `CorruptedFile`; the record itself is not
/// validated here. Decompressed output is capped by
/// [`max_decoded_len`], so a small crafted blob cannot expand without
/// bound.
pub fn decode(blob: &[u8]) -> Result<EnvelopeRecord> {
    let cbor = zstd::bulk::decompress(blob, max_decoded_len(blob.len())).map_err(|e| {
        SealError::with_kind_and_source(
            ErrorCategory::User,
            ErrorKind::CorruptedFile,
            "input is not a sealfile container (decompression failed)",
            e,
        )
    })?;

    let record: EnvelopeRecord = ciborium::from_reader(cbor.as_slice()).map_err(|e| {
        SealError::corrupted(format!(
            "input is not a sealfile container (decoding failed: {})",
            e
        ))
    })?;

    trace!(
        compressed = blob.len(),
        encoded = cbor.len(),
        "decoded envelope container"
    );
    Ok(record)
}
