//! Payload loading, size enforcement, and media-kind resolution.

use std::fs;

use perceptual::MediaKind;

use crate::config::IngestConfig;
use crate::detect::{detect_format, MediaFormat};
use crate::error::IngestError;
use crate::types::MediaPayload;

/// Loads payload bytes, reading files from disk.
///
/// File sizes are checked against `max_payload_bytes` from metadata before
/// the file is read.
pub fn load_payload(payload: MediaPayload, cfg: &IngestConfig) -> Result<Vec<u8>, IngestError> {
    let bytes = match payload {
        MediaPayload::Bytes(bytes) => bytes,
        MediaPayload::File(path) => {
            if let Some(limit) = cfg.max_payload_bytes {
                let len = fs::metadata(&path)?.len();
                if len > limit as u64 {
                    return Err(too_large(len as usize, limit));
                }
            }
            fs::read(&path)?
        }
    };
    validate_payload_size(&bytes, cfg)?;
    Ok(bytes)
}

/// Rejects empty payloads and payloads over the configured limit.
pub fn validate_payload_size(bytes: &[u8], cfg: &IngestConfig) -> Result<(), IngestError> {
    if bytes.is_empty() {
        return Err(IngestError::EmptyPayload);
    }
    if let Some(limit) = cfg.max_payload_bytes {
        if bytes.len() > limit {
            return Err(too_large(bytes.len(), limit));
        }
    }
    Ok(())
}

fn too_large(len: usize, limit: usize) -> IngestError {
    IngestError::PayloadTooLarge(format!("payload size {len} exceeds limit of {limit}"))
}

/// Combines the sniffed format with the caller's hint.
///
/// | detected | hint | result |
/// |----------|------|--------|
/// | some | none | detected kind |
/// | some | same | detected kind |
/// | some | other | `KindMismatch` |
/// | none | some | hint |
/// | none | none | `UnsupportedMedia` |
pub fn resolve_kind(
    bytes: &[u8],
    hint: Option<MediaKind>,
) -> Result<(MediaKind, Option<MediaFormat>), IngestError> {
    match (detect_format(bytes), hint) {
        (Some(format), Some(hint)) if format.kind() != hint => Err(IngestError::KindMismatch {
            hint,
            detected: format.kind(),
        }),
        (Some(format), _) => Ok((format.kind(), Some(format))),
        (None, Some(hint)) => Ok((hint, None)),
        (None, None) => Err(IngestError::UnsupportedMedia(format!(
            "no known image or video signature in {} leading bytes",
            bytes.len().min(16)
        ))),
    }
}
