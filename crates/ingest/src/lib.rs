//! MediaTwin Ingest Layer
//!
//! This is where media enters the pipeline. We take raw bytes (or a file
//! path) plus caller metadata, validate everything up front, and hand back a
//! [`ValidatedMedia`] that the fingerprinting stage can trust.
//!
//! ## What we do here
//!
//! - **Validate ids** - Trim, strip control characters, enforce a length limit.
//! - **Generate ids** - Random UUIDv4 by default, or a UUIDv5 derived from the
//!   bytes so re-ingesting the same file yields the same id.
//! - **Detect media type** - Magic-byte sniffing for common image and video
//!   containers ([`detect_format`]).
//! - **Enforce policies** - Payload and metadata size limits.
//! - **Log everything** - Structured logs via tracing.
//!
//! ## Example
//!
//! ```
//! use ingest::{ingest, IngestConfig, MediaPayload, RawMediaInput};
//! use perceptual::MediaKind;
//! use serde_json::json;
//!
//! let png_header = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];
//! let input = RawMediaInput::new(MediaPayload::Bytes(png_header))
//!     .with_id("  holiday-01 ")
//!     .with_metadata(json!({"album": "2024"}));
//!
//! let media = ingest(input, &IngestConfig::default()).unwrap();
//! assert_eq!(media.id, "holiday-01");
//! assert_eq!(media.kind, MediaKind::Image);
//! ```
use std::time::Instant;

use chrono::Utc;
use tracing::{info, warn, Level};

mod config;
mod detect;
mod error;
mod metadata;
mod payload;
mod types;

pub use crate::config::{ConfigError, IdStrategy, IngestConfig};
pub use crate::detect::{detect_format, detect_media_kind, MediaFormat};
pub use crate::error::IngestError;
pub use crate::payload::{load_payload, resolve_kind, validate_payload_size};
pub use crate::types::{MediaPayload, RawMediaInput, ValidatedMedia};

/// Validate a raw media input: id, payload, media kind, and metadata.
pub fn ingest(raw: RawMediaInput, cfg: &IngestConfig) -> Result<ValidatedMedia, IngestError> {
    let start = Instant::now();
    let RawMediaInput {
        id,
        payload,
        kind_hint,
        metadata,
    } = raw;

    let supplied_id = match id.map(|id| metadata::sanitize_id(id, cfg)).transpose() {
        Ok(id) => id,
        Err(err) => {
            let elapsed_micros = start.elapsed().as_micros();
            warn!(error = %err, elapsed_micros, "ingest_failure");
            return Err(err);
        }
    };

    let span = tracing::span!(
        Level::INFO,
        "ingest.ingest",
        record_id = supplied_id.as_deref().unwrap_or("<generated>"),
        payload = payload.label()
    );
    let _guard = span.enter();

    match ingest_inner(supplied_id, payload, kind_hint, metadata, cfg) {
        Ok(media) => {
            let elapsed_micros = start.elapsed().as_micros();
            info!(
                id = %media.id,
                id_generated = media.id_generated,
                kind = %media.kind,
                format = ?media.format,
                payload_len = media.len(),
                elapsed_micros,
                "ingest_success"
            );
            Ok(media)
        }
        Err(err) => {
            let elapsed_micros = start.elapsed().as_micros();
            warn!(
                kind_hint = ?kind_hint,
                error = %err,
                elapsed_micros,
                "ingest_failure"
            );
            Err(err)
        }
    }
}

fn ingest_inner(
    supplied_id: Option<String>,
    payload: MediaPayload,
    kind_hint: Option<perceptual::MediaKind>,
    metadata: serde_json::Value,
    cfg: &IngestConfig,
) -> Result<ValidatedMedia, IngestError> {
    // Metadata is cheap to check, so it goes before any file I/O.
    let metadata = metadata::normalize_metadata(metadata, cfg)?;
    let bytes = load_payload(payload, cfg)?;
    let (kind, format) = resolve_kind(&bytes, kind_hint)?;

    let (id, id_generated) = match supplied_id {
        Some(id) => (id, false),
        None => (metadata::generate_id(cfg, &bytes), true),
    };

    Ok(ValidatedMedia {
        id,
        id_generated,
        kind,
        format,
        bytes,
        metadata,
        received_at: Utc::now(),
    })
}
