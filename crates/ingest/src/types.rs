//! Input and output records of the ingest stage.
//!
//! ```text
//! RawMediaInput ──ingest()──▶ ValidatedMedia ──▶ decode + fingerprint
//! ```
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use perceptual::MediaKind;
use serde::{Deserialize, Serialize};

use crate::detect::MediaFormat;

/// Where the media bytes come from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum MediaPayload {
    /// In-memory encoded media.
    Bytes(Vec<u8>),
    /// Path to an encoded media file, read during ingest.
    File(PathBuf),
}

impl MediaPayload {
    /// Short label used in logs.
    pub fn label(&self) -> &'static str {
        match self {
            MediaPayload::Bytes(_) => "bytes",
            MediaPayload::File(_) => "file",
        }
    }
}

impl From<Vec<u8>> for MediaPayload {
    fn from(bytes: Vec<u8>) -> Self {
        MediaPayload::Bytes(bytes)
    }
}

impl From<PathBuf> for MediaPayload {
    fn from(path: PathBuf) -> Self {
        MediaPayload::File(path)
    }
}

/// A media item as handed to [`ingest`](crate::ingest).
///
/// ```rust
/// use ingest::{MediaPayload, RawMediaInput};
/// use serde_json::json;
///
/// let input = RawMediaInput::new(MediaPayload::Bytes(vec![1, 2, 3]))
///     .with_id("cat-01")
///     .with_metadata(json!({"album": "pets"}));
/// assert_eq!(input.id.as_deref(), Some("cat-01"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawMediaInput {
    /// Caller id. Generated when absent.
    pub id: Option<String>,
    pub payload: MediaPayload,
    /// Expected media kind. Needed only for containers the sniffer does not
    /// recognise; contradicting a detected format is an error.
    pub kind_hint: Option<MediaKind>,
    /// Opaque caller metadata; must be a JSON object or null.
    pub metadata: serde_json::Value,
}

impl RawMediaInput {
    pub fn new(payload: impl Into<MediaPayload>) -> Self {
        Self {
            id: None,
            payload: payload.into(),
            kind_hint: None,
            metadata: serde_json::Value::Null,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_kind_hint(mut self, kind: MediaKind) -> Self {
        self.kind_hint = Some(kind);
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }
}

/// A validated input, ready for decoding and fingerprinting.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedMedia {
    pub id: String,
    /// True when `id` was generated rather than supplied.
    pub id_generated: bool,
    pub kind: MediaKind,
    /// Sniffed container, when recognised.
    pub format: Option<MediaFormat>,
    pub bytes: Vec<u8>,
    /// Metadata object (`{}` when the caller sent null).
    pub metadata: serde_json::Value,
    pub received_at: DateTime<Utc>,
}

impl ValidatedMedia {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}
