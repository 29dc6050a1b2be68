use chrono::{DateTime, Utc};
use perceptual::{FingerprintSet, HashAlgorithm, MediaKind, VideoFingerprints};
use serde::{Deserialize, Serialize};

use crate::{metadata_serde, INDEX_SCHEMA_VERSION};

/// A stored media item: its identity, fingerprints, and caller metadata.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct MediaRecord {
    /// Schema version for backward compatibility when deserializing.
    #[serde(default = "default_schema_version")]
    pub schema_version: u16,
    pub id: String,
    pub kind: MediaKind,
    pub fingerprints: FingerprintSet,
    /// Per-frame fingerprints and collage hash; videos only.
    pub video: Option<VideoFingerprints>,
    /// Opaque caller metadata (JSON).
    #[serde(with = "metadata_serde")]
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const fn default_schema_version() -> u16 {
    INDEX_SCHEMA_VERSION
}

impl MediaRecord {
    /// New record stamped with the current time.
    pub fn new(
        id: impl Into<String>,
        kind: MediaKind,
        fingerprints: FingerprintSet,
        metadata: serde_json::Value,
    ) -> Self {
        let now = Utc::now();
        Self {
            schema_version: INDEX_SCHEMA_VERSION,
            id: id.into(),
            kind,
            fingerprints,
            video: None,
            metadata,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_video(mut self, video: VideoFingerprints) -> Self {
        self.video = Some(video);
        self
    }

    pub fn has_algorithm(&self, algorithm: HashAlgorithm) -> bool {
        self.fingerprints.contains(algorithm)
    }

    /// Carry the original creation time over from a record being replaced.
    pub fn replacing(mut self, previous: &MediaRecord) -> Self {
        self.created_at = previous.created_at;
        self
    }
}
