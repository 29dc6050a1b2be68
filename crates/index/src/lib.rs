//! # MediaTwin Index
//!
//! Metric indexing and persistence for perceptual fingerprints.
//!
//! ## Core Features
//!
//! - **BK-tree**: [`BkTree`] answers "every fingerprint within Hamming
//!   distance `t` of this one" without comparing against every stored item,
//!   pruning subtrees with the triangle inequality.
//! - **Snapshots**: trees flatten into a [`TreeSnapshot`] that is validated
//!   on load, so a corrupt snapshot never yields a silently wrong tree.
//! - **Storage contract**: [`MediaStore`] is the durable home of
//!   [`MediaRecord`]s and tree snapshots. [`KvMediaStore`] implements it over
//!   any [`IndexBackend`]:
//!   - an in-memory backend for tests and ephemeral use;
//!   - a Redb backend for on-disk storage (feature `backend-redb`, default).
//! - **Compact payloads**: records and snapshots are encoded with `bincode`
//!   and compressed with Zstd by default ([`CompressionConfig`]).
//!
//! ## Example Usage
//!
//! ```
//! use index::{BkTree, KvMediaStore, MediaRecord, MediaStore, StoreConfig};
//! use perceptual::{Fingerprint, FingerprintSet, HashAlgorithm, MediaKind};
//! use serde_json::json;
//!
//! let mut tree = BkTree::new();
//! tree.insert(Fingerprint::from_u64(0b1010), "a");
//! tree.insert(Fingerprint::from_u64(0b1011), "b");
//! tree.insert(Fingerprint::from_u64(u64::MAX), "c");
//! let hits = tree.search(&Fingerprint::from_u64(0b1010), 1);
//! assert_eq!(hits.len(), 2);
//!
//! let store = KvMediaStore::open(StoreConfig::default()).unwrap();
//! store.connect().unwrap();
//! let mut set = FingerprintSet::new();
//! set.insert(HashAlgorithm::Structural, Fingerprint::from_u64(0b1010));
//! store
//!     .save_media(&MediaRecord::new("a", MediaKind::Image, set, json!({"title": "cat"})))
//!     .unwrap();
//! assert!(store.media_exists("a").unwrap());
//! ```

mod backend;
pub mod bktree;
mod record;
pub mod snapshot;
mod store;

pub(crate) mod metadata_serde {
    use serde::de::Error as DeError;
    use serde::ser::Error as SerError;
    use serde::{Deserialize, Deserializer, Serializer};
    use serde_json::Value;

    pub(crate) fn serialize<S>(value: &Value, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let bytes = serde_json::to_vec(value).map_err(SerError::custom)?;
        serializer.serialize_bytes(&bytes)
    }

    pub(crate) fn deserialize<'de, D>(deserializer: D) -> Result<Value, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bytes = Vec::<u8>::deserialize(deserializer)?;
        serde_json::from_slice(&bytes).map_err(DeError::custom)
    }
}

#[cfg(feature = "backend-redb")]
pub use backend::RedbBackend;
pub use backend::{BackendConfig, InMemoryBackend, IndexBackend, Table};
pub use bktree::{BkTree, TreeMatch, TreeStats};
pub use record::MediaRecord;
pub use snapshot::{SnapshotNode, TreeSnapshot};
pub use store::{KvMediaStore, MediaStore, StoreConfig, StoreStats};

use bincode::config::standard;
use bincode::error::{DecodeError, EncodeError};
use bincode::serde::{decode_from_slice, encode_to_vec};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use zstd::{decode_all, encode_all};

/// Bump this value whenever the on-disk `MediaRecord` layout changes.
pub const INDEX_SCHEMA_VERSION: u16 = 1;

/// Compression codec options for stored payloads.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionCodec {
    /// No compression (useful for debugging or when storage is not a concern).
    None,
    /// Zstd compression (default, good balance of speed and ratio).
    #[default]
    Zstd,
}

/// Compression behavior configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressionConfig {
    pub codec: CompressionCodec,
    /// Compression level (1-22 for Zstd, where higher = better compression but slower).
    pub level: i32,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            codec: CompressionCodec::default(),
            level: 3,
        }
    }
}

impl CompressionConfig {
    pub fn new(codec: CompressionCodec, level: i32) -> Self {
        Self { codec, level }
    }

    pub fn with_codec(mut self, codec: CompressionCodec) -> Self {
        self.codec = codec;
        self
    }

    pub fn with_level(mut self, level: i32) -> Self {
        self.level = level;
        self
    }

    fn compress(&self, data: &[u8]) -> Result<Vec<u8>, IndexError> {
        match self.codec {
            CompressionCodec::None => Ok(data.to_vec()),
            CompressionCodec::Zstd => Ok(encode_all(data, self.level)?),
        }
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, IndexError> {
        match self.codec {
            CompressionCodec::None => Ok(data.to_vec()),
            CompressionCodec::Zstd => Ok(decode_all(data)?),
        }
    }

    /// Encode with bincode, then compress.
    pub fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, IndexError> {
        let encoded = encode_to_vec(value, standard())?;
        self.compress(&encoded)
    }

    /// Decompress, then decode with bincode.
    pub fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, IndexError> {
        let decompressed = self.decompress(data)?;
        let (value, _) = decode_from_slice(&decompressed, standard())?;
        Ok(value)
    }
}

/// Errors raised by the index, snapshots, and stores.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IndexError {
    #[error("Backend error: {0}")]
    Backend(String),
    #[error("Serialization encode error: {0}")]
    Encode(String),
    #[error("Serialization decode error: {0}")]
    Decode(String),
    #[error("Compression error: {0}")]
    Zstd(String),
    #[error("Corrupt tree snapshot: {0}")]
    CorruptSnapshot(String),
    #[error("Store is not connected")]
    NotConnected,
}

impl From<EncodeError> for IndexError {
    fn from(e: EncodeError) -> Self {
        IndexError::Encode(e.to_string())
    }
}

impl From<DecodeError> for IndexError {
    fn from(e: DecodeError) -> Self {
        IndexError::Decode(e.to_string())
    }
}

impl From<std::io::Error> for IndexError {
    fn from(e: std::io::Error) -> Self {
        IndexError::Zstd(e.to_string())
    }
}

impl IndexError {
    pub fn backend<E: std::fmt::Display>(err: E) -> Self {
        Self::Backend(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use perceptual::{Fingerprint, FingerprintSet, HashAlgorithm, MediaKind};
    use serde_json::json;

    fn sample_record() -> MediaRecord {
        let mut set = FingerprintSet::new();
        set.insert(HashAlgorithm::Structural, Fingerprint::from_u64(0x00ff_00ff_00ff_00ff));
        set.insert(HashAlgorithm::Average, Fingerprint::from_u64(7));
        MediaRecord::new("img-1", MediaKind::Image, set, json!({"tags": ["a", "b"], "w": 640}))
    }

    #[test]
    fn record_codec_roundtrip_zstd() {
        let codec = CompressionConfig::default();
        let record = sample_record();
        let bytes = codec.encode(&record).unwrap();
        let back: MediaRecord = codec.decode(&bytes).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn record_codec_roundtrip_uncompressed() {
        let codec = CompressionConfig::default().with_codec(CompressionCodec::None);
        let record = sample_record();
        let back: MediaRecord = codec.decode(&codec.encode(&record).unwrap()).unwrap();
        assert_eq!(back.metadata, record.metadata);
        assert_eq!(back.fingerprints, record.fingerprints);
    }

    #[test]
    fn snapshot_codec_roundtrip() {
        let mut tree = BkTree::new();
        tree.insert(Fingerprint::from_u64(1), "a");
        tree.insert(Fingerprint::from_u64(3), "b");
        let codec = CompressionConfig::default();
        let snap = tree.snapshot();
        let back: TreeSnapshot = codec.decode(&codec.encode(&snap).unwrap()).unwrap();
        assert_eq!(back, snap);
    }

    #[test]
    fn garbage_payload_is_a_decode_error() {
        let codec = CompressionConfig::default();
        let err = codec.decode::<MediaRecord>(b"not zstd").unwrap_err();
        assert!(matches!(err, IndexError::Zstd(_)));
    }

    #[test]
    fn error_display() {
        assert_eq!(IndexError::NotConnected.to_string(), "Store is not connected");
        assert!(IndexError::CorruptSnapshot("x".into())
            .to_string()
            .contains("Corrupt tree snapshot"));
    }
}
