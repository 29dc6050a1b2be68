//! Durable storage contract for media records and tree snapshots.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use perceptual::{HashAlgorithm, MediaKind};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::backend::{BackendConfig, IndexBackend, Table};
use crate::record::MediaRecord;
use crate::snapshot::TreeSnapshot;
use crate::{CompressionConfig, IndexError};

/// Aggregate numbers about a store's contents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    pub total: usize,
    pub images: usize,
    pub videos: usize,
    /// Records carrying a fingerprint for each algorithm.
    pub by_algorithm: BTreeMap<HashAlgorithm, usize>,
    /// Approximate stored payload size in bytes.
    pub approx_bytes: u64,
}

/// The durable home of media records and per-algorithm tree snapshots.
///
/// Every data operation on a disconnected store fails with
/// [`IndexError::NotConnected`]. `connect` and `disconnect` are idempotent.
pub trait MediaStore: Send + Sync {
    fn connect(&self) -> Result<(), IndexError>;
    fn disconnect(&self) -> Result<(), IndexError>;
    fn is_connected(&self) -> bool;

    /// Insert or overwrite a record by id.
    fn save_media(&self, record: &MediaRecord) -> Result<(), IndexError>;
    fn get_media(&self, id: &str) -> Result<Option<MediaRecord>, IndexError>;
    /// Delete a record, returning whether it existed.
    fn delete_media(&self, id: &str) -> Result<bool, IndexError>;

    fn media_exists(&self, id: &str) -> Result<bool, IndexError> {
        Ok(self.get_media(id)?.is_some())
    }

    fn load_tree(&self, algorithm: HashAlgorithm) -> Result<Option<TreeSnapshot>, IndexError>;
    fn save_tree(
        &self,
        algorithm: HashAlgorithm,
        snapshot: &TreeSnapshot,
    ) -> Result<(), IndexError>;

    /// Stream every record to `visitor`; an error from the visitor stops the scan.
    fn scan(
        &self,
        visitor: &mut dyn FnMut(MediaRecord) -> Result<(), IndexError>,
    ) -> Result<(), IndexError>;

    /// Fetch the records that exist among `ids`, in request order.
    fn get_many(&self, ids: &[String]) -> Result<Vec<MediaRecord>, IndexError> {
        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(record) = self.get_media(id)? {
                out.push(record);
            }
        }
        Ok(out)
    }

    fn count(&self) -> Result<usize, IndexError> {
        let mut count = 0usize;
        self.scan(&mut |_| {
            count += 1;
            Ok(())
        })?;
        Ok(count)
    }

    fn stats(&self) -> Result<StoreStats, IndexError>;
}

/// Configuration for a [`KvMediaStore`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: BackendConfig,
    pub compression: CompressionConfig,
}

impl StoreConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_backend(mut self, backend: BackendConfig) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_compression(mut self, compression: CompressionConfig) -> Self {
        self.compression = compression;
        self
    }
}

/// [`MediaStore`] over a key-value [`IndexBackend`].
///
/// Records live in the `media` table keyed by id and snapshots in the
/// `trees` table keyed by algorithm name, all bincode-encoded and compressed
/// per the configured [`CompressionConfig`]. The backend is opened up front;
/// connection is a logical gate over it.
pub struct KvMediaStore {
    backend: Box<dyn IndexBackend>,
    compression: CompressionConfig,
    connected: AtomicBool,
}

impl KvMediaStore {
    /// Build the configured backend. The store starts disconnected.
    pub fn open(cfg: StoreConfig) -> Result<Self, IndexError> {
        let backend = cfg.backend.build()?;
        Ok(Self::with_backend(backend, cfg.compression))
    }

    /// Wrap an existing backend (e.g., in-memory for tests).
    pub fn with_backend(backend: Box<dyn IndexBackend>, compression: CompressionConfig) -> Self {
        Self {
            backend,
            compression,
            connected: AtomicBool::new(false),
        }
    }

    /// In-memory store, already connected.
    pub fn in_memory() -> Self {
        let store = Self::with_backend(
            Box::new(crate::InMemoryBackend::new()),
            CompressionConfig::default(),
        );
        store.connected.store(true, Ordering::SeqCst);
        store
    }

    fn ensure_connected(&self) -> Result<(), IndexError> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(IndexError::NotConnected)
        }
    }
}

impl MediaStore for KvMediaStore {
    fn connect(&self) -> Result<(), IndexError> {
        if !self.connected.swap(true, Ordering::SeqCst) {
            debug!("store_connected");
        }
        Ok(())
    }

    fn disconnect(&self) -> Result<(), IndexError> {
        if self.connected.load(Ordering::SeqCst) {
            self.backend.flush()?;
            self.connected.store(false, Ordering::SeqCst);
            debug!("store_disconnected");
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn save_media(&self, record: &MediaRecord) -> Result<(), IndexError> {
        self.ensure_connected()?;
        let payload = self.compression.encode(record)?;
        self.backend.put(Table::Media, &record.id, &payload)
    }

    fn get_media(&self, id: &str) -> Result<Option<MediaRecord>, IndexError> {
        self.ensure_connected()?;
        match self.backend.get(Table::Media, id)? {
            Some(data) => Ok(Some(self.compression.decode(&data)?)),
            None => Ok(None),
        }
    }

    fn delete_media(&self, id: &str) -> Result<bool, IndexError> {
        self.ensure_connected()?;
        self.backend.delete(Table::Media, id)
    }

    fn media_exists(&self, id: &str) -> Result<bool, IndexError> {
        self.ensure_connected()?;
        Ok(self.backend.get(Table::Media, id)?.is_some())
    }

    fn load_tree(&self, algorithm: HashAlgorithm) -> Result<Option<TreeSnapshot>, IndexError> {
        self.ensure_connected()?;
        match self.backend.get(Table::Trees, algorithm.as_str())? {
            Some(data) => Ok(Some(self.compression.decode(&data)?)),
            None => Ok(None),
        }
    }

    fn save_tree(
        &self,
        algorithm: HashAlgorithm,
        snapshot: &TreeSnapshot,
    ) -> Result<(), IndexError> {
        self.ensure_connected()?;
        let payload = self.compression.encode(snapshot)?;
        self.backend.put(Table::Trees, algorithm.as_str(), &payload)
    }

    fn scan(
        &self,
        visitor: &mut dyn FnMut(MediaRecord) -> Result<(), IndexError>,
    ) -> Result<(), IndexError> {
        self.ensure_connected()?;
        self.backend.scan(Table::Media, &mut |_, data| {
            let record: MediaRecord = self.compression.decode(data)?;
            visitor(record)
        })
    }

    fn get_many(&self, ids: &[String]) -> Result<Vec<MediaRecord>, IndexError> {
        self.ensure_connected()?;
        let mut seen = hashbrown::HashSet::with_capacity(ids.len());
        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            if !seen.insert(id.as_str()) {
                continue;
            }
            if let Some(data) = self.backend.get(Table::Media, id)? {
                out.push(self.compression.decode(&data)?);
            }
        }
        Ok(out)
    }

    fn count(&self) -> Result<usize, IndexError> {
        self.ensure_connected()?;
        self.backend.len(Table::Media)
    }

    fn stats(&self) -> Result<StoreStats, IndexError> {
        self.ensure_connected()?;
        let mut stats = StoreStats::default();
        self.backend.scan(Table::Media, &mut |key, data| {
            let record: MediaRecord = self.compression.decode(data)?;
            stats.total += 1;
            match record.kind {
                MediaKind::Image => stats.images += 1,
                MediaKind::Video => stats.videos += 1,
            }
            for algorithm in record.fingerprints.algorithms() {
                *stats.by_algorithm.entry(algorithm).or_insert(0) += 1;
            }
            stats.approx_bytes += (key.len() + data.len()) as u64;
            Ok(())
        })?;
        self.backend.scan(Table::Trees, &mut |key, data| {
            stats.approx_bytes += (key.len() + data.len()) as u64;
            Ok(())
        })?;
        Ok(stats)
    }
}
