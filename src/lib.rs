//! Workspace umbrella crate for MediaTwin.
//!
//! This crate stitches together ingest validation, perceptual fingerprinting,
//! the per-algorithm BK-tree index, and fused similarity search behind a
//! single [`MediaTwin`] facade.
//!
//! ```
//! use mediatwin::{MediaTwin, MediaTwinConfig, RawMediaInput, SearchOptions};
//! use image::{ImageFormat, Rgb, RgbImage};
//! use std::io::Cursor;
//!
//! fn png(seed: u8) -> Vec<u8> {
//!     let img = RgbImage::from_fn(64, 64, |x, y| {
//!         Rgb([(x as u8).wrapping_mul(seed), (y * 4) as u8, seed])
//!     });
//!     let mut out = Cursor::new(Vec::new());
//!     img.write_to(&mut out, ImageFormat::Png).unwrap();
//!     out.into_inner()
//! }
//!
//! let mut twin = MediaTwin::in_memory(MediaTwinConfig::default()).unwrap();
//! twin.connect().unwrap();
//! twin.add(RawMediaInput::new(png(3)).with_id("a")).unwrap();
//!
//! let hits = twin
//!     .search(RawMediaInput::new(png(3)), &SearchOptions::default())
//!     .unwrap();
//! assert_eq!(hits[0].id, "a");
//! assert_eq!(hits[0].distance, 0);
//! twin.disconnect().unwrap();
//! ```

pub mod batch;
pub mod config;

pub use index::{
    BackendConfig, IndexError, KvMediaStore, MediaRecord, MediaStore, StoreConfig, StoreStats,
    TreeStats,
};
pub use ingest::{IdStrategy, IngestConfig, IngestError, MediaPayload, RawMediaInput};
pub use matcher::{MatchError, SearchHit, SearchOptions, SimilarityEngine, Weights};
pub use perceptual::{
    AspectPolicy, BitWidth, Fingerprint, FingerprintSet, FrameSource, HashAlgorithm, MediaKind,
    PerceptualConfig, PerceptualError, VideoConfig, VideoFingerprints,
};

pub use crate::batch::{BatchFailure, BatchOptions, BatchReport};
pub use crate::config::{ConfigLoadError, MediaTwinConfig};

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use ingest::{ingest, resolve_kind, validate_payload_size};
use perceptual::{decode_image, MediaHasher};
use rayon::prelude::*;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn, Level};

/// Errors surfaced by [`MediaTwin`].
#[derive(Debug, Error)]
pub enum TwinError {
    #[error("ingest failure: {0}")]
    Ingest(#[from] IngestError),
    #[error("fingerprinting failed: {0}")]
    Perceptual(#[from] PerceptualError),
    #[error("storage failure: {0}")]
    Index(#[from] IndexError),
    #[error("search failed: {0}")]
    Match(#[from] MatchError),
    #[error("configuration error: {0}")]
    Config(#[from] ConfigLoadError),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("unsupported media: {0}")]
    UnsupportedMedia(String),
    #[error("MediaTwin is not connected")]
    NotConnected,
    #[error("media not found: {0}")]
    NotFound(String),
    /// A batch without `continue_on_error` stopped at `index`; the `applied`
    /// records before it stay stored.
    #[error("batch aborted at input {index} after {applied} added: {source}")]
    BatchAborted {
        index: usize,
        applied: usize,
        #[source]
        source: Box<TwinError>,
    },
}

/// Opens encoded video bytes as a seekable frame source.
///
/// MediaTwin ships no container demuxer; plug in ffmpeg bindings or similar.
pub trait VideoDecoder: Send + Sync {
    fn open<'a>(&self, bytes: &'a [u8]) -> Result<Box<dyn FrameSource + 'a>, PerceptualError>;
}

/// Fingerprints of an arbitrary media payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComputedFingerprints {
    pub kind: MediaKind,
    pub fingerprints: FingerprintSet,
    /// Per-frame sets and collage hash; videos only.
    pub video: Option<VideoFingerprints>,
}

/// Combined store and tree statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TwinStats {
    pub store: StoreStats,
    pub trees: BTreeMap<HashAlgorithm, TreeStats>,
}

/// Orchestrates ingest, fingerprinting, storage, and search.
///
/// `Disconnected → connect() → Connected → disconnect() → Disconnected`.
/// Mutating calls take `&mut self`; share an instance across threads behind
/// a `RwLock`.
pub struct MediaTwin {
    config: MediaTwinConfig,
    hasher: MediaHasher,
    store: Arc<dyn MediaStore>,
    engine: SimilarityEngine,
    video_decoder: Option<Arc<dyn VideoDecoder>>,
    connected: bool,
}

impl MediaTwin {
    /// Build a facade over the store described by `config.store`.
    pub fn new(config: MediaTwinConfig) -> Result<Self, TwinError> {
        config.validate()?;
        let store: Arc<dyn MediaStore> = Arc::new(KvMediaStore::open(config.store.clone())?);
        Self::with_store(config, store)
    }

    /// Build a facade from a YAML configuration file.
    pub fn from_config_file<P: AsRef<Path>>(path: P) -> Result<Self, TwinError> {
        Self::new(MediaTwinConfig::from_file(path)?)
    }

    /// Build a facade over an in-memory store, ignoring `config.store`.
    pub fn in_memory(config: MediaTwinConfig) -> Result<Self, TwinError> {
        Self::with_store(config, Arc::new(KvMediaStore::in_memory()))
    }

    /// Build a facade over a caller-provided store.
    pub fn with_store(config: MediaTwinConfig, store: Arc<dyn MediaStore>) -> Result<Self, TwinError> {
        config.validate()?;
        let hasher = MediaHasher::new(config.perceptual.clone())?;
        let engine = SimilarityEngine::new(Arc::clone(&store));
        Ok(Self {
            config,
            hasher,
            store,
            engine,
            video_decoder: None,
            connected: false,
        })
    }

    /// Enable video inputs.
    pub fn with_video_decoder(mut self, decoder: Arc<dyn VideoDecoder>) -> Self {
        self.video_decoder = Some(decoder);
        self
    }

    pub fn config(&self) -> &MediaTwinConfig {
        &self.config
    }

    pub fn engine(&self) -> &SimilarityEngine {
        &self.engine
    }

    pub fn store(&self) -> &Arc<dyn MediaStore> {
        &self.store
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    fn ensure_connected(&self) -> Result<(), TwinError> {
        if self.connected {
            Ok(())
        } else {
            Err(TwinError::NotConnected)
        }
    }

    fn algorithms(&self) -> Vec<HashAlgorithm> {
        self.config.perceptual.algorithms.clone()
    }

    /// Connect the store and load the trees. Idempotent.
    ///
    /// A corrupt tree snapshot is logged and the trees are rebuilt from the
    /// stored records.
    pub fn connect(&mut self) -> Result<(), TwinError> {
        if self.connected {
            return Ok(());
        }
        self.store.connect()?;
        let algorithms = self.algorithms();
        match self.engine.initialize(&algorithms) {
            Ok(()) => {}
            Err(MatchError::Index(IndexError::CorruptSnapshot(reason))) => {
                warn!(reason = %reason, "tree_snapshot_corrupt_rebuilding");
                self.engine.rebuild_trees(&algorithms)?;
            }
            Err(err) => return Err(err.into()),
        }
        self.connected = true;
        info!(algorithms = algorithms.len(), "mediatwin_connected");
        Ok(())
    }

    /// Persist the trees and disconnect the store. Idempotent.
    pub fn disconnect(&mut self) -> Result<(), TwinError> {
        if !self.connected {
            return Ok(());
        }
        self.engine.persist_trees()?;
        self.engine.reset();
        self.store.disconnect()?;
        self.connected = false;
        info!("mediatwin_disconnected");
        Ok(())
    }

    /// Fingerprint arbitrary media without storing it.
    pub fn compute_fingerprints(&self, bytes: &[u8]) -> Result<ComputedFingerprints, TwinError> {
        validate_payload_size(bytes, &self.config.ingest)?;
        let (kind, _) = resolve_kind(bytes, None)?;
        self.fingerprint_media(kind, bytes)
    }

    fn fingerprint_media(&self, kind: MediaKind, bytes: &[u8]) -> Result<ComputedFingerprints, TwinError> {
        match kind {
            MediaKind::Image => {
                let img = decode_image(bytes)?;
                Ok(ComputedFingerprints {
                    kind,
                    fingerprints: self.hasher.compute_image(&img)?,
                    video: None,
                })
            }
            MediaKind::Video => {
                let decoder = self.video_decoder.as_ref().ok_or_else(|| {
                    TwinError::UnsupportedMedia("video input but no video decoder configured".into())
                })?;
                let source = decoder.open(bytes)?;
                let (fingerprints, video) = self.hasher.compute_video(source.as_ref())?;
                Ok(ComputedFingerprints {
                    kind,
                    fingerprints,
                    video: Some(video),
                })
            }
        }
    }

    /// Validate and fingerprint one input into an unsaved record.
    fn build_record(&self, input: RawMediaInput) -> Result<MediaRecord, TwinError> {
        let media = ingest(input, &self.config.ingest)?;
        let computed = self.fingerprint_media(media.kind, &media.bytes)?;
        let record = MediaRecord::new(media.id, media.kind, computed.fingerprints, media.metadata);
        Ok(match computed.video {
            Some(video) => record.with_video(video),
            None => record,
        })
    }

    /// Save a record and add it to the trees. Re-adding an id overwrites the
    /// stored record but keeps its creation time.
    fn apply(&mut self, record: MediaRecord) -> Result<MediaRecord, TwinError> {
        let record = match self.store.get_media(&record.id)? {
            Some(previous) => record.replacing(&previous),
            None => record,
        };
        self.store.save_media(&record)?;
        self.engine.add_to_trees(&record)?;
        Ok(record)
    }

    fn persist_if_auto(&self) -> Result<(), TwinError> {
        if self.config.auto_persist {
            self.engine.persist_trees()?;
        }
        Ok(())
    }

    /// Validate, fingerprint, store, and index one media item.
    pub fn add(&mut self, input: RawMediaInput) -> Result<MediaRecord, TwinError> {
        self.ensure_connected()?;
        let start = Instant::now();
        let span = tracing::span!(Level::INFO, "mediatwin.add", id = ?input.id);
        let _guard = span.enter();

        let record = self.build_record(input)?;
        let record = self.apply(record)?;
        self.persist_if_auto()?;
        info!(
            id = %record.id,
            kind = %record.kind,
            algorithms = record.fingerprints.len(),
            elapsed_micros = start.elapsed().as_micros(),
            "media_added"
        );
        Ok(record)
    }

    /// Add many inputs, `options.chunk_size` at a time.
    ///
    /// Inputs within a chunk are fingerprinted concurrently; results are
    /// applied in input order. `progress(completed, total)` fires once per
    /// finished chunk. Without `continue_on_error` the first failure aborts
    /// the batch with [`TwinError::BatchAborted`]; earlier inputs stay added.
    pub fn add_batch<F>(
        &mut self,
        inputs: Vec<RawMediaInput>,
        options: &BatchOptions,
        mut progress: F,
    ) -> Result<BatchReport, TwinError>
    where
        F: FnMut(usize, usize),
    {
        self.ensure_connected()?;
        options.validate()?;
        let start = Instant::now();
        let total = inputs.len();
        let mut report = BatchReport::default();
        let mut completed = 0usize;
        let mut pending = inputs.into_iter().enumerate();

        loop {
            let chunk: Vec<(usize, RawMediaInput)> =
                pending.by_ref().take(options.chunk_size).collect();
            if chunk.is_empty() {
                break;
            }
            let chunk_len = chunk.len();

            let prepared: Vec<(usize, Option<String>, Result<MediaRecord, TwinError>)> = {
                let this = &*self;
                chunk
                    .into_par_iter()
                    .map(|(index, input)| {
                        let id = input.id.clone();
                        (index, id, this.build_record(input))
                    })
                    .collect()
            };

            for (index, id, result) in prepared {
                match result.and_then(|record| self.apply(record)) {
                    Ok(record) => report.added.push(record),
                    Err(error) if options.continue_on_error => {
                        warn!(index, id = ?id, error = %error, "batch_item_failed");
                        report.failures.push(BatchFailure { index, id, error });
                    }
                    Err(error) => {
                        warn!(index, id = ?id, error = %error, "batch_aborted");
                        self.persist_if_auto()?;
                        return Err(TwinError::BatchAborted {
                            index,
                            applied: report.added.len(),
                            source: Box::new(error),
                        });
                    }
                }
            }

            completed += chunk_len;
            progress(completed, total);
        }

        if !report.added.is_empty() {
            self.persist_if_auto()?;
        }
        info!(
            total,
            added = report.added.len(),
            failed = report.failures.len(),
            elapsed_micros = start.elapsed().as_micros(),
            "batch_completed"
        );
        Ok(report)
    }

    /// Fingerprint `input` without storing it and search for similar media.
    pub fn search(
        &self,
        input: RawMediaInput,
        options: &SearchOptions,
    ) -> Result<Vec<SearchHit>, TwinError> {
        self.ensure_connected()?;
        let span = tracing::span!(Level::INFO, "mediatwin.search", algorithm = %options.algorithm);
        let _guard = span.enter();

        options.validate(self.config.perceptual.bits.bits())?;
        let media = ingest(input, &self.config.ingest)?;
        let computed = self.fingerprint_media(media.kind, &media.bytes)?;
        Ok(self.engine.search(&computed.fingerprints, options)?)
    }

    /// Search with a stored record's fingerprints. The record itself is not
    /// among the hits.
    pub fn search_by_id(&self, id: &str, options: &SearchOptions) -> Result<Vec<SearchHit>, TwinError> {
        self.ensure_connected()?;
        options.validate(self.config.perceptual.bits.bits())?;
        let record = self
            .store
            .get_media(id)?
            .ok_or_else(|| TwinError::NotFound(id.to_string()))?;
        let widened = options.clone().with_limit(options.limit.saturating_add(1));
        let mut hits = self.engine.search(&record.fingerprints, &widened)?;
        hits.retain(|hit| hit.id != id);
        hits.truncate(options.limit);
        Ok(hits)
    }

    pub fn get(&self, id: &str) -> Result<Option<MediaRecord>, TwinError> {
        self.ensure_connected()?;
        Ok(self.store.get_media(id)?)
    }

    /// Delete a record and drop it from the trees. Returns whether the record
    /// existed.
    pub fn remove(&mut self, id: &str) -> Result<bool, TwinError> {
        self.ensure_connected()?;
        let existed = self.store.delete_media(id)?;
        let indexed = self.engine.remove_from_trees(id)?;
        if indexed {
            self.persist_if_auto()?;
        }
        info!(id, existed, indexed, "media_removed");
        Ok(existed)
    }

    /// Rebuild every tree from the stored records. Returns the record count.
    pub fn rebuild_index(&mut self) -> Result<usize, TwinError> {
        self.ensure_connected()?;
        let algorithms = self.algorithms();
        Ok(self.engine.rebuild_trees(&algorithms)?)
    }

    /// Persist the trees now.
    pub fn persist(&self) -> Result<(), TwinError> {
        self.ensure_connected()?;
        self.engine.persist_trees()?;
        Ok(())
    }

    pub fn stats(&self) -> Result<TwinStats, TwinError> {
        self.ensure_connected()?;
        Ok(TwinStats {
            store: self.store.stats()?,
            trees: self.engine.tree_stats(),
        })
    }
}
