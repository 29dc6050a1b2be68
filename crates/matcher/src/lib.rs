//! # MediaTwin Matcher (`matcher`)
//!
//! ## Purpose
//!
//! `matcher` sits on top of the index layer (`index`). It keeps one BK-tree
//! per fingerprint algorithm, loads and persists those trees through a
//! [`MediaStore`](index::MediaStore), and answers fused similarity queries:
//! range-search the primary algorithm's tree, fetch the candidate records,
//! optionally score them across several algorithms, and rank.
//!
//! ## Core Types
//!
//! - [`SimilarityEngine`]: tree ownership, initialization, rebuild, search.
//! - [`SearchOptions`]: primary algorithm, threshold, limit, optional weights.
//! - [`SearchHit`]: id, primary distance and similarity, fused score,
//!   stored metadata, and the full fingerprint set.
//! - [`fused_score`]: weighted mean of per-algorithm similarities.
//!
//! ## Example Usage
//!
//! ```
//! use std::sync::Arc;
//! use index::{KvMediaStore, MediaRecord, MediaStore};
//! use matcher::{SearchOptions, SimilarityEngine};
//! use perceptual::{Fingerprint, FingerprintSet, HashAlgorithm, MediaKind};
//! use serde_json::json;
//!
//! let store: Arc<dyn MediaStore> = Arc::new(KvMediaStore::in_memory());
//! let mut engine = SimilarityEngine::new(store.clone());
//! engine.initialize(&HashAlgorithm::ALL).unwrap();
//!
//! let mut set = FingerprintSet::new();
//! set.insert(HashAlgorithm::Structural, Fingerprint::from_u64(0xDEAD_BEEF));
//! let record = MediaRecord::new("cat", MediaKind::Image, set.clone(), json!({}));
//! store.save_media(&record).unwrap();
//! engine.add_to_trees(&record).unwrap();
//!
//! let hits = engine.search(&set, &SearchOptions::default()).unwrap();
//! assert_eq!(hits[0].id, "cat");
//! assert_eq!(hits[0].distance, 0);
//! ```
//!
//! ## Observability
//!
//! Install a [`MatchMetrics`] implementation via [`set_match_metrics`] to record
//! per-search latency and hit counts. Every search also emits a `tracing`
//! debug event.

pub mod engine;
pub mod metrics;
pub mod score;
pub mod types;

pub use crate::engine::SimilarityEngine;
pub use crate::metrics::{set_match_metrics, MatchMetrics};
pub use crate::score::fused_score;
pub use crate::types::{MatchError, ScoredCandidate, SearchHit, SearchOptions, Weights};
