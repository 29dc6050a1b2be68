use std::collections::BTreeMap;

use index::IndexError;
use perceptual::{FingerprintSet, HashAlgorithm, MediaKind};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;

/// Per-algorithm weights for fused scoring. Values lie in `[0, 1]` and need
/// not sum to one; they are renormalized over the algorithms observed for
/// each candidate.
pub type Weights = BTreeMap<HashAlgorithm, f64>;

/// Options for a single similarity search.
///
/// `SearchOptions` is cheap to clone and serde-friendly so it can be embedded
/// in higher-level configs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SearchOptions {
    /// Algorithm whose tree is range-searched (the primary algorithm).
    pub algorithm: HashAlgorithm,
    /// Maximum Hamming distance for the range search, `0..=bits`.
    pub threshold: u32,
    /// Maximum number of hits returned.
    pub limit: usize,
    /// Optional fusion weights. When present, hits are ranked by fused score.
    pub weights: Option<Weights>,
}

impl SearchOptions {
    pub(crate) const DEFAULT_THRESHOLD: u32 = 10;
    pub(crate) const DEFAULT_LIMIT: usize = 100;

    pub fn new(algorithm: HashAlgorithm) -> Self {
        Self {
            algorithm,
            ..Self::default()
        }
    }

    pub fn with_threshold(mut self, threshold: u32) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_weights(mut self, weights: Weights) -> Self {
        self.weights = Some(weights);
        self
    }

    /// Validate against the bit width of the fingerprints being searched.
    pub fn validate(&self, bits: u32) -> Result<(), MatchError> {
        if self.limit == 0 {
            return Err(MatchError::InvalidConfig(
                "limit must be greater than zero".into(),
            ));
        }
        if self.threshold > bits {
            return Err(MatchError::InvalidConfig(format!(
                "threshold {} exceeds fingerprint width {bits}",
                self.threshold
            )));
        }
        if let Some(weights) = &self.weights {
            for (algorithm, weight) in weights {
                if !(0.0..=1.0).contains(weight) {
                    return Err(MatchError::InvalidConfig(format!(
                        "weight for {algorithm} must be between 0.0 and 1.0, got {weight}"
                    )));
                }
            }
        }
        Ok(())
    }
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            algorithm: HashAlgorithm::Structural,
            threshold: Self::DEFAULT_THRESHOLD,
            limit: Self::DEFAULT_LIMIT,
            weights: None,
        }
    }
}

/// A candidate after distance collection and scoring, before projection.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCandidate {
    pub id: String,
    /// Distances for the algorithms actually compared.
    pub distances: BTreeMap<HashAlgorithm, u32>,
    pub primary_distance: u32,
    pub primary_similarity: f64,
    /// Fused score in `[0, 1]`.
    pub score: f64,
}

/// A single hit returned by the engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchHit {
    pub id: String,
    pub kind: MediaKind,
    /// Hamming distance under the primary algorithm.
    pub distance: u32,
    /// `1 - distance / bits` under the primary algorithm.
    pub similarity: f64,
    pub algorithm: HashAlgorithm,
    /// Fused score; equals `similarity` when no weights were given.
    pub score: f64,
    /// Stored metadata blob from the media record.
    pub metadata: JsonValue,
    pub fingerprints: FingerprintSet,
}

/// Errors produced by the matching layer.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MatchError {
    /// Invalid search options.
    #[error("invalid search options: {0}")]
    InvalidConfig(String),
    /// The engine has not been initialized (or was reset).
    #[error("similarity engine is not initialized")]
    NotReady,
    /// The query lacks a fingerprint for the primary algorithm.
    #[error("query has no {0} fingerprint")]
    MissingQueryFingerprint(HashAlgorithm),
    /// Store read or write failed.
    #[error("index error: {0}")]
    Index(#[from] IndexError),
}
