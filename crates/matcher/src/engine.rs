use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use index::{BkTree, MediaRecord, MediaStore, TreeMatch, TreeStats};
use perceptual::{distance_to_similarity, FingerprintSet, HashAlgorithm};
use tracing::{debug, info};

use crate::metrics::metrics_recorder;
use crate::score::fused_score;
use crate::types::{MatchError, ScoredCandidate, SearchHit, SearchOptions};


/// Fused similarity search over one BK-tree per fingerprint algorithm.
///
/// The engine is the single owner of its trees: mutation takes `&mut self`,
/// search takes `&self`. Records live in the shared [`MediaStore`].
pub struct SimilarityEngine {
    store: Arc<dyn MediaStore>,
    trees: BTreeMap<HashAlgorithm, BkTree>,
    ready: bool,
}

impl SimilarityEngine {
    /// Construct an engine over a shared store. Call [`initialize`](Self::initialize)
    /// or [`rebuild_trees`](Self::rebuild_trees) before searching.
    pub fn new(store: Arc<dyn MediaStore>) -> Self {
        Self {
            store,
            trees: BTreeMap::new(),
            ready: false,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Algorithms with a live tree.
    pub fn algorithms(&self) -> Vec<HashAlgorithm> {
        self.trees.keys().copied().collect()
    }

    pub fn tree(&self, algorithm: HashAlgorithm) -> Option<&BkTree> {
        self.trees.get(&algorithm)
    }

    pub fn store(&self) -> &Arc<dyn MediaStore> {
        &self.store
    }

    fn ensure_ready(&self) -> Result<(), MatchError> {
        if self.ready {
            Ok(())
        } else {
            Err(MatchError::NotReady)
        }
    }

    /// Load the persisted snapshot for each algorithm, or start an empty tree.
    pub fn initialize(&mut self, algorithms: &[HashAlgorithm]) -> Result<(), MatchError> {
        let mut trees = BTreeMap::new();
        for &algorithm in algorithms {
            let tree = match self.store.load_tree(algorithm)? {
                Some(snapshot) => BkTree::from_snapshot(snapshot)?,
                None => BkTree::new(),
            };
            debug!(algorithm = %algorithm, size = tree.len(), "engine_tree_loaded");
            trees.insert(algorithm, tree);
        }
        self.trees = trees;
        self.ready = true;
        info!(trees = self.trees.len(), "engine_initialized");
        Ok(())
    }

    /// Discard the trees, rebuild them from every stored record, and persist.
    ///
    /// Returns the number of records scanned.
    pub fn rebuild_trees(&mut self, algorithms: &[HashAlgorithm]) -> Result<usize, MatchError> {
        let start = Instant::now();
        let mut trees: BTreeMap<HashAlgorithm, BkTree> =
            algorithms.iter().map(|&a| (a, BkTree::new())).collect();
        let mut scanned = 0usize;
        self.store.scan(&mut |record| {
            scanned += 1;
            insert_record(&mut trees, &record);
            Ok(())
        })?;
        self.trees = trees;
        self.ready = true;
        self.persist_trees()?;
        info!(
            records = scanned,
            trees = self.trees.len(),
            elapsed_micros = start.elapsed().as_micros(),
            "engine_rebuilt"
        );
        Ok(scanned)
    }

    /// Insert every fingerprint of `record` whose algorithm has a tree.
    /// Nothing is persisted.
    pub fn add_to_trees(&mut self, record: &MediaRecord) -> Result<(), MatchError> {
        self.ensure_ready()?;
        insert_record(&mut self.trees, record);
        Ok(())
    }

    /// Remove `id` from every tree. Returns whether any tree held it.
    pub fn remove_from_trees(&mut self, id: &str) -> Result<bool, MatchError> {
        self.ensure_ready()?;
        let mut removed = false;
        for tree in self.trees.values_mut() {
            removed |= tree.remove(id);
        }
        Ok(removed)
    }

    /// Snapshot and save every tree.
    pub fn persist_trees(&self) -> Result<(), MatchError> {
        self.ensure_ready()?;
        for (&algorithm, tree) in &self.trees {
            self.store.save_tree(algorithm, &tree.snapshot())?;
        }
        debug!(trees = self.trees.len(), "engine_trees_persisted");
        Ok(())
    }

    /// Per-algorithm tree shape.
    pub fn tree_stats(&self) -> BTreeMap<HashAlgorithm, TreeStats> {
        self.trees
            .iter()
            .map(|(&algorithm, tree)| (algorithm, tree.stats()))
            .collect()
    }

    /// Drop the in-memory trees and mark the engine not ready.
    pub fn reset(&mut self) {
        self.trees.clear();
        self.ready = false;
    }

    /// Range-search the primary algorithm's tree and rank the hits.
    pub fn search(
        &self,
        query: &FingerprintSet,
        options: &SearchOptions,
    ) -> Result<Vec<SearchHit>, MatchError> {
        self.ensure_ready()?;
        let start = Instant::now();
        // Every fingerprint in a set shares one width.
        if let Some((_, any)) = query.iter().next() {
            options.validate(any.width().bits())?;
        }
        let primary = query
            .get(options.algorithm)
            .ok_or(MatchError::MissingQueryFingerprint(options.algorithm))?;
        let bits = primary.width().bits();
        let tree = self.trees.get(&options.algorithm).ok_or_else(|| {
            MatchError::InvalidConfig(format!("no index for algorithm {}", options.algorithm))
        })?;

        let matches = tree.search(primary, options.threshold);
        if matches.is_empty() {
            self.report(options, start, 0);
            return Ok(Vec::new());
        }

        let mut ids: Vec<String> = Vec::with_capacity(matches.len());
        let mut seen = HashSet::with_capacity(matches.len());
        for m in &matches {
            if seen.insert(m.id.as_str()) {
                ids.push(m.id.clone());
            }
        }
        let mut records: HashMap<String, MediaRecord> = self
            .store
            .get_many(&ids)?
            .into_iter()
            .map(|r| (r.id.clone(), r))
            .collect();

        let mut scored: Vec<(ScoredCandidate, MediaRecord)> = Vec::with_capacity(ids.len());
        for hit in matches {
            // Skip orphans and entries left behind by a re-add; taking the
            // record keeps only the closest current entry per id.
            let current = records
                .get(&hit.id)
                .is_some_and(|r| r.fingerprints.get(options.algorithm) == Some(&hit.fingerprint));
            if !current {
                continue;
            }
            let Some(record) = records.remove(&hit.id) else {
                continue;
            };
            let candidate = score_candidate(&hit, &record, query, options, bits);
            scored.push((candidate, record));
        }

        if options.weights.is_some() {
            scored.sort_by(|(a, _), (b, _)| {
                b.score
                    .partial_cmp(&a.score)
                    .unwrap_or(Ordering::Equal)
                    .then(a.primary_distance.cmp(&b.primary_distance))
                    .then_with(|| a.id.cmp(&b.id))
            });
        } else {
            scored.sort_by(|(a, _), (b, _)| {
                a.primary_distance
                    .cmp(&b.primary_distance)
                    .then_with(|| a.id.cmp(&b.id))
            });
        }
        scored.truncate(options.limit);

        let hits: Vec<SearchHit> = scored
            .into_iter()
            .map(|(candidate, record)| SearchHit {
                id: candidate.id,
                kind: record.kind,
                distance: candidate.primary_distance,
                similarity: candidate.primary_similarity,
                algorithm: options.algorithm,
                score: candidate.score,
                metadata: record.metadata,
                fingerprints: record.fingerprints,
            })
            .collect();

        self.report(options, start, hits.len());
        Ok(hits)
    }

    fn report(&self, options: &SearchOptions, start: Instant, hit_count: usize) {
        let latency = start.elapsed();
        debug!(
            algorithm = %options.algorithm,
            threshold = options.threshold,
            weighted = options.weights.is_some(),
            hits = hit_count,
            elapsed_micros = latency.as_micros(),
            "engine_search"
        );
        if let Some(recorder) = metrics_recorder() {
            recorder.record_search(
                options.algorithm,
                options.weights.is_some(),
                latency,
                hit_count,
            );
        }
    }
}

fn insert_record(trees: &mut BTreeMap<HashAlgorithm, BkTree>, record: &MediaRecord) {
    for (algorithm, tree) in trees.iter_mut() {
        if let Some(fingerprint) = record.fingerprints.get(*algorithm) {
            tree.insert(*fingerprint, record.id.as_str());
        }
    }
}

fn score_candidate(
    hit: &TreeMatch,
    record: &MediaRecord,
    query: &FingerprintSet,
    options: &SearchOptions,
    bits: u32,
) -> ScoredCandidate {
    let primary_similarity = distance_to_similarity(hit.distance, bits);
    let mut distances = BTreeMap::new();
    distances.insert(options.algorithm, hit.distance);

    let score = match &options.weights {
        None => primary_similarity,
        Some(weights) => {
            for &algorithm in weights.keys() {
                if algorithm == options.algorithm {
                    continue;
                }
                if let (Some(q), Some(c)) = (query.get(algorithm), record.fingerprints.get(algorithm))
                {
                    distances.insert(algorithm, q.hamming_distance(c));
                }
            }
            fused_score(&distances, bits, weights)
        }
    };

    ScoredCandidate {
        id: hit.id.clone(),
        distances,
        primary_distance: hit.distance,
        primary_similarity,
        score,
    }
}
