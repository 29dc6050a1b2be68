// Metrics hooks for the `matcher` crate.
//
// Callers install a global `MatchMetrics` implementation via [`set_match_metrics`],
// then every `SimilarityEngine::search` reports latency and hit count. This keeps
// instrumentation decoupled from any specific metrics backend.
use std::sync::{Arc, RwLock};
use std::time::Duration;

use once_cell::sync::OnceCell;
use perceptual::HashAlgorithm;

/// Metrics observer for search operations.
pub trait MatchMetrics: Send + Sync {
    /// Record the outcome of a search.
    ///
    /// `algorithm` is the primary algorithm, `weighted` tells whether fused
    /// scoring was requested, `latency` is the wall-clock duration of the
    /// search, and `hit_count` is the number of hits returned after
    /// truncation.
    fn record_search(
        &self,
        algorithm: HashAlgorithm,
        weighted: bool,
        latency: Duration,
        hit_count: usize,
    );
}

fn metrics_lock() -> &'static RwLock<Option<Arc<dyn MatchMetrics>>> {
    static METRICS: OnceCell<RwLock<Option<Arc<dyn MatchMetrics>>>> = OnceCell::new();
    METRICS.get_or_init(|| RwLock::new(None))
}

pub(crate) fn metrics_recorder() -> Option<Arc<dyn MatchMetrics>> {
    let guard = metrics_lock()
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    guard.clone()
}

/// Install or clear the global search metrics recorder.
///
/// Typically called once during start-up so every engine shares the same
/// metrics backend.
pub fn set_match_metrics(recorder: Option<Arc<dyn MatchMetrics>>) {
    let mut guard = metrics_lock()
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    *guard = recorder;
}
