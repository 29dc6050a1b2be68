//! Fused scoring across fingerprint algorithms.

use std::collections::BTreeMap;

use perceptual::{distance_to_similarity, HashAlgorithm};

use crate::types::Weights;

/// Weighted mean of per-algorithm similarities.
///
/// Only algorithms with both a weight and an observed distance contribute.
/// Returns `0.0` when nothing contributes or the contributing weights sum to
/// zero. The result is always in `[0, 1]` for weights in `[0, 1]`.
pub fn fused_score(distances: &BTreeMap<HashAlgorithm, u32>, bits: u32, weights: &Weights) -> f64 {
    let mut weighted = 0.0;
    let mut total = 0.0;
    for (algorithm, &distance) in distances {
        if let Some(&weight) = weights.get(algorithm) {
            weighted += weight * distance_to_similarity(distance, bits);
            total += weight;
        }
    }
    if total <= 0.0 {
        return 0.0;
    }
    (weighted / total).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn distances(pairs: &[(HashAlgorithm, u32)]) -> BTreeMap<HashAlgorithm, u32> {
        pairs.iter().copied().collect()
    }

    #[test]
    fn single_weight_is_plain_similarity() {
        let mut w = Weights::new();
        w.insert(HashAlgorithm::Structural, 0.3);
        let d = distances(&[(HashAlgorithm::Structural, 16)]);
        assert!((fused_score(&d, 64, &w) - 0.75).abs() < 1e-12);
    }

    #[test]
    fn weights_are_renormalized_over_observed() {
        let mut w = Weights::new();
        w.insert(HashAlgorithm::Structural, 1.0);
        w.insert(HashAlgorithm::Gradient, 0.5);
        w.insert(HashAlgorithm::ColorHistogram, 1.0);
        // ColorHistogram is weighted but never observed.
        let d = distances(&[(HashAlgorithm::Structural, 0), (HashAlgorithm::Gradient, 32)]);
        let expected = (1.0 * 1.0 + 0.5 * 0.5) / 1.5;
        assert!((fused_score(&d, 64, &w) - expected).abs() < 1e-12);
    }

    #[test]
    fn unobserved_or_zero_weights_score_zero() {
        let d = distances(&[(HashAlgorithm::Average, 0)]);
        let mut w = Weights::new();
        w.insert(HashAlgorithm::Gradient, 1.0);
        assert_eq!(fused_score(&d, 64, &w), 0.0);

        let mut w = Weights::new();
        w.insert(HashAlgorithm::Average, 0.0);
        assert_eq!(fused_score(&d, 64, &w), 0.0);
    }

    proptest! {
        #[test]
        fn fused_score_stays_in_unit_interval(
            ds in proptest::collection::vec(0u32..=64, 4),
            ws in proptest::collection::vec(0.0f64..=1.0, 4),
            present in proptest::collection::vec(any::<bool>(), 4),
        ) {
            let mut d = BTreeMap::new();
            let mut w = Weights::new();
            for (i, algorithm) in HashAlgorithm::ALL.iter().enumerate() {
                if present[i] {
                    d.insert(*algorithm, ds[i]);
                }
                w.insert(*algorithm, ws[i]);
            }
            let score = fused_score(&d, 64, &w);
            prop_assert!((0.0..=1.0).contains(&score));
        }
    }
}
