use rand::Rng;

use crate::node::{FeatureIndex, Variance};

/// Percentiles of a feature, among the rows reaching a node, tried as split thresholds.
///
/// Four fixed candidates per feature keep split search linear in the node
/// size. Override per tree with
/// [`DecisionTreeConfig::with_split_quantiles`](crate::DecisionTreeConfig::with_split_quantiles).
pub const DEFAULT_SPLIT_QUANTILES: [f64; 4] = [0.2, 0.4, 0.6, 0.8];

/// Result of finding the best split for a node.
#[derive(Debug, Clone)]
pub(crate) struct SplitResult {
    /// Feature used for the split.
    pub(crate) feature: FeatureIndex,
    /// Threshold value.
    pub(crate) threshold: f64,
    /// Parent variance minus weighted child variance, never negative.
    pub(crate) variance_reduction: f64,
    /// Sample indices going to the left child.
    pub(crate) left_indices: Vec<usize>,
    /// Sample indices going to the right child.
    pub(crate) right_indices: Vec<usize>,
}

/// Linearly interpolated quantile of an ascending slice.
///
/// `q` is clamped to `[0.0, 1.0]`. The slice must be non-empty.
pub(crate) fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    debug_assert!(!sorted.is_empty());
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

/// Draw `take` distinct feature indices by partial Fisher-Yates shuffle.
pub(crate) fn sample_features(n_features: usize, take: usize, rng: &mut impl Rng) -> Vec<usize> {
    let mut order: Vec<usize> = (0..n_features).collect();
    let take = take.min(n_features);
    for i in 0..take {
        let j = rng.gen_range(i..n_features);
        order.swap(i, j);
    }
    order.truncate(take);
    order
}

/// Weighted within-partition variance of splitting `sample_indices` at `threshold`.
///
/// Returns `(n_left, weighted_variance)`, or `None` when either side would
/// hold fewer than `min_samples_leaf` samples.
fn evaluate_threshold(
    column: &[f64],
    targets: &[f64],
    sample_indices: &[usize],
    threshold: f64,
    min_samples_leaf: usize,
) -> Option<(usize, f64)> {
    let mut n_left = 0usize;
    let mut sum_left = 0.0f64;
    let mut sum_right = 0.0f64;
    for &si in sample_indices {
        if column[si] <= threshold {
            n_left += 1;
            sum_left += targets[si];
        } else {
            sum_right += targets[si];
        }
    }
    let n_right = sample_indices.len() - n_left;
    if n_left < min_samples_leaf.max(1) || n_right < min_samples_leaf.max(1) {
        return None;
    }

    // Second pass around each side's mean rather than E[x²] - E[x]².
    let mean_left = sum_left / n_left as f64;
    let mean_right = sum_right / n_right as f64;
    let ss: f64 = sample_indices
        .iter()
        .map(|&si| {
            let mean = if column[si] <= threshold { mean_left } else { mean_right };
            let d = targets[si] - mean;
            d * d
        })
        .sum();

    Some((n_left, ss / sample_indices.len() as f64))
}

/// Find the best split among a random subset of features.
///
/// Draws `max_features` features, evaluates each one at the given
/// `quantiles` of its values among `sample_indices`, and keeps the
/// (feature, threshold) pair with the smallest weighted child variance.
/// The first pair reaching the minimum wins ties.
///
/// Returns `None` when no candidate leaves at least `min_samples_leaf`
/// samples on both sides.
///
/// # Column-major layout
///
/// `features` is column-major: `features[feature_idx][sample_idx]`.
#[allow(clippy::too_many_arguments)]
pub(crate) fn find_best_split(
    features: &[Vec<f64>],
    targets: &[f64],
    sample_indices: &[usize],
    parent_variance: Variance,
    quantiles: &[f64],
    max_features: usize,
    min_samples_leaf: usize,
    rng: &mut impl Rng,
) -> Option<SplitResult> {
    let n_features = features.len();
    let n_samples = sample_indices.len();
    if n_samples < 2 || n_features == 0 {
        return None;
    }

    let selected = sample_features(n_features, max_features, rng);

    let mut best_weighted = f64::INFINITY;
    let mut best: Option<(FeatureIndex, f64)> = None;
    let mut values = Vec::with_capacity(n_samples);

    for &feat_idx in &selected {
        let column = &features[feat_idx];
        values.clear();
        values.extend(sample_indices.iter().map(|&si| column[si]));
        values.sort_unstable_by(f64::total_cmp);

        let mut last_threshold = None;
        for &q in quantiles {
            let threshold = quantile_sorted(&values, q);
            if last_threshold == Some(threshold) {
                continue;
            }
            last_threshold = Some(threshold);

            let Some((_, weighted)) =
                evaluate_threshold(column, targets, sample_indices, threshold, min_samples_leaf)
            else {
                continue;
            };
            if weighted < best_weighted {
                best_weighted = weighted;
                best = Some((FeatureIndex::new(feat_idx), threshold));
            }
        }
    }

    let (feature, threshold) = best?;

    let column = &features[feature.index()];
    let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = sample_indices
        .iter()
        .partition(|&&si| column[si] <= threshold);

    Some(SplitResult {
        feature,
        threshold,
        variance_reduction: (parent_variance.value() - best_weighted).max(0.0),
        left_indices,
        right_indices,
    })
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::{DEFAULT_SPLIT_QUANTILES, find_best_split, quantile_sorted, sample_features};
    use crate::node::Variance;

    fn split_all(
        features: &[Vec<f64>],
        targets: &[f64],
        max_features: usize,
        min_samples_leaf: usize,
    ) -> Option<super::SplitResult> {
        let indices: Vec<usize> = (0..targets.len()).collect();
        let parent = Variance::of(targets, &indices);
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        find_best_split(
            features,
            targets,
            &indices,
            parent,
            &DEFAULT_SPLIT_QUANTILES,
            max_features,
            min_samples_leaf,
            &mut rng,
        )
    }

    #[test]
    fn quantile_interpolates() {
        let sorted = [0.0, 10.0, 20.0, 30.0, 40.0];
        assert!((quantile_sorted(&sorted, 0.2) - 8.0).abs() < 1e-12);
        assert!((quantile_sorted(&sorted, 0.5) - 20.0).abs() < 1e-12);
        assert!((quantile_sorted(&sorted, 1.0) - 40.0).abs() < 1e-12);
    }

    #[test]
    fn quantile_single_value() {
        assert_eq!(quantile_sorted(&[7.0], 0.8), 7.0);
    }

    #[test]
    fn sampled_features_are_distinct() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut picked = sample_features(9, 3, &mut rng);
        assert_eq!(picked.len(), 3);
        picked.sort_unstable();
        picked.dedup();
        assert_eq!(picked.len(), 3);
        assert!(picked.iter().all(|&f| f < 9));
    }

    #[test]
    fn step_target_finds_separating_split() {
        // Ten samples, targets step from 0 to 1 between x = 4 and x = 5.
        let x: Vec<f64> = (0..10).map(f64::from).collect();
        let targets: Vec<f64> = (0..10).map(|i| if i < 5 { 0.0 } else { 1.0 }).collect();
        let split = split_all(&[x], &targets, 1, 1).expect("should find a split");

        assert_eq!(split.feature.index(), 0);
        // The 40th percentile of 0..=9 is 3.6: left gets 0..=3.
        assert!((split.threshold - 3.6).abs() < 1e-12);
        assert_eq!(split.left_indices.len(), 4);
        assert_eq!(split.right_indices.len(), 6);
        assert!(split.variance_reduction > 0.0);
    }

    #[test]
    fn constant_feature_returns_none() {
        let features = vec![vec![5.0; 6]];
        let targets = vec![0.0, 1.0, 0.0, 1.0, 0.0, 1.0];
        assert!(split_all(&features, &targets, 1, 1).is_none());
    }

    #[test]
    fn min_samples_leaf_enforced() {
        // With four samples every candidate leaves at most two on one side.
        let features = vec![vec![1.0, 2.0, 3.0, 4.0]];
        let targets = vec![0.0, 0.0, 1.0, 1.0];
        assert!(split_all(&features, &targets, 1, 3).is_none());
    }

    #[test]
    fn reduction_never_negative() {
        let features = vec![vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]];
        let targets = vec![0.3; 6];
        if let Some(split) = split_all(&features, &targets, 1, 1) {
            assert!(split.variance_reduction >= 0.0);
        }
    }

    #[test]
    fn informative_feature_preferred_over_noise() {
        // Feature 0 determines the target; feature 1 is shuffled noise.
        let informative: Vec<f64> = (0..20).map(f64::from).collect();
        let noise: Vec<f64> = (0..20).map(|i| f64::from((i * 7) % 20)).collect();
        let targets: Vec<f64> = (0..20).map(|i| if i < 8 { -1.0 } else { 1.0 }).collect();
        let split = split_all(&[informative, noise], &targets, 2, 1).unwrap();
        assert_eq!(split.feature.index(), 0);
    }
}
