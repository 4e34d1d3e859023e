//! Random Forest training with parallel tree construction.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use tracing::{debug, info, instrument, warn};

use crate::config::{MaxFeatures, OobMode, RandomForestConfig};
use crate::error::{RfError, validate_dataset};
use crate::importance::aggregate_importances;
use crate::metrics::r_squared;
use crate::oob::compute_oob;
use crate::result::{RandomForestResult, TrainingMetadata};
use crate::tree::DecisionTree;

/// A fitted Random Forest regressor.
///
/// Trees are kept in index order; tree `i` was grown from seed `base_seed + i`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RandomForest {
    pub(crate) trees: Vec<DecisionTree>,
    pub(crate) n_features: usize,
    pub(crate) feature_names: Vec<String>,
}

/// Resolve `MaxFeatures` to a concrete count.
pub(crate) fn resolve_max_features(
    max_features: MaxFeatures,
    n_features: usize,
) -> Result<usize, RfError> {
    let resolved = match max_features {
        MaxFeatures::Sqrt => (n_features as f64).sqrt().ceil() as usize,
        MaxFeatures::Fraction(f) => (n_features as f64 * f).ceil() as usize,
        MaxFeatures::Fixed(n) => n,
        MaxFeatures::All => n_features,
    };
    if resolved == 0 || resolved > n_features {
        return Err(RfError::InvalidMaxFeatures {
            max_features: resolved,
            n_features,
        });
    }
    Ok(resolved)
}

/// Draw a same-size bootstrap sample and return it with the out-of-bag indices.
pub(crate) fn bootstrap_sample(n_samples: usize, rng: &mut impl Rng) -> (Vec<usize>, Vec<usize>) {
    let mut in_bag = vec![false; n_samples];
    let mut bootstrap_indices = Vec::with_capacity(n_samples);
    for _ in 0..n_samples {
        let idx = rng.gen_range(0..n_samples);
        bootstrap_indices.push(idx);
        in_bag[idx] = true;
    }
    let oob_indices: Vec<usize> = (0..n_samples).filter(|&i| !in_bag[i]).collect();
    (bootstrap_indices, oob_indices)
}

/// Train the Random Forest ensemble.
#[instrument(skip_all, fields(n_trees = config.n_trees, n_samples = features.len()))]
pub(crate) fn train(
    config: &RandomForestConfig,
    features: &[Vec<f64>],
    targets: &[f64],
    feature_names: &[String],
) -> Result<RandomForestResult, RfError> {
    // --- Validate inputs ---
    if config.n_trees == 0 {
        return Err(RfError::InvalidTreeCount { n_trees: 0 });
    }
    let n_features = validate_dataset(features, targets)?;
    if feature_names.len() != n_features {
        return Err(RfError::FeatureNameMismatch {
            expected: n_features,
            got: feature_names.len(),
        });
    }
    let n_samples = features.len();

    // --- Validate config ---
    config.validate()?;
    let tree_template = config.tree_template();
    let max_features_resolved = resolve_max_features(config.max_features, n_features)?;
    let tree_template = tree_template.with_max_features(Some(max_features_resolved));

    info!(
        n_trees = config.n_trees,
        n_samples,
        n_features,
        max_features = max_features_resolved,
        max_depth = config.max_depth,
        "training random forest"
    );

    let col_features: Vec<Vec<f64>> = (0..n_features)
        .map(|feat_idx| features.iter().map(|row| row[feat_idx]).collect())
        .collect();

    // Each tree's contribution is keyed by its seed, so collection order
    // (tree index) fixes the result regardless of which worker finishes first.
    let tree_results: Vec<(DecisionTree, Vec<usize>)> = (0..config.n_trees)
        .into_par_iter()
        .map(|tree_idx| {
            let tree_seed = config.seed.wrapping_add(tree_idx as u64);
            let mut rng = ChaCha8Rng::seed_from_u64(tree_seed);
            let (bootstrap_indices, oob_indices) = bootstrap_sample(n_samples, &mut rng);

            let boot_cols: Vec<Vec<f64>> = col_features
                .iter()
                .map(|col| bootstrap_indices.iter().map(|&i| col[i]).collect())
                .collect();
            let boot_targets: Vec<f64> = bootstrap_indices.iter().map(|&i| targets[i]).collect();

            let tree = tree_template
                .clone()
                .with_seed(tree_seed)
                .fit_columns(&boot_cols, &boot_targets, max_features_resolved);

            (tree, oob_indices)
        })
        .collect();

    let mut trees = Vec::with_capacity(config.n_trees);
    let mut oob_indices_per_tree = Vec::with_capacity(config.n_trees);
    for (tree, oob) in tree_results {
        trees.push(tree);
        oob_indices_per_tree.push(oob);
    }

    let per_tree: Vec<&[f64]> = trees.iter().map(DecisionTree::variance_reduction).collect();
    let aggregated = aggregate_importances(&per_tree, feature_names);
    let low_confidence = aggregated.grand_total <= 0.0;
    if low_confidence {
        warn!("no split reduced target variance; importances reported as zero");
    }

    debug!(
        n_trees_trained = trees.len(),
        total_nodes = trees.iter().map(DecisionTree::n_nodes).sum::<usize>(),
        "tree training complete"
    );

    let forest = RandomForest {
        trees,
        n_features,
        feature_names: feature_names.to_vec(),
    };

    let fitted = forest.predict_rows(features);
    let fit_quality = r_squared(targets, &fitted);

    let oob_score = match config.oob_mode {
        OobMode::Enabled => compute_oob(&forest.trees, features, targets, &oob_indices_per_tree),
        OobMode::Disabled => None,
    };

    let metadata = TrainingMetadata {
        n_trees: config.n_trees,
        n_features,
        n_samples,
        max_features_resolved,
        base_seed: config.seed,
    };

    info!(
        fit_quality,
        low_confidence,
        oob_r_squared = oob_score.as_ref().map(|s| s.r_squared),
        "random forest training complete"
    );

    Ok(RandomForestResult::new(
        forest,
        aggregated.ranked,
        fit_quality,
        low_confidence,
        oob_score,
        oob_indices_per_tree,
        metadata,
    ))
}

#[cfg(test)]
mod tests {
    use rand::Rng;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::bootstrap_sample;
    use crate::config::{MaxFeatures, OobMode, RandomForestConfig};

    /// Target driven by feature 0, feature 1 is noise.
    fn make_regression(n: usize, seed: u64) -> (Vec<Vec<f64>>, Vec<f64>, Vec<String>) {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut features = Vec::with_capacity(n);
        let mut targets = Vec::with_capacity(n);
        for _ in 0..n {
            let x: f64 = rng.r#gen();
            let noise: f64 = rng.r#gen();
            features.push(vec![x, noise]);
            targets.push(if x < 0.5 { -0.02 } else { 0.03 } + 0.001 * rng.r#gen::<f64>());
        }
        let names = vec!["signal".to_string(), "noise".to_string()];
        (features, targets, names)
    }

    #[test]
    fn bootstrap_same_size_and_oob_disjoint() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let (boot, oob) = bootstrap_sample(100, &mut rng);
        assert_eq!(boot.len(), 100);
        assert!(oob.iter().all(|i| !boot.contains(i)));
        // Roughly a third of rows are left out.
        assert!(oob.len() > 15 && oob.len() < 55, "oob = {}", oob.len());
    }

    #[test]
    fn learns_step_function() {
        let (features, targets, names) = make_regression(200, 1);
        let result = RandomForestConfig::new(30)
            .unwrap()
            .with_max_features(MaxFeatures::All)
            .fit(&features, &targets, &names)
            .unwrap();
        assert!(result.fit_quality() > 0.9, "fit = {}", result.fit_quality());
        assert!(!result.low_confidence());
        assert_eq!(result.importances()[0].name, "signal");
    }

    #[test]
    fn feature_importances_sum_to_one() {
        let (features, targets, names) = make_regression(120, 2);
        let result = RandomForestConfig::new(20)
            .unwrap()
            .fit(&features, &targets, &names)
            .unwrap();
        let total: f64 = result.importances().iter().map(|f| f.importance).sum();
        assert!((total - 1.0).abs() < 1e-9, "total = {total}");
        assert!(result.importances().iter().all(|f| f.importance >= 0.0));
    }

    #[test]
    fn constant_target_is_low_confidence() {
        let features: Vec<Vec<f64>> = (0..40).map(|i| vec![i as f64, 1.0]).collect();
        let targets = vec![0.01; 40];
        let names = vec!["a".to_string(), "b".to_string()];
        let result = RandomForestConfig::new(5)
            .unwrap()
            .fit(&features, &targets, &names)
            .unwrap();
        assert!(result.low_confidence());
        assert!(result.importances().iter().all(|f| f.importance == 0.0));
        assert!(result.forest().trees.iter().all(|t| t.n_nodes() == 1));
    }

    #[test]
    fn deterministic_with_same_seed() {
        let (features, targets, names) = make_regression(100, 5);
        let config = RandomForestConfig::new(10).unwrap().with_seed(99);
        let result1 = config.fit(&features, &targets, &names).unwrap();
        let result2 = config.fit(&features, &targets, &names).unwrap();
        assert_eq!(result1.forest(), result2.forest());
        assert_eq!(result1.importances(), result2.importances());
    }

    #[test]
    fn tree_seeds_follow_base_seed() {
        // Tree 1 of a forest seeded at 10 equals tree 0 of a forest seeded at 11.
        let (features, targets, names) = make_regression(80, 6);
        let a = RandomForestConfig::new(2)
            .unwrap()
            .with_seed(10)
            .fit(&features, &targets, &names)
            .unwrap();
        let b = RandomForestConfig::new(1)
            .unwrap()
            .with_seed(11)
            .fit(&features, &targets, &names)
            .unwrap();
        assert_eq!(a.forest().trees[1], b.forest().trees[0]);
    }

    #[test]
    fn oob_score_computed() {
        let (features, targets, names) = make_regression(150, 7);
        let result = RandomForestConfig::new(30)
            .unwrap()
            .with_oob_mode(OobMode::Enabled)
            .fit(&features, &targets, &names)
            .unwrap();
        let oob = result.oob_score().expect("OOB should be computed");
        assert!(oob.n_oob_samples > 0);
        assert!(oob.r_squared > 0.5, "oob r2 = {}", oob.r_squared);
    }

    #[test]
    fn feature_name_mismatch_error() {
        let (features, targets, _) = make_regression(20, 8);
        let err = RandomForestConfig::new(2)
            .unwrap()
            .fit(&features, &targets, &["only_one".to_string()])
            .unwrap_err();
        assert!(matches!(
            err,
            crate::RfError::FeatureNameMismatch { expected: 2, got: 1 }
        ));
    }

    #[test]
    fn empty_dataset_error() {
        let err = RandomForestConfig::new(10).unwrap().fit(&[], &[], &[]).unwrap_err();
        assert!(matches!(err, crate::RfError::EmptyDataset));
    }
}
