//! Permutation-based feature importance.

use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use tracing::{debug, info, instrument};

use crate::error::{RfError, validate_dataset};
use crate::forest::RandomForest;
use crate::metrics::mean_squared_error;

/// Default number of shuffles per feature.
pub const DEFAULT_PERMUTATION_REPEATS: usize = 10;

/// Permutation importance result for a single feature.
#[derive(Debug, Clone, PartialEq)]
pub struct PermutationImportance {
    /// Feature name.
    pub name: String,
    /// Mean increase in MSE when this feature is shuffled.
    pub importance: f64,
    /// Population standard deviation of the increase across repetitions.
    pub std: f64,
    /// Rank (1 = most important).
    pub rank: usize,
}

/// Permutation importances for every feature of a forest on one dataset.
#[derive(Debug, Clone)]
pub struct PermutationReport {
    /// Features ranked by descending mean error increase.
    pub features: Vec<PermutationImportance>,
    /// MSE of the unshuffled dataset.
    pub baseline_mse: f64,
    /// Shuffles per feature.
    pub n_repeats: usize,
    /// Number of rows evaluated.
    pub n_samples: usize,
}

impl PermutationReport {
    /// Look up a feature by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&PermutationImportance> {
        self.features.iter().find(|f| f.name == name)
    }
}

/// Configuration for permutation importance analysis.
///
/// # Defaults
///
/// | Parameter   | Default |
/// |-------------|---------|
/// | `seed`      | 42      |
#[derive(Debug, Clone)]
pub struct PermutationConfig {
    n_repeats: usize,
    seed: u64,
}

impl PermutationConfig {
    /// Create a config that shuffles each feature `n_repeats` times.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::InvalidRepeatCount`] if `n_repeats` is zero.
    pub fn new(n_repeats: usize) -> Result<Self, RfError> {
        if n_repeats == 0 {
            return Err(RfError::InvalidRepeatCount { n_repeats });
        }
        Ok(Self { n_repeats, seed: 42 })
    }

    /// Set the seed for the shuffles.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Return the number of shuffles per feature.
    #[must_use]
    pub fn n_repeats(&self) -> usize {
        self.n_repeats
    }

    /// Return the shuffle seed.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Measure how much the forest's MSE grows when each feature is shuffled.
    ///
    /// Pass held-out rows where available; training rows overstate the
    /// importance of features the trees memorized.
    ///
    /// # Errors
    ///
    /// | Variant                              | When                                          |
    /// |--------------------------------------|-----------------------------------------------|
    /// | [`RfError::EmptyDataset`]            | `features` is empty                           |
    /// | [`RfError::TargetCountMismatch`]     | `features` and `targets` differ in length     |
    /// | [`RfError::FeatureCountMismatch`]    | rows have inconsistent lengths                |
    /// | [`RfError::PredictionFeatureMismatch`] | row width differs from the forest's         |
    /// | [`RfError::NonFiniteValue`]          | any feature value is NaN or infinite          |
    /// | [`RfError::NonFiniteTarget`]         | any target is NaN or infinite                 |
    pub fn analyze(
        &self,
        forest: &RandomForest,
        features: &[Vec<f64>],
        targets: &[f64],
    ) -> Result<PermutationReport, RfError> {
        compute_permutation_importance(forest, features, targets, self.n_repeats, self.seed)
    }
}

/// Seed for the shuffle of `feature_idx` at repetition `repeat`.
///
/// Depends only on its arguments, so a run with more repetitions replays
/// the shuffles of a shorter one before adding new ones.
fn shuffle_seed(seed: u64, feature_idx: usize, repeat: usize) -> u64 {
    seed ^ (feature_idx as u64 + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15)
        ^ (repeat as u64).wrapping_mul(0xBF58_476D_1CE4_E5B9)
}

/// MSE of the forest with `feature_idx` replaced by a shuffled copy of its column.
fn permuted_mse(
    forest: &RandomForest,
    features: &[Vec<f64>],
    targets: &[f64],
    feature_idx: usize,
    rng: &mut ChaCha8Rng,
) -> f64 {
    let mut column: Vec<f64> = features.iter().map(|row| row[feature_idx]).collect();
    column.shuffle(rng);

    let mut scratch = vec![0.0f64; forest.n_features()];
    let predictions: Vec<f64> = features
        .iter()
        .zip(&column)
        .map(|(row, &shuffled)| {
            scratch.copy_from_slice(row);
            scratch[feature_idx] = shuffled;
            forest.predict_unchecked(&scratch)
        })
        .collect();
    mean_squared_error(targets, &predictions)
}

/// Compute permutation feature importance over `n_repeats` shuffles per feature.
///
/// For each feature and repetition:
/// 1. Shuffle that feature's column, leaving the others aligned
/// 2. Recompute the forest's MSE
/// 3. Record the increase over the unshuffled MSE
///
/// Reports the mean and population standard deviation (ddof=0) of the
/// increase per feature, ranked by descending mean.
#[instrument(skip_all, fields(n_samples = features.len(), n_repeats = n_repeats))]
pub(crate) fn compute_permutation_importance(
    forest: &RandomForest,
    features: &[Vec<f64>],
    targets: &[f64],
    n_repeats: usize,
    seed: u64,
) -> Result<PermutationReport, RfError> {
    if n_repeats == 0 {
        return Err(RfError::InvalidRepeatCount { n_repeats });
    }
    let n_features = validate_dataset(features, targets)?;
    if n_features != forest.n_features() {
        return Err(RfError::PredictionFeatureMismatch {
            expected: forest.n_features(),
            got: n_features,
        });
    }

    let baseline_predictions = forest.predict_rows(features);
    let baseline_mse = mean_squared_error(targets, &baseline_predictions);

    info!(
        n_features,
        n_repeats,
        baseline_mse,
        "computing permutation importance"
    );

    // Every (feature, repetition) evaluation is independent; collect keeps
    // them in task order so the reduction below is deterministic.
    let increases: Vec<f64> = (0..n_features * n_repeats)
        .into_par_iter()
        .map(|task| {
            let feature_idx = task / n_repeats;
            let repeat = task % n_repeats;
            let mut rng = ChaCha8Rng::seed_from_u64(shuffle_seed(seed, feature_idx, repeat));
            permuted_mse(forest, features, targets, feature_idx, &mut rng) - baseline_mse
        })
        .collect();

    let n = n_repeats as f64;
    let mut results: Vec<PermutationImportance> = increases
        .chunks(n_repeats)
        .zip(forest.feature_names())
        .map(|(values, name)| {
            let mean = values.iter().sum::<f64>() / n;
            let variance = values.iter().map(|&v| (v - mean) * (v - mean)).sum::<f64>() / n;
            PermutationImportance {
                name: name.clone(),
                importance: mean,
                std: variance.sqrt(),
                rank: 0,
            }
        })
        .collect();

    results.sort_by(|a, b| b.importance.total_cmp(&a.importance));
    for (i, result) in results.iter_mut().enumerate() {
        result.rank = i + 1;
    }

    debug!(
        top_feature = results.first().map(|r| r.name.as_str()),
        "permutation importance complete"
    );

    Ok(PermutationReport {
        features: results,
        baseline_mse,
        n_repeats,
        n_samples: features.len(),
    })
}
