//! Configuration builder for Random Forest training.

use crate::error::RfError;
use crate::result::RandomForestResult;
use crate::split::DEFAULT_SPLIT_QUANTILES;
use crate::tree::DecisionTreeConfig;

/// Strategy for determining the number of features to consider at each split.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MaxFeatures {
    /// Ceiling of the square root of total features.
    Sqrt,
    /// A fraction of total features (must be in (0.0, 1.0]).
    Fraction(f64),
    /// A fixed count.
    Fixed(usize),
    /// All features (no subsampling).
    All,
}

/// Whether to compute out-of-bag evaluation during training.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OobMode {
    /// Compute OOB mean squared error and R².
    Enabled,
    /// Skip OOB evaluation.
    Disabled,
}

/// Configuration for Random Forest regression.
///
/// Construct via [`RandomForestConfig::new`], then chain `with_*` methods.
///
/// # Defaults
///
/// | Parameter          | Default                     |
/// |--------------------|-----------------------------|
/// | `max_features`     | `Sqrt`                      |
/// | `max_depth`        | 5                           |
/// | `min_samples_leaf` | 5                           |
/// | `split_quantiles`  | [`DEFAULT_SPLIT_QUANTILES`] |
/// | `seed`             | 42                          |
/// | `oob_mode`         | `Disabled`                  |
#[derive(Debug, Clone)]
pub struct RandomForestConfig {
    pub(crate) n_trees: usize,
    pub(crate) max_features: MaxFeatures,
    pub(crate) max_depth: usize,
    pub(crate) min_samples_leaf: usize,
    pub(crate) split_quantiles: Vec<f64>,
    pub(crate) seed: u64,
    pub(crate) oob_mode: OobMode,
}

impl RandomForestConfig {
    /// Create a new config with the given number of trees.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::InvalidTreeCount`] if `n_trees` is zero.
    pub fn new(n_trees: usize) -> Result<Self, RfError> {
        if n_trees == 0 {
            return Err(RfError::InvalidTreeCount { n_trees });
        }
        Ok(Self {
            n_trees,
            max_features: MaxFeatures::Sqrt,
            max_depth: 5,
            min_samples_leaf: 5,
            split_quantiles: DEFAULT_SPLIT_QUANTILES.to_vec(),
            seed: 42,
            oob_mode: OobMode::Disabled,
        })
    }

    // --- Setters ---

    /// Set the max features strategy.
    #[must_use]
    pub fn with_max_features(mut self, max_features: MaxFeatures) -> Self {
        self.max_features = max_features;
        self
    }

    /// Set the maximum tree depth (root is depth 0).
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Set the minimum number of samples required in each leaf after a split.
    #[must_use]
    pub fn with_min_samples_leaf(mut self, min_samples_leaf: usize) -> Self {
        self.min_samples_leaf = min_samples_leaf;
        self
    }

    /// Replace the percentiles tried as split thresholds.
    #[must_use]
    pub fn with_split_quantiles(mut self, split_quantiles: Vec<f64>) -> Self {
        self.split_quantiles = split_quantiles;
        self
    }

    /// Set the base seed. Tree `i` uses `seed + i` for its bootstrap draw
    /// and its feature subsampling.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the OOB evaluation mode.
    #[must_use]
    pub fn with_oob_mode(mut self, oob_mode: OobMode) -> Self {
        self.oob_mode = oob_mode;
        self
    }

    // --- Getters ---

    /// Return the number of trees.
    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.n_trees
    }

    /// Return the max features strategy.
    #[must_use]
    pub fn max_features(&self) -> MaxFeatures {
        self.max_features
    }

    /// Return the maximum depth.
    #[must_use]
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Return the minimum samples required in each leaf.
    #[must_use]
    pub fn min_samples_leaf(&self) -> usize {
        self.min_samples_leaf
    }

    /// Return the split-threshold percentiles.
    #[must_use]
    pub fn split_quantiles(&self) -> &[f64] {
        &self.split_quantiles
    }

    /// Return the base random seed.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Return the OOB evaluation mode.
    #[must_use]
    pub fn oob_mode(&self) -> OobMode {
        self.oob_mode
    }

    /// Check every parameter that does not depend on the dataset.
    ///
    /// [`fit`](Self::fit) runs the same checks; call this to fail early
    /// before preparing data.
    ///
    /// # Errors
    ///
    /// Returns the first of [`RfError::InvalidMaxDepth`],
    /// [`RfError::InvalidMinSamplesLeaf`] or [`RfError::InvalidSplitQuantiles`]
    /// that applies. `max_features` is resolved against the data in `fit`.
    pub fn validate(&self) -> Result<(), RfError> {
        self.tree_template().validate()
    }

    pub(crate) fn tree_template(&self) -> DecisionTreeConfig {
        DecisionTreeConfig::new()
            .with_max_depth(self.max_depth)
            .with_min_samples_leaf(self.min_samples_leaf)
            .with_split_quantiles(self.split_quantiles.clone())
    }

    /// Train a Random Forest regressor on the provided dataset.
    ///
    /// `features[sample_idx][feature_idx]`: row-major layout.
    /// `targets[sample_idx]`: regression targets.
    /// `feature_names`: names for each feature column.
    ///
    /// # Errors
    ///
    /// | Variant                              | When                                              |
    /// |--------------------------------------|---------------------------------------------------|
    /// | [`RfError::EmptyDataset`]            | `features` is empty                               |
    /// | [`RfError::TargetCountMismatch`]     | `features` and `targets` differ in length         |
    /// | [`RfError::ZeroFeatures`]            | rows have zero feature columns                    |
    /// | [`RfError::FeatureCountMismatch`]    | rows have inconsistent lengths                    |
    /// | [`RfError::FeatureNameMismatch`]     | `feature_names` differs from the feature width    |
    /// | [`RfError::NonFiniteValue`]          | any feature value is NaN or infinite              |
    /// | [`RfError::NonFiniteTarget`]         | any target is NaN or infinite                     |
    /// | [`RfError::InvalidMaxDepth`]         | `max_depth` is 0                                  |
    /// | [`RfError::InvalidMinSamplesLeaf`]   | `min_samples_leaf` is 0                           |
    /// | [`RfError::InvalidSplitQuantiles`]   | quantile list empty or outside (0.0, 1.0)         |
    /// | [`RfError::InvalidMaxFeatures`]      | resolved max_features is outside [1, n_features]  |
    pub fn fit(
        &self,
        features: &[Vec<f64>],
        targets: &[f64],
        feature_names: &[String],
    ) -> Result<RandomForestResult, RfError> {
        crate::forest::train(self, features, targets, feature_names)
    }
}
