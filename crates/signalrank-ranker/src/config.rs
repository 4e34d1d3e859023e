use signalrank_features::FeatureConfig;
use signalrank_rf::{
    DEFAULT_PERMUTATION_REPEATS, DEFAULT_SPLIT_QUANTILES, MaxFeatures, OobMode,
    RandomForestConfig, RfError,
};

use crate::error::RankerError;

/// Configuration for ranking the signals of one price history.
///
/// # Defaults
///
/// | Parameter             | Default |
/// |-----------------------|---------|
/// | `max_depth`           | 5       |
/// | `min_samples_leaf`    | 5       |
/// | `horizon`             | 5       |
/// | `min_history`         | 60      |
/// | `seed`                | 42      |
/// | `permutation_repeats` | `Some(10)` |
/// | `holdout_fraction`    | 0.0     |
/// | `oob_mode`            | `OobMode::Disabled` |
/// | `split_quantiles`     | [`DEFAULT_SPLIT_QUANTILES`] |
#[derive(Debug, Clone)]
pub struct RankerConfig {
    pub(crate) n_trees: usize,
    pub(crate) max_depth: usize,
    pub(crate) min_samples_leaf: usize,
    pub(crate) horizon: usize,
    pub(crate) min_history: usize,
    pub(crate) seed: u64,
    pub(crate) permutation_repeats: Option<usize>,
    pub(crate) holdout_fraction: f64,
    pub(crate) oob_mode: OobMode,
    pub(crate) split_quantiles: Vec<f64>,
}

impl Default for RankerConfig {
    /// 50 trees with every other parameter at its documented default.
    fn default() -> Self {
        Self {
            n_trees: 50,
            max_depth: 5,
            min_samples_leaf: 5,
            horizon: 5,
            min_history: 60,
            seed: 42,
            permutation_repeats: Some(DEFAULT_PERMUTATION_REPEATS),
            holdout_fraction: 0.0,
            oob_mode: OobMode::Disabled,
            split_quantiles: DEFAULT_SPLIT_QUANTILES.to_vec(),
        }
    }
}

impl RankerConfig {
    /// Create a config with the given number of trees.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::InvalidTreeCount`] (wrapped) if `n_trees` is zero.
    pub fn new(n_trees: usize) -> Result<Self, RankerError> {
        if n_trees == 0 {
            return Err(RfError::InvalidTreeCount { n_trees }.into());
        }
        Ok(Self {
            n_trees,
            ..Self::default()
        })
    }

    /// Set the maximum tree depth.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Set the minimum number of rows per leaf.
    #[must_use]
    pub fn with_min_samples_leaf(mut self, min_samples_leaf: usize) -> Self {
        self.min_samples_leaf = min_samples_leaf;
        self
    }

    /// Set the forecast horizon in steps.
    #[must_use]
    pub fn with_horizon(mut self, horizon: usize) -> Self {
        self.horizon = horizon;
        self
    }

    /// Set the minimum number of prices accepted.
    #[must_use]
    pub fn with_min_history(mut self, min_history: usize) -> Self {
        self.min_history = min_history;
        self
    }

    /// Set the base seed for tree construction and permutation shuffles.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the number of permutation shuffles per feature; `None` skips the analysis.
    #[must_use]
    pub fn with_permutation_repeats(mut self, repeats: Option<usize>) -> Self {
        self.permutation_repeats = repeats;
        self
    }

    /// Reserve the chronologically last fraction of rows for permutation analysis.
    #[must_use]
    pub fn with_holdout_fraction(mut self, fraction: f64) -> Self {
        self.holdout_fraction = fraction;
        self
    }

    /// Enable or disable out-of-bag scoring.
    #[must_use]
    pub fn with_oob_mode(mut self, oob_mode: OobMode) -> Self {
        self.oob_mode = oob_mode;
        self
    }

    /// Replace the percentiles tried as split thresholds.
    #[must_use]
    pub fn with_split_quantiles(mut self, split_quantiles: Vec<f64>) -> Self {
        self.split_quantiles = split_quantiles;
        self
    }

    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.n_trees
    }

    #[must_use]
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    #[must_use]
    pub fn min_samples_leaf(&self) -> usize {
        self.min_samples_leaf
    }

    #[must_use]
    pub fn horizon(&self) -> usize {
        self.horizon
    }

    #[must_use]
    pub fn min_history(&self) -> usize {
        self.min_history
    }

    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    #[must_use]
    pub fn permutation_repeats(&self) -> Option<usize> {
        self.permutation_repeats
    }

    #[must_use]
    pub fn holdout_fraction(&self) -> f64 {
        self.holdout_fraction
    }

    #[must_use]
    pub fn oob_mode(&self) -> OobMode {
        self.oob_mode
    }

    #[must_use]
    pub fn split_quantiles(&self) -> &[f64] {
        &self.split_quantiles
    }

    /// Check every parameter, returning the first violation.
    ///
    /// Runs before any feature is computed or tree is built.
    pub(crate) fn validate(&self) -> Result<(), RankerError> {
        self.forest_config()?.validate()?;
        if let Some(0) = self.permutation_repeats {
            return Err(RfError::InvalidRepeatCount { n_repeats: 0 }.into());
        }
        if !(0.0..1.0).contains(&self.holdout_fraction) {
            return Err(RankerError::InvalidHoldoutFraction {
                fraction: self.holdout_fraction,
            });
        }
        self.feature_config()?;
        Ok(())
    }

    pub(crate) fn feature_config(&self) -> Result<FeatureConfig, RankerError> {
        Ok(FeatureConfig::new(self.horizon)?.with_min_history(self.min_history))
    }

    pub(crate) fn forest_config(&self) -> Result<RandomForestConfig, RankerError> {
        Ok(RandomForestConfig::new(self.n_trees)?
            .with_max_features(MaxFeatures::Sqrt)
            .with_max_depth(self.max_depth)
            .with_min_samples_leaf(self.min_samples_leaf)
            .with_split_quantiles(self.split_quantiles.clone())
            .with_seed(self.seed)
            .with_oob_mode(self.oob_mode))
    }
}
