use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, instrument};

use crate::{
    RfError,
    error::validate_dataset,
    node::{Node, NodeIndex, Variance},
    split::{DEFAULT_SPLIT_QUANTILES, find_best_split},
};

/// Configuration for a single regression tree.
///
/// Construct via [`DecisionTreeConfig::new`], then chain `with_*` methods.
///
/// # Defaults
///
/// | Parameter          | Default                    |
/// |--------------------|----------------------------|
/// | `max_depth`        | 5                          |
/// | `min_samples_leaf` | 5                          |
/// | `max_features`     | `None` (all features)      |
/// | `split_quantiles`  | [`DEFAULT_SPLIT_QUANTILES`] |
/// | `seed`             | 42                         |
#[derive(Debug, Clone)]
pub struct DecisionTreeConfig {
    pub(crate) max_depth: usize,
    pub(crate) min_samples_leaf: usize,
    pub(crate) max_features: Option<usize>,
    pub(crate) split_quantiles: Vec<f64>,
    pub(crate) seed: u64,
}

impl DecisionTreeConfig {
    /// Create a new config with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            max_depth: 5,
            min_samples_leaf: 5,
            max_features: None,
            split_quantiles: DEFAULT_SPLIT_QUANTILES.to_vec(),
            seed: 42,
        }
    }

    /// Set the maximum tree depth (root is depth 0).
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Set the minimum number of samples required in each child of a split.
    ///
    /// A node with fewer than `2 * min_samples_leaf` samples becomes a leaf.
    #[must_use]
    pub fn with_min_samples_leaf(mut self, min_samples_leaf: usize) -> Self {
        self.min_samples_leaf = min_samples_leaf;
        self
    }

    /// Set the number of features drawn at each split.
    ///
    /// `None` means consider all features.
    #[must_use]
    pub fn with_max_features(mut self, max_features: Option<usize>) -> Self {
        self.max_features = max_features;
        self
    }

    /// Replace the percentiles tried as split thresholds.
    #[must_use]
    pub fn with_split_quantiles(mut self, split_quantiles: Vec<f64>) -> Self {
        self.split_quantiles = split_quantiles;
        self
    }

    /// Set the seed driving per-split feature subsampling.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    // --- Getters ---

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

    /// Return the maximum features to consider per split, if set.
    #[must_use]
    pub fn max_features(&self) -> Option<usize> {
        self.max_features
    }

    /// Return the split-threshold percentiles.
    #[must_use]
    pub fn split_quantiles(&self) -> &[f64] {
        &self.split_quantiles
    }

    /// Return the random seed.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Check hyperparameters that do not depend on the dataset.
    pub(crate) fn validate(&self) -> Result<(), RfError> {
        if self.max_depth == 0 {
            return Err(RfError::InvalidMaxDepth { max_depth: 0 });
        }
        if self.min_samples_leaf == 0 {
            return Err(RfError::InvalidMinSamplesLeaf { min_samples_leaf: 0 });
        }
        validate_quantiles(&self.split_quantiles)
    }

    /// Train a regression tree on the provided row-major dataset.
    ///
    /// `features[sample_idx][feature_idx]`: row-major layout.
    /// `targets[sample_idx]`: regression target.
    ///
    /// # Errors
    ///
    /// | Variant                              | When                                              |
    /// |--------------------------------------|---------------------------------------------------|
    /// | [`RfError::EmptyDataset`]            | `features` is empty                               |
    /// | [`RfError::TargetCountMismatch`]     | `features` and `targets` differ in length         |
    /// | [`RfError::ZeroFeatures`]            | rows have zero feature columns                    |
    /// | [`RfError::FeatureCountMismatch`]    | rows have inconsistent lengths                    |
    /// | [`RfError::NonFiniteValue`]          | any feature value is NaN or infinite              |
    /// | [`RfError::NonFiniteTarget`]         | any target is NaN or infinite                     |
    /// | [`RfError::InvalidMaxDepth`]         | `max_depth` is 0                                  |
    /// | [`RfError::InvalidMinSamplesLeaf`]   | `min_samples_leaf` is 0                           |
    /// | [`RfError::InvalidSplitQuantiles`]   | quantile list empty or outside (0.0, 1.0)         |
    /// | [`RfError::InvalidMaxFeatures`]      | `max_features` resolves outside [1, n_features]   |
    #[instrument(skip(self, features, targets), fields(n_samples = features.len()))]
    pub fn fit(&self, features: &[Vec<f64>], targets: &[f64]) -> Result<DecisionTree, RfError> {
        let n_features = validate_dataset(features, targets)?;
        self.validate()?;

        let max_features = self.max_features.unwrap_or(n_features);
        if max_features == 0 || max_features > n_features {
            return Err(RfError::InvalidMaxFeatures {
                max_features,
                n_features,
            });
        }

        // Column-major for split search.
        let col_features: Vec<Vec<f64>> = (0..n_features)
            .map(|feat_idx| features.iter().map(|row| row[feat_idx]).collect())
            .collect();

        Ok(self.fit_columns(&col_features, targets, max_features))
    }

    /// Fit on pre-validated column-major data.
    pub(crate) fn fit_columns(
        &self,
        col_features: &[Vec<f64>],
        targets: &[f64],
        max_features: usize,
    ) -> DecisionTree {
        let n_features = col_features.len();
        let sample_indices: Vec<usize> = (0..targets.len()).collect();

        let mut builder = TreeBuilder {
            col_features,
            targets,
            config: self,
            max_features,
            rng: ChaCha8Rng::seed_from_u64(self.seed),
            arena: Vec::new(),
            variance_reduction: vec![0.0; n_features],
        };
        let root = builder.build(&sample_indices, 0);

        debug!(
            root_index = root.index(),
            n_nodes = builder.arena.len(),
            "regression tree built"
        );

        DecisionTree {
            nodes: builder.arena,
            n_features,
            variance_reduction: builder.variance_reduction,
        }
    }
}

impl Default for DecisionTreeConfig {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn validate_quantiles(quantiles: &[f64]) -> Result<(), RfError> {
    if quantiles.is_empty() || quantiles.iter().any(|&q| !(q > 0.0 && q < 1.0)) {
        return Err(RfError::InvalidSplitQuantiles {
            quantiles: quantiles.to_vec(),
        });
    }
    Ok(())
}

/// State owned by a single `fit` call: the arena under construction, the
/// tree's RNG, and its variance-reduction totals.
struct TreeBuilder<'a> {
    col_features: &'a [Vec<f64>],
    targets: &'a [f64],
    config: &'a DecisionTreeConfig,
    max_features: usize,
    rng: ChaCha8Rng,
    arena: Vec<Node>,
    variance_reduction: Vec<f64>,
}

impl TreeBuilder<'_> {
    /// Recursively build the subtree for `sample_indices`.
    ///
    /// Returns the [`NodeIndex`] of the node just created in the arena.
    fn build(&mut self, sample_indices: &[usize], depth: usize) -> NodeIndex {
        let n_samples = sample_indices.len();
        let variance = Variance::of(self.targets, sample_indices);

        let depth_reached = depth >= self.config.max_depth;
        let too_few = n_samples < 2 * self.config.min_samples_leaf;
        let constant = sample_indices
            .first()
            .is_none_or(|&first| {
                sample_indices
                    .iter()
                    .all(|&i| self.targets[i] == self.targets[first])
            });

        if depth_reached || too_few || constant {
            return self.push_leaf(sample_indices, variance);
        }

        let Some(split) = find_best_split(
            self.col_features,
            self.targets,
            sample_indices,
            variance,
            &self.config.split_quantiles,
            self.max_features,
            self.config.min_samples_leaf,
            &mut self.rng,
        ) else {
            return self.push_leaf(sample_indices, variance);
        };

        self.variance_reduction[split.feature.index()] += split.variance_reduction;

        // Reserve the parent slot so children land after it.
        let node_idx = self.arena.len();
        self.arena.push(Node::Leaf {
            value: 0.0,
            variance,
            n_samples,
        });

        let left = self.build(&split.left_indices, depth + 1);
        let right = self.build(&split.right_indices, depth + 1);

        self.arena[node_idx] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
            variance,
            n_samples,
            variance_reduction: split.variance_reduction,
        };

        NodeIndex::new(node_idx)
    }

    fn push_leaf(&mut self, sample_indices: &[usize], variance: Variance) -> NodeIndex {
        let n_samples = sample_indices.len();
        let value = if n_samples == 0 {
            0.0
        } else {
            sample_indices.iter().map(|&i| self.targets[i]).sum::<f64>() / n_samples as f64
        };
        let idx = self.arena.len();
        self.arena.push(Node::Leaf {
            value,
            variance,
            n_samples,
        });
        NodeIndex::new(idx)
    }
}

/// A fitted regression tree.
///
/// Stored as an arena-based `Vec<Node>` with index references; the root is
/// at index 0.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DecisionTree {
    pub(crate) nodes: Vec<Node>,
    pub(crate) n_features: usize,
    pub(crate) variance_reduction: Vec<f64>,
}

impl DecisionTree {
    /// Predict the target for a single sample.
    ///
    /// Traverses from the root: at each `Split`, goes left when
    /// `sample[feature] <= threshold`, right otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::PredictionFeatureMismatch`] when `sample.len() != n_features`.
    pub fn predict(&self, sample: &[f64]) -> Result<f64, RfError> {
        if sample.len() != self.n_features {
            return Err(RfError::PredictionFeatureMismatch {
                expected: self.n_features,
                got: sample.len(),
            });
        }
        Ok(self.predict_unchecked(sample))
    }

    /// Predict without checking the sample width.
    pub(crate) fn predict_unchecked(&self, sample: &[f64]) -> f64 {
        match &self.nodes[self.traverse(sample)] {
            Node::Leaf { value, .. } => *value,
            Node::Split { .. } => unreachable!("traverse always ends at a leaf"),
        }
    }

    /// Raw per-feature variance-reduction totals accumulated during fitting.
    ///
    /// Non-negative and not normalized.
    #[must_use]
    pub fn variance_reduction(&self) -> &[f64] {
        &self.variance_reduction
    }

    /// Per-feature variance reduction normalized to sum to 1.0.
    ///
    /// All zeros when the tree is a single leaf or no split reduced variance.
    #[must_use]
    pub fn feature_importances(&self) -> Vec<f64> {
        let mut totals = self.variance_reduction.clone();
        let sum: f64 = totals.iter().sum();
        if sum > 0.0 {
            totals.iter_mut().for_each(|v| *v /= sum);
        }
        totals
    }

    /// Borrow the node arena. The root is at index 0.
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Return the number of features this tree was trained on.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Return the total number of nodes in the tree (both splits and leaves).
    #[must_use]
    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Return the number of leaf nodes.
    #[must_use]
    pub fn n_leaves(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }

    /// Return the maximum depth of the tree.
    ///
    /// A single-node tree (just a root leaf) has depth 0.
    #[must_use]
    pub fn depth(&self) -> usize {
        if self.nodes.is_empty() {
            return 0;
        }

        let mut max_depth = 0usize;
        let mut queue = std::collections::VecDeque::new();
        queue.push_back((0usize, 0usize));

        while let Some((node_idx, d)) = queue.pop_front() {
            match &self.nodes[node_idx] {
                Node::Leaf { .. } => max_depth = max_depth.max(d),
                Node::Split { left, right, .. } => {
                    queue.push_back((left.index(), d + 1));
                    queue.push_back((right.index(), d + 1));
                }
            }
        }

        max_depth
    }

    /// Return the smallest and largest leaf values.
    #[must_use]
    pub fn leaf_value_range(&self) -> (f64, f64) {
        self.nodes
            .iter()
            .filter_map(|n| match n {
                Node::Leaf { value, .. } => Some(*value),
                Node::Split { .. } => None,
            })
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                (lo.min(v), hi.max(v))
            })
    }

    /// Traverse the tree from the root and return the arena index of the leaf.
    fn traverse(&self, sample: &[f64]) -> usize {
        let mut idx = 0usize;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { .. } => return idx,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    idx = if sample[feature.index()] <= *threshold {
                        left.index()
                    } else {
                        right.index()
                    };
                }
            }
        }
    }
}
