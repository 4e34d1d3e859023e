//! Random Forest regression: train, predict, rank features.
//!
//! Provides a hand-rolled Random Forest regressor built from CART trees that
//! split on variance reduction at fixed quantile thresholds. Trees train in
//! parallel via rayon with per-tree seeds, so results are reproducible for a
//! fixed base seed regardless of thread count. Features can be ranked by
//! accumulated variance reduction or by permutation importance.

mod config;
mod error;
mod forest;
mod importance;
mod metrics;
mod node;
mod oob;
mod perm_importance;
mod predict;
mod result;
mod split;
mod tree;

pub use config::{MaxFeatures, OobMode, RandomForestConfig};
pub use error::RfError;
pub use forest::RandomForest;
pub use importance::RankedFeature;
pub use metrics::{mean_squared_error, r_squared};
pub use node::{FeatureIndex, Node, NodeIndex, Variance};
pub use oob::OobScore;
pub use perm_importance::{
    DEFAULT_PERMUTATION_REPEATS, PermutationConfig, PermutationImportance, PermutationReport,
};
pub use result::{RandomForestResult, TrainingMetadata};
pub use split::DEFAULT_SPLIT_QUANTILES;
pub use tree::{DecisionTree, DecisionTreeConfig};
