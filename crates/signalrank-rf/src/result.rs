//! Training result types for Random Forest.

use crate::error::RfError;
use crate::forest::RandomForest;
use crate::importance::RankedFeature;
use crate::oob::OobScore;
use crate::perm_importance::{PermutationReport, compute_permutation_importance};

/// Metadata about the training run.
#[derive(Debug, Clone)]
pub struct TrainingMetadata {
    /// Number of trees trained.
    pub n_trees: usize,
    /// Number of features in the dataset.
    pub n_features: usize,
    /// Number of training samples.
    pub n_samples: usize,
    /// Resolved max_features value used.
    pub max_features_resolved: usize,
    /// Seed of tree 0; tree `i` used `base_seed + i`.
    pub base_seed: u64,
}

/// Result of Random Forest training.
///
/// Holds the fitted forest, the ranked variance-reduction importances, the
/// in-sample fit quality, an optional OOB score, and per-tree OOB indices.
#[derive(Debug)]
pub struct RandomForestResult {
    forest: RandomForest,
    importances: Vec<RankedFeature>,
    fit_quality: f64,
    low_confidence: bool,
    oob_score: Option<OobScore>,
    oob_indices_per_tree: Vec<Vec<usize>>,
    metadata: TrainingMetadata,
}

impl RandomForestResult {
    pub(crate) fn new(
        forest: RandomForest,
        importances: Vec<RankedFeature>,
        fit_quality: f64,
        low_confidence: bool,
        oob_score: Option<OobScore>,
        oob_indices_per_tree: Vec<Vec<usize>>,
        metadata: TrainingMetadata,
    ) -> Self {
        Self {
            forest,
            importances,
            fit_quality,
            low_confidence,
            oob_score,
            oob_indices_per_tree,
            metadata,
        }
    }

    /// Borrow the fitted forest.
    #[must_use]
    pub fn forest(&self) -> &RandomForest {
        &self.forest
    }

    /// Consume the result and return the fitted forest.
    #[must_use]
    pub fn into_forest(self) -> RandomForest {
        self.forest
    }

    /// Return the ranked feature importances.
    #[must_use]
    pub fn importances(&self) -> &[RankedFeature] {
        &self.importances
    }

    /// In-sample R² of the ensemble on its training rows.
    ///
    /// 0.0 when the targets are constant.
    #[must_use]
    pub fn fit_quality(&self) -> f64 {
        self.fit_quality
    }

    /// True when no tree found a split that reduced variance.
    #[must_use]
    pub fn low_confidence(&self) -> bool {
        self.low_confidence
    }

    /// Return the OOB score, if computed.
    #[must_use]
    pub fn oob_score(&self) -> Option<&OobScore> {
        self.oob_score.as_ref()
    }

    /// Return training metadata.
    #[must_use]
    pub fn metadata(&self) -> &TrainingMetadata {
        &self.metadata
    }

    /// Return the per-tree OOB sample indices.
    #[must_use]
    pub fn oob_indices_per_tree(&self) -> &[Vec<usize>] {
        &self.oob_indices_per_tree
    }

    /// Compute permutation importance of the fitted forest on `features`.
    ///
    /// The training data is not stored in the result, so it (or a held-out
    /// set) has to be passed back in.
    ///
    /// # Errors
    ///
    /// See [`PermutationConfig::analyze`](crate::PermutationConfig::analyze).
    pub fn permutation_importances(
        &self,
        features: &[Vec<f64>],
        targets: &[f64],
        n_repeats: usize,
        seed: u64,
    ) -> Result<PermutationReport, RfError> {
        compute_permutation_importance(&self.forest, features, targets, n_repeats, seed)
    }
}
