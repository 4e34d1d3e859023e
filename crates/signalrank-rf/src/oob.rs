//! Out-of-bag (OOB) evaluation for Random Forest regression.

use tracing::debug;

use crate::metrics::{mean_squared_error, r_squared};
use crate::tree::DecisionTree;

/// Out-of-bag evaluation result.
#[derive(Debug, Clone)]
pub struct OobScore {
    /// Mean squared error of OOB predictions.
    pub mse: f64,
    /// R² of OOB predictions against the evaluated targets.
    pub r_squared: f64,
    /// Number of samples that had at least one OOB tree.
    pub n_oob_samples: usize,
}

/// Compute out-of-bag predictions and their error.
///
/// Each sample is predicted by the mean of the trees whose bootstrap left it
/// out. Samples with no OOB tree are skipped; returns `None` when no sample
/// has one.
pub(crate) fn compute_oob(
    trees: &[DecisionTree],
    features: &[Vec<f64>],
    targets: &[f64],
    oob_indices_per_tree: &[Vec<usize>],
) -> Option<OobScore> {
    let n_samples = features.len();
    let mut sums = vec![0.0f64; n_samples];
    let mut counts = vec![0usize; n_samples];

    for (tree, oob_indices) in trees.iter().zip(oob_indices_per_tree) {
        for &sample_idx in oob_indices {
            sums[sample_idx] += tree.predict_unchecked(&features[sample_idx]);
            counts[sample_idx] += 1;
        }
    }

    let (evaluated_targets, predictions): (Vec<f64>, Vec<f64>) = (0..n_samples)
        .filter(|&i| counts[i] > 0)
        .map(|i| (targets[i], sums[i] / counts[i] as f64))
        .unzip();

    if evaluated_targets.is_empty() {
        debug!("no sample has an out-of-bag tree; skipping OOB score");
        return None;
    }

    Some(OobScore {
        mse: mean_squared_error(&evaluated_targets, &predictions),
        r_squared: r_squared(&evaluated_targets, &predictions),
        n_oob_samples: evaluated_targets.len(),
    })
}
