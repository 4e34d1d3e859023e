//! Prediction and ranking methods for the Random Forest ensemble.

use rayon::iter::{IntoParallelIterator, IntoParallelRefIterator, ParallelIterator};

use crate::error::RfError;
use crate::forest::RandomForest;
use crate::importance::{RankedFeature, aggregate_importances};
use crate::tree::DecisionTree;

impl RandomForest {
    /// Predict the target for a single sample.
    ///
    /// Returns the mean of every tree's prediction.
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

    /// Predict targets for a batch of samples in parallel.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::PredictionFeatureMismatch`] if any sample has the wrong feature count.
    pub fn predict_batch(&self, features: &[Vec<f64>]) -> Result<Vec<f64>, RfError> {
        features
            .into_par_iter()
            .map(|sample| self.predict(sample))
            .collect()
    }

    /// Predict pre-validated rows in parallel.
    pub(crate) fn predict_rows(&self, features: &[Vec<f64>]) -> Vec<f64> {
        features
            .par_iter()
            .map(|sample| self.predict_unchecked(sample))
            .collect()
    }

    pub(crate) fn predict_unchecked(&self, sample: &[f64]) -> f64 {
        let sum: f64 = self
            .trees
            .iter()
            .map(|tree| tree.predict_unchecked(sample))
            .sum();
        sum / self.trees.len() as f64
    }

    /// Rank features by descending normalized variance-reduction importance.
    ///
    /// Importances sum to 1.0, or are all 0.0 when no split reduced variance.
    #[must_use]
    pub fn rank(&self) -> Vec<RankedFeature> {
        let per_tree: Vec<&[f64]> = self.trees.iter().map(DecisionTree::variance_reduction).collect();
        aggregate_importances(&per_tree, &self.feature_names).ranked
    }

    /// Return the smallest and largest leaf values across all trees.
    ///
    /// Every forest prediction lies within this range.
    #[must_use]
    pub fn leaf_value_range(&self) -> (f64, f64) {
        self.trees
            .iter()
            .map(DecisionTree::leaf_value_range)
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), (tlo, thi)| {
                (lo.min(tlo), hi.max(thi))
            })
    }

    /// Borrow the trees in index order.
    #[must_use]
    pub fn trees(&self) -> &[DecisionTree] {
        &self.trees
    }

    /// Return the number of features this forest was trained on.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Return the number of trees in the ensemble.
    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Return the feature names.
    #[must_use]
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }
}

#[cfg(test)]
mod tests {
    use crate::RandomForestConfig;

    fn make_data() -> (Vec<Vec<f64>>, Vec<f64>, Vec<String>) {
        let features: Vec<Vec<f64>> = (0..90)
            .map(|i| vec![i as f64, ((i * 31) % 90) as f64])
            .collect();
        let targets: Vec<f64> = (0..90).map(|i| (i as f64 / 15.0).sin() * 0.05).collect();
        let names = vec!["x".to_string(), "shuffled".to_string()];
        (features, targets, names)
    }

    #[test]
    fn batch_matches_individual() {
        let (features, targets, names) = make_data();
        let result = RandomForestConfig::new(10).unwrap().fit(&features, &targets, &names).unwrap();
        let forest = result.forest();
        let batch = forest.predict_batch(&features).unwrap();
        for (i, sample) in features.iter().enumerate() {
            assert_eq!(batch[i], forest.predict(sample).unwrap());
        }
    }

    #[test]
    fn predictions_within_target_range() {
        let (features, targets, names) = make_data();
        let result = RandomForestConfig::new(25).unwrap().fit(&features, &targets, &names).unwrap();
        let forest = result.forest();
        let lo = targets.iter().copied().fold(f64::INFINITY, f64::min);
        let hi = targets.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let (leaf_lo, leaf_hi) = forest.leaf_value_range();
        assert!(leaf_lo >= lo - 1e-12 && leaf_hi <= hi + 1e-12);
        for point in [vec![-50.0, -50.0], vec![45.0, 3.0], vec![500.0, 500.0]] {
            let p = forest.predict(&point).unwrap();
            assert!(p >= leaf_lo - 1e-12 && p <= leaf_hi + 1e-12, "p = {p}");
        }
    }

    #[test]
    fn rank_matches_training_importances() {
        let (features, targets, names) = make_data();
        let result = RandomForestConfig::new(10).unwrap().fit(&features, &targets, &names).unwrap();
        assert_eq!(result.forest().rank(), result.importances());
    }

    #[test]
    fn wrong_width_rejected() {
        let (features, targets, names) = make_data();
        let result = RandomForestConfig::new(3).unwrap().fit(&features, &targets, &names).unwrap();
        assert!(result.forest().predict(&[1.0]).is_err());
        assert!(result.forest().predict_batch(&[vec![1.0, 2.0, 3.0]]).is_err());
    }
}
