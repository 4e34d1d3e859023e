//! Per-instrument signal ranking.

use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use signalrank_features::{FeatureMatrix, PriceHistory};
use signalrank_rf::PermutationConfig;
use tracing::{debug, info, instrument, warn};

use crate::config::RankerConfig;
use crate::error::RankerError;
use crate::report::SignalReport;

/// Number of leading rows usable for training when the rows from `split`
/// on are held out.
///
/// Targets look `horizon` steps ahead, so the last `horizon` rows before a
/// held-out block are dropped to keep their targets out of it.
pub(crate) fn purged_train_len(split: usize, n_rows: usize, horizon: usize) -> usize {
    if split >= n_rows {
        split
    } else {
        split.saturating_sub(horizon)
    }
}

/// Trains a forest on one price history and ranks its technical signals.
#[derive(Debug, Clone)]
pub struct SignalRanker {
    config: RankerConfig,
}

impl SignalRanker {
    #[must_use]
    pub fn new(config: RankerConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &RankerConfig {
        &self.config
    }

    /// Build features from `history`, train a forest and rank the features.
    ///
    /// Every configuration value is checked before features are built, and
    /// the feature build fails before any tree is grown; no partial report is
    /// ever returned.
    ///
    /// # Errors
    ///
    /// See [`RankerError`]; [`RankerError::kind`] classifies each failure.
    #[instrument(skip_all, fields(n_prices = history.len(), n_trees = self.config.n_trees))]
    pub fn rank(&self, history: &PriceHistory) -> Result<SignalReport, RankerError> {
        self.config.validate()?;
        let matrix = self.config.feature_config()?.build(history)?;
        self.rank_matrix(&matrix)
    }

    /// Rank the features of a prebuilt matrix.
    ///
    /// # Errors
    ///
    /// See [`RankerError`].
    pub fn rank_matrix(&self, matrix: &FeatureMatrix) -> Result<SignalReport, RankerError> {
        self.config.validate()?;

        let n_rows = matrix.len();
        let n_holdout = (n_rows as f64 * self.config.holdout_fraction).floor() as usize;
        let split = n_rows - n_holdout;
        let n_train = purged_train_len(split, n_rows, matrix.horizon());
        if n_train == 0 {
            return Err(RankerError::InsufficientTrainingRows {
                required: 1,
                got: 0,
            });
        }

        info!(
            n_rows,
            n_train,
            n_holdout,
            horizon = matrix.horizon(),
            "ranking signals"
        );

        let rows = matrix.rows();
        let targets = matrix.targets();
        let result = self.config.forest_config()?.fit(
            &rows[..n_train],
            &targets[..n_train],
            matrix.names(),
        )?;

        let permutation_on_holdout = n_holdout > 0;
        let permutation = match self.config.permutation_repeats {
            Some(repeats) => {
                let (eval_rows, eval_targets) = if permutation_on_holdout {
                    (&rows[split..], &targets[split..])
                } else {
                    (&rows[..n_train], &targets[..n_train])
                };
                let report = PermutationConfig::new(repeats)?
                    .with_seed(self.config.seed)
                    .analyze(result.forest(), eval_rows, eval_targets)?;
                debug!(
                    baseline_mse = report.baseline_mse,
                    n_samples = report.n_samples,
                    "permutation analysis complete"
                );
                Some(report)
            }
            None => None,
        };

        let latest_forecast = result.forest().predict(matrix.latest().values())?;

        info!(
            fit_quality = result.fit_quality(),
            low_confidence = result.low_confidence(),
            top_signal = result.importances().first().map(|f| f.name.as_str()),
            latest_forecast,
            "signal ranking complete"
        );

        Ok(SignalReport {
            importances: result.importances().to_vec(),
            fit_quality: result.fit_quality(),
            low_confidence: result.low_confidence(),
            permutation,
            permutation_on_holdout,
            oob_score: result.oob_score().cloned(),
            latest_forecast,
            n_train_rows: n_train,
            n_holdout_rows: n_holdout,
            horizon: matrix.horizon(),
        })
    }

    /// Rank several named histories in parallel.
    ///
    /// Results come back in input order; one instrument failing does not
    /// affect the others.
    #[instrument(skip_all, fields(n_instruments = instruments.len()))]
    pub fn rank_many<'a>(
        &self,
        instruments: &'a [(String, PriceHistory)],
    ) -> Vec<(&'a str, Result<SignalReport, RankerError>)> {
        instruments
            .par_iter()
            .map(|(name, history)| {
                let result = self.rank(history);
                if let Err(e) = &result {
                    warn!(instrument = %name, kind = %e.kind(), error = %e, "ranking failed");
                }
                (name.as_str(), result)
            })
            .collect()
    }
}
