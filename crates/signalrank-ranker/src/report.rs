use signalrank_rf::{OobScore, PermutationReport, RankedFeature};

/// Ranked signals for one price history.
#[derive(Debug, Clone)]
pub struct SignalReport {
    /// Features ranked by normalized variance-reduction importance.
    pub importances: Vec<RankedFeature>,
    /// In-sample R² of the forest on its training rows.
    pub fit_quality: f64,
    /// True when no split reduced variance; every importance is then 0.
    pub low_confidence: bool,
    /// Permutation importances, when requested.
    pub permutation: Option<PermutationReport>,
    /// True when `permutation` was measured on held-out rows.
    pub permutation_on_holdout: bool,
    /// Out-of-bag score, when enabled.
    pub oob_score: Option<OobScore>,
    /// Forecast forward return from the last price in the history.
    pub latest_forecast: f64,
    /// Rows the forest was trained on.
    pub n_train_rows: usize,
    /// Rows reserved for permutation analysis.
    pub n_holdout_rows: usize,
    /// Forecast horizon in steps.
    pub horizon: usize,
}

impl SignalReport {
    /// The highest-ranked feature, unless the forest found no signal at all.
    #[must_use]
    pub fn top_signal(&self) -> Option<&RankedFeature> {
        if self.low_confidence {
            return None;
        }
        self.importances.first()
    }

    /// Normalized importance of the feature called `name`.
    #[must_use]
    pub fn importance_of(&self, name: &str) -> Option<f64> {
        self.importances
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.importance)
    }

    /// Mean permutation error increase of the feature called `name`.
    #[must_use]
    pub fn permutation_importance_of(&self, name: &str) -> Option<f64> {
        self.permutation.as_ref()?.get(name).map(|f| f.importance)
    }
}
