//! Feature construction configuration and the feature builder.

use tracing::{debug, info, instrument};

use crate::error::FeatureError;
use crate::history::PriceHistory;
use crate::indicators::{
    log_returns, mean_std, momentum, ratio_or_one, sma_at, wilder_rsi, zscore_last,
};
use crate::matrix::{FeatureMatrix, FeatureVector};

pub(crate) const RSI_PERIOD: usize = 14;
pub(crate) const SHORT_SMA_PERIOD: usize = 20;
pub(crate) const LONG_SMA_PERIOD: usize = 50;
pub(crate) const VOLATILITY_WINDOW: usize = 20;
pub(crate) const ZSCORE_WINDOW: usize = 5;
pub(crate) const VOLUME_SHORT_PERIOD: usize = 5;
pub(crate) const VOLUME_LONG_PERIOD: usize = 20;

/// First price index at which every feature is defined (the 50-step SMA warmup).
pub const FIRST_FEATURE_INDEX: usize = LONG_SMA_PERIOD - 1;

/// Columns computed from prices alone, in column order.
pub const PRICE_FEATURE_NAMES: [&str; 7] = [
    "rsi_14",
    "price_sma20_ratio",
    "price_sma50_ratio",
    "volatility_20",
    "momentum_10",
    "momentum_20",
    "mean_reversion_5",
];

/// Columns appended when volumes are available.
pub const VOLUME_FEATURE_NAMES: [&str; 2] = ["volume_ratio_20", "volume_trend_5_20"];

/// Configuration for turning a [`PriceHistory`] into a [`FeatureMatrix`].
///
/// # Defaults
///
/// | Parameter     | Default |
/// |---------------|---------|
/// | `horizon`     | 5       |
/// | `min_history` | 60      |
#[derive(Debug, Clone)]
pub struct FeatureConfig {
    horizon: usize,
    min_history: usize,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            horizon: 5,
            min_history: 60,
        }
    }
}

impl FeatureConfig {
    /// Create a config forecasting `horizon` steps ahead.
    ///
    /// # Errors
    ///
    /// Returns [`FeatureError::InvalidHorizon`] if `horizon` is zero.
    pub fn new(horizon: usize) -> Result<Self, FeatureError> {
        if horizon == 0 {
            return Err(FeatureError::InvalidHorizon { horizon });
        }
        Ok(Self {
            horizon,
            ..Self::default()
        })
    }

    /// Set the minimum number of prices accepted.
    #[must_use]
    pub fn with_min_history(mut self, min_history: usize) -> Self {
        self.min_history = min_history;
        self
    }

    #[must_use]
    pub fn horizon(&self) -> usize {
        self.horizon
    }

    #[must_use]
    pub fn min_history(&self) -> usize {
        self.min_history
    }

    /// Column names produced for a history with or without volumes.
    #[must_use]
    pub fn feature_names(with_volumes: bool) -> Vec<String> {
        let volume_names: &[&str] = if with_volumes {
            &VOLUME_FEATURE_NAMES
        } else {
            &[]
        };
        PRICE_FEATURE_NAMES
            .iter()
            .chain(volume_names)
            .map(|s| (*s).to_string())
            .collect()
    }

    /// Build training rows and forward-return targets from `history`.
    ///
    /// Rows cover every index `t` from [`FIRST_FEATURE_INDEX`] to
    /// `len - 1 - horizon`, with target `p[t + horizon] / p[t] - 1`. Features
    /// at `t` read only prices and volumes at or before `t`.
    ///
    /// # Errors
    ///
    /// | Variant                                     | When                                        |
    /// |---------------------------------------------|---------------------------------------------|
    /// | [`FeatureError::InsufficientHistory`]       | fewer than `min_history` prices             |
    /// | [`FeatureError::HorizonExceedsHistory`]     | the horizon leaves no complete training row |
    #[instrument(skip_all, fields(n_prices = history.len(), horizon = self.horizon))]
    pub fn build(&self, history: &PriceHistory) -> Result<FeatureMatrix, FeatureError> {
        let n = history.len();
        if n < self.min_history {
            return Err(FeatureError::InsufficientHistory {
                required: self.min_history,
                got: n,
            });
        }
        let needed = FIRST_FEATURE_INDEX + self.horizon + 1;
        if n < needed {
            return Err(FeatureError::HorizonExceedsHistory {
                horizon: self.horizon,
                got: n,
                shortfall: needed - n,
            });
        }

        let prices = history.prices();
        let calc = IndicatorSeries::new(history);
        let last_row = n - 1 - self.horizon;

        let mut rows = Vec::with_capacity(last_row + 1 - FIRST_FEATURE_INDEX);
        let mut targets = Vec::with_capacity(rows.capacity());
        let mut time_indices = Vec::with_capacity(rows.capacity());
        for t in FIRST_FEATURE_INDEX..=last_row {
            rows.push(calc.features_at(t));
            targets.push(prices[t + self.horizon] / prices[t] - 1.0);
            time_indices.push(t);
        }
        let unlabeled: Vec<FeatureVector> = (last_row + 1..n)
            .map(|t| FeatureVector::new(t, calc.features_at(t)))
            .collect();

        info!(
            n_rows = rows.len(),
            n_features = calc.n_features(),
            with_volumes = history.has_volumes(),
            "built feature matrix"
        );
        debug!(
            first_index = FIRST_FEATURE_INDEX,
            last_index = last_row,
            "feature row span"
        );

        Ok(FeatureMatrix {
            names: Self::feature_names(history.has_volumes()),
            rows,
            targets,
            time_indices,
            horizon: self.horizon,
            unlabeled,
        })
    }
}

/// Precomputed whole-series inputs shared by every row.
struct IndicatorSeries<'a> {
    prices: &'a [f64],
    volumes: Option<&'a [f64]>,
    log_returns: Vec<f64>,
    rsi: Vec<Option<f64>>,
}

impl<'a> IndicatorSeries<'a> {
    fn new(history: &'a PriceHistory) -> Self {
        let prices = history.prices();
        Self {
            prices,
            volumes: history.volumes(),
            log_returns: log_returns(prices),
            rsi: wilder_rsi(prices, RSI_PERIOD),
        }
    }

    fn n_features(&self) -> usize {
        match self.volumes {
            Some(_) => PRICE_FEATURE_NAMES.len() + VOLUME_FEATURE_NAMES.len(),
            None => PRICE_FEATURE_NAMES.len(),
        }
    }

    /// Features at `t`; requires `t >= FIRST_FEATURE_INDEX`.
    fn features_at(&self, t: usize) -> Vec<f64> {
        let p = self.prices;
        let price = p[t];

        // log_returns[i] is the return into p[i + 1], so the last 20 returns
        // ending at t are log_returns[t - 20..t].
        let (_, volatility) = mean_std(&self.log_returns[t - VOLATILITY_WINDOW..t]);

        let mut row = Vec::with_capacity(self.n_features());
        row.push(self.rsi[t].unwrap_or(50.0));
        row.push(price / sma_at(p, t, SHORT_SMA_PERIOD));
        row.push(price / sma_at(p, t, LONG_SMA_PERIOD));
        row.push(volatility);
        row.push(momentum(p, t, 10));
        row.push(momentum(p, t, 20));
        row.push(zscore_last(&p[t + 1 - ZSCORE_WINDOW..=t]));

        if let Some(v) = self.volumes {
            let long = sma_at(v, t, VOLUME_LONG_PERIOD);
            row.push(ratio_or_one(v[t], long));
            row.push(ratio_or_one(sma_at(v, t, VOLUME_SHORT_PERIOD), long));
        }
        row
    }
}
