//! Walk-forward evaluation of forest forecasts as a trading signal.
//!
//! A forest is trained on the leading share of the feature rows; the rest
//! of the history is stepped through in rebalance periods. At the start of
//! each period the forecast picks a position, which is held until the next
//! rebalance.

use serde::Serialize;
use signalrank_features::PriceHistory;
use tracing::{debug, info, instrument};

use crate::error::RankerError;
use crate::ranker::{SignalRanker, purged_train_len};

/// Position held over one rebalance period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Position {
    Long,
    Flat,
    Short,
}

impl Position {
    /// Pick a position from a forecast return.
    #[must_use]
    pub fn from_forecast(forecast: f64, threshold: f64, allow_short: bool) -> Self {
        if forecast > threshold {
            Self::Long
        } else if allow_short && forecast < -threshold {
            Self::Short
        } else {
            Self::Flat
        }
    }

    /// Signed exposure to the asset: 1, 0 or -1.
    #[must_use]
    pub fn exposure(self) -> f64 {
        match self {
            Self::Long => 1.0,
            Self::Flat => 0.0,
            Self::Short => -1.0,
        }
    }
}

/// Configuration for [`SignalRanker::backtest`].
///
/// # Defaults
///
/// | Parameter          | Default |
/// |--------------------|---------|
/// | `train_fraction`   | 0.7     |
/// | `rebalance_every`  | the forecast horizon |
/// | `transaction_cost` | 0.001 (10 bp per unit of turnover) |
/// | `long_threshold`   | 0.0     |
/// | `allow_short`      | false   |
#[derive(Debug, Clone)]
pub struct BacktestConfig {
    train_fraction: f64,
    rebalance_every: Option<usize>,
    transaction_cost: f64,
    long_threshold: f64,
    allow_short: bool,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            train_fraction: 0.7,
            rebalance_every: None,
            transaction_cost: 0.001,
            long_threshold: 0.0,
            allow_short: false,
        }
    }
}

impl BacktestConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Share of feature rows used for training, in (0.0, 1.0).
    #[must_use]
    pub fn with_train_fraction(mut self, train_fraction: f64) -> Self {
        self.train_fraction = train_fraction;
        self
    }

    /// Steps between rebalances; `None` uses the forecast horizon.
    #[must_use]
    pub fn with_rebalance_every(mut self, rebalance_every: Option<usize>) -> Self {
        self.rebalance_every = rebalance_every;
        self
    }

    /// Cost charged per unit change in exposure, as a fraction of equity.
    #[must_use]
    pub fn with_transaction_cost(mut self, transaction_cost: f64) -> Self {
        self.transaction_cost = transaction_cost;
        self
    }

    /// Forecast return a period must exceed to go long (or undercut, negated, to go short).
    #[must_use]
    pub fn with_long_threshold(mut self, long_threshold: f64) -> Self {
        self.long_threshold = long_threshold;
        self
    }

    #[must_use]
    pub fn with_allow_short(mut self, allow_short: bool) -> Self {
        self.allow_short = allow_short;
        self
    }

    #[must_use]
    pub fn train_fraction(&self) -> f64 {
        self.train_fraction
    }

    #[must_use]
    pub fn rebalance_every(&self) -> Option<usize> {
        self.rebalance_every
    }

    #[must_use]
    pub fn transaction_cost(&self) -> f64 {
        self.transaction_cost
    }

    #[must_use]
    pub fn long_threshold(&self) -> f64 {
        self.long_threshold
    }

    #[must_use]
    pub fn allow_short(&self) -> bool {
        self.allow_short
    }

    pub(crate) fn validate(&self) -> Result<(), RankerError> {
        if !(self.train_fraction > 0.0 && self.train_fraction < 1.0) {
            return Err(RankerError::InvalidTrainFraction {
                fraction: self.train_fraction,
            });
        }
        if let Some(0) = self.rebalance_every {
            return Err(RankerError::InvalidRebalancePeriod { rebalance_every: 0 });
        }
        for (name, value) in [
            ("transaction_cost", self.transaction_cost),
            ("long_threshold", self.long_threshold),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(RankerError::InvalidRate { name, value });
            }
        }
        Ok(())
    }
}

/// One rebalance period of a backtest.
#[derive(Debug, Clone, Serialize)]
pub struct BacktestPeriod {
    /// Price index at which the position is opened.
    pub start_index: usize,
    /// Price index at which it is marked again.
    pub end_index: usize,
    /// Forecast forward return at `start_index`.
    pub forecast: f64,
    pub position: Position,
    /// Simple asset return over the period.
    pub asset_return: f64,
    /// Position return net of transaction costs.
    pub strategy_return: f64,
}

/// Outcome of a walk-forward backtest.
#[derive(Debug, Clone, Serialize)]
pub struct BacktestReport {
    /// Feature rows the forest was trained on.
    pub n_train_rows: usize,
    /// In-sample R² of the forest.
    pub fit_quality: f64,
    pub periods: Vec<BacktestPeriod>,
    /// Equity after each period, starting from 1.0.
    pub equity_curve: Vec<f64>,
    pub total_return: f64,
    /// Asset return from the first rebalance to the last price.
    pub buy_and_hold_return: f64,
    /// Share of non-flat periods whose gross return was positive.
    pub hit_rate: f64,
    /// Mean over population standard deviation of period returns; 0 when flat.
    pub sharpe_ratio: f64,
    /// Largest peak-to-trough equity decline, as a positive fraction.
    pub max_drawdown: f64,
    /// Number of position changes, including the first entry.
    pub n_trades: usize,
}

/// Largest fractional decline from a running peak.
pub(crate) fn max_drawdown(equity: &[f64]) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut worst = 0.0_f64;
    for &value in equity {
        peak = peak.max(value);
        if peak > 0.0 {
            worst = worst.max((peak - value) / peak);
        }
    }
    worst
}

/// Mean over population standard deviation; 0 when the returns do not vary.
pub(crate) fn sharpe_ratio(returns: &[f64]) -> f64 {
    if returns.is_empty() {
        return 0.0;
    }
    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let var = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
    let std = var.sqrt();
    if std > 0.0 { mean / std } else { 0.0 }
}

impl SignalRanker {
    /// Train on the leading rows of `history` and trade the forecasts over the rest.
    ///
    /// The last `horizon` rows before the test window are left out of
    /// training so no training target reads a test-window price.
    ///
    /// # Errors
    ///
    /// | Variant                                    | When                                         |
    /// |--------------------------------------------|----------------------------------------------|
    /// | [`RankerError::InvalidTrainFraction`]      | `train_fraction` outside (0.0, 1.0)          |
    /// | [`RankerError::InvalidRebalancePeriod`]    | `rebalance_every` is `Some(0)`               |
    /// | [`RankerError::InvalidRate`]               | negative or non-finite cost or threshold     |
    /// | [`RankerError::InsufficientTrainingRows`]  | the purge leaves no training rows            |
    /// | [`RankerError::NoTestPeriod`]              | no rebalance period fits after training      |
    ///
    /// Ranker configuration and feature errors are returned as in [`SignalRanker::rank`].
    #[instrument(skip_all, fields(n_prices = history.len(), train_fraction = backtest.train_fraction))]
    pub fn backtest(
        &self,
        history: &PriceHistory,
        backtest: &BacktestConfig,
    ) -> Result<BacktestReport, RankerError> {
        let config = self.config();
        config.validate()?;
        backtest.validate()?;
        let matrix = config.feature_config()?.build(history)?;

        let n_rows = matrix.len();
        let split = (n_rows as f64 * backtest.train_fraction).floor() as usize;
        let n_train = purged_train_len(split, n_rows, matrix.horizon());
        if n_train == 0 {
            return Err(RankerError::InsufficientTrainingRows {
                required: 1,
                got: 0,
            });
        }

        let result = config.forest_config()?.fit(
            &matrix.rows()[..n_train],
            &matrix.targets()[..n_train],
            matrix.names(),
        )?;
        let forest = result.forest();

        let prices = history.prices();
        let last = prices.len() - 1;
        let step = backtest.rebalance_every.unwrap_or(matrix.horizon());
        let start = matrix
            .time_indices()
            .get(split)
            .copied()
            .ok_or(RankerError::NoTestPeriod { n_train_rows: n_train })?;

        let mut periods = Vec::new();
        let mut equity_curve = vec![1.0];
        let mut equity = 1.0;
        let mut held = Position::Flat;
        let mut n_trades = 0;

        let mut t = start;
        while t < last {
            let Some(features) = matrix.features_at(t) else {
                break;
            };
            let end = (t + step).min(last);
            let forecast = forest.predict(features)?;
            let position =
                Position::from_forecast(forecast, backtest.long_threshold, backtest.allow_short);
            if position != held {
                n_trades += 1;
            }
            let turnover = (position.exposure() - held.exposure()).abs();
            let asset_return = prices[end] / prices[t] - 1.0;
            let strategy_return =
                position.exposure() * asset_return - backtest.transaction_cost * turnover;

            equity *= 1.0 + strategy_return;
            equity_curve.push(equity);
            periods.push(BacktestPeriod {
                start_index: t,
                end_index: end,
                forecast,
                position,
                asset_return,
                strategy_return,
            });
            held = position;
            t = end;
        }

        if periods.is_empty() {
            return Err(RankerError::NoTestPeriod { n_train_rows: n_train });
        }

        let active: Vec<&BacktestPeriod> = periods
            .iter()
            .filter(|p| p.position != Position::Flat)
            .collect();
        let hits = active
            .iter()
            .filter(|p| p.position.exposure() * p.asset_return > 0.0)
            .count();
        let hit_rate = if active.is_empty() {
            0.0
        } else {
            hits as f64 / active.len() as f64
        };
        let returns: Vec<f64> = periods.iter().map(|p| p.strategy_return).collect();

        let report = BacktestReport {
            n_train_rows: n_train,
            fit_quality: result.fit_quality(),
            total_return: equity - 1.0,
            buy_and_hold_return: prices[last] / prices[start] - 1.0,
            hit_rate,
            sharpe_ratio: sharpe_ratio(&returns),
            max_drawdown: max_drawdown(&equity_curve),
            n_trades,
            periods,
            equity_curve,
        };
        debug!(n_periods = report.periods.len(), start, step, "walk-forward complete");
        info!(
            total_return = report.total_return,
            buy_and_hold_return = report.buy_and_hold_return,
            n_trades = report.n_trades,
            "backtest complete"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::{BacktestConfig, Position, max_drawdown, sharpe_ratio};
    use crate::ErrorKind;

    #[test]
    fn position_from_forecast() {
        assert_eq!(Position::from_forecast(0.01, 0.0, false), Position::Long);
        assert_eq!(Position::from_forecast(-0.01, 0.0, false), Position::Flat);
        assert_eq!(Position::from_forecast(-0.01, 0.0, true), Position::Short);
        assert_eq!(Position::from_forecast(0.004, 0.005, true), Position::Flat);
        assert_eq!(Position::from_forecast(-0.004, 0.005, true), Position::Flat);
        assert_eq!(Position::Short.exposure(), -1.0);
    }

    #[test]
    fn drawdown_from_peak() {
        assert_eq!(max_drawdown(&[1.0, 1.1, 1.2]), 0.0);
        let dd = max_drawdown(&[1.0, 2.0, 1.0, 1.5, 0.5]);
        assert!((dd - 0.75).abs() < 1e-12);
    }

    #[test]
    fn sharpe_of_constant_returns_is_zero() {
        assert_eq!(sharpe_ratio(&[0.01, 0.01, 0.01]), 0.0);
        assert_eq!(sharpe_ratio(&[]), 0.0);
        let s = sharpe_ratio(&[0.02, 0.0]);
        assert!((s - 1.0).abs() < 1e-12);
    }

    #[test]
    fn invalid_backtest_config() {
        let cases = [
            BacktestConfig::new().with_train_fraction(0.0),
            BacktestConfig::new().with_train_fraction(1.0),
            BacktestConfig::new().with_rebalance_every(Some(0)),
            BacktestConfig::new().with_transaction_cost(-0.001),
            BacktestConfig::new().with_long_threshold(f64::NAN),
        ];
        for config in cases {
            let err = config.validate().unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidConfiguration, "{err}");
        }
        assert!(BacktestConfig::new().validate().is_ok());
    }
}
