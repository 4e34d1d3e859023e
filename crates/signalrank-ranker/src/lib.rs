//! Rank technical signals of a price series by their predictive power.
//!
//! [`SignalRanker`] turns a [`signalrank_features::PriceHistory`] into a
//! feature matrix, trains a regression forest on forward returns and reports
//! the features ranked by variance-reduction and permutation importance,
//! together with a forecast from the most recent prices. Several instruments
//! are ranked in parallel with [`SignalRanker::rank_many`], and
//! [`SignalRanker::backtest`] trades the forecasts walk-forward.

mod backtest;
mod config;
mod error;
mod ranker;
mod report;

pub use backtest::{BacktestConfig, BacktestPeriod, BacktestReport, Position};
pub use config::RankerConfig;
pub use error::{ErrorKind, RankerError};
pub use ranker::SignalRanker;
pub use report::SignalReport;
