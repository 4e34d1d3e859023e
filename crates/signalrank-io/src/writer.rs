//! JSON result writer for signal rankings and backtests.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::IoError;
use crate::domain::ExperimentName;

/// One feature's score in a ranking.
///
/// `std` is present only for permutation rankings.
#[derive(Debug, Clone, Serialize)]
pub struct FeatureScore {
    pub name: String,
    pub importance: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub std: Option<f64>,
    pub rank: usize,
}

/// Permutation analysis section of a signal ranking.
#[derive(Debug, Clone, Serialize)]
pub struct PermutationSection {
    pub baseline_mse: f64,
    pub n_repeats: usize,
    /// Number of rows the permutation was measured on.
    pub n_samples: usize,
    /// True when measured on held-out rows rather than training rows.
    pub holdout: bool,
    pub features: Vec<FeatureScore>,
}

/// Signal ranking for one instrument, in plain values.
///
/// The CLI fills this from the ranker's report; the writer has no
/// dependency on the learner crates.
#[derive(Debug, Clone, Serialize)]
pub struct InstrumentSignals {
    pub instrument: String,
    pub n_rows: usize,
    pub horizon: usize,
    pub fit_quality: f64,
    pub low_confidence: bool,
    pub oob_r_squared: Option<f64>,
    /// Forecast forward return at the last price in the series.
    pub latest_forecast: f64,
    pub importances: Vec<FeatureScore>,
    pub permutation: Option<PermutationSection>,
}

/// Backtest outcome for one instrument, in plain values.
#[derive(Debug, Clone, Serialize)]
pub struct BacktestSummary {
    pub instrument: String,
    pub n_train_rows: usize,
    pub n_periods: usize,
    pub n_trades: usize,
    pub total_return: f64,
    pub buy_and_hold_return: f64,
    pub hit_rate: f64,
    pub sharpe_ratio: f64,
    pub max_drawdown: f64,
    pub equity_curve: Vec<f64>,
}

/// Writes signal and backtest results to JSON files.
///
/// Creates the output directory on construction if it does not exist.
/// Output files are named `{experiment}_signals.json` and
/// `{experiment}_backtest.json`.
pub struct ResultWriter {
    output_dir: PathBuf,
    experiment: ExperimentName,
}

impl ResultWriter {
    /// Create a new writer targeting the given directory and experiment name.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::OutputDirCreate`] if the directory cannot be created.
    #[instrument(skip_all, fields(dir = %output_dir.display(), experiment = %experiment))]
    pub fn new(output_dir: &Path, experiment: ExperimentName) -> Result<Self, IoError> {
        fs::create_dir_all(output_dir).map_err(|e| IoError::OutputDirCreate {
            path: output_dir.to_path_buf(),
            source: e,
        })?;
        debug!("output directory ready");
        Ok(Self {
            output_dir: output_dir.to_path_buf(),
            experiment,
        })
    }

    /// Write signal rankings to `{experiment}_signals.json`.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`IoError::Serialize`] | JSON encoding failed |
    /// | [`IoError::WriteFile`] | file write failed |
    #[instrument(skip_all, fields(n_instruments = instruments.len()))]
    pub fn write_signals(
        &self,
        seed: u64,
        n_trees: usize,
        instruments: &[InstrumentSignals],
    ) -> Result<PathBuf, IoError> {
        let artifact = SignalsArtifact {
            experiment: self.experiment.as_str(),
            seed,
            n_trees,
            instruments,
        };
        let path = self.artifact_path("signals");
        self.write_json(&path, &artifact)?;
        info!(path = %path.display(), "signal ranking written");
        Ok(path)
    }

    /// Write backtest results to `{experiment}_backtest.json`.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`IoError::Serialize`] | JSON encoding failed |
    /// | [`IoError::WriteFile`] | file write failed |
    #[instrument(skip_all, fields(n_instruments = results.len()))]
    pub fn write_backtest(
        &self,
        seed: u64,
        transaction_cost: f64,
        results: &[BacktestSummary],
    ) -> Result<PathBuf, IoError> {
        let artifact = BacktestArtifact {
            experiment: self.experiment.as_str(),
            seed,
            transaction_cost,
            results,
        };
        let path = self.artifact_path("backtest");
        self.write_json(&path, &artifact)?;
        info!(path = %path.display(), "backtest result written");
        Ok(path)
    }

    fn artifact_path(&self, kind: &str) -> PathBuf {
        self.output_dir
            .join(format!("{}_{kind}.json", self.experiment.as_str()))
    }

    fn write_json(&self, path: &Path, artifact: &impl Serialize) -> Result<(), IoError> {
        let json = serde_json::to_string_pretty(artifact).map_err(|e| IoError::Serialize {
            path: path.to_path_buf(),
            source: e,
        })?;
        fs::write(path, &json).map_err(|e| IoError::WriteFile {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

// --- Artifact envelopes ---

#[derive(Serialize)]
struct SignalsArtifact<'a> {
    experiment: &'a str,
    seed: u64,
    n_trees: usize,
    instruments: &'a [InstrumentSignals],
}

#[derive(Serialize)]
struct BacktestArtifact<'a> {
    experiment: &'a str,
    seed: u64,
    transaction_cost: f64,
    results: &'a [BacktestSummary],
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_signals() -> InstrumentSignals {
        InstrumentSignals {
            instrument: "SPY".into(),
            n_rows: 200,
            horizon: 5,
            fit_quality: 0.42,
            low_confidence: false,
            oob_r_squared: None,
            latest_forecast: 0.003,
            importances: vec![
                FeatureScore {
                    name: "momentum_10".into(),
                    importance: 0.7,
                    std: None,
                    rank: 1,
                },
                FeatureScore {
                    name: "rsi_14".into(),
                    importance: 0.3,
                    std: None,
                    rank: 2,
                },
            ],
            permutation: Some(PermutationSection {
                baseline_mse: 1e-4,
                n_repeats: 10,
                n_samples: 200,
                holdout: false,
                features: vec![FeatureScore {
                    name: "momentum_10".into(),
                    importance: 2e-5,
                    std: Some(1e-6),
                    rank: 1,
                }],
            }),
        }
    }

    #[test]
    fn write_signals_json_structure() {
        let dir = TempDir::new().unwrap();
        let experiment = ExperimentName::new("test_run".into()).unwrap();
        let writer = ResultWriter::new(dir.path(), experiment).unwrap();

        let path = writer.write_signals(42, 50, &[sample_signals()]).unwrap();
        assert_eq!(path, dir.path().join("test_run_signals.json"));

        let content: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(content["experiment"], "test_run");
        assert_eq!(content["seed"], 42);
        assert_eq!(content["n_trees"], 50);

        let inst = &content["instruments"][0];
        assert_eq!(inst["instrument"], "SPY");
        assert!(inst["oob_r_squared"].is_null());
        assert_eq!(inst["importances"].as_array().unwrap().len(), 2);
        // Variance-reduction scores carry no std field.
        assert!(inst["importances"][0].get("std").is_none());
        assert_eq!(inst["permutation"]["features"][0]["std"], 1e-6);
    }

    #[test]
    fn write_backtest_json_structure() {
        let dir = TempDir::new().unwrap();
        let experiment = ExperimentName::new("bt".into()).unwrap();
        let writer = ResultWriter::new(dir.path(), experiment).unwrap();

        let summary = BacktestSummary {
            instrument: "SPY".into(),
            n_train_rows: 150,
            n_periods: 10,
            n_trades: 3,
            total_return: 0.05,
            buy_and_hold_return: 0.02,
            hit_rate: 0.6,
            sharpe_ratio: 0.4,
            max_drawdown: 0.01,
            equity_curve: vec![1.0, 1.01, 1.05],
        };
        let path = writer.write_backtest(7, 0.001, &[summary]).unwrap();

        let content: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(content["transaction_cost"], 0.001);
        assert_eq!(content["results"][0]["n_trades"], 3);
        assert_eq!(content["results"][0]["equity_curve"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn creates_nested_output_dir() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("nested").join("deep");
        let experiment = ExperimentName::new("nested_test".into()).unwrap();
        let writer = ResultWriter::new(&nested, experiment).unwrap();
        writer.write_signals(1, 1, &[]).unwrap();
        assert!(nested.join("nested_test_signals.json").exists());
    }
}
