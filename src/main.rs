use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::{info, warn};

use signalrank_features::PriceHistory;
use signalrank_io::{
    BacktestSummary, ExperimentName, FeatureScore, InstrumentSignals, PermutationSection,
    PriceReader, ResultWriter,
};
use signalrank_ranker::{
    BacktestConfig, BacktestReport, ErrorKind, RankerConfig, RankerError, SignalRanker,
    SignalReport,
};
use signalrank_rf::OobMode;

#[derive(Parser)]
#[command(name = "signalrank")]
#[command(about = "Rank technical signals by how well they forecast forward returns")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// RNG seed for reproducibility
    #[arg(long, default_value_t = 42, global = true)]
    seed: u64,

    /// Enable verbose (debug-level) logging
    #[arg(long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(long, global = true)]
    quiet: bool,

    /// Number of threads for parallel computation (defaults to all cores)
    #[arg(long, global = true)]
    threads: Option<usize>,
}

/// Inputs and forest parameters shared by every subcommand.
#[derive(Args, Debug, Clone)]
struct RankArgs {
    /// Price CSV with a `close` column and optional `volume` column (repeatable)
    #[arg(long, required = true)]
    data: Vec<PathBuf>,

    /// Experiment name for output files (must match [a-zA-Z0-9_-]+)
    #[arg(long)]
    experiment: String,

    /// Output directory for result files
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,

    /// Number of trees in the forest
    #[arg(long, default_value_t = 50)]
    n_trees: usize,

    /// Maximum tree depth
    #[arg(long, default_value_t = 5)]
    max_depth: usize,

    /// Minimum rows per leaf
    #[arg(long, default_value_t = 5)]
    min_samples_leaf: usize,

    /// Forecast horizon in steps
    #[arg(long, default_value_t = 5)]
    horizon: usize,

    /// Minimum number of prices per instrument
    #[arg(long, default_value_t = 60)]
    min_history: usize,
}

impl RankArgs {
    fn ranker_config(&self, seed: u64) -> Result<RankerConfig> {
        Ok(RankerConfig::new(self.n_trees)?
            .with_max_depth(self.max_depth)
            .with_min_samples_leaf(self.min_samples_leaf)
            .with_horizon(self.horizon)
            .with_min_history(self.min_history)
            .with_seed(seed))
    }
}

#[derive(Subcommand)]
enum Command {
    /// Train a forest per instrument and rank its technical signals
    Rank {
        #[command(flatten)]
        args: RankArgs,

        /// Shuffles per feature for permutation importance
        #[arg(long, default_value_t = 10)]
        permutation_repeats: usize,

        /// Skip permutation importance
        #[arg(long, default_value_t = false)]
        no_permutation: bool,

        /// Fraction of the latest rows held out for permutation importance
        #[arg(long, default_value_t = 0.0)]
        holdout_fraction: f64,

        /// Report out-of-bag R²
        #[arg(long, default_value_t = false)]
        oob: bool,
    },

    /// Trade the forest's forecasts walk-forward over the latest part of each series
    Backtest {
        #[command(flatten)]
        args: RankArgs,

        /// Fraction of feature rows used for training
        #[arg(long, default_value_t = 0.7)]
        train_fraction: f64,

        /// Steps between rebalances (defaults to the horizon)
        #[arg(long)]
        rebalance_every: Option<usize>,

        /// Cost per unit of turnover, as a fraction of equity
        #[arg(long, default_value_t = 0.001)]
        transaction_cost: f64,

        /// Forecast return required to take a position
        #[arg(long, default_value_t = 0.0)]
        long_threshold: f64,

        /// Go short on forecasts below minus the threshold
        #[arg(long, default_value_t = false)]
        allow_short: bool,
    },
}

// --- JSON stdout output structs ---

#[derive(Serialize)]
struct RankOutput {
    experiment: String,
    n_instruments: usize,
    instruments: Vec<InstrumentOutput>,
}

#[derive(Serialize)]
struct InstrumentOutput {
    instrument: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_signal: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    fit_quality: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    latest_forecast: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    total_return: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_kind: Option<ErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl InstrumentOutput {
    fn failed(instrument: &str, err: &RankerError) -> Self {
        Self {
            instrument: instrument.to_string(),
            top_signal: None,
            fit_quality: None,
            latest_forecast: None,
            total_return: None,
            error_kind: Some(err.kind()),
            error: Some(err.to_string()),
        }
    }
}

fn load_histories(paths: &[PathBuf]) -> Result<Vec<(String, PriceHistory)>> {
    paths
        .iter()
        .map(|path| {
            let reader = PriceReader::new(path);
            let history = reader
                .read()
                .with_context(|| format!("failed to read price CSV {}", path.display()))?;
            info!(
                instrument = %reader.instrument_id(),
                n_prices = history.len(),
                with_volumes = history.has_volumes(),
                "prices loaded"
            );
            Ok((reader.instrument_id().as_str().to_string(), history))
        })
        .collect()
}

fn signals_entry(instrument: &str, report: &SignalReport) -> InstrumentSignals {
    InstrumentSignals {
        instrument: instrument.to_string(),
        n_rows: report.n_train_rows,
        horizon: report.horizon,
        fit_quality: report.fit_quality,
        low_confidence: report.low_confidence,
        oob_r_squared: report.oob_score.as_ref().map(|s| s.r_squared),
        latest_forecast: report.latest_forecast,
        importances: report
            .importances
            .iter()
            .map(|f| FeatureScore {
                name: f.name.clone(),
                importance: f.importance,
                std: None,
                rank: f.rank,
            })
            .collect(),
        permutation: report.permutation.as_ref().map(|p| PermutationSection {
            baseline_mse: p.baseline_mse,
            n_repeats: p.n_repeats,
            n_samples: p.n_samples,
            holdout: report.permutation_on_holdout,
            features: p
                .features
                .iter()
                .map(|f| FeatureScore {
                    name: f.name.clone(),
                    importance: f.importance,
                    std: Some(f.std),
                    rank: f.rank,
                })
                .collect(),
        }),
    }
}

fn backtest_entry(instrument: &str, report: &BacktestReport) -> BacktestSummary {
    BacktestSummary {
        instrument: instrument.to_string(),
        n_train_rows: report.n_train_rows,
        n_periods: report.periods.len(),
        n_trades: report.n_trades,
        total_return: report.total_return,
        buy_and_hold_return: report.buy_and_hold_return,
        hit_rate: report.hit_rate,
        sharpe_ratio: report.sharpe_ratio,
        max_drawdown: report.max_drawdown,
        equity_curve: report.equity_curve.clone(),
    }
}

fn print_summary(experiment: String, instruments: Vec<InstrumentOutput>) -> Result<()> {
    let output = RankOutput {
        experiment,
        n_instruments: instruments.len(),
        instruments,
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn run_rank(
    seed: u64,
    args: &RankArgs,
    permutation_repeats: Option<usize>,
    holdout_fraction: f64,
    oob: bool,
) -> Result<()> {
    let experiment_name = ExperimentName::new(args.experiment.clone())?;
    let config = args
        .ranker_config(seed)?
        .with_permutation_repeats(permutation_repeats)
        .with_holdout_fraction(holdout_fraction)
        .with_oob_mode(if oob { OobMode::Enabled } else { OobMode::Disabled });
    let n_trees = config.n_trees();

    let histories = load_histories(&args.data)?;
    let ranker = SignalRanker::new(config);
    let results = ranker.rank_many(&histories);

    let mut signals = Vec::new();
    let mut outputs = Vec::with_capacity(results.len());
    for (instrument, result) in &results {
        match result {
            Ok(report) => {
                signals.push(signals_entry(instrument, report));
                outputs.push(InstrumentOutput {
                    instrument: instrument.to_string(),
                    top_signal: report.top_signal().map(|f| f.name.clone()),
                    fit_quality: Some(report.fit_quality),
                    latest_forecast: Some(report.latest_forecast),
                    total_return: None,
                    error_kind: None,
                    error: None,
                });
            }
            Err(e) => outputs.push(InstrumentOutput::failed(instrument, e)),
        }
    }

    let writer = ResultWriter::new(&args.output_dir, experiment_name)?;
    writer.write_signals(seed, n_trees, &signals)?;

    let all_failed = outputs.iter().all(|o| o.error_kind.is_some());
    print_summary(args.experiment.clone(), outputs)?;
    if all_failed {
        anyhow::bail!("every instrument failed; see the summary for details");
    }
    Ok(())
}

fn run_backtest(seed: u64, args: &RankArgs, backtest: &BacktestConfig) -> Result<()> {
    let experiment_name = ExperimentName::new(args.experiment.clone())?;
    // Permutation importance plays no part in trading.
    let config = args.ranker_config(seed)?.with_permutation_repeats(None);

    let histories = load_histories(&args.data)?;
    let ranker = SignalRanker::new(config);

    let mut summaries = Vec::new();
    let mut outputs = Vec::with_capacity(histories.len());
    for (instrument, history) in &histories {
        match ranker.backtest(history, backtest) {
            Ok(report) => {
                summaries.push(backtest_entry(instrument, &report));
                outputs.push(InstrumentOutput {
                    instrument: instrument.clone(),
                    top_signal: None,
                    fit_quality: Some(report.fit_quality),
                    latest_forecast: None,
                    total_return: Some(report.total_return),
                    error_kind: None,
                    error: None,
                });
            }
            Err(e) => {
                warn!(instrument = %instrument, kind = %e.kind(), error = %e, "backtest failed");
                outputs.push(InstrumentOutput::failed(instrument, &e));
            }
        }
    }

    let writer = ResultWriter::new(&args.output_dir, experiment_name)?;
    writer.write_backtest(seed, backtest.transaction_cost(), &summaries)?;

    let all_failed = outputs.iter().all(|o| o.error_kind.is_some());
    print_summary(args.experiment.clone(), outputs)?;
    if all_failed {
        anyhow::bail!("every instrument failed; see the summary for details");
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match (cli.verbose, cli.quiet) {
        (true, _) => "debug",
        (_, true) => "error",
        _ => "info",
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("failed to configure thread pool")?;
        info!(threads, "thread pool configured");
    }

    match cli.command {
        Command::Rank {
            args,
            permutation_repeats,
            no_permutation,
            holdout_fraction,
            oob,
        } => {
            info!(output_dir = %args.output_dir.display(), "ranking signals");
            let repeats = (!no_permutation).then_some(permutation_repeats);
            run_rank(cli.seed, &args, repeats, holdout_fraction, oob)
                .context("signal ranking failed")?;
        }

        Command::Backtest {
            args,
            train_fraction,
            rebalance_every,
            transaction_cost,
            long_threshold,
            allow_short,
        } => {
            info!(output_dir = %args.output_dir.display(), "running backtest");
            let backtest = BacktestConfig::new()
                .with_train_fraction(train_fraction)
                .with_rebalance_every(rebalance_every)
                .with_transaction_cost(transaction_cost)
                .with_long_threshold(long_threshold)
                .with_allow_short(allow_short);
            run_backtest(cli.seed, &args, &backtest).context("backtest failed")?;
        }
    }

    Ok(())
}
