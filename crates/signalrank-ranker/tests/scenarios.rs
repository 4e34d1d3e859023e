//! End-to-end ranking scenarios on synthetic price series.
//!
//! Each series has a known structure, so the ranking it must produce is
//! predictable without fixing exact importance values.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use signalrank_features::PriceHistory;
use signalrank_ranker::{
    BacktestConfig, ErrorKind, Position, RankerConfig, RankerError, SignalRanker,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn history(prices: Vec<f64>) -> PriceHistory {
    PriceHistory::from_prices(prices).unwrap()
}

/// Prices rising by one unit per step from 100.
fn linear_up(n: usize) -> PriceHistory {
    history((0..n).map(|t| 100.0 + t as f64).collect())
}

/// Prices falling by one unit per step from 400.
fn linear_down(n: usize) -> PriceHistory {
    history((0..n).map(|t| 400.0 - t as f64).collect())
}

/// Prices alternating 100, 101, 100, ...
fn alternating(n: usize) -> PriceHistory {
    history((0..n).map(|t| if t % 2 == 0 { 100.0 } else { 101.0 }).collect())
}

/// Geometric random walk with 1% step noise.
fn random_walk(n: usize, seed: u64) -> PriceHistory {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut price = 100.0;
    let prices = (0..n)
        .map(|_| {
            price *= 1.0 + 0.01 * (rng.r#gen::<f64>() - 0.5);
            price
        })
        .collect();
    history(prices)
}

fn ranker() -> SignalRanker {
    SignalRanker::new(RankerConfig::new(50).unwrap())
}

// ---------------------------------------------------------------------------
// a) trending prices
// ---------------------------------------------------------------------------

#[test]
fn trend_is_fit_by_trend_features() {
    let report = ranker().rank(&linear_up(300)).unwrap();

    assert!(
        report.fit_quality > 0.99,
        "fit_quality {} below 0.99",
        report.fit_quality
    );
    assert!(!report.low_confidence);

    // RSI sits at 100 on every row, and every 5-step window of an integer
    // ramp has the same z-score; neither column can split.
    assert_eq!(report.importance_of("rsi_14"), Some(0.0));
    assert_eq!(report.importance_of("mean_reversion_5"), Some(0.0));

    // The monotone columns induce identical partitions, so they share the
    // importance and 20-step momentum holds a comparable slice of it.
    let trend_features = [
        "momentum_10",
        "momentum_20",
        "price_sma20_ratio",
        "price_sma50_ratio",
        "volatility_20",
    ];
    let top = report.top_signal().unwrap();
    assert!(
        trend_features.contains(&top.name.as_str()),
        "unexpected top signal {}",
        top.name
    );
    let shares: Vec<f64> = trend_features
        .iter()
        .map(|name| report.importance_of(name).unwrap())
        .collect();
    assert!((shares.iter().sum::<f64>() - 1.0).abs() < 1e-9);

    let momentum = report.importance_of("momentum_20").unwrap();
    assert!(
        momentum >= 0.5 * top.importance,
        "momentum_20 {momentum} far below top share {}",
        top.importance
    );
}

#[test]
fn latest_forecast_follows_trend() {
    let report = ranker().rank(&linear_up(300)).unwrap();
    assert!(report.latest_forecast > 0.0);

    let report = ranker().rank(&linear_down(300)).unwrap();
    assert!(report.latest_forecast < 0.0);
}

// ---------------------------------------------------------------------------
// b) alternating prices
// ---------------------------------------------------------------------------

#[test]
fn alternation_is_explained_by_mean_reversion() {
    let report = ranker().rank(&alternating(300)).unwrap();

    // Even lags see the same price, so both momentum columns are all zero.
    for name in ["momentum_10", "momentum_20"] {
        assert_eq!(report.importance_of(name), Some(0.0), "{name}");
        assert_eq!(report.permutation_importance_of(name), Some(0.0), "{name}");
    }

    assert_eq!(report.importances[0].name, "mean_reversion_5");
    let permutation = report.permutation.as_ref().unwrap();
    assert_eq!(permutation.features[0].name, "mean_reversion_5");

    let reversion = report.importance_of("mean_reversion_5").unwrap();
    assert!(reversion > 0.0);
    assert!(reversion > report.importance_of("momentum_10").unwrap());

    let reversion_perm = report.permutation_importance_of("mean_reversion_5").unwrap();
    assert!(reversion_perm > 0.0);
    assert!(reversion_perm > report.permutation_importance_of("momentum_20").unwrap());
}

// ---------------------------------------------------------------------------
// c) invalid configuration
// ---------------------------------------------------------------------------

#[test]
fn zero_trees_rejected() {
    let err = RankerConfig::new(0).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidConfiguration);
}

#[test]
fn invalid_configuration_returns_no_report() {
    let config = RankerConfig::new(10).unwrap().with_min_samples_leaf(0);
    let err = SignalRanker::new(config).rank(&linear_up(300)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidConfiguration);

    let config = RankerConfig::new(10).unwrap().with_horizon(0);
    let err = SignalRanker::new(config).rank(&linear_up(300)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidConfiguration);
}

// ---------------------------------------------------------------------------
// d) insufficient data
// ---------------------------------------------------------------------------

#[test]
fn horizon_longer_than_series() {
    let config = RankerConfig::new(10).unwrap().with_horizon(200);
    let err = SignalRanker::new(config).rank(&linear_up(100)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InsufficientData);
    assert!(err.to_string().contains("150"), "{err}");
}

#[test]
fn too_few_prices() {
    let err = ranker().rank(&linear_up(40)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InsufficientData);
    assert!(matches!(err, RankerError::Feature(_)));
}

#[test]
fn invalid_prices_rejected_on_construction() {
    assert!(PriceHistory::from_prices(vec![100.0, f64::NAN, 101.0]).is_err());
    assert!(PriceHistory::from_prices(vec![100.0, -1.0]).is_err());
}

// ---------------------------------------------------------------------------
// e) determinism and report shape
// ---------------------------------------------------------------------------

#[test]
fn identical_inputs_give_identical_reports() {
    let prices = random_walk(250, 7);
    let a = ranker().rank(&prices).unwrap();
    let b = ranker().rank(&prices).unwrap();
    assert_eq!(a.importances, b.importances);
    assert_eq!(a.fit_quality, b.fit_quality);
    assert_eq!(a.latest_forecast, b.latest_forecast);
    assert_eq!(
        a.permutation.as_ref().unwrap().features,
        b.permutation.as_ref().unwrap().features
    );
}

#[test]
fn importances_are_a_ranked_distribution() {
    let report = ranker().rank(&random_walk(250, 11)).unwrap();
    assert_eq!(report.importances.len(), 7);

    let total: f64 = report.importances.iter().map(|f| f.importance).sum();
    assert!((total - 1.0).abs() < 1e-9, "importances sum to {total}");
    for pair in report.importances.windows(2) {
        assert!(pair[0].importance >= pair[1].importance);
    }
    for (i, feature) in report.importances.iter().enumerate() {
        assert_eq!(feature.rank, i + 1);
        assert!(feature.importance >= 0.0);
    }
}

#[test]
fn volumes_add_two_features() {
    let prices: Vec<f64> = (0..200).map(|t| 100.0 + (t % 7) as f64).collect();
    let volumes: Vec<f64> = (0..200).map(|t| 1_000.0 + (t % 11) as f64 * 50.0).collect();
    let history = PriceHistory::new(prices, Some(volumes)).unwrap();
    let report = ranker().rank(&history).unwrap();
    assert_eq!(report.importances.len(), 9);
    assert!(report.importance_of("volume_ratio_20").is_some());
    assert!(report.importance_of("volume_trend_5_20").is_some());
}

#[test]
fn oob_score_reported_when_enabled() {
    let config = RankerConfig::new(30)
        .unwrap()
        .with_oob_mode(signalrank_rf::OobMode::Enabled);
    let report = SignalRanker::new(config).rank(&linear_up(300)).unwrap();
    let oob = report.oob_score.unwrap();
    assert!(oob.r_squared > 0.5, "oob r2 {}", oob.r_squared);
}

#[test]
fn rank_many_matches_individual_runs() {
    let instruments = vec![
        ("up".to_string(), linear_up(300)),
        ("alt".to_string(), alternating(300)),
        ("walk".to_string(), random_walk(250, 3)),
    ];
    let ranker = ranker();
    let results = ranker.rank_many(&instruments);
    assert_eq!(results.len(), 3);
    for ((name, history), (got_name, got)) in instruments.iter().zip(&results) {
        assert_eq!(name, got_name);
        let alone = ranker.rank(history).unwrap();
        assert_eq!(alone.importances, got.as_ref().unwrap().importances);
    }
}

// ---------------------------------------------------------------------------
// f) backtest
// ---------------------------------------------------------------------------

#[test]
fn uptrend_backtest_stays_long() {
    let report = ranker()
        .backtest(&linear_up(300), &BacktestConfig::new())
        .unwrap();

    assert!(!report.periods.is_empty());
    assert_eq!(report.equity_curve.len(), report.periods.len() + 1);
    assert_eq!(report.equity_curve[0], 1.0);
    assert!(report.periods.iter().all(|p| p.position == Position::Long));
    assert_eq!(report.n_trades, 1);
    assert_eq!(report.hit_rate, 1.0);
    assert_eq!(report.max_drawdown, 0.0);

    // Only the entry cost separates the strategy from buy-and-hold.
    assert!(report.total_return < report.buy_and_hold_return);
    assert!(report.total_return > report.buy_and_hold_return - 0.002);
    assert_eq!(report.periods.last().unwrap().end_index, 299);
}

#[test]
fn downtrend_backtest_stays_flat_without_shorting() {
    let report = ranker()
        .backtest(&linear_down(300), &BacktestConfig::new())
        .unwrap();
    assert!(report.periods.iter().all(|p| p.position == Position::Flat));
    assert_eq!(report.n_trades, 0);
    assert_eq!(report.total_return, 0.0);
    assert_eq!(report.hit_rate, 0.0);
    assert_eq!(report.sharpe_ratio, 0.0);
    assert!(report.buy_and_hold_return < 0.0);
}

#[test]
fn downtrend_backtest_profits_from_shorting() {
    let backtest = BacktestConfig::new()
        .with_allow_short(true)
        .with_transaction_cost(0.0);
    let report = ranker().backtest(&linear_down(300), &backtest).unwrap();
    assert!(report.periods.iter().all(|p| p.position == Position::Short));
    assert!(report.total_return > 0.0);
    assert_eq!(report.hit_rate, 1.0);
}

#[test]
fn rebalance_period_sets_period_length() {
    let backtest = BacktestConfig::new().with_rebalance_every(Some(1));
    let report = ranker().backtest(&linear_up(300), &backtest).unwrap();
    for period in &report.periods {
        assert_eq!(period.end_index, period.start_index + 1);
    }
}

#[test]
fn backtest_errors_are_classified() {
    let err = ranker()
        .backtest(&linear_up(300), &BacktestConfig::new().with_train_fraction(1.5))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidConfiguration);

    // 6 feature rows: 4 go to training, all of them purged.
    let err = ranker()
        .backtest(&linear_up(60), &BacktestConfig::new())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InsufficientData);
}
