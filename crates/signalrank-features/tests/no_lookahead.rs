//! Causality tests: features never depend on prices after their own step.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use signalrank_features::{FeatureConfig, PriceHistory};

/// Geometric random walk with volumes.
fn random_walk(n: usize, seed: u64) -> (Vec<f64>, Vec<f64>) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut price = 100.0;
    let mut prices = Vec::with_capacity(n);
    let mut volumes = Vec::with_capacity(n);
    for _ in 0..n {
        price *= 1.0 + rng.gen_range(-0.02..0.02);
        prices.push(price);
        volumes.push(rng.gen_range(1_000.0..5_000.0));
    }
    (prices, volumes)
}

#[test]
fn truncated_history_reproduces_prefix_rows() {
    let (prices, volumes) = random_walk(200, 1);
    let config = FeatureConfig::new(5).unwrap();

    let full = config
        .build(&PriceHistory::new(prices.clone(), Some(volumes.clone())).unwrap())
        .unwrap();
    let cut = 120;
    let partial = config
        .build(&PriceHistory::new(prices[..cut].to_vec(), Some(volumes[..cut].to_vec())).unwrap())
        .unwrap();

    assert_eq!(partial.len(), cut - 5 - 49);
    for i in 0..partial.len() {
        assert_eq!(partial.rows()[i], full.rows()[i], "row {i} differs");
        assert_eq!(partial.targets()[i], full.targets()[i]);
    }
}

#[test]
fn latest_vector_matches_future_row() {
    // The last step of a short history is a training row of a longer one.
    let (prices, _) = random_walk(150, 2);
    let config = FeatureConfig::new(3).unwrap();
    let short = config
        .build(&PriceHistory::from_prices(prices[..100].to_vec()).unwrap())
        .unwrap();
    let long = config
        .build(&PriceHistory::from_prices(prices).unwrap())
        .unwrap();

    let t = short.latest().time_index();
    let row = long.time_indices().iter().position(|&i| i == t).unwrap();
    assert_eq!(short.latest().values(), long.rows()[row].as_slice());
}

#[test]
fn every_value_finite() {
    let (prices, volumes) = random_walk(300, 3);
    let matrix = FeatureConfig::default()
        .build(&PriceHistory::new(prices, Some(volumes)).unwrap())
        .unwrap();
    assert!(matrix.rows().iter().flatten().all(|v| v.is_finite()));
    assert!(matrix.targets().iter().all(|v| v.is_finite()));
    let rsi = matrix.column("rsi_14").unwrap();
    assert!(rsi.iter().all(|&r| (0.0..=100.0).contains(&r)));
}
