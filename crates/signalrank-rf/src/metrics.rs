//! Regression error metrics.

/// Mean squared error between `targets` and `predictions`.
///
/// Returns 0.0 for empty input.
#[must_use]
pub fn mean_squared_error(targets: &[f64], predictions: &[f64]) -> f64 {
    debug_assert_eq!(targets.len(), predictions.len());
    if targets.is_empty() {
        return 0.0;
    }
    let sse: f64 = targets
        .iter()
        .zip(predictions)
        .map(|(t, p)| (t - p) * (t - p))
        .sum();
    sse / targets.len() as f64
}

/// Coefficient of determination, `1 - RSS / TSS`.
///
/// Returns 0.0 when the targets have no variance, since there is nothing to
/// explain.
#[must_use]
pub fn r_squared(targets: &[f64], predictions: &[f64]) -> f64 {
    debug_assert_eq!(targets.len(), predictions.len());
    if targets.is_empty() {
        return 0.0;
    }
    let mean = targets.iter().sum::<f64>() / targets.len() as f64;
    let tss: f64 = targets.iter().map(|t| (t - mean) * (t - mean)).sum();
    if tss <= 0.0 {
        return 0.0;
    }
    let rss: f64 = targets
        .iter()
        .zip(predictions)
        .map(|(t, p)| (t - p) * (t - p))
        .sum();
    1.0 - rss / tss
}

#[cfg(test)]
mod tests {
    use super::{mean_squared_error, r_squared};

    #[test]
    fn perfect_fit() {
        let y = [1.0, 2.0, 3.0];
        assert_eq!(mean_squared_error(&y, &y), 0.0);
        assert!((r_squared(&y, &y) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn mean_prediction_scores_zero() {
        let y = [1.0, 2.0, 3.0];
        let p = [2.0, 2.0, 2.0];
        assert!(r_squared(&y, &p).abs() < 1e-12);
        assert!((mean_squared_error(&y, &p) - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn constant_targets_score_zero() {
        assert_eq!(r_squared(&[0.5, 0.5], &[0.5, 0.5]), 0.0);
    }

    #[test]
    fn empty_input() {
        assert_eq!(mean_squared_error(&[], &[]), 0.0);
        assert_eq!(r_squared(&[], &[]), 0.0);
    }
}
