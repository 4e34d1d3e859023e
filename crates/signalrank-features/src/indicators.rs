//! Window statistics and technical indicators over closing prices.
//!
//! Every function reads only values at or before the index it is evaluated
//! at; callers are responsible for staying past each indicator's warmup.

/// Arithmetic mean. Returns 0.0 for an empty slice.
#[must_use]
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Mean and population standard deviation (ddof=0), two-pass.
#[must_use]
pub fn mean_std(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / values.len() as f64;
    (m, var.sqrt())
}

/// Simple moving average of the `period` values ending at `end` (inclusive).
///
/// Requires `end + 1 >= period`.
#[must_use]
pub fn sma_at(values: &[f64], end: usize, period: usize) -> f64 {
    mean(&values[end + 1 - period..=end])
}

/// Single-step log returns; element `i` is `ln(p[i + 1] / p[i])`.
#[must_use]
pub fn log_returns(prices: &[f64]) -> Vec<f64> {
    prices.windows(2).map(|w| (w[1] / w[0]).ln()).collect()
}

/// Wilder-smoothed RSI over the whole series.
///
/// Entry `t` is `None` until `period` price changes are available. The
/// first value seeds the averages with a simple mean of the first `period`
/// gains and losses; later values use Wilder's recursive smoothing. A window
/// with no losses scores 100.
#[must_use]
pub fn wilder_rsi(prices: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; prices.len()];
    if period == 0 || prices.len() <= period {
        return out;
    }

    let changes: Vec<f64> = prices.windows(2).map(|w| w[1] - w[0]).collect();
    let gain = |c: f64| c.max(0.0);
    let loss = |c: f64| (-c).max(0.0);

    let p = period as f64;
    let mut avg_gain = changes[..period].iter().copied().map(gain).sum::<f64>() / p;
    let mut avg_loss = changes[..period].iter().copied().map(loss).sum::<f64>() / p;
    out[period] = Some(rsi_value(avg_gain, avg_loss));

    for t in period + 1..prices.len() {
        let change = changes[t - 1];
        avg_gain = (avg_gain * (p - 1.0) + gain(change)) / p;
        avg_loss = (avg_loss * (p - 1.0) + loss(change)) / p;
        out[t] = Some(rsi_value(avg_gain, avg_loss));
    }
    out
}

fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        return 100.0;
    }
    100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
}

/// Rate of change `p[t] / p[t - lag] - 1`. Requires `t >= lag`.
#[must_use]
pub fn momentum(prices: &[f64], t: usize, lag: usize) -> f64 {
    prices[t] / prices[t - lag] - 1.0
}

/// Z-score of the last value in `window` against the window's own mean and
/// population standard deviation.
///
/// Returns 0.0 when the window is flat (std within rounding of zero).
#[must_use]
pub fn zscore_last(window: &[f64]) -> f64 {
    let Some(&last) = window.last() else {
        return 0.0;
    };
    let (m, sd) = mean_std(window);
    if sd <= f64::EPSILON * m.abs() {
        return 0.0;
    }
    (last - m) / sd
}

/// `numerator / denominator`, or 1.0 when the denominator is zero.
#[must_use]
pub fn ratio_or_one(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        1.0
    } else {
        numerator / denominator
    }
}
