//! Validated closing-price history with optional volumes.

use crate::error::FeatureError;

/// An ordered series of closing prices, oldest first, with optional volumes.
///
/// Construction validates every value, so downstream indicator code can
/// divide by prices and take logarithms without further checks.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceHistory {
    prices: Vec<f64>,
    volumes: Option<Vec<f64>>,
}

impl PriceHistory {
    /// Create a history from closing prices and optional matching volumes.
    ///
    /// # Errors
    ///
    /// | Variant                                  | When                                   |
    /// |------------------------------------------|----------------------------------------|
    /// | [`FeatureError::InvalidPrice`]           | a price is NaN, infinite, or `<= 0`    |
    /// | [`FeatureError::VolumeLengthMismatch`]   | volumes differ in length from prices   |
    /// | [`FeatureError::InvalidVolume`]          | a volume is NaN, infinite, or negative |
    pub fn new(prices: Vec<f64>, volumes: Option<Vec<f64>>) -> Result<Self, FeatureError> {
        if let Some((index, &value)) = prices
            .iter()
            .enumerate()
            .find(|&(_, &p)| !p.is_finite() || p <= 0.0)
        {
            return Err(FeatureError::InvalidPrice { index, value });
        }

        if let Some(volumes) = &volumes {
            if volumes.len() != prices.len() {
                return Err(FeatureError::VolumeLengthMismatch {
                    prices: prices.len(),
                    volumes: volumes.len(),
                });
            }
            if let Some((index, &value)) = volumes
                .iter()
                .enumerate()
                .find(|&(_, &v)| !v.is_finite() || v < 0.0)
            {
                return Err(FeatureError::InvalidVolume { index, value });
            }
        }

        Ok(Self { prices, volumes })
    }

    /// Create a price-only history.
    ///
    /// # Errors
    ///
    /// Returns [`FeatureError::InvalidPrice`] for any non-finite or non-positive price.
    pub fn from_prices(prices: Vec<f64>) -> Result<Self, FeatureError> {
        Self::new(prices, None)
    }

    #[must_use]
    pub fn prices(&self) -> &[f64] {
        &self.prices
    }

    #[must_use]
    pub fn volumes(&self) -> Option<&[f64]> {
        self.volumes.as_deref()
    }

    #[must_use]
    pub fn has_volumes(&self) -> bool {
        self.volumes.is_some()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.prices.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }
}
