/// Errors from price-history validation and feature construction.
#[derive(Debug, thiserror::Error)]
pub enum FeatureError {
    /// Returned when the forecast horizon is zero.
    #[error("horizon must be at least 1, got {horizon}")]
    InvalidHorizon {
        /// The invalid horizon value provided.
        horizon: usize,
    },

    /// Returned when a price is non-finite or not strictly positive.
    #[error("price at index {index} must be finite and positive, got {value}")]
    InvalidPrice {
        /// Position in the series.
        index: usize,
        /// The rejected value.
        value: f64,
    },

    /// Returned when a volume is non-finite or negative.
    #[error("volume at index {index} must be finite and non-negative, got {value}")]
    InvalidVolume {
        /// Position in the series.
        index: usize,
        /// The rejected value.
        value: f64,
    },

    /// Returned when volumes are supplied but do not match the price count.
    #[error("got {volumes} volumes for {prices} prices")]
    VolumeLengthMismatch {
        /// Number of prices.
        prices: usize,
        /// Number of volumes.
        volumes: usize,
    },

    /// Returned when the series is shorter than the configured minimum history.
    #[error("need at least {required} prices, got {got} ({} short)", .required - .got)]
    InsufficientHistory {
        /// Minimum number of prices required.
        required: usize,
        /// Number of prices supplied.
        got: usize,
    },

    /// Returned when the horizon leaves no row with both features and a target.
    #[error(
        "horizon {horizon} leaves no training rows for {got} prices; \
         {shortfall} more prices needed"
    )]
    HorizonExceedsHistory {
        /// The configured horizon.
        horizon: usize,
        /// Number of prices supplied.
        got: usize,
        /// Additional prices needed for one training row.
        shortfall: usize,
    },
}

impl FeatureError {
    /// Return `true` when the error stems from too little data rather than bad values.
    #[must_use]
    pub fn is_insufficient_data(&self) -> bool {
        matches!(
            self,
            Self::InsufficientHistory { .. } | Self::HorizonExceedsHistory { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::FeatureError;

    #[test]
    fn shortfall_in_message() {
        let err = FeatureError::HorizonExceedsHistory {
            horizon: 200,
            got: 100,
            shortfall: 150,
        };
        let msg = err.to_string();
        assert!(msg.contains("150 more prices"), "{msg}");
        assert!(err.is_insufficient_data());
    }

    #[test]
    fn insufficient_history_names_gap() {
        let err = FeatureError::InsufficientHistory {
            required: 60,
            got: 45,
        };
        assert!(err.to_string().contains("15 short"));
    }

    #[test]
    fn value_errors_are_not_insufficient_data() {
        let err = FeatureError::InvalidPrice {
            index: 3,
            value: -1.0,
        };
        assert!(!err.is_insufficient_data());
    }
}
