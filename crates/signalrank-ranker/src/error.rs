use signalrank_features::FeatureError;
use signalrank_rf::RfError;

/// Coarse classification of every failure a ranking request can hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum ErrorKind {
    /// Too little history, or a horizon that leaves no training rows.
    InsufficientData,
    /// A configuration value outside its valid range.
    InvalidConfiguration,
    /// Malformed or out-of-domain input values.
    InvalidInput,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::InsufficientData => "insufficient data",
            Self::InvalidConfiguration => "invalid configuration",
            Self::InvalidInput => "invalid input",
        };
        f.write_str(s)
    }
}

/// Errors from signal ranking and backtesting.
#[derive(Debug, thiserror::Error)]
pub enum RankerError {
    /// Feature construction or history validation failed.
    #[error(transparent)]
    Feature(#[from] FeatureError),

    /// Forest training, prediction, or permutation analysis failed.
    #[error(transparent)]
    Forest(#[from] RfError),

    /// Returned when the holdout fraction is outside [0.0, 1.0).
    #[error("holdout_fraction must be in [0.0, 1.0), got {fraction}")]
    InvalidHoldoutFraction {
        /// The rejected fraction.
        fraction: f64,
    },

    /// Returned when the backtest training fraction is outside (0.0, 1.0).
    #[error("train_fraction must be in (0.0, 1.0), got {fraction}")]
    InvalidTrainFraction {
        /// The rejected fraction.
        fraction: f64,
    },

    /// Returned when the rebalance period is zero.
    #[error("rebalance_every must be at least 1, got {rebalance_every}")]
    InvalidRebalancePeriod {
        /// The rejected period.
        rebalance_every: usize,
    },

    /// Returned when a cost or threshold is negative or non-finite.
    #[error("{name} must be finite and non-negative, got {value}")]
    InvalidRate {
        /// Name of the parameter.
        name: &'static str,
        /// The rejected value.
        value: f64,
    },

    /// Returned when too few rows remain to train after holding data out.
    #[error("{got} training rows remain after holding out data; need at least {required}")]
    InsufficientTrainingRows {
        /// Minimum rows needed.
        required: usize,
        /// Rows available.
        got: usize,
    },

    /// Returned when the backtest window contains no full rebalance period.
    #[error("no out-of-sample period left after {n_train_rows} training rows")]
    NoTestPeriod {
        /// Rows given to training.
        n_train_rows: usize,
    },
}

impl RankerError {
    /// Map this error to its [`ErrorKind`].
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Feature(e) => match e {
                FeatureError::InvalidHorizon { .. } => ErrorKind::InvalidConfiguration,
                e if e.is_insufficient_data() => ErrorKind::InsufficientData,
                _ => ErrorKind::InvalidInput,
            },
            Self::Forest(e) => match e {
                e if e.is_configuration() => ErrorKind::InvalidConfiguration,
                RfError::EmptyDataset => ErrorKind::InsufficientData,
                _ => ErrorKind::InvalidInput,
            },
            Self::InvalidHoldoutFraction { .. }
            | Self::InvalidTrainFraction { .. }
            | Self::InvalidRebalancePeriod { .. }
            | Self::InvalidRate { .. } => ErrorKind::InvalidConfiguration,
            Self::InsufficientTrainingRows { .. } | Self::NoTestPeriod { .. } => {
                ErrorKind::InsufficientData
            }
        }
    }
}
