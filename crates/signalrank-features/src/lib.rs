//! Feature construction for signal ranking.
//!
//! Turns a validated closing-price series (with optional volumes) into a
//! fixed-width matrix of technical indicators and a forward-return target per
//! row. Features at step `t` use only data at or before `t`; rows whose
//! horizon would run past the end of the series are dropped.

mod config;
mod error;
mod history;
pub mod indicators;
mod matrix;

pub use config::{FIRST_FEATURE_INDEX, FeatureConfig, PRICE_FEATURE_NAMES, VOLUME_FEATURE_NAMES};
pub use error::FeatureError;
pub use history::PriceHistory;
pub use matrix::{FeatureMatrix, FeatureVector};
