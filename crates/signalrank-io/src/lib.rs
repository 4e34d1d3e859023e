//! File I/O, validation, and serialization for the signalrank pipeline.

mod domain;
mod error;
mod reader;
mod writer;

pub use domain::{ExperimentName, InstrumentId};
pub use error::IoError;
pub use reader::PriceReader;
pub use writer::{
    BacktestSummary, FeatureScore, InstrumentSignals, PermutationSection, ResultWriter,
};
