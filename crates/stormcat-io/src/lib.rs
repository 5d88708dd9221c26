//! File I/O, validation, and persistence for the stormcat pipeline.

mod domain;
mod error;
mod reader;
mod store;
mod writer;

pub use domain::{ExperimentName, ResultKey};
pub use error::IoError;
pub use reader::{DatasetReader, TIMESTAMP_FORMAT};
pub use store::{ResultBundle, ResultStore};
pub use writer::{DatasetSummary, ReportWriter};
