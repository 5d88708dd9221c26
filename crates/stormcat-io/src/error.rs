//! I/O error types for stormcat-io.

use std::path::PathBuf;

use stormcat_classify::ClassifyError;

/// Errors from CSV reading, report writing and the result store.
#[derive(Debug, thiserror::Error)]
pub enum IoError {
    /// Returned when the input file does not exist or is unreadable.
    #[error("file not found: {path}")]
    FileNotFound {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when the CSV parser encounters a malformed record.
    #[error("CSV parse error in {path} at byte offset {offset}")]
    CsvParse {
        /// Path to the CSV file.
        path: PathBuf,
        /// Byte offset where the error occurred.
        offset: u64,
        /// Underlying CSV error.
        source: csv::Error,
    },

    /// Returned when the CSV file contains a header but zero data rows.
    #[error("empty dataset (no data rows) in {path}")]
    EmptyDataset {
        /// Path to the CSV file.
        path: PathBuf,
    },

    /// Returned when a data row has a different number of columns than the header.
    #[error("inconsistent row length in {path}: row {row_index} has {got} columns, expected {expected}")]
    InconsistentRowLength {
        /// Path to the CSV file.
        path: PathBuf,
        /// Zero-based row index (excluding header).
        row_index: usize,
        /// Expected number of columns (from header).
        expected: usize,
        /// Actual number of columns in this row.
        got: usize,
    },

    /// Returned when a feature cell is NaN, Inf, or otherwise not a finite float.
    #[error("non-finite value in {path}: row {row_index}, feature {feature}, raw value \"{raw}\"")]
    NonFiniteValue {
        /// Path to the CSV file.
        path: PathBuf,
        /// Zero-based row index (excluding header).
        row_index: usize,
        /// Feature column name.
        feature: String,
        /// The raw string value that failed to parse.
        raw: String,
    },

    /// Returned when a timestamp cell is not `YYYY-MM-DDTHH:MM:SS`.
    #[error("invalid timestamp in {path}: row {row_index}, raw value \"{raw}\"")]
    InvalidTimestamp {
        /// Path to the CSV file.
        path: PathBuf,
        /// Zero-based row index (excluding header).
        row_index: usize,
        /// The raw string value.
        raw: String,
        /// Underlying parse error.
        source: chrono::ParseError,
    },

    /// Returned when a label cell is not `true`, `false`, `1` or `0`.
    #[error("invalid label in {path}: row {row_index}, raw value \"{raw}\"")]
    InvalidLabel {
        /// Path to the CSV file.
        path: PathBuf,
        /// Zero-based row index (excluding header).
        row_index: usize,
        /// The raw string value.
        raw: String,
    },

    /// Returned when the CSV header does not match the feature schema.
    #[error("header of {path} does not match the feature schema: expected {expected:?}, got {got:?}")]
    SchemaMismatch {
        /// Path to the CSV file.
        path: PathBuf,
        /// Header expected from the schema.
        expected: Vec<String>,
        /// Header found in the file.
        got: Vec<String>,
    },

    /// Returned when the experiment name contains characters outside `[a-zA-Z0-9_-]`.
    #[error("invalid experiment name \"{name}\": must match [a-zA-Z0-9_-]+")]
    InvalidExperimentName {
        /// The invalid name.
        name: String,
    },

    /// Returned when an output directory cannot be created.
    #[error("cannot create output directory {path}")]
    OutputDirCreate {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when a file cannot be written.
    #[error("cannot write file {path}")]
    WriteFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when a file or directory cannot be read.
    #[error("cannot read {path}")]
    ReadFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when a stored result file cannot be removed.
    #[error("cannot delete file {path}")]
    DeleteFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when bincode encoding fails.
    #[error("failed to serialize results for {path}")]
    Serialize {
        /// Destination path.
        path: PathBuf,
        /// Underlying bincode error.
        source: bincode::Error,
    },

    /// Returned when bincode decoding fails.
    #[error("failed to deserialize results from {path}")]
    Deserialize {
        /// Source path.
        path: PathBuf,
        /// Underlying bincode error.
        source: bincode::Error,
    },

    /// Returned when a stored file was written by an incompatible format version.
    #[error("incompatible result format in {path}: expected version {expected}, found {found}")]
    IncompatibleFormatVersion {
        /// Format version this build reads.
        expected: u32,
        /// Format version in the file.
        found: u32,
        /// Path to the file.
        path: PathBuf,
    },

    /// Returned when a result name is already taken for a year and ensemble member.
    #[error("result \"{name}\" already added for year {year}, ensemble member {ensemble_member}")]
    DuplicateResultName {
        /// Result year.
        year: i32,
        /// Ensemble member.
        ensemble_member: u32,
        /// The duplicated name.
        name: String,
    },

    /// Returned when no results exist for a year and ensemble member.
    #[error("no results for year {year}, ensemble member {ensemble_member}")]
    ResultNotFound {
        /// Result year.
        year: i32,
        /// Ensemble member.
        ensemble_member: u32,
    },

    /// Returned when parsed rows do not form a valid evaluation dataset.
    #[error(transparent)]
    Dataset(#[from] ClassifyError),
}
