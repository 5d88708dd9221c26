//! CSV evaluation-dataset reader with full input validation.

use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use stormcat_classify::{EvaluationDataset, FeatureSchema, Timestamp};
use tracing::{debug, info, instrument};

use crate::IoError;

/// Timestamp format of the first CSV column.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

const LEADING_COLUMNS: [&str; 2] = ["timestamp", "is_hurricane"];

/// Reads one evaluation dataset from a CSV file.
///
/// Expected CSV format:
/// - Header row `timestamp,is_hurricane,<feature names...>`; the feature
///   names must equal the schema's names in column order
/// - `timestamp` as `YYYY-MM-DDTHH:MM:SS`, `is_hurricane` as `true/false/1/0`
/// - One row per candidate that reached classification
///
/// Candidates lost upstream are not rows; their count is supplied with
/// [`DatasetReader::with_missed_count`].
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::FileNotFound`] | File doesn't exist or is unreadable |
/// | [`IoError::CsvParse`] | Malformed CSV record |
/// | [`IoError::SchemaMismatch`] | Header differs from the schema |
/// | [`IoError::EmptyDataset`] | Zero data rows after header |
/// | [`IoError::InconsistentRowLength`] | Row has different column count than header |
/// | [`IoError::InvalidTimestamp`] | Unparseable timestamp |
/// | [`IoError::InvalidLabel`] | Label not one of `true/false/1/0` |
/// | [`IoError::NonFiniteValue`] | Cell is NaN, Inf, or unparseable float |
pub struct DatasetReader<'a> {
    path: PathBuf,
    schema: &'a FeatureSchema,
    missed_count: usize,
}

impl<'a> DatasetReader<'a> {
    /// Create a reader for the CSV file at `path`.
    pub fn new(path: &Path, schema: &'a FeatureSchema) -> Self {
        Self {
            path: path.to_path_buf(),
            schema,
            missed_count: 0,
        }
    }

    /// Set the number of candidates missed upstream.
    #[must_use]
    pub fn with_missed_count(mut self, missed_count: usize) -> Self {
        self.missed_count = missed_count;
        self
    }

    /// Read and validate the CSV file, returning an [`EvaluationDataset`].
    #[instrument(skip(self), fields(path = %self.path.display(), missed = self.missed_count))]
    pub fn read(&self) -> Result<EvaluationDataset, IoError> {
        let file = std::fs::File::open(&self.path).map_err(|e| IoError::FileNotFound {
            path: self.path.clone(),
            source: e,
        })?;

        // flexible(true) so that short rows surface as InconsistentRowLength.
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(file);

        let header = rdr.headers().map_err(|e| self.csv_error(e))?.clone();
        self.check_header(&header)?;
        let expected_cols = header.len();
        debug!(expected_cols, "read CSV header");

        let mut features = Vec::new();
        let mut labels = Vec::new();
        let mut timestamps = Vec::new();

        for (row_index, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| self.csv_error(e))?;
            if record.len() != expected_cols {
                return Err(IoError::InconsistentRowLength {
                    path: self.path.clone(),
                    row_index,
                    expected: expected_cols,
                    got: record.len(),
                });
            }

            timestamps.push(self.parse_timestamp(row_index, &record[0])?);
            labels.push(self.parse_label(row_index, &record[1])?);

            let mut row = Vec::with_capacity(expected_cols - LEADING_COLUMNS.len());
            for (col, raw) in record.iter().enumerate().skip(LEADING_COLUMNS.len()) {
                let value = raw
                    .parse::<f64>()
                    .ok()
                    .filter(|v| v.is_finite())
                    .ok_or_else(|| IoError::NonFiniteValue {
                        path: self.path.clone(),
                        row_index,
                        feature: header[col].to_string(),
                        raw: raw.to_string(),
                    })?;
                row.push(value);
            }
            features.push(row);
        }

        if features.is_empty() {
            return Err(IoError::EmptyDataset {
                path: self.path.clone(),
            });
        }

        let dataset = EvaluationDataset::new(features, labels, timestamps, self.missed_count)?
            .with_default_indices(self.schema.default_indices())?;
        info!(
            n_candidates = dataset.candidate_count(),
            n_hurricanes = dataset.actual_positive_count(),
            n_features = dataset.n_columns(),
            "dataset loaded"
        );
        Ok(dataset)
    }

    fn csv_error(&self, e: csv::Error) -> IoError {
        IoError::CsvParse {
            path: self.path.clone(),
            offset: e.position().map_or(0, |p| p.byte()),
            source: e,
        }
    }

    fn check_header(&self, header: &csv::StringRecord) -> Result<(), IoError> {
        let expected: Vec<String> = LEADING_COLUMNS
            .iter()
            .copied()
            .chain(self.schema.names())
            .map(str::to_string)
            .collect();
        let got: Vec<String> = header.iter().map(str::to_string).collect();
        if got != expected {
            return Err(IoError::SchemaMismatch {
                path: self.path.clone(),
                expected,
                got,
            });
        }
        Ok(())
    }

    fn parse_timestamp(&self, row_index: usize, raw: &str) -> Result<Timestamp, IoError> {
        NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT).map_err(|e| IoError::InvalidTimestamp {
            path: self.path.clone(),
            row_index,
            raw: raw.to_string(),
            source: e,
        })
    }

    fn parse_label(&self, row_index: usize, raw: &str) -> Result<bool, IoError> {
        match raw {
            "true" | "1" => Ok(true),
            "false" | "0" => Ok(false),
            _ => Err(IoError::InvalidLabel {
                path: self.path.clone(),
                row_index,
                raw: raw.to_string(),
            }),
        }
    }
}
