//! Error types for stormcat-classify.

use stormcat_models::ModelError;

use crate::record::Timestamp;

/// Errors from feature lookup and schema construction.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SchemaError {
    /// Returned when a feature name is not registered in the schema.
    #[error("unknown feature \"{name}\"")]
    UnknownFeature {
        /// The name that was looked up.
        name: String,
    },

    /// Returned when a record has no value for a field at the requested time.
    #[error("record has no \"{field}\" data at {timestamp}")]
    MissingTimestamp {
        /// The record field that was read.
        field: String,
        /// The requested timestamp.
        timestamp: Timestamp,
    },

    /// Returned when a feature name is registered twice.
    #[error("feature \"{name}\" is already registered")]
    DuplicateFeature {
        /// The duplicated name.
        name: String,
    },
}

/// Errors from datasets, classifiers, chains and the comparison harness.
#[derive(Debug, thiserror::Error)]
pub enum ClassifyError {
    /// Returned when `categorize` or `evaluate` is called before `train`.
    #[error("classifier {classifier} has not been trained")]
    NotTrained {
        /// Name of the classifier.
        classifier: String,
    },

    /// Returned when a feature name cannot be resolved.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// Returned when a threshold key is not of the form `{feature}_lo` or `{feature}_hi`.
    #[error("cutoff key \"{key}\" must be \"<feature>_lo\" or \"<feature>_hi\"")]
    InvalidCutoffKey {
        /// The rejected key.
        key: String,
    },

    /// Returned when a selected column index does not exist in the dataset.
    #[error("feature column {index} out of range for {n_columns} columns")]
    ColumnOutOfRange {
        /// The requested column index.
        index: usize,
        /// Number of feature columns in the dataset.
        n_columns: usize,
    },

    /// Returned when a classifier is asked to train on zero feature columns.
    #[error("feature selection is empty")]
    EmptyFeatureSelection,

    /// Returned when a dataset is trained on but has no rows.
    #[error("classifier {classifier} cannot train on an empty dataset")]
    EmptyDataset {
        /// Name of the classifier.
        classifier: String,
    },

    /// Returned when dataset arrays are not row-aligned.
    #[error("dataset arrays are misaligned: {rows} feature rows, {labels} labels, {timestamps} timestamps")]
    DatasetLengthMismatch {
        /// Number of feature rows.
        rows: usize,
        /// Number of ground-truth labels.
        labels: usize,
        /// Number of timestamps.
        timestamps: usize,
    },

    /// Returned when feature rows have inconsistent widths.
    #[error("feature row {row} has {got} columns, expected {expected}")]
    InconsistentRowWidth {
        /// Zero-based row index.
        row: usize,
        /// Width of the first row.
        expected: usize,
        /// Width of the offending row.
        got: usize,
    },

    /// Returned when a row mask does not match the dataset length.
    #[error("mask has {got} entries, dataset has {expected} rows")]
    MaskLengthMismatch {
        /// Number of dataset rows.
        expected: usize,
        /// Number of mask entries.
        got: usize,
    },

    /// Returned when a prediction does not match the number of labels it is compared to.
    #[error("prediction has {got} entries, expected {expected}")]
    PredictionLengthMismatch {
        /// Number of ground-truth labels.
        expected: usize,
        /// Number of predictions.
        got: usize,
    },

    /// Returned when a caller asks for the numeric value of an undefined statistic.
    #[error("{statistic} is undefined (zero denominator)")]
    UndefinedStatistic {
        /// Name of the statistic.
        statistic: &'static str,
    },

    /// Returned when an underlying model capability fails.
    #[error("model for classifier {classifier} failed")]
    Model {
        /// Name of the classifier.
        classifier: String,
        /// Underlying model error.
        source: ModelError,
    },

    /// Returned when a chain stage fails during training or categorization.
    #[error("chain stage {stage} ({classifier}) failed")]
    Stage {
        /// Zero-based stage index.
        stage: usize,
        /// Name of the stage classifier.
        classifier: String,
        /// The stage's error.
        source: Box<ClassifyError>,
    },

    /// Returned by the comparison harness, naming the failing classifier.
    #[error("classifier {name} failed")]
    Classifier {
        /// Name of the classifier.
        name: String,
        /// The classifier's error.
        source: Box<ClassifyError>,
    },

    /// Returned when a classifier plan is structurally invalid.
    #[error("invalid classifier plan: {reason}")]
    InvalidPlan {
        /// Description of the problem.
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use super::*;

    #[test]
    fn harness_error_chains_to_stage_and_model() {
        let model = ClassifyError::Model {
            classifier: "lda".to_string(),
            source: ModelError::SingleClass { label: false },
        };
        let stage = ClassifyError::Stage {
            stage: 1,
            classifier: "lda".to_string(),
            source: Box::new(model),
        };
        let err = ClassifyError::Classifier {
            name: "chain".to_string(),
            source: Box::new(stage),
        };
        assert_eq!(err.to_string(), "classifier chain failed");
        let stage = err.source().unwrap();
        assert_eq!(stage.to_string(), "chain stage 1 (lda) failed");
        let model = stage.source().unwrap();
        assert_eq!(model.to_string(), "model for classifier lda failed");
        assert!(model.source().is_some());
    }

    #[test]
    fn schema_error_is_transparent() {
        let err: ClassifyError = SchemaError::UnknownFeature {
            name: "foo".to_string(),
        }
        .into();
        assert_eq!(err.to_string(), "unknown feature \"foo\"");
    }
}
