/// Errors from fitting or applying a model.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// Returned when the training dataset has zero samples.
    #[error("training dataset has zero samples")]
    EmptyDataset,

    /// Returned when the training dataset has zero feature columns.
    #[error("training dataset has zero feature columns")]
    ZeroFeatures,

    /// Returned when a sample has a different number of features than the first row.
    #[error("sample {sample_index} has {got} features, expected {expected}")]
    FeatureCountMismatch {
        /// The expected number of features.
        expected: usize,
        /// The actual number of features in the sample.
        got: usize,
        /// The zero-based index of the offending sample.
        sample_index: usize,
    },

    /// Returned when the label vector does not match the number of samples.
    #[error("got {n_labels} labels for {n_samples} samples")]
    LabelCountMismatch {
        /// Number of feature rows.
        n_samples: usize,
        /// Number of labels.
        n_labels: usize,
    },

    /// Returned when a training value is NaN or infinite.
    #[error("non-finite value at sample {sample_index}, feature {feature_index}")]
    NonFiniteValue {
        /// The zero-based index of the offending sample.
        sample_index: usize,
        /// The zero-based index of the offending feature column.
        feature_index: usize,
    },

    /// Returned when every training label has the same value.
    #[error("training labels contain a single class (all {label})")]
    SingleClass {
        /// The only label present.
        label: bool,
    },

    /// Returned when a class has too few samples to estimate its statistics.
    #[error("class {label} has {count} samples, need at least {required}")]
    TooFewClassSamples {
        /// The class with too few samples.
        label: bool,
        /// Samples available for that class.
        count: usize,
        /// Minimum samples needed.
        required: usize,
    },

    /// Returned when a covariance matrix is not positive definite after regularization.
    #[error("covariance matrix is singular{}", class_suffix(.label))]
    SingularCovariance {
        /// The class whose covariance failed, `None` for a pooled covariance.
        label: Option<bool>,
    },

    /// Returned when a sample has a different number of features at prediction time.
    #[error("prediction input has {got} features, expected {expected}")]
    PredictionFeatureMismatch {
        /// The expected number of features.
        expected: usize,
        /// The actual number of features in the prediction input.
        got: usize,
    },

    /// Returned when max_depth is zero.
    #[error("max_depth must be at least 1, got {max_depth}")]
    InvalidMaxDepth {
        /// The invalid max_depth value provided.
        max_depth: usize,
    },

    /// Returned when min_samples_split is less than 2.
    #[error("min_samples_split must be at least 2, got {min_samples_split}")]
    InvalidMinSamplesSplit {
        /// The invalid min_samples_split value provided.
        min_samples_split: usize,
    },

    /// Returned when min_samples_leaf is zero.
    #[error("min_samples_leaf must be at least 1, got {min_samples_leaf}")]
    InvalidMinSamplesLeaf {
        /// The invalid min_samples_leaf value provided.
        min_samples_leaf: usize,
    },

    /// Returned when max_features resolves to 0 or exceeds n_features.
    #[error("max_features resolved to {max_features}, but must be in [1, {n_features}]")]
    InvalidMaxFeatures {
        /// The resolved max_features value.
        max_features: usize,
        /// The number of features in the dataset.
        n_features: usize,
    },

    /// Returned when the SGD regularization strength is not a positive finite number.
    #[error("alpha must be positive and finite, got {alpha}")]
    InvalidAlpha {
        /// The invalid alpha value provided.
        alpha: f64,
    },

    /// Returned when the SGD epoch limit is zero.
    #[error("max_iter must be at least 1, got {max_iter}")]
    InvalidMaxIter {
        /// The invalid max_iter value provided.
        max_iter: usize,
    },

    /// Returned when a discriminant regularization is negative or non-finite.
    #[error("regularization must be finite and non-negative, got {regularization}")]
    InvalidRegularization {
        /// The invalid regularization value provided.
        regularization: f64,
    },
}

fn class_suffix(label: &Option<bool>) -> String {
    match label {
        Some(label) => format!(" for class {label}"),
        None => String::new(),
    }
}
