//! The fit/predict seam shared by every model capability.

use crate::error::ModelError;

/// A fitted binary classifier.
pub trait Predict {
    /// Number of feature columns the model was fitted on.
    fn n_features(&self) -> usize;

    /// Predict whether a single sample belongs to the positive class.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::PredictionFeatureMismatch`] when
    /// `sample.len() != n_features()`.
    fn predict(&self, sample: &[f64]) -> Result<bool, ModelError>;

    /// Predict every row of a row-major batch, preserving order.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by [`Predict::predict`].
    fn predict_batch(&self, samples: &[Vec<f64>]) -> Result<Vec<bool>, ModelError> {
        samples.iter().map(|s| self.predict(s)).collect()
    }
}

/// A model configuration that can be fitted to labelled data.
pub trait Fit {
    /// The fitted model produced by [`Fit::fit`].
    type Model: Predict;

    /// Fit a model on row-major `features` with one boolean label per row.
    ///
    /// # Errors
    ///
    /// Returns a [`ModelError`] describing invalid input or configuration.
    fn fit(&self, features: &[Vec<f64>], labels: &[bool]) -> Result<Self::Model, ModelError>;
}

/// Validate a training set and return `(n_samples, n_features)`.
///
/// Checks emptiness, consistent row lengths, label count and finiteness.
pub(crate) fn validate_training(
    features: &[Vec<f64>],
    labels: &[bool],
) -> Result<(usize, usize), ModelError> {
    if features.is_empty() {
        return Err(ModelError::EmptyDataset);
    }
    let n_samples = features.len();
    if labels.len() != n_samples {
        return Err(ModelError::LabelCountMismatch {
            n_samples,
            n_labels: labels.len(),
        });
    }
    let n_features = features[0].len();
    if n_features == 0 {
        return Err(ModelError::ZeroFeatures);
    }
    for (sample_index, row) in features.iter().enumerate() {
        if row.len() != n_features {
            return Err(ModelError::FeatureCountMismatch {
                expected: n_features,
                got: row.len(),
                sample_index,
            });
        }
        for (feature_index, &val) in row.iter().enumerate() {
            if !val.is_finite() {
                return Err(ModelError::NonFiniteValue {
                    sample_index,
                    feature_index,
                });
            }
        }
    }
    Ok((n_samples, n_features))
}

/// Fail with [`ModelError::SingleClass`] unless both labels are present.
pub(crate) fn require_both_classes(labels: &[bool]) -> Result<(), ModelError> {
    let n_positive = labels.iter().filter(|&&l| l).count();
    if n_positive == 0 {
        return Err(ModelError::SingleClass { label: false });
    }
    if n_positive == labels.len() {
        return Err(ModelError::SingleClass { label: true });
    }
    Ok(())
}

/// Fail with [`ModelError::PredictionFeatureMismatch`] on a wrongly sized sample.
pub(crate) fn check_sample(sample: &[f64], expected: usize) -> Result<(), ModelError> {
    if sample.len() != expected {
        return Err(ModelError::PredictionFeatureMismatch {
            expected,
            got: sample.len(),
        });
    }
    Ok(())
}
