//! Per-column standardization to zero mean and unit variance.

use tracing::debug;

use crate::{
    ModelError,
    fit::{check_sample, validate_training},
};

/// Column-wise standardizer fitted once and reused verbatim afterwards.
///
/// Uses population standard deviation (divides by n, not n-1). Columns with
/// zero variance keep a scale of 1.0, so they are only centred.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct StandardScaler {
    mean: Vec<f64>,
    scale: Vec<f64>,
}

impl StandardScaler {
    /// Fit column means and scales on row-major `features`.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ModelError::EmptyDataset`] | `features` is empty |
    /// | [`ModelError::ZeroFeatures`] | rows have zero columns |
    /// | [`ModelError::FeatureCountMismatch`] | rows have inconsistent lengths |
    /// | [`ModelError::NonFiniteValue`] | any value is NaN or infinite |
    pub fn fit(features: &[Vec<f64>]) -> Result<Self, ModelError> {
        // Labels are irrelevant; validate against a matching placeholder.
        let placeholder = vec![false; features.len()];
        let (n_samples, n_features) = validate_training(features, &placeholder)?;
        let n = n_samples as f64;

        let mut mean = vec![0.0; n_features];
        for row in features {
            for (m, v) in mean.iter_mut().zip(row) {
                *m += v;
            }
        }
        mean.iter_mut().for_each(|m| *m /= n);

        let mut variance = vec![0.0; n_features];
        for row in features {
            for ((var, v), m) in variance.iter_mut().zip(row).zip(&mean) {
                *var += (v - m).powi(2);
            }
        }
        let scale: Vec<f64> = variance
            .into_iter()
            .map(|var| {
                let std = (var / n).sqrt();
                if std > 0.0 { std } else { 1.0 }
            })
            .collect();

        debug!(n_samples, n_features, "standard scaler fitted");
        Ok(Self { mean, scale })
    }

    /// Standardize a single row.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::PredictionFeatureMismatch`] on a wrongly sized row.
    pub fn transform_row(&self, row: &[f64]) -> Result<Vec<f64>, ModelError> {
        check_sample(row, self.mean.len())?;
        Ok(row
            .iter()
            .zip(&self.mean)
            .zip(&self.scale)
            .map(|((v, m), s)| (v - m) / s)
            .collect())
    }

    /// Standardize every row, preserving order.
    ///
    /// # Errors
    ///
    /// Returns the first error from [`StandardScaler::transform_row`].
    pub fn transform(&self, features: &[Vec<f64>]) -> Result<Vec<Vec<f64>>, ModelError> {
        features.iter().map(|row| self.transform_row(row)).collect()
    }

    /// Return the fitted column means.
    #[must_use]
    pub fn mean(&self) -> &[f64] {
        &self.mean
    }

    /// Return the fitted column scales.
    #[must_use]
    pub fn scale(&self) -> &[f64] {
        &self.scale
    }

    /// Return the number of columns the scaler was fitted on.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.mean.len()
    }
}
