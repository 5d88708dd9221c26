use tracing::{debug, instrument};

use crate::{
    ModelError,
    fit::{Fit, Predict, check_sample, require_both_classes, validate_training},
    linalg::{Cholesky, SquareMatrix, dot, masked_mean},
};

/// Configuration for a two-class linear discriminant.
///
/// Both classes share one pooled covariance matrix. `regularization` scales
/// up each diagonal entry by that fraction of itself before inversion
/// (default `1e-6`), so features on very different scales are shrunk alike.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct LdaConfig {
    pub(crate) regularization: f64,
}

impl LdaConfig {
    /// Create a config with the default regularization.
    #[must_use]
    pub fn new() -> Self {
        Self {
            regularization: 1e-6,
        }
    }

    /// Set the relative diagonal regularization.
    #[must_use]
    pub fn with_regularization(mut self, regularization: f64) -> Self {
        self.regularization = regularization;
        self
    }

    /// Return the relative diagonal regularization.
    #[must_use]
    pub fn regularization(&self) -> f64 {
        self.regularization
    }
}

impl Default for LdaConfig {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn validate_regularization(regularization: f64) -> Result<(), ModelError> {
    if !regularization.is_finite() || regularization < 0.0 {
        return Err(ModelError::InvalidRegularization { regularization });
    }
    Ok(())
}

impl Fit for LdaConfig {
    type Model = LinearDiscriminant;

    /// Fit the discriminant `w·x + b`.
    ///
    /// # Errors
    ///
    /// | Variant                                 | When                                          |
    /// |-----------------------------------------|-----------------------------------------------|
    /// | input validation variants               | see [`crate::DecisionTreeConfig::fit`]        |
    /// | [`ModelError::InvalidRegularization`]   | negative or non-finite `regularization`       |
    /// | [`ModelError::SingleClass`]             | only one label value present                  |
    /// | [`ModelError::SingularCovariance`]      | pooled covariance not positive definite       |
    #[instrument(skip_all, fields(n_samples = features.len()))]
    fn fit(
        &self,
        features: &[Vec<f64>],
        labels: &[bool],
    ) -> Result<LinearDiscriminant, ModelError> {
        let (n_samples, n_features) = validate_training(features, labels)?;
        validate_regularization(self.regularization)?;
        require_both_classes(labels)?;

        let (mean_pos, n_pos) = masked_mean(features, labels, true);
        let (mean_neg, n_neg) = masked_mean(features, labels, false);

        let mut pooled = SquareMatrix::zeros(n_features);
        for (row, &label) in features.iter().zip(labels) {
            let mean = if label { &mean_pos } else { &mean_neg };
            pooled.add_centered_outer(row, mean);
        }
        // Unbiased pooled estimate; a two-sample set keeps the raw scatter.
        pooled.scale(1.0 / n_samples.saturating_sub(2).max(1) as f64);
        pooled.add_relative_ridge(self.regularization);

        let chol = Cholesky::factorize(&pooled)
            .ok_or(ModelError::SingularCovariance { label: None })?;

        let diff: Vec<f64> = mean_pos.iter().zip(&mean_neg).map(|(p, n)| p - n).collect();
        let weights = chol.solve(&diff);
        let midpoint: Vec<f64> = mean_pos.iter().zip(&mean_neg).map(|(p, n)| p + n).collect();
        let prior_log_odds = (n_pos as f64 / n_neg as f64).ln();
        let intercept = -0.5 * dot(&weights, &midpoint) + prior_log_odds;

        debug!(n_pos, n_neg, intercept, "linear discriminant fitted");

        Ok(LinearDiscriminant { weights, intercept })
    }
}

/// A fitted linear discriminant: positive when `w·x + b > 0`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LinearDiscriminant {
    weights: Vec<f64>,
    intercept: f64,
}

impl LinearDiscriminant {
    /// Return the discriminant weights, one per feature.
    #[must_use]
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Return the intercept, including the prior log-odds.
    #[must_use]
    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    /// Signed discriminant score; positive favours the positive class.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::PredictionFeatureMismatch`] on a wrongly sized sample.
    pub fn decision_function(&self, sample: &[f64]) -> Result<f64, ModelError> {
        check_sample(sample, self.weights.len())?;
        Ok(dot(&self.weights, sample) + self.intercept)
    }
}

impl Predict for LinearDiscriminant {
    fn n_features(&self) -> usize {
        self.weights.len()
    }

    fn predict(&self, sample: &[f64]) -> Result<bool, ModelError> {
        Ok(self.decision_function(sample)? > 0.0)
    }
}
