use tracing::{debug, instrument};

use crate::{
    ModelError,
    fit::{Fit, Predict, check_sample, require_both_classes, validate_training},
    lda::validate_regularization,
    linalg::{Cholesky, SquareMatrix, masked_mean},
};

/// Configuration for a two-class quadratic discriminant.
///
/// Each class gets its own covariance, regularized like [`crate::LdaConfig`].
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct QdaConfig {
    pub(crate) regularization: f64,
}

impl QdaConfig {
    /// Create a config with the default regularization (`1e-6`).
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

impl Default for QdaConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
struct ClassGaussian {
    mean: Vec<f64>,
    factor: Cholesky,
    log_prior: f64,
}

impl ClassGaussian {
    fn estimate(
        features: &[Vec<f64>],
        labels: &[bool],
        label: bool,
        regularization: f64,
    ) -> Result<Self, ModelError> {
        let (mean, count) = masked_mean(features, labels, label);
        if count < 2 {
            return Err(ModelError::TooFewClassSamples {
                label,
                count,
                required: 2,
            });
        }
        let mut cov = SquareMatrix::zeros(mean.len());
        for (row, _) in features.iter().zip(labels).filter(|(_, l)| **l == label) {
            cov.add_centered_outer(row, &mean);
        }
        cov.scale(1.0 / (count - 1) as f64);
        cov.add_relative_ridge(regularization);

        let factor = Cholesky::factorize(&cov).ok_or(ModelError::SingularCovariance {
            label: Some(label),
        })?;
        Ok(Self {
            mean,
            factor,
            log_prior: (count as f64 / labels.len() as f64).ln(),
        })
    }

    fn log_score(&self, sample: &[f64]) -> f64 {
        let centered: Vec<f64> = sample.iter().zip(&self.mean).map(|(x, m)| x - m).collect();
        -0.5 * self.factor.log_det() - 0.5 * self.factor.mahalanobis_sq(&centered) + self.log_prior
    }
}

impl Fit for QdaConfig {
    type Model = QuadraticDiscriminant;

    /// Estimate one Gaussian per class.
    ///
    /// # Errors
    ///
    /// | Variant                                 | When                                       |
    /// |-----------------------------------------|--------------------------------------------|
    /// | input validation variants               | see [`crate::DecisionTreeConfig::fit`]     |
    /// | [`ModelError::InvalidRegularization`]   | negative or non-finite `regularization`    |
    /// | [`ModelError::SingleClass`]             | only one label value present               |
    /// | [`ModelError::TooFewClassSamples`]      | a class has fewer than two samples         |
    /// | [`ModelError::SingularCovariance`]      | a class covariance is not positive definite|
    #[instrument(skip_all, fields(n_samples = features.len()))]
    fn fit(
        &self,
        features: &[Vec<f64>],
        labels: &[bool],
    ) -> Result<QuadraticDiscriminant, ModelError> {
        let (_, n_features) = validate_training(features, labels)?;
        validate_regularization(self.regularization)?;
        require_both_classes(labels)?;

        let negative = ClassGaussian::estimate(features, labels, false, self.regularization)?;
        let positive = ClassGaussian::estimate(features, labels, true, self.regularization)?;

        debug!(n_features, "quadratic discriminant fitted");

        Ok(QuadraticDiscriminant {
            negative,
            positive,
            n_features,
        })
    }
}

/// A fitted quadratic discriminant comparing per-class Gaussian log-densities.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct QuadraticDiscriminant {
    negative: ClassGaussian,
    positive: ClassGaussian,
    n_features: usize,
}

impl QuadraticDiscriminant {
    /// Log-density difference `score(positive) - score(negative)`.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::PredictionFeatureMismatch`] on a wrongly sized sample.
    pub fn decision_function(&self, sample: &[f64]) -> Result<f64, ModelError> {
        check_sample(sample, self.n_features)?;
        Ok(self.positive.log_score(sample) - self.negative.log_score(sample))
    }
}

impl Predict for QuadraticDiscriminant {
    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict(&self, sample: &[f64]) -> Result<bool, ModelError> {
        Ok(self.decision_function(sample)? > 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lda::tests::{mismatches, mixed_scale_candidates};

    #[test]
    fn separates_by_variance() {
        // Same mean, different spread: only a quadratic boundary works.
        let features = vec![
            vec![0.1],
            vec![-0.1],
            vec![0.2],
            vec![-0.2],
            vec![5.0],
            vec![-5.0],
            vec![6.0],
            vec![-6.0],
        ];
        let labels = vec![false, false, false, false, true, true, true, true];
        let model = QdaConfig::new().fit(&features, &labels).unwrap();
        assert_eq!(model.predict_batch(&features).unwrap(), labels);
        assert!(!model.predict(&[0.0]).unwrap());
        assert!(model.predict(&[8.0]).unwrap());
    }

    #[test]
    fn small_scale_feature_not_swamped() {
        let (features, labels) = mixed_scale_candidates(400, 21);
        let model = QdaConfig::new().fit(&features, &labels).unwrap();
        let predicted = model.predict_batch(&features).unwrap();
        assert!(mismatches(&predicted, &labels) <= 2);
    }

    #[test]
    fn too_few_samples_in_class() {
        let features = vec![vec![1.0], vec![2.0], vec![3.0]];
        let err = QdaConfig::new()
            .fit(&features, &[true, false, false])
            .unwrap_err();
        assert!(matches!(
            err,
            ModelError::TooFewClassSamples { label: true, count: 1, required: 2 }
        ));
    }

    #[test]
    fn singular_class_covariance_names_class() {
        let features = vec![vec![1.0], vec![1.0], vec![2.0], vec![3.0]];
        let err = QdaConfig::new()
            .with_regularization(0.0)
            .fit(&features, &[true, true, false, false])
            .unwrap_err();
        assert!(matches!(
            err,
            ModelError::SingularCovariance { label: Some(true) }
        ));
    }

    #[test]
    fn singular_error_message_names_class() {
        let err = ModelError::SingularCovariance { label: Some(false) };
        assert_eq!(err.to_string(), "covariance matrix is singular for class false");
    }
}
