use rand::{SeedableRng, seq::SliceRandom};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, instrument};

use crate::{
    ModelError,
    fit::{Fit, Predict, check_sample, require_both_classes, validate_training},
    linalg::dot,
};

/// Loss minimized by the online linear model.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Loss {
    /// Linear SVM loss `max(0, 1 - y·p)`.
    #[default]
    Hinge,
    /// Logistic regression loss `ln(1 + exp(-y·p))`.
    Log,
}

impl Loss {
    fn loss(self, p: f64, y: f64) -> f64 {
        let z = p * y;
        match self {
            Loss::Hinge => (1.0 - z).max(0.0),
            Loss::Log => {
                if z > 18.0 {
                    (-z).exp()
                } else if z < -18.0 {
                    -z
                } else {
                    (-z).exp().ln_1p()
                }
            }
        }
    }

    /// Derivative of the loss with respect to the prediction `p`.
    fn dloss(self, p: f64, y: f64) -> f64 {
        let z = p * y;
        match self {
            Loss::Hinge => {
                if z <= 1.0 {
                    -y
                } else {
                    0.0
                }
            }
            Loss::Log => {
                if z > 18.0 {
                    -y * (-z).exp()
                } else if z < -18.0 {
                    -y
                } else {
                    -y / (z.exp() + 1.0)
                }
            }
        }
    }
}

/// Configuration for an L2-regularized linear model trained by SGD.
///
/// Uses the "optimal" learning-rate schedule
/// `eta = 1 / (alpha · (t0 + t))` and stops early once the epoch loss fails
/// to improve by `tol` for `n_iter_no_change` consecutive epochs.
///
/// # Defaults
///
/// | Parameter          | Default |
/// |--------------------|---------|
/// | `loss`             | `Hinge` |
/// | `alpha`            | 1e-4    |
/// | `max_iter`         | 1000    |
/// | `tol`              | 1e-3    |
/// | `n_iter_no_change` | 5       |
/// | `shuffle`          | `true`  |
/// | `seed`             | 42      |
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SgdConfig {
    pub(crate) loss: Loss,
    pub(crate) alpha: f64,
    pub(crate) max_iter: usize,
    pub(crate) tol: f64,
    pub(crate) n_iter_no_change: usize,
    pub(crate) shuffle: bool,
    pub(crate) seed: u64,
}

impl SgdConfig {
    /// Create a config with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            loss: Loss::Hinge,
            alpha: 1e-4,
            max_iter: 1000,
            tol: 1e-3,
            n_iter_no_change: 5,
            shuffle: true,
            seed: 42,
        }
    }

    /// Set the loss function.
    #[must_use]
    pub fn with_loss(mut self, loss: Loss) -> Self {
        self.loss = loss;
        self
    }

    /// Set the L2 regularization strength.
    #[must_use]
    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    /// Set the maximum number of epochs.
    #[must_use]
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Set the early-stopping tolerance.
    #[must_use]
    pub fn with_tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    /// Set the number of non-improving epochs tolerated before stopping.
    #[must_use]
    pub fn with_n_iter_no_change(mut self, n_iter_no_change: usize) -> Self {
        self.n_iter_no_change = n_iter_no_change;
        self
    }

    /// Enable or disable per-epoch shuffling.
    #[must_use]
    pub fn with_shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    /// Set the shuffling seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Return the loss function.
    #[must_use]
    pub fn loss(&self) -> Loss {
        self.loss
    }

    /// Return the L2 regularization strength.
    #[must_use]
    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Return the maximum number of epochs.
    #[must_use]
    pub fn max_iter(&self) -> usize {
        self.max_iter
    }

    /// Return the early-stopping tolerance.
    #[must_use]
    pub fn tol(&self) -> f64 {
        self.tol
    }

    /// Return the patience in epochs.
    #[must_use]
    pub fn n_iter_no_change(&self) -> usize {
        self.n_iter_no_change
    }

    /// Return whether samples are shuffled each epoch.
    #[must_use]
    pub fn shuffle(&self) -> bool {
        self.shuffle
    }

    /// Return the shuffling seed.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }
}

impl Default for SgdConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl Fit for SgdConfig {
    type Model = SgdModel;

    /// Run plain SGD over the samples.
    ///
    /// # Errors
    ///
    /// | Variant                            | When                                   |
    /// |------------------------------------|----------------------------------------|
    /// | input validation variants          | see [`crate::DecisionTreeConfig::fit`] |
    /// | [`ModelError::InvalidAlpha`]       | `alpha` is not positive and finite     |
    /// | [`ModelError::InvalidMaxIter`]     | `max_iter` is zero                     |
    /// | [`ModelError::SingleClass`]        | only one label value present           |
    #[instrument(skip_all, fields(n_samples = features.len(), loss = ?self.loss))]
    fn fit(&self, features: &[Vec<f64>], labels: &[bool]) -> Result<SgdModel, ModelError> {
        let (n_samples, n_features) = validate_training(features, labels)?;
        if !(self.alpha.is_finite() && self.alpha > 0.0) {
            return Err(ModelError::InvalidAlpha { alpha: self.alpha });
        }
        if self.max_iter == 0 {
            return Err(ModelError::InvalidMaxIter {
                max_iter: self.max_iter,
            });
        }
        require_both_classes(labels)?;

        let targets: Vec<f64> = labels.iter().map(|&l| if l { 1.0 } else { -1.0 }).collect();
        let typical_weight = (1.0 / self.alpha.sqrt()).sqrt();
        let eta0 = typical_weight / self.loss.dloss(-typical_weight, 1.0).max(1.0);
        let t0 = 1.0 / (eta0 * self.alpha);

        let mut weights = vec![0.0; n_features];
        let mut intercept = 0.0;
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let mut order: Vec<usize> = (0..n_samples).collect();
        let mut t = 1.0;
        let mut best_loss = f64::INFINITY;
        let mut no_improvement = 0usize;
        let mut n_iter = 0usize;

        for epoch in 0..self.max_iter {
            n_iter = epoch + 1;
            if self.shuffle {
                order.shuffle(&mut rng);
            }
            let mut epoch_loss = 0.0;
            for &i in &order {
                let (x, y) = (&features[i], targets[i]);
                let p = dot(&weights, x) + intercept;
                epoch_loss += self.loss.loss(p, y);
                let dloss = self.loss.dloss(p, y);
                let eta = 1.0 / (self.alpha * (t0 + t - 1.0));

                let decay = 1.0 - eta * self.alpha;
                weights.iter_mut().for_each(|w| *w *= decay);
                if dloss != 0.0 {
                    let step = eta * dloss;
                    for (w, xi) in weights.iter_mut().zip(x) {
                        *w -= step * xi;
                    }
                    intercept -= step;
                }
                t += 1.0;
            }

            if epoch_loss > best_loss - self.tol * n_samples as f64 {
                no_improvement += 1;
            } else {
                no_improvement = 0;
            }
            best_loss = best_loss.min(epoch_loss);
            if no_improvement >= self.n_iter_no_change {
                break;
            }
        }

        debug!(n_iter, best_loss, "online linear model fitted");

        Ok(SgdModel {
            weights,
            intercept,
            n_iter,
        })
    }
}

/// A fitted linear model: positive when `w·x + b > 0`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SgdModel {
    weights: Vec<f64>,
    intercept: f64,
    n_iter: usize,
}

impl SgdModel {
    /// Return the learned weights.
    #[must_use]
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Return the learned intercept.
    #[must_use]
    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    /// Return the number of epochs actually run.
    #[must_use]
    pub fn n_iter(&self) -> usize {
        self.n_iter
    }

    /// Signed distance-like score `w·x + b`.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::PredictionFeatureMismatch`] on a wrongly sized sample.
    pub fn decision_function(&self, sample: &[f64]) -> Result<f64, ModelError> {
        check_sample(sample, self.weights.len())?;
        Ok(dot(&self.weights, sample) + self.intercept)
    }
}

impl Predict for SgdModel {
    fn n_features(&self) -> usize {
        self.weights.len()
    }

    fn predict(&self, sample: &[f64]) -> Result<bool, ModelError> {
        Ok(self.decision_function(sample)? > 0.0)
    }
}
