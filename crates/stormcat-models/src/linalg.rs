//! Small dense linear algebra for the discriminant models.
//!
//! Matrices are square, symmetric and tiny (one row per feature), so a flat
//! row-major `Vec<f64>` and an unblocked Cholesky factorization suffice.

/// Square row-major matrix.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub(crate) struct SquareMatrix {
    dim: usize,
    data: Vec<f64>,
}

impl SquareMatrix {
    pub(crate) fn zeros(dim: usize) -> Self {
        Self {
            dim,
            data: vec![0.0; dim * dim],
        }
    }

    pub(crate) fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.dim + col]
    }

    fn get_mut(&mut self, row: usize, col: usize) -> &mut f64 {
        &mut self.data[row * self.dim + col]
    }

    /// Accumulate the outer product of `(row - mean)` into `self`.
    pub(crate) fn add_centered_outer(&mut self, row: &[f64], mean: &[f64]) {
        for i in 0..self.dim {
            let di = row[i] - mean[i];
            for j in 0..self.dim {
                *self.get_mut(i, j) += di * (row[j] - mean[j]);
            }
        }
    }

    pub(crate) fn scale(&mut self, factor: f64) {
        self.data.iter_mut().for_each(|v| *v *= factor);
    }

    /// Inflate each diagonal entry by `regularization` times itself.
    ///
    /// The ridge follows each column's own scale, so a column of variance
    /// `1e-10` is not swamped by one of variance `1e6`. Zero-variance
    /// columns get `regularization` as an absolute floor.
    pub(crate) fn add_relative_ridge(&mut self, regularization: f64) {
        for i in 0..self.dim {
            let variance = self.get(i, i);
            let ridge = if variance > 0.0 {
                regularization * variance
            } else {
                regularization
            };
            *self.get_mut(i, i) += ridge;
        }
    }
}

/// Lower-triangular Cholesky factor `L` with `A = L·Lᵀ`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub(crate) struct Cholesky {
    lower: SquareMatrix,
}

impl Cholesky {
    /// Factorize a symmetric matrix; `None` if it is not positive definite.
    pub(crate) fn factorize(a: &SquareMatrix) -> Option<Self> {
        let n = a.dim;
        let mut lower = SquareMatrix::zeros(n);
        for j in 0..n {
            let mut diag = a.get(j, j);
            for k in 0..j {
                diag -= lower.get(j, k) * lower.get(j, k);
            }
            if !(diag > 0.0 && diag.is_finite()) {
                return None;
            }
            let ljj = diag.sqrt();
            *lower.get_mut(j, j) = ljj;
            for i in (j + 1)..n {
                let mut sum = a.get(i, j);
                for k in 0..j {
                    sum -= lower.get(i, k) * lower.get(j, k);
                }
                *lower.get_mut(i, j) = sum / ljj;
            }
        }
        Some(Self { lower })
    }

    /// Solve `L·y = b`.
    pub(crate) fn forward(&self, b: &[f64]) -> Vec<f64> {
        let n = self.lower.dim;
        let mut y = vec![0.0; n];
        for i in 0..n {
            let mut sum = b[i];
            for k in 0..i {
                sum -= self.lower.get(i, k) * y[k];
            }
            y[i] = sum / self.lower.get(i, i);
        }
        y
    }

    /// Solve `A·x = b`.
    pub(crate) fn solve(&self, b: &[f64]) -> Vec<f64> {
        let n = self.lower.dim;
        let mut x = self.forward(b);
        for i in (0..n).rev() {
            let mut sum = x[i];
            for k in (i + 1)..n {
                sum -= self.lower.get(k, i) * x[k];
            }
            x[i] = sum / self.lower.get(i, i);
        }
        x
    }

    /// `ln |A|`.
    pub(crate) fn log_det(&self) -> f64 {
        2.0 * (0..self.lower.dim)
            .map(|i| self.lower.get(i, i).ln())
            .sum::<f64>()
    }

    /// Squared Mahalanobis norm `dᵀ·A⁻¹·d`.
    pub(crate) fn mahalanobis_sq(&self, d: &[f64]) -> f64 {
        self.forward(d).iter().map(|v| v * v).sum()
    }
}

/// Per-column mean of the rows selected by `keep`.
pub(crate) fn masked_mean(features: &[Vec<f64>], labels: &[bool], keep: bool) -> (Vec<f64>, usize) {
    let n_features = features.first().map_or(0, Vec::len);
    let mut mean = vec![0.0; n_features];
    let mut count = 0usize;
    for (row, _) in features.iter().zip(labels).filter(|(_, l)| **l == keep) {
        count += 1;
        for (m, v) in mean.iter_mut().zip(row) {
            *m += v;
        }
    }
    if count > 0 {
        mean.iter_mut().for_each(|m| *m /= count as f64);
    }
    (mean, count)
}

pub(crate) fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix(dim: usize, data: &[f64]) -> SquareMatrix {
        SquareMatrix {
            dim,
            data: data.to_vec(),
        }
    }

    #[test]
    fn cholesky_solves_spd_system() {
        let a = matrix(2, &[4.0, 2.0, 2.0, 3.0]);
        let chol = Cholesky::factorize(&a).unwrap();
        let x = chol.solve(&[2.0, 1.0]);
        // 4x + 2y = 2, 2x + 3y = 1  =>  x = 0.5, y = 0
        assert!((x[0] - 0.5).abs() < 1e-12);
        assert!(x[1].abs() < 1e-12);
    }

    #[test]
    fn log_det_matches_determinant() {
        let a = matrix(2, &[4.0, 2.0, 2.0, 3.0]);
        let chol = Cholesky::factorize(&a).unwrap();
        assert!((chol.log_det() - 8.0_f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn mahalanobis_of_identity_is_squared_norm() {
        let a = matrix(2, &[1.0, 0.0, 0.0, 1.0]);
        let chol = Cholesky::factorize(&a).unwrap();
        assert!((chol.mahalanobis_sq(&[3.0, 4.0]) - 25.0).abs() < 1e-12);
    }

    #[test]
    fn singular_matrix_not_factorized() {
        let a = matrix(2, &[1.0, 1.0, 1.0, 1.0]);
        assert!(Cholesky::factorize(&a).is_none());
    }

    #[test]
    fn ridge_makes_singular_factorizable() {
        let mut a = matrix(2, &[1.0, 1.0, 1.0, 1.0]);
        a.add_relative_ridge(1e-3);
        assert!(Cholesky::factorize(&a).is_some());
    }

    #[test]
    fn zero_variance_gets_absolute_ridge() {
        let mut a = SquareMatrix::zeros(3);
        a.add_relative_ridge(0.5);
        for i in 0..3 {
            assert!((a.get(i, i) - 0.5).abs() < 1e-12);
        }
    }

    #[test]
    fn ridge_follows_each_column_scale() {
        let mut a = matrix(2, &[4e-10, 0.0, 0.0, 2.25e6]);
        a.add_relative_ridge(1e-3);
        assert!((a.get(0, 0) - 4.004e-10).abs() < 1e-20);
        assert!((a.get(1, 1) - 2.25225e6).abs() < 1e-6);
    }

    #[test]
    fn masked_mean_selects_class() {
        let features = vec![vec![1.0, 2.0], vec![3.0, 4.0], vec![10.0, 20.0]];
        let labels = [true, true, false];
        let (mean, count) = masked_mean(&features, &labels, true);
        assert_eq!(count, 2);
        assert_eq!(mean, vec![2.0, 3.0]);
    }
}
