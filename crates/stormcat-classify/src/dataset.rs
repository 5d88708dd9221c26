use crate::{error::ClassifyError, record::Timestamp};

/// Immutable, row-aligned bundle of features, ground truth and timestamps.
///
/// `missed_count` counts candidates excluded upstream; they never appear as
/// rows but are always scored as false negatives. Narrowing produces a new
/// dataset that keeps the same `missed_count` and default selection.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct EvaluationDataset {
    features: Vec<Vec<f64>>,
    actual_labels: Vec<bool>,
    timestamps: Vec<Timestamp>,
    missed_count: usize,
    #[serde(default)]
    default_indices: Option<Vec<usize>>,
}

impl EvaluationDataset {
    /// Bundle aligned arrays into a dataset.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ClassifyError::DatasetLengthMismatch`] | the three arrays differ in length |
    /// | [`ClassifyError::InconsistentRowWidth`] | feature rows differ in width |
    pub fn new(
        features: Vec<Vec<f64>>,
        actual_labels: Vec<bool>,
        timestamps: Vec<Timestamp>,
        missed_count: usize,
    ) -> Result<Self, ClassifyError> {
        if features.len() != actual_labels.len() || features.len() != timestamps.len() {
            return Err(ClassifyError::DatasetLengthMismatch {
                rows: features.len(),
                labels: actual_labels.len(),
                timestamps: timestamps.len(),
            });
        }
        if let Some(first) = features.first() {
            let expected = first.len();
            if let Some((row, bad)) = features
                .iter()
                .enumerate()
                .find(|(_, r)| r.len() != expected)
            {
                return Err(ClassifyError::InconsistentRowWidth {
                    row,
                    expected,
                    got: bad.len(),
                });
            }
        }
        Ok(Self {
            features,
            actual_labels,
            timestamps,
            missed_count,
            default_indices: None,
        })
    }

    /// Set the columns a classifier trains on when given no explicit selection.
    ///
    /// Readers pass [`crate::FeatureSchema::default_indices`] here so the
    /// schema alone decides which columns count as features.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ClassifyError::EmptyFeatureSelection`] | `indices` is empty |
    /// | [`ClassifyError::ColumnOutOfRange`] | an index is `>= n_columns()` |
    pub fn with_default_indices(mut self, indices: Vec<usize>) -> Result<Self, ClassifyError> {
        if indices.is_empty() {
            return Err(ClassifyError::EmptyFeatureSelection);
        }
        self.check_column_range(&indices)?;
        self.default_indices = Some(indices);
        Ok(self)
    }

    /// A dataset with no rows and no missed candidates.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            features: Vec::new(),
            actual_labels: Vec::new(),
            timestamps: Vec::new(),
            missed_count: 0,
            default_indices: None,
        }
    }

    /// Return the row-major feature matrix.
    #[must_use]
    pub fn features(&self) -> &[Vec<f64>] {
        &self.features
    }

    /// Return the ground-truth labels.
    #[must_use]
    pub fn actual_labels(&self) -> &[bool] {
        &self.actual_labels
    }

    /// Return the per-row timestamps.
    #[must_use]
    pub fn timestamps(&self) -> &[Timestamp] {
        &self.timestamps
    }

    /// Return the number of candidates missed upstream.
    #[must_use]
    pub fn missed_count(&self) -> usize {
        self.missed_count
    }

    /// Return the number of candidates that reached this dataset (its row count).
    #[must_use]
    pub fn candidate_count(&self) -> usize {
        self.features.len()
    }

    /// Return the number of actual hurricanes among the rows.
    #[must_use]
    pub fn actual_positive_count(&self) -> usize {
        self.actual_labels.iter().filter(|&&a| a).count()
    }

    /// Return the number of feature columns (0 for an empty dataset).
    #[must_use]
    pub fn n_columns(&self) -> usize {
        self.features.first().map_or(0, Vec::len)
    }

    /// Return the default feature selection: the columns set with
    /// [`EvaluationDataset::with_default_indices`], or every column.
    #[must_use]
    pub fn default_indices(&self) -> Vec<usize> {
        self.default_indices
            .clone()
            .unwrap_or_else(|| (0..self.n_columns()).collect())
    }

    /// Return `true` if the dataset has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Keep only the rows where `mask` is true, preserving order and alignment.
    ///
    /// # Errors
    ///
    /// Returns [`ClassifyError::MaskLengthMismatch`] if `mask.len()` differs from the row count.
    pub fn narrow(&self, mask: &[bool]) -> Result<Self, ClassifyError> {
        if mask.len() != self.features.len() {
            return Err(ClassifyError::MaskLengthMismatch {
                expected: self.features.len(),
                got: mask.len(),
            });
        }
        let rows: Vec<usize> = (0..mask.len()).filter(|&i| mask[i]).collect();
        Ok(Self {
            features: rows.iter().map(|&i| self.features[i].clone()).collect(),
            actual_labels: rows.iter().map(|&i| self.actual_labels[i]).collect(),
            timestamps: rows.iter().map(|&i| self.timestamps[i]).collect(),
            missed_count: self.missed_count,
            default_indices: self.default_indices.clone(),
        })
    }

    /// Copy out the selected columns of every row.
    ///
    /// An empty dataset yields an empty matrix without range checks.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ClassifyError::EmptyFeatureSelection`] | `indices` is empty |
    /// | [`ClassifyError::ColumnOutOfRange`] | an index is `>= n_columns()` |
    pub fn select_columns(&self, indices: &[usize]) -> Result<Vec<Vec<f64>>, ClassifyError> {
        if indices.is_empty() {
            return Err(ClassifyError::EmptyFeatureSelection);
        }
        if self.is_empty() {
            return Ok(Vec::new());
        }
        self.check_column_range(indices)?;
        Ok(self
            .features
            .iter()
            .map(|row| indices.iter().map(|&c| row[c]).collect())
            .collect())
    }

    /// Verify every index addresses an existing column; empty datasets always pass.
    ///
    /// # Errors
    ///
    /// Returns [`ClassifyError::ColumnOutOfRange`] for the first bad index.
    pub fn check_column_range(&self, indices: &[usize]) -> Result<(), ClassifyError> {
        if self.is_empty() {
            return Ok(());
        }
        let n_columns = self.n_columns();
        match indices.iter().find(|&&c| c >= n_columns) {
            Some(&index) => Err(ClassifyError::ColumnOutOfRange { index, n_columns }),
            None => Ok(()),
        }
    }
}
