//! The train / categorize / evaluate protocol shared by every classifier.

use stormcat_models::{DecisionTreeConfig, LdaConfig, QdaConfig, SgdConfig};

use crate::{
    confusion::{ConfusionCounts, DerivedStats},
    dataset::EvaluationDataset,
    error::ClassifyError,
};

/// A hurricane/not-hurricane classifier.
///
/// `categorize` never mutates its input and uses only the feature columns
/// selected at training time.
pub trait Classifier {
    /// Display name used in logs and reports.
    fn name(&self) -> &str;

    /// Whether [`Classifier::train`] fits anything to data.
    fn is_trainable(&self) -> bool;

    /// Whether the classifier is ready to categorize.
    fn is_trained(&self) -> bool;

    /// Settings resolved by the last successful `train`, if any.
    fn settings(&self) -> Option<&ClassifierSettings>;

    /// Train on `dataset` using the feature columns in `indices`.
    ///
    /// `None` selects [`EvaluationDataset::default_indices`].
    ///
    /// # Errors
    ///
    /// Returns a [`ClassifyError`] if the selection or the model fit fails;
    /// the classifier is then left untrained.
    fn train(
        &mut self,
        dataset: &EvaluationDataset,
        indices: Option<&[usize]>,
    ) -> Result<(), ClassifyError>;

    /// Predict one boolean per dataset row.
    ///
    /// # Errors
    ///
    /// Returns [`ClassifyError::NotTrained`] before `train`, or a selection
    /// or model error.
    fn categorize(&self, dataset: &EvaluationDataset) -> Result<Vec<bool>, ClassifyError>;

    /// The most recent result of [`Classifier::evaluate`].
    fn last_evaluation(&self) -> Option<&Evaluation>;

    /// Replace the stored evaluation.
    fn store_evaluation(&mut self, evaluation: Evaluation);

    /// Categorize, score against ground truth and store the result.
    ///
    /// # Errors
    ///
    /// Returns any error from [`Classifier::categorize`].
    fn evaluate(&mut self, dataset: &EvaluationDataset) -> Result<Evaluation, ClassifyError> {
        let prediction = self.categorize(dataset)?;
        let evaluation = Evaluation::score(dataset, prediction)?;
        self.store_evaluation(evaluation.clone());
        Ok(evaluation)
    }
}

/// Hyperparameters of one classifier variant.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelSettings {
    /// Ordered `"{feature}_{lo|hi}"` cutoffs.
    Threshold {
        /// Cutoffs in application order.
        cutoffs: Vec<CutoffSetting>,
    },
    /// Linear discriminant hyperparameters.
    LinearDiscriminant(LdaConfig),
    /// Quadratic discriminant hyperparameters.
    QuadraticDiscriminant(QdaConfig),
    /// Decision tree hyperparameters.
    DecisionTree(DecisionTreeConfig),
    /// Online linear model hyperparameters.
    OnlineLinear(SgdConfig),
    /// Settings of every chain stage, in order.
    Chain {
        /// Per-stage settings.
        stages: Vec<ClassifierSettings>,
    },
}

/// One threshold cutoff as reported in settings.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CutoffSetting {
    /// `"{feature}_lo"` or `"{feature}_hi"`.
    pub key: String,
    /// Cutoff value.
    pub value: f64,
}

/// Settings fixed by `train`: selected columns plus typed hyperparameters.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ClassifierSettings {
    /// Feature columns the classifier reads.
    pub indices: Vec<usize>,
    /// Variant hyperparameters.
    pub model: ModelSettings,
}

/// Result of one [`Classifier::evaluate`] call.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Evaluation {
    /// Per-row predictions.
    pub prediction: Vec<bool>,
    /// Confusion counts including missed candidates.
    pub counts: ConfusionCounts,
    /// Sensitivity and PPV.
    pub stats: DerivedStats,
}

impl Evaluation {
    /// Score `prediction` against `dataset`'s labels and missed count.
    ///
    /// # Errors
    ///
    /// Returns [`ClassifyError::PredictionLengthMismatch`] if lengths differ.
    pub fn score(dataset: &EvaluationDataset, prediction: Vec<bool>) -> Result<Self, ClassifyError> {
        let counts = ConfusionCounts::compare(
            dataset.actual_labels(),
            &prediction,
            dataset.missed_count(),
        )?;
        Ok(Self {
            prediction,
            counts,
            stats: DerivedStats::from_counts(&counts),
        })
    }
}

/// Serializable summary of one classifier's last evaluation.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ClassifierReport {
    /// Classifier name.
    pub name: String,
    /// Settings resolved at training time.
    pub settings: Option<ClassifierSettings>,
    /// Confusion counts.
    pub counts: ConfusionCounts,
    /// Derived statistics.
    pub stats: DerivedStats,
}

impl ClassifierReport {
    /// Build a report from a classifier's last evaluation, if it has one.
    #[must_use]
    pub fn from_classifier(classifier: &dyn Classifier) -> Option<Self> {
        let evaluation = classifier.last_evaluation()?;
        Some(Self {
            name: classifier.name().to_string(),
            settings: classifier.settings().cloned(),
            counts: evaluation.counts,
            stats: evaluation.stats,
        })
    }
}

/// Resolve the feature selection for `dataset`, falling back to its default.
pub(crate) fn resolve_indices(
    dataset: &EvaluationDataset,
    indices: Option<&[usize]>,
) -> Result<Vec<usize>, ClassifyError> {
    let resolved = match indices {
        Some(indices) => indices.to_vec(),
        None => dataset.default_indices(),
    };
    if resolved.is_empty() {
        return Err(ClassifyError::EmptyFeatureSelection);
    }
    dataset.check_column_range(&resolved)?;
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDateTime;

    use crate::schema::FeatureSchema;

    use super::*;

    fn dataset(n_columns: usize) -> EvaluationDataset {
        EvaluationDataset::new(
            vec![vec![0.0; n_columns]],
            vec![true],
            vec![NaiveDateTime::default()],
            0,
        )
        .unwrap()
    }

    #[test]
    fn default_selection_follows_schema() {
        let standard = dataset(15)
            .with_default_indices(FeatureSchema::standard().default_indices())
            .unwrap();
        assert_eq!(
            resolve_indices(&standard, None).unwrap(),
            (0..13).collect::<Vec<_>>()
        );

        // Without a position boundary every column is a feature.
        assert_eq!(resolve_indices(&dataset(2), None).unwrap(), vec![0, 1]);
    }

    #[test]
    fn explicit_selection_is_kept_in_order() {
        assert_eq!(resolve_indices(&dataset(5), Some(&[4, 0])).unwrap(), vec![4, 0]);
    }

    #[test]
    fn selection_errors() {
        assert!(matches!(
            resolve_indices(&dataset(2), Some(&[])),
            Err(ClassifyError::EmptyFeatureSelection)
        ));
        assert!(matches!(
            resolve_indices(&dataset(3), Some(&[3])),
            Err(ClassifyError::ColumnOutOfRange { index: 3, n_columns: 3 })
        ));
    }

    #[test]
    fn score_counts_missed_as_false_negative() {
        let ds = EvaluationDataset::new(
            vec![vec![1.0], vec![2.0]],
            vec![true, false],
            vec![NaiveDateTime::default(); 2],
            2,
        )
        .unwrap();
        let evaluation = Evaluation::score(&ds, vec![false, false]).unwrap();
        assert_eq!(evaluation.counts.false_negative, 3);
        assert_eq!(evaluation.counts.true_negative, 1);
    }
}
