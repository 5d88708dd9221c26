//! Train a set of classifiers on calibration data and compare them on validation data.

use tracing::{debug, info, instrument};

use crate::{
    classifier::{Classifier, ClassifierReport},
    dataset::EvaluationDataset,
    error::ClassifyError,
};

/// Calibration/validation pair plus the classifiers under comparison.
pub struct Comparison {
    calibration: EvaluationDataset,
    validation: EvaluationDataset,
    classifiers: Vec<Box<dyn Classifier>>,
}

impl Comparison {
    /// Create a comparison with no classifiers.
    #[must_use]
    pub fn new(calibration: EvaluationDataset, validation: EvaluationDataset) -> Self {
        Self {
            calibration,
            validation,
            classifiers: Vec::new(),
        }
    }

    /// Append a classifier. Names are not deduplicated.
    ///
    /// [`Comparison::train_all`] skips classifiers that are not trainable,
    /// so those (thresholds) must already be trained when added, as
    /// [`crate::ClassifierPlan::build`] does.
    pub fn add_classifier(&mut self, classifier: Box<dyn Classifier>) {
        self.classifiers.push(classifier);
    }

    /// Builder form of [`Comparison::add_classifier`].
    #[must_use]
    pub fn with_classifier(mut self, classifier: Box<dyn Classifier>) -> Self {
        self.add_classifier(classifier);
        self
    }

    /// Return the calibration dataset.
    #[must_use]
    pub fn calibration(&self) -> &EvaluationDataset {
        &self.calibration
    }

    /// Return the validation dataset.
    #[must_use]
    pub fn validation(&self) -> &EvaluationDataset {
        &self.validation
    }

    /// Return the classifiers in insertion order.
    #[must_use]
    pub fn classifiers(&self) -> &[Box<dyn Classifier>] {
        &self.classifiers
    }

    /// Train every trainable classifier on the calibration data.
    ///
    /// Non-trainable classifiers are left as they were added.
    ///
    /// # Errors
    ///
    /// Returns [`ClassifyError::Classifier`] naming the first classifier that fails.
    #[instrument(skip_all, fields(n_classifiers = self.classifiers.len(), n_rows = self.calibration.candidate_count()))]
    pub fn train_all(&mut self) -> Result<(), ClassifyError> {
        for classifier in &mut self.classifiers {
            if !classifier.is_trainable() {
                debug!(classifier = classifier.name(), "not trainable, skipping");
                continue;
            }
            classifier
                .train(&self.calibration, None)
                .map_err(|source| ClassifyError::Classifier {
                    name: classifier.name().to_string(),
                    source: Box::new(source),
                })?;
            info!(classifier = classifier.name(), "trained");
        }
        Ok(())
    }

    /// Evaluate every classifier on the validation data.
    ///
    /// # Errors
    ///
    /// Returns [`ClassifyError::Classifier`] naming the first classifier that fails.
    #[instrument(skip_all, fields(n_classifiers = self.classifiers.len(), n_rows = self.validation.candidate_count()))]
    pub fn compare_all(&mut self) -> Result<Vec<ClassifierReport>, ClassifyError> {
        let mut reports = Vec::with_capacity(self.classifiers.len());
        for classifier in &mut self.classifiers {
            let evaluation =
                classifier
                    .evaluate(&self.validation)
                    .map_err(|source| ClassifyError::Classifier {
                        name: classifier.name().to_string(),
                        source: Box::new(source),
                    })?;
            info!(
                classifier = classifier.name(),
                tp = evaluation.counts.true_positive,
                fp = evaluation.counts.false_positive,
                tn = evaluation.counts.true_negative,
                fn_ = evaluation.counts.false_negative,
                sensitivity = %evaluation.stats.sensitivity,
                ppv = %evaluation.stats.positive_predictive_value,
                "evaluated"
            );
            reports.extend(ClassifierReport::from_classifier(classifier.as_ref()));
        }
        Ok(reports)
    }

    /// Rebuild reports from each classifier's stored evaluation.
    ///
    /// Classifiers that were never evaluated are left out.
    #[must_use]
    pub fn reports(&self) -> Vec<ClassifierReport> {
        self.classifiers
            .iter()
            .filter_map(|c| ClassifierReport::from_classifier(c.as_ref()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDateTime;

    use super::*;
    use crate::{model::DecisionTreeClassifier, schema::FeatureSchema, threshold::ThresholdClassifier};

    fn dataset(vorts: &[f64], labels: &[bool], missed: usize) -> EvaluationDataset {
        let rows: Vec<Vec<f64>> = vorts
            .iter()
            .map(|&v| {
                let mut row = vec![0.0; 15];
                row[0] = v;
                row[2] = -v;
                row
            })
            .collect();
        let n = rows.len();
        EvaluationDataset::new(rows, labels.to_vec(), vec![NaiveDateTime::default(); n], missed)
            .unwrap()
    }

    fn threshold() -> Box<dyn Classifier> {
        let schema = FeatureSchema::standard();
        Box::new(ThresholdClassifier::from_cutoffs(&schema, [("vort_lo", 1.0)]).unwrap())
    }

    #[test]
    fn train_skips_untrainable_and_compare_uses_validation() {
        let calibration = dataset(&[0.0, 2.0, 0.5, 3.0], &[false, true, false, true], 0);
        let validation = dataset(&[2.0, 0.0], &[true, true], 3);
        let mut fixed = threshold();
        fixed.train(&EvaluationDataset::empty(), None).unwrap();
        let fixed_settings = fixed.settings().cloned();

        let mut comparison = Comparison::new(calibration, validation)
            .with_classifier(fixed)
            .with_classifier(Box::new(DecisionTreeClassifier::default()));
        comparison.train_all().unwrap();
        // The threshold is skipped, so its settings are the ones it was added with.
        assert_eq!(comparison.classifiers()[0].settings().cloned(), fixed_settings);
        assert!(comparison.classifiers()[1].is_trained());

        let reports = comparison.compare_all().unwrap();
        assert_eq!(reports.len(), 2);
        for report in &reports {
            assert_eq!(report.counts.total(), 2 + 3);
            assert_eq!(report.counts.true_positive, 1);
            assert_eq!(report.counts.false_negative, 4);
        }
        assert_eq!(comparison.reports(), reports);
    }

    #[test]
    fn failure_names_classifier() {
        let calibration = dataset(&[0.0, 2.0], &[false, true], 0);
        let validation = dataset(&[2.0], &[true], 0);
        let mut comparison =
            Comparison::new(calibration, validation).with_classifier(threshold());
        let err = comparison.compare_all().unwrap_err();
        assert!(matches!(
            err,
            ClassifyError::Classifier { ref name, ref source }
                if name == "threshold" && matches!(**source, ClassifyError::NotTrained { .. })
        ));
        assert!(comparison.reports().is_empty());
    }
}
