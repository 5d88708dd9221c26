//! Sequential composition of classifiers.
//!
//! Each stage only sees the rows every earlier stage predicted positive. The
//! running mask always spans the original rows; a stage's predictions are
//! written into the positions that are still true, so the final mask is the
//! intersection of every stage's acceptance in index space.

use std::borrow::Cow;

use tracing::{debug, instrument};

use crate::{
    classifier::{Classifier, ClassifierSettings, Evaluation, ModelSettings},
    dataset::EvaluationDataset,
    error::ClassifyError,
};

struct Stage {
    classifier: Box<dyn Classifier>,
    indices: Option<Vec<usize>>,
}

/// Ordered list of classifiers applied one after another.
pub struct ChainClassifier {
    name: String,
    stages: Vec<Stage>,
    settings: Option<ClassifierSettings>,
    last_evaluation: Option<Evaluation>,
}

impl ChainClassifier {
    /// Create a chain with no stages. An empty chain accepts every row.
    #[must_use]
    pub fn new() -> Self {
        Self {
            name: "chain".to_string(),
            stages: Vec::new(),
            settings: None,
            last_evaluation: None,
        }
    }

    /// Set the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Append a stage. `indices` overrides the columns passed to the chain's `train`.
    #[must_use]
    pub fn with_stage(mut self, classifier: Box<dyn Classifier>, indices: Option<Vec<usize>>) -> Self {
        self.add_stage(classifier, indices);
        self
    }

    /// Append a stage in place.
    pub fn add_stage(&mut self, classifier: Box<dyn Classifier>, indices: Option<Vec<usize>>) {
        self.stages.push(Stage {
            classifier,
            indices,
        });
    }

    /// Return the number of stages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Return `true` if the chain has no stages.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Iterate over the stage classifiers in order.
    pub fn stages(&self) -> impl Iterator<Item = &dyn Classifier> {
        self.stages.iter().map(|s| s.classifier.as_ref())
    }

    /// Return the full-length running mask after each stage.
    ///
    /// # Errors
    ///
    /// Returns [`ClassifyError::NotTrained`] before `train`, or the first
    /// stage failure wrapped in [`ClassifyError::Stage`].
    pub fn stage_masks(&self, dataset: &EvaluationDataset) -> Result<Vec<Vec<bool>>, ClassifyError> {
        let mut masks = Vec::with_capacity(self.stages.len());
        self.run(dataset, |mask| masks.push(mask.to_vec()))?;
        Ok(masks)
    }

    fn run(
        &self,
        dataset: &EvaluationDataset,
        mut after_stage: impl FnMut(&[bool]),
    ) -> Result<Vec<bool>, ClassifyError> {
        if self.settings.is_none() {
            return Err(ClassifyError::NotTrained {
                classifier: self.name.clone(),
            });
        }
        let mut mask = vec![true; dataset.candidate_count()];
        let mut view = Cow::Borrowed(dataset);
        for (i, stage) in self.stages.iter().enumerate() {
            let wrap = |source| stage_error(i, stage.classifier.name(), source);
            let prediction = stage.classifier.categorize(&view).map_err(wrap)?;
            apply_stage(&mut mask, &prediction).map_err(wrap)?;
            debug!(
                stage = i,
                classifier = stage.classifier.name(),
                kept = prediction.iter().filter(|&&p| p).count(),
                of = prediction.len(),
                "chain stage categorized"
            );
            after_stage(&mask);
            view = Cow::Owned(view.narrow(&prediction).map_err(wrap)?);
        }
        Ok(mask)
    }
}

impl Default for ChainClassifier {
    fn default() -> Self {
        Self::new()
    }
}

fn stage_error(stage: usize, classifier: &str, source: ClassifyError) -> ClassifyError {
    ClassifyError::Stage {
        stage,
        classifier: classifier.to_string(),
        source: Box::new(source),
    }
}

/// Write `prediction` into the still-true positions of `mask`.
fn apply_stage(mask: &mut [bool], prediction: &[bool]) -> Result<(), ClassifyError> {
    let expected = mask.iter().filter(|&&m| m).count();
    if prediction.len() != expected {
        return Err(ClassifyError::MaskLengthMismatch {
            expected,
            got: prediction.len(),
        });
    }
    let mut predicted = prediction.iter();
    for slot in mask.iter_mut().filter(|m| **m) {
        if let Some(&p) = predicted.next() {
            *slot = p;
        }
    }
    Ok(())
}

impl Classifier for ChainClassifier {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_trainable(&self) -> bool {
        true
    }

    fn is_trained(&self) -> bool {
        self.settings.is_some()
    }

    fn settings(&self) -> Option<&ClassifierSettings> {
        self.settings.as_ref()
    }

    /// Train each stage on the rows every earlier stage accepted.
    #[instrument(skip_all, fields(chain = %self.name, n_stages = self.stages.len(), n_rows = dataset.candidate_count()))]
    fn train(
        &mut self,
        dataset: &EvaluationDataset,
        indices: Option<&[usize]>,
    ) -> Result<(), ClassifyError> {
        self.settings = None;
        let mut view = Cow::Borrowed(dataset);
        let mut stage_settings = Vec::with_capacity(self.stages.len());
        for (i, stage) in self.stages.iter_mut().enumerate() {
            let stage_indices = stage.indices.as_deref().or(indices);
            let classifier = &mut stage.classifier;
            let stage_name = classifier.name().to_string();
            let wrap = |source| stage_error(i, &stage_name, source);

            classifier.train(&view, stage_indices).map_err(wrap)?;
            let prediction = classifier.categorize(&view).map_err(wrap)?;
            debug!(
                stage = i,
                classifier = classifier.name(),
                n_rows = view.candidate_count(),
                kept = prediction.iter().filter(|&&p| p).count(),
                "chain stage trained"
            );
            if let Some(settings) = classifier.settings() {
                stage_settings.push(settings.clone());
            }
            view = Cow::Owned(view.narrow(&prediction).map_err(wrap)?);
        }

        let mut columns: Vec<usize> = stage_settings
            .iter()
            .flat_map(|s| s.indices.iter().copied())
            .collect();
        columns.sort_unstable();
        columns.dedup();
        self.settings = Some(ClassifierSettings {
            indices: columns,
            model: ModelSettings::Chain {
                stages: stage_settings,
            },
        });
        Ok(())
    }

    fn categorize(&self, dataset: &EvaluationDataset) -> Result<Vec<bool>, ClassifyError> {
        self.run(dataset, |_| {})
    }

    fn last_evaluation(&self) -> Option<&Evaluation> {
        self.last_evaluation.as_ref()
    }

    fn store_evaluation(&mut self, evaluation: Evaluation) {
        self.last_evaluation = Some(evaluation);
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDateTime;

    use super::*;
    use crate::{model::DecisionTreeClassifier, schema::FeatureSchema, threshold::ThresholdClassifier};

    fn dataset(vorts: &[f64], pmins: &[f64]) -> EvaluationDataset {
        let rows: Vec<Vec<f64>> = vorts
            .iter()
            .zip(pmins)
            .map(|(&v, &p)| {
                let mut row = vec![0.0; 15];
                row[0] = v;
                row[1] = p;
                row
            })
            .collect();
        let n = rows.len();
        EvaluationDataset::new(rows, vec![false; n], vec![NaiveDateTime::default(); n], 0).unwrap()
    }

    fn threshold(key: &str, value: f64) -> Box<dyn Classifier> {
        let schema = FeatureSchema::standard();
        Box::new(ThresholdClassifier::from_cutoffs(&schema, [(key, value)]).unwrap())
    }

    #[test]
    fn apply_stage_writes_into_true_positions() {
        let mut mask = vec![true, false, true, true];
        apply_stage(&mut mask, &[false, true, true]).unwrap();
        assert_eq!(mask, vec![false, false, true, true]);
        assert!(matches!(
            apply_stage(&mut mask, &[true]),
            Err(ClassifyError::MaskLengthMismatch { expected: 2, got: 1 })
        ));
    }

    #[test]
    fn second_stage_only_sees_first_stage_positives() {
        let ds = dataset(&[2.0, 0.0, 2.0, 2.0], &[5.0, 5.0, 50.0, 8.0]);
        let mut chain = ChainClassifier::new()
            .with_stage(threshold("vort_lo", 1.0), None)
            .with_stage(threshold("pmin_hi", 10.0), None);
        chain.train(&ds, None).unwrap();

        let masks = chain.stage_masks(&ds).unwrap();
        assert_eq!(masks[0], vec![true, false, true, true]);
        assert_eq!(masks[1], vec![true, false, false, true]);
        assert_eq!(chain.categorize(&ds).unwrap(), masks[1]);
    }

    #[test]
    fn rejecting_first_stage_leaves_empty_view() {
        let ds = dataset(&[0.0, 0.5], &[5.0, 5.0]);
        let mut chain = ChainClassifier::new()
            .with_stage(threshold("vort_lo", 1.0), None)
            .with_stage(threshold("pmin_hi", 10.0), None);
        chain.train(&ds, None).unwrap();
        assert_eq!(chain.categorize(&ds).unwrap(), vec![false, false]);
    }

    #[test]
    fn empty_chain_accepts_everything() {
        let ds = dataset(&[0.0, 1.0], &[0.0, 0.0]);
        let mut chain = ChainClassifier::new();
        chain.train(&ds, None).unwrap();
        assert_eq!(chain.categorize(&ds).unwrap(), vec![true, true]);
        assert!(chain.stage_masks(&ds).unwrap().is_empty());
    }

    #[test]
    fn settings_collect_stage_settings() {
        let ds = dataset(&[2.0], &[5.0]);
        let mut chain = ChainClassifier::new()
            .with_stage(threshold("pmin_hi", 10.0), None)
            .with_stage(threshold("vort_lo", 1.0), None);
        chain.train(&ds, None).unwrap();
        let settings = chain.settings().unwrap();
        assert_eq!(settings.indices, vec![0, 1]);
        let ModelSettings::Chain { stages } = &settings.model else {
            panic!("expected chain settings");
        };
        assert_eq!(stages.len(), 2);
    }

    #[test]
    fn model_stage_on_empty_view_reports_stage() {
        let ds = dataset(&[0.0, 0.5], &[5.0, 5.0]);
        let mut chain = ChainClassifier::new()
            .with_stage(threshold("vort_lo", 1.0), None)
            .with_stage(Box::new(DecisionTreeClassifier::default()), Some(vec![0, 1]));
        let err = chain.train(&ds, None).unwrap_err();
        assert!(matches!(
            err,
            ClassifyError::Stage { stage: 1, ref source, .. }
                if matches!(**source, ClassifyError::EmptyDataset { .. })
        ));
    }

    #[test]
    fn untrained_chain_fails() {
        let chain = ChainClassifier::new().with_stage(threshold("vort_lo", 1.0), None);
        assert!(matches!(
            chain.categorize(&dataset(&[1.0], &[1.0])),
            Err(ClassifyError::NotTrained { .. })
        ));
    }
}
