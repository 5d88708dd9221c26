use std::fmt;

use tracing::debug;

use crate::{
    classifier::{
        Classifier, ClassifierSettings, CutoffSetting, Evaluation, ModelSettings,
    },
    dataset::EvaluationDataset,
    error::ClassifyError,
    schema::FeatureSchema,
};

/// Hand-tuned cutoffs swapped in by [`ThresholdClassifier::with_preset`].
pub const PRESET_CUTOFFS: [(&str, f64); 5] = [
    ("vort_lo", 0.000_104),
    ("t995_lo", 297.2),
    ("t850_lo", 286.7),
    ("maxwindspeed_lo", 16.1),
    ("pambdiff_lo", 563.4),
];

/// Which side of a cutoff is kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    /// `_lo`: keep rows with `value > cutoff`.
    Lower,
    /// `_hi`: keep rows with `value < cutoff`.
    Upper,
}

impl Bound {
    fn suffix(self) -> &'static str {
        match self {
            Bound::Lower => "lo",
            Bound::Upper => "hi",
        }
    }

    fn keeps(self, value: f64, cutoff: f64) -> bool {
        match self {
            Bound::Lower => value > cutoff,
            Bound::Upper => value < cutoff,
        }
    }
}

/// A cutoff resolved against a [`FeatureSchema`].
#[derive(Debug, Clone, PartialEq)]
pub struct Cutoff {
    feature: String,
    column: usize,
    bound: Bound,
    value: f64,
}

impl Cutoff {
    /// Parse `"{feature}_{lo|hi}"` and resolve the feature's column.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ClassifyError::InvalidCutoffKey`] | no `_lo`/`_hi` suffix |
    /// | [`ClassifyError::Schema`] | the feature is not in `schema` |
    pub fn parse(schema: &FeatureSchema, key: &str, value: f64) -> Result<Self, ClassifyError> {
        let invalid = || ClassifyError::InvalidCutoffKey {
            key: key.to_string(),
        };
        let (feature, suffix) = key.rsplit_once('_').ok_or_else(invalid)?;
        let bound = match suffix {
            "lo" => Bound::Lower,
            "hi" => Bound::Upper,
            _ => return Err(invalid()),
        };
        let column = schema.index_of(feature)?;
        Ok(Self {
            feature: feature.to_string(),
            column,
            bound,
            value,
        })
    }

    /// Return the feature name.
    #[must_use]
    pub fn feature(&self) -> &str {
        &self.feature
    }

    /// Return the resolved column index.
    #[must_use]
    pub fn column(&self) -> usize {
        self.column
    }

    /// Return which side of the cutoff is kept.
    #[must_use]
    pub fn bound(&self) -> Bound {
        self.bound
    }

    /// Return the cutoff value.
    #[must_use]
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Return the `"{feature}_{lo|hi}"` key.
    #[must_use]
    pub fn key(&self) -> String {
        format!("{}_{}", self.feature, self.bound.suffix())
    }
}

impl fmt::Display for Cutoff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.key(), self.value)
    }
}

/// Fixed-rule classifier that ANDs a list of per-feature cutoffs.
///
/// Starts from an all-true mask; an empty cutoff list accepts every row.
/// Cutoffs are applied in insertion order, which only matters for reporting.
#[derive(Debug, Clone)]
pub struct ThresholdClassifier {
    name: String,
    cutoffs: Vec<Cutoff>,
    preset: Option<Vec<Cutoff>>,
    settings: Option<ClassifierSettings>,
    last_evaluation: Option<Evaluation>,
}

impl ThresholdClassifier {
    /// Create a classifier with no cutoffs.
    #[must_use]
    pub fn new() -> Self {
        Self {
            name: "threshold".to_string(),
            cutoffs: Vec::new(),
            preset: None,
            settings: None,
            last_evaluation: None,
        }
    }

    /// Create a classifier from `(key, value)` pairs applied in order.
    ///
    /// # Errors
    ///
    /// Returns the first error from [`Cutoff::parse`].
    pub fn from_cutoffs<'a>(
        schema: &FeatureSchema,
        cutoffs: impl IntoIterator<Item = (&'a str, f64)>,
    ) -> Result<Self, ClassifyError> {
        cutoffs
            .into_iter()
            .try_fold(Self::new(), |acc, (key, value)| acc.with_cutoff(schema, key, value))
    }

    /// Append one cutoff.
    ///
    /// # Errors
    ///
    /// Returns any error from [`Cutoff::parse`].
    pub fn with_cutoff(
        mut self,
        schema: &FeatureSchema,
        key: &str,
        value: f64,
    ) -> Result<Self, ClassifyError> {
        self.cutoffs.push(Cutoff::parse(schema, key, value)?);
        Ok(self)
    }

    /// Replace the cutoffs with [`PRESET_CUTOFFS`] when trained.
    ///
    /// # Errors
    ///
    /// Returns [`ClassifyError::Schema`] if `schema` lacks a preset feature.
    pub fn with_preset(mut self, schema: &FeatureSchema) -> Result<Self, ClassifyError> {
        let preset = PRESET_CUTOFFS
            .iter()
            .map(|&(key, value)| Cutoff::parse(schema, key, value))
            .collect::<Result<Vec<_>, _>>()?;
        self.preset = Some(preset);
        Ok(self)
    }

    /// Set the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Return the active cutoffs in application order.
    #[must_use]
    pub fn cutoffs(&self) -> &[Cutoff] {
        &self.cutoffs
    }

    fn cutoff_settings(&self) -> Vec<CutoffSetting> {
        self.cutoffs
            .iter()
            .map(|c| CutoffSetting {
                key: c.key(),
                value: c.value,
            })
            .collect()
    }
}

impl Default for ThresholdClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Classifier for ThresholdClassifier {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_trainable(&self) -> bool {
        false
    }

    fn is_trained(&self) -> bool {
        self.settings.is_some()
    }

    fn settings(&self) -> Option<&ClassifierSettings> {
        self.settings.as_ref()
    }

    /// Fix the cutoffs without looking at data; swaps in the preset if configured.
    ///
    /// The cutoffs name their own columns, so `indices` is ignored and the
    /// settings always report the cutoff columns.
    fn train(
        &mut self,
        _dataset: &EvaluationDataset,
        _indices: Option<&[usize]>,
    ) -> Result<(), ClassifyError> {
        if let Some(preset) = self.preset.clone() {
            self.cutoffs = preset;
        }
        let mut indices: Vec<usize> = self.cutoffs.iter().map(|c| c.column).collect();
        indices.sort_unstable();
        indices.dedup();
        self.settings = Some(ClassifierSettings {
            indices,
            model: ModelSettings::Threshold {
                cutoffs: self.cutoff_settings(),
            },
        });
        debug!(classifier = %self.name, n_cutoffs = self.cutoffs.len(), "threshold cutoffs fixed");
        Ok(())
    }

    fn categorize(&self, dataset: &EvaluationDataset) -> Result<Vec<bool>, ClassifyError> {
        if self.settings.is_none() {
            return Err(ClassifyError::NotTrained {
                classifier: self.name.clone(),
            });
        }
        let mut mask = vec![true; dataset.candidate_count()];
        for cutoff in &self.cutoffs {
            dataset.check_column_range(&[cutoff.column])?;
            for (keep, row) in mask.iter_mut().zip(dataset.features()) {
                *keep &= cutoff.bound.keeps(row[cutoff.column], cutoff.value);
            }
        }
        Ok(mask)
    }

    fn last_evaluation(&self) -> Option<&Evaluation> {
        self.last_evaluation.as_ref()
    }

    fn store_evaluation(&mut self, evaluation: Evaluation) {
        self.last_evaluation = Some(evaluation);
    }
}
