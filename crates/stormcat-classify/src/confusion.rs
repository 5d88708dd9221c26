//! Detection confusion counts and the statistics derived from them.

use std::fmt;

use crate::error::ClassifyError;

/// True/false positive/negative counts for one evaluation.
///
/// Missed candidates are folded into `false_negative`, so
/// `false_negative >= missed` and the four counts sum to
/// `candidate_count + missed`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ConfusionCounts {
    /// Hurricanes predicted as hurricanes.
    pub true_positive: usize,
    /// Non-hurricanes predicted as hurricanes.
    pub false_positive: usize,
    /// Non-hurricanes predicted as non-hurricanes.
    pub true_negative: usize,
    /// Hurricanes predicted as non-hurricanes, plus every missed candidate.
    pub false_negative: usize,
}

impl ConfusionCounts {
    /// Compare predictions with ground truth, counting `missed` extra false negatives.
    ///
    /// # Errors
    ///
    /// Returns [`ClassifyError::PredictionLengthMismatch`] if the slices differ in length.
    pub fn compare(actual: &[bool], predicted: &[bool], missed: usize) -> Result<Self, ClassifyError> {
        if actual.len() != predicted.len() {
            return Err(ClassifyError::PredictionLengthMismatch {
                expected: actual.len(),
                got: predicted.len(),
            });
        }
        let mut counts = Self {
            false_negative: missed,
            ..Self::default()
        };
        for (&a, &p) in actual.iter().zip(predicted) {
            match (a, p) {
                (true, true) => counts.true_positive += 1,
                (false, true) => counts.false_positive += 1,
                (false, false) => counts.true_negative += 1,
                (true, false) => counts.false_negative += 1,
            }
        }
        Ok(counts)
    }

    /// Sum of all four counts.
    #[must_use]
    pub fn total(&self) -> usize {
        self.true_positive + self.false_positive + self.true_negative + self.false_negative
    }
}

impl fmt::Display for ConfusionCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "tp={} fp={} tn={} fn={}",
            self.true_positive, self.false_positive, self.true_negative, self.false_negative
        )
    }
}

/// A ratio that is undefined when its denominator is zero.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Statistic {
    /// A value in `[0, 1]`.
    Defined(f64),
    /// The denominator was zero.
    Undefined,
}

impl Statistic {
    fn ratio(numerator: usize, denominator: usize) -> Self {
        if denominator == 0 {
            Statistic::Undefined
        } else {
            Statistic::Defined(numerator as f64 / denominator as f64)
        }
    }

    /// Return the value, if defined.
    #[must_use]
    pub fn as_option(self) -> Option<f64> {
        match self {
            Statistic::Defined(v) => Some(v),
            Statistic::Undefined => None,
        }
    }

    /// Return the value, naming `statistic` in the error when undefined.
    ///
    /// # Errors
    ///
    /// Returns [`ClassifyError::UndefinedStatistic`] for [`Statistic::Undefined`].
    pub fn value(self, statistic: &'static str) -> Result<f64, ClassifyError> {
        self.as_option()
            .ok_or(ClassifyError::UndefinedStatistic { statistic })
    }

    /// Return `true` if the statistic has a value.
    #[must_use]
    pub fn is_defined(self) -> bool {
        matches!(self, Statistic::Defined(_))
    }
}

impl fmt::Display for Statistic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statistic::Defined(v) => write!(f, "{v:.3}"),
            Statistic::Undefined => f.write_str("undefined"),
        }
    }
}

/// Sensitivity and positive predictive value of one evaluation.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DerivedStats {
    /// `tp / (tp + fn)`.
    pub sensitivity: Statistic,
    /// `tp / (tp + fp)`.
    pub positive_predictive_value: Statistic,
}

impl DerivedStats {
    /// Derive the statistics from confusion counts.
    #[must_use]
    pub fn from_counts(counts: &ConfusionCounts) -> Self {
        Self {
            sensitivity: Statistic::ratio(
                counts.true_positive,
                counts.true_positive + counts.false_negative,
            ),
            positive_predictive_value: Statistic::ratio(
                counts.true_positive,
                counts.true_positive + counts.false_positive,
            ),
        }
    }

    /// Return the sensitivity as a number.
    ///
    /// # Errors
    ///
    /// Returns [`ClassifyError::UndefinedStatistic`] when `tp + fn == 0`.
    pub fn sensitivity_value(&self) -> Result<f64, ClassifyError> {
        self.sensitivity.value("sensitivity")
    }

    /// Return the positive predictive value as a number.
    ///
    /// # Errors
    ///
    /// Returns [`ClassifyError::UndefinedStatistic`] when `tp + fp == 0`.
    pub fn ppv_value(&self) -> Result<f64, ClassifyError> {
        self.positive_predictive_value
            .value("positive predictive value")
    }
}
