//! Hurricane detection on tracked cyclone candidates.
//!
//! Candidates are turned into fixed-width feature rows by a [`FeatureSchema`],
//! bundled with ground truth into an [`EvaluationDataset`], and scored by any
//! [`Classifier`]: fixed threshold cutoffs, discriminant analysis, a decision
//! tree, a standardized SGD linear model, or a [`ChainClassifier`] of these.
//! [`Comparison`] trains a set of classifiers on calibration data and reports
//! confusion counts, sensitivity and positive predictive value on validation
//! data. Candidates lost upstream are always scored as false negatives.

mod chain;
mod classifier;
mod confusion;
mod dataset;
mod error;
pub mod geo;
mod harness;
mod model;
mod online;
mod plan;
mod record;
pub mod schema;
mod threshold;

pub use chain::ChainClassifier;
pub use classifier::{
    Classifier, ClassifierReport, ClassifierSettings, CutoffSetting, Evaluation, ModelSettings,
};
pub use confusion::{ConfusionCounts, DerivedStats, Statistic};
pub use dataset::EvaluationDataset;
pub use error::{ClassifyError, SchemaError};
pub use harness::Comparison;
pub use model::{
    DecisionTreeClassifier, LinearDiscriminantClassifier, ModelClassifier, ModelSpec,
    QuadraticDiscriminantClassifier,
};
pub use online::OnlineLinearClassifier;
pub use plan::{ClassifierPlan, ComparisonPlan, StagePlan};
pub use record::{CandidateRecord, Position, Timestamp};
pub use schema::{FeatureDescriptor, FeatureSchema, FeatureSchemaBuilder};
pub use threshold::{Bound, Cutoff, PRESET_CUTOFFS, ThresholdClassifier};
