//! JSON descriptions of classifiers, resolved against a [`FeatureSchema`].
//!
//! ```json
//! {
//!   "classifiers": [
//!     { "kind": "threshold", "preset": true },
//!     { "kind": "decision_tree", "config": { "max_depth": 4 } },
//!     {
//!       "kind": "chain",
//!       "name": "threshold_then_lda",
//!       "stages": [
//!         { "plan": { "kind": "threshold", "cutoffs": [{ "key": "vort_lo", "value": 0.0001 }] } },
//!         { "plan": { "kind": "linear_discriminant" }, "features": ["pmin", "t995"] }
//!       ]
//!     }
//!   ]
//! }
//! ```

use stormcat_models::{DecisionTreeConfig, LdaConfig, QdaConfig, SgdConfig};

use crate::{
    chain::ChainClassifier,
    classifier::{Classifier, CutoffSetting},
    dataset::EvaluationDataset,
    error::ClassifyError,
    model::{DecisionTreeClassifier, LinearDiscriminantClassifier, QuadraticDiscriminantClassifier},
    online::OnlineLinearClassifier,
    schema::FeatureSchema,
    threshold::ThresholdClassifier,
};

/// One classifier, tagged by `kind`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClassifierPlan {
    /// Fixed cutoffs, optionally replaced by the preset at train time.
    Threshold {
        /// Display name override.
        #[serde(default)]
        name: Option<String>,
        /// Cutoffs in application order.
        #[serde(default)]
        cutoffs: Vec<CutoffSetting>,
        /// Swap in the hand-tuned preset when trained.
        #[serde(default)]
        preset: bool,
    },
    /// Linear discriminant analysis.
    LinearDiscriminant {
        /// Display name override.
        #[serde(default)]
        name: Option<String>,
        /// Hyperparameters.
        #[serde(default)]
        config: LdaConfig,
    },
    /// Quadratic discriminant analysis.
    QuadraticDiscriminant {
        /// Display name override.
        #[serde(default)]
        name: Option<String>,
        /// Hyperparameters.
        #[serde(default)]
        config: QdaConfig,
    },
    /// CART decision tree.
    DecisionTree {
        /// Display name override.
        #[serde(default)]
        name: Option<String>,
        /// Hyperparameters.
        #[serde(default)]
        config: DecisionTreeConfig,
    },
    /// Standardized SGD linear model.
    OnlineLinear {
        /// Display name override.
        #[serde(default)]
        name: Option<String>,
        /// Hyperparameters.
        #[serde(default)]
        config: SgdConfig,
    },
    /// Stages applied in sequence.
    Chain {
        /// Display name override.
        #[serde(default)]
        name: Option<String>,
        /// Stages in order; must not be empty.
        stages: Vec<StagePlan>,
    },
}

/// One chain stage: a nested plan plus an optional feature selection.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct StagePlan {
    /// The stage classifier.
    pub plan: ClassifierPlan,
    /// Feature names the stage trains on; the chain's selection when absent.
    #[serde(default)]
    pub features: Option<Vec<String>>,
}

/// A list of classifiers to compare.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ComparisonPlan {
    /// Classifiers in report order.
    pub classifiers: Vec<ClassifierPlan>,
}

impl ComparisonPlan {
    /// Build every classifier in order.
    ///
    /// # Errors
    ///
    /// Returns the first error from [`ClassifierPlan::build`].
    pub fn build_all(&self, schema: &FeatureSchema) -> Result<Vec<Box<dyn Classifier>>, ClassifyError> {
        self.classifiers.iter().map(|plan| plan.build(schema)).collect()
    }
}

fn named<T>(classifier: T, name: Option<&String>, rename: impl FnOnce(T, String) -> T) -> T {
    match name {
        Some(name) => rename(classifier, name.clone()),
        None => classifier,
    }
}

impl ClassifierPlan {
    /// Build the described classifier.
    ///
    /// Threshold classifiers come back already trained, since training them
    /// never reads data and the comparison harness skips them.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ClassifyError::InvalidCutoffKey`] | a threshold key lacks `_lo`/`_hi` |
    /// | [`ClassifyError::Schema`] | a cutoff or stage feature is not in `schema` |
    /// | [`ClassifyError::InvalidPlan`] | a chain has no stages, or a stage selects no features |
    pub fn build(&self, schema: &FeatureSchema) -> Result<Box<dyn Classifier>, ClassifyError> {
        let classifier: Box<dyn Classifier> = match self {
            ClassifierPlan::Threshold {
                name,
                cutoffs,
                preset,
            } => {
                let pairs = cutoffs.iter().map(|c| (c.key.as_str(), c.value));
                let mut threshold = ThresholdClassifier::from_cutoffs(schema, pairs)?;
                if *preset {
                    threshold = threshold.with_preset(schema)?;
                }
                let mut threshold = named(threshold, name.as_ref(), |c, n| c.with_name(n));
                threshold.train(&EvaluationDataset::empty(), None)?;
                Box::new(threshold)
            }
            ClassifierPlan::LinearDiscriminant { name, config } => Box::new(named(
                LinearDiscriminantClassifier::new(config.clone()),
                name.as_ref(),
                |c, n| c.with_name(n),
            )),
            ClassifierPlan::QuadraticDiscriminant { name, config } => Box::new(named(
                QuadraticDiscriminantClassifier::new(config.clone()),
                name.as_ref(),
                |c, n| c.with_name(n),
            )),
            ClassifierPlan::DecisionTree { name, config } => Box::new(named(
                DecisionTreeClassifier::new(config.clone()),
                name.as_ref(),
                |c, n| c.with_name(n),
            )),
            ClassifierPlan::OnlineLinear { name, config } => Box::new(named(
                OnlineLinearClassifier::new(config.clone()),
                name.as_ref(),
                |c, n| c.with_name(n),
            )),
            ClassifierPlan::Chain { name, stages } => {
                if stages.is_empty() {
                    return Err(ClassifyError::InvalidPlan {
                        reason: "chain has no stages".to_string(),
                    });
                }
                let mut chain = named(ChainClassifier::new(), name.as_ref(), |c, n| c.with_name(n));
                for (i, stage) in stages.iter().enumerate() {
                    let indices = stage
                        .features
                        .as_ref()
                        .map(|features| resolve_features(schema, i, features))
                        .transpose()?;
                    chain.add_stage(stage.plan.build(schema)?, indices);
                }
                Box::new(chain)
            }
        };
        Ok(classifier)
    }
}

fn resolve_features(
    schema: &FeatureSchema,
    stage: usize,
    features: &[String],
) -> Result<Vec<usize>, ClassifyError> {
    if features.is_empty() {
        return Err(ClassifyError::InvalidPlan {
            reason: format!("chain stage {stage} selects no features"),
        });
    }
    features
        .iter()
        .map(|f| schema.index_of(f).map_err(ClassifyError::from))
        .collect()
}
