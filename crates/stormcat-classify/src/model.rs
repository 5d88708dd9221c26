use stormcat_models::{DecisionTreeConfig, Fit, LdaConfig, Predict, QdaConfig};
use tracing::{debug, instrument};

use crate::{
    classifier::{Classifier, ClassifierSettings, Evaluation, ModelSettings, resolve_indices},
    dataset::EvaluationDataset,
    error::ClassifyError,
};

/// A model configuration usable behind [`ModelClassifier`].
pub trait ModelSpec: Fit {
    /// Name given to classifiers built from this config.
    const DEFAULT_NAME: &'static str;

    /// Report this configuration as typed settings.
    fn model_settings(&self) -> ModelSettings;
}

impl ModelSpec for LdaConfig {
    const DEFAULT_NAME: &'static str = "linear_discriminant";

    fn model_settings(&self) -> ModelSettings {
        ModelSettings::LinearDiscriminant(self.clone())
    }
}

impl ModelSpec for QdaConfig {
    const DEFAULT_NAME: &'static str = "quadratic_discriminant";

    fn model_settings(&self) -> ModelSettings {
        ModelSettings::QuadraticDiscriminant(self.clone())
    }
}

impl ModelSpec for DecisionTreeConfig {
    const DEFAULT_NAME: &'static str = "decision_tree";

    fn model_settings(&self) -> ModelSettings {
        ModelSettings::DecisionTree(self.clone())
    }
}

/// Classifier that slices the selected columns and delegates to a fitted model.
pub struct ModelClassifier<C: ModelSpec> {
    name: String,
    config: C,
    model: Option<C::Model>,
    settings: Option<ClassifierSettings>,
    last_evaluation: Option<Evaluation>,
}

/// Linear discriminant analysis classifier.
pub type LinearDiscriminantClassifier = ModelClassifier<LdaConfig>;
/// Quadratic discriminant analysis classifier.
pub type QuadraticDiscriminantClassifier = ModelClassifier<QdaConfig>;
/// CART decision tree classifier.
pub type DecisionTreeClassifier = ModelClassifier<DecisionTreeConfig>;

impl<C: ModelSpec> ModelClassifier<C> {
    /// Create an untrained classifier for `config`.
    #[must_use]
    pub fn new(config: C) -> Self {
        Self {
            name: C::DEFAULT_NAME.to_string(),
            config,
            model: None,
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

    /// Return the model configuration.
    #[must_use]
    pub fn config(&self) -> &C {
        &self.config
    }

    /// Return the fitted model, if trained.
    #[must_use]
    pub fn model(&self) -> Option<&C::Model> {
        self.model.as_ref()
    }

    fn model_error(&self, source: stormcat_models::ModelError) -> ClassifyError {
        ClassifyError::Model {
            classifier: self.name.clone(),
            source,
        }
    }
}

impl<C: ModelSpec + Default> Default for ModelClassifier<C> {
    fn default() -> Self {
        Self::new(C::default())
    }
}

impl<C: ModelSpec> Classifier for ModelClassifier<C> {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_trainable(&self) -> bool {
        true
    }

    fn is_trained(&self) -> bool {
        self.model.is_some()
    }

    fn settings(&self) -> Option<&ClassifierSettings> {
        self.settings.as_ref()
    }

    #[instrument(skip_all, fields(classifier = %self.name, n_rows = dataset.candidate_count()))]
    fn train(
        &mut self,
        dataset: &EvaluationDataset,
        indices: Option<&[usize]>,
    ) -> Result<(), ClassifyError> {
        self.model = None;
        self.settings = None;
        if dataset.is_empty() {
            return Err(ClassifyError::EmptyDataset {
                classifier: self.name.clone(),
            });
        }
        let indices = resolve_indices(dataset, indices)?;
        let features = dataset.select_columns(&indices)?;
        let model = self
            .config
            .fit(&features, dataset.actual_labels())
            .map_err(|e| self.model_error(e))?;

        debug!(n_features = indices.len(), "model trained");
        self.model = Some(model);
        self.settings = Some(ClassifierSettings {
            indices,
            model: self.config.model_settings(),
        });
        Ok(())
    }

    fn categorize(&self, dataset: &EvaluationDataset) -> Result<Vec<bool>, ClassifyError> {
        let (Some(model), Some(settings)) = (&self.model, &self.settings) else {
            return Err(ClassifyError::NotTrained {
                classifier: self.name.clone(),
            });
        };
        if dataset.is_empty() {
            return Ok(Vec::new());
        }
        let features = dataset.select_columns(&settings.indices)?;
        model
            .predict_batch(&features)
            .map_err(|e| self.model_error(e))
    }

    fn last_evaluation(&self) -> Option<&Evaluation> {
        self.last_evaluation.as_ref()
    }

    fn store_evaluation(&mut self, evaluation: Evaluation) {
        self.last_evaluation = Some(evaluation);
    }
}
