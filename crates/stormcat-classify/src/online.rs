use stormcat_models::{Fit, ModelError, Predict, SgdConfig, SgdModel, StandardScaler};
use tracing::{debug, instrument};

use crate::{
    classifier::{Classifier, ClassifierSettings, Evaluation, ModelSettings, resolve_indices},
    dataset::EvaluationDataset,
    error::ClassifyError,
};

struct Fitted {
    scaler: StandardScaler,
    model: SgdModel,
}

/// Linear classifier trained by stochastic gradient descent on standardized features.
///
/// The scaler is fitted on the training rows and reused unchanged when
/// categorizing, so validation data is never used to re-center features.
pub struct OnlineLinearClassifier {
    name: String,
    config: SgdConfig,
    fitted: Option<Fitted>,
    settings: Option<ClassifierSettings>,
    last_evaluation: Option<Evaluation>,
}

impl OnlineLinearClassifier {
    /// Create an untrained classifier.
    #[must_use]
    pub fn new(config: SgdConfig) -> Self {
        Self {
            name: "online_linear".to_string(),
            config,
            fitted: None,
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

    /// Return the SGD configuration.
    #[must_use]
    pub fn config(&self) -> &SgdConfig {
        &self.config
    }

    /// Return the scaler fitted at training time.
    #[must_use]
    pub fn scaler(&self) -> Option<&StandardScaler> {
        self.fitted.as_ref().map(|f| &f.scaler)
    }

    /// Return the fitted linear model.
    #[must_use]
    pub fn model(&self) -> Option<&SgdModel> {
        self.fitted.as_ref().map(|f| &f.model)
    }

    fn model_error(&self, source: ModelError) -> ClassifyError {
        ClassifyError::Model {
            classifier: self.name.clone(),
            source,
        }
    }
}

impl Default for OnlineLinearClassifier {
    fn default() -> Self {
        Self::new(SgdConfig::default())
    }
}

impl Classifier for OnlineLinearClassifier {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_trainable(&self) -> bool {
        true
    }

    fn is_trained(&self) -> bool {
        self.fitted.is_some()
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
        self.fitted = None;
        self.settings = None;
        if dataset.is_empty() {
            return Err(ClassifyError::EmptyDataset {
                classifier: self.name.clone(),
            });
        }
        let indices = resolve_indices(dataset, indices)?;
        let raw = dataset.select_columns(&indices)?;
        let scaler = StandardScaler::fit(&raw).map_err(|e| self.model_error(e))?;
        let scaled = scaler.transform(&raw).map_err(|e| self.model_error(e))?;
        let model = self
            .config
            .fit(&scaled, dataset.actual_labels())
            .map_err(|e| self.model_error(e))?;

        debug!(n_iter = model.n_iter(), "online linear classifier trained");
        self.fitted = Some(Fitted { scaler, model });
        self.settings = Some(ClassifierSettings {
            indices,
            model: ModelSettings::OnlineLinear(self.config.clone()),
        });
        Ok(())
    }

    fn categorize(&self, dataset: &EvaluationDataset) -> Result<Vec<bool>, ClassifyError> {
        let (Some(fitted), Some(settings)) = (&self.fitted, &self.settings) else {
            return Err(ClassifyError::NotTrained {
                classifier: self.name.clone(),
            });
        };
        if dataset.is_empty() {
            return Ok(Vec::new());
        }
        let raw = dataset.select_columns(&settings.indices)?;
        let scaled = fitted
            .scaler
            .transform(&raw)
            .map_err(|e| self.model_error(e))?;
        fitted
            .model
            .predict_batch(&scaled)
            .map_err(|e| self.model_error(e))
    }

    fn last_evaluation(&self) -> Option<&Evaluation> {
        self.last_evaluation.as_ref()
    }

    fn store_evaluation(&mut self, evaluation: Evaluation) {
        self.last_evaluation = Some(evaluation);
    }
}
