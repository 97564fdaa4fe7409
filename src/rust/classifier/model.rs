use std::collections::BTreeMap;

use ndarray::{Array1, ArrayView2};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::error::ClassifierError;
use super::logistic::LogisticRegression;
use super::utils::argmax;

/// A supervised linear model mapping embedding vectors to one of a fixed set of labels.
///
/// Implementations own their label vocabulary. `classes()` must return it in the
/// order used by `predict_proba`, and that order must be stable across
/// serialization so a reloaded model reports the same classes.
pub trait LinearClassifier: Sized + Send + Sync + Serialize + DeserializeOwned + 'static {
    /// Hyperparameters consumed by `fit`.
    type Params: Clone + Default + Send + Sync + 'static;

    /// Fits a new model on `features` (one row per sample) and parallel `labels`.
    fn fit(
        params: &Self::Params,
        features: ArrayView2<'_, f32>,
        labels: &[String],
    ) -> Result<Self, ClassifierError>;

    /// The label vocabulary, in probability order.
    fn classes(&self) -> &[String];

    /// Input dimension the model was fitted on.
    fn n_features(&self) -> usize;

    /// Probability for each entry of `classes()`.
    fn predict_proba(&self, features: &[f32]) -> Result<Array1<f64>, ClassifierError>;

    fn predict(&self, features: &[f32]) -> Result<String, ClassifierError> {
        let probabilities = self.predict_proba(features)?;
        argmax(&probabilities)
            .and_then(|i| self.classes().get(i).cloned())
            .ok_or_else(|| ClassifierError::PredictionError("Model has no classes".into()))
    }
}

/// A fitted classifier together with what is needed to serve it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainedModel<M = LogisticRegression> {
    /// Identifier of the embedding model that produced the training vectors
    pub embedding_model: String,
    /// Number of examples the classifier was fitted on
    pub training_samples: usize,
    pub classifier: M,
}

/// The outcome of classifying one embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub label: String,
    pub probabilities: BTreeMap<String, f64>,
}

impl<M: LinearClassifier> TrainedModel<M> {
    pub fn classes(&self) -> &[String] {
        self.classifier.classes()
    }

    pub fn dimension(&self) -> usize {
        self.classifier.n_features()
    }

    /// Predicts the label for an embedding and returns the full probability distribution.
    pub fn predict(&self, embedding: &[f32]) -> Result<Prediction, ClassifierError> {
        let probabilities = self.classifier.predict_proba(embedding)?;
        let index = argmax(&probabilities)
            .ok_or_else(|| ClassifierError::PredictionError("Model has no classes".into()))?;
        let classes = self.classifier.classes();
        let label = classes
            .get(index)
            .cloned()
            .ok_or_else(|| ClassifierError::PredictionError("Class index out of range".into()))?;

        Ok(Prediction {
            label,
            probabilities: classes.iter().cloned().zip(probabilities.iter().cloned()).collect(),
        })
    }
}
