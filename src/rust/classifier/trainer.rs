use std::sync::Arc;

use log::{error, info};
use ndarray::Array2;

use super::error::ClassifierError;
use super::logistic::LogisticRegression;
use super::model::{LinearClassifier, TrainedModel};
use crate::data::TrainingSet;
use crate::embedding::{EmbeddingError, EmbeddingProvider};

#[derive(Debug, thiserror::Error)]
pub enum TrainError {
    #[error(transparent)]
    Upstream(#[from] EmbeddingError),
    #[error(transparent)]
    Classifier(#[from] ClassifierError),
}

/// Fits classifiers from labeled text by embedding the whole batch and handing
/// the vectors to `M::fit`.
///
/// The trainer only returns the new model; persisting it and making it active
/// is up to the caller.
pub struct Trainer<M: LinearClassifier = LogisticRegression> {
    embedder: Arc<dyn EmbeddingProvider>,
    params: M::Params,
}

impl<M: LinearClassifier> Trainer<M> {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, params: M::Params) -> Self {
        Self { embedder, params }
    }

    pub async fn train(&self, set: &TrainingSet) -> Result<TrainedModel<M>, TrainError> {
        if set.is_empty() {
            return Err(ClassifierError::ValidationError("Training set is empty".into()).into());
        }
        let distinct = set.distinct_labels();
        if distinct.len() < 2 {
            return Err(ClassifierError::InsufficientClasses(distinct.len()).into());
        }

        info!(
            "Embedding {} training texts with {}",
            set.len(),
            self.embedder.model_id()
        );
        let vectors = self.embedder.embed(set.texts()).await?;
        let features = to_matrix(vectors, set.len())?;

        info!(
            "Fitting classifier on {} samples x {} dimensions, {} labels",
            features.nrows(),
            features.ncols(),
            distinct.len()
        );
        let params = self.params.clone();
        let labels = set.labels().to_vec();
        let classifier = tokio::task::spawn_blocking(move || M::fit(&params, features.view(), &labels))
            .await
            .map_err(|e| {
                error!("Training task failed: {}", e);
                ClassifierError::TrainingError(format!("training task failed: {}", e))
            })??;

        Ok(TrainedModel {
            embedding_model: self.embedder.model_id().to_string(),
            training_samples: set.len(),
            classifier,
        })
    }
}

fn to_matrix(vectors: Vec<Vec<f32>>, expected: usize) -> Result<Array2<f32>, EmbeddingError> {
    if vectors.len() != expected {
        return Err(EmbeddingError::CountMismatch {
            expected,
            actual: vectors.len(),
        });
    }
    let dim = vectors.first().map(Vec::len).unwrap_or(0);
    if dim == 0 {
        return Err(EmbeddingError::Malformed("embedding vectors are empty".into()));
    }
    if let Some(bad) = vectors.iter().find(|v| v.len() != dim) {
        return Err(EmbeddingError::Malformed(format!(
            "inconsistent embedding dimensions: {} and {}",
            dim,
            bad.len()
        )));
    }

    let flat: Vec<f32> = vectors.into_iter().flatten().collect();
    Array2::from_shape_vec((expected, dim), flat)
        .map_err(|e| EmbeddingError::Malformed(format!("failed to build feature matrix: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_matrix_shape() {
        let matrix = to_matrix(vec![vec![1.0, 2.0], vec![3.0, 4.0]], 2).unwrap();
        assert_eq!(matrix.dim(), (2, 2));
        assert_eq!(matrix[[1, 0]], 3.0);
    }

    #[test]
    fn test_to_matrix_count_mismatch() {
        let err = to_matrix(vec![vec![1.0]], 2).unwrap_err();
        assert!(matches!(err, EmbeddingError::CountMismatch { expected: 2, actual: 1 }));
    }

    #[test]
    fn test_to_matrix_ragged() {
        let err = to_matrix(vec![vec![1.0, 2.0], vec![3.0]], 2).unwrap_err();
        assert!(matches!(err, EmbeddingError::Malformed(_)));
    }
}
