use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tokio::task::{spawn_blocking, JoinError};

use crate::classifier::utils::round_to;
use crate::classifier::{LinearClassifier, LogisticRegression, TrainedModel, Trainer};
use crate::data::load_training_data;
use crate::embedding::{EmbeddingError, EmbeddingProvider};
use crate::error::ServiceError;
use crate::model_store::ModelStore;

const PROBABILITY_DECIMALS: i32 = 3;

/// Response body of a successful train call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainSummary {
    pub message: String,
    pub training_samples: usize,
    /// Distinct labels, sorted
    pub labels: Vec<String>,
}

/// Response body of a successful classify call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub text: String,
    pub prediction: String,
    /// Label to probability, rounded to 3 decimals, one entry per trained label
    pub probabilities: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Health {
    pub status: String,
    pub model_trained: bool,
    pub model_path_exists: bool,
}

/// The active model, if any.
///
/// "Trained" is derived from the presence of the model, so the flag and the
/// model are always replaced together under one write lock.
pub struct ServiceState<M = LogisticRegression> {
    model: RwLock<Option<Arc<TrainedModel<M>>>>,
}

impl<M> ServiceState<M> {
    pub fn new(model: Option<TrainedModel<M>>) -> Self {
        Self {
            model: RwLock::new(model.map(Arc::new)),
        }
    }

    pub async fn current(&self) -> Option<Arc<TrainedModel<M>>> {
        self.model.read().await.clone()
    }

    pub async fn is_trained(&self) -> bool {
        self.model.read().await.is_some()
    }

    async fn replace(&self, model: TrainedModel<M>) {
        *self.model.write().await = Some(Arc::new(model));
    }
}

/// Train, classify and health operations over one shared model.
pub struct ClassificationService<M: LinearClassifier = LogisticRegression> {
    embedder: Arc<dyn EmbeddingProvider>,
    trainer: Trainer<M>,
    store: ModelStore,
    training_data: PathBuf,
    state: ServiceState<M>,
    train_lock: Mutex<()>,
}

impl<M: LinearClassifier> ClassificationService<M> {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        store: ModelStore,
        training_data: impl Into<PathBuf>,
        params: M::Params,
        initial: Option<TrainedModel<M>>,
    ) -> Self {
        if let Some(model) = &initial {
            if model.embedding_model != embedder.model_id() {
                warn!(
                    "Loaded model was trained on '{}' embeddings but the service uses '{}'",
                    model.embedding_model,
                    embedder.model_id()
                );
            }
        }
        Self {
            trainer: Trainer::new(Arc::clone(&embedder), params),
            embedder,
            store,
            training_data: training_data.into(),
            state: ServiceState::new(initial),
            train_lock: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &ModelStore {
        &self.store
    }

    pub fn training_data_path(&self) -> &Path {
        &self.training_data
    }

    pub async fn is_trained(&self) -> bool {
        self.state.is_trained().await
    }

    pub async fn current_model(&self) -> Option<Arc<TrainedModel<M>>> {
        self.state.current().await
    }

    /// Retrains from the training data file and makes the result active.
    ///
    /// The new model is saved before it replaces the active one; on any error
    /// the previous model stays in place, both in memory and on disk.
    pub async fn train(&self) -> Result<TrainSummary, ServiceError> {
        let _guard = self.train_lock.lock().await;

        let path = self.training_data.clone();
        let set = spawn_blocking(move || load_training_data(path))
            .await
            .map_err(task_failed)??;
        info!("Training model on {} examples...", set.len());
        let model = self.trainer.train(&set).await?;

        let store = self.store.clone();
        let model = spawn_blocking(move || store.save(&model).map(|()| model))
            .await
            .map_err(task_failed)??;

        let labels = model.classes().to_vec();
        self.state.replace(model).await;
        info!("Model trained successfully with labels {:?}", labels);

        Ok(TrainSummary {
            message: "Model trained successfully".to_string(),
            training_samples: set.len(),
            labels,
        })
    }

    pub async fn classify(&self, text: &str) -> Result<Classification, ServiceError> {
        let model = self.state.current().await.ok_or(ServiceError::NotTrained)?;
        if text.is_empty() {
            return Err(ServiceError::Validation(
                "Field 'text' must be a non-empty string".to_string(),
            ));
        }

        let mut vectors = self.embedder.embed(&[text.to_string()]).await?;
        if vectors.len() != 1 {
            return Err(EmbeddingError::CountMismatch {
                expected: 1,
                actual: vectors.len(),
            }
            .into());
        }
        let embedding = vectors.remove(0);

        let prediction = model.predict(&embedding).map_err(ServiceError::Prediction)?;
        debug!("Classified text as '{}'", prediction.label);

        Ok(Classification {
            text: text.to_string(),
            prediction: prediction.label,
            probabilities: prediction
                .probabilities
                .into_iter()
                .map(|(label, p)| (label, round_to(p, PROBABILITY_DECIMALS)))
                .collect(),
        })
    }

    pub async fn health(&self) -> Health {
        Health {
            status: "healthy".to_string(),
            model_trained: self.state.is_trained().await,
            model_path_exists: self.store.exists(),
        }
    }
}

fn task_failed(e: JoinError) -> ServiceError {
    error!("Blocking file task failed: {}", e);
    ServiceError::Internal(format!("background task failed: {}", e))
}
