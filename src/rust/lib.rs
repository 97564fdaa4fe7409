//! A small text classification service.
//!
//! Text is turned into vectors by a remote embedding model and classified by a
//! logistic regression head trained on labeled examples from a JSON Lines file.
//! The trained head is persisted to disk and restored at start-up.
//!
//! # Basic Usage
//!
//! ```rust,no_run
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! use std::sync::Arc;
//! use triage::{ClassificationService, ModelStore, OciEmbeddingClient, OciEmbeddingConfig};
//!
//! let embedder = OciEmbeddingClient::new(OciEmbeddingConfig::new("ocid1.compartment.oc1..example"))?;
//! let service: ClassificationService = ClassificationService::new(
//!     Arc::new(embedder),
//!     ModelStore::new("text_classifier.model"),
//!     "training_data.jsonl",
//!     Default::default(),
//!     None,
//! );
//!
//! let summary = service.train().await?;
//! println!("Trained on {} samples: {:?}", summary.training_samples, summary.labels);
//!
//! let result = service.classify("I was charged twice").await?;
//! println!("{} {:?}", result.prediction, result.probabilities);
//! # Ok(())
//! # }
//! ```
//!
//! # Thread Safety
//!
//! [`ClassificationService`] is `Send + Sync` and is shared behind an `Arc`.
//! Classification only clones the active model's `Arc` under a read lock, and
//! a successful training run swaps in the new model with a single write.

pub mod api;
pub mod bootstrap;
pub mod classifier;
pub mod config;
pub mod data;
pub mod embedding;
pub mod error;
pub mod model_store;
pub mod service;

pub use api::{create_router, ClassifyRequest};
pub use bootstrap::BootstrapError;
pub use classifier::{
    ClassifierError, LinearClassifier, LogisticRegression, LogisticRegressionParams, Prediction,
    TrainError, TrainedModel, Trainer,
};
pub use config::ServiceConfig;
pub use data::{load_training_data, DataError, TrainingExample, TrainingSet};
pub use embedding::{EmbeddingError, EmbeddingProvider, OciEmbeddingClient, OciEmbeddingConfig, Truncate};
pub use error::ServiceError;
pub use model_store::{ModelStore, StoreError};
pub use service::{Classification, ClassificationService, Health, ServiceState, TrainSummary};

/// Initializes `env_logger`, defaulting to `info` when `RUST_LOG` is unset.
pub fn init_logger() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}
