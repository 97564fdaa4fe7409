//! Linear classification over embedding vectors.
//!
//! [`LinearClassifier`] is the seam for swapping algorithms; [`LogisticRegression`]
//! is the implementation the service uses. [`Trainer`] ties a classifier to an
//! [`EmbeddingProvider`](crate::embedding::EmbeddingProvider).

mod error;
mod logistic;
mod model;
pub mod trainer;
pub(crate) mod utils;

pub use error::ClassifierError;
pub use logistic::{LogisticRegression, LogisticRegressionParams};
pub use model::{LinearClassifier, Prediction, TrainedModel};
pub use trainer::{TrainError, Trainer};
