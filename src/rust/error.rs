use axum::http::StatusCode;

use crate::classifier::{ClassifierError, TrainError};
use crate::data::DataError;
use crate::embedding::EmbeddingError;
use crate::model_store::StoreError;

/// Everything a service operation can fail with, mapped onto HTTP statuses by
/// [`ServiceError::status_code`].
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Data(#[from] DataError),
    #[error("Embedding service error: {0}")]
    Upstream(#[from] EmbeddingError),
    #[error("Training failed: {0}")]
    Training(ClassifierError),
    #[error("Prediction failed: {0}")]
    Prediction(ClassifierError),
    #[error("Model storage error: {0}")]
    Store(#[from] StoreError),
    #[error("Model has not been trained yet, call POST /train first")]
    NotTrained,
    #[error("{0}")]
    Validation(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<TrainError> for ServiceError {
    fn from(err: TrainError) -> Self {
        match err {
            TrainError::Upstream(e) => ServiceError::Upstream(e),
            TrainError::Classifier(e) => ServiceError::Training(e),
        }
    }
}

impl ServiceError {
    /// 400 for problems the caller can fix, 500 for upstream and internal failures.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::Data(_) | ServiceError::NotTrained | ServiceError::Validation(_) => {
                StatusCode::BAD_REQUEST
            }
            ServiceError::Upstream(_)
            | ServiceError::Training(_)
            | ServiceError::Prediction(_)
            | ServiceError::Store(_)
            | ServiceError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(ServiceError::from(DataError::Empty).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ServiceError::NotTrained.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ServiceError::Validation("missing text".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServiceError::from(TrainError::Classifier(ClassifierError::InsufficientClasses(1)))
                .status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ServiceError::from(EmbeddingError::Malformed("bad".into())).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ServiceError::from(StoreError::Corrupt("bad".into())).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ServiceError::Internal("task panicked".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_upstream_from_training_keeps_kind() {
        let err = ServiceError::from(TrainError::Upstream(EmbeddingError::CountMismatch {
            expected: 2,
            actual: 1,
        }));
        assert!(matches!(err, ServiceError::Upstream(_)));
    }
}
