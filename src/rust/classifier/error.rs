use std::fmt;

/// Represents the different types of errors that can occur while fitting or applying a classifier.
#[derive(Debug, Clone, PartialEq)]
pub enum ClassifierError {
    /// Fewer than two distinct labels were supplied for training
    InsufficientClasses(usize),
    /// Feature vector length differs from the one the model was fitted on
    DimensionMismatch { expected: usize, actual: usize },
    /// Error occurred while fitting the model
    TrainingError(String),
    /// Error occurred while making predictions
    PredictionError(String),
    /// Error occurred due to invalid input parameters
    ValidationError(String),
}

impl fmt::Display for ClassifierError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InsufficientClasses(found) => write!(
                f,
                "Training requires at least 2 distinct labels, found {}",
                found
            ),
            Self::DimensionMismatch { expected, actual } => write!(
                f,
                "Embedding dimension mismatch: model expects {}, got {}",
                expected, actual
            ),
            Self::TrainingError(msg) => write!(f, "Training error: {}", msg),
            Self::PredictionError(msg) => write!(f, "Prediction error: {}", msg),
            Self::ValidationError(msg) => write!(f, "Validation error: {}", msg),
        }
    }
}

impl std::error::Error for ClassifierError {}
