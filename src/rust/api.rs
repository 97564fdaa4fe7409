//! HTTP surface: `POST /train`, `POST /classify`, `GET /health`.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use log::{error, warn};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::trace::TraceLayer;

use crate::classifier::LinearClassifier;
use crate::error::ServiceError;
use crate::service::{Classification, ClassificationService, Health, TrainSummary};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClassifyRequest {
    #[serde(default)]
    pub text: Option<String>,
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        } else {
            warn!("Rejected request: {}", self);
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

pub fn create_router<M: LinearClassifier>(service: Arc<ClassificationService<M>>) -> Router {
    Router::new()
        .route("/health", get(health_handler::<M>))
        .route("/train", post(train_handler::<M>))
        .route("/classify", post(classify_handler::<M>))
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}

async fn health_handler<M: LinearClassifier>(
    State(service): State<Arc<ClassificationService<M>>>,
) -> Json<Health> {
    Json(service.health().await)
}

async fn train_handler<M: LinearClassifier>(
    State(service): State<Arc<ClassificationService<M>>>,
) -> Result<Json<TrainSummary>, ServiceError> {
    service.train().await.map(Json)
}

async fn classify_handler<M: LinearClassifier>(
    State(service): State<Arc<ClassificationService<M>>>,
    payload: Result<Json<ClassifyRequest>, JsonRejection>,
) -> Result<Json<Classification>, ServiceError> {
    // Not-trained is reported before any body validation
    if !service.is_trained().await {
        return Err(ServiceError::NotTrained);
    }

    let Json(request) =
        payload.map_err(|e| ServiceError::Validation(format!("Invalid request body: {}", e.body_text())))?;
    let text = request
        .text
        .ok_or_else(|| ServiceError::Validation("Request body is missing the 'text' field".to_string()))?;

    service.classify(&text).await.map(Json)
}
