mod common;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use common::{fixture, support_tickets, Fixture};
use serde_json::Value;
use tower::ServiceExt; // for `oneshot`
use triage::create_router;

fn app(fx: &Fixture) -> Router {
    create_router(fx.service.clone())
}

async fn send(app: Router, method: Method, uri: &str, body: Option<&str>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    let response = app.oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

#[tokio::test]
async fn test_health_on_fresh_service() {
    let fx = fixture();
    let (status, body) = send(app(&fx), Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        serde_json::json!({"status": "healthy", "model_trained": false, "model_path_exists": false})
    );
}

#[tokio::test]
async fn test_classify_before_training() {
    let fx = fixture();
    let (status, body) =
        send(app(&fx), Method::POST, "/classify", Some(r#"{"text":"I was charged twice"}"#)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("/train"));
    assert_eq!(fx.embedder.calls(), 0);
}

#[tokio::test]
async fn test_train_and_classify_scenario() {
    let fx = fixture();
    fx.write_data(&support_tickets());

    let (status, body) = send(app(&fx), Method::POST, "/train", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["training_samples"], 2);
    let mut labels: Vec<&str> = body["labels"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap())
        .collect();
    labels.sort();
    assert_eq!(labels, vec!["billing", "bug"]);
    assert!(body["message"].is_string());

    let (status, body) =
        send(app(&fx), Method::POST, "/classify", Some(r#"{"text":"I was charged twice"}"#)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["text"], "I was charged twice");
    let prediction = body["prediction"].as_str().unwrap();
    assert!(prediction == "billing" || prediction == "bug");

    let probabilities = body["probabilities"].as_object().unwrap();
    assert_eq!(probabilities.len(), 2);
    assert!(probabilities.contains_key("billing") && probabilities.contains_key("bug"));
    let total: f64 = probabilities.values().map(|v| v.as_f64().unwrap()).sum();
    assert!((total - 1.0).abs() <= 0.002);

    let (_, health) = send(app(&fx), Method::GET, "/health", None).await;
    assert_eq!(health["model_trained"], true);
    assert_eq!(health["model_path_exists"], true);
}

#[tokio::test]
async fn test_classify_validation_errors() {
    let fx = fixture();
    fx.write_data(&support_tickets());
    fx.service.train().await.unwrap();

    for body in [r#"{}"#, r#"{"text":""}"#, r#"{"text":null}"#, r#"{"text":42}"#, "not json"] {
        let (status, response) = send(app(&fx), Method::POST, "/classify", Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "body {}", body);
        assert!(response["error"].is_string(), "body {}", body);
    }

    let (status, _) = send(app(&fx), Method::POST, "/classify", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_classify_whitespace_text_is_classified() {
    let fx = fixture();
    fx.write_data(&support_tickets());
    fx.service.train().await.unwrap();

    let (status, body) = send(app(&fx), Method::POST, "/classify", Some(r#"{"text":"   "}"#)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["text"], "   ");
    assert_eq!(body["probabilities"].as_object().unwrap().len(), 2);
}

#[tokio::test]
async fn test_train_without_data_file() {
    let fx = fixture();
    let (status, body) = send(app(&fx), Method::POST, "/train", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("does not exist"));
}

#[tokio::test]
async fn test_train_with_single_label_is_server_error() {
    let fx = fixture();
    fx.write_data(&[("refund my order", "billing"), ("charged twice", "billing")]);
    let (status, body) = send(app(&fx), Method::POST, "/train", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].is_string());

    let (_, health) = send(app(&fx), Method::GET, "/health", None).await;
    assert_eq!(health["model_trained"], false);
}

#[tokio::test]
async fn test_upstream_failure_maps_to_500() {
    let fx = fixture();
    fx.write_data(&support_tickets());
    fx.embedder.set_failing(true);

    let (status, _) = send(app(&fx), Method::POST, "/train", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_unknown_route() {
    let fx = fixture();
    let (status, _) = send(app(&fx), Method::GET, "/metrics", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
