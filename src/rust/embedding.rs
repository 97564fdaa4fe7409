//! Remote text embeddings.
//!
//! [`EmbeddingProvider`] is the narrow contract the rest of the crate depends on:
//! a batch of strings in, one vector per string out, same order.
//! [`OciEmbeddingClient`] implements it on top of the OCI Generative AI
//! `embedText` action.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, error};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

pub const DEFAULT_ENDPOINT: &str = "https://inference.generativeai.us-chicago-1.oci.oraclecloud.com";
pub const DEFAULT_MODEL_ID: &str = "cohere.embed-v4.0";
const EMBED_TEXT_PATH: &str = "/20231130/actions/embedText";

#[derive(Debug, thiserror::Error)]
pub enum EmbeddingError {
    #[error("Embedding request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Embedding service returned {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("Embedding service returned {actual} vectors for {expected} inputs")]
    CountMismatch { expected: usize, actual: usize },
    #[error("Malformed embedding response: {0}")]
    Malformed(String),
}

/// Maps text to fixed-length vectors.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Identifier of the model producing the vectors.
    fn model_id(&self) -> &str;

    /// Embeds `texts`, returning exactly one vector per input, in input order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;
}

/// What the remote service does with inputs longer than the model's context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Truncate {
    None,
    Start,
    #[default]
    End,
}

impl fmt::Display for Truncate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Truncate::None => "NONE",
            Truncate::Start => "START",
            Truncate::End => "END",
        };
        f.write_str(name)
    }
}

impl FromStr for Truncate {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "NONE" => Ok(Truncate::None),
            "START" => Ok(Truncate::Start),
            "END" => Ok(Truncate::End),
            other => Err(format!("unknown truncate mode '{}', expected NONE, START or END", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OciEmbeddingConfig {
    pub endpoint: String,
    pub compartment_id: String,
    pub model_id: String,
    pub truncate: Truncate,
    /// Sent verbatim as the `Authorization` header when present
    pub auth_token: Option<String>,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl OciEmbeddingConfig {
    pub fn new(compartment_id: impl Into<String>) -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            compartment_id: compartment_id.into(),
            model_id: DEFAULT_MODEL_ID.to_string(),
            truncate: Truncate::End,
            auth_token: None,
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(240),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_model_id(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = model_id.into();
        self
    }

    pub fn with_timeouts(mut self, connect: Duration, request: Duration) -> Self {
        self.connect_timeout = connect;
        self.request_timeout = request;
        self
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbedTextDetails<'a> {
    compartment_id: &'a str,
    inputs: &'a [String],
    serving_mode: ServingMode<'a>,
    truncate: Truncate,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ServingMode<'a> {
    serving_type: &'static str,
    model_id: &'a str,
}

#[derive(Deserialize)]
struct EmbedTextResult {
    embeddings: Vec<Vec<f32>>,
}

/// Client for the OCI Generative AI inference `embedText` action.
///
/// Performs exactly one HTTP request per `embed` call. Failures are returned
/// to the caller as-is; nothing is retried.
#[derive(Debug, Clone)]
pub struct OciEmbeddingClient {
    client: reqwest::Client,
    url: String,
    config: OciEmbeddingConfig,
}

impl OciEmbeddingClient {
    pub fn new(config: OciEmbeddingConfig) -> Result<Self, EmbeddingError> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()?;
        let url = format!("{}{}", config.endpoint.trim_end_matches('/'), EMBED_TEXT_PATH);
        Ok(Self { client, url, config })
    }

    fn request_body<'a>(&'a self, texts: &'a [String]) -> EmbedTextDetails<'a> {
        EmbedTextDetails {
            compartment_id: &self.config.compartment_id,
            inputs: texts,
            serving_mode: ServingMode {
                serving_type: "ON_DEMAND",
                model_id: &self.config.model_id,
            },
            truncate: self.config.truncate,
        }
    }
}

#[async_trait]
impl EmbeddingProvider for OciEmbeddingClient {
    fn model_id(&self) -> &str {
        &self.config.model_id
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Requesting {} embeddings from {}", texts.len(), self.url);
        let mut request = self
            .client
            .post(&self.url)
            .header("Accept", "application/json")
            .json(&self.request_body(texts));
        if let Some(token) = &self.config.auth_token {
            request = request.header("Authorization", token);
        }

        let response = request.send().await.map_err(|e| {
            error!("Embedding request to {} failed: {}", self.url, e);
            EmbeddingError::Transport(e)
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Embedding service returned {}: {}", status, body);
            return Err(EmbeddingError::Status { status, body });
        }

        let bytes = response.bytes().await?;
        let result: EmbedTextResult = serde_json::from_slice(&bytes)
            .map_err(|e| EmbeddingError::Malformed(e.to_string()))?;

        if result.embeddings.len() != texts.len() {
            error!(
                "Embedding count mismatch: sent {} inputs, got {} vectors",
                texts.len(),
                result.embeddings.len()
            );
            return Err(EmbeddingError::CountMismatch {
                expected: texts.len(),
                actual: result.embeddings.len(),
            });
        }
        debug!("Received {} embeddings", result.embeddings.len());
        Ok(result.embeddings)
    }
}
