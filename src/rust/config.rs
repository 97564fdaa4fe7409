use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::classifier::LogisticRegressionParams;
use crate::embedding::{OciEmbeddingConfig, Truncate, DEFAULT_ENDPOINT, DEFAULT_MODEL_ID};

/// Runtime configuration. Every option can also be set through its environment variable.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct ServiceConfig {
    /// OCI compartment the embedding calls are authorized and billed against
    #[arg(long, env = "OCI_COMPARTMENT_ID")]
    pub compartment_id: Option<String>,

    /// OCI Generative AI inference endpoint
    #[arg(long, env = "OCI_GENAI_ENDPOINT", default_value = DEFAULT_ENDPOINT)]
    pub endpoint: String,

    /// Embedding model identifier
    #[arg(long, env = "OCI_EMBEDDING_MODEL", default_value = DEFAULT_MODEL_ID)]
    pub embedding_model: String,

    /// Value for the Authorization header of embedding requests
    #[arg(long, env = "OCI_GENAI_AUTH", hide_env_values = true)]
    pub auth_token: Option<String>,

    /// How the embedding service truncates long inputs (NONE, START, END)
    #[arg(long, env = "OCI_EMBED_TRUNCATE", default_value = "END")]
    pub truncate: Truncate,

    /// Where the trained classifier is stored
    #[arg(long, env = "TRIAGE_MODEL_PATH", default_value = "text_classifier.model")]
    pub model_path: PathBuf,

    /// JSON Lines file with {"text", "label"} records used by /train
    #[arg(long, env = "TRIAGE_TRAINING_DATA", default_value = "training_data.jsonl")]
    pub training_data: PathBuf,

    #[arg(long, env = "TRIAGE_HOST", default_value = "0.0.0.0")]
    pub host: String,

    #[arg(short, long, env = "TRIAGE_PORT", default_value_t = 5000)]
    pub port: u16,

    #[arg(long, default_value_t = 10)]
    pub connect_timeout_secs: u64,

    /// Upper bound on a whole embedding request, including reading the response
    #[arg(long, default_value_t = 240)]
    pub request_timeout_secs: u64,

    /// Iteration cap for logistic regression
    #[arg(long, default_value_t = 1000)]
    pub max_iter: usize,
}

impl ServiceConfig {
    /// The compartment id if it is set to something non-blank.
    pub fn compartment_id(&self) -> Option<&str> {
        self.compartment_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn embedding_config(&self, compartment_id: &str) -> OciEmbeddingConfig {
        let mut config = OciEmbeddingConfig::new(compartment_id)
            .with_endpoint(self.endpoint.clone())
            .with_model_id(self.embedding_model.clone())
            .with_timeouts(
                Duration::from_secs(self.connect_timeout_secs),
                Duration::from_secs(self.request_timeout_secs),
            );
        config.truncate = self.truncate;
        config.auth_token = self.auth_token.clone();
        config
    }

    pub fn classifier_params(&self) -> LogisticRegressionParams {
        LogisticRegressionParams::default().with_max_iter(self.max_iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServiceConfig::parse_from(["triage_server", "--compartment-id", "ocid1.compartment.oc1..abc"]);
        assert_eq!(config.compartment_id(), Some("ocid1.compartment.oc1..abc"));
        assert_eq!(config.bind_address(), "0.0.0.0:5000");
        assert_eq!(config.max_iter, 1000);
        assert_eq!(config.truncate, Truncate::End);

        let embedding = config.embedding_config("ocid1.compartment.oc1..abc");
        assert_eq!(embedding.connect_timeout, Duration::from_secs(10));
        assert_eq!(embedding.request_timeout, Duration::from_secs(240));
        assert_eq!(embedding.model_id, DEFAULT_MODEL_ID);
    }

    #[test]
    fn test_blank_compartment_is_absent() {
        let mut config = ServiceConfig::parse_from(["triage_server", "--compartment-id", "   "]);
        assert_eq!(config.compartment_id(), None);
        config.compartment_id = None;
        assert_eq!(config.compartment_id(), None);
    }

    #[test]
    fn test_overrides() {
        let config = ServiceConfig::parse_from([
            "triage_server",
            "--port",
            "8080",
            "--truncate",
            "start",
            "--max-iter",
            "50",
            "--model-path",
            "/var/lib/triage/model",
        ]);
        assert_eq!(config.port, 8080);
        assert_eq!(config.truncate, Truncate::Start);
        assert_eq!(config.classifier_params().max_iter, 50);
        assert_eq!(config.model_path, PathBuf::from("/var/lib/triage/model"));
    }
}
