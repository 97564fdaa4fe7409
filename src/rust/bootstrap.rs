//! Process start-up: validate configuration, restore the saved model, serve.

use std::io;
use std::sync::Arc;

use log::{error, info, warn};

use crate::api::create_router;
use crate::classifier::LogisticRegression;
use crate::config::ServiceConfig;
use crate::embedding::{EmbeddingError, EmbeddingProvider, OciEmbeddingClient};
use crate::model_store::ModelStore;
use crate::service::ClassificationService;

#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    #[error("OCI_COMPARTMENT_ID is not set; export it or pass --compartment-id")]
    MissingCompartment,
    #[error("Failed to build embedding client: {0}")]
    Embedding(#[from] EmbeddingError),
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },
    #[error("Server error: {0}")]
    Serve(#[source] io::Error),
}

/// Builds the service against the OCI embedding API described by `config`.
pub fn initialize(config: &ServiceConfig) -> Result<Arc<ClassificationService>, BootstrapError> {
    let compartment_id = config
        .compartment_id()
        .ok_or(BootstrapError::MissingCompartment)?;
    let client = OciEmbeddingClient::new(config.embedding_config(compartment_id))?;
    Ok(build(config, compartment_id, Arc::new(client)))
}

/// Same as [`initialize`] with a caller-supplied embedding provider.
///
/// The compartment id is still required.
pub fn initialize_with(
    config: &ServiceConfig,
    embedder: Arc<dyn EmbeddingProvider>,
) -> Result<Arc<ClassificationService>, BootstrapError> {
    let compartment_id = config
        .compartment_id()
        .ok_or(BootstrapError::MissingCompartment)?;
    Ok(build(config, compartment_id, embedder))
}

fn build(
    config: &ServiceConfig,
    compartment_id: &str,
    embedder: Arc<dyn EmbeddingProvider>,
) -> Arc<ClassificationService> {
    let store = ModelStore::new(&config.model_path);
    let initial = match store.load::<LogisticRegression>() {
        Ok(Some(model)) => {
            info!(
                "Loaded trained model from {:?} ({} labels, {} samples)",
                store.path(),
                model.classes().len(),
                model.training_samples
            );
            Some(model)
        }
        Ok(None) => {
            info!("No trained model found, call POST /train before classifying");
            None
        }
        Err(e) => {
            warn!("Ignoring unreadable model at {:?}: {}", store.path(), e);
            None
        }
    };

    info!("Text classification service starting...");
    info!("Compartment ID: {}...", compartment_id.chars().take(10).collect::<String>());
    info!("Embedding model: {}", embedder.model_id());
    info!("Training data: {:?}", config.training_data);

    Arc::new(ClassificationService::new(
        embedder,
        store,
        config.training_data.clone(),
        config.classifier_params(),
        initial,
    ))
}

/// Initializes the service and serves HTTP until Ctrl-C or SIGTERM.
pub async fn run(config: ServiceConfig) -> Result<(), BootstrapError> {
    let service = initialize(&config)?;
    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|source| BootstrapError::Bind {
            addr: addr.clone(),
            source,
        })?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, create_router(service))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| {
            error!("Server stopped with error: {}", e);
            BootstrapError::Serve(e)
        })?;
    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl-C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
