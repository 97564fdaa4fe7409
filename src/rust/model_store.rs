use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use log;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::classifier::{LinearClassifier, TrainedModel};

const ARTIFACT_FORMAT: &str = "triage-model";
const ARTIFACT_VERSION: u32 = 1;

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
    #[error("Model artifact is corrupt: {0}")]
    Corrupt(String),
    #[error("Hash mismatch: expected {expected}, got {actual}")]
    HashMismatch { expected: String, actual: String },
    #[error("Failed to serialize model: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl StoreError {
    /// True when the artifact exists but cannot be turned back into a model.
    pub fn is_corrupt(&self) -> bool {
        matches!(self, StoreError::Corrupt(_) | StoreError::HashMismatch { .. })
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct ArtifactHeader {
    format: String,
    version: u32,
    sha256: String,
}

/// Persists the trained classifier at a single fixed path.
///
/// The artifact is a one-line JSON header carrying the SHA-256 of the payload,
/// followed by the JSON-encoded [`TrainedModel`]. Saves go through a sibling
/// temp file and a rename, so a reader sees either the old artifact or the new
/// one.
#[derive(Debug, Clone)]
pub struct ModelStore {
    path: PathBuf,
}

impl ModelStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Reads the artifact back; `Ok(None)` when nothing has been saved yet.
    pub fn load<M: LinearClassifier>(&self) -> Result<Option<TrainedModel<M>>, StoreError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::info!("No model artifact at {:?}", self.path);
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };
        log::info!("Read {} bytes from {:?}", bytes.len(), self.path);

        let split = bytes
            .iter()
            .position(|&b| b == b'\n')
            .ok_or_else(|| StoreError::Corrupt("missing artifact header".into()))?;
        let (header_bytes, payload) = (&bytes[..split], &bytes[split + 1..]);

        let header: ArtifactHeader = serde_json::from_slice(header_bytes)
            .map_err(|e| StoreError::Corrupt(format!("unreadable header: {}", e)))?;
        if header.format != ARTIFACT_FORMAT {
            return Err(StoreError::Corrupt(format!("unexpected format '{}'", header.format)));
        }
        if header.version != ARTIFACT_VERSION {
            return Err(StoreError::Corrupt(format!(
                "unsupported artifact version {}",
                header.version
            )));
        }

        let actual = hash_bytes(payload);
        if actual != header.sha256 {
            log::error!("Model hash mismatch: expected {}, got {}", header.sha256, actual);
            return Err(StoreError::HashMismatch {
                expected: header.sha256,
                actual,
            });
        }

        let model = serde_json::from_slice(payload)
            .map_err(|e| StoreError::Corrupt(format!("unreadable payload: {}", e)))?;
        Ok(Some(model))
    }

    /// Writes `model`, replacing whatever artifact was there before.
    pub fn save<M: LinearClassifier>(&self, model: &TrainedModel<M>) -> Result<(), StoreError> {
        let payload = serde_json::to_vec(model)?;
        let header = serde_json::to_vec(&ArtifactHeader {
            format: ARTIFACT_FORMAT.to_string(),
            version: ARTIFACT_VERSION,
            sha256: hash_bytes(&payload),
        })?;

        let parent = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&parent)?;

        let tmp_path = self.temp_path(&parent);
        log::info!("Writing {} byte model artifact to {:?}", payload.len(), tmp_path);
        let written = write_synced(&tmp_path, &header, &payload)
            .and_then(|()| fs::rename(&tmp_path, &self.path));
        if let Err(e) = written {
            log::error!("Failed to save model artifact to {:?}: {}", self.path, e);
            let _ = fs::remove_file(&tmp_path);
            return Err(e.into());
        }

        // Best-effort fsync of the directory so the rename survives a crash
        if let Ok(dir) = fs::File::open(&parent) {
            let _ = dir.sync_all();
        }
        log::info!("Model artifact saved to {:?}", self.path);
        Ok(())
    }

    fn temp_path(&self, parent: &Path) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "model".to_string());
        let unique = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
        parent.join(format!(".{}.{}.{}.tmp", name, std::process::id(), unique))
    }
}

fn write_synced(path: &Path, header: &[u8], payload: &[u8]) -> io::Result<()> {
    let mut file = fs::File::create(path)?;
    file.write_all(header)?;
    file.write_all(b"\n")?;
    file.write_all(payload)?;
    file.sync_all()
}

fn hash_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}
