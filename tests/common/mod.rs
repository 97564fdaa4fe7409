#![allow(dead_code)]

use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tempfile::TempDir;
use triage::{
    ClassificationService, EmbeddingError, EmbeddingProvider, LogisticRegressionParams, ModelStore,
};

pub const DIM: usize = 16;

/// Deterministic bag-of-words embedder: each word is hashed into one of `DIM` buckets.
#[derive(Default)]
pub struct KeywordEmbedder {
    calls: AtomicUsize,
    fail: AtomicBool,
}

impl KeywordEmbedder {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn vector(text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; DIM];
        for word in text.split_whitespace() {
            let word = word.to_lowercase();
            let hash = word
                .bytes()
                .fold(2166136261u32, |h, b| (h ^ b as u32).wrapping_mul(16777619));
            v[hash as usize % DIM] += 1.0;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            v.iter_mut().for_each(|x| *x /= norm);
        }
        v
    }
}

#[async_trait]
impl EmbeddingProvider for KeywordEmbedder {
    fn model_id(&self) -> &str {
        "keyword-test"
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(EmbeddingError::Malformed("simulated upstream outage".into()));
        }
        Ok(texts.iter().map(|t| Self::vector(t)).collect())
    }
}

pub struct Fixture {
    pub dir: TempDir,
    pub embedder: Arc<KeywordEmbedder>,
    pub service: Arc<ClassificationService>,
}

impl Fixture {
    pub fn data_path(&self) -> std::path::PathBuf {
        self.dir.path().join("training_data.jsonl")
    }

    pub fn model_path(&self) -> std::path::PathBuf {
        self.dir.path().join("model").join("text_classifier.model")
    }

    pub fn write_data(&self, records: &[(&str, &str)]) {
        write_training_data(&self.data_path(), records);
    }
}

pub fn fixture() -> Fixture {
    let dir = tempfile::tempdir().expect("tempdir");
    let embedder = Arc::new(KeywordEmbedder::default());
    let service: Arc<ClassificationService> = Arc::new(ClassificationService::new(
        embedder.clone(),
        ModelStore::new(dir.path().join("model").join("text_classifier.model")),
        dir.path().join("training_data.jsonl"),
        LogisticRegressionParams::default(),
        None,
    ));
    Fixture {
        dir,
        embedder,
        service,
    }
}

pub fn write_training_data(path: &Path, records: &[(&str, &str)]) {
    let lines: Vec<String> = records
        .iter()
        .map(|(text, label)| serde_json::json!({ "text": text, "label": label }).to_string())
        .collect();
    fs::write(path, lines.join("\n") + "\n").expect("write training data");
}

pub fn support_tickets() -> Vec<(&'static str, &'static str)> {
    vec![
        ("refund my order", "billing"),
        ("app crashes on launch", "bug"),
    ]
}

pub fn larger_dataset() -> Vec<(&'static str, &'static str)> {
    vec![
        ("refund my order", "billing"),
        ("I was billed the wrong amount", "billing"),
        ("please cancel my subscription payment", "billing"),
        ("app crashes on launch", "bug"),
        ("the screen freezes when I tap save", "bug"),
        ("error message after the update", "bug"),
        ("how do I change my profile picture", "question"),
        ("where can I find the settings page", "question"),
    ]
}
