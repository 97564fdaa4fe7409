//! Loading labeled training examples from JSON Lines files.

use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::info;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum DataError {
    #[error("Training data file {0} does not exist")]
    NotFound(PathBuf),
    #[error("Failed to read training data {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Malformed JSON on line {line}: {source}")]
    Malformed {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("Line {line} is missing the string field '{field}'")]
    MissingField { line: usize, field: &'static str },
    #[error("Training data is empty")]
    Empty,
}

/// One labeled line of the training file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingExample {
    pub text: String,
    pub label: String,
}

/// Parallel text and label columns, in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrainingSet {
    texts: Vec<String>,
    labels: Vec<String>,
}

impl TrainingSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, example: TrainingExample) {
        self.texts.push(example.text);
        self.labels.push(example.label);
    }

    pub fn texts(&self) -> &[String] {
        &self.texts
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.texts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.texts.is_empty()
    }

    /// Distinct labels in sorted order.
    pub fn distinct_labels(&self) -> Vec<String> {
        self.labels.iter().cloned().collect::<BTreeSet<_>>().into_iter().collect()
    }
}

impl FromIterator<TrainingExample> for TrainingSet {
    fn from_iter<I: IntoIterator<Item = TrainingExample>>(iter: I) -> Self {
        let mut set = TrainingSet::new();
        for example in iter {
            set.push(example);
        }
        set
    }
}

/// Reads a JSON Lines file where every non-blank line is `{"text": ..., "label": ...}`.
///
/// Blank lines are skipped. Extra fields are ignored. A file without any
/// records is an error.
pub fn load_training_data<P: AsRef<Path>>(path: P) -> Result<TrainingSet, DataError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| {
        if source.kind() == io::ErrorKind::NotFound {
            DataError::NotFound(path.to_path_buf())
        } else {
            DataError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;

    let set = parse_training_data(&contents)?;
    info!("Loaded {} training examples from {:?}", set.len(), path);
    Ok(set)
}

pub fn parse_training_data(contents: &str) -> Result<TrainingSet, DataError> {
    let mut set = TrainingSet::new();
    for (index, line) in contents.lines().enumerate() {
        let line_no = index + 1;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let record: Value = serde_json::from_str(line).map_err(|source| DataError::Malformed {
            line: line_no,
            source,
        })?;
        set.push(TrainingExample {
            text: string_field(&record, "text", line_no)?,
            label: string_field(&record, "label", line_no)?,
        });
    }

    if set.is_empty() {
        return Err(DataError::Empty);
    }
    Ok(set)
}

fn string_field(record: &Value, field: &'static str, line: usize) -> Result<String, DataError> {
    record
        .get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or(DataError::MissingField { line, field })
}
