//! Error type shared by every stage of the topic embedding pipeline.
//!
//! Nothing here is recoverable: each variant aborts the run before the
//! output file is replaced.

use std::path::PathBuf;
use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, EmbedError>;

/// All failures the pipeline can report.
#[derive(Debug, Error)]
pub enum EmbedError {
    /// Reading or writing a file failed.
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The topic set is not well-formed XML.
    #[error("malformed topic set: {0}")]
    Xml(#[from] roxmltree::Error),

    /// A topic lacks one of the two fields the encoder needs.
    #[error("topic #{position} has no <{tag}> text")]
    MissingField { position: usize, tag: String },

    /// The configuration file could not be parsed or holds invalid values.
    #[error("configuration error: {0}")]
    Config(String),

    /// JSON (de)serialization of the embeddings file failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Model files are absent and could not be fetched.
    #[error("model files not found:\n{}", list_paths(.missing))]
    ModelFilesMissing { missing: Vec<PathBuf> },

    /// Building, loading or running the encoder failed.
    #[error("model error: {0}")]
    Model(String),

    /// The tokenizer vocabulary could not be loaded.
    #[error("tokenizer error: {0}")]
    Tokenizer(String),

    /// Embeddings within one mapping have different lengths.
    #[error("embedding for key {key} has dimension {found}, expected {expected}")]
    DimensionMismatch {
        key: i64,
        expected: usize,
        found: usize,
    },

    /// A serialized embedding holds a value that is not a float.
    #[error("embedding for key {key} is not a list of floats: {reason}")]
    InvalidEmbedding { key: String, reason: String },

    /// A key of the embeddings file is not an integer.
    #[error("embedding key {0:?} is not an integer")]
    InvalidKey(String),

    /// A lookup named a topic index absent from the mapping.
    #[error("no embedding for topic {0}")]
    UnknownTopic(i64),
}

fn list_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| format!("  - {}", p.display()))
        .collect::<Vec<_>>()
        .join("\n")
}

impl EmbedError {
    /// Wrap an I/O error with the path it happened on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        EmbedError::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<toml::de::Error> for EmbedError {
    fn from(err: toml::de::Error) -> Self {
        EmbedError::Config(err.to_string())
    }
}

#[cfg(feature = "bert")]
impl From<tch::TchError> for EmbedError {
    fn from(err: tch::TchError) -> Self {
        EmbedError::Model(err.to_string())
    }
}

#[cfg(feature = "bert")]
impl From<rust_bert::RustBertError> for EmbedError {
    fn from(err: rust_bert::RustBertError) -> Self {
        EmbedError::Model(err.to_string())
    }
}

#[cfg(feature = "bert")]
impl From<rust_tokenizers::error::TokenizerError> for EmbedError {
    fn from(err: rust_tokenizers::error::TokenizerError) -> Self {
        EmbedError::Tokenizer(err.to_string())
    }
}
