//! Configuration structures for the topic embedding pipeline.
//!
//! Configuration lives in a TOML file. Every section and key is optional;
//! anything left out falls back to the values the pipeline was first run
//! with on the TREC-COVID 2020-07-16 round.
//!
//! ```toml
//! [input]
//! topics_path = "2020-07-16/topics-set.xml"
//! primary_field = "models"
//!
//! [model]
//! repo_id = "allenai/specter"
//! model_dir = "models/specter"
//! weights_file = "rust_model.ot"
//! lower_case = true
//! max_length = 768
//! device = "auto"
//! # true by default with the auto-download feature
//! auto_download = false
//!
//! [output]
//! embeddings_path = "2020-07-16/topics-embeddings.json"
//! key_base = 0
//! ```

use crate::encoder::{DeviceSpec, DEFAULT_MAX_LENGTH};
use crate::error::{EmbedError, Result};
use crate::topics::PrimaryField;
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Main configuration structure loaded from `config.toml`.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Topic set to read
    pub input: InputConfig,
    /// Encoder model and runtime
    pub model: ModelConfig,
    /// Embeddings file to write
    pub output: OutputConfig,
}

/// Topic loading configuration.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct InputConfig {
    /// Path to the XML topic set
    pub topics_path: PathBuf,
    /// Element concatenated in front of the narrative
    pub primary_field: PrimaryField,
}

/// Encoder configuration.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ModelConfig {
    /// Hugging Face repository the files come from
    pub repo_id: String,
    /// Local directory holding config.json, vocab.txt and the weights
    pub model_dir: PathBuf,
    /// Weights file name inside `model_dir`
    pub weights_file: String,
    /// Variable prefix in the weights file (e.g. "bert" for task-head checkpoints)
    pub var_prefix: Option<String>,
    /// Lower-case input before WordPiece (uncased vocabularies)
    pub lower_case: bool,
    /// Truncation length in tokens
    pub max_length: usize,
    /// auto, cpu, cuda or cuda:N
    pub device: DeviceSpec,
    /// Fetch missing files from the hub; defaults to whether the
    /// `auto-download` feature is compiled in
    pub auto_download: bool,
}

/// Output configuration.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct OutputConfig {
    /// Destination JSON file, replaced on every run
    pub embeddings_path: PathBuf,
    /// First integer key
    pub key_base: i64,
}

/// The two historical flavours of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    /// `<models>` + narrative, keys from 0
    Models,
    /// `<query>` + narrative, keys from 1
    Query,
}

impl Variant {
    pub fn primary_field(self) -> PrimaryField {
        match self {
            Variant::Models => PrimaryField::Models,
            Variant::Query => PrimaryField::Query,
        }
    }

    pub fn key_base(self) -> i64 {
        match self {
            Variant::Models => 0,
            Variant::Query => 1,
        }
    }
}

impl FromStr for Variant {
    type Err = EmbedError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "models" => Ok(Variant::Models),
            "query" => Ok(Variant::Query),
            other => Err(EmbedError::Config(format!(
                "unknown variant {:?} (expected models or query)",
                other
            ))),
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.primary_field().tag())
    }
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// # Returns
    ///
    /// Returns `Ok(Config)` if the file can be read, parsed and validated.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| EmbedError::io(path, e))?;
        Self::from_toml(&content)
    }

    /// Parse and validate configuration text.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults for one of the historical variants.
    pub fn variant(variant: Variant) -> Self {
        let mut config = Config::default();
        config.apply_variant(variant);
        config
    }

    /// Switch primary field and key base to `variant`.
    pub fn apply_variant(&mut self, variant: Variant) {
        self.input.primary_field = variant.primary_field();
        self.output.key_base = variant.key_base();
    }

    pub fn validate(&self) -> Result<()> {
        if self.model.max_length == 0 {
            return Err(EmbedError::Config("model.max_length must be positive".into()));
        }
        if self.model.weights_file.trim().is_empty() {
            return Err(EmbedError::Config("model.weights_file is empty".into()));
        }
        let weights = Path::new(&self.model.weights_file);
        if weights.file_name() != Some(weights.as_os_str()) {
            return Err(EmbedError::Config(format!(
                "model.weights_file must be a file name inside model.model_dir, got {:?}",
                self.model.weights_file
            )));
        }
        if self.output.key_base < 0 {
            return Err(EmbedError::Config(format!(
                "output.key_base must not be negative, got {}",
                self.output.key_base
            )));
        }
        Ok(())
    }
}

impl Default for InputConfig {
    fn default() -> Self {
        InputConfig {
            topics_path: PathBuf::from("2020-07-16/topics-set.xml"),
            primary_field: PrimaryField::Models,
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        ModelConfig {
            repo_id: "allenai/specter".to_string(),
            model_dir: PathBuf::from("models/specter"),
            weights_file: "rust_model.ot".to_string(),
            var_prefix: None,
            lower_case: true,
            max_length: DEFAULT_MAX_LENGTH,
            device: DeviceSpec::Auto,
            auto_download: cfg!(feature = "auto-download"),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            embeddings_path: PathBuf::from("2020-07-16/topics-embeddings.json"),
            key_base: 0,
        }
    }
}
