//! # Topic Embeddings
//!
//! Encode a TREC-style topic set into dense vectors with a pretrained BERT
//! encoder, for embedding-based ranking of the TREC-COVID collection.
//!
//! For each `<topic>` the primary field (`models`, `query` or `question`) and
//! the `narrative` are joined around the `[SEP]` token, the whole set is run
//! through the model in one batch, and the last hidden state at position 0
//! (`[CLS]`) becomes the topic's embedding. The result is a JSON object
//! mapping topic index to the space-joined vector:
//!
//! ```json
//! {"0": "0.2914 -0.0412 ...", "1": "0.1187 0.5023 ..."}
//! ```
//!
//! ## Quick Start
//!
//! ```no_run
//! use topic_embeddings::config::{Config, Variant};
//! use topic_embeddings::encoder::bert::BertClsEncoder;
//! use topic_embeddings::model_loader::{ensure_model_files, ModelFiles};
//! use topic_embeddings::pipeline;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::variant(Variant::Query);
//!
//!     let files = ModelFiles::in_dir(&config.model.model_dir, &config.model.weights_file);
//!     ensure_model_files(&files, &config.model.repo_id, config.model.auto_download)?;
//!
//!     let encoder = BertClsEncoder::new(&files, &config.model)?;
//!     let summary = pipeline::run(&config, &encoder)?;
//!     println!("{} topics, {} dims", summary.topics, summary.dimension);
//!     Ok(())
//! }
//! ```
//!
//! ### Reading the embeddings back
//!
//! ```no_run
//! use topic_embeddings::writer::read_embeddings;
//!
//! let embeddings = read_embeddings("2020-07-16/topics-embeddings.json")?;
//! println!("similarity(1, 2) = {:.4}", embeddings.similarity(1, 2)?);
//! # Ok::<(), topic_embeddings::EmbedError>(())
//! ```
//!
//! ## Variants
//!
//! | Variant  | Primary field | First key |
//! |----------|---------------|-----------|
//! | `models` | `<models>`    | 0         |
//! | `query`  | `<query>`     | 1         |
//!
//! Both are presets over [`config::Config`]; any field and key base can be
//! set in `config.toml` instead.
//!
//! ## Available Cargo Features
//!
//! | Feature | Description | Default |
//! |---------|-------------|---------|
//! | `cli` | Include CLI binary | ✓ |
//! | `bert` | Real BERT encoder (rust-bert, libtorch) | ✓ |
//! | `auto-download` | Fetch model files from Hugging Face | ✗ |
//!
//! ## Model Files
//!
//! The encoder reads `config.json`, `vocab.txt` and a weights file from
//! `model.model_dir` (default `models/specter`). rust-bert loads `.ot`
//! (converted with its `convert_model.py` script) or `.safetensors` weights.
//!
//! ## Requirements
//!
//! - **PyTorch/libtorch**: required by the `bert` feature
//!   ```bash
//!   export LIBTORCH_USE_PYTORCH=1
//!   export LIBTORCH_BYPASS_VERSION_CHECK=1
//!   ```
//!
//! ## License
//!
//! GNU General Public License v3.0 (GPLv3)

pub mod config;
pub mod embedding;
pub mod encoder;
pub mod error;
pub mod model_loader;
pub mod pipeline;
pub mod topics;
pub mod writer;

#[cfg(feature = "cli")]
pub mod cli;

// Re-export commonly used types for convenience
pub use config::{Config, Variant};
pub use embedding::Embedding;
pub use encoder::TextEncoder;
pub use error::{EmbedError, Result};
pub use pipeline::{run, RunSummary};
pub use topics::{load_topics, parse_topics, PrimaryField, Topic, TopicPair};
pub use writer::{read_embeddings, write_embeddings, TopicEmbeddings};
