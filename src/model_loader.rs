//! Model file management with optional auto-download from Hugging Face
//!
//! The encoder needs three files in one directory:
//!
//! - `config.json`: BERT hyper-parameters
//! - `vocab.txt`: WordPiece vocabulary
//! - the weights (`rust_model.ot` by default, or a `.safetensors` file)
//!
//! # Examples
//!
//! ```no_run
//! use topic_embeddings::model_loader::ModelFiles;
//!
//! let files = ModelFiles::in_dir("models/specter", "rust_model.ot");
//! if files.exists() {
//!     println!("Models are ready!");
//! }
//! ```
//!
//! With the `auto-download` feature, missing files are fetched from the hub:
//!
//! ```no_run
//! use topic_embeddings::model_loader::{ensure_model_files, ModelFiles};
//!
//! let files = ModelFiles::in_dir("models/specter", "rust_model.ot");
//! ensure_model_files(&files, "allenai/specter", true)?;
//! # Ok::<(), topic_embeddings::EmbedError>(())
//! ```

use crate::error::{EmbedError, Result};
use std::path::{Path, PathBuf};
use tracing::info;

pub const CONFIG_FILE: &str = "config.json";
pub const VOCAB_FILE: &str = "vocab.txt";

/// Model files that need to be present
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelFiles {
    pub config: PathBuf,
    pub vocab: PathBuf,
    pub weights: PathBuf,
}

impl ModelFiles {
    /// Paths of the model files under `model_dir`
    pub fn in_dir(model_dir: impl AsRef<Path>, weights_file: &str) -> Self {
        let base = model_dir.as_ref();
        Self {
            config: base.join(CONFIG_FILE),
            vocab: base.join(VOCAB_FILE),
            weights: base.join(weights_file),
        }
    }

    /// Check if all required files exist
    pub fn exists(&self) -> bool {
        self.missing().is_empty()
    }

    /// Required files that are not on disk
    pub fn missing(&self) -> Vec<PathBuf> {
        [&self.config, &self.vocab, &self.weights]
            .into_iter()
            .filter(|p| !p.exists())
            .cloned()
            .collect()
    }
}

/// Make sure the model files exist, optionally downloading them from `repo_id`
///
/// # Arguments
/// * `files` - Model file paths to load
/// * `repo_id` - Hugging Face model repository (e.g. `allenai/specter`)
/// * `auto_download` - Whether to fetch missing files from the hub
pub fn ensure_model_files(files: &ModelFiles, repo_id: &str, auto_download: bool) -> Result<()> {
    let missing = files.missing();
    if missing.is_empty() {
        return Ok(());
    }

    if !auto_download {
        return Err(EmbedError::ModelFilesMissing { missing });
    }

    #[cfg(feature = "auto-download")]
    {
        info!(repo = repo_id, count = missing.len(), "model files not found locally, downloading");
        download_from_hf(repo_id, &missing)?;
        info!("model files downloaded");
        Ok(())
    }

    #[cfg(not(feature = "auto-download"))]
    {
        info!(repo = repo_id, "auto-download requested but not compiled in");
        Err(EmbedError::ModelFilesMissing { missing })
    }
}

#[cfg(feature = "auto-download")]
fn download_from_hf(repo_id: &str, missing: &[PathBuf]) -> Result<()> {
    use hf_hub::api::sync::Api;

    let api = Api::new().map_err(|e| EmbedError::Model(format!("hub client: {}", e)))?;
    let repo = api.model(repo_id.to_string());

    for target in missing {
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent).map_err(|e| EmbedError::io(parent, e))?;
        }

        let filename = hub_file_name(target)?;
        info!(file = filename, "downloading");

        let cached = repo.get(filename).map_err(|e| {
            let mut msg = format!("download of {} from {} failed: {}", filename, repo_id, e);
            if let Some(hint) = conversion_hint(filename) {
                msg.push_str("\n");
                msg.push_str(&hint);
            }
            EmbedError::Model(msg)
        })?;
        std::fs::copy(&cached, target).map_err(|e| EmbedError::io(target, e))?;
    }

    Ok(())
}

/// Name requested from the hub for a local model file: its own file name.
#[cfg(any(feature = "auto-download", test))]
fn hub_file_name(target: &Path) -> Result<&str> {
    target
        .file_name()
        .and_then(|s| s.to_str())
        .ok_or_else(|| EmbedError::Model(format!("invalid model path {}", target.display())))
}

// Most hub repositories only publish PyTorch weights.
#[cfg(any(feature = "auto-download", test))]
fn conversion_hint(filename: &str) -> Option<String> {
    filename.ends_with(".ot").then(|| {
        format!(
            "{} is a libtorch weights file that most repositories do not publish: download \
             pytorch_model.bin and convert it with rust-bert's utils/convert_model.py, \
             or set model.weights_file to a model.safetensors the repository provides",
            filename
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_files_paths() {
        let files = ModelFiles::in_dir("models/specter", "rust_model.ot");
        assert_eq!(files.config, PathBuf::from("models/specter/config.json"));
        assert_eq!(files.vocab, PathBuf::from("models/specter/vocab.txt"));
        assert_eq!(files.weights, PathBuf::from("models/specter/rust_model.ot"));
    }

    #[test]
    fn test_missing_files_without_download() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "{}").unwrap();

        let files = ModelFiles::in_dir(dir.path(), "model.safetensors");
        assert!(!files.exists());
        assert_eq!(files.missing().len(), 2);

        match ensure_model_files(&files, "allenai/specter", false) {
            Err(EmbedError::ModelFilesMissing { missing }) => {
                assert_eq!(missing, vec![files.vocab.clone(), files.weights.clone()]);
            }
            other => panic!("expected ModelFilesMissing, got {:?}", other),
        }
    }

    #[test]
    fn test_present_files_need_nothing() {
        let dir = tempfile::tempdir().unwrap();
        for name in [CONFIG_FILE, VOCAB_FILE, "rust_model.ot"] {
            std::fs::write(dir.path().join(name), "").unwrap();
        }

        let files = ModelFiles::in_dir(dir.path(), "rust_model.ot");
        assert!(files.exists());
        assert!(ensure_model_files(&files, "allenai/specter", false).is_ok());
    }

    #[test]
    fn test_hub_file_name_is_the_configured_name() {
        let files = ModelFiles::in_dir("models/specter", "model.safetensors");
        assert_eq!(hub_file_name(&files.config).unwrap(), CONFIG_FILE);
        assert_eq!(hub_file_name(&files.vocab).unwrap(), VOCAB_FILE);
        assert_eq!(hub_file_name(&files.weights).unwrap(), "model.safetensors");
        assert!(hub_file_name(Path::new("..")).is_err());
    }

    #[test]
    fn test_conversion_hint_only_for_libtorch_weights() {
        let hint = conversion_hint("rust_model.ot").unwrap();
        assert!(hint.contains("pytorch_model.bin"));
        assert!(hint.contains("convert_model.py"));
        assert!(conversion_hint("model.safetensors").is_none());
        assert!(conversion_hint(VOCAB_FILE).is_none());
    }
}
