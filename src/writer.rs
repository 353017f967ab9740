//! Topic embeddings file.
//!
//! The file is a single JSON object mapping decimal topic indices to
//! space-joined embeddings, keys in ascending order:
//!
//! ```json
//! {"0":"0.1 -0.2 0.3","1":"0.4 0.5 -0.6"}
//! ```
//!
//! Writes go to a temporary file next to the destination which is then
//! renamed over it, so a failed run never leaves a truncated file behind.

use crate::embedding::Embedding;
use crate::error::{EmbedError, Result};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::info;

/// Index → embedding mapping, ordered by index.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TopicEmbeddings {
    entries: Vec<(i64, Embedding)>,
}

impl TopicEmbeddings {
    /// Key the embeddings `base`, `base + 1`, ... in order.
    ///
    /// Fails if the vectors do not all share one dimension, or if the last
    /// key would not fit in an `i64`.
    pub fn from_embeddings(embeddings: Vec<Embedding>, base: i64) -> Result<Self> {
        let entries = embeddings
            .into_iter()
            .enumerate()
            .map(|(i, emb)| -> Result<(i64, Embedding)> {
                let key = i64::try_from(i)
                    .ok()
                    .and_then(|offset| base.checked_add(offset))
                    .ok_or_else(|| {
                        EmbedError::Config(format!("key base {} overflows at topic #{}", base, i))
                    })?;
                Ok((key, emb))
            })
            .collect::<Result<Vec<(i64, Embedding)>>>()?;
        check_dimensions(&entries)?;
        Ok(TopicEmbeddings { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Shared dimension, `None` when empty.
    pub fn dim(&self) -> Option<usize> {
        self.entries.first().map(|(_, emb)| emb.dim())
    }

    pub fn keys(&self) -> impl Iterator<Item = i64> + '_ {
        self.entries.iter().map(|(key, _)| *key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (i64, &Embedding)> + '_ {
        self.entries.iter().map(|(key, emb)| (*key, emb))
    }

    pub fn get(&self, key: i64) -> Option<&Embedding> {
        self.entries
            .binary_search_by_key(&key, |(k, _)| *k)
            .ok()
            .map(|idx| &self.entries[idx].1)
    }

    /// Cosine similarity between two keyed topics.
    pub fn similarity(&self, a: i64, b: i64) -> Result<f64> {
        let first = self.get(a).ok_or(EmbedError::UnknownTopic(a))?;
        let second = self.get(b).ok_or(EmbedError::UnknownTopic(b))?;
        first.cosine_similarity(second)
    }

    /// JSON object in key order.
    pub fn to_json(&self) -> Value {
        let map: Map<String, Value> = self
            .entries
            .iter()
            .map(|(key, emb)| (key.to_string(), Value::String(emb.to_space_joined())))
            .collect();
        Value::Object(map)
    }
}

/// Replace `path` with the JSON form of `embeddings`.
pub fn write_embeddings(path: impl AsRef<Path>, embeddings: &TopicEmbeddings) -> Result<()> {
    let path = path.as_ref();
    let parent = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent).map_err(|e| EmbedError::io(parent, e))?;

    let mut tmp = NamedTempFile::new_in(parent).map_err(|e| EmbedError::io(parent, e))?;
    {
        let mut writer = BufWriter::new(tmp.as_file_mut());
        serde_json::to_writer(&mut writer, &embeddings.to_json())?;
        writer.flush().map_err(|e| EmbedError::io(path, e))?;
    }
    tmp.persist(path).map_err(|e| EmbedError::io(path, e.error))?;

    info!(
        path = %path.display(),
        topics = embeddings.len(),
        dim = embeddings.dim().unwrap_or(0),
        "wrote topic embeddings"
    );
    Ok(())
}

/// Read an embeddings file back, sorted by key.
pub fn read_embeddings(path: impl AsRef<Path>) -> Result<TopicEmbeddings> {
    let path = path.as_ref();
    let file = std::fs::File::open(path).map_err(|e| EmbedError::io(path, e))?;
    let raw: BTreeMap<String, String> = serde_json::from_reader(BufReader::new(file))?;
    parse_entries(raw)
}

/// Parse an embeddings JSON document already in memory.
pub fn parse_embeddings(json: &str) -> Result<TopicEmbeddings> {
    let raw: BTreeMap<String, String> = serde_json::from_str(json)?;
    parse_entries(raw)
}

fn parse_entries(raw: BTreeMap<String, String>) -> Result<TopicEmbeddings> {
    let mut entries = raw
        .into_iter()
        .map(|(key, value)| -> Result<(i64, Embedding)> {
            let index = key
                .trim()
                .parse::<i64>()
                .map_err(|_| EmbedError::InvalidKey(key.clone()))?;
            let embedding = Embedding::parse_space_joined(&key, &value)?;
            Ok((index, embedding))
        })
        .collect::<Result<Vec<(i64, Embedding)>>>()?;

    entries.sort_by_key(|(key, _)| *key);
    check_dimensions(&entries)?;
    Ok(TopicEmbeddings { entries })
}

fn check_dimensions(entries: &[(i64, Embedding)]) -> Result<()> {
    let Some((_, first)) = entries.first() else {
        return Ok(());
    };
    let expected = first.dim();
    match entries.iter().find(|(_, emb)| emb.dim() != expected) {
        Some((key, emb)) => Err(EmbedError::DimensionMismatch {
            key: *key,
            expected,
            found: emb.dim(),
        }),
        None => Ok(()),
    }
}
