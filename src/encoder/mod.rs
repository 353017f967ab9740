//! Text encoders turning topic pairs into pooled embeddings.
//!
//! The pipeline only talks to the [`TextEncoder`] trait. The real
//! implementation is [`bert::BertClsEncoder`], a BERT model whose last hidden
//! state at position 0 (the `[CLS]` slot) is taken as the embedding.
//!
//! The helpers in this module are the parts of batching that do not need
//! libtorch: joining a pair around the separator and padding token ids.

pub mod bert;

use crate::embedding::Embedding;
use crate::error::{EmbedError, Result};
use crate::topics::TopicPair;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

/// Default truncation length, in tokens.
pub const DEFAULT_MAX_LENGTH: usize = 768;

/// Anything able to embed a batch of topic pairs.
pub trait TextEncoder {
    /// Token placed between the primary text and the narrative.
    fn separator(&self) -> &str;

    /// Length of every vector returned by [`encode_pairs`](Self::encode_pairs).
    fn embedding_dim(&self) -> usize;

    /// Embed `pairs` in one batch, preserving order.
    fn encode_pairs(&self, pairs: &[TopicPair]) -> Result<Vec<Embedding>>;
}

/// `primary`, the separator, then `narrative`, with nothing in between.
pub fn join_pair(pair: &TopicPair, separator: &str) -> String {
    let mut text =
        String::with_capacity(pair.primary.len() + separator.len() + pair.narrative.len());
    text.push_str(&pair.primary);
    text.push_str(separator);
    text.push_str(&pair.narrative);
    text
}

/// A padded batch ready to become `[batch, seq_len]` tensors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaddedBatch {
    pub input_ids: Vec<Vec<i64>>,
    pub attention_mask: Vec<Vec<i64>>,
    pub seq_len: usize,
}

impl PaddedBatch {
    pub fn batch_size(&self) -> usize {
        self.input_ids.len()
    }

    /// Row-major copy of the ids.
    pub fn flat_ids(&self) -> Vec<i64> {
        self.input_ids.iter().flatten().copied().collect()
    }

    /// Row-major copy of the mask.
    pub fn flat_mask(&self) -> Vec<i64> {
        self.attention_mask.iter().flatten().copied().collect()
    }
}

/// Right-pad every sequence with `pad_id` up to the longest one.
pub fn pad_batch(sequences: Vec<Vec<i64>>, pad_id: i64) -> PaddedBatch {
    let seq_len = sequences.iter().map(Vec::len).max().unwrap_or(0);

    let mut input_ids = Vec::with_capacity(sequences.len());
    let mut attention_mask = Vec::with_capacity(sequences.len());
    for mut ids in sequences {
        let real = ids.len();
        ids.resize(seq_len, pad_id);
        let mut mask = vec![1i64; real];
        mask.resize(seq_len, 0);
        input_ids.push(ids);
        attention_mask.push(mask);
    }

    PaddedBatch {
        input_ids,
        attention_mask,
        seq_len,
    }
}

/// Where to run the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeviceSpec {
    /// CUDA device 0 when available, otherwise CPU
    #[default]
    Auto,
    Cpu,
    Cuda(usize),
}

impl FromStr for DeviceSpec {
    type Err = EmbedError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(DeviceSpec::Auto),
            "cpu" => Ok(DeviceSpec::Cpu),
            "cuda" => Ok(DeviceSpec::Cuda(0)),
            other => other
                .strip_prefix("cuda:")
                .and_then(|idx| idx.parse::<usize>().ok())
                .map(DeviceSpec::Cuda)
                .ok_or_else(|| {
                    EmbedError::Config(format!(
                        "unknown device {:?} (expected auto, cpu, cuda or cuda:N)",
                        s
                    ))
                }),
        }
    }
}

impl fmt::Display for DeviceSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceSpec::Auto => f.write_str("auto"),
            DeviceSpec::Cpu => f.write_str("cpu"),
            DeviceSpec::Cuda(idx) => write!(f, "cuda:{}", idx),
        }
    }
}

impl<'de> Deserialize<'de> for DeviceSpec {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
