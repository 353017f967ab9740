//! Embedding vectors and their text form.
//!
//! On disk an embedding is its components joined by single spaces, each
//! written with the shortest representation that parses back to the same
//! `f32`.

use crate::error::{EmbedError, Result};
use std::fmt;

/// A pooled encoder output for one topic.
#[derive(Debug, Clone, PartialEq)]
pub struct Embedding(Vec<f32>);

impl Embedding {
    pub fn new(values: Vec<f32>) -> Self {
        Embedding(values)
    }

    /// Number of components (the encoder's hidden size).
    pub fn dim(&self) -> usize {
        self.0.len()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<f32> {
        self.0
    }

    /// Components joined by single spaces.
    pub fn to_space_joined(&self) -> String {
        self.0
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Parse a space-joined string. `key` only feeds the error message.
    pub fn parse_space_joined(key: &str, text: &str) -> Result<Self> {
        text.split_whitespace()
            .map(|token| {
                token.parse::<f32>().map_err(|e| EmbedError::InvalidEmbedding {
                    key: key.to_string(),
                    reason: format!("{:?}: {}", token, e),
                })
            })
            .collect::<Result<Vec<f32>>>()
            .map(Embedding)
    }

    /// Cosine similarity with `other`. Zero vectors score 0.0.
    pub fn cosine_similarity(&self, other: &Embedding) -> Result<f64> {
        if self.dim() != other.dim() {
            return Err(EmbedError::DimensionMismatch {
                key: -1,
                expected: self.dim(),
                found: other.dim(),
            });
        }

        let (mut dot, mut norm_a, mut norm_b) = (0.0f64, 0.0f64, 0.0f64);
        for (&a, &b) in self.0.iter().zip(other.0.iter()) {
            let (a, b) = (a as f64, b as f64);
            dot += a * b;
            norm_a += a * a;
            norm_b += b * b;
        }

        if norm_a == 0.0 || norm_b == 0.0 {
            return Ok(0.0);
        }
        Ok(dot / (norm_a.sqrt() * norm_b.sqrt()))
    }
}

impl From<Vec<f32>> for Embedding {
    fn from(values: Vec<f32>) -> Self {
        Embedding(values)
    }
}

impl fmt::Display for Embedding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_space_joined())
    }
}
