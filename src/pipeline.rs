//! Load → encode → write, in one synchronous pass.

use crate::config::Config;
use crate::encoder::TextEncoder;
use crate::error::{EmbedError, Result};
use crate::topics::{load_topics, TopicPair};
use crate::writer::{write_embeddings, TopicEmbeddings};
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;

/// What a run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Number of topics embedded (and keys written)
    pub topics: usize,
    /// Embedding dimension, 0 when there were no topics
    pub dimension: usize,
    /// First key written
    pub key_base: i64,
    /// Where the file went
    pub output: PathBuf,
}

/// Embed every topic of `config.input` and write them to `config.output`.
///
/// The output file is only replaced once all embeddings are in memory, so
/// any failure leaves a previous file untouched.
pub fn run(config: &Config, encoder: &dyn TextEncoder) -> Result<RunSummary> {
    let start = Instant::now();

    let topics = load_topics(&config.input.topics_path, config.input.primary_field)?;
    info!(
        path = %config.input.topics_path.display(),
        field = %config.input.primary_field,
        topics = topics.len(),
        "loaded topic set"
    );

    let pairs: Vec<TopicPair> = topics.iter().map(|t| t.pair()).collect();
    let embeddings = embed_pairs(&pairs, config.output.key_base, encoder)?;
    info!(
        topics = embeddings.len(),
        dim = embeddings.dim().unwrap_or(0),
        "encoded topics"
    );

    write_embeddings(&config.output.embeddings_path, &embeddings)?;
    info!(elapsed_secs = start.elapsed().as_secs_f64(), "pipeline finished");

    Ok(RunSummary {
        topics: embeddings.len(),
        dimension: embeddings.dim().unwrap_or(0),
        key_base: config.output.key_base,
        output: config.output.embeddings_path.clone(),
    })
}

/// Encode `pairs` and key them from `key_base`, without touching the disk.
///
/// The encoder must return exactly one vector per pair, each of
/// `encoder.embedding_dim()` values.
pub fn embed_pairs(
    pairs: &[TopicPair],
    key_base: i64,
    encoder: &dyn TextEncoder,
) -> Result<TopicEmbeddings> {
    if pairs.is_empty() {
        return TopicEmbeddings::from_embeddings(Vec::new(), key_base);
    }

    let embeddings = encoder.encode_pairs(pairs)?;
    if embeddings.len() != pairs.len() {
        return Err(EmbedError::Model(format!(
            "encoder returned {} embeddings for {} topics",
            embeddings.len(),
            pairs.len()
        )));
    }

    let expected = encoder.embedding_dim();
    let mapping = TopicEmbeddings::from_embeddings(embeddings, key_base)?;
    if let Some((key, emb)) = mapping.iter().find(|(_, emb)| emb.dim() != expected) {
        return Err(EmbedError::DimensionMismatch {
            key,
            expected,
            found: emb.dim(),
        });
    }
    Ok(mapping)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::Embedding;
    use crate::encoder::join_pair;

    /// Deterministic stand-in: byte statistics of the joined text.
    struct ByteStatsEncoder;

    impl TextEncoder for ByteStatsEncoder {
        fn separator(&self) -> &str {
            "[SEP]"
        }

        fn embedding_dim(&self) -> usize {
            3
        }

        fn encode_pairs(&self, pairs: &[TopicPair]) -> Result<Vec<Embedding>> {
            Ok(pairs
                .iter()
                .map(|p| {
                    let text = join_pair(p, self.separator());
                    let sum: u32 = text.bytes().map(u32::from).sum();
                    Embedding::new(vec![text.len() as f32, sum as f32, p.narrative.len() as f32])
                })
                .collect())
        }
    }

    struct FailingEncoder;

    impl TextEncoder for FailingEncoder {
        fn separator(&self) -> &str {
            "[SEP]"
        }

        fn embedding_dim(&self) -> usize {
            0
        }

        fn encode_pairs(&self, _pairs: &[TopicPair]) -> Result<Vec<Embedding>> {
            Err(EmbedError::Model("forward pass failed".into()))
        }
    }

    #[test]
    fn test_embed_pairs_keys_follow_base() {
        let pairs = vec![TopicPair::new("A", "B"), TopicPair::new("C", "D")];

        let zero = embed_pairs(&pairs, 0, &ByteStatsEncoder).unwrap();
        assert_eq!(zero.keys().collect::<Vec<_>>(), vec![0, 1]);

        let one = embed_pairs(&pairs, 1, &ByteStatsEncoder).unwrap();
        assert_eq!(one.keys().collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(one.get(1).unwrap().as_slice()[0], "A[SEP]B".len() as f32);
    }

    /// Returns a fixed list of vectors whatever the input.
    struct CannedEncoder {
        dim: usize,
        vectors: Vec<Vec<f32>>,
    }

    impl TextEncoder for CannedEncoder {
        fn separator(&self) -> &str {
            "[SEP]"
        }

        fn embedding_dim(&self) -> usize {
            self.dim
        }

        fn encode_pairs(&self, _pairs: &[TopicPair]) -> Result<Vec<Embedding>> {
            Ok(self.vectors.iter().cloned().map(Embedding::new).collect())
        }
    }

    fn three_pairs() -> Vec<TopicPair> {
        vec![
            TopicPair::new("A", "B"),
            TopicPair::new("C", "D"),
            TopicPair::new("E", "F"),
        ]
    }

    #[test]
    fn test_short_encoder_output_is_rejected() {
        let encoder = CannedEncoder {
            dim: 2,
            vectors: vec![vec![1.0, 2.0]],
        };
        match embed_pairs(&three_pairs(), 0, &encoder) {
            Err(EmbedError::Model(msg)) => {
                assert_eq!(msg, "encoder returned 1 embeddings for 3 topics");
            }
            other => panic!("expected Model error, got {:?}", other),
        }
    }

    #[test]
    fn test_vectors_must_match_encoder_dimension() {
        let encoder = CannedEncoder {
            dim: 3,
            vectors: vec![vec![1.0, 2.0]; 3],
        };
        match embed_pairs(&three_pairs(), 1, &encoder) {
            Err(EmbedError::DimensionMismatch {
                key,
                expected,
                found,
            }) => assert_eq!((key, expected, found), (1, 3, 2)),
            other => panic!("expected DimensionMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_short_output_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let topics = dir.path().join("topics.xml");
        let output = dir.path().join("out.json");
        std::fs::write(
            &topics,
            "<topics>\
             <topic><models>a</models><narrative>b</narrative></topic>\
             <topic><models>c</models><narrative>d</narrative></topic>\
             </topics>",
        )
        .unwrap();

        let mut config = Config::default();
        config.input.topics_path = topics;
        config.output.embeddings_path = output.clone();

        let encoder = CannedEncoder {
            dim: 2,
            vectors: vec![vec![1.0, 2.0]],
        };
        assert!(matches!(run(&config, &encoder), Err(EmbedError::Model(_))));
        assert!(!output.exists());
    }

    #[test]
    fn test_embed_pairs_empty_skips_encoder() {
        let mapping = embed_pairs(&[], 0, &FailingEncoder).unwrap();
        assert!(mapping.is_empty());
    }

    #[test]
    fn test_encoder_failure_leaves_output_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let topics = dir.path().join("topics.xml");
        let output = dir.path().join("out.json");
        std::fs::write(
            &topics,
            "<topics><topic><models>m</models><narrative>n</narrative></topic></topics>",
        )
        .unwrap();
        std::fs::write(&output, "previous").unwrap();

        let mut config = Config::default();
        config.input.topics_path = topics;
        config.output.embeddings_path = output.clone();

        assert!(run(&config, &FailingEncoder).is_err());
        assert_eq!(std::fs::read_to_string(&output).unwrap(), "previous");
    }
}
