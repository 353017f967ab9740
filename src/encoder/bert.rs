//! BERT encoder with `[CLS]` pooling (rust-bert, libtorch backend).
//!
//! The whole batch is tokenized with truncation at `max_length`, padded to
//! the longest sequence, and run through the model in one forward pass. The
//! last hidden state at position 0 becomes each topic's embedding.

use super::TextEncoder;
use crate::config::ModelConfig;
use crate::embedding::Embedding;
use crate::error::{EmbedError, Result};
use crate::model_loader::ModelFiles;
use crate::topics::TopicPair;

#[cfg(feature = "bert")]
use super::{join_pair, pad_batch, DeviceSpec};
#[cfg(feature = "bert")]
use rust_bert::bert::{BertConfig, BertEmbeddings, BertModel};
#[cfg(feature = "bert")]
use rust_tokenizers::tokenizer::{BertTokenizer, Tokenizer, TruncationStrategy};
#[cfg(feature = "bert")]
use rust_tokenizers::vocab::Vocab;
#[cfg(feature = "bert")]
use tch::{nn, Device, Kind, Tensor};
#[cfg(feature = "bert")]
use tracing::{debug, info};

/// Separator inserted between the two fields of a topic.
pub const SEPARATOR: &str = "[SEP]";
/// Padding token of the BERT vocabulary.
pub const PAD_TOKEN: &str = "[PAD]";

#[cfg(feature = "bert")]
pub struct BertClsEncoder {
    tokenizer: BertTokenizer,
    model: BertModel<BertEmbeddings>,
    // Keeps the weights alive for `model`.
    _var_store: nn::VarStore,
    device: Device,
    max_length: usize,
    hidden_size: usize,
    pad_id: i64,
}

#[cfg(feature = "bert")]
impl BertClsEncoder {
    /// Load tokenizer, configuration and weights from `files`.
    pub fn new(files: &ModelFiles, options: &ModelConfig) -> Result<Self> {
        let device = resolve_device(options.device);
        info!(
            repo = %options.repo_id,
            device = ?device,
            max_length = options.max_length,
            "loading BERT encoder"
        );

        let tokenizer = BertTokenizer::from_file(&files.vocab, options.lower_case, false)?;
        let pad_id = tokenizer.vocab().token_to_id(PAD_TOKEN);

        let config = read_bert_config(&files.config)?;
        let hidden_size = config.hidden_size as usize;

        let mut var_store = nn::VarStore::new(device);
        var_store.set_kind(Kind::Float);
        let model = match options.var_prefix.as_deref() {
            Some(prefix) => BertModel::<BertEmbeddings>::new(var_store.root() / prefix, &config),
            None => BertModel::<BertEmbeddings>::new(var_store.root(), &config),
        };
        var_store.load(&files.weights)?;

        info!(hidden_size, "BERT encoder ready");

        Ok(BertClsEncoder {
            tokenizer,
            model,
            _var_store: var_store,
            device,
            max_length: options.max_length,
            hidden_size,
            pad_id,
        })
    }

    pub fn device(&self) -> Device {
        self.device
    }
}

#[cfg(feature = "bert")]
impl TextEncoder for BertClsEncoder {
    fn separator(&self) -> &str {
        SEPARATOR
    }

    fn embedding_dim(&self) -> usize {
        self.hidden_size
    }

    fn encode_pairs(&self, pairs: &[TopicPair]) -> Result<Vec<Embedding>> {
        if pairs.is_empty() {
            return Ok(Vec::new());
        }

        let texts: Vec<String> = pairs.iter().map(|p| join_pair(p, SEPARATOR)).collect();
        let tokenized = self.tokenizer.encode_list(
            &texts,
            self.max_length,
            &TruncationStrategy::LongestFirst,
            0,
        );
        let batch = pad_batch(
            tokenized.into_iter().map(|t| t.token_ids).collect(),
            self.pad_id,
        );
        debug!(
            batch_size = batch.batch_size(),
            seq_len = batch.seq_len,
            "tokenized batch"
        );

        let shape = [batch.batch_size() as i64, batch.seq_len as i64];
        let input_ids = Tensor::from_slice(&batch.flat_ids())
            .view(shape)
            .to_device(self.device);
        let attention_mask = Tensor::from_slice(&batch.flat_mask())
            .view(shape)
            .to_device(self.device);

        let pooled = tch::no_grad(|| -> Result<Tensor> {
            let output = self.model.forward_t(
                Some(&input_ids),
                Some(&attention_mask),
                None,
                None,
                None,
                None,
                None,
                false,
            )?;
            Ok(output
                .hidden_state
                .select(1, 0)
                .to_kind(Kind::Float)
                .to_device(Device::Cpu))
        })?;

        (0..pairs.len() as i64)
            .map(|row| -> Result<Embedding> {
                let values = Vec::<f32>::try_from(&pooled.get(row))?;
                Ok(Embedding::new(values))
            })
            .collect()
    }
}

#[cfg(feature = "bert")]
fn read_bert_config(path: &std::path::Path) -> Result<BertConfig> {
    let file = std::fs::File::open(path).map_err(|e| EmbedError::io(path, e))?;
    serde_json::from_reader(std::io::BufReader::new(file))
        .map_err(|e| EmbedError::Model(format!("invalid {}: {}", path.display(), e)))
}

#[cfg(feature = "bert")]
fn resolve_device(spec: DeviceSpec) -> Device {
    match spec {
        DeviceSpec::Auto => Device::cuda_if_available(),
        DeviceSpec::Cpu => Device::Cpu,
        DeviceSpec::Cuda(idx) => Device::Cuda(idx),
    }
}

// Fallback
#[cfg(not(feature = "bert"))]
pub struct BertClsEncoder;

#[cfg(not(feature = "bert"))]
impl BertClsEncoder {
    pub fn new(_files: &ModelFiles, _options: &ModelConfig) -> Result<Self> {
        Err(EmbedError::Model(
            "BERT not enabled. Compile with: cargo build --features bert".to_string(),
        ))
    }
}

#[cfg(not(feature = "bert"))]
impl TextEncoder for BertClsEncoder {
    fn separator(&self) -> &str {
        SEPARATOR
    }

    fn embedding_dim(&self) -> usize {
        0
    }

    fn encode_pairs(&self, _pairs: &[TopicPair]) -> Result<Vec<Embedding>> {
        Err(EmbedError::Model("BERT not enabled".to_string()))
    }
}
