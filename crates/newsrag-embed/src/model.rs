//! Local XLM-RoBERTa sentence embedder (multilingual-e5 family) on candle.
//!
//! Pipeline: prefix -> tokenize (pad/truncate to `max_len`) -> encoder
//! forward -> masked mean pooling -> L2 norm. E5 checkpoints are trained with
//! `query: ` / `passage: ` prefixes, so queries and chunks are prefixed
//! differently.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::xlm_roberta::{Config as XLMRobertaConfig, XLMRobertaModel};
use tokenizers::Tokenizer;
use tracing::{debug, info, warn};

use newsrag_core::traits::Embedder;

use crate::device::select_device;
use crate::pool::masked_mean_l2;
use crate::tokenize::tokenize_batch;

const QUERY_PREFIX: &str = "query: ";
const PASSAGE_PREFIX: &str = "passage: ";

pub struct EmbeddingModel {
    model: XLMRobertaModel,
    tokenizer: Tokenizer,
    device: Device,
    dim: usize,
    max_len: usize,
    id: String,
}

fn load_weights(model_dir: &Path, device: &Device) -> Result<HashMap<String, Tensor>> {
    let safetensors = model_dir.join("model.safetensors");
    if safetensors.exists() {
        debug!(path = %safetensors.display(), "loading safetensors weights");
        return Ok(candle_core::safetensors::load(&safetensors, device)?);
    }
    let pickle = model_dir.join("pytorch_model.bin");
    debug!(path = %pickle.display(), "loading pytorch weights");
    let weights = candle_core::pickle::read_all(&pickle)
        .with_context(|| format!("no model.safetensors or pytorch_model.bin in {}", model_dir.display()))?;
    Ok(weights.into_iter().collect())
}

impl EmbeddingModel {
    pub fn load(model_dir: &Path, max_len: usize) -> Result<Self> {
        let device = select_device();
        info!(dir = %model_dir.display(), "loading embedding model");

        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow!("Failed to load tokenizer from {}: {}", tokenizer_path.display(), e))?;
        let config_path = model_dir.join("config.json");
        let config: XLMRobertaConfig = serde_json::from_str(&std::fs::read_to_string(&config_path)?)
            .with_context(|| format!("bad model config {}", config_path.display()))?;

        let weights = load_weights(model_dir, &device)?;
        let vb = VarBuilder::from_tensors(weights, DType::F32, &device);
        let model = XLMRobertaModel::new(&config, vb)?;
        let dim = config.hidden_size;
        let name = model_dir.file_name().map_or_else(|| "model".into(), |n| n.to_string_lossy().to_string());
        info!(dim, max_len, "embedding model loaded");
        Ok(Self { model, tokenizer, device, dim, max_len, id: format!("local:{name}:d{dim}") })
    }

    fn embed_prefixed(&self, prefix: &str, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let start = Instant::now();
        let prefixed: Vec<String> = texts.iter().map(|t| format!("{prefix}{t}")).collect();
        let (input_ids, attention_mask) = tokenize_batch(&self.tokenizer, &prefixed, self.max_len, &self.device)?;
        let token_type_ids = input_ids.zeros_like()?.to_dtype(DType::I64)?;
        let hidden = self.model.forward(&input_ids, &attention_mask, &token_type_ids, None, None, None)?;
        let pooled = masked_mean_l2(&hidden, &attention_mask)?;
        let vectors: Vec<Vec<f32>> = pooled.to_device(&Device::Cpu)?.to_vec2()?;
        let elapsed = start.elapsed();
        if elapsed.as_millis() > 100 * texts.len() as u128 {
            warn!(batch = texts.len(), ?elapsed, "slow embedding batch");
        }
        Ok(vectors)
    }
}

impl Embedder for EmbeddingModel {
    fn embedder_id(&self) -> &str {
        &self.id
    }

    fn dim(&self) -> usize {
        self.dim
    }

    fn max_len(&self) -> usize {
        self.max_len
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.embed_prefixed(PASSAGE_PREFIX, texts)
    }

    fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_prefixed(QUERY_PREFIX, &[text.to_string()])?
            .pop()
            .ok_or_else(|| anyhow!("embedder returned no vector"))
    }
}

/// Locate the model directory: explicit setting, then `NEWSRAG_MODEL_DIR`,
/// then the conventional `models/multilingual-e5-large` locations.
pub fn resolve_model_dir(configured: Option<&str>) -> Result<PathBuf> {
    if let Some(dir) = configured {
        let p = newsrag_core::config::expand_path(dir);
        if p.exists() {
            return Ok(p);
        }
        warn!(dir = %p.display(), "configured model_dir does not exist");
    }
    if let Ok(dir) = std::env::var("NEWSRAG_MODEL_DIR") {
        let p = newsrag_core::config::expand_path(dir);
        if p.exists() {
            return Ok(p);
        }
    }
    for candidate in ["models/multilingual-e5-large", "../models/multilingual-e5-large"] {
        let p = Path::new(candidate);
        if p.exists() {
            return Ok(p.to_path_buf());
        }
    }
    Err(anyhow!("Could not locate the embedding model directory; set embedding.model_dir or NEWSRAG_MODEL_DIR"))
}
