//! Sentence embedders behind [`chunkeval_core::traits::Embedder`].
//!
//! [`EmbeddingModel`] runs a BERT or XLM-RoBERTa encoder with candle and
//! mean-pools the token states; [`HashingEmbedder`] is a weight-free stand-in.

pub mod device;
pub mod hashing;
pub mod pool;
pub mod tokenize;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, bail, Context, Result};
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use candle_transformers::models::xlm_roberta::{Config as XLMRobertaConfig, XLMRobertaModel};
use tokenizers::Tokenizer;

use chunkeval_core::config::{resolve_with_base, EmbeddingProvider, EmbeddingSettings};
use chunkeval_core::traits::Embedder;

pub use device::select_device;
pub use hashing::HashingEmbedder;
pub use pool::masked_mean_l2;
pub use tokenize::tokenize_batch;

pub const DEFAULT_MODEL_NAME: &str = "all-MiniLM-L6-v2";
pub const DEFAULT_HASHING_DIM: usize = 384;

enum Encoder {
    Bert(BertModel),
    XlmRoberta(XLMRobertaModel),
}

/// Sentence encoder loaded from a local Hugging Face model directory
/// (`config.json`, `tokenizer.json`, `model.safetensors` or `pytorch_model.bin`).
pub struct EmbeddingModel {
    encoder: Encoder,
    tokenizer: Tokenizer,
    device: Device,
    dim: usize,
    max_len: usize,
}

impl EmbeddingModel {
    pub fn load(model_dir: &Path, max_len: usize) -> Result<Self> {
        let device = select_device();
        tracing::info!(dir = %model_dir.display(), "loading sentence encoder");

        let tokenizer_path = model_dir.join("tokenizer.json");
        let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow!("Failed to load tokenizer from {}: {}", tokenizer_path.display(), e))?;
        // Padding and truncation are applied per batch in `tokenize_batch`.
        tokenizer.with_padding(None);
        tokenizer
            .with_truncation(None)
            .map_err(|e| anyhow!("Failed to reset tokenizer truncation: {}", e))?;

        let config_path = model_dir.join("config.json");
        let raw = std::fs::read_to_string(&config_path).with_context(|| format!("reading {}", config_path.display()))?;
        let value: serde_json::Value = serde_json::from_str(&raw)?;
        let model_type = value.get("model_type").and_then(|v| v.as_str()).unwrap_or("bert").to_string();
        let dim = value
            .get("hidden_size")
            .and_then(serde_json::Value::as_u64)
            .and_then(|d| usize::try_from(d).ok())
            .ok_or_else(|| anyhow!("{} has no hidden_size", config_path.display()))?;
        let max_positions = value
            .get("max_position_embeddings")
            .and_then(serde_json::Value::as_u64)
            .and_then(|d| usize::try_from(d).ok())
            .unwrap_or(max_len);

        let vb = load_weights(model_dir, &device)?;
        let encoder = match model_type.as_str() {
            "bert" => Encoder::Bert(BertModel::load(vb, &serde_json::from_str::<BertConfig>(&raw)?)?),
            "xlm-roberta" => Encoder::XlmRoberta(XLMRobertaModel::new(&serde_json::from_str::<XLMRobertaConfig>(&raw)?, vb)?),
            other => bail!("Unsupported encoder architecture '{}' in {}", other, config_path.display()),
        };
        tracing::info!(model_type, dim, "sentence encoder loaded");
        Ok(Self { encoder, tokenizer, device, dim, max_len: max_len.min(max_positions) })
    }

    fn forward(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let (input_ids, attention_mask) = tokenize_batch(&self.tokenizer, texts, self.max_len, &self.device)?;
        let token_type_ids = input_ids.zeros_like()?;
        let hidden = match &self.encoder {
            Encoder::Bert(m) => m.forward(&input_ids, &token_type_ids, Some(&attention_mask))?,
            Encoder::XlmRoberta(m) => m.forward(&input_ids, &attention_mask, &token_type_ids, None, None, None)?,
        };
        let pooled = masked_mean_l2(&hidden, &attention_mask)?;
        Ok(pooled.to_dtype(DType::F32)?.to_device(&Device::Cpu)?.to_vec2()?)
    }
}

fn load_weights(model_dir: &Path, device: &Device) -> Result<VarBuilder<'static>> {
    let safetensors = model_dir.join("model.safetensors");
    if safetensors.exists() {
        let bytes = std::fs::read(&safetensors).with_context(|| format!("reading {}", safetensors.display()))?;
        return Ok(VarBuilder::from_buffered_safetensors(bytes, DType::F32, device)?);
    }
    let pickle = model_dir.join("pytorch_model.bin");
    if pickle.exists() {
        let weights: std::collections::HashMap<String, Tensor> = candle_core::pickle::read_all(&pickle)?.into_iter().collect();
        return Ok(VarBuilder::from_tensors(weights, DType::F32, device));
    }
    bail!("No model.safetensors or pytorch_model.bin in {}", model_dir.display())
}

impl Embedder for EmbeddingModel {
    fn dim(&self) -> usize { self.dim }
    fn max_len(&self) -> usize { self.max_len }
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() { return Ok(Vec::new()); }
        let start = Instant::now();
        let out = self.forward(texts)?;
        tracing::debug!(batch = texts.len(), elapsed_ms = start.elapsed().as_millis(), "embedded batch");
        Ok(out)
    }
}

fn use_fake_embeddings() -> bool {
    std::env::var("APP_USE_FAKE_EMBEDDINGS")
        .ok()
        .is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true"))
}

/// Model from the default directory lookup, or the hashing embedder when
/// `APP_USE_FAKE_EMBEDDINGS` is set.
pub fn get_default_embedder() -> Result<Arc<dyn Embedder>> {
    if use_fake_embeddings() {
        tracing::info!("Using HashingEmbedder");
        return Ok(Arc::new(HashingEmbedder::new(DEFAULT_HASHING_DIM)));
    }
    Ok(Arc::new(EmbeddingModel::load(&resolve_model_dir(None)?, 256)?))
}

/// Build the embedder the settings ask for. Relative `model_dir` values are
/// resolved against `base`. A missing or unreadable model is a resource error.
pub fn embedder_from_settings(settings: &EmbeddingSettings, base: &Path) -> chunkeval_core::Result<Arc<dyn Embedder>> {
    if settings.provider == EmbeddingProvider::Hashing || use_fake_embeddings() {
        tracing::info!(dim = settings.hashing_dim, "Using HashingEmbedder");
        return Ok(Arc::new(HashingEmbedder::new(settings.hashing_dim)));
    }
    let explicit = settings.model_dir.as_deref().map(|d| resolve_with_base(base, d));
    let model = resolve_model_dir(explicit)
        .and_then(|dir| EmbeddingModel::load(&dir, settings.max_len))
        .map_err(|e| chunkeval_core::Error::Resource(format!("{e:#}")))?;
    Ok(Arc::new(model))
}

/// First existing directory among: `explicit`, `$APP_MODEL_DIR`, `$MODEL_DIR`,
/// `models/all-MiniLM-L6-v2`, `../models/all-MiniLM-L6-v2`.
pub fn resolve_model_dir(explicit: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(p) = explicit {
        if p.exists() { return Ok(p); }
        bail!("Model directory {} does not exist", p.display());
    }
    for var in ["APP_MODEL_DIR", "MODEL_DIR"] {
        if let Ok(dir) = std::env::var(var) {
            let p = PathBuf::from(&dir);
            if p.exists() {
                tracing::info!(var, dir = %p.display(), "using model dir from env");
                return Ok(p);
            }
        }
    }
    for root in ["models", "../models"] {
        let p = Path::new(root).join(DEFAULT_MODEL_NAME);
        if p.exists() {
            tracing::info!(dir = %p.display(), "using model dir");
            return Ok(p);
        }
    }
    Err(anyhow!("Could not locate {} model directory", DEFAULT_MODEL_NAME))
}
