use anyhow::{anyhow, ensure, Result};
use ort::session::builder::GraphOptimizationLevel;
use ort::session::{Session, SessionOutputs};
use ort::value::Value;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::EmbeddingModel;
use crate::config::EmbeddingConfig;

const MAX_BATCH_SIZE: usize = 16;

/// Sentence-transformer embedder (all-MiniLM-L6-v2 layout: `model.onnx` and
/// `tokenizer.json` in one directory). Mean pooling, L2-normalized output, so
/// inner product equals cosine similarity.
pub struct SentenceEmbedder {
    session: Arc<Mutex<Session>>,
    tokenizer: Arc<tokenizers::Tokenizer>,
    dimension: usize,
    max_length: usize,
    cache: Mutex<lru::LruCache<String, Vec<f32>>>,
}

impl SentenceEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let model_dir = &config.model_dir;
        let model_path = Self::find_model(model_dir)?;
        let tokenizer_path = model_dir.join("tokenizer.json");
        if !tokenizer_path.exists() {
            return Err(anyhow!(
                "Tokenizer not found at: {}",
                tokenizer_path.display()
            ));
        }

        let tokenizer = tokenizers::Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow!("Failed to load tokenizer: {:?}", e))?;

        let model_bytes = std::fs::read(&model_path)
            .map_err(|e| anyhow!("Failed to read model {}: {:?}", model_path.display(), e))?;

        let num_threads = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4);

        let session = Session::builder()
            .map_err(|e| anyhow!("Session builder: {:?}", e))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| anyhow!("Optimization level: {:?}", e))?
            .with_intra_threads(num_threads)
            .map_err(|e| anyhow!("Intra threads: {:?}", e))?
            .commit_from_memory(&model_bytes)
            .map_err(|e| anyhow!("Failed to load embedding model: {:?}", e))?;

        let cache_size = NonZeroUsize::new(config.cache_size.max(1))
            .ok_or_else(|| anyhow!("embedding cache size must be > 0"))?;

        let mut embedder = Self {
            session: Arc::new(Mutex::new(session)),
            tokenizer: Arc::new(tokenizer),
            dimension: 0,
            max_length: config.max_length,
            cache: Mutex::new(lru::LruCache::new(cache_size)),
        };

        // Embed once so the dimension comes from the model, not from config.
        let sample = embedder.embed_batch(&["mẫu"])?;
        embedder.dimension = sample.first().map(Vec::len).unwrap_or(0);
        ensure!(embedder.dimension > 0, "Embedding model produced an empty vector");

        tracing::info!(
            model = %model_path.display(),
            dimension = embedder.dimension,
            "Loaded sentence embedder"
        );
        Ok(embedder)
    }

    fn find_model(model_dir: &Path) -> Result<PathBuf> {
        let candidates = [
            model_dir.join("model_O4.onnx"),
            model_dir.join("model.onnx"),
            model_dir.join("onnx").join("model.onnx"),
        ];
        candidates
            .into_iter()
            .find(|path| path.exists())
            .ok_or_else(|| anyhow!("No embedding model found in: {}", model_dir.display()))
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut all_embeddings = Vec::with_capacity(texts.len());

        for batch in texts.chunks(MAX_BATCH_SIZE) {
            let encodings = batch
                .iter()
                .map(|text| {
                    self.tokenizer
                        .encode(*text, true)
                        .map_err(|e| anyhow!("Tokenization failed: {:?}", e))
                })
                .collect::<Result<Vec<_>>>()?;

            let padded_len = encodings
                .iter()
                .map(|e| e.get_ids().len().min(self.max_length))
                .max()
                .unwrap_or(1)
                .max(1);
            let batch_size = encodings.len();

            let mut ids_flat = Vec::with_capacity(batch_size * padded_len);
            let mut mask_flat = Vec::with_capacity(batch_size * padded_len);
            let mut type_flat = Vec::with_capacity(batch_size * padded_len);

            for enc in &encodings {
                let len = enc.get_ids().len().min(padded_len);
                for i in 0..len {
                    ids_flat.push(enc.get_ids()[i] as i64);
                    mask_flat.push(enc.get_attention_mask()[i] as i64);
                    type_flat.push(enc.get_type_ids()[i] as i64);
                }
                for _ in len..padded_len {
                    ids_flat.push(0i64);
                    mask_flat.push(0i64);
                    type_flat.push(0i64);
                }
            }

            let shape = vec![batch_size, padded_len];
            let input_ids = Value::from_array((shape.clone(), ids_flat))
                .map_err(|e| anyhow!("input_ids tensor: {:?}", e))?;
            let attention_mask = Value::from_array((shape.clone(), mask_flat.clone()))
                .map_err(|e| anyhow!("attention_mask tensor: {:?}", e))?;
            let token_type_ids = Value::from_array((shape, type_flat))
                .map_err(|e| anyhow!("token_type_ids tensor: {:?}", e))?;

            let inputs = ort::inputs![
                "input_ids" => input_ids,
                "attention_mask" => attention_mask,
                "token_type_ids" => token_type_ids,
            ];

            let mut session = self.session.lock();
            let outputs = session
                .run(inputs)
                .map_err(|e| anyhow!("Embedding inference failed: {:?}", e))?;

            let pooled = mean_pool(&outputs, &mask_flat, batch_size, padded_len)?;
            all_embeddings.extend(pooled.into_iter().map(l2_normalize));
        }

        Ok(all_embeddings)
    }
}

/// Masked mean over `[batch, seq, dim]` token embeddings. Uses the pre-pooled
/// `sentence_embedding` output when the export provides one.
fn mean_pool(
    outputs: &SessionOutputs,
    mask: &[i64],
    batch_size: usize,
    padded_len: usize,
) -> Result<Vec<Vec<f32>>> {
    if outputs.iter().any(|(name, _)| name == "sentence_embedding") {
        let (shape, data) = outputs["sentence_embedding"]
            .try_extract_tensor::<f32>()
            .map_err(|e| anyhow!("Failed to extract sentence_embedding: {:?}", e))?;
        let dim = shape[1] as usize;
        return Ok(data.chunks(dim).take(batch_size).map(<[f32]>::to_vec).collect());
    }

    let output_name = outputs
        .iter()
        .find(|(name, _)| *name == "last_hidden_state" || *name == "token_embeddings")
        .or_else(|| outputs.iter().next())
        .map(|(name, _)| name.to_string())
        .ok_or_else(|| anyhow!("Embedding model returned no outputs"))?;

    let (shape, data) = outputs[output_name.as_str()]
        .try_extract_tensor::<f32>()
        .map_err(|e| anyhow!("Failed to extract output '{}': {:?}", output_name, e))?;
    ensure!(shape.len() == 3, "Unexpected embedding output rank {}", shape.len());

    let seq_len = shape[1] as usize;
    let hidden_dim = shape[2] as usize;
    let mut pooled_batch = Vec::with_capacity(batch_size);

    for sample in 0..batch_size {
        let mut pooled = vec![0.0f32; hidden_dim];
        let mut mask_sum = 0.0f32;
        for pos in 0..seq_len.min(padded_len) {
            let mask_val = mask[sample * padded_len + pos] as f32;
            if mask_val > 0.0 {
                mask_sum += mask_val;
                let offset = (sample * seq_len + pos) * hidden_dim;
                for (dim, value) in pooled.iter_mut().enumerate() {
                    *value += data[offset + dim] * mask_val;
                }
            }
        }
        if mask_sum > 0.0 {
            pooled.iter_mut().for_each(|v| *v /= mask_sum);
        }
        pooled_batch.push(pooled);
    }

    Ok(pooled_batch)
}

fn l2_normalize(mut vec: Vec<f32>) -> Vec<f32> {
    let norm: f32 = vec.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 1e-12 {
        vec.iter_mut().for_each(|v| *v /= norm);
    }
    vec
}

impl EmbeddingModel for SentenceEmbedder {
    fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        if let Some(cached) = self.cache.lock().get(text) {
            return Ok(cached.clone());
        }
        let embedding = self
            .embed_batch(&[text])?
            .pop()
            .ok_or_else(|| anyhow!("Embedding model returned no vector for query"))?;
        self.cache.lock().put(text.to_string(), embedding.clone());
        Ok(embedding)
    }

    fn embed_document(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text])?
            .pop()
            .ok_or_else(|| anyhow!("Embedding model returned no vector for document"))
    }

    fn embed_documents(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let embeddings = self.embed_batch(texts)?;
        ensure!(
            embeddings.len() == texts.len(),
            "Embedding count {} != input count {}",
            embeddings.len(),
            texts.len()
        );
        Ok(embeddings)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}
