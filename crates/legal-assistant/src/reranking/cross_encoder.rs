use anyhow::{anyhow, Result};
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::Reranker;

const MAX_BATCH: usize = 16;

/// Cross-encoder reranker using ms-marco-MiniLM-L6-v2
pub struct CrossEncoderReranker {
    session: Arc<Mutex<Session>>,
    tokenizer: Arc<tokenizers::Tokenizer>,
    max_length: usize,
}

impl CrossEncoderReranker {
    pub fn new(model_dir: &Path) -> Result<Self> {
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

        let model_bytes = std::fs::read(&model_path)?;
        let session = Session::builder()
            .map_err(|e| anyhow!("Session builder: {:?}", e))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| anyhow!("Opt level: {:?}", e))?
            .commit_from_memory(&model_bytes)
            .map_err(|e| anyhow!("Failed to load reranker model: {:?}", e))?;

        tracing::info!(model = %model_path.display(), "Loaded cross-encoder reranker");

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            tokenizer: Arc::new(tokenizer),
            max_length: 512,
        })
    }

    fn find_model(model_dir: &Path) -> Result<PathBuf> {
        let candidates = [
            model_dir.join("model_O4.onnx"),
            model_dir.join("model.onnx"),
            model_dir.join("onnx").join("model.onnx"),
        ];
        for path in &candidates {
            if path.exists() {
                return Ok(path.clone());
            }
        }
        Err(anyhow!(
            "No reranker model found in: {}",
            model_dir.display()
        ))
    }

    /// Score one batch of at most `MAX_BATCH` documents. Documents that fail to
    /// tokenize score `NEG_INFINITY` so the output stays aligned with the input.
    fn score_batch(&self, query: &str, documents: &[&str]) -> Result<Vec<f32>> {
        let encodings: Vec<Option<tokenizers::Encoding>> = documents
            .iter()
            .map(|doc| match self.tokenizer.encode((query, *doc), true) {
                Ok(enc) => Some(enc),
                Err(e) => {
                    tracing::warn!(error = ?e, "Cross-encoder tokenization failed");
                    None
                }
            })
            .collect();

        let encoded: Vec<&tokenizers::Encoding> = encodings.iter().flatten().collect();
        if encoded.is_empty() {
            return Ok(vec![f32::NEG_INFINITY; documents.len()]);
        }

        let max_len = encoded
            .iter()
            .map(|e| e.get_ids().len().min(self.max_length))
            .max()
            .unwrap_or(1)
            .max(1);
        let batch_size = encoded.len();

        let mut ids_flat = Vec::with_capacity(batch_size * max_len);
        let mut mask_flat = Vec::with_capacity(batch_size * max_len);
        let mut type_flat = Vec::with_capacity(batch_size * max_len);

        for enc in &encoded {
            let len = enc.get_ids().len().min(max_len);
            for i in 0..len {
                ids_flat.push(enc.get_ids()[i] as i64);
                mask_flat.push(enc.get_attention_mask()[i] as i64);
                type_flat.push(enc.get_type_ids()[i] as i64);
            }
            // Pad to max_len
            for _ in len..max_len {
                ids_flat.push(0i64);
                mask_flat.push(0i64);
                type_flat.push(0i64);
            }
        }

        let shape = vec![batch_size, max_len];
        let input_ids = Value::from_array((shape.clone(), ids_flat))
            .map_err(|e| anyhow!("batch input_ids: {:?}", e))?;
        let attention_mask = Value::from_array((shape.clone(), mask_flat))
            .map_err(|e| anyhow!("batch attention_mask: {:?}", e))?;
        let token_type_ids = Value::from_array((shape, type_flat))
            .map_err(|e| anyhow!("batch token_type_ids: {:?}", e))?;

        let inputs = ort::inputs![
            "input_ids" => input_ids,
            "attention_mask" => attention_mask,
            "token_type_ids" => token_type_ids,
        ];

        let mut session = self.session.lock();
        let outputs = session
            .run(inputs)
            .map_err(|e| anyhow!("Batch reranker inference failed: {:?}", e))?;

        let output_key = outputs
            .iter()
            .next()
            .map(|(name, _)| name.to_string())
            .unwrap_or_else(|| "logits".to_string());
        let (_shape, data) = outputs[output_key.as_str()]
            .try_extract_tensor::<f32>()
            .map_err(|e| anyhow!("Failed to extract batch logits: {:?}", e))?;

        if data.len() < batch_size {
            return Err(anyhow!(
                "Cross-encoder output count {} < candidate count {}",
                data.len(),
                batch_size
            ));
        }
        // [batch, 1] for ms-marco; for two-class heads take the positive logit.
        let stride = data.len() / batch_size;
        let mut logits = (0..batch_size).map(|i| data[i * stride + stride - 1]);

        Ok(encodings
            .iter()
            .map(|enc| match enc {
                Some(_) => logits.next().unwrap_or(f32::NEG_INFINITY),
                None => f32::NEG_INFINITY,
            })
            .collect())
    }
}

impl Reranker for CrossEncoderReranker {
    fn score(&self, query: &str, documents: &[&str]) -> Result<Vec<f32>> {
        let mut scores = Vec::with_capacity(documents.len());
        for batch in documents.chunks(MAX_BATCH) {
            scores.extend(self.score_batch(query, batch)?);
        }
        Ok(scores)
    }
}
