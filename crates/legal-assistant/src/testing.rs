//! Deterministic stand-ins for the model-backed seams, used by unit tests.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::hash_map::DefaultHasher;
use std::collections::HashSet;
use std::hash::{Hash, Hasher};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::embeddings::EmbeddingModel;
use crate::indexing::LawLibrary;
use crate::llm::{GenerationClient, GenerationConfig, LLMProvider, ProviderInfo};
use crate::processing::LawChunker;
use crate::reranking::Reranker;
use crate::types::LawChunk;

fn words(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn law_chunk(body: &str, source: &str) -> LawChunk {
    LawChunk::new(format!("[NGUỒN: {}]\n{}", source, body), source)
}

pub fn write_law(dir: &Path, name: &str, text: &str) {
    std::fs::write(dir.join(name), text).expect("write law fixture");
}

/// Bag-of-words hashed into `dimension` buckets, L2-normalized.
pub struct HashEmbedder {
    dimension: usize,
}

impl HashEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

impl EmbeddingModel for HashEmbedder {
    fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_document(text)
    }

    fn embed_document(&self, text: &str) -> Result<Vec<f32>> {
        let mut vec = vec![0.0f32; self.dimension];
        for word in words(text) {
            let mut hasher = DefaultHasher::new();
            word.hash(&mut hasher);
            vec[(hasher.finish() % self.dimension as u64) as usize] += 1.0;
        }
        let norm = vec.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            vec.iter_mut().for_each(|v| *v /= norm);
        }
        Ok(vec)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Delays every query embedding, standing in for slow model inference.
pub struct SlowEmbedder<E> {
    inner: E,
    delay: Duration,
}

impl<E: EmbeddingModel> SlowEmbedder<E> {
    pub fn new(inner: E, delay: Duration) -> Self {
        Self { inner, delay }
    }
}

impl<E: EmbeddingModel> EmbeddingModel for SlowEmbedder<E> {
    fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        std::thread::sleep(self.delay);
        self.inner.embed_query(text)
    }

    fn embed_document(&self, text: &str) -> Result<Vec<f32>> {
        self.inner.embed_document(text)
    }

    fn dimension(&self) -> usize {
        self.inner.dimension()
    }
}

/// Counts document embeddings.
pub struct CountingEmbedder<E> {
    inner: E,
    documents: AtomicUsize,
}

impl<E: EmbeddingModel> CountingEmbedder<E> {
    pub fn new(inner: E) -> Self {
        Self {
            inner,
            documents: AtomicUsize::new(0),
        }
    }

    pub fn documents_embedded(&self) -> usize {
        self.documents.load(Ordering::SeqCst)
    }
}

impl<E: EmbeddingModel> EmbeddingModel for CountingEmbedder<E> {
    fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        self.inner.embed_query(text)
    }

    fn embed_document(&self, text: &str) -> Result<Vec<f32>> {
        self.documents.fetch_add(1, Ordering::SeqCst);
        self.inner.embed_document(text)
    }

    fn dimension(&self) -> usize {
        self.inner.dimension()
    }
}

/// Scores a document by how many distinct query words it contains.
pub struct OverlapReranker;

impl Reranker for OverlapReranker {
    fn score(&self, query: &str, documents: &[&str]) -> Result<Vec<f32>> {
        let query_words: HashSet<String> = words(query).into_iter().collect();
        Ok(documents
            .iter()
            .map(|doc| {
                let doc_words: HashSet<String> = words(doc).into_iter().collect();
                query_words.intersection(&doc_words).count() as f32
            })
            .collect())
    }
}

type Handler = Box<dyn Fn(&str, &GenerationConfig) -> Result<String> + Send + Sync>;

/// LLM provider driven by a closure. Records every prompt and config it sees.
pub struct ScriptedProvider {
    handler: Handler,
    prompts: Mutex<Vec<String>>,
    configs: Mutex<Vec<GenerationConfig>>,
}

impl ScriptedProvider {
    pub fn new(
        handler: impl Fn(&str, &GenerationConfig) -> Result<String> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            handler: Box::new(handler),
            prompts: Mutex::new(Vec::new()),
            configs: Mutex::new(Vec::new()),
        })
    }

    pub fn replying(text: &str) -> Arc<Self> {
        let text = text.to_string();
        Self::new(move |_, _| Ok(text.clone()))
    }

    pub fn failing() -> Arc<Self> {
        Self::new(|_, _| Err(anyhow!("backend unavailable")))
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }

    pub fn configs(&self) -> Vec<GenerationConfig> {
        self.configs.lock().clone()
    }
}

#[async_trait]
impl LLMProvider for ScriptedProvider {
    async fn generate(&self, prompt: &str, config: &GenerationConfig) -> Result<String> {
        self.prompts.lock().push(prompt.to_string());
        self.configs.lock().push(config.clone());
        (self.handler)(prompt, config)
    }

    fn info(&self) -> ProviderInfo {
        ProviderInfo {
            name: "Scripted".to_string(),
            model: "scripted".to_string(),
        }
    }
}

pub fn client(provider: Arc<ScriptedProvider>) -> GenerationClient {
    GenerationClient::new(
        provider,
        GenerationConfig {
            max_tokens: 1024,
            temperature: 0.3,
            top_p: 0.95,
            top_k: 40,
            json_response: false,
        },
    )
}

/// Library over the fakes, persisting to `index_dir`.
pub fn library(index_dir: &Path) -> LawLibrary {
    LawLibrary::new(
        Arc::new(HashEmbedder::new(64)),
        Some(Arc::new(OverlapReranker)),
        LawChunker::new(20, 4500),
        index_dir,
    )
    .expect("build test library")
}
