//! Law library: builds, persists, reloads and serves the hybrid law index.
//!
//! Each build produces a fresh immutable [`LawIndex`] that is swapped in whole,
//! so a search always sees one consistent generation. Builds are serialized by
//! a dedicated lock; searches only hold the read lock long enough to clone the
//! current `Arc`.

use anyhow::{Context, Result};
use parking_lot::{Mutex, RwLock};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use crate::config::AssistantConfig;
use crate::embeddings::{EmbeddingModel, SentenceEmbedder};
use crate::processing::{filter_valid_laws, DocumentReader, LawChunker};
use crate::reranking::{CrossEncoderReranker, Reranker};
use crate::search::LawIndex;
use crate::storage::{load_index_files, remove_index_files, save_index_files, IndexLoadError};
use crate::types::LawChunk;

// ── Service ────────────────────────────────────────────────────────────────

pub struct LawLibrary {
    embedder: Arc<dyn EmbeddingModel>,
    reranker: Option<Arc<dyn Reranker>>,
    chunker: LawChunker,
    reader: DocumentReader,
    index_dir: PathBuf,
    current: RwLock<Arc<LawIndex>>,
    build_lock: Mutex<()>,
}

impl LawLibrary {
    /// Starts with an empty index; call [`load_or_build`](Self::load_or_build)
    /// or one of the build methods to populate it.
    pub fn new(
        embedder: Arc<dyn EmbeddingModel>,
        reranker: Option<Arc<dyn Reranker>>,
        chunker: LawChunker,
        index_dir: impl Into<PathBuf>,
    ) -> Result<Self> {
        if reranker.is_none() {
            tracing::warn!("No reranker configured; search results keep candidate order");
        }
        let empty = LawIndex::empty(embedder.dimension())?;
        Ok(Self {
            embedder,
            reranker,
            chunker,
            reader: DocumentReader::new(),
            index_dir: index_dir.into(),
            current: RwLock::new(Arc::new(empty)),
            build_lock: Mutex::new(()),
        })
    }

    /// Load the embedder and, when enabled, the cross-encoder described by
    /// `config`. A cross-encoder that fails to load disables re-ranking. The
    /// index starts empty.
    pub fn from_config(config: &AssistantConfig) -> Result<Self> {
        let embedder = SentenceEmbedder::new(&config.embedding).with_context(|| {
            format!("failed to load embedding model from {}", config.embedding.model_dir.display())
        })?;

        let reranker: Option<Arc<dyn Reranker>> = if config.reranker.enabled {
            match CrossEncoderReranker::new(&config.reranker.model_dir) {
                Ok(reranker) => Some(Arc::new(reranker)),
                Err(e) => {
                    tracing::warn!(error = %e, "Cross-encoder unavailable, re-ranking disabled");
                    None
                }
            }
        } else {
            None
        };

        Self::new(
            Arc::new(embedder),
            reranker,
            LawChunker::new(config.chunking.min_fragment_len, config.chunking.max_chunk_size),
            &config.index_dir,
        )
    }

    pub fn snapshot(&self) -> Arc<LawIndex> {
        self.current.read().clone()
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }

    pub fn index_dir(&self) -> &Path {
        &self.index_dir
    }

    /// Valid (newest-year) law files in `laws_dir`, read and chunked in file order.
    pub fn collect_chunks(&self, laws_dir: &Path) -> Vec<LawChunk> {
        let mut chunks = Vec::new();
        for path in filter_valid_laws(laws_dir) {
            let source = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let text = self.reader.read(&path);
            if text.trim().is_empty() {
                tracing::warn!(file = %source, "Law file is empty or unreadable, skipping");
                continue;
            }
            let pieces = self.chunker.chunk(&text, &source);
            tracing::info!(file = %source, chunks = pieces.len(), "Chunked law file");
            chunks.extend(pieces.into_iter().map(|text| LawChunk::new(text, source.clone())));
        }
        chunks
    }

    /// Replace the served index with one built from `chunks`. On error the
    /// previous index stays in place.
    pub fn build(&self, chunks: Vec<LawChunk>) -> Result<usize> {
        let _guard = self.build_lock.lock();
        self.build_locked(chunks)
    }

    fn build_locked(&self, chunks: Vec<LawChunk>) -> Result<usize> {
        let started = Instant::now();
        let index = LawIndex::build(chunks, self.embedder.as_ref())?;
        let count = index.len();
        *self.current.write() = Arc::new(index);
        tracing::info!(
            chunks = count,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Built law index"
        );
        Ok(count)
    }

    /// Collect, build and persist from a laws directory.
    pub fn build_from_dir(&self, laws_dir: &Path) -> Result<usize> {
        let _guard = self.build_lock.lock();
        let chunks = self.collect_chunks(laws_dir);
        if chunks.is_empty() {
            tracing::warn!(dir = %laws_dir.display(), "No law chunks found; index is empty");
        }
        let count = self.build_locked(chunks)?;
        self.persist()?;
        Ok(count)
    }

    /// Write the current index to `index_dir`. An empty index removes any
    /// previously persisted files instead, so a later start rebuilds from the
    /// laws directory rather than reloading laws that are gone.
    pub fn persist(&self) -> Result<()> {
        let index = self.snapshot();
        if index.is_empty() {
            tracing::warn!("Law index is empty, clearing persisted files");
            return remove_index_files(&self.index_dir);
        }
        save_index_files(&self.index_dir, index.chunks(), index.dense())
    }

    /// Reload the persisted index. Returns `false` and keeps the current index
    /// when the files are missing or inconsistent.
    pub fn reload(&self) -> bool {
        match self.try_reload() {
            Ok(count) => {
                tracing::info!(chunks = count, dir = %self.index_dir.display(), "Reloaded law index");
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, dir = %self.index_dir.display(), "Law index reload failed");
                false
            }
        }
    }

    pub fn try_reload(&self) -> Result<usize, IndexLoadError> {
        let _guard = self.build_lock.lock();
        let (chunks, dense) = load_index_files(&self.index_dir, self.embedder.dimension())?;
        let index =
            LawIndex::from_parts(chunks, dense).map_err(|e| IndexLoadError::Lexical(e.to_string()))?;
        let count = index.len();
        *self.current.write() = Arc::new(index);
        Ok(count)
    }

    /// Startup policy: reuse a persisted non-empty index, otherwise build from
    /// `laws_dir` and persist.
    pub fn load_or_build(&self, laws_dir: &Path) -> Result<usize> {
        if self.reload() && !self.is_empty() {
            return Ok(self.len());
        }
        self.build_from_dir(laws_dir)
    }

    /// Hybrid search over the current index generation.
    pub fn search(&self, query: &str, top_k: usize, final_k: usize) -> Result<Vec<LawChunk>> {
        let index = self.snapshot();
        let results = index.search(
            query,
            top_k,
            final_k,
            self.embedder.as_ref(),
            self.reranker.as_deref(),
        )?;
        tracing::debug!(query, results = results.len(), "Law search");
        Ok(results)
    }

    /// [`search`](Self::search) on the blocking pool. Embedding and
    /// cross-encoder inference never run on an async worker.
    pub async fn search_async(&self, query: &str, top_k: usize, final_k: usize) -> Result<Vec<LawChunk>> {
        let index = self.snapshot();
        let embedder = Arc::clone(&self.embedder);
        let reranker = self.reranker.clone();
        let query = query.to_string();
        let results = tokio::task::spawn_blocking(move || {
            index.search(&query, top_k, final_k, embedder.as_ref(), reranker.as_deref())
        })
        .await
        .context("law search task failed")??;
        tracing::debug!(results = results.len(), "Law search");
        Ok(results)
    }
}
