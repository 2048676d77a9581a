use anyhow::{ensure, Context, Result};

use super::dense::DenseIndex;
use super::hybrid::{union_candidates, HybridSource};
use super::text_search::LexicalIndex;
use crate::embeddings::EmbeddingModel;
use crate::reranking::{rerank_chunks, Reranker};
use crate::types::LawChunk;

/// One immutable generation of the law index: the chunk store plus the dense
/// and lexical indexes built from it, all sharing one position space.
pub struct LawIndex {
    chunks: Vec<LawChunk>,
    dense: DenseIndex,
    lexical: LexicalIndex,
}

impl LawIndex {
    pub fn empty(dimension: usize) -> Result<Self> {
        Self::from_parts(Vec::new(), DenseIndex::empty(dimension))
    }

    pub fn build(chunks: Vec<LawChunk>, embedder: &dyn EmbeddingModel) -> Result<Self> {
        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        let embeddings = if texts.is_empty() {
            Vec::new()
        } else {
            embedder
                .embed_documents(&texts)
                .context("Failed to embed law chunks")?
        };
        let dense = DenseIndex::from_embeddings(embedder.dimension(), embeddings)?;
        Self::from_parts(chunks, dense)
    }

    /// Assemble an index from a chunk store and matching dense vectors. The
    /// lexical index is always rebuilt from the chunk text.
    pub fn from_parts(chunks: Vec<LawChunk>, dense: DenseIndex) -> Result<Self> {
        ensure!(
            chunks.len() == dense.len(),
            "Chunk store has {} entries but dense index has {}",
            chunks.len(),
            dense.len()
        );
        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        let lexical = LexicalIndex::build(&texts)?;
        Ok(Self {
            chunks,
            dense,
            lexical,
        })
    }

    pub fn chunks(&self) -> &[LawChunk] {
        &self.chunks
    }

    pub fn dense(&self) -> &DenseIndex {
        &self.dense
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Dense top-`top_k` ∪ lexical top-`top_k`, reranked, first `final_k` kept.
    /// Without a reranker the union order is kept.
    pub fn search(
        &self,
        query: &str,
        top_k: usize,
        final_k: usize,
        embedder: &dyn EmbeddingModel,
        reranker: Option<&dyn Reranker>,
    ) -> Result<Vec<LawChunk>> {
        if self.is_empty() || top_k == 0 || final_k == 0 {
            return Ok(Vec::new());
        }

        let query_vec = embedder.embed_query(query)?;
        let dense_hits = self.dense.search(&query_vec, top_k);
        let lexical_hits = self.lexical.search(query, top_k)?;
        let candidates = union_candidates(&dense_hits, &lexical_hits);

        tracing::debug!(
            dense = dense_hits.len(),
            lexical = lexical_hits.len(),
            both = candidates.iter().filter(|c| c.source == HybridSource::Both).count(),
            candidates = candidates.len(),
            "Hybrid candidate union"
        );

        let pool: Vec<LawChunk> = candidates
            .iter()
            .filter_map(|c| self.chunks.get(c.position).cloned())
            .collect();

        match reranker {
            Some(reranker) => rerank_chunks(reranker, query, pool, final_k),
            None => Ok(pool.into_iter().take(final_k).collect()),
        }
    }
}
