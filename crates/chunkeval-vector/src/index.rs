use std::sync::Arc;

use chunkeval_core::traits::{Embedder, Retriever};
use chunkeval_core::{Chunk, Error, Result, SearchOptions, SearchResult};

pub const DEFAULT_BATCH_SIZE: usize = 32;

pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Chunks paired with their embeddings.
///
/// `add` embeds eagerly in batches, so `search` only embeds the query.
/// Similarity is the raw inner product; filters are applied after scoring and
/// boosts are ignored.
pub struct EmbeddingIndex {
    embedder: Arc<dyn Embedder>,
    batch_size: usize,
    entries: Vec<(Chunk, Vec<f32>)>,
}

impl EmbeddingIndex {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self::with_batch_size(embedder, DEFAULT_BATCH_SIZE)
    }

    pub fn with_batch_size(embedder: Arc<dyn Embedder>, batch_size: usize) -> Self {
        Self { embedder, batch_size: batch_size.max(1), entries: Vec::new() }
    }

    pub fn embedder(&self) -> &Arc<dyn Embedder> { &self.embedder }

    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let vectors = self.embedder.embed_batch(texts).map_err(Error::backend)?;
        if vectors.len() != texts.len() {
            return Err(Error::backend(anyhow::anyhow!("embedder returned {} vectors for {} texts", vectors.len(), texts.len())));
        }
        let dim = self.embedder.dim();
        if let Some(v) = vectors.iter().find(|v| v.len() != dim) {
            return Err(Error::backend(anyhow::anyhow!("embedding has dim {} but embedder reports {}", v.len(), dim)));
        }
        Ok(vectors)
    }
}

impl Retriever for EmbeddingIndex {
    fn add(&mut self, chunks: &[Chunk]) -> Result<()> {
        if chunks.is_empty() {
            tracing::warn!("No chunks provided to add to embedding index");
            return Ok(());
        }
        let mut embedded = Vec::with_capacity(chunks.len());
        for batch in chunks.chunks(self.batch_size) {
            let texts: Vec<String> = batch.iter().map(|c| c.content.clone()).collect();
            let vectors = self.embed(&texts)?;
            embedded.extend(batch.iter().cloned().zip(vectors));
        }
        self.entries.extend(embedded);
        tracing::debug!(added = chunks.len(), total = self.entries.len(), dim = self.embedder.dim(), "embedded chunks");
        Ok(())
    }

    fn search(&self, query: &str, options: &SearchOptions) -> Result<Vec<SearchResult>> {
        if query.trim().is_empty() { return Err(Error::EmptyQuery); }
        options.validate()?;
        if self.entries.is_empty() {
            tracing::warn!("No documents in index to search");
            return Ok(Vec::new());
        }
        let q = self.embed(&[query.to_string()])?.remove(0);
        let mut scored: Vec<(f32, &Chunk)> = self
            .entries
            .iter()
            .filter(|(chunk, _)| options.accepts(chunk))
            .map(|(chunk, v)| (dot(&q, v), chunk))
            .collect();
        // Stable: equal scores keep insertion order.
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        let results: Vec<SearchResult> = scored
            .into_iter()
            .take(options.num_results)
            .map(|(score, chunk)| SearchResult::from_chunk(chunk, Some(score)))
            .collect();
        tracing::debug!(query, hits = results.len(), "embedding search");
        Ok(results)
    }

    fn len(&self) -> usize { self.entries.len() }
}
