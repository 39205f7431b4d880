use crate::error::Result;
use crate::types::{Chunk, SearchOptions, SearchResult};

pub trait Embedder: Send + Sync {
    fn dim(&self) -> usize;
    fn max_len(&self) -> usize;
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;
}

/// Common contract of the lexical and embedding backends.
///
/// `add` does all indexing work up front; `search` only scores. An empty or
/// whitespace-only query is `Error::EmptyQuery`; an empty corpus yields no
/// results rather than an error.
pub trait Retriever: Send + Sync {
    fn add(&mut self, chunks: &[Chunk]) -> Result<()>;
    fn search(&self, query: &str, options: &SearchOptions) -> Result<Vec<SearchResult>>;
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
