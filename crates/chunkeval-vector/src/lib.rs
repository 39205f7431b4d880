//! Dense-vector variant of the search backend: chunk embeddings held in
//! memory and scored by brute-force inner product.

pub mod index;

pub use index::{dot, EmbeddingIndex, DEFAULT_BATCH_SIZE};
