//! chunkeval-core
//!
//! Data model, configuration, the character-window chunker and input loaders
//! shared by the search backends and the evaluator.

pub mod chunker;
pub mod config;
pub mod error;
pub mod loader;
pub mod traits;
pub mod types;

pub use chunker::{chunk_documents, Chunker, ChunkingConfig};
pub use error::{Error, Result};
pub use types::{
    Chunk, Document, EvaluationResult, GroundTruthItem, ParameterCombination, RelevanceRow, SearchField,
    SearchOptions, SearchResult,
};
