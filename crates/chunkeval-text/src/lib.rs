//! chunkeval-text
//!
//! Lexical search backend: an in-memory Tantivy index over chunk text fields,
//! refit on every `add`. See `examples/` for CLI-like usage during development.

pub mod tantivy_utils;
pub mod index;

pub use index::LexicalIndex;
