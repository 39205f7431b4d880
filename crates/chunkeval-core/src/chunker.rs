//! Fixed-size, optionally overlapping character windows over document text.

use crate::error::{Error, Result};
use crate::types::{Chunk, Document};

pub const DEFAULT_CHUNK_TITLE: &str = "Untitled";
pub const DEFAULT_CHUNK_SOURCE: &str = "Unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingConfig {
    /// Window length in characters.
    pub chunk_size: usize,
    /// Characters shared by consecutive windows; must stay below `chunk_size`.
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self { chunk_size: 500, overlap: 0 }
    }
}

impl ChunkingConfig {
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self> {
        let config = Self { chunk_size, overlap };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::Validation("chunk_size must be greater than 0".into()));
        }
        if self.overlap >= self.chunk_size {
            return Err(Error::Validation(format!(
                "overlap ({}) must be smaller than chunk_size ({})",
                self.overlap, self.chunk_size
            )));
        }
        Ok(())
    }

    fn step(&self) -> usize {
        self.chunk_size - self.overlap
    }
}

/// Splits documents into chunks and tags them with their parent's metadata.
#[derive(Debug, Clone)]
pub struct Chunker {
    config: ChunkingConfig,
    default_title: String,
    default_source: String,
}

impl Chunker {
    pub fn new(config: ChunkingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            default_title: DEFAULT_CHUNK_TITLE.to_string(),
            default_source: DEFAULT_CHUNK_SOURCE.to_string(),
        })
    }

    pub fn with_defaults(mut self, title: impl Into<String>, source: impl Into<String>) -> Self {
        self.default_title = title.into();
        self.default_source = source.into();
        self
    }

    pub fn config(&self) -> ChunkingConfig {
        self.config
    }

    /// Windows over `text`, measured in characters.
    ///
    /// Starts at offset 0 and advances by `chunk_size - overlap` until the
    /// offset reaches the end, so a text of `L` chars yields
    /// `ceil(L / (chunk_size - overlap))` windows. Trailing windows may be
    /// suffixes of their predecessor. Empty text yields no windows.
    pub fn split_text<'a>(&self, text: &'a str) -> Vec<&'a str> {
        if text.is_empty() {
            return Vec::new();
        }
        // Byte offset of every char boundary, including the end of the text.
        let bounds: Vec<usize> = text
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(text.len()))
            .collect();
        let len = bounds.len() - 1;
        let step = self.config.step();
        let mut windows = Vec::with_capacity(len.div_ceil(step));
        let mut start = 0;
        while start < len {
            let end = (start + self.config.chunk_size).min(len);
            windows.push(&text[bounds[start]..bounds[end]]);
            start += step;
        }
        windows
    }

    pub fn chunk(&self, document: &Document) -> Vec<Chunk> {
        let title = document.title.clone().unwrap_or_else(|| self.default_title.clone());
        let source = document.source.clone().unwrap_or_else(|| self.default_source.clone());
        self.split_text(&document.content)
            .into_iter()
            .enumerate()
            .map(|(chunk_index, content)| Chunk {
                content: content.to_string(),
                title: title.clone(),
                source: source.clone(),
                chunk_index,
                tags: document.tags.clone(),
            })
            .collect()
    }

    pub fn chunk_documents(&self, documents: &[Document]) -> Vec<Chunk> {
        let chunks: Vec<Chunk> = documents.iter().flat_map(|d| self.chunk(d)).collect();
        tracing::debug!(
            documents = documents.len(),
            chunks = chunks.len(),
            chunk_size = self.config.chunk_size,
            overlap = self.config.overlap,
            "chunked documents"
        );
        chunks
    }
}

/// Chunk every document with the default title/source sentinels.
pub fn chunk_documents(documents: &[Document], chunk_size: usize, overlap: usize) -> Result<Vec<Chunk>> {
    let chunker = Chunker::new(ChunkingConfig::new(chunk_size, overlap)?)?;
    Ok(chunker.chunk_documents(documents))
}
