//! The two retrieval variants behind one closed type, chosen once when the
//! backend is built.

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use chunkeval_core::config::Settings;
use chunkeval_core::traits::{Embedder, Retriever};
use chunkeval_core::{Chunk, Error, Result, SearchField, SearchOptions, SearchResult};
use chunkeval_embed::embedder_from_settings;
use chunkeval_text::LexicalIndex;
use chunkeval_vector::EmbeddingIndex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchType {
    Lexical,
    Embedding,
}

impl SearchType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lexical => "lexical",
            Self::Embedding => "embedding",
        }
    }
}

impl fmt::Display for SearchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for SearchType {
    type Err = Error;

    /// Also accepts the legacy tags `minsearch` and `sentence_transformers`.
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lexical" | "minsearch" => Ok(Self::Lexical),
            "embedding" | "sentence_transformers" => Ok(Self::Embedding),
            other => Err(Error::UnsupportedBackend(other.to_string())),
        }
    }
}

pub enum SearchBackend {
    Lexical(LexicalIndex),
    Embedding(EmbeddingIndex),
}

impl SearchBackend {
    /// `embedder` is required for the embedding variant and ignored otherwise.
    pub fn new(
        search_type: SearchType,
        text_fields: Vec<SearchField>,
        embedder: Option<Arc<dyn Embedder>>,
        batch_size: usize,
    ) -> Result<Self> {
        tracing::debug!(%search_type, "building search backend");
        match search_type {
            SearchType::Lexical => Ok(Self::Lexical(LexicalIndex::new(text_fields))),
            SearchType::Embedding => {
                let embedder = embedder.ok_or_else(|| Error::Resource("embedding search needs an embedding model".into()))?;
                Ok(Self::Embedding(EmbeddingIndex::with_batch_size(embedder, batch_size)))
            }
        }
    }

    pub fn lexical() -> Self { Self::Lexical(LexicalIndex::default()) }

    pub fn embedding(embedder: Arc<dyn Embedder>) -> Self { Self::Embedding(EmbeddingIndex::new(embedder)) }

    /// Build from configuration, loading the embedder when one is needed.
    /// Relative model paths resolve against `base`.
    pub fn from_settings(settings: &Settings, base: &Path) -> Result<Self> {
        let search_type: SearchType = settings.search.search_type.parse()?;
        let embedder = match search_type {
            SearchType::Embedding => Some(embedder_from_settings(&settings.embedding, base)?),
            SearchType::Lexical => None,
        };
        Self::new(search_type, settings.search.text_fields.clone(), embedder, settings.embedding.batch_size)
    }

    pub fn search_type(&self) -> SearchType {
        match self {
            Self::Lexical(_) => SearchType::Lexical,
            Self::Embedding(_) => SearchType::Embedding,
        }
    }

    fn inner(&self) -> &dyn Retriever {
        match self {
            Self::Lexical(i) => i,
            Self::Embedding(i) => i,
        }
    }
}

impl Retriever for SearchBackend {
    fn add(&mut self, chunks: &[Chunk]) -> Result<()> {
        match self {
            Self::Lexical(i) => i.add(chunks),
            Self::Embedding(i) => i.add(chunks),
        }
    }

    fn search(&self, query: &str, options: &SearchOptions) -> Result<Vec<SearchResult>> {
        self.inner().search(query, options)
    }

    fn len(&self) -> usize { self.inner().len() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chunkeval_embed::HashingEmbedder;

    fn chunks() -> Vec<Chunk> {
        ["Users often feel confused by modals.", "Loading spinners frustrate impatient users."]
            .iter()
            .enumerate()
            .map(|(i, c)| Chunk {
                content: (*c).to_string(),
                title: "Untitled".into(),
                source: format!("q{}", i + 1),
                chunk_index: 0,
                tags: Vec::new(),
            })
            .collect()
    }

    #[test]
    fn parses_tags_and_aliases() {
        assert_eq!("lexical".parse::<SearchType>().expect("tag"), SearchType::Lexical);
        assert_eq!("minsearch".parse::<SearchType>().expect("tag"), SearchType::Lexical);
        assert_eq!("Embedding".parse::<SearchType>().expect("tag"), SearchType::Embedding);
        assert_eq!("sentence_transformers".parse::<SearchType>().expect("tag"), SearchType::Embedding);
        assert!(matches!("bm42".parse::<SearchType>(), Err(Error::UnsupportedBackend(_))));
        assert_eq!(SearchType::Embedding.to_string(), "embedding");
    }

    #[test]
    fn embedding_without_model_is_a_resource_error() {
        let err = SearchBackend::new(SearchType::Embedding, SearchField::ALL.to_vec(), None, 8).err();
        assert!(matches!(err, Some(Error::Resource(_))));
    }

    #[test]
    fn both_variants_find_the_modal_chunk() {
        let embedder: Arc<dyn Embedder> = Arc::new(HashingEmbedder::new(256));
        for search_type in [SearchType::Lexical, SearchType::Embedding] {
            let mut backend = SearchBackend::new(search_type, SearchField::ALL.to_vec(), Some(embedder.clone()), 8).expect("backend");
            assert_eq!(backend.search_type(), search_type);
            backend.add(&chunks()).expect("add");
            assert_eq!(backend.len(), 2);
            let results = backend.search("confused by modals", &SearchOptions::top(1)).expect("search");
            assert_eq!(results[0].source, "q1", "{search_type}");
            assert!(matches!(backend.search("", &SearchOptions::top(1)), Err(Error::EmptyQuery)));
        }
    }

    #[test]
    fn from_settings_honours_search_type() {
        let mut settings = Settings::default();
        settings.search.search_type = "embedding".into();
        settings.embedding.provider = chunkeval_core::config::EmbeddingProvider::Hashing;
        let backend = SearchBackend::from_settings(&settings, Path::new(".")).expect("backend");
        assert_eq!(backend.search_type(), SearchType::Embedding);

        settings.search.search_type = "fuzzy".into();
        assert!(matches!(SearchBackend::from_settings(&settings, Path::new(".")), Err(Error::UnsupportedBackend(_))));
    }
}
