//! Domain types shared by the chunker, both search backends and the evaluator.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// A source document as handed over by a loader.
///
/// `title` and `source` are optional on input; the chunker substitutes the
/// configured defaults ("Untitled" / "Unknown") when they are missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Document {
    pub fn new(content: impl Into<String>) -> Self {
        Self { content: content.into(), ..Self::default() }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }
}

/// A window of a document that is independently indexed.
///
/// - `content`: substring of the parent document's content
/// - `title`/`source`: copied from the parent; `source` is the unit of relevance
/// - `chunk_index`: position within the parent document, starting at 0
/// - `tags`: inherited from the parent document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub content: String,
    pub title: String,
    pub source: String,
    pub chunk_index: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

/// A labeled (query, correct source) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroundTruthItem {
    #[serde(rename = "question")]
    pub query: String,
    #[serde(rename = "source")]
    pub expected_source: String,
}

impl GroundTruthItem {
    pub fn new(query: impl Into<String>, expected_source: impl Into<String>) -> Self {
        Self { query: query.into(), expected_source: expected_source.into() }
    }
}

/// One retrieved chunk, best-first within a result list.
///
/// `similarity_score` is engine-specific: a synthetic rank proxy for the
/// lexical backend, the raw inner product for the embedding backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub content: String,
    pub title: String,
    pub source: String,
    pub chunk_index: usize,
    pub similarity_score: Option<f32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl SearchResult {
    pub fn from_chunk(chunk: &Chunk, similarity_score: Option<f32>) -> Self {
        Self {
            content: chunk.content.clone(),
            title: chunk.title.clone(),
            source: chunk.source.clone(),
            chunk_index: chunk.chunk_index,
            similarity_score,
            tags: chunk.tags.clone(),
        }
    }
}

/// Chunk fields addressable by boosts and filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchField {
    Content,
    Title,
    Source,
    Tags,
}

impl SearchField {
    pub const ALL: [SearchField; 4] = [Self::Content, Self::Title, Self::Source, Self::Tags];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Content => "content",
            Self::Title => "title",
            Self::Source => "source",
            Self::Tags => "tags",
        }
    }

    /// Keyword fields support exact-match filtering; `content` does not.
    pub fn is_keyword(self) -> bool {
        !matches!(self, Self::Content)
    }

    /// Exact-match test of a chunk against a filter value on this field.
    pub fn matches(self, chunk: &Chunk, value: &str) -> bool {
        match self {
            Self::Content => chunk.content == value,
            Self::Title => chunk.title == value,
            Self::Source => chunk.source == value,
            Self::Tags => chunk.tags.iter().any(|t| t == value),
        }
    }
}

impl fmt::Display for SearchField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SearchField {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "content" => Ok(Self::Content),
            "title" => Ok(Self::Title),
            "source" => Ok(Self::Source),
            "tags" | "tag" => Ok(Self::Tags),
            other => Err(Error::Validation(format!("unknown search field '{other}'"))),
        }
    }
}

/// Per-call knobs for `search`: result count, field boosts and exact filters.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOptions {
    pub num_results: usize,
    pub boost: HashMap<SearchField, f32>,
    pub filter: HashMap<SearchField, String>,
}

impl SearchOptions {
    pub fn top(num_results: usize) -> Self {
        Self { num_results, boost: HashMap::new(), filter: HashMap::new() }
    }

    pub fn boost(mut self, field: SearchField, weight: f32) -> Self {
        self.boost.insert(field, weight);
        self
    }

    pub fn filter(mut self, field: SearchField, value: impl Into<String>) -> Self {
        self.filter.insert(field, value.into());
        self
    }

    /// Rejects filters on non-keyword fields.
    pub fn validate(&self) -> crate::error::Result<()> {
        if let Some(field) = self.filter.keys().find(|f| !f.is_keyword()) {
            return Err(Error::Validation(format!("cannot filter on non-keyword field '{field}'")));
        }
        Ok(())
    }

    pub fn accepts(&self, chunk: &Chunk) -> bool {
        self.filter.iter().all(|(field, value)| field.matches(chunk, value))
    }
}

/// Relevance judgments for one query, one entry per returned result.
pub type RelevanceRow = Vec<bool>;

/// A point of the chunking/retrieval parameter grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParameterCombination {
    pub chunk_size: usize,
    pub overlap: usize,
    pub top_k: usize,
}

impl ParameterCombination {
    pub fn new(chunk_size: usize, overlap: usize, top_k: usize) -> Self {
        Self { chunk_size, overlap, top_k }
    }

    /// `overlap < chunk_size` and a non-zero `top_k`.
    pub fn is_valid(&self) -> bool {
        self.chunk_size > 0 && self.overlap < self.chunk_size && self.top_k > 0
    }
}

impl fmt::Display for ParameterCombination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "chunk_size={} overlap={} top_k={}", self.chunk_size, self.overlap, self.top_k)
    }
}

/// Scores for one evaluated combination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub search_type: String,
    pub hit_rate: f64,
    pub mrr: f64,
    /// Mean token count of a query's result set.
    #[serde(rename = "num_tokens")]
    pub avg_tokens: f64,
    pub score: f64,
    #[serde(flatten)]
    pub combination: ParameterCombination,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_without_content_is_empty() {
        let doc: Document = serde_json::from_str(r#"{"title":"t","source":"s"}"#).expect("parse");
        assert_eq!(doc.content, "");
        assert_eq!(doc.title.as_deref(), Some("t"));
    }

    #[test]
    fn ground_truth_uses_loader_field_names() {
        let item: GroundTruthItem = serde_json::from_str(r#"{"question":"q","source":"s"}"#).expect("parse");
        assert_eq!(item, GroundTruthItem::new("q", "s"));
    }

    #[test]
    fn evaluation_result_flattens_combination() {
        let r = EvaluationResult {
            search_type: "lexical".into(),
            hit_rate: 1.0,
            mrr: 0.5,
            avg_tokens: 120.0,
            score: 2.0,
            combination: ParameterCombination::new(200, 0, 5),
        };
        let v = serde_json::to_value(&r).expect("json");
        assert_eq!(v["chunk_size"], 200);
        assert_eq!(v["num_tokens"], 120.0);
    }

    #[test]
    fn filters_only_on_keyword_fields() {
        assert!(SearchOptions::top(3).filter(SearchField::Source, "a").validate().is_ok());
        assert!(SearchOptions::top(3).filter(SearchField::Content, "a").validate().is_err());
    }

    #[test]
    fn combination_validity() {
        assert!(ParameterCombination::new(200, 0, 5).is_valid());
        assert!(!ParameterCombination::new(500, 500, 5).is_valid());
        assert!(!ParameterCombination::new(200, 0, 0).is_valid());
    }
}
