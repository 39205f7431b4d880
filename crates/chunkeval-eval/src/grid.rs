//! Randomised grid search over chunk size, overlap and top-k.

use std::path::Path;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use chunkeval_core::chunker::{DEFAULT_CHUNK_SOURCE, DEFAULT_CHUNK_TITLE};
use chunkeval_core::config::{GridSettings, Settings};
use chunkeval_core::traits::{Embedder, Retriever};
use chunkeval_core::{
    Chunker, ChunkingConfig, Document, Error, EvaluationResult, GroundTruthItem, ParameterCombination, RelevanceRow,
    Result, SearchField, SearchOptions,
};
use chunkeval_embed::{embedder_from_settings, get_default_embedder};
use chunkeval_search::{SearchBackend, SearchType};
use chunkeval_vector::DEFAULT_BATCH_SIZE;

use crate::metrics::{hit_rate, mrr, score, ScoreWeights};
use crate::tokens::TokenCounter;

/// Candidate values per parameter; combinations are their Cartesian product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterGrid {
    pub chunk_sizes: Vec<usize>,
    pub overlaps: Vec<usize>,
    pub top_ks: Vec<usize>,
}

impl ParameterGrid {
    pub fn new(chunk_sizes: Vec<usize>, overlaps: Vec<usize>, top_ks: Vec<usize>) -> Self {
        Self { chunk_sizes, overlaps, top_ks }
    }

    pub fn from_settings(settings: &GridSettings) -> Self {
        Self::new(settings.chunk_sizes.clone(), settings.overlaps.clone(), settings.top_ks.clone())
    }

    /// Every distinct `(chunk_size, overlap, top_k)` with `overlap < chunk_size`,
    /// in input order. A zero `top_k` is a validation error.
    pub fn combinations(&self) -> Result<Vec<ParameterCombination>> {
        if self.top_ks.contains(&0) {
            return Err(Error::Validation("top_k values must be greater than 0".into()));
        }
        let mut out: Vec<ParameterCombination> = Vec::new();
        for &chunk_size in &self.chunk_sizes {
            for &overlap in self.overlaps.iter().filter(|&&o| o < chunk_size) {
                for &top_k in &self.top_ks {
                    let c = ParameterCombination::new(chunk_size, overlap, top_k);
                    if !out.contains(&c) {
                        out.push(c);
                    }
                }
            }
        }
        Ok(out)
    }

    /// All combinations when `n_samples` covers them, otherwise `n_samples`
    /// distinct ones drawn uniformly. A seed makes the draw reproducible.
    pub fn sample(&self, n_samples: usize, seed: Option<u64>) -> Result<Vec<ParameterCombination>> {
        let all = self.combinations()?;
        if n_samples >= all.len() {
            return Ok(all);
        }
        let mut rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        Ok(all.choose_multiple(&mut rng, n_samples).copied().collect())
    }
}

/// Evaluates parameter combinations against ground truth.
///
/// Each combination re-chunks the corpus into a freshly built backend; only the
/// embedding model and token counter are shared between combinations.
pub struct GridSearchEvaluator {
    search_type: SearchType,
    text_fields: Vec<SearchField>,
    embedder: Option<Arc<dyn Embedder>>,
    batch_size: usize,
    token_counter: TokenCounter,
    weights: ScoreWeights,
    default_title: String,
    default_source: String,
}

impl GridSearchEvaluator {
    pub fn new(search_type: SearchType) -> Self {
        Self {
            search_type,
            text_fields: SearchField::ALL.to_vec(),
            embedder: None,
            batch_size: DEFAULT_BATCH_SIZE,
            token_counter: TokenCounter::default(),
            weights: ScoreWeights::default(),
            default_title: DEFAULT_CHUNK_TITLE.to_string(),
            default_source: DEFAULT_CHUNK_SOURCE.to_string(),
        }
    }

    /// Loads the embedder (for embedding search) and tokenizer the settings
    /// name. Relative paths resolve against `base`.
    pub fn from_settings(settings: &Settings, base: &Path) -> Result<Self> {
        let search_type: SearchType = settings.search.search_type.parse()?;
        let embedder = match search_type {
            SearchType::Embedding => Some(embedder_from_settings(&settings.embedding, base)?),
            SearchType::Lexical => None,
        };
        Ok(Self {
            search_type,
            text_fields: settings.search.text_fields.clone(),
            embedder,
            batch_size: settings.embedding.batch_size,
            token_counter: TokenCounter::from_settings(&settings.tokenizer, base),
            weights: settings.scoring.into(),
            default_title: settings.chunking.default_title.clone(),
            default_source: settings.chunking.default_source.clone(),
        })
    }

    pub fn with_embedder(mut self, embedder: Arc<dyn Embedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn with_text_fields(mut self, fields: Vec<SearchField>) -> Self {
        self.text_fields = fields;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_token_counter(mut self, counter: TokenCounter) -> Self {
        self.token_counter = counter;
        self
    }

    pub fn with_weights(mut self, weights: ScoreWeights) -> Self {
        self.weights = weights;
        self
    }

    pub fn search_type(&self) -> SearchType { self.search_type }

    /// Chunk, index and query every ground-truth item for one combination.
    pub fn evaluate_one(
        &self,
        documents: &[Document],
        ground_truth: &[GroundTruthItem],
        combination: ParameterCombination,
    ) -> Result<EvaluationResult> {
        if combination.top_k == 0 {
            return Err(Error::Validation("top_k must be greater than 0".into()));
        }
        let chunker = Chunker::new(ChunkingConfig::new(combination.chunk_size, combination.overlap)?)?
            .with_defaults(self.default_title.clone(), self.default_source.clone());
        let chunks = chunker.chunk_documents(documents);

        let mut backend = SearchBackend::new(self.search_type, self.text_fields.clone(), self.embedder.clone(), self.batch_size)?;
        backend.add(&chunks)?;

        let options = SearchOptions::top(combination.top_k);
        let mut relevance: Vec<RelevanceRow> = Vec::with_capacity(ground_truth.len());
        let mut total_tokens = 0usize;
        for item in ground_truth {
            let results = backend.search(&item.query, &options)?;
            relevance.push(results.iter().map(|r| r.source == item.expected_source).collect());
            total_tokens += self.token_counter.count(&results)?;
        }

        #[allow(clippy::cast_precision_loss)]
        let avg_tokens = if ground_truth.is_empty() { 0.0 } else { total_tokens as f64 / ground_truth.len() as f64 };
        let hr = hit_rate(&relevance);
        let result = EvaluationResult {
            search_type: self.search_type.to_string(),
            hit_rate: hr,
            mrr: mrr(&relevance),
            avg_tokens,
            score: score(hr, avg_tokens, self.weights)?,
            combination,
        };
        tracing::info!(
            %combination,
            chunks = chunks.len(),
            hit_rate = result.hit_rate,
            mrr = result.mrr,
            num_tokens = result.avg_tokens,
            score = result.score,
            "evaluated combination"
        );
        Ok(result)
    }

    /// Evaluate `combinations` in order, calling `on_result` after each one.
    pub fn evaluate_combinations<F>(
        &self,
        documents: &[Document],
        ground_truth: &[GroundTruthItem],
        combinations: &[ParameterCombination],
        mut on_result: F,
    ) -> Result<Vec<EvaluationResult>>
    where
        F: FnMut(usize, &EvaluationResult),
    {
        let mut results = Vec::with_capacity(combinations.len());
        for (i, &combination) in combinations.iter().enumerate() {
            let result = self.evaluate_one(documents, ground_truth, combination)?;
            on_result(i, &result);
            results.push(result);
        }
        Ok(results)
    }

    pub fn evaluate_grid(
        &self,
        documents: &[Document],
        ground_truth: &[GroundTruthItem],
        grid: &ParameterGrid,
        n_samples: usize,
        seed: Option<u64>,
    ) -> Result<Vec<EvaluationResult>> {
        let selected = grid.sample(n_samples, seed)?;
        tracing::info!(
            search_type = %self.search_type,
            sampled = selected.len(),
            n_samples,
            "running grid search"
        );
        self.evaluate_combinations(documents, ground_truth, &selected, |_, _| {})
    }
}

/// Sample and evaluate chunking parameters with default scoring and an
/// the default BPE token count. Embedding search loads the default model.
#[allow(clippy::too_many_arguments)]
pub fn evaluate_chunking_grid(
    documents: &[Document],
    ground_truth: &[GroundTruthItem],
    chunk_sizes: &[usize],
    overlaps: &[usize],
    top_ks: &[usize],
    n_samples: usize,
    search_type: SearchType,
    seed: Option<u64>,
) -> Result<Vec<EvaluationResult>> {
    let mut evaluator = GridSearchEvaluator::new(search_type);
    if search_type == SearchType::Embedding {
        let embedder = get_default_embedder().map_err(|e| Error::Resource(format!("{e:#}")))?;
        evaluator = evaluator.with_embedder(embedder);
    }
    let grid = ParameterGrid::new(chunk_sizes.to_vec(), overlaps.to_vec(), top_ks.to_vec());
    evaluator.evaluate_grid(documents, ground_truth, &grid, n_samples, seed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filters_overlap_not_below_chunk_size() {
        let grid = ParameterGrid::new(vec![200, 500], vec![0, 500], vec![5]);
        assert_eq!(
            grid.combinations().expect("grid"),
            vec![ParameterCombination::new(200, 0, 5), ParameterCombination::new(500, 0, 5)]
        );
    }

    #[test]
    fn zero_top_k_is_rejected() {
        let grid = ParameterGrid::new(vec![200], vec![0], vec![0, 5]);
        assert!(matches!(grid.combinations(), Err(Error::Validation(_))));
    }

    #[test]
    fn duplicate_values_collapse() {
        let grid = ParameterGrid::new(vec![200, 200], vec![0], vec![5, 5]);
        assert_eq!(grid.combinations().expect("grid").len(), 1);
    }

    #[test]
    fn seeded_sampling_is_reproducible() {
        let grid = ParameterGrid::from_settings(&GridSettings::default());
        let a = grid.sample(5, Some(7)).expect("sample");
        let b = grid.sample(5, Some(7)).expect("sample");
        assert_eq!(a, b);
    }

    #[test]
    fn embedding_search_without_embedder_fails_at_build() {
        let evaluator = GridSearchEvaluator::new(SearchType::Embedding);
        let docs = [Document::new("text").with_source("s")];
        let err = evaluator.evaluate_one(&docs, &[], ParameterCombination::new(100, 0, 1));
        assert!(matches!(err, Err(Error::Resource(_))));
    }

    #[test]
    fn default_evaluator_counts_model_tokens() {
        let evaluator = GridSearchEvaluator::new(SearchType::Lexical);
        assert!(evaluator.token_counter.is_exact());
        assert_eq!(evaluator.token_counter.encoding(), "o200k_base");
    }
}
