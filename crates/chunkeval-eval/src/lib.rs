//! chunkeval-eval
//!
//! Scores chunking parameters by how well retrieval over the chunked corpus
//! answers a ground-truth question set, and how many tokens the answers cost.

pub mod grid;
pub mod metrics;
pub mod ranker;
pub mod report;
pub mod tokens;

pub use grid::{evaluate_chunking_grid, GridSearchEvaluator, ParameterGrid};
pub use metrics::{hit_rate, mrr, score, ScoreWeights};
pub use ranker::find_best_chunking_params;
pub use report::save_results;
pub use tokens::TokenCounter;
