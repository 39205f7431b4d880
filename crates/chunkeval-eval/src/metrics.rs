//! Retrieval quality and cost metrics over per-query relevance rows.

use chunkeval_core::config::ScoringSettings;
use chunkeval_core::{Error, RelevanceRow, Result};

#[allow(clippy::cast_precision_loss)]
fn mean(sum: f64, n: usize) -> f64 {
    if n == 0 { 0.0 } else { sum / n as f64 }
}

/// Fraction of queries with at least one relevant result. Empty input is 0.
#[allow(clippy::cast_precision_loss)]
pub fn hit_rate(relevance: &[RelevanceRow]) -> f64 {
    let hits = relevance.iter().filter(|row| row.contains(&true)).count();
    mean(hits as f64, relevance.len())
}

/// Mean reciprocal rank: `1 / (1 + first relevant index)` per query, 0 for
/// queries without a relevant result. Empty input is 0.
#[allow(clippy::cast_precision_loss)]
pub fn mrr(relevance: &[RelevanceRow]) -> f64 {
    let total: f64 = relevance
        .iter()
        .map(|row| row.iter().position(|r| *r).map_or(0.0, |i| 1.0 / (i + 1) as f64))
        .sum();
    mean(total, relevance.len())
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreWeights {
    /// Exponent on hit rate.
    pub alpha: f64,
    /// Exponent on the normalised token penalty.
    pub beta: f64,
    pub token_normalization: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self { alpha: 2.0, beta: 0.5, token_normalization: 1000.0 }
    }
}

impl From<ScoringSettings> for ScoreWeights {
    fn from(s: ScoringSettings) -> Self {
        Self { alpha: s.alpha, beta: s.beta, token_normalization: s.token_normalization }
    }
}

/// `hit_rate^alpha / (avg_tokens / token_normalization)^beta`.
///
/// Zero hit rate or a non-positive token penalty scores 0.
pub fn score(hit_rate: f64, avg_tokens: f64, weights: ScoreWeights) -> Result<f64> {
    if !(0.0..=1.0).contains(&hit_rate) {
        return Err(Error::Validation(format!("hit_rate must be between 0.0 and 1.0, got {hit_rate}")));
    }
    if avg_tokens.is_nan() || avg_tokens < 0.0 {
        return Err(Error::Validation(format!("num_tokens must be non-negative, got {avg_tokens}")));
    }
    if hit_rate == 0.0 {
        return Ok(0.0);
    }
    let penalty = (avg_tokens / weights.token_normalization).powf(weights.beta);
    if penalty <= 0.0 {
        return Ok(0.0);
    }
    Ok(hit_rate.powf(weights.alpha) / penalty)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-12;

    #[test]
    fn hit_rate_examples() {
        assert!((hit_rate(&[vec![true, false], vec![false, false]]) - 0.5).abs() < EPS);
        assert!(hit_rate(&[]).abs() < EPS);
        assert!(hit_rate(&[vec![]]).abs() < EPS);
    }

    #[test]
    fn mrr_examples() {
        let rows = vec![vec![true, false, false], vec![false, true, false], vec![false, false, false]];
        assert!((mrr(&rows) - 0.5).abs() < EPS);
        assert!(mrr(&[]).abs() < EPS);
        assert!((mrr(&[vec![false, false, true, true]]) - 1.0 / 3.0).abs() < EPS);
    }

    #[test]
    fn score_short_circuits() {
        let w = ScoreWeights::default();
        assert_eq!(score(0.0, 500.0, w).expect("score"), 0.0);
        assert_eq!(score(0.8, 0.0, w).expect("score"), 0.0);
    }

    #[test]
    fn score_formula() {
        // 0.5^2 / (250/1000)^0.5 = 0.25 / 0.5
        let s = score(0.5, 250.0, ScoreWeights::default()).expect("score");
        assert!((s - 0.5).abs() < EPS);
    }

    #[test]
    fn score_validates_inputs() {
        let w = ScoreWeights::default();
        assert!(matches!(score(1.2, 10.0, w), Err(Error::Validation(_))));
        assert!(matches!(score(-0.1, 10.0, w), Err(Error::Validation(_))));
        assert!(matches!(score(0.5, -1.0, w), Err(Error::Validation(_))));
        assert!(matches!(score(f64::NAN, 1.0, w), Err(Error::Validation(_))));
    }

    #[test]
    fn score_is_monotone() {
        let w = ScoreWeights::default();
        let rates = [0.0, 0.1, 0.25, 0.5, 0.75, 1.0];
        let tokens = [1.0, 10.0, 250.0, 1000.0, 4000.0];
        for t in tokens {
            for pair in rates.windows(2) {
                assert!(score(pair[0], t, w).expect("score") <= score(pair[1], t, w).expect("score"));
            }
        }
        for r in rates {
            for pair in tokens.windows(2) {
                assert!(score(r, pair[0], w).expect("score") >= score(r, pair[1], w).expect("score"));
            }
        }
    }
}
