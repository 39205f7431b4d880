use chunkeval_core::EvaluationResult;

/// The `n` highest-scoring results, best first. Equal scores keep their input order.
pub fn find_best_chunking_params(results: &[EvaluationResult], n: usize) -> Vec<EvaluationResult> {
    let mut sorted = results.to_vec();
    sorted.sort_by(|a, b| b.score.total_cmp(&a.score));
    sorted.truncate(n);
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;
    use chunkeval_core::ParameterCombination;

    fn result(chunk_size: usize, score: f64) -> EvaluationResult {
        EvaluationResult {
            search_type: "lexical".into(),
            hit_rate: 0.5,
            mrr: 0.5,
            avg_tokens: 100.0,
            score,
            combination: ParameterCombination::new(chunk_size, 0, 5),
        }
    }

    #[test]
    fn returns_top_n_descending() {
        let best = find_best_chunking_params(&[result(1, 0.3), result(2, 0.9), result(3, 0.5)], 2);
        let scores: Vec<f64> = best.iter().map(|r| r.score).collect();
        assert_eq!(scores, vec![0.9, 0.5]);
    }

    #[test]
    fn ties_keep_input_order() {
        let best = find_best_chunking_params(&[result(1, 0.4), result(2, 0.7), result(3, 0.4)], 3);
        let sizes: Vec<usize> = best.iter().map(|r| r.combination.chunk_size).collect();
        assert_eq!(sizes, vec![2, 1, 3]);
    }

    #[test]
    fn n_larger_than_input() {
        assert_eq!(find_best_chunking_params(&[result(1, 0.1)], 10).len(), 1);
        assert!(find_best_chunking_params(&[], 3).is_empty());
    }
}
