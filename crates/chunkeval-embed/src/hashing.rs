use std::hash::Hasher;

use anyhow::Result;
use chunkeval_core::traits::Embedder;
use twox_hash::XxHash64;

/// Deterministic bag-of-words embedder: each lowercased alphanumeric token is
/// hashed into one of `dim` buckets and the counts are L2-normalised.
///
/// Needs no weights, so tests and offline runs use it in place of a model.
/// Texts sharing vocabulary get a positive inner product.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dim: usize,
}

impl HashingEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim: dim.max(1) }
    }

    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0f32; self.dim];
        for token in text.split(|c: char| !c.is_alphanumeric()).filter(|t| !t.is_empty()) {
            let mut hasher = XxHash64::with_seed(0);
            hasher.write(token.to_lowercase().as_bytes());
            #[allow(clippy::cast_possible_truncation)]
            let idx = (hasher.finish() % self.dim as u64) as usize;
            v[idx] += 1.0;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut v { *x /= norm; }
        }
        v
    }
}

impl Embedder for HashingEmbedder {
    fn dim(&self) -> usize { self.dim }
    fn max_len(&self) -> usize { usize::MAX }
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dot(a: &[f32], b: &[f32]) -> f32 { a.iter().zip(b).map(|(x, y)| x * y).sum() }

    #[test]
    fn case_and_punctuation_insensitive() {
        let e = HashingEmbedder::new(64);
        assert_eq!(e.embed_text("Modal dialogs!"), e.embed_text("modal   DIALOGS"));
    }

    #[test]
    fn empty_text_is_zero_vector() {
        let e = HashingEmbedder::new(16);
        assert!(e.embed_text("  ...  ").iter().all(|x| *x == 0.0));
    }

    #[test]
    fn shared_vocabulary_scores_higher() {
        let e = HashingEmbedder::new(384);
        let q = e.embed_text("confused by modals");
        let near = e.embed_text("users often feel confused by modals");
        let far = e.embed_text("loading spinners frustrate impatient people");
        assert!(dot(&q, &near) > dot(&q, &far));
    }
}
