use std::path::Path;

use chunkeval_core::config::{EmbeddingProvider, EmbeddingSettings};
use chunkeval_core::Error;
use chunkeval_embed::{embedder_from_settings, EmbeddingModel, HashingEmbedder};
use chunkeval_core::traits::Embedder;

#[test]
fn hashing_embedder_shapes_and_determinism() {
    let embedder = HashingEmbedder::new(384);
    let texts = vec!["hello world".to_string(), "hello world".to_string()];
    let embs = embedder.embed_batch(&texts).expect("embed_batch");
    let (v1, v2) = (&embs[0], &embs[1]);

    assert_eq!(v1.len(), 384);
    let norm: f32 = v1.iter().map(|x| x * x).sum::<f32>().sqrt();
    assert!((norm - 1.0).abs() <= 1e-3, "vector is L2-normalized (norm={norm})");
    for (a, b) in v1.iter().zip(v2.iter()) { assert!((a - b).abs() <= 1e-6); }
}

#[test]
fn hashing_provider_from_settings() {
    let settings = EmbeddingSettings { provider: EmbeddingProvider::Hashing, hashing_dim: 32, ..Default::default() };
    let embedder = embedder_from_settings(&settings, Path::new(".")).expect("embedder");
    assert_eq!(embedder.dim(), 32);
}

#[test]
fn missing_model_dir_is_a_resource_error() {
    if std::env::var("APP_USE_FAKE_EMBEDDINGS").is_ok() { return; }
    let dir = tempfile::tempdir().expect("tempdir");
    let settings = EmbeddingSettings {
        provider: EmbeddingProvider::Model,
        model_dir: Some("does-not-exist".to_string()),
        ..Default::default()
    };
    let err = embedder_from_settings(&settings, dir.path()).err().expect("should fail");
    assert!(matches!(err, Error::Resource(_)), "got {err:?}");
}

#[test]
fn incomplete_model_dir_fails_to_load() {
    let dir = tempfile::tempdir().expect("tempdir");
    assert!(EmbeddingModel::load(dir.path(), 128).is_err());
}

// Needs a real sentence-transformers checkout, e.g. APP_MODEL_DIR=models/all-MiniLM-L6-v2.
#[test]
#[ignore]
fn real_model_ranks_paraphrase_above_unrelated() {
    let dir = chunkeval_embed::resolve_model_dir(None).expect("model dir");
    let model = EmbeddingModel::load(&dir, 256).expect("model");
    let texts = vec![
        "Why are modal dialogs confusing?".to_string(),
        "Users often feel confused by modals.".to_string(),
        "Loading spinners frustrate impatient users.".to_string(),
    ];
    let embs = model.embed_batch(&texts).expect("embed");
    let dot = |a: &[f32], b: &[f32]| a.iter().zip(b).map(|(x, y)| x * y).sum::<f32>();
    assert_eq!(embs[0].len(), model.dim());
    assert!(dot(&embs[0], &embs[1]) > dot(&embs[0], &embs[2]));
}
