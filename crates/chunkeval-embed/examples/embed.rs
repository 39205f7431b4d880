use chunkeval_core::traits::Embedder;
use chunkeval_embed::get_default_embedder;

// APP_USE_FAKE_EMBEDDINGS=1 skips model loading.
fn main() -> anyhow::Result<()> {
    let embedder = get_default_embedder()?;
    let texts = vec!["hello world".to_string(), "rust embeddings".to_string()];
    let embs = embedder.embed_batch(&texts)?;
    let sim: f32 = embs[0].iter().zip(&embs[1]).map(|(a, b)| a * b).sum();
    println!("B={} dim={} sim={:.4}", embs.len(), embedder.dim(), sim);
    Ok(())
}
