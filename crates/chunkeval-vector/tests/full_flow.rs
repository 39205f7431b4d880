use std::sync::Arc;

use chunkeval_core::traits::Retriever;
use chunkeval_core::{chunk_documents, Document, SearchOptions};
use chunkeval_embed::HashingEmbedder;
use chunkeval_vector::EmbeddingIndex;

#[test]
fn embedding_full_flow() {
    let docs = vec![
        Document::new("Users often feel confused by modals.").with_source("q1"),
        Document::new("Loading spinners frustrate impatient users.").with_source("q2"),
    ];
    let chunks = chunk_documents(&docs, 500, 0).expect("chunk");
    let mut index = EmbeddingIndex::new(Arc::new(HashingEmbedder::new(384)));
    index.add(&chunks).expect("index");
    assert_eq!(index.len(), 2);

    let results = index.search("confused by modals", &SearchOptions::top(1)).expect("search");
    eprintln!("embedding: top={:?}", results.first().map(|r| (&r.source, r.similarity_score)));
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].source, "q1");
    let score = results[0].similarity_score.expect("score");
    assert!(score > 0.0 && score <= 1.0 + 1e-5);
}
