use std::env;
use std::path::PathBuf;

use chunkeval_core::loader::load_documents;
use chunkeval_core::traits::Retriever;
use chunkeval_core::{chunk_documents, SearchOptions};

// Chunk a document set, index it lexically and print results for one query.
// Usage:
//   cargo run -p chunkeval-text --example search -- "your query" \
//     [--docs docs.json|txt_dir] [--size 500] [--overlap 0] [--limit 5]

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().skip(1).collect();
    if args.is_empty() {
        eprintln!("Usage: cargo run -p chunkeval-text --example search -- <query> [--docs PATH] [--size N] [--overlap N] [--limit N]");
        std::process::exit(1);
    }
    let mut query = String::new();
    let mut docs: Option<PathBuf> = None;
    let mut size: usize = 500;
    let mut overlap: usize = 0;
    let mut limit: usize = 5;

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            flag @ ("--docs" | "--size" | "--overlap" | "--limit") => {
                if i + 1 >= args.len() { eprintln!("{} requires a value", flag); std::process::exit(2); }
                let value = &args[i + 1];
                match flag {
                    "--docs" => docs = Some(PathBuf::from(value)),
                    "--size" => size = value.parse().unwrap_or(size),
                    "--overlap" => overlap = value.parse().unwrap_or(overlap),
                    _ => limit = value.parse().unwrap_or(limit),
                }
                i += 2; continue;
            }
            s if s.starts_with('-') => {
                eprintln!("Unknown flag: {}", s); std::process::exit(2);
            }
            s => {
                if query.is_empty() { query = s.to_string(); }
                i += 1; continue;
            }
        }
    }

    // Resolve docs path precedence: flag > DOCS_PATH > ./docs.json
    let docs = docs
        .or_else(|| env::var("DOCS_PATH").ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("docs.json"));

    println!("Lexical search\n==============");
    println!("Docs : {}", docs.display());
    println!("Query: {} (limit {}, chunk {}/{})\n", query, limit, size, overlap);

    let chunks = chunk_documents(&load_documents(&docs)?, size, overlap)?;
    let mut index = chunkeval_text::LexicalIndex::default();
    index.add(&chunks)?;
    for (i, h) in index.search(&query, &SearchOptions::top(limit))?.iter().enumerate() {
        println!("{:>2}. score={:.1} source={} chunk={} title={}\n    {}",
            i + 1, h.similarity_score.unwrap_or_default(), h.source, h.chunk_index, h.title, h.content);
    }
    Ok(())
}
