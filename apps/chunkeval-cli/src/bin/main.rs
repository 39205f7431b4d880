use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context};
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

use chunkeval_core::config::{resolve_with_base, Config, Settings};
use chunkeval_core::loader::{load_documents, load_ground_truth};
use chunkeval_core::traits::Retriever;
use chunkeval_core::{Chunker, ChunkingConfig, SearchField, SearchOptions};
use chunkeval_eval::{find_best_chunking_params, save_results, GridSearchEvaluator, ParameterGrid};
use chunkeval_search::SearchBackend;

const USAGE: &str = "Usage:
  chunkeval chunk  <docs> [--size N] [--overlap N] [--show N]
  chunkeval search <docs> <query> [--type lexical|embedding] [--size N] [--overlap N] [--limit N]
                   [--boost field=weight]... [--filter field=value]...
  chunkeval grid   <docs> <ground_truth> [--chunk-sizes a,b] [--overlaps a,b] [--top-ks a,b]
                   [--samples N] [--seed N] [--type lexical|embedding] [--best-n N] [--output PATH] [--no-save]

<docs> is a JSON array of documents or a directory of .txt files.";

const SWITCHES: &[&str] = &["--no-save"];

struct Args {
    positional: Vec<String>,
    flags: HashMap<String, Vec<String>>,
}

impl Args {
    fn parse(raw: &[String]) -> anyhow::Result<Self> {
        let mut positional = Vec::new();
        let mut flags: HashMap<String, Vec<String>> = HashMap::new();
        let mut i = 0;
        while i < raw.len() {
            let a = &raw[i];
            if SWITCHES.contains(&a.as_str()) {
                flags.entry(a.clone()).or_default();
            } else if a.starts_with("--") {
                let value = raw.get(i + 1).ok_or_else(|| anyhow!("{} requires a value", a))?;
                flags.entry(a.clone()).or_default().push(value.clone());
                i += 1;
            } else {
                positional.push(a.clone());
            }
            i += 1;
        }
        Ok(Self { positional, flags })
    }

    fn positional(&self, idx: usize, name: &str) -> anyhow::Result<&str> {
        self.positional.get(idx).map(String::as_str).ok_or_else(|| anyhow!("missing <{}>\n\n{}", name, USAGE))
    }

    fn value(&self, flag: &str) -> Option<&str> {
        self.flags.get(flag).and_then(|v| v.last()).map(String::as_str)
    }

    fn values(&self, flag: &str) -> &[String] {
        self.flags.get(flag).map(Vec::as_slice).unwrap_or_default()
    }

    fn has(&self, flag: &str) -> bool { self.flags.contains_key(flag) }

    fn number(&self, flag: &str) -> anyhow::Result<Option<usize>> {
        self.value(flag).map(|v| v.parse().with_context(|| format!("{flag} expects a number, got '{v}'"))).transpose()
    }

    fn list(&self, flag: &str) -> anyhow::Result<Option<Vec<usize>>> {
        self.value(flag)
            .map(|v| {
                v.split(',')
                    .map(|x| x.trim().parse().with_context(|| format!("{flag} expects comma-separated numbers, got '{v}'")))
                    .collect()
            })
            .transpose()
    }
}

fn key_value(raw: &str) -> anyhow::Result<(SearchField, &str)> {
    let (field, value) = raw.split_once('=').ok_or_else(|| anyhow!("expected field=value, got '{}'", raw))?;
    Ok((field.parse()?, value))
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let config = Config::load().map_err(|e| {
        eprintln!("Error loading config: {}", e);
        e
    })?;
    let mut settings = config.settings()?;
    let mut raw: Vec<String> = env::args().skip(1).collect();
    if raw.is_empty() || raw[0] == "--help" || raw[0] == "-h" {
        println!("{USAGE}");
        return Ok(());
    }
    let cmd = raw.remove(0);
    let args = Args::parse(&raw)?;
    let base = env::current_dir()?;
    tracing::debug!(cmd, base = %base.display(), "starting");

    if let Some(t) = args.value("--type") { settings.search.search_type = t.to_string(); }
    if let Some(n) = args.number("--size")? { settings.chunking.chunk_size = n; }
    if let Some(n) = args.number("--overlap")? { settings.chunking.overlap = n; }

    match cmd.as_str() {
        "chunk" => chunk_cmd(&settings, &args, &base),
        "search" => search_cmd(&settings, &args, &base),
        "grid" => grid_cmd(settings, &args, &base),
        other => bail!("Unknown command: {}\n\n{}", other, USAGE),
    }
}

fn chunker(settings: &Settings) -> anyhow::Result<Chunker> {
    let c = &settings.chunking;
    Ok(Chunker::new(ChunkingConfig::new(c.chunk_size, c.overlap)?)?
        .with_defaults(c.default_title.clone(), c.default_source.clone()))
}

fn chunk_cmd(settings: &Settings, args: &Args, base: &Path) -> anyhow::Result<()> {
    let docs_path = resolve_with_base(base, args.positional(0, "docs")?);
    let show = args.number("--show")?.unwrap_or(3);
    let documents = load_documents(&docs_path)?;
    let chunks = chunker(settings)?.chunk_documents(&documents);

    println!("Chunking\n========");
    println!("Docs: {} ({} documents)", docs_path.display(), documents.len());
    println!("chunk_size={} overlap={} -> {} chunks\n", settings.chunking.chunk_size, settings.chunking.overlap, chunks.len());
    for c in chunks.iter().take(show) {
        println!("[{} #{}] {}\n    {}", c.source, c.chunk_index, c.title, c.content.replace('\n', " "));
    }
    Ok(())
}

fn search_cmd(settings: &Settings, args: &Args, base: &Path) -> anyhow::Result<()> {
    let docs_path = resolve_with_base(base, args.positional(0, "docs")?);
    let query = args.positional(1, "query")?;
    let mut options = SearchOptions::top(args.number("--limit")?.unwrap_or(settings.search.num_results.max(5)));
    for raw in args.values("--boost") {
        let (field, weight) = key_value(raw)?;
        options = options.boost(field, weight.parse().with_context(|| format!("bad boost weight in '{raw}'"))?);
    }
    for raw in args.values("--filter") {
        let (field, value) = key_value(raw)?;
        options = options.filter(field, value);
    }

    let chunks = chunker(settings)?.chunk_documents(&load_documents(&docs_path)?);
    let mut backend = SearchBackend::from_settings(settings, base)?;
    backend.add(&chunks)?;

    println!("{} search\n===============", backend.search_type());
    println!("Docs : {} ({} chunks)", docs_path.display(), chunks.len());
    println!("Query: {} (limit {})\n", query, options.num_results);
    let results = backend.search(query, &options)?;
    if results.is_empty() {
        println!("No results.");
    }
    for (i, r) in results.iter().enumerate() {
        println!(
            "{:>2}. score={:.4} source={} chunk={} title={}\n    {}",
            i + 1,
            r.similarity_score.unwrap_or_default(),
            r.source,
            r.chunk_index,
            r.title,
            r.content.replace('\n', " ")
        );
    }
    Ok(())
}

fn grid_cmd(mut settings: Settings, args: &Args, base: &Path) -> anyhow::Result<()> {
    let docs_path = resolve_with_base(base, args.positional(0, "docs")?);
    let gt_path = resolve_with_base(base, args.positional(1, "ground_truth")?);
    if let Some(v) = args.list("--chunk-sizes")? { settings.grid.chunk_sizes = v; }
    if let Some(v) = args.list("--overlaps")? { settings.grid.overlaps = v; }
    if let Some(v) = args.list("--top-ks")? { settings.grid.top_ks = v; }
    if let Some(n) = args.number("--samples")? { settings.grid.n_samples = n; }
    if let Some(n) = args.value("--seed") { settings.grid.seed = Some(n.parse().context("--seed expects a number")?); }
    if let Some(n) = args.number("--best-n")? { settings.grid.best_results = n; }
    if let Some(p) = args.value("--output") { settings.output.results_path = p.to_string(); }

    let gt = &settings.ground_truth;
    let ground_truth = load_ground_truth(&gt_path, &gt.question_field, &gt.source_field)?;
    if ground_truth.is_empty() {
        bail!("Ground truth file is empty: {}", gt_path.display());
    }
    let documents = load_documents(&docs_path)?;
    println!("Loaded {} ground truth examples and {} documents", ground_truth.len(), documents.len());

    let grid = ParameterGrid::from_settings(&settings.grid);
    let selected = grid.sample(settings.grid.n_samples, settings.grid.seed)?;
    let evaluator = GridSearchEvaluator::from_settings(&settings, base)?;

    println!("\nRunning grid search...");
    println!("   chunk_sizes: {:?}", grid.chunk_sizes);
    println!("   overlaps: {:?}", grid.overlaps);
    println!("   top_ks: {:?}", grid.top_ks);
    println!("   samples: {} of {}", selected.len(), grid.combinations()?.len());
    println!("   search_type: {}", evaluator.search_type());

    let pb = ProgressBar::new(selected.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} combinations {msg}")?
            .progress_chars("#>-"),
    );
    let results = evaluator.evaluate_combinations(&documents, &ground_truth, &selected, |_, r| {
        pb.set_message(format!("last score {:.3}", r.score));
        pb.inc(1);
    })?;
    pb.finish_with_message("done");

    let best = find_best_chunking_params(&results, settings.grid.best_results);
    println!("\nTop {} Results:", best.len());
    for (i, r) in best.iter().enumerate() {
        println!("\n{}. Score: {:.3}", i + 1, r.score);
        println!("   {}", r.combination);
        println!("   Hit Rate: {:.3}, MRR: {:.3}, Tokens: {:.1}", r.hit_rate, r.mrr, r.avg_tokens);
    }

    if !args.has("--no-save") {
        let metadata = serde_json::json!({
            "search_type": evaluator.search_type().to_string(),
            "chunk_sizes": grid.chunk_sizes,
            "overlaps": grid.overlaps,
            "top_ks": grid.top_ks,
            "n_samples": settings.grid.n_samples,
            "seed": settings.grid.seed,
            "ground_truth_file": gt_path.display().to_string(),
            "num_ground_truth_samples": ground_truth.len(),
            "num_documents": documents.len(),
        });
        let out: PathBuf = resolve_with_base(base, &settings.output.results_path);
        let saved = save_results(&results, &out, Some(&metadata))?;
        println!("\nSaved results to {}", saved.display());
    }
    println!("\nGrid search complete!");
    Ok(())
}
