//! Grid results on disk: a score-sorted CSV plus an optional JSON sidecar.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;

use chunkeval_core::{EvaluationResult, Result};

use crate::ranker::find_best_chunking_params;

pub const CSV_HEADER: &str = "search_type,hit_rate,mrr,num_tokens,score,chunk_size,overlap,top_k";

#[derive(Debug, Serialize)]
struct Summary {
    num_results: usize,
    best_score: Option<f64>,
    best_hit_rate: Option<f64>,
    best_mrr: Option<f64>,
}

#[derive(Debug, Serialize)]
struct Sidecar<'a> {
    timestamp: String,
    metadata: &'a Value,
    summary: Summary,
}

fn max_of(results: &[EvaluationResult], f: impl Fn(&EvaluationResult) -> f64) -> Option<f64> {
    results.iter().map(f).reduce(f64::max)
}

fn csv_field(s: &str) -> String {
    if s.contains([',', '"', '\n']) { format!("\"{}\"", s.replace('"', "\"\"")) } else { s.to_string() }
}

pub fn to_csv(results: &[EvaluationResult]) -> String {
    let mut out = String::from(CSV_HEADER);
    out.push('\n');
    for r in find_best_chunking_params(results, results.len()) {
        let c = r.combination;
        out.push_str(&format!(
            "{},{},{},{},{},{},{},{}\n",
            csv_field(&r.search_type), r.hit_rate, r.mrr, r.avg_tokens, r.score, c.chunk_size, c.overlap, c.top_k
        ));
    }
    out
}

/// Write `results` sorted by score to `path` (extension forced to `.csv`,
/// parent directories created). With `metadata`, also writes
/// `<stem>.metadata.json` next to it. Returns the CSV path.
pub fn save_results(results: &[EvaluationResult], path: &Path, metadata: Option<&Value>) -> Result<PathBuf> {
    let path = if path.extension().is_some_and(|e| e == "csv") { path.to_path_buf() } else { path.with_extension("csv") };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(&path, to_csv(results))?;

    if let Some(metadata) = metadata {
        let sidecar = Sidecar {
            timestamp: chrono::Local::now().to_rfc3339(),
            metadata,
            summary: Summary {
                num_results: results.len(),
                best_score: max_of(results, |r| r.score),
                best_hit_rate: max_of(results, |r| r.hit_rate),
                best_mrr: max_of(results, |r| r.mrr),
            },
        };
        let sidecar_path = path.with_extension("metadata.json");
        fs::write(&sidecar_path, serde_json::to_string_pretty(&sidecar)?)?;
        tracing::info!(path = %sidecar_path.display(), "saved grid metadata");
    }
    tracing::info!(path = %path.display(), rows = results.len(), "saved grid results");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chunkeval_core::ParameterCombination;

    fn result(score: f64, hit_rate: f64) -> EvaluationResult {
        EvaluationResult {
            search_type: "lexical".into(),
            hit_rate,
            mrr: hit_rate / 2.0,
            avg_tokens: 42.5,
            score,
            combination: ParameterCombination::new(300, 15, 5),
        }
    }

    #[test]
    fn csv_is_sorted_by_score() {
        let csv = to_csv(&[result(0.1, 0.2), result(0.9, 1.0)]);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], CSV_HEADER);
        assert_eq!(lines[1], "lexical,1,0.5,42.5,0.9,300,15,5");
        assert_eq!(lines[2], "lexical,0.2,0.1,42.5,0.1,300,15,5");
    }

    #[test]
    fn quotes_fields_with_commas() {
        assert_eq!(csv_field("a,b"), "\"a,b\"");
        assert_eq!(csv_field("lexical"), "lexical");
    }

    #[test]
    fn writes_csv_and_sidecar() {
        let dir = tempfile::tempdir().expect("tempdir");
        let target = dir.path().join("nested/results.txt");
        let meta = serde_json::json!({ "search_type": "lexical", "n_samples": 2 });
        let saved = save_results(&[result(0.4, 0.5), result(0.8, 0.75)], &target, Some(&meta)).expect("save");
        assert_eq!(saved, dir.path().join("nested/results.csv"));
        assert!(saved.exists());

        let sidecar: Value =
            serde_json::from_str(&fs::read_to_string(dir.path().join("nested/results.metadata.json")).expect("read"))
                .expect("json");
        assert_eq!(sidecar["metadata"]["n_samples"], 2);
        assert_eq!(sidecar["summary"]["num_results"], 2);
        assert_eq!(sidecar["summary"]["best_score"], 0.8);
        assert_eq!(sidecar["summary"]["best_hit_rate"], 0.75);
        assert!(sidecar["timestamp"].is_string());
    }

    #[test]
    fn no_sidecar_without_metadata() {
        let dir = tempfile::tempdir().expect("tempdir");
        save_results(&[], &dir.path().join("r.csv"), None).expect("save");
        assert!(dir.path().join("r.csv").exists());
        assert!(!dir.path().join("r.metadata.json").exists());
    }
}
