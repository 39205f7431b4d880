use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::error::{Error, Result};
use crate::types::{Document, GroundTruthItem};

pub const DEFAULT_QUESTION_FIELD: &str = "question";
pub const DEFAULT_SOURCE_FIELD: &str = "source";

/// Load documents from a JSON array file or from a directory tree of `.txt` files.
pub fn load_documents(path: &Path) -> Result<Vec<Document>> {
    if path.is_dir() {
        return load_txt_directory(path);
    }
    let raw = fs::read_to_string(path)?;
    let documents: Vec<Document> = serde_json::from_str(&raw)?;
    tracing::info!(path = %path.display(), documents = documents.len(), "loaded documents");
    Ok(documents)
}

/// Every `.txt` file below `root` becomes one document: title is the file
/// stem, source the path relative to `root`, tags the parent directories.
pub fn load_txt_directory(root: &Path) -> Result<Vec<Document>> {
    let files = list_txt_files(root);
    if files.is_empty() {
        tracing::warn!(root = %root.display(), "no .txt files found");
        return Ok(Vec::new());
    }
    let mut documents = Vec::with_capacity(files.len());
    for file_path in &files {
        let content = read_file_content(file_path)?;
        let relative = file_path.strip_prefix(root).unwrap_or(file_path);
        let title = file_path.file_stem().map(|s| s.to_string_lossy().to_string());
        let tags = relative
            .parent()
            .map(|p| p.components().map(|c| c.as_os_str().to_string_lossy().to_string()).collect())
            .unwrap_or_default();
        documents.push(Document {
            content,
            title,
            source: Some(relative.to_string_lossy().replace('\\', "/")),
            tags,
        });
    }
    tracing::info!(root = %root.display(), documents = documents.len(), "loaded text directory");
    Ok(documents)
}

/// Load ground truth from a JSON array whose question/source field names are configurable.
pub fn load_ground_truth(path: &Path, question_field: &str, source_field: &str) -> Result<Vec<GroundTruthItem>> {
    let raw = fs::read_to_string(path)?;
    let rows: Vec<Value> = serde_json::from_str(&raw)?;
    let items = rows
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let field = |name: &str| {
                row.get(name)
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .ok_or_else(|| Error::Validation(format!("ground truth row {i} has no string field '{name}'")))
            };
            Ok(GroundTruthItem { query: field(question_field)?, expected_source: field(source_field)? })
        })
        .collect::<Result<Vec<_>>>()?;
    tracing::info!(path = %path.display(), items = items.len(), "loaded ground truth");
    Ok(items)
}

fn read_file_content(file_path: &Path) -> Result<String> {
    match fs::read_to_string(file_path) {
        Ok(content) => Ok(content),
        Err(_) => Ok(String::from_utf8_lossy(&fs::read(file_path)?).to_string()),
    }
}

fn list_txt_files(root: &Path) -> Vec<PathBuf> {
    let mut txt_files: Vec<PathBuf> = walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.path().extension().and_then(|s| s.to_str()) == Some("txt"))
        .map(|e| e.path().to_path_buf())
        .collect();
    txt_files.sort();
    txt_files
}
