use std::fs;
use std::io::Write;
use tempfile::TempDir;

use chunkeval_core::loader::{load_documents, load_ground_truth};
use chunkeval_core::{chunk_documents, Document};

#[test]
fn txt_directory_becomes_documents() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    fs::create_dir_all(dir.join("ux/modals")).unwrap();
    let mut f = fs::File::create(dir.join("ux/modals/confusion.txt")).unwrap();
    writeln!(f, "Users often feel confused by modals.").unwrap();
    fs::write(dir.join("spinners.txt"), "Loading spinners frustrate impatient users.").unwrap();

    let docs = load_documents(dir).expect("load");
    assert_eq!(docs.len(), 2);
    let spinners = docs.iter().find(|d| d.title.as_deref() == Some("spinners")).expect("spinners doc");
    assert_eq!(spinners.source.as_deref(), Some("spinners.txt"));
    assert!(spinners.tags.is_empty());
    let modals = docs.iter().find(|d| d.title.as_deref() == Some("confusion")).expect("modals doc");
    assert_eq!(modals.source.as_deref(), Some("ux/modals/confusion.txt"));
    assert_eq!(modals.tags, vec!["ux".to_string(), "modals".to_string()]);
}

#[test]
fn json_documents_with_missing_fields() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("docs.json");
    fs::write(&path, r#"[{"content":"alpha bravo","source":"q1"},{"content":"charlie","title":"C","tags":["x"]}]"#).unwrap();

    let docs = load_documents(&path).expect("load");
    assert_eq!(docs[0], Document::new("alpha bravo").with_source("q1"));
    let chunks = chunk_documents(&docs, 100, 0).expect("chunk");
    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[0].title, "Untitled");
    assert_eq!(chunks[1].source, "Unknown");
}

#[test]
fn ground_truth_with_custom_field_names() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("gt.json");
    fs::write(&path, r#"[{"q":"modal confusion","doc":"q1","extra":1}]"#).unwrap();

    let items = load_ground_truth(&path, "q", "doc").expect("load");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].query, "modal confusion");
    assert_eq!(items[0].expected_source, "q1");

    assert!(load_ground_truth(&path, "question", "source").is_err(), "missing fields are rejected");
}
