//! Reader for the ingestion contract: JSON Lines files of [`Document`] records.
//!
//! Upstream tooling turns raw sources into one document per line. Load order is
//! the vector id order of the index built from the result, so directories are
//! walked in sorted path order.
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::types::Document;

#[derive(Debug, Clone, Default)]
pub struct DocumentLoader {
    limit: Option<usize>,
}

impl DocumentLoader {
    pub fn new() -> Self { Self::default() }

    /// Stop after the first `limit` documents.
    pub fn with_limit(limit: usize) -> Self { Self { limit: Some(limit) } }

    /// Load a single `.jsonl` file, or every `.jsonl` file under a directory.
    pub fn load(&self, path: &Path) -> Result<Vec<Document>> {
        if path.is_dir() { self.load_directory(path) } else { self.load_file(path) }
    }

    pub fn load_directory(&self, data_dir: &Path) -> Result<Vec<Document>> {
        let files = self.list_jsonl_files(data_dir);
        if files.is_empty() {
            tracing::warn!(dir = %data_dir.display(), "no .jsonl files found");
            return Ok(vec![]);
        }
        let mut all_docs = Vec::new();
        for (file_index, file_path) in files.iter().enumerate() {
            tracing::info!(file = %file_path.display(), "loading file {}/{}", file_index + 1, files.len());
            self.read_into(file_path, &mut all_docs)?;
            if self.limit_reached(&all_docs) { break; }
        }
        tracing::info!(files = files.len(), documents = all_docs.len(), "documents loaded");
        Ok(all_docs)
    }

    pub fn load_file(&self, file_path: &Path) -> Result<Vec<Document>> {
        let mut docs = Vec::new();
        self.read_into(file_path, &mut docs)?;
        Ok(docs)
    }

    fn read_into(&self, file_path: &Path, out: &mut Vec<Document>) -> Result<()> {
        let content = fs::read_to_string(file_path)
            .with_context(|| format!("reading {}", file_path.display()))?;
        for (line_no, line) in content.lines().enumerate() {
            if self.limit_reached(out) { break; }
            let line = line.trim();
            if line.is_empty() { continue; }
            let doc: Document = serde_json::from_str(line)
                .with_context(|| format!("{}:{}: invalid document record", file_path.display(), line_no + 1))?;
            out.push(doc);
        }
        Ok(())
    }

    fn limit_reached(&self, docs: &[Document]) -> bool {
        self.limit.is_some_and(|limit| docs.len() >= limit)
    }

    fn list_jsonl_files(&self, root: &Path) -> Vec<PathBuf> {
        let mut files = Vec::new();
        for entry in walkdir::WalkDir::new(root).into_iter().filter_map(|e| e.ok()).filter(|e| e.file_type().is_file()) {
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) == Some("jsonl") { files.push(path.to_path_buf()); }
        }
        files.sort();
        files
    }
}
