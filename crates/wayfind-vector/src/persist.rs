//! On-disk layout of a built corpus.
//!
//! ```text
//! <dir>/graph.bin        dataset + adjacency (see ProximityGraph::serialize)
//! <dir>/documents.jsonl  one document per line, vector id order
//! <dir>/meta.json        IndexMeta
//! ```
//!
//! Saves are staged in a sibling directory and renamed into place, so readers
//! see either the old or the new directory, never a mix.
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use wayfind_core::types::Document;
use wayfind_core::{Error, Result};

use crate::graph::ProximityGraph;
use crate::index::{AnnIndex, GraphParams};
use crate::store::DocumentStore;

pub const FORMAT_VERSION: u32 = 1;
pub const METRIC: &str = "sqeuclidean";
pub const GRAPH_FILE: &str = "graph.bin";
pub const DOCUMENTS_FILE: &str = "documents.jsonl";
pub const META_FILE: &str = "meta.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexMeta {
    pub format_version: u32,
    pub embedding_dim: usize,
    pub num_vectors: usize,
    pub metric: String,
    pub build: GraphParams,
    /// blake3 of `graph.bin`, hex.
    pub graph_checksum: String,
    /// RFC 3339.
    pub created_at: String,
}

/// Persist `index` and `store` to `dest`, replacing whatever is there.
pub fn save(index: &AnnIndex, store: &DocumentStore, dest: &Path) -> Result<IndexMeta> {
    if index.len() != store.len() {
        return Err(Error::Alignment { documents: store.len(), nodes: index.len() });
    }
    let parent = match dest.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let name = dest
        .file_name()
        .ok_or_else(|| Error::Data(format!("{} has no directory name", dest.display())))?
        .to_string_lossy()
        .into_owned();
    fs::create_dir_all(&parent)?;

    let staging = parent.join(format!(".{name}.staging-{:016x}", rand::random::<u64>()));
    let meta = match write_artifacts(index, store, &staging) {
        Ok(meta) => meta,
        Err(e) => {
            let _ = fs::remove_dir_all(&staging);
            return Err(e);
        }
    };

    let backup = parent.join(format!(".{name}.old-{:016x}", rand::random::<u64>()));
    let had_previous = dest.exists();
    if had_previous {
        if let Err(e) = fs::rename(dest, &backup) {
            let _ = fs::remove_dir_all(&staging);
            return Err(e.into());
        }
    }
    if let Err(e) = fs::rename(&staging, dest) {
        if had_previous {
            let _ = fs::rename(&backup, dest);
        }
        let _ = fs::remove_dir_all(&staging);
        return Err(e.into());
    }
    finish_swap(&parent, had_previous.then_some(backup.as_path()), sync_dir);
    tracing::info!(dir = %dest.display(), vectors = meta.num_vectors, dim = meta.embedding_dim, "index saved");
    Ok(meta)
}

/// Runs once the new directory is live: flush the rename and drop the
/// backup. Failures are logged, the save already succeeded.
fn finish_swap(parent: &Path, backup: Option<&Path>, sync: impl FnOnce(&Path) -> io::Result<()>) {
    if let Err(e) = sync(parent) {
        tracing::warn!(dir = %parent.display(), error = %e, "failed to sync directory after rename");
    }
    if let Some(backup) = backup {
        if let Err(e) = remove_path(backup) {
            tracing::warn!(path = %backup.display(), error = %e, "failed to remove previous index");
        }
    }
}

fn write_artifacts(index: &AnnIndex, store: &DocumentStore, dir: &Path) -> Result<IndexMeta> {
    fs::create_dir_all(dir)?;

    let graph_bytes = index.graph().to_bytes();
    let checksum = blake3::hash(&graph_bytes).to_hex().to_string();
    write_synced(&dir.join(GRAPH_FILE), |w| w.write_all(&graph_bytes))?;

    write_synced(&dir.join(DOCUMENTS_FILE), |w| {
        for doc in store {
            serde_json::to_writer(&mut *w, doc).map_err(io::Error::other)?;
            w.write_all(b"\n")?;
        }
        Ok(())
    })?;

    let meta = IndexMeta {
        format_version: FORMAT_VERSION,
        embedding_dim: index.dim(),
        num_vectors: index.len(),
        metric: METRIC.to_string(),
        build: index.params().clone(),
        graph_checksum: checksum,
        created_at: Utc::now().to_rfc3339(),
    };
    let meta_json = serde_json::to_vec_pretty(&meta).map_err(|e| Error::Operation(format!("encoding meta.json: {e}")))?;
    write_synced(&dir.join(META_FILE), |w| w.write_all(&meta_json))?;
    sync_dir(dir)?;
    Ok(meta)
}

fn write_synced<F>(path: &Path, body: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<File>) -> io::Result<()>,
{
    let mut writer = BufWriter::new(File::create(path)?);
    body(&mut writer)?;
    let file = writer.into_inner().map_err(|e| e.into_error())?;
    file.sync_all()?;
    Ok(())
}

#[cfg(unix)]
fn sync_dir(dir: &Path) -> io::Result<()> {
    File::open(dir)?.sync_all()
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> io::Result<()> {
    Ok(())
}

fn remove_path(path: &Path) -> io::Result<()> {
    if path.is_dir() { fs::remove_dir_all(path) } else { fs::remove_file(path) }
}

/// Read and check `meta.json`.
pub fn read_meta(src: &Path) -> Result<IndexMeta> {
    let raw = read_artifact(src, META_FILE)?;
    let meta: IndexMeta = serde_json::from_slice(&raw).map_err(|e| Error::Format(format!("{META_FILE}: {e}")))?;
    if meta.format_version != FORMAT_VERSION {
        return Err(Error::Format(format!(
            "{META_FILE}: unsupported format version {} (expected {FORMAT_VERSION})",
            meta.format_version
        )));
    }
    if meta.metric != METRIC {
        return Err(Error::Format(format!("{META_FILE}: unsupported metric '{}'", meta.metric)));
    }
    Ok(meta)
}

/// Load a directory written by [`save`].
pub fn load(src: &Path) -> Result<(AnnIndex, DocumentStore)> {
    let meta = read_meta(src)?;

    let graph_bytes = read_artifact(src, GRAPH_FILE)?;
    let checksum = blake3::hash(&graph_bytes).to_hex().to_string();
    if checksum != meta.graph_checksum {
        return Err(Error::Format(format!("{GRAPH_FILE}: checksum mismatch")));
    }
    let graph = ProximityGraph::from_bytes(&graph_bytes)?;
    if graph.dim() != meta.embedding_dim || graph.len() != meta.num_vectors {
        return Err(Error::Format(format!(
            "{GRAPH_FILE} holds {} vectors of dim {}, {META_FILE} declares {} of dim {}",
            graph.len(),
            graph.dim(),
            meta.num_vectors,
            meta.embedding_dim
        )));
    }

    let documents = read_documents(src)?;
    let store = DocumentStore::from_documents(documents).map_err(|e| Error::Format(format!("{DOCUMENTS_FILE}: {e}")))?;
    if store.len() != graph.len() {
        return Err(Error::Alignment { documents: store.len(), nodes: graph.len() });
    }

    tracing::info!(dir = %src.display(), vectors = graph.len(), dim = graph.dim(), "index loaded");
    Ok((AnnIndex::from_graph(graph, meta.build), store))
}

fn read_documents(src: &Path) -> Result<Vec<Document>> {
    let raw = read_artifact(src, DOCUMENTS_FILE)?;
    let text = String::from_utf8(raw).map_err(|e| Error::Format(format!("{DOCUMENTS_FILE}: {e}")))?;
    let mut documents = Vec::new();
    for (line_no, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let doc: Document = serde_json::from_str(line)
            .map_err(|e| Error::Format(format!("{DOCUMENTS_FILE} line {}: {e}", line_no + 1)))?;
        documents.push(doc);
    }
    Ok(documents)
}

fn read_artifact(src: &Path, name: &str) -> Result<Vec<u8>> {
    let path = src.join(name);
    match fs::read(&path) {
        Ok(bytes) => Ok(bytes),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            Err(Error::Format(format!("missing {name} in {}", src.display())))
        }
        Err(e) => Err(e.into()),
    }
}
