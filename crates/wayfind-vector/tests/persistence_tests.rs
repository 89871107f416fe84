use std::fs;
use std::path::Path;

use tempfile::TempDir;

use wayfind_core::types::{Document, Location, MetaValue, Metadata};
use wayfind_core::Error;
use wayfind_vector::persist::{self, DOCUMENTS_FILE, GRAPH_FILE, META_FILE};
use wayfind_vector::{AnnIndex, DocumentStore, GraphParams, IndexedCorpus};

fn corpus(n: usize) -> IndexedCorpus {
    let documents: Vec<Document> = (0..n)
        .map(|i| {
            let mut metadata = Metadata::new();
            metadata.insert("name".into(), MetaValue::from(format!("place {i}")));
            metadata.insert("visits".into(), MetaValue::Int(i as i64 * 10));
            metadata.insert("rating".into(), MetaValue::Float(4.0));
            metadata.insert("note".into(), MetaValue::Null);
            let category = if i % 3 == 0 { "parks" } else { "murals" };
            Document::from_row(category, i, format!("place {i} in the city"))
                .with_metadata(metadata)
                .with_location(Location { lat: Some(37.7 + i as f64 * 0.001), lon: None })
        })
        .collect();
    let vectors: Vec<Vec<f32>> = (0..n).map(|i| vec![i as f32, (i % 5) as f32, (i % 7) as f32 * 0.5]).collect();
    let params = GraphParams { graph_degree: 8, intermediate_graph_degree: 16, ..GraphParams::default() };
    IndexedCorpus::build(documents, &vectors, 3, params).expect("build")
}

#[test]
fn save_then_load_preserves_alignment_and_results() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join("index");
    let original = corpus(40);
    let meta = original.save(&dir).expect("save");
    assert_eq!(meta.num_vectors, 40);
    assert_eq!(meta.embedding_dim, 3);
    assert_eq!(meta.metric, "sqeuclidean");
    assert_eq!(meta.build.graph_degree, 8);
    assert!(chrono::DateTime::parse_from_rfc3339(&meta.created_at).is_ok());
    for file in [GRAPH_FILE, DOCUMENTS_FILE, META_FILE] {
        assert!(dir.join(file).is_file(), "{file} missing");
    }

    let loaded = IndexedCorpus::load(&dir).expect("load");
    assert_eq!(loaded.len(), original.len());
    assert_eq!(loaded.index().graph(), original.index().graph());
    assert_eq!(loaded.index().params(), original.index().params());
    for id in 0..loaded.len() {
        assert_eq!(loaded.store().resolve(id).unwrap(), original.store().resolve(id).unwrap());
    }
    assert_eq!(loaded.store().resolve(2).unwrap().metadata["visits"], MetaValue::Int(20));
    assert_eq!(loaded.store().resolve(2).unwrap().metadata["rating"], MetaValue::Float(4.0));

    for id in [0usize, 13, 39] {
        let v = loaded.index().graph().vector(id).to_vec();
        assert_eq!(loaded.index().search(&v, 5).unwrap(), original.index().search(&v, 5).unwrap());
        assert_eq!(loaded.index().search(&v, 1).unwrap()[0].id, id);
    }
}

#[test]
fn resaving_a_loaded_corpus_is_byte_identical() {
    let tmp = TempDir::new().unwrap();
    let first = tmp.path().join("first");
    let second = tmp.path().join("second");
    let meta = corpus(25).save(&first).unwrap();
    let meta2 = IndexedCorpus::load(&first).unwrap().save(&second).unwrap();
    assert_eq!(meta.graph_checksum, meta2.graph_checksum);
    for file in [GRAPH_FILE, DOCUMENTS_FILE] {
        assert_eq!(fs::read(first.join(file)).unwrap(), fs::read(second.join(file)).unwrap(), "{file} differs");
    }
}

#[test]
fn empty_corpus_round_trips() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join("empty");
    IndexedCorpus::build(Vec::new(), &[], 3, GraphParams::default()).unwrap().save(&dir).unwrap();
    let loaded = IndexedCorpus::load(&dir).unwrap();
    assert!(loaded.is_empty());
    assert_eq!(loaded.dim(), 3);
    assert!(loaded.index().search(&[0.0, 0.0, 0.0], 3).unwrap().is_empty());
}

#[test]
fn misaligned_save_writes_nothing() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join("index");
    let index = AnnIndex::build(2, &[vec![0.0, 0.0], vec![1.0, 1.0]], GraphParams::default()).unwrap();
    let store = DocumentStore::from_documents(vec![Document::new("a", "x", "a")]).unwrap();
    let err = persist::save(&index, &store, &dir).unwrap_err();
    assert!(matches!(err, Error::Alignment { documents: 1, nodes: 2 }));
    assert!(!dir.exists());
    assert_eq!(fs::read_dir(tmp.path()).unwrap().count(), 0);
}

#[test]
fn failed_save_keeps_previous_index() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join("index");
    corpus(10).save(&dir).unwrap();

    let index = AnnIndex::build(2, &[vec![0.0, 0.0]], GraphParams::default()).unwrap();
    assert!(persist::save(&index, &DocumentStore::new(), &dir).is_err());
    assert_eq!(IndexedCorpus::load(&dir).unwrap().len(), 10);

    corpus(12).save(&dir).unwrap();
    assert_eq!(IndexedCorpus::load(&dir).unwrap().len(), 12);
}

fn saved(tmp: &TempDir) -> std::path::PathBuf {
    let dir = tmp.path().join("index");
    corpus(15).save(&dir).unwrap();
    dir
}

fn load_err(dir: &Path) -> Error {
    persist::load(dir).err().expect("load should fail")
}

#[test]
fn corrupt_graph_is_a_format_error() {
    let tmp = TempDir::new().unwrap();
    let dir = saved(&tmp);
    let path = dir.join(GRAPH_FILE);
    let mut bytes = fs::read(&path).unwrap();
    let mid = bytes.len() / 2;
    bytes[mid] ^= 0xFF;
    fs::write(&path, &bytes).unwrap();
    let err = load_err(&dir);
    assert!(matches!(err, Error::Format(ref m) if m.contains("checksum")), "{err}");

    fs::remove_file(&path).unwrap();
    assert!(matches!(load_err(&dir), Error::Format(_)));
}

#[test]
fn bad_meta_is_a_format_error() {
    let tmp = TempDir::new().unwrap();
    let dir = saved(&tmp);
    let path = dir.join(META_FILE);

    let mut meta: serde_json::Value = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
    meta["format_version"] = serde_json::json!(99);
    fs::write(&path, serde_json::to_vec(&meta).unwrap()).unwrap();
    assert!(matches!(load_err(&dir), Error::Format(ref m) if m.contains("version")));

    fs::write(&path, b"{ not json").unwrap();
    assert!(matches!(load_err(&dir), Error::Format(_)));

    fs::remove_file(&path).unwrap();
    assert!(matches!(load_err(&dir), Error::Format(ref m) if m.contains("meta.json")));
}

#[test]
fn meta_disagreeing_with_graph_is_a_format_error() {
    let tmp = TempDir::new().unwrap();
    let dir = saved(&tmp);
    let path = dir.join(META_FILE);
    let mut meta: serde_json::Value = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
    meta["embedding_dim"] = serde_json::json!(4);
    fs::write(&path, serde_json::to_vec(&meta).unwrap()).unwrap();
    assert!(matches!(load_err(&dir), Error::Format(_)));
}

#[test]
fn document_count_mismatch_is_an_alignment_error() {
    let tmp = TempDir::new().unwrap();
    let dir = saved(&tmp);
    let path = dir.join(DOCUMENTS_FILE);
    let content = fs::read_to_string(&path).unwrap();
    let extra = serde_json::to_string(&Document::new("extra_0", "parks", "one too many")).unwrap();
    fs::write(&path, format!("{content}{extra}\n")).unwrap();
    assert!(matches!(load_err(&dir), Error::Alignment { documents: 16, nodes: 15 }));

    let truncated: Vec<&str> = content.lines().take(14).collect();
    fs::write(&path, truncated.join("\n")).unwrap();
    assert!(matches!(load_err(&dir), Error::Alignment { documents: 14, nodes: 15 }));
}

#[test]
fn unparseable_document_line_names_the_line() {
    let tmp = TempDir::new().unwrap();
    let dir = saved(&tmp);
    let path = dir.join(DOCUMENTS_FILE);
    let content = fs::read_to_string(&path).unwrap();
    let mut lines: Vec<String> = content.lines().map(str::to_string).collect();
    lines[1] = "{\"id\": 5".to_string();
    fs::write(&path, lines.join("\n")).unwrap();
    let err = load_err(&dir);
    assert!(matches!(err, Error::Format(ref m) if m.contains("line 2")), "{err}");
}
