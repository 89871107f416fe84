use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tempfile::TempDir;

use wayfind_core::config::{EmbeddingSettings, SearchSettings, Settings};
use wayfind_core::traits::Embedder;
use wayfind_core::types::Document;
use wayfind_core::Error;
use wayfind_embed::HashEmbedder;
use wayfind_vector::pipeline::build_corpus;
use wayfind_vector::{GraphParams, SearchRequest, SearchService};

const DIM: usize = 256;

fn documents() -> Vec<Document> {
    let rows = [
        ("landmarks", "Coit Tower art deco tower on Telegraph Hill"),
        ("landmarks", "Golden Gate Bridge suspension bridge over the strait"),
        ("landmarks", "Palace of Fine Arts rotunda by the lagoon"),
        ("murals", "Balmy Alley murals in the Mission district"),
        ("murals", "Women's Building murals covering the facade"),
        ("food", "Mission burrito taqueria with carnitas"),
        ("food", "Dim sum bakery in Chinatown"),
        ("parks", "Dolores Park hill with skyline views"),
    ];
    let mut per_category = std::collections::HashMap::new();
    rows.iter()
        .map(|(category, text)| {
            let row = per_category.entry(*category).or_insert(0usize);
            let doc = Document::from_row(category, *row, *text);
            *row += 1;
            doc
        })
        .collect()
}

fn settings() -> SearchSettings {
    SearchSettings { default_top_k: 3, max_top_k: 5, ..SearchSettings::default() }
}

fn service() -> SearchService {
    SearchService::new(Arc::new(HashEmbedder::new(DIM)), &settings()).expect("service")
}

#[tokio::test]
async fn nothing_loaded() {
    let service = service();
    assert!(matches!(service.search(&SearchRequest::text("tower")), Err(Error::NotLoaded)));
    assert!(matches!(service.categories(), Err(Error::NotLoaded)));
    let health = service.health();
    assert!(!health.loaded);
    assert_eq!(health.documents_indexed, 0);
}

#[tokio::test]
async fn rebuild_then_search() {
    let service = service();
    let n = service.rebuild(documents(), GraphParams::default()).await.expect("rebuild");
    assert_eq!(n, 8);

    let health = service.health();
    assert_eq!(health.status, "healthy");
    assert!(health.loaded);
    assert_eq!(health.documents_indexed, 8);
    assert_eq!(service.categories().unwrap(), ["food", "landmarks", "murals", "parks"]);

    let response = service.search(&SearchRequest::text("Coit Tower art deco tower on Telegraph Hill")).unwrap();
    assert_eq!(response.query.as_deref(), Some("Coit Tower art deco tower on Telegraph Hill"));
    assert_eq!(response.results.len(), 3);
    assert_eq!(response.results[0].id, "landmarks_0");
    assert!(response.results[0].score < 1e-4);
    assert!(response.results.windows(2).all(|w| w[0].score <= w[1].score));

    let filtered = service.search(&SearchRequest::text("murals").with_category("murals").with_top_k(2)).unwrap();
    assert!(!filtered.results.is_empty());
    assert!(filtered.results.iter().all(|r| r.category == "murals"));
}

#[tokio::test]
async fn top_k_is_clamped_and_validated() {
    let service = service();
    service.rebuild(documents(), GraphParams::default()).await.unwrap();
    let response = service.search(&SearchRequest::text("hill").with_top_k(50)).unwrap();
    assert_eq!(response.results.len(), 5);
    assert!(matches!(service.search(&SearchRequest::text("hill").with_top_k(0)), Err(Error::Data(_))));
}

#[tokio::test]
async fn request_needs_exactly_one_of_query_or_vector() {
    let service = service();
    service.rebuild(documents(), GraphParams::default()).await.unwrap();

    let both = SearchRequest { query: Some("tower".into()), vector: Some(vec![0.0; DIM]), ..SearchRequest::default() };
    assert!(matches!(service.search(&both), Err(Error::Data(_))));
    assert!(matches!(service.search(&SearchRequest::default()), Err(Error::Data(_))));

    let by_vector = service.search(&SearchRequest::vector(HashEmbedder::new(DIM).embed_text("Dim sum bakery in Chinatown"))).unwrap();
    assert_eq!(by_vector.query, None);
    assert_eq!(by_vector.results[0].id, "food_1");

    assert!(matches!(
        service.search(&SearchRequest::vector(vec![0.0; 3])),
        Err(Error::Capacity { expected: DIM, actual: 3 })
    ));
}

#[tokio::test]
async fn load_dir_publishes_saved_corpus() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join("index");
    let embedder = HashEmbedder::new(DIM);
    build_corpus(&embedder, documents(), GraphParams::default(), 3).unwrap().save(&dir).unwrap();

    let service = service();
    assert_eq!(service.load_dir(&dir).await.unwrap(), 8);
    let response = service.search(&SearchRequest::text("Golden Gate Bridge")).unwrap();
    assert_eq!(response.results[0].id, "landmarks_1");

    service.unload();
    assert!(!service.health().loaded);
    assert!(matches!(service.load_dir(tmp.path().join("missing")).await, Err(Error::Format(_))));
}

#[tokio::test]
async fn publish_rejects_other_dimension() {
    let other = build_corpus(&HashEmbedder::new(16), documents(), GraphParams::default(), 4).unwrap();
    let service = service();
    assert!(matches!(service.publish(other), Err(Error::Capacity { expected: DIM, actual: 16 })));
    assert!(!service.health().loaded);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn readers_keep_working_across_swaps() {
    let service = Arc::new(service());
    service.rebuild(documents(), GraphParams::default()).await.unwrap();

    let mut readers = Vec::new();
    for i in 0..4 {
        let service = Arc::clone(&service);
        readers.push(tokio::spawn(async move {
            for _ in 0..50 {
                let response = service.search(&SearchRequest::text(format!("murals {i}"))).expect("search during swap");
                assert!(!response.results.is_empty());
                tokio::task::yield_now().await;
            }
        }));
    }
    for _ in 0..3 {
        let mut docs = documents();
        docs.push(Document::new("extra_0", "parks", "Presidio trails"));
        service.rebuild(docs, GraphParams::default()).await.unwrap();
        service.rebuild(documents(), GraphParams::default()).await.unwrap();
    }
    for reader in readers {
        reader.await.unwrap();
    }
    assert_eq!(service.health().documents_indexed, 8);
}

/// Delegates to [`HashEmbedder`] and remembers the largest batch it was given.
struct BatchRecorder {
    inner: HashEmbedder,
    largest: Arc<AtomicUsize>,
}

impl Embedder for BatchRecorder {
    fn dim(&self) -> usize {
        self.inner.dim()
    }

    fn embed_documents(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        self.largest.fetch_max(texts.len(), Ordering::SeqCst);
        self.inner.embed_documents(texts)
    }
}

#[tokio::test]
async fn rebuild_uses_configured_batch_size() {
    let largest = Arc::new(AtomicUsize::new(0));
    let embedder = BatchRecorder { inner: HashEmbedder::new(DIM), largest: Arc::clone(&largest) };
    let config = Settings {
        search: settings(),
        embedding: EmbeddingSettings { batch_size: 3, ..EmbeddingSettings::default() },
        ..Settings::default()
    };
    let service = SearchService::from_settings(Arc::new(embedder), &config).unwrap();
    assert_eq!(service.rebuild(documents(), GraphParams::default()).await.unwrap(), 8);
    assert_eq!(largest.load(Ordering::SeqCst), 3);

    let zero = Settings { embedding: EmbeddingSettings { batch_size: 0, ..EmbeddingSettings::default() }, ..config };
    let service = SearchService::from_settings(Arc::new(HashEmbedder::new(DIM)), &zero).unwrap();
    assert!(matches!(service.rebuild(documents(), GraphParams::default()).await, Err(Error::InvalidConfig(_))));
    assert!(!service.health().loaded);
}
