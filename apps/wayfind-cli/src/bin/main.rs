use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use wayfind_core::config::{Config, Settings};
use wayfind_core::ingest::DocumentLoader;
use wayfind_embed::get_default_embedder;
use wayfind_vector::pipeline::build_corpus;
use wayfind_vector::{GraphParams, SearchRequest, SearchResponse, SearchService};

#[derive(Parser)]
#[command(name = "wayfind", about = "Build and query a category-filtered document index")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Embed JSONL documents, build the graph index and save it.
    Build {
        /// A .jsonl file or a directory of them (default: data.documents_dir).
        #[arg(long)]
        input: Option<PathBuf>,
        /// Output directory (default: data.index_dir).
        #[arg(long)]
        out: Option<PathBuf>,
        /// Only index the first N documents.
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Search the saved index.
    Query {
        text: String,
        #[arg(long)]
        top_k: Option<usize>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        index: Option<PathBuf>,
        /// Print the raw JSON response.
        #[arg(long)]
        json: bool,
    },
    /// List the categories in the saved index.
    Categories {
        #[arg(long)]
        index: Option<PathBuf>,
    },
    /// Report whether the index loads and how many documents it serves.
    Health {
        #[arg(long)]
        index: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let cli = Cli::parse();
    let config = Config::load().map_err(|e| { eprintln!("Error loading config: {}", e); e })?;
    let settings = config.settings()?;

    match cli.command {
        Command::Build { input, out, limit } => build(&settings, input, out, limit).await,
        Command::Query { text, top_k, category, index, json } => {
            let service = open_service(&settings, index).await?;
            let mut request = SearchRequest::text(&text);
            request.top_k = top_k;
            request.category_filter = category;
            let response = service.search(&request)?;
            if json { println!("{}", serde_json::to_string_pretty(&response)?); } else { print_results(&response); }
            Ok(())
        }
        Command::Categories { index } => {
            let service = open_service(&settings, index).await?;
            println!("{}", serde_json::to_string_pretty(&serde_json::json!({ "categories": service.categories()? }))?);
            Ok(())
        }
        Command::Health { index } => {
            let service = service_for(&settings)?;
            let dir = index.unwrap_or_else(|| settings.data.index_dir());
            if let Err(e) = service.load_dir(&dir).await {
                tracing::warn!(dir = %dir.display(), error = %e, "index not loaded");
            }
            println!("{}", serde_json::to_string_pretty(&service.health())?);
            Ok(())
        }
    }
}

async fn build(settings: &Settings, input: Option<PathBuf>, out: Option<PathBuf>, limit: Option<usize>) -> anyhow::Result<()> {
    let input = input.unwrap_or_else(|| settings.data.documents_dir());
    let out = out.unwrap_or_else(|| settings.data.index_dir());
    println!("wayfind index builder\n=====================");
    println!("Input: {}", input.display());
    println!("Output: {}", out.display());

    let loader = match limit {
        Some(n) => { println!("🔢 Limiting to {} documents", n); DocumentLoader::with_limit(n) }
        None => DocumentLoader::new(),
    };
    let documents = loader.load(&input).with_context(|| format!("loading documents from {}", input.display()))?;
    println!("📄 Loaded {} documents", documents.len());

    let embedder = get_default_embedder(&settings.embedding)?;
    let params = GraphParams::from(&settings.index);
    let batch_size = settings.embedding.batch_size;
    let out_dir = out.clone();
    let corpus = tokio::task::spawn_blocking(move || -> anyhow::Result<_> {
        let corpus = build_corpus(embedder.as_ref(), documents, params, batch_size)?;
        corpus.save(&out_dir)?;
        Ok(corpus)
    })
    .await??;
    println!("📊 Indexed {} documents ({} categories) into {}", corpus.len(), corpus.categories().len(), out.display());

    if let Some(first) = corpus.store().iter().next() {
        let service = service_for(settings)?;
        service.publish(corpus.clone())?;
        let smoke_query = first.text.chars().take(80).collect::<String>();
        let response = service.search(&SearchRequest::text(smoke_query).with_top_k(3))?;
        println!("\n🔍 Smoke query: \"{}\"", response.query.as_deref().unwrap_or_default());
        print_results(&response);
    }
    println!("\n✅ Build completed successfully!");
    println!("💡 To search, use: wayfind query '<text>' --index {}", out.display());
    Ok(())
}

fn service_for(settings: &Settings) -> anyhow::Result<SearchService> {
    let embedder: Arc<dyn wayfind_core::traits::Embedder> = Arc::from(get_default_embedder(&settings.embedding)?);
    Ok(SearchService::from_settings(embedder, settings)?)
}

async fn open_service(settings: &Settings, index: Option<PathBuf>) -> anyhow::Result<SearchService> {
    let service = service_for(settings)?;
    let dir = index.unwrap_or_else(|| settings.data.index_dir());
    service.load_dir(&dir).await.with_context(|| format!("loading index from {}", dir.display()))?;
    Ok(service)
}

fn print_results(response: &SearchResponse) {
    println!("\n🔍 Found {} results", response.results.len());
    for (i, result) in response.results.iter().enumerate() {
        println!("\n  {}. score={:.4}  id={}  category={}", i + 1, result.score, result.id, result.category);
        println!("     📝 {}", result.text);
    }
}
