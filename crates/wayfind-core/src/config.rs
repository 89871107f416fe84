//! Layered configuration and path helpers.
//!
//! Uses Figment to merge built-in defaults, `config.toml`, `config.<env>.toml`
//! and `APP_*` env vars (`__` separates nested keys, so
//! `APP_SEARCH__OVER_FETCH_FACTOR=3` sets `search.over_fetch_factor`).
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            other => tracing::warn!(env = other, "unknown RUST_ENV, using base config only"),
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment };
        config.settings()?;
        Ok(config)
    }

    /// Wrap an already-assembled figment; defaults are merged underneath it.
    pub fn from_figment(figment: Figment) -> Self {
        Self { figment: Figment::from(Serialized::defaults(Settings::default())).merge(figment) }
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    /// Typed, validated settings.
    pub fn settings(&self) -> anyhow::Result<Settings> {
        let settings: Settings = self
            .figment
            .extract()
            .map_err(|e| anyhow::anyhow!("Failed to read settings: {}", e))?;
        settings.validate()?;
        Ok(settings)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub data: DataSettings,
    #[serde(default)]
    pub index: IndexSettings,
    #[serde(default)]
    pub search: SearchSettings,
    #[serde(default)]
    pub embedding: EmbeddingSettings,
}

impl Settings {
    pub fn validate(&self) -> crate::Result<()> {
        let invalid = |msg: String| Err(crate::Error::InvalidConfig(msg));
        let idx = &self.index;
        if idx.graph_degree == 0 {
            return invalid("index.graph_degree must be at least 1".into());
        }
        if idx.intermediate_graph_degree < idx.graph_degree {
            return invalid(format!(
                "index.intermediate_graph_degree ({}) must be >= index.graph_degree ({})",
                idx.intermediate_graph_degree, idx.graph_degree
            ));
        }
        let search = &self.search;
        if search.over_fetch_factor == 0 {
            return invalid("search.over_fetch_factor must be at least 1".into());
        }
        if search.default_top_k == 0 || search.default_top_k > search.max_top_k {
            return invalid(format!(
                "search.default_top_k ({}) must be between 1 and search.max_top_k ({})",
                search.default_top_k, search.max_top_k
            ));
        }
        if search.itopk_size == 0 || search.num_seeds == 0 {
            return invalid("search.itopk_size and search.num_seeds must be at least 1".into());
        }
        let emb = &self.embedding;
        if emb.dimension == 0 || emb.batch_size == 0 {
            return invalid("embedding.dimension and embedding.batch_size must be at least 1".into());
        }
        if emb.provider != "hash" {
            return invalid(format!("unknown embedding.provider '{}'", emb.provider));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSettings {
    pub documents_dir: String,
    pub index_dir: String,
}

impl Default for DataSettings {
    fn default() -> Self {
        Self { documents_dir: "data/documents".to_string(), index_dir: "data/index".to_string() }
    }
}

impl DataSettings {
    pub fn documents_dir(&self) -> PathBuf {
        expand_path(&self.documents_dir)
    }

    pub fn index_dir(&self) -> PathBuf {
        expand_path(&self.index_dir)
    }
}

/// Graph construction knobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexSettings {
    pub intermediate_graph_degree: usize,
    pub graph_degree: usize,
    pub nn_descent_iterations: usize,
    pub exact_build_limit: usize,
    pub seed: u64,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            intermediate_graph_degree: 64,
            graph_degree: 32,
            nn_descent_iterations: 8,
            exact_build_limit: 4096,
            seed: 42,
        }
    }
}

/// Query-time knobs: result sizes, over-fetch headroom for filtering, and the
/// traversal budget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    pub default_top_k: usize,
    pub max_top_k: usize,
    pub over_fetch_factor: usize,
    pub itopk_size: usize,
    pub max_expansions: usize,
    pub num_seeds: usize,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            default_top_k: 10,
            max_top_k: 100,
            over_fetch_factor: 2,
            itopk_size: 64,
            max_expansions: 4096,
            num_seeds: 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub provider: String,
    pub dimension: usize,
    pub batch_size: usize,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self { provider: "hash".to_string(), dimension: 2048, batch_size: 32 }
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}
