use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub extract: ExtractConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            cors_origin: default_cors_origin(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8000".to_string()
}
fn default_cors_origin() -> String {
    "http://localhost:3000".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExtractConfig {
    /// "page" flattens the whole document; "elements" also keeps per-element
    /// markup aligned to the text so results can carry their source HTML.
    #[serde(default = "default_policy")]
    pub policy: String,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            policy: default_policy(),
        }
    }
}

fn default_policy() -> String {
    "page".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
    #[serde(default = "default_chunk_overlap")]
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_chars: default_max_chars(),
            overlap: default_chunk_overlap(),
        }
    }
}

fn default_max_chars() -> usize {
    1000
}
fn default_chunk_overlap() -> usize {
    200
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Base URL override for the "openai" provider. Points the client at a
    /// compatible endpoint (or a test double) instead of api.openai.com.
    #[serde(default)]
    pub api_base: Option<String>,
    /// Base URL for the "ollama" provider.
    #[serde(default)]
    pub url: Option<String>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            dims: None,
            batch_size: default_batch_size(),
            api_base: None,
            url: None,
        }
    }
}

fn default_provider() -> String {
    "local".to_string()
}
fn default_batch_size() -> usize {
    32
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    #[serde(default = "default_store_provider")]
    pub provider: String,
    #[serde(default = "default_collection")]
    pub collection: String,
    #[serde(default = "default_store_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_page_limit")]
    pub page_limit: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            provider: default_store_provider(),
            collection: default_collection(),
            batch_size: default_store_batch_size(),
            page_limit: default_page_limit(),
        }
    }
}

fn default_store_provider() -> String {
    "weaviate".to_string()
}
fn default_collection() -> String {
    "PageChunk".to_string()
}
fn default_store_batch_size() -> usize {
    50
}
fn default_page_limit() -> usize {
    100
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_n")]
    pub top_n: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_n: default_top_n(),
        }
    }
}

fn default_top_n() -> usize {
    10
}

/// Credentials for the hosted vector store, read from the environment.
#[derive(Debug, Clone)]
pub struct Secrets {
    pub api_key: String,
    #[allow(dead_code)]
    pub secret_key: String,
    pub cluster_url: String,
}

impl Secrets {
    /// Reads API_KEY, SECRET_KEY, and CLUSTER_URL. All three must be present
    /// and non-empty.
    pub fn from_env() -> Result<Self> {
        let api_key = env_var("API_KEY");
        let secret_key = env_var("SECRET_KEY");
        let cluster_url = env_var("CLUSTER_URL");

        match (api_key, secret_key, cluster_url) {
            (Some(api_key), Some(secret_key), Some(cluster_url)) => Ok(Self {
                api_key,
                secret_key,
                cluster_url,
            }),
            _ => anyhow::bail!(
                "API_KEY, SECRET_KEY, or CLUSTER_URL is missing from environment variables."
            ),
        }
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.is_empty())
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config(&content)
}

fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;

    // Validate extract
    match config.extract.policy.as_str() {
        "page" | "elements" => {}
        other => anyhow::bail!(
            "Unknown extract policy: '{}'. Must be page or elements.",
            other
        ),
    }

    // Validate chunking
    if config.chunking.max_chars == 0 {
        anyhow::bail!("chunking.max_chars must be > 0");
    }
    if config.chunking.overlap >= config.chunking.max_chars {
        anyhow::bail!("chunking.overlap must be < chunking.max_chars");
    }

    // Validate retrieval
    if config.retrieval.top_n < 1 {
        anyhow::bail!("retrieval.top_n must be >= 1");
    }

    // Validate embedding
    match config.embedding.provider.as_str() {
        "disabled" | "local" => {}
        "openai" | "ollama" => {
            if config.embedding.model.is_none() {
                anyhow::bail!(
                    "embedding.model must be specified when provider is '{}'",
                    config.embedding.provider
                );
            }
            if config.embedding.dims.is_none() || config.embedding.dims == Some(0) {
                anyhow::bail!(
                    "embedding.dims must be > 0 when provider is '{}'",
                    config.embedding.provider
                );
            }
        }
        other => anyhow::bail!(
            "Unknown embedding provider: '{}'. Must be disabled, openai, ollama, or local.",
            other
        ),
    }

    // Validate store
    match config.store.provider.as_str() {
        "weaviate" | "memory" => {}
        other => anyhow::bail!(
            "Unknown store provider: '{}'. Must be weaviate or memory.",
            other
        ),
    }
    if config.store.batch_size == 0 {
        anyhow::bail!("store.batch_size must be > 0");
    }
    if config.store.page_limit == 0 {
        anyhow::bail!("store.page_limit must be > 0");
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.server.bind, "127.0.0.1:8000");
        assert_eq!(config.server.cors_origin, "http://localhost:3000");
        assert_eq!(config.extract.policy, "page");
        assert_eq!(config.chunking.max_chars, 1000);
        assert_eq!(config.chunking.overlap, 200);
        assert_eq!(config.embedding.provider, "local");
        assert_eq!(config.embedding.batch_size, 32);
        assert_eq!(config.store.provider, "weaviate");
        assert_eq!(config.store.collection, "PageChunk");
        assert_eq!(config.store.batch_size, 50);
        assert_eq!(config.retrieval.top_n, 10);
    }

    #[test]
    fn sections_override_defaults() {
        let config = parse_config(
            r#"
            [extract]
            policy = "elements"

            [chunking]
            max_chars = 400
            overlap = 40

            [store]
            provider = "memory"
            collection = "Articles"

            [retrieval]
            top_n = 3
            "#,
        )
        .unwrap();
        assert_eq!(config.extract.policy, "elements");
        assert_eq!(config.chunking.max_chars, 400);
        assert_eq!(config.chunking.overlap, 40);
        assert_eq!(config.store.provider, "memory");
        assert_eq!(config.store.collection, "Articles");
        assert_eq!(config.retrieval.top_n, 3);
    }

    #[test]
    fn rejects_overlap_not_below_max_chars() {
        let err = parse_config("[chunking]\nmax_chars = 100\noverlap = 100\n").unwrap_err();
        assert!(err.to_string().contains("chunking.overlap"));
    }

    #[test]
    fn rejects_zero_max_chars() {
        let err = parse_config("[chunking]\nmax_chars = 0\n").unwrap_err();
        assert!(err.to_string().contains("chunking.max_chars"));
    }

    #[test]
    fn rejects_unknown_extract_policy() {
        let err = parse_config("[extract]\npolicy = \"tables\"\n").unwrap_err();
        assert!(err.to_string().contains("Unknown extract policy"));
    }

    #[test]
    fn rejects_openai_without_model() {
        let err = parse_config("[embedding]\nprovider = \"openai\"\ndims = 1536\n").unwrap_err();
        assert!(err.to_string().contains("embedding.model"));
    }

    #[test]
    fn rejects_unknown_store_provider() {
        let err = parse_config("[store]\nprovider = \"pinecone\"\n").unwrap_err();
        assert!(err.to_string().contains("Unknown store provider"));
    }

    #[test]
    fn rejects_zero_top_n() {
        let err = parse_config("[retrieval]\ntop_n = 0\n").unwrap_err();
        assert!(err.to_string().contains("retrieval.top_n"));
    }
}
