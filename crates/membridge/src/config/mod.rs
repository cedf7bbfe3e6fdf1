//! Configuration for the memory bridge
//!
//! All settings are sourced from environment variables with defaults and
//! collected into an explicit value once at process start. Nothing reads
//! the environment after construction.

use serde::Serialize;
use url::Url;

use crate::error::BridgeError;

/// Embedding vector dimension expected by the collection and the
/// embeddings endpoint.
pub const EMBEDDING_DIMENSIONS: usize = 1536;

/// Main configuration for the bridge
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    /// Vector store (Qdrant) connection settings
    pub vector_store: VectorStoreConfig,
    /// Graph store (Memgraph) settings; carried for health reporting only,
    /// the graph store is currently disabled
    pub graph_store: GraphStoreConfig,
    /// Embedding provider settings
    pub embedding: EmbeddingConfig,
    /// Skip the startup connectivity probe to the vector store
    pub skip_connectivity_check: bool,
}

/// Qdrant connection settings
#[derive(Debug, Clone, Serialize)]
pub struct VectorStoreConfig {
    pub host: String,
    pub port: u16,
    pub collection: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl VectorStoreConfig {
    /// Base URL of the Qdrant REST API
    pub fn url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

/// Memgraph connection settings
#[derive(Debug, Clone, Serialize)]
pub struct GraphStoreConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    #[serde(skip_serializing)]
    pub password: String,
}

/// Embedding provider settings
#[derive(Debug, Clone, Serialize)]
pub struct EmbeddingConfig {
    /// API key; absence is an initialization failure, not a construction one
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Base URL of the OpenAI-compatible API
    pub api_url: String,
    /// Embedding model identifier
    pub model: String,
}

fn default_qdrant_host() -> String {
    "localhost".to_string()
}

fn default_qdrant_port() -> u16 {
    6333
}

fn default_collection() -> String {
    "membridge".to_string()
}

fn default_memgraph_host() -> String {
    "localhost".to_string()
}

fn default_memgraph_port() -> u16 {
    7687
}

fn default_memgraph_user() -> String {
    "memgraph".to_string()
}

fn default_memgraph_password() -> String {
    "memgraph".to_string()
}

fn default_embedding_api_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_embedding_model() -> String {
    "text-embedding-3-large".to_string()
}

fn parse_port(name: &str, value: &str) -> Result<u16, BridgeError> {
    value
        .trim()
        .parse()
        .map_err(|e| BridgeError::Config(format!("Invalid {name} value: {e}")))
}

impl Config {
    /// Build the configuration from process environment variables.
    pub fn from_env() -> Result<Self, BridgeError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable lookup.
    ///
    /// Keeps construction testable without mutating process-global state.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, BridgeError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vector_store = VectorStoreConfig {
            host: lookup("QDRANT_HOST").unwrap_or_else(default_qdrant_host),
            port: match lookup("QDRANT_PORT") {
                Some(v) => parse_port("QDRANT_PORT", &v)?,
                None => default_qdrant_port(),
            },
            collection: lookup("QDRANT_COLLECTION").unwrap_or_else(default_collection),
            api_key: lookup("QDRANT_API_KEY").filter(|k| !k.trim().is_empty()),
        };

        let graph_store = GraphStoreConfig {
            host: lookup("MEMGRAPH_HOST").unwrap_or_else(default_memgraph_host),
            port: match lookup("MEMGRAPH_PORT") {
                Some(v) => parse_port("MEMGRAPH_PORT", &v)?,
                None => default_memgraph_port(),
            },
            user: lookup("MEMGRAPH_USER").unwrap_or_else(default_memgraph_user),
            password: lookup("MEMGRAPH_PASSWORD").unwrap_or_else(default_memgraph_password),
        };

        let embedding = EmbeddingConfig {
            api_key: lookup("OPENAI_API_KEY").filter(|k| !k.trim().is_empty()),
            api_url: lookup("OPENAI_BASE_URL").unwrap_or_else(default_embedding_api_url),
            model: lookup("OPENAI_EMBEDDING_MODEL").unwrap_or_else(default_embedding_model),
        };

        Url::parse(&vector_store.url())
            .map_err(|e| BridgeError::Config(format!("Invalid vector store address: {e}")))?;
        Url::parse(&embedding.api_url)
            .map_err(|e| BridgeError::Config(format!("Invalid embedding API URL: {e}")))?;

        let skip_connectivity_check = lookup("SKIP_CONNECTIVITY_CHECK")
            .map(|v| v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        Ok(Self {
            vector_store,
            graph_store,
            embedding,
            skip_connectivity_check,
        })
    }
}
