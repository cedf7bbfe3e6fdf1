//! Memory client layer
//!
//! The [`MemoryStore`] trait is the seam between the bridge and the
//! external services. Its concrete implementation, [`MemoryClient`],
//! composes an embeddings HTTP client and a Qdrant REST client and does
//! request/response plumbing only: no ranking, indexing, or inference
//! happens on this side of the wire.

pub mod embedding;
pub mod vector;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::debug;
use uuid::Uuid;

use crate::config::{Config, EMBEDDING_DIMENSIONS};
use embedding::EmbeddingClient;
use vector::{RetrievedPoint, ScoredPoint, VectorStoreClient};

/// Client-tier errors
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API returned {status}: {message}")]
    Api { status: u16, message: String },
    #[error("Failed to parse response: {0}")]
    Parse(String),
    #[error("Memory not found: {0}")]
    NotFound(String),
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias for client operations
pub type ClientResult<T> = std::result::Result<T, ClientError>;

/// A single chat-style message handed to the add operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    /// Wrap plain text as a user-role message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// The operations the external memory service exposes.
///
/// Every method returns a typed result; callers decide how failures map
/// onto their own error surface.
#[async_trait]
pub trait MemoryStore: Send + Sync {
    /// Store each message as a memory record scoped to `user_id`
    async fn add(
        &self,
        messages: &[ChatMessage],
        user_id: &str,
        metadata: Map<String, Value>,
    ) -> ClientResult<Value>;

    /// Similarity search over the user's records
    async fn search(&self, query: &str, user_id: &str, limit: usize) -> ClientResult<Vec<Value>>;

    /// List every record scoped to `user_id`
    async fn get_all(&self, user_id: &str) -> ClientResult<Vec<Value>>;

    /// Merge `data` into an existing record
    async fn update(&self, memory_id: &str, data: &Value) -> ClientResult<Value>;

    /// Remove a record by id
    async fn delete(&self, memory_id: &str) -> ClientResult<Value>;
}

/// Concrete memory client over Qdrant and an OpenAI-compatible
/// embeddings endpoint.
pub struct MemoryClient {
    embedder: EmbeddingClient,
    vectors: VectorStoreClient,
}

impl MemoryClient {
    /// Build both HTTP clients and make sure the collection exists.
    pub async fn connect(config: &Config) -> ClientResult<Self> {
        let api_key = config
            .embedding
            .api_key
            .clone()
            .ok_or_else(|| {
                ClientError::Config("OPENAI_API_KEY environment variable is required".to_string())
            })?;

        let embedder = EmbeddingClient::new(&config.embedding, api_key)?;
        let vectors = VectorStoreClient::new(&config.vector_store)?;
        vectors.ensure_collection(EMBEDDING_DIMENSIONS).await?;

        Ok(Self { embedder, vectors })
    }
}

/// Shape a scored search hit as an opaque record: payload + id + score.
fn record_from_scored(point: ScoredPoint) -> Value {
    let mut record = point.payload.unwrap_or_default();
    record.insert("id".to_string(), point.id);
    record.insert("score".to_string(), json!(point.score));
    Value::Object(record)
}

/// Shape a retrieved point as an opaque record: payload + id.
fn record_from_retrieved(point: RetrievedPoint) -> Value {
    let mut record = point.payload.unwrap_or_default();
    record.insert("id".to_string(), point.id);
    Value::Object(record)
}

#[async_trait]
impl MemoryStore for MemoryClient {
    async fn add(
        &self,
        messages: &[ChatMessage],
        user_id: &str,
        metadata: Map<String, Value>,
    ) -> ClientResult<Value> {
        let mut events = Vec::with_capacity(messages.len());

        for message in messages {
            let vector = self.embedder.embed(&message.content).await?;
            let id = Uuid::new_v4().to_string();

            let mut payload = metadata.clone();
            payload.insert("memory".to_string(), json!(message.content));
            payload.insert("role".to_string(), json!(message.role));
            payload.insert("user_id".to_string(), json!(user_id));

            self.vectors.upsert(&id, &vector, &payload).await?;
            debug!("Stored memory {id} for user {user_id}");

            events.push(json!({
                "id": id,
                "memory": message.content,
                "event": "ADD",
            }));
        }

        Ok(json!({ "results": events }))
    }

    async fn search(&self, query: &str, user_id: &str, limit: usize) -> ClientResult<Vec<Value>> {
        let vector = self.embedder.embed(query).await?;
        let hits = self.vectors.search(&vector, user_id, limit).await?;
        Ok(hits.into_iter().map(record_from_scored).collect())
    }

    async fn get_all(&self, user_id: &str) -> ClientResult<Vec<Value>> {
        let points = self.vectors.scroll(user_id).await?;
        Ok(points.into_iter().map(record_from_retrieved).collect())
    }

    async fn update(&self, memory_id: &str, data: &Value) -> ClientResult<Value> {
        let fields = data.as_object().ok_or_else(|| {
            ClientError::InvalidPayload("update data must be a JSON object".to_string())
        })?;

        let existing = self.vectors.retrieve(memory_id).await?;
        let mut payload = existing.payload.unwrap_or_default();

        let previous_content = payload
            .get("memory")
            .and_then(Value::as_str)
            .map(str::to_string);
        for (key, value) in fields {
            payload.insert(key.clone(), value.clone());
        }

        let new_content = payload.get("memory").and_then(Value::as_str);
        match new_content {
            // Content changed: the stored vector no longer matches, re-embed
            Some(content) if previous_content.as_deref() != Some(content) => {
                let vector = self.embedder.embed(content).await?;
                self.vectors.upsert(memory_id, &vector, &payload).await?;
            }
            _ => {
                self.vectors.set_payload(memory_id, &payload).await?;
            }
        }
        debug!("Updated memory {memory_id}");

        Ok(json!({ "id": memory_id, "event": "UPDATE" }))
    }

    async fn delete(&self, memory_id: &str) -> ClientResult<Value> {
        self.vectors.delete(memory_id).await?;
        debug!("Deleted memory {memory_id}");
        Ok(json!({ "id": memory_id, "event": "DELETE" }))
    }
}
