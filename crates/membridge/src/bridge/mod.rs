//! The bridge between CLI commands and the memory client
//!
//! Owns configuration and the client lifecycle. Initialization failures
//! are recorded rather than raised so a misconfigured process can still
//! answer a health check; data operations gate on the `Ready` state and
//! convert every downstream failure into the error envelope.

use chrono::Utc;
use serde_json::{json, Map, Value};
use tracing::{error, info, warn};

use crate::client::{ChatMessage, ClientError, MemoryClient, MemoryStore};
use crate::client::vector::VectorStoreClient;
use crate::config::Config;
use crate::envelope::{Envelope, HealthStatus};
use crate::error::{BridgeError, Result};

/// Source tag injected into every stored record's metadata
const SOURCE_TAG: &str = "membridge";

/// Client lifecycle: only `Ready` permits data operations.
enum BridgeState {
    Uninitialized,
    Ready(Box<dyn MemoryStore>),
    Failed(String),
}

/// Mediates between the command dispatcher and the memory client.
pub struct Bridge {
    config: Config,
    state: BridgeState,
}

impl Bridge {
    /// Create a bridge that has not attempted initialization yet.
    pub fn new(config: Config) -> Self {
        Self {
            config,
            state: BridgeState::Uninitialized,
        }
    }

    /// Create a bridge in the `Ready` state over an arbitrary store.
    pub fn with_client(config: Config, client: Box<dyn MemoryStore>) -> Self {
        Self {
            config,
            state: BridgeState::Ready(client),
        }
    }

    /// Attempt to construct the memory client.
    ///
    /// Never returns an error: any failure lands in the `Failed` state
    /// with the reason recorded, leaving the process able to answer a
    /// health check that reports the degraded state.
    pub async fn initialize(&mut self) {
        info!("Initializing memory client");

        if self.config.embedding.api_key.is_none() {
            let reason = "OPENAI_API_KEY environment variable is required".to_string();
            error!("Failed to initialize memory client: {reason}");
            self.state = BridgeState::Failed(reason);
            return;
        }

        if !self.config.skip_connectivity_check {
            self.probe_vector_store().await;
        }

        match MemoryClient::connect(&self.config).await {
            Ok(client) => {
                info!("Memory client initialized successfully");
                self.state = BridgeState::Ready(Box::new(client));
            }
            Err(e) => {
                error!("Failed to initialize memory client: {e}");
                self.state = BridgeState::Failed(e.to_string());
            }
        }
    }

    /// Soft connectivity probe against the vector store. Failure is
    /// logged and swallowed: the service may be unreachable from here
    /// (e.g. inside a cluster) while still reachable by the client.
    async fn probe_vector_store(&self) {
        let probe = match VectorStoreClient::new(&self.config.vector_store) {
            Ok(client) => client,
            Err(e) => {
                warn!("Vector store connectivity check skipped: {e}");
                return;
            }
        };
        match probe.list_collections().await {
            Ok(collections) => {
                info!(
                    "Vector store connectivity check: {} collections",
                    collections.len()
                );
            }
            Err(e) => warn!("Vector store connectivity check failed: {e}"),
        }
    }

    fn store(&self) -> Result<&dyn MemoryStore> {
        match &self.state {
            BridgeState::Ready(client) => Ok(client.as_ref()),
            _ => Err(BridgeError::NotInitialized),
        }
    }

    fn operation_failed(operation: &str, e: ClientError) -> Envelope {
        error!("Failed to {operation}: {e}");
        Envelope::failure(e.to_string())
    }

    /// Store messages for a user, merging generated fields into the
    /// caller's metadata. `timestamp`, `source`, and `user_id` always
    /// override caller-supplied values.
    pub async fn add_memory(
        &self,
        messages: &[ChatMessage],
        user_id: &str,
        metadata: Option<Map<String, Value>>,
    ) -> Result<Envelope> {
        let store = self.store()?;
        info!("Adding memory for user {user_id}");

        let mut metadata = metadata.unwrap_or_default();
        metadata.insert("timestamp".to_string(), json!(Utc::now().to_rfc3339()));
        metadata.insert("source".to_string(), json!(SOURCE_TAG));
        metadata.insert("user_id".to_string(), json!(user_id));

        Ok(match store.add(messages, user_id, metadata).await {
            Ok(result) => {
                info!("Memory added successfully");
                Envelope::result(result)
            }
            Err(e) => Self::operation_failed("add memory", e),
        })
    }

    pub async fn search_memory(
        &self,
        query: &str,
        user_id: &str,
        limit: usize,
    ) -> Result<Envelope> {
        let store = self.store()?;
        info!("Searching memory for user {user_id} with query: {query}");

        Ok(match store.search(query, user_id, limit).await {
            Ok(results) => {
                info!("Found {} memories", results.len());
                Envelope::results(results)
            }
            Err(e) => Self::operation_failed("search memory", e),
        })
    }

    pub async fn get_all_memories(&self, user_id: &str) -> Result<Envelope> {
        let store = self.store()?;
        info!("Getting all memories for user {user_id}");

        Ok(match store.get_all(user_id).await {
            Ok(results) => {
                info!("Retrieved {} memories", results.len());
                Envelope::results(results)
            }
            Err(e) => Self::operation_failed("get all memories", e),
        })
    }

    pub async fn update_memory(&self, memory_id: &str, data: &Value) -> Result<Envelope> {
        let store = self.store()?;
        info!("Updating memory {memory_id}");

        Ok(match store.update(memory_id, data).await {
            Ok(result) => {
                info!("Memory updated successfully");
                Envelope::result(result)
            }
            Err(e) => Self::operation_failed("update memory", e),
        })
    }

    pub async fn delete_memory(&self, memory_id: &str) -> Result<Envelope> {
        let store = self.store()?;
        info!("Deleting memory {memory_id}");

        Ok(match store.delete(memory_id).await {
            Ok(result) => {
                info!("Memory deleted successfully");
                Envelope::result(result)
            }
            Err(e) => Self::operation_failed("delete memory", e),
        })
    }

    /// Report the bridge's state. Usable in every lifecycle state; when
    /// ready, runs a trivial probe search whose outcome is reported but
    /// never raised.
    pub async fn health_check(&self) -> Envelope {
        match &self.state {
            BridgeState::Ready(client) => {
                let mut status = HealthStatus::new(true);
                match client.search("test", "health_check", 1).await {
                    Ok(results) => {
                        status.functional = true;
                        status.test_result =
                            format!("Search test successful: {} results", results.len());
                    }
                    Err(e) => {
                        warn!("Health check probe failed: {e}");
                        status.functional = false;
                        status.test_result = format!("Search test failed: {e}");
                    }
                }
                Envelope::status(status)
            }
            BridgeState::Uninitialized => {
                let mut status = HealthStatus::new(false);
                status.test_result = "memory client not initialized".to_string();
                Envelope::status(status)
            }
            BridgeState::Failed(reason) => {
                let mut status = HealthStatus::new(false);
                status.test_result = "memory client not initialized".to_string();
                status.error = Some(reason.clone());
                Envelope::status(status)
            }
        }
    }
}
