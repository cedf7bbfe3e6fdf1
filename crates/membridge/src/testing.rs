//! Test utilities for membridge
//!
//! Provides a scriptable in-memory [`MemoryStore`] so bridge behavior can
//! be exercised without HTTP services.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use crate::client::{ChatMessage, ClientError, ClientResult, MemoryStore};

/// Scriptable mock store: returns canned records, optionally fails every
/// operation, and captures the metadata passed to `add`.
#[derive(Default)]
pub struct MockMemoryStore {
    records: Vec<Value>,
    failure: Option<String>,
    captured_metadata: Arc<Mutex<Option<Map<String, Value>>>>,
}

impl MockMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records returned by `search` (truncated to the limit) and `get_all`.
    pub fn with_records(mut self, records: Vec<Value>) -> Self {
        self.records = records;
        self
    }

    /// Make every operation fail with the given message.
    pub fn with_failure(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self
    }

    /// Handle to the metadata captured by the last `add` call.
    pub fn captured_metadata(&self) -> Arc<Mutex<Option<Map<String, Value>>>> {
        Arc::clone(&self.captured_metadata)
    }

    fn fail_if_scripted(&self) -> ClientResult<()> {
        match &self.failure {
            Some(message) => Err(ClientError::Api {
                status: 500,
                message: message.clone(),
            }),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl MemoryStore for MockMemoryStore {
    async fn add(
        &self,
        messages: &[ChatMessage],
        _user_id: &str,
        metadata: Map<String, Value>,
    ) -> ClientResult<Value> {
        self.fail_if_scripted()?;
        *self.captured_metadata.lock().unwrap() = Some(metadata);

        let events: Vec<Value> = messages
            .iter()
            .enumerate()
            .map(|(i, m)| {
                json!({ "id": format!("mock-{i}"), "memory": m.content, "event": "ADD" })
            })
            .collect();
        Ok(json!({ "results": events }))
    }

    async fn search(&self, _query: &str, _user_id: &str, limit: usize) -> ClientResult<Vec<Value>> {
        self.fail_if_scripted()?;
        Ok(self.records.iter().take(limit).cloned().collect())
    }

    async fn get_all(&self, _user_id: &str) -> ClientResult<Vec<Value>> {
        self.fail_if_scripted()?;
        Ok(self.records.clone())
    }

    async fn update(&self, memory_id: &str, data: &Value) -> ClientResult<Value> {
        self.fail_if_scripted()?;
        if !data.is_object() {
            return Err(ClientError::InvalidPayload(
                "update data must be a JSON object".to_string(),
            ));
        }
        Ok(json!({ "id": memory_id, "event": "UPDATE" }))
    }

    async fn delete(&self, memory_id: &str) -> ClientResult<Value> {
        self.fail_if_scripted()?;
        Ok(json!({ "id": memory_id, "event": "DELETE" }))
    }
}
