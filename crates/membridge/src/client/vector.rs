//! Qdrant REST client
//!
//! Thin wrapper over the collection and point endpoints the bridge
//! needs: ensure-collection, upsert, filtered search, paginated scroll,
//! retrieve, payload update, and delete. Every record lives in one
//! collection and carries a `user_id` payload key used as the partition
//! filter.

use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::debug;

use super::{ClientError, ClientResult};
use crate::config::VectorStoreConfig;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeout for the startup connectivity probe
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

const SCROLL_PAGE_SIZE: usize = 256;

/// HTTP client for the Qdrant REST API
#[derive(Debug)]
pub struct VectorStoreClient {
    client: Client,
    base_url: String,
    collection: String,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    result: T,
}

/// A search hit with its similarity score
#[derive(Debug, Deserialize)]
pub struct ScoredPoint {
    pub id: Value,
    pub score: f64,
    pub payload: Option<Map<String, Value>>,
}

/// A point returned by scroll or retrieve
#[derive(Debug, Deserialize)]
pub struct RetrievedPoint {
    pub id: Value,
    pub payload: Option<Map<String, Value>>,
}

#[derive(Debug, Deserialize)]
struct ScrollPage {
    points: Vec<RetrievedPoint>,
    #[serde(default)]
    next_page_offset: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct CollectionList {
    collections: Vec<CollectionEntry>,
}

#[derive(Debug, Deserialize)]
struct CollectionEntry {
    name: String,
}

fn user_filter(user_id: &str) -> Value {
    json!({
        "must": [{ "key": "user_id", "match": { "value": user_id } }]
    })
}

impl VectorStoreClient {
    pub fn new(config: &VectorStoreConfig) -> ClientResult<Self> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            base_url: config.url(),
            collection: config.collection.clone(),
            api_key: config.api_key.clone(),
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let builder = self.client.request(method, &url);
        match &self.api_key {
            Some(key) => builder.header("api-key", key),
            None => builder,
        }
    }

    async fn check(response: Response) -> ClientResult<Response> {
        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response)
    }

    async fn parse<T: serde::de::DeserializeOwned>(response: Response) -> ClientResult<T> {
        let parsed: ApiResponse<T> = response
            .json()
            .await
            .map_err(|e| ClientError::Parse(e.to_string()))?;
        Ok(parsed.result)
    }

    /// List collection names. Used by the startup connectivity probe, so
    /// it carries its own short timeout.
    pub async fn list_collections(&self) -> ClientResult<Vec<String>> {
        let response = self
            .request(Method::GET, "/collections")
            .timeout(PROBE_TIMEOUT)
            .send()
            .await?;
        let response = Self::check(response).await?;
        let list: CollectionList = Self::parse(response).await?;
        Ok(list.collections.into_iter().map(|c| c.name).collect())
    }

    pub async fn collection_exists(&self) -> ClientResult<bool> {
        let response = self
            .request(Method::GET, &format!("/collections/{}", self.collection))
            .send()
            .await?;
        if response.status().as_u16() == 404 {
            return Ok(false);
        }
        Self::check(response).await?;
        Ok(true)
    }

    pub async fn create_collection(&self, dimensions: usize) -> ClientResult<()> {
        let body = json!({
            "vectors": { "size": dimensions, "distance": "Cosine" }
        });
        let response = self
            .request(Method::PUT, &format!("/collections/{}", self.collection))
            .json(&body)
            .send()
            .await?;
        Self::check(response).await?;
        debug!("Created collection {}", self.collection);
        Ok(())
    }

    /// Create the collection if it does not exist yet.
    pub async fn ensure_collection(&self, dimensions: usize) -> ClientResult<()> {
        if self.collection_exists().await? {
            return Ok(());
        }
        self.create_collection(dimensions).await
    }

    pub async fn upsert(
        &self,
        id: &str,
        vector: &[f32],
        payload: &Map<String, Value>,
    ) -> ClientResult<()> {
        let body = json!({
            "points": [{ "id": id, "vector": vector, "payload": payload }]
        });
        let response = self
            .request(
                Method::PUT,
                &format!("/collections/{}/points?wait=true", self.collection),
            )
            .json(&body)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    pub async fn search(
        &self,
        vector: &[f32],
        user_id: &str,
        limit: usize,
    ) -> ClientResult<Vec<ScoredPoint>> {
        let body = json!({
            "vector": vector,
            "limit": limit,
            "with_payload": true,
            "filter": user_filter(user_id),
        });
        let response = self
            .request(
                Method::POST,
                &format!("/collections/{}/points/search", self.collection),
            )
            .json(&body)
            .send()
            .await?;
        let response = Self::check(response).await?;
        Self::parse(response).await
    }

    /// Fetch every point for a user, following scroll pagination.
    pub async fn scroll(&self, user_id: &str) -> ClientResult<Vec<RetrievedPoint>> {
        let mut points = Vec::new();
        let mut offset: Option<Value> = None;

        loop {
            let mut body = json!({
                "limit": SCROLL_PAGE_SIZE,
                "with_payload": true,
                "filter": user_filter(user_id),
            });
            if let Some(next) = offset.take() {
                body["offset"] = next;
            }

            let response = self
                .request(
                    Method::POST,
                    &format!("/collections/{}/points/scroll", self.collection),
                )
                .json(&body)
                .send()
                .await?;
            let response = Self::check(response).await?;
            let page: ScrollPage = Self::parse(response).await?;

            points.extend(page.points);
            match page.next_page_offset {
                Some(next) if !next.is_null() => offset = Some(next),
                _ => break,
            }
        }

        Ok(points)
    }

    pub async fn retrieve(&self, id: &str) -> ClientResult<RetrievedPoint> {
        let response = self
            .request(
                Method::GET,
                &format!("/collections/{}/points/{}", self.collection, id),
            )
            .send()
            .await?;
        if response.status().as_u16() == 404 {
            return Err(ClientError::NotFound(id.to_string()));
        }
        let response = Self::check(response).await?;
        Self::parse(response).await
    }

    pub async fn set_payload(&self, id: &str, payload: &Map<String, Value>) -> ClientResult<()> {
        let body = json!({ "payload": payload, "points": [id] });
        let response = self
            .request(
                Method::POST,
                &format!("/collections/{}/points/payload?wait=true", self.collection),
            )
            .json(&body)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    pub async fn delete(&self, id: &str) -> ClientResult<()> {
        let body = json!({ "points": [id] });
        let response = self
            .request(
                Method::POST,
                &format!("/collections/{}/points/delete?wait=true", self.collection),
            )
            .json(&body)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }
}
