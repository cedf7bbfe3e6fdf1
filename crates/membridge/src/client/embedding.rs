//! Embeddings client for OpenAI-compatible APIs
//!
//! Converts text into vectors via POST `{base}/embeddings` with bearer
//! auth. Works against any endpoint speaking the OpenAI embeddings
//! protocol. Failures are returned to the caller untried: the bridge
//! contract has no retries.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{ClientError, ClientResult};
use crate::config::{EmbeddingConfig, EMBEDDING_DIMENSIONS};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP client for an OpenAI-compatible embeddings endpoint
#[derive(Debug)]
pub struct EmbeddingClient {
    client: Client,
    api_url: String,
    api_key: String,
    model: String,
}

#[derive(Debug, Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: [&'a str; 1],
    dimensions: usize,
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

impl EmbeddingClient {
    pub fn new(config: &EmbeddingConfig, api_key: String) -> ClientResult<Self> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            api_key,
            model: config.model.clone(),
        })
    }

    /// Embed a single text into a fixed-dimension vector.
    pub async fn embed(&self, text: &str) -> ClientResult<Vec<f32>> {
        let url = format!("{}/embeddings", self.api_url);
        let request = EmbeddingsRequest {
            model: &self.model,
            input: [text],
            dimensions: EMBEDDING_DIMENSIONS,
        };

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await?;

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

        let parsed: EmbeddingsResponse = response
            .json()
            .await
            .map_err(|e| ClientError::Parse(e.to_string()))?;

        parsed
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| ClientError::Parse("Empty embeddings response".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(api_url: String) -> EmbeddingConfig {
        EmbeddingConfig {
            api_key: Some("sk-test".to_string()),
            api_url,
            model: "text-embedding-3-large".to_string(),
        }
    }

    fn embeddings_body(vector: Vec<f32>) -> serde_json::Value {
        serde_json::json!({
            "object": "list",
            "data": [{"object": "embedding", "index": 0, "embedding": vector}],
            "model": "text-embedding-3-large",
            "usage": {"prompt_tokens": 2, "total_tokens": 2}
        })
    }

    #[tokio::test]
    async fn test_embed_returns_vector() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .and(header("Authorization", "Bearer sk-test"))
            .and(body_partial_json(serde_json::json!({
                "model": "text-embedding-3-large",
                "input": ["hello world"],
                "dimensions": 1536,
            })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(embeddings_body(vec![0.1, 0.2, 0.3])),
            )
            .mount(&mock_server)
            .await;

        let client = EmbeddingClient::new(&test_config(mock_server.uri()), "sk-test".to_string())
            .unwrap();
        let vector = client.embed("hello world").await.unwrap();
        assert_eq!(vector, vec![0.1, 0.2, 0.3]);
    }

    #[tokio::test]
    async fn test_embed_api_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
            .mount(&mock_server)
            .await;

        let client = EmbeddingClient::new(&test_config(mock_server.uri()), "sk-bad".to_string())
            .unwrap();
        let result = client.embed("hello").await;
        match result {
            Err(ClientError::Api { status, message }) => {
                assert_eq!(status, 401);
                assert!(message.contains("invalid api key"));
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_embed_empty_data() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"object": "list", "data": []})),
            )
            .mount(&mock_server)
            .await;

        let client = EmbeddingClient::new(&test_config(mock_server.uri()), "sk-test".to_string())
            .unwrap();
        let result = client.embed("hello").await;
        assert!(matches!(result, Err(ClientError::Parse(_))));
    }

    #[tokio::test]
    async fn test_embed_trailing_slash_in_base_url() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(embeddings_body(vec![1.0])))
            .mount(&mock_server)
            .await;

        let config = test_config(format!("{}/", mock_server.uri()));
        let client = EmbeddingClient::new(&config, "sk-test".to_string()).unwrap();
        let vector = client.embed("hello").await.unwrap();
        assert_eq!(vector, vec![1.0]);
    }
}
