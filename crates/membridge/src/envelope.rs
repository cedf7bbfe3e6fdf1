//! The uniform result envelope returned by every bridge operation
//!
//! Every operation resolves to `{success, result|results|status|error}`
//! with exactly one payload key present. The shape is enforced
//! structurally: each variant carries its one payload field.

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;

/// Uniform success/error envelope.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Envelope {
    /// A single operation result (add, update, delete)
    Result { success: bool, result: Value },
    /// A list of records (search, get_all)
    Results { success: bool, results: Vec<Value> },
    /// Health report
    Status { success: bool, status: HealthStatus },
    /// Operation-level failure
    Error { success: bool, error: String },
}

impl Envelope {
    pub fn result(result: Value) -> Self {
        Self::Result {
            success: true,
            result,
        }
    }

    pub fn results(results: Vec<Value>) -> Self {
        Self::Results {
            success: true,
            results,
        }
    }

    pub fn status(status: HealthStatus) -> Self {
        Self::Status {
            success: true,
            status,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self::Error {
            success: false,
            error: error.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        match self {
            Self::Result { success, .. }
            | Self::Results { success, .. }
            | Self::Status { success, .. }
            | Self::Error { success, .. } => *success,
        }
    }
}

/// Health check report carried by [`Envelope::Status`].
#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    /// Whether the memory client was constructed successfully
    pub initialized: bool,
    /// RFC 3339 report time
    pub timestamp: String,
    /// Static descriptors of the configured providers
    pub config: ProviderDescriptors,
    /// True iff initialized and the probe search succeeded
    pub functional: bool,
    /// Human-readable probe outcome
    pub test_result: String,
    /// Recorded initialization failure, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HealthStatus {
    pub fn new(initialized: bool) -> Self {
        Self {
            initialized,
            timestamp: Utc::now().to_rfc3339(),
            config: ProviderDescriptors::default(),
            functional: false,
            test_result: String::new(),
            error: None,
        }
    }
}

/// Names of the external components the bridge is configured against.
#[derive(Debug, Clone, Serialize)]
pub struct ProviderDescriptors {
    pub vector_store: &'static str,
    pub graph_store: &'static str,
    pub embedder: &'static str,
}

impl Default for ProviderDescriptors {
    fn default() -> Self {
        Self {
            vector_store: "qdrant",
            graph_store: "memgraph",
            embedder: "openai",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // serde_json objects iterate in sorted key order
    fn keys(value: &Value) -> Vec<String> {
        value
            .as_object()
            .unwrap()
            .keys()
            .cloned()
            .collect::<Vec<_>>()
    }

    #[test]
    fn test_result_envelope_shape() {
        let envelope = Envelope::result(json!({"id": "abc"}));
        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(value["success"], json!(true));
        assert_eq!(value["result"]["id"], json!("abc"));
        assert_eq!(keys(&value), vec!["result", "success"]);
    }

    #[test]
    fn test_results_envelope_shape() {
        let envelope = Envelope::results(vec![json!({"id": 1}), json!({"id": 2})]);
        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(value["success"], json!(true));
        assert_eq!(value["results"].as_array().unwrap().len(), 2);
        assert_eq!(keys(&value), vec!["results", "success"]);
    }

    #[test]
    fn test_error_envelope_shape() {
        let envelope = Envelope::failure("boom");
        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(value["success"], json!(false));
        assert_eq!(value["error"], json!("boom"));
        assert_eq!(keys(&value), vec!["error", "success"]);
        assert!(!envelope.is_success());
    }

    #[test]
    fn test_status_envelope_shape() {
        let mut status = HealthStatus::new(true);
        status.functional = true;
        status.test_result = "Search test successful: 0 results".to_string();
        let envelope = Envelope::status(status);
        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(value["success"], json!(true));
        assert_eq!(value["status"]["initialized"], json!(true));
        assert_eq!(value["status"]["functional"], json!(true));
        assert_eq!(value["status"]["config"]["vector_store"], json!("qdrant"));
        assert_eq!(value["status"]["config"]["graph_store"], json!("memgraph"));
        assert_eq!(value["status"]["config"]["embedder"], json!("openai"));
        assert_eq!(keys(&value), vec!["status", "success"]);
    }

    #[test]
    fn test_status_omits_error_when_none() {
        let envelope = Envelope::status(HealthStatus::new(false));
        let value = serde_json::to_value(&envelope).unwrap();
        assert!(value["status"].get("error").is_none());
    }

    #[test]
    fn test_status_includes_recorded_error() {
        let mut status = HealthStatus::new(false);
        status.error = Some("no API key".to_string());
        let envelope = Envelope::status(status);
        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(value["status"]["error"], json!("no API key"));
    }

    #[test]
    fn test_timestamp_is_rfc3339() {
        let status = HealthStatus::new(true);
        assert!(chrono::DateTime::parse_from_rfc3339(&status.timestamp).is_ok());
    }
}
