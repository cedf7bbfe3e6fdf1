use clap::{Parser, Subcommand};
use serde_json::{Map, Value};

use membridge::bridge::Bridge;
use membridge::client::ChatMessage;
use membridge::envelope::Envelope;

use crate::error::CliResult;

#[derive(Subcommand)]
pub enum Command {
    #[clap(about = "Store a message as a memory for a user")]
    Add(AddArgs),

    #[clap(about = "Search a user's memories")]
    Search(SearchArgs),

    #[clap(name = "get_all", about = "List all memories for a user")]
    GetAll(GetAllArgs),

    #[clap(about = "Update an existing memory")]
    Update(UpdateArgs),

    #[clap(about = "Delete a memory")]
    Delete(DeleteArgs),

    #[clap(about = "Report bridge health")]
    Health,
}

#[derive(Parser)]
pub struct AddArgs {
    #[clap(help = "User the memory belongs to")]
    pub user_id: String,

    #[clap(help = "Message text to store")]
    pub message: String,

    #[clap(help = "Additional metadata as a JSON object")]
    pub metadata: Option<String>,
}

#[derive(Parser)]
pub struct SearchArgs {
    #[clap(help = "User whose memories to search")]
    pub user_id: String,

    #[clap(help = "Search query text")]
    pub query: String,

    #[clap(default_value = "10", help = "Maximum number of results")]
    pub limit: usize,
}

#[derive(Parser)]
pub struct GetAllArgs {
    #[clap(help = "User whose memories to list")]
    pub user_id: String,
}

#[derive(Parser)]
pub struct UpdateArgs {
    #[clap(help = "Memory ID to update")]
    pub memory_id: String,

    #[clap(help = "Fields to merge into the record, as JSON")]
    pub data: String,
}

#[derive(Parser)]
pub struct DeleteArgs {
    #[clap(help = "Memory ID to delete")]
    pub memory_id: String,
}

impl Command {
    pub async fn execute(&self, bridge: &Bridge) -> CliResult<Envelope> {
        match self {
            Command::Add(args) => args.execute(bridge).await,
            Command::Search(args) => args.execute(bridge).await,
            Command::GetAll(args) => args.execute(bridge).await,
            Command::Update(args) => args.execute(bridge).await,
            Command::Delete(args) => args.execute(bridge).await,
            Command::Health => Ok(bridge.health_check().await),
        }
    }
}

impl AddArgs {
    async fn execute(&self, bridge: &Bridge) -> CliResult<Envelope> {
        let metadata = match &self.metadata {
            Some(raw) => Some(
                serde_json::from_str::<Map<String, Value>>(raw)
                    .map_err(|e| format!("Invalid metadata JSON: {e}"))?,
            ),
            None => None,
        };

        let messages = [ChatMessage::user(&self.message)];
        Ok(bridge.add_memory(&messages, &self.user_id, metadata).await?)
    }
}

impl SearchArgs {
    async fn execute(&self, bridge: &Bridge) -> CliResult<Envelope> {
        Ok(bridge
            .search_memory(&self.query, &self.user_id, self.limit)
            .await?)
    }
}

impl GetAllArgs {
    async fn execute(&self, bridge: &Bridge) -> CliResult<Envelope> {
        Ok(bridge.get_all_memories(&self.user_id).await?)
    }
}

impl UpdateArgs {
    async fn execute(&self, bridge: &Bridge) -> CliResult<Envelope> {
        let data: Value = serde_json::from_str(&self.data)
            .map_err(|e| format!("Invalid data JSON: {e}"))?;
        Ok(bridge.update_memory(&self.memory_id, &data).await?)
    }
}

impl DeleteArgs {
    async fn execute(&self, bridge: &Bridge) -> CliResult<Envelope> {
        Ok(bridge.delete_memory(&self.memory_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use membridge::config::Config;
    use membridge::testing::MockMemoryStore;
    use serde_json::json;

    #[derive(Parser)]
    struct TestCli {
        #[clap(subcommand)]
        command: Command,
    }

    fn test_config() -> Config {
        Config::from_lookup(|name| match name {
            "OPENAI_API_KEY" => Some("sk-test".to_string()),
            _ => None,
        })
        .unwrap()
    }

    fn ready_bridge() -> Bridge {
        Bridge::with_client(test_config(), Box::new(MockMemoryStore::new()))
    }

    #[test]
    fn test_search_default_limit() {
        let cli = TestCli::parse_from(["membridge", "search", "user1", "hello"]);
        match cli.command {
            Command::Search(args) => {
                assert_eq!(args.user_id, "user1");
                assert_eq!(args.query, "hello");
                assert_eq!(args.limit, 10);
            }
            _ => panic!("expected search command"),
        }
    }

    #[test]
    fn test_search_explicit_limit() {
        let cli = TestCli::parse_from(["membridge", "search", "user1", "hello", "5"]);
        match cli.command {
            Command::Search(args) => assert_eq!(args.limit, 5),
            _ => panic!("expected search command"),
        }
    }

    #[test]
    fn test_get_all_command_name_uses_underscore() {
        let cli = TestCli::parse_from(["membridge", "get_all", "user1"]);
        assert!(matches!(cli.command, Command::GetAll(_)));
    }

    #[test]
    fn test_missing_required_args_fail_parsing() {
        assert!(TestCli::try_parse_from(["membridge", "add", "user1"]).is_err());
        assert!(TestCli::try_parse_from(["membridge", "search", "user1"]).is_err());
        assert!(TestCli::try_parse_from(["membridge", "update", "id"]).is_err());
        assert!(TestCli::try_parse_from(["membridge", "get_all"]).is_err());
        assert!(TestCli::try_parse_from(["membridge", "delete"]).is_err());
    }

    #[test]
    fn test_unknown_command_fails_parsing() {
        assert!(TestCli::try_parse_from(["membridge", "purge"]).is_err());
    }

    #[tokio::test]
    async fn test_add_rejects_malformed_metadata() {
        let cli = TestCli::parse_from(["membridge", "add", "user1", "hi", "{not json"]);
        let result = cli.command.execute(&ready_bridge()).await;
        let err = result.unwrap_err();
        assert!(err.to_string().contains("Invalid metadata JSON"));
    }

    #[tokio::test]
    async fn test_update_rejects_malformed_data() {
        let cli = TestCli::parse_from(["membridge", "update", "id-1", "{broken"]);
        let result = cli.command.execute(&ready_bridge()).await;
        let err = result.unwrap_err();
        assert!(err.to_string().contains("Invalid data JSON"));
    }

    #[tokio::test]
    async fn test_update_non_object_data_is_operation_failure() {
        // Well-formed JSON that is not an object parses at the dispatcher
        // and fails downstream as an operation-level error envelope
        let cli = TestCli::parse_from(["membridge", "update", "id-1", "42"]);
        let envelope = cli.command.execute(&ready_bridge()).await.unwrap();
        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(value["success"], json!(false));
    }

    #[tokio::test]
    async fn test_health_executes_without_initialization() {
        let cli = TestCli::parse_from(["membridge", "health"]);
        let bridge = Bridge::new(test_config());
        let envelope = cli.command.execute(&bridge).await.unwrap();
        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(value["success"], json!(true));
        assert_eq!(value["status"]["initialized"], json!(false));
    }

    #[tokio::test]
    async fn test_data_command_on_uninitialized_bridge_errors() {
        let cli = TestCli::parse_from(["membridge", "search", "user1", "hello"]);
        let bridge = Bridge::new(test_config());
        let result = cli.command.execute(&bridge).await;
        let err = result.unwrap_err();
        assert!(err.to_string().contains("not initialized"));
    }

    #[tokio::test]
    async fn test_add_wraps_message_as_user_entry() {
        let store = MockMemoryStore::new();
        let bridge = Bridge::with_client(test_config(), Box::new(store));
        let cli = TestCli::parse_from(["membridge", "add", "user1", "hi", r#"{"tag":"x"}"#]);
        let envelope = cli.command.execute(&bridge).await.unwrap();
        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(value["success"], json!(true));
        assert_eq!(value["result"]["results"][0]["memory"], json!("hi"));
    }
}
