//! Error types for membridge

use thiserror::Error;

/// Top-level error type for bridge operations.
///
/// Downstream client failures never surface here: the bridge converts them
/// into failure envelopes at its boundary. The only errors a caller sees
/// are the explicit not-initialized precondition and configuration
/// construction failures.
#[derive(Error, Debug)]
pub enum BridgeError {
    /// A data operation was called before the memory client was constructed
    #[error("memory client not initialized")]
    NotInitialized,

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias for bridge operations
pub type Result<T> = std::result::Result<T, BridgeError>;
