//! Membridge - Bridge library for a self-hosted semantic memory stack
//!
//! This crate mediates between a command-line frontend and the external
//! services that actually store memories: a Qdrant vector store and an
//! OpenAI-compatible embeddings endpoint. It owns configuration, the
//! client lifecycle, and the uniform result envelope every operation
//! returns.

pub mod bridge;
pub mod client;
pub mod config;
pub mod envelope;
pub mod error;
pub mod testing;

pub use error::BridgeError;
