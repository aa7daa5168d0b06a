//! ask-engine: Headless conversation engine for the ask chat client
//!
//! This crate provides the core of ask, including:
//! - Message types and the persisted conversation encoding
//! - The conversation controller (single in-flight request)
//! - The storage port with file and in-memory adapters
//! - The HTTP client for the question-answering endpoint
//! - Configuration

pub mod client;
pub mod config;
pub mod controller;
pub mod message;
pub mod storage;

// Re-export commonly used types
pub use client::{AskClient, AskError, HttpAskClient};
pub use config::{default_data_dir, Config, ConfigError, CONFIG_FILE, DEFAULT_ENDPOINT_PATH};
pub use controller::{ChatController, InFlight};
pub use message::{Message, Role, FAILURE_MARKER};
pub use storage::{FileStore, HistoryStore, MemoryStore, StorageError};

/// Returns the engine version.
pub fn engine_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
