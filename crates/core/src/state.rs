//! StateStore trait: scoped key-value persistence.
//!
//! The research workspace reads its state once at startup and writes the
//! affected key after every mutation. Values are JSON documents; the store
//! does not interpret them.

use async_trait::async_trait;

use crate::error::StateError;

/// Well-known keys written by the workspace.
pub mod keys {
    pub const API_KEYS: &str = "api_keys";
    pub const MODELS: &str = "models";
    pub const ACTIVE_PROVIDER: &str = "active_provider";
    pub const SEARCH_API_KEY: &str = "search_api_key";
    pub const WORD_BUDGET: &str = "word_budget";
    pub const TOPIC: &str = "topic";
    pub const SELECTED_IDS: &str = "selected_ids";
    pub const CURSOR: &str = "cursor";
    pub const PAGE_IDS: &str = "page_ids";
    pub const PAPERS: &str = "papers";
    pub const SECTIONS: &str = "sections";

    /// Chat history key for one provider.
    pub fn chat_history(provider: &str) -> String {
        format!("chat_history.{provider}")
    }
}

/// Scoped key-value storage.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// A human-readable name for this backend.
    fn name(&self) -> &str;

    /// Read a value. `Ok(None)` when the key was never written.
    async fn load(&self, key: &str) -> Result<Option<serde_json::Value>, StateError>;

    /// Write (replace) a value.
    async fn save(&self, key: &str, value: serde_json::Value) -> Result<(), StateError>;

    /// Remove a value. Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> Result<(), StateError>;
}
