//! Error types for the Citeweave domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error enum.

use thiserror::Error;

use crate::provider::ProviderKind;

/// The top-level error type for all Citeweave operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Provider errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Paper search errors ---
    #[error("Search error: {0}")]
    Search(#[from] SearchError),

    // --- Persistence errors ---
    #[error("State error: {0}")]
    State(#[from] StateError),

    // --- User input validation ---
    #[error("{0}")]
    Validation(#[from] ValidationError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

impl ProviderError {
    /// Whether this failure means the credentials were rejected.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Self::AuthenticationFailed(_))
    }

    /// Map a transport error, keeping timeouts distinct from other failures.
    pub fn from_transport(err: impl std::fmt::Display, timed_out: bool) -> Self {
        if timed_out {
            Self::Timeout(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum SearchError {
    #[error("Paper search failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Paper search rate limited, retry later")]
    RateLimited,

    #[error("Paper search rejected the API key")]
    Unauthorized,

    #[error("Unexpected search response: {0}")]
    InvalidResponse(String),

    #[error("Network error: {0}")]
    Network(String),
}

#[derive(Debug, Error)]
pub enum StateError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Corrupted state entry '{key}': {reason}")]
    Corrupted { key: String, reason: String },
}

/// User-facing precondition failures. Raised before any remote call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please enter a research topic.")]
    MissingTopic,

    #[error("No papers available for context. Search for papers or select some first.")]
    NoContext,

    #[error("API key for {0} is not set.")]
    MissingApiKey(ProviderKind),

    #[error("No model selected for {0}.")]
    MissingModel(ProviderKind),

    #[error("Generation already in progress for {0}.")]
    AlreadyGenerating(String),

    #[error("Message must not be empty.")]
    EmptyMessage,

    #[error("Word budget must be greater than zero.")]
    InvalidWordBudget,
}
