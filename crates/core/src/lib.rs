//! # Citeweave Core
//!
//! Domain types, traits, and error definitions for the Citeweave research
//! assistant. This crate has **no HTTP or storage dependencies**: it defines
//! the model every other crate implements against.
//!
//! ## Design Philosophy
//!
//! Each external collaborator is a trait here:
//! - [`Provider`]: an LLM backend (one-shot generation and conversation)
//! - [`PaperSearch`]: an academic paper index
//! - [`StateStore`]: scoped key-value persistence
//!
//! Implementations live in their own crates, so the research core can be
//! tested against scripted mocks.

pub mod error;
pub mod message;
pub mod paper;
pub mod provider;
pub mod search;
pub mod state;

// Re-export key types at crate root for ergonomics
pub use error::{Error, Result};
pub use message::{ConversationTurn, Role};
pub use paper::{Paper, PaperId, SearchPage};
pub use provider::{
    ConverseRequest, ConverseResponse, Generation, GenerationRequest, Provider, ProviderKind,
    SessionConfig,
};
pub use search::{PaperSearch, SearchRequest};
pub use state::StateStore;
