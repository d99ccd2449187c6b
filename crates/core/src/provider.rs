//! Provider trait: the abstraction over LLM backends.
//!
//! A Provider offers two calls: a one-shot generation used for prose
//! sections, and a conversational turn used by the chat panel. Credentials
//! and model are passed per request because both can change while the
//! process runs.
//!
//! Implementations: Google Gemini, OpenAI chat completions.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::message::ConversationTurn;

/// The LLM providers Citeweave can talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Gemini,
    OpenAi,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 2] = [ProviderKind::Gemini, ProviderKind::OpenAi];

    /// Stable identifier used in config files, URLs and state keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gemini => "gemini",
            Self::OpenAi => "openai",
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Gemini => write!(f, "Gemini"),
            Self::OpenAi => write!(f, "OpenAI"),
        }
    }
}

impl std::str::FromStr for ProviderKind {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gemini" | "google" => Ok(Self::Gemini),
            "openai" => Ok(Self::OpenAi),
            other => Err(ProviderError::NotConfigured(format!(
                "Unknown provider '{other}'. Use 'gemini' or 'openai'."
            ))),
        }
    }
}

/// The configuration a conversational session is bound to.
///
/// Two configs are interchangeable only when every field matches.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub api_key: String,
    pub model: String,
    pub system_instruction: String,
}

impl std::fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionConfig")
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .field("system_instruction", &self.system_instruction)
            .finish()
    }
}

/// A one-shot, non-conversational generation request.
#[derive(Clone)]
pub struct GenerationRequest {
    pub api_key: String,
    pub model: String,
    pub prompt: String,
    pub system_instruction: Option<String>,
}

impl std::fmt::Debug for GenerationRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationRequest")
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .field("prompt_len", &self.prompt.len())
            .field("system_instruction", &self.system_instruction)
            .finish()
    }
}

/// The result of a one-shot generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Generation {
    /// The generated text
    pub text: String,

    /// Citation/source annotations, when the provider attaches them
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grounding: Option<serde_json::Value>,

    /// Which model actually responded (may differ from requested)
    pub model: String,
}

/// One conversational turn: prior history plus the new user text.
#[derive(Clone)]
pub struct ConverseRequest {
    pub api_key: String,
    pub model: String,
    pub system_instruction: Option<String>,
    pub history: Vec<ConversationTurn>,
    pub user_text: String,
}

impl std::fmt::Debug for ConverseRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConverseRequest")
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .field("history_len", &self.history.len())
            .finish()
    }
}

/// The reply to a conversational turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConverseResponse {
    /// The assistant's reply
    pub text: String,

    /// Prior history with the user turn and the reply appended
    pub history: Vec<ConversationTurn>,
}

impl ConverseResponse {
    /// Build a response by appending the user turn and the reply to `history`.
    pub fn appended(mut history: Vec<ConversationTurn>, user_text: &str, reply: String) -> Self {
        history.push(ConversationTurn::user(user_text));
        history.push(ConversationTurn::assistant(reply.clone()));
        Self {
            text: reply,
            history,
        }
    }
}

/// The core Provider trait.
///
/// Every LLM backend implements this trait. The research core calls
/// `generate_once()` or `converse()` without knowing which backend is in use.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Which provider this is.
    fn kind(&self) -> ProviderKind;

    /// A human-readable name for this provider.
    fn name(&self) -> &str {
        self.kind().as_str()
    }

    /// Generate text for a single prompt, without conversation state.
    async fn generate_once(
        &self,
        request: GenerationRequest,
    ) -> std::result::Result<Generation, ProviderError>;

    /// Continue a conversation with one user turn.
    async fn converse(
        &self,
        request: ConverseRequest,
    ) -> std::result::Result<ConverseResponse, ProviderError>;

    /// List models available to this key.
    async fn list_models(&self, _api_key: &str) -> std::result::Result<Vec<String>, ProviderError> {
        Ok(Vec::new())
    }
}
