//! Conversation turn types.
//!
//! Chat history is an ordered `Vec<ConversationTurn>` per provider. Turns are
//! appended, never edited; a session reset clears the whole sequence.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The role of a turn's author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System instructions
    System,
    /// The end user
    User,
    /// The model. Gemini calls this role "model".
    #[serde(alias = "model")]
    Assistant,
}

/// A single turn in a provider conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    /// Who produced this turn
    pub role: Role,

    /// The text content
    pub content: String,

    /// Set on turns that record a failed request. Shown in the transcript,
    /// never replayed to the provider.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,

    /// When the turn was recorded
    pub timestamp: DateTime<Utc>,
}

impl ConversationTurn {
    fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            is_error: false,
            timestamp: Utc::now(),
        }
    }

    /// Create a user turn.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Create an assistant turn.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Create a system turn.
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    /// Create a visible error turn for the transcript.
    pub fn error(content: impl Into<String>) -> Self {
        Self {
            is_error: true,
            ..Self::new(Role::Assistant, content)
        }
    }
}

/// The turns of `history` that may be sent back to a provider.
///
/// A failed exchange is skipped entirely: the error turn and the user turn
/// it answers.
pub fn replayable(history: &[ConversationTurn]) -> impl Iterator<Item = &ConversationTurn> {
    history.iter().enumerate().filter_map(move |(i, turn)| {
        let answered_by_error = turn.role == Role::User
            && history.get(i + 1).is_some_and(|next| next.is_error);
        (!turn.is_error && !answered_by_error).then_some(turn)
    })
}
