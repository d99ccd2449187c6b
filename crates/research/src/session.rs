//! Provider session: per-provider conversational state.
//!
//! A session is bound to the exact `SessionConfig` it was created with. Any
//! change to the API key, model or system instruction discards it on the
//! next lookup, and a settings edit discards it immediately via `reset()`.
//! An authentication failure also discards it, so a corrected key never
//! reuses the failed session.

use citeweave_core::error::ProviderError;
use citeweave_core::message::{ConversationTurn, replayable};
use citeweave_core::provider::{ConverseRequest, Provider, ProviderKind, SessionConfig};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Identifies one incarnation of a provider session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionHandle(Uuid);

impl std::fmt::Display for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

struct ActiveSession {
    handle: SessionHandle,
    config: SessionConfig,
    history: Vec<ConversationTurn>,
}

/// Conversational state for one provider.
pub struct ProviderSession {
    provider: Arc<dyn Provider>,
    active: Option<ActiveSession>,
}

impl ProviderSession {
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        Self {
            provider,
            active: None,
        }
    }

    pub fn kind(&self) -> ProviderKind {
        self.provider.kind()
    }

    /// Return the live handle if it was created with exactly `config`,
    /// otherwise start a fresh session seeded with `prior_history`.
    ///
    /// Failed exchanges in `prior_history` are not carried into the session.
    pub fn get_or_create(
        &mut self,
        config: &SessionConfig,
        prior_history: &[ConversationTurn],
    ) -> SessionHandle {
        if let Some(active) = &self.active
            && active.config == *config
        {
            return active.handle;
        }

        let handle = SessionHandle(Uuid::new_v4());
        if self.active.is_some() {
            info!(provider = self.kind().as_str(), "Session configuration changed, starting a new session");
        } else {
            debug!(provider = self.kind().as_str(), %handle, "Starting session");
        }

        self.active = Some(ActiveSession {
            handle,
            config: config.clone(),
            history: replayable(prior_history).cloned().collect(),
        });
        handle
    }

    /// Send one user turn on `handle`.
    ///
    /// Returns the reply and the updated history. A handle that is not the
    /// live one is rejected without a remote call.
    pub async fn send_turn(
        &mut self,
        handle: SessionHandle,
        user_text: &str,
    ) -> Result<(String, Vec<ConversationTurn>), ProviderError> {
        let kind = self.kind();
        let active = match &self.active {
            Some(active) if active.handle == handle => active,
            _ => {
                return Err(ProviderError::NotConfigured(format!(
                    "{kind} session is no longer active. Send the message again to start a new one."
                )));
            }
        };

        let system_instruction = Some(active.config.system_instruction.clone())
            .filter(|s| !s.trim().is_empty());
        let request = ConverseRequest {
            api_key: active.config.api_key.clone(),
            model: active.config.model.clone(),
            system_instruction,
            history: active.history.clone(),
            user_text: user_text.to_string(),
        };

        match self.provider.converse(request).await {
            Ok(response) => {
                if let Some(active) = self.active.as_mut() {
                    active.history = response.history.clone();
                }
                Ok((response.text, response.history))
            }
            Err(e) => {
                if e.is_auth_failure() {
                    warn!(provider = kind.as_str(), "Authentication failed, discarding session");
                    self.reset();
                }
                Err(e)
            }
        }
    }

    /// Discard the session and its configuration.
    pub fn reset(&mut self) {
        if self.active.take().is_some() {
            debug!(provider = self.kind().as_str(), "Session reset");
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn active_handle(&self) -> Option<SessionHandle> {
        self.active.as_ref().map(|a| a.handle)
    }

    /// History held by the live session; empty when there is none.
    pub fn history(&self) -> &[ConversationTurn] {
        self.active
            .as_ref()
            .map(|a| a.history.as_slice())
            .unwrap_or(&[])
    }
}
