//! OpenAI-compatible provider implementation.
//!
//! Talks to `/chat/completions` on OpenAI or any endpoint exposing the same
//! contract. The API key travels with each request, so one client serves
//! every key the user enters.

use async_trait::async_trait;
use citeweave_core::error::ProviderError;
use citeweave_core::message::{ConversationTurn, Role, replayable};
use citeweave_core::provider::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// An OpenAI-compatible LLM provider.
pub struct OpenAiCompatProvider {
    base_url: String,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    /// Create a provider for an OpenAI-compatible endpoint.
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        }
    }

    /// Create an OpenAI provider (convenience constructor).
    pub fn openai() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }

    /// Build the message list: system instruction, replayable history, then
    /// the new user text (if any).
    fn to_api_messages(
        system_instruction: Option<&str>,
        history: &[ConversationTurn],
        user_text: &str,
    ) -> Vec<ApiMessage> {
        let mut messages = Vec::with_capacity(history.len() + 2);

        if let Some(sys) = system_instruction.filter(|s| !s.trim().is_empty()) {
            messages.push(ApiMessage {
                role: "system".into(),
                content: Some(sys.to_string()),
            });
        }

        for turn in replayable(history) {
            messages.push(ApiMessage {
                role: match turn.role {
                    Role::System => "system".into(),
                    Role::User => "user".into(),
                    Role::Assistant => "assistant".into(),
                },
                content: Some(turn.content.clone()),
            });
        }

        messages.push(ApiMessage {
            role: "user".into(),
            content: Some(user_text.to_string()),
        });

        messages
    }

    /// Send a chat completion and return the first choice's text and the
    /// responding model.
    async fn chat_completion(
        &self,
        api_key: &str,
        model: &str,
        messages: Vec<ApiMessage>,
    ) -> std::result::Result<(String, String), ProviderError> {
        let url = format!("{}/chat/completions", self.base_url);

        let body = serde_json::json!({
            "model": model,
            "messages": messages,
            "stream": false,
        });

        debug!(provider = "openai", model = %model, messages = messages_len(&body), "Sending completion request");

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                let timed_out = e.is_timeout();
                ProviderError::from_transport(e, timed_out)
            })?;

        let status = response.status().as_u16();
        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "OpenAI returned error");
            return Err(classify_error(status, model, error_body));
        }

        let api_response: ApiResponse =
            response.json().await.map_err(|e| ProviderError::ApiError {
                status_code: 200,
                message: format!("Failed to parse response: {e}"),
            })?;

        Self::first_choice_text(api_response)
    }

    fn first_choice_text(
        api_response: ApiResponse,
    ) -> std::result::Result<(String, String), ProviderError> {
        let choice = api_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::ApiError {
                status_code: 200,
                message: "No choices in response".into(),
            })?;

        Ok((
            choice.message.content.unwrap_or_default(),
            api_response.model,
        ))
    }
}

fn messages_len(body: &serde_json::Value) -> usize {
    body["messages"].as_array().map_or(0, Vec::len)
}

/// Map a non-200 status to a provider error.
fn classify_error(status: u16, model: &str, body: String) -> ProviderError {
    match status {
        401 | 403 => ProviderError::AuthenticationFailed(
            "Invalid OpenAI API key or insufficient permissions".into(),
        ),
        404 => ProviderError::ModelNotFound(model.to_string()),
        429 => ProviderError::RateLimited {
            retry_after_secs: 5,
        },
        _ => ProviderError::ApiError {
            status_code: status,
            message: extract_error_message(&body).unwrap_or(body),
        },
    }
}

/// Pull `error.message` out of an OpenAI error body.
fn extract_error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value["error"]["message"].as_str().map(String::from)
}

#[async_trait]
impl citeweave_core::Provider for OpenAiCompatProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::OpenAi
    }

    async fn generate_once(
        &self,
        request: GenerationRequest,
    ) -> std::result::Result<Generation, ProviderError> {
        let messages =
            Self::to_api_messages(request.system_instruction.as_deref(), &[], &request.prompt);
        let (text, model) = self
            .chat_completion(&request.api_key, &request.model, messages)
            .await?;

        Ok(Generation {
            text,
            grounding: None,
            model,
        })
    }

    async fn converse(
        &self,
        request: ConverseRequest,
    ) -> std::result::Result<ConverseResponse, ProviderError> {
        let messages = Self::to_api_messages(
            request.system_instruction.as_deref(),
            &request.history,
            &request.user_text,
        );
        let (text, _model) = self
            .chat_completion(&request.api_key, &request.model, messages)
            .await?;

        Ok(ConverseResponse::appended(
            request.history,
            &request.user_text,
            text,
        ))
    }

    async fn list_models(&self, api_key: &str) -> std::result::Result<Vec<String>, ProviderError> {
        let url = format!("{}/models", self.base_url);
        let response = self
            .client
            .get(&url)
            .bearer_auth(api_key)
            .send()
            .await
            .map_err(|e| {
                let timed_out = e.is_timeout();
                ProviderError::from_transport(e, timed_out)
            })?;

        let status = response.status().as_u16();
        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            return Err(classify_error(status, "", error_body));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        Ok(Self::parse_model_list(&body))
    }
}

impl OpenAiCompatProvider {
    /// Chat-capable model ids from a `/models` listing, sorted.
    fn parse_model_list(body: &serde_json::Value) -> Vec<String> {
        let mut models: Vec<String> = body["data"]
            .as_array()
            .map(|arr| {
                arr.iter()
                    .filter_map(|m| m["id"].as_str())
                    .filter(|id| id.starts_with("gpt") || id.starts_with('o'))
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();
        models.sort();
        models
    }
}

// --- OpenAI API types (internal) ---

#[derive(Debug, Serialize, Deserialize)]
struct ApiMessage {
    role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    model: String,
    choices: Vec<ApiChoice>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiMessage,
}
