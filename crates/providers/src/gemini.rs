//! Google Gemini native provider implementation.
//!
//! Uses the Generative Language API (`v1beta`) directly.
//!
//! Features:
//! - `x-goog-api-key` header authentication
//! - `systemInstruction` as a top-level field
//! - `user` / `model` roles for conversation history
//! - Google Search grounding on one-shot generation, surfaced as
//!   `groundingMetadata`

use async_trait::async_trait;
use citeweave_core::error::ProviderError;
use citeweave_core::message::{ConversationTurn, Role, replayable};
use citeweave_core::provider::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Gemini Generative Language API provider.
pub struct GeminiProvider {
    base_url: String,
    client: reqwest::Client,
    /// Attach the Google Search tool to one-shot generations.
    search_grounding: bool,
}

impl GeminiProvider {
    /// Create a new Gemini provider.
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(180))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            base_url: DEFAULT_BASE_URL.into(),
            client,
            search_grounding: true,
        }
    }

    /// Create with a custom base URL (e.g., for testing or proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Enable or disable Google Search grounding for one-shot generation.
    pub fn with_search_grounding(mut self, enabled: bool) -> Self {
        self.search_grounding = enabled;
        self
    }

    /// Accept both `gemini-2.0-flash` and `models/gemini-2.0-flash`.
    fn model_path(model: &str) -> &str {
        model.strip_prefix("models/").unwrap_or(model)
    }

    /// Convert history plus the new user text to Gemini `contents`.
    ///
    /// System turns are folded into the system instruction by the caller;
    /// they are skipped here.
    fn to_api_contents(history: &[ConversationTurn], user_text: &str) -> Vec<GeminiContent> {
        let mut contents: Vec<GeminiContent> = replayable(history)
            .filter_map(|turn| {
                let role = match turn.role {
                    Role::User => "user",
                    Role::Assistant => "model",
                    Role::System => return None,
                };
                Some(GeminiContent {
                    role: Some(role.into()),
                    parts: vec![GeminiPart {
                        text: Some(turn.content.clone()),
                    }],
                })
            })
            .collect();

        contents.push(GeminiContent {
            role: Some("user".into()),
            parts: vec![GeminiPart {
                text: Some(user_text.to_string()),
            }],
        });

        contents
    }

    /// Combine the configured instruction with any system turns in history.
    fn system_text(system_instruction: Option<&str>, history: &[ConversationTurn]) -> Option<String> {
        let parts: Vec<&str> = system_instruction
            .into_iter()
            .chain(
                replayable(history)
                    .filter(|t| t.role == Role::System)
                    .map(|t| t.content.as_str()),
            )
            .filter(|s| !s.trim().is_empty())
            .collect();

        if parts.is_empty() {
            None
        } else {
            Some(parts.join("\n\n"))
        }
    }

    fn build_body(
        contents: Vec<GeminiContent>,
        system: Option<String>,
        grounding: bool,
    ) -> serde_json::Value {
        let mut body = serde_json::json!({ "contents": contents });

        if let Some(sys) = system {
            body["systemInstruction"] = serde_json::json!({ "parts": [{ "text": sys }] });
        }

        if grounding {
            body["tools"] = serde_json::json!([{ "google_search": {} }]);
        }

        body
    }

    async fn generate_content(
        &self,
        api_key: &str,
        model: &str,
        body: serde_json::Value,
    ) -> std::result::Result<GeminiResponse, ProviderError> {
        let model = Self::model_path(model);
        let url = format!("{}/v1beta/models/{}:generateContent", self.base_url, model);

        debug!(provider = "gemini", model = %model, "Sending generateContent request");

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
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
            warn!(status, body = %error_body, "Gemini API error");
            return Err(classify_error(status, model, &error_body));
        }

        response.json().await.map_err(|e| ProviderError::ApiError {
            status_code: 200,
            message: format!("Failed to parse Gemini response: {e}"),
        })
    }

    /// Extract the first candidate's text and grounding metadata.
    fn response_to_generation(
        resp: GeminiResponse,
        requested_model: &str,
    ) -> std::result::Result<Generation, ProviderError> {
        let model = resp
            .model_version
            .unwrap_or_else(|| Self::model_path(requested_model).to_string());

        let Some(candidate) = resp.candidates.into_iter().next() else {
            let reason = resp
                .prompt_feedback
                .and_then(|f| f.block_reason)
                .unwrap_or_else(|| "no candidates returned".into());
            return Err(ProviderError::ApiError {
                status_code: 200,
                message: format!("Gemini returned no content: {reason}"),
            });
        };

        let text = candidate
            .content
            .map(|c| {
                c.parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if text.is_empty() {
            let reason = candidate.finish_reason.unwrap_or_else(|| "UNKNOWN".into());
            return Err(ProviderError::ApiError {
                status_code: 200,
                message: format!("Gemini returned an empty response (finish reason: {reason})"),
            });
        }

        Ok(Generation {
            text,
            grounding: candidate.grounding_metadata,
            model,
        })
    }
}

impl Default for GeminiProvider {
    fn default() -> Self {
        Self::new()
    }
}

/// Map a non-200 status to a provider error.
///
/// Gemini reports a bad key as `400 INVALID_ARGUMENT` with reason
/// `API_KEY_INVALID`, so the body is inspected as well as the status.
fn classify_error(status: u16, model: &str, body: &str) -> ProviderError {
    let parsed: Option<GeminiErrorEnvelope> = serde_json::from_str(body).ok();
    let message = parsed
        .as_ref()
        .map(|e| e.error.message.clone())
        .unwrap_or_else(|| body.to_string());
    let key_invalid = body.contains("API_KEY_INVALID");

    match status {
        401 | 403 => ProviderError::AuthenticationFailed(message),
        400 if key_invalid => ProviderError::AuthenticationFailed(message),
        404 => ProviderError::ModelNotFound(model.to_string()),
        429 => ProviderError::RateLimited {
            retry_after_secs: 5,
        },
        _ => ProviderError::ApiError {
            status_code: status,
            message,
        },
    }
}

#[async_trait]
impl citeweave_core::Provider for GeminiProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Gemini
    }

    async fn generate_once(
        &self,
        request: GenerationRequest,
    ) -> std::result::Result<Generation, ProviderError> {
        let contents = Self::to_api_contents(&[], &request.prompt);
        let system = Self::system_text(request.system_instruction.as_deref(), &[]);
        let body = Self::build_body(contents, system, self.search_grounding);

        let resp = self
            .generate_content(&request.api_key, &request.model, body)
            .await?;
        Self::response_to_generation(resp, &request.model)
    }

    async fn converse(
        &self,
        request: ConverseRequest,
    ) -> std::result::Result<ConverseResponse, ProviderError> {
        let contents = Self::to_api_contents(&request.history, &request.user_text);
        let system = Self::system_text(request.system_instruction.as_deref(), &request.history);
        let body = Self::build_body(contents, system, false);

        let resp = self
            .generate_content(&request.api_key, &request.model, body)
            .await?;
        let generation = Self::response_to_generation(resp, &request.model)?;

        Ok(ConverseResponse::appended(
            request.history,
            &request.user_text,
            generation.text,
        ))
    }

    async fn list_models(&self, api_key: &str) -> std::result::Result<Vec<String>, ProviderError> {
        let url = format!("{}/v1beta/models", self.base_url);
        let response = self
            .client
            .get(&url)
            .header("x-goog-api-key", api_key)
            .query(&[("pageSize", "200")])
            .send()
            .await
            .map_err(|e| {
                let timed_out = e.is_timeout();
                ProviderError::from_transport(e, timed_out)
            })?;

        let status = response.status().as_u16();
        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            return Err(classify_error(status, "", &error_body));
        }

        let listing: GeminiModelList = response
            .json()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        Ok(Self::generation_models(listing))
    }
}

impl GeminiProvider {
    /// Model ids that support `generateContent`, without the `models/` prefix.
    fn generation_models(listing: GeminiModelList) -> Vec<String> {
        let mut models: Vec<String> = listing
            .models
            .into_iter()
            .filter(|m| {
                m.supported_generation_methods
                    .iter()
                    .any(|method| method == "generateContent")
            })
            .map(|m| Self::model_path(&m.name).to_string())
            .collect();
        models.sort();
        models
    }
}

// --- Gemini API types ---

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
    #[serde(default)]
    model_version: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiContent>,
    #[serde(default)]
    finish_reason: Option<String>,
    #[serde(default)]
    grounding_metadata: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorEnvelope {
    error: GeminiErrorBody,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorBody {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct GeminiModelList {
    #[serde(default)]
    models: Vec<GeminiModel>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiModel {
    name: String,
    #[serde(default)]
    supported_generation_methods: Vec<String>,
}
