//! HTTP API v1: the research workspace over REST.
//!
//! Endpoints:
//!
//! - `POST   /v1/search`             : Search one page for a topic
//! - `GET    /v1/papers`             : Displayed page with selection flags
//! - `POST   /v1/papers/{id}/toggle` : Flip selection of one paper
//! - `POST   /v1/selection/all`      : Fetch every result and select it
//! - `DELETE /v1/selection`          : Clear the selection
//! - `POST   /v1/context/preview`    : Context a generation would send
//! - `POST   /v1/generate/{section}` : Generate a section
//! - `GET    /v1/sections`           : Both section slots
//! - `GET    /v1/chat/{provider}`    : Chat transcript
//! - `POST   /v1/chat/{provider}`    : Send a chat message
//! - `DELETE /v1/chat/{provider}`    : Clear transcript and reset session
//! - `GET    /v1/settings`           : Settings with keys masked
//! - `PATCH  /v1/settings`           : Partial settings update
//! - `GET    /v1/models/{provider}`  : Models available for the stored key

use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};

use citeweave_core::error::{Error, ProviderError, SearchError, ValidationError};
use citeweave_core::message::ConversationTurn;
use citeweave_core::provider::ProviderKind;
use citeweave_research::{
    AssembledContext, ChatExchange, GeneratedSection, PaperListing, SectionKind, SettingsUpdate,
    SettingsView, Workspace,
};

pub type SharedApiState = Arc<Workspace>;

// ── Router ────────────────────────────────────────────────────────────────

/// Build the v1 API router. Nest this under "/v1" in the main router.
pub fn v1_router(state: SharedApiState) -> Router {
    Router::new()
        .route("/search", post(search_handler))
        .route("/papers", get(list_papers_handler))
        .route("/papers/{id}/toggle", post(toggle_paper_handler))
        .route("/selection/all", post(select_all_handler))
        .route("/selection", axum::routing::delete(clear_selection_handler))
        .route("/context/preview", post(context_preview_handler))
        .route("/generate/{section}", post(generate_handler))
        .route("/sections", get(list_sections_handler))
        .route(
            "/chat/{provider}",
            get(chat_history_handler)
                .post(chat_handler)
                .delete(clear_chat_handler),
        )
        .route(
            "/settings",
            get(get_settings_handler).patch(update_settings_handler),
        )
        .route("/models/{provider}", get(list_models_handler))
        .with_state(state)
}

// ── Request / Response types ──────────────────────────────────────────────

#[derive(Deserialize)]
struct SearchRequest {
    topic: String,
    /// 1-based page number (default 1)
    #[serde(default)]
    page: Option<usize>,
}

#[derive(Serialize, Deserialize)]
struct ToggleResponse {
    id: String,
    selected: bool,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct SelectAllRequest {
    /// Maximum number of papers to fetch (default from config)
    limit: Option<usize>,
}

#[derive(Serialize, Deserialize)]
struct SelectAllResponse {
    fetched: usize,
    selected_count: usize,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct GenerateRequest {
    /// Replaces the stored topic when set
    topic: Option<String>,
    /// Overrides the active provider
    provider: Option<ProviderKind>,
}

#[derive(Serialize, Deserialize)]
struct ChatHistoryResponse {
    provider: ProviderKind,
    history: Vec<ConversationTurn>,
}

#[derive(Deserialize)]
struct ChatRequest {
    message: String,
}

#[derive(Serialize, Deserialize)]
struct ModelListResponse {
    provider: ProviderKind,
    models: Vec<String>,
}

#[derive(Serialize, Deserialize)]
struct ErrorResponse {
    error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn error_response(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

/// Status code for a workspace failure.
fn status_for(err: &Error) -> StatusCode {
    match err {
        Error::Validation(ValidationError::AlreadyGenerating(_)) => StatusCode::CONFLICT,
        Error::Validation(_) => StatusCode::BAD_REQUEST,
        Error::Provider(ProviderError::AuthenticationFailed(_))
        | Error::Search(SearchError::Unauthorized) => StatusCode::UNAUTHORIZED,
        Error::Provider(ProviderError::RateLimited { .. }) | Error::Search(SearchError::RateLimited) => {
            StatusCode::TOO_MANY_REQUESTS
        }
        Error::Provider(ProviderError::NotConfigured(_) | ProviderError::ModelNotFound(_)) => {
            StatusCode::NOT_FOUND
        }
        Error::Provider(ProviderError::Timeout(_)) => StatusCode::GATEWAY_TIMEOUT,
        Error::Provider(_) | Error::Search(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn api_error(err: Error) -> ApiError {
    let status = status_for(&err);
    if status.is_server_error() {
        warn!(status = status.as_u16(), error = %err, "Request failed");
    }
    error_response(status, err.to_string())
}

fn parse_provider(raw: &str) -> Result<ProviderKind, ApiError> {
    raw.parse::<ProviderKind>()
        .map_err(|e| error_response(StatusCode::NOT_FOUND, e.to_string()))
}

// ── Papers ────────────────────────────────────────────────────────────────

async fn search_handler(
    State(state): State<SharedApiState>,
    Json(payload): Json<SearchRequest>,
) -> Result<Json<PaperListing>, ApiError> {
    let page = payload.page.unwrap_or(1);
    info!(topic = %payload.topic, page, "Search requested");
    state
        .search(&payload.topic, page)
        .await
        .map(Json)
        .map_err(api_error)
}

async fn list_papers_handler(State(state): State<SharedApiState>) -> Json<PaperListing> {
    Json(state.listing().await)
}

async fn toggle_paper_handler(
    State(state): State<SharedApiState>,
    Path(id): Path<String>,
) -> Json<ToggleResponse> {
    let selected = state.toggle(&id).await;
    Json(ToggleResponse { id, selected })
}

async fn select_all_handler(
    State(state): State<SharedApiState>,
    payload: Option<Json<SelectAllRequest>>,
) -> Result<Json<SelectAllResponse>, ApiError> {
    let request = payload.map(|Json(r)| r).unwrap_or_default();
    let fetched = state
        .select_all_results(request.limit)
        .await
        .map_err(api_error)?;
    let selected_count = state.listing().await.selected_count;
    Ok(Json(SelectAllResponse {
        fetched,
        selected_count,
    }))
}

async fn clear_selection_handler(State(state): State<SharedApiState>) -> StatusCode {
    state.deselect_all().await;
    StatusCode::NO_CONTENT
}

async fn context_preview_handler(State(state): State<SharedApiState>) -> Json<AssembledContext> {
    Json(state.context_preview().await)
}

// ── Sections ──────────────────────────────────────────────────────────────

async fn generate_handler(
    State(state): State<SharedApiState>,
    Path(section): Path<String>,
    payload: Option<Json<GenerateRequest>>,
) -> Result<Json<GeneratedSection>, ApiError> {
    let section: SectionKind = section
        .parse()
        .map_err(|e: String| error_response(StatusCode::NOT_FOUND, e))?;
    let request = payload.map(|Json(r)| r).unwrap_or_default();

    state
        .generate(section, request.topic.as_deref(), request.provider)
        .await
        .map(Json)
        .map_err(api_error)
}

async fn list_sections_handler(
    State(state): State<SharedApiState>,
) -> Json<BTreeMap<SectionKind, GeneratedSection>> {
    Json(state.sections().await)
}

// ── Chat ──────────────────────────────────────────────────────────────────

async fn chat_history_handler(
    State(state): State<SharedApiState>,
    Path(provider): Path<String>,
) -> Result<Json<ChatHistoryResponse>, ApiError> {
    let provider = parse_provider(&provider)?;
    Ok(Json(ChatHistoryResponse {
        provider,
        history: state.chat_history(provider).await,
    }))
}

async fn chat_handler(
    State(state): State<SharedApiState>,
    Path(provider): Path<String>,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<ChatExchange>, ApiError> {
    let provider = parse_provider(&provider)?;
    state
        .chat(provider, &payload.message)
        .await
        .map(Json)
        .map_err(api_error)
}

async fn clear_chat_handler(
    State(state): State<SharedApiState>,
    Path(provider): Path<String>,
) -> Result<StatusCode, ApiError> {
    let provider = parse_provider(&provider)?;
    state.clear_chat(provider).await;
    Ok(StatusCode::NO_CONTENT)
}

// ── Settings ──────────────────────────────────────────────────────────────

async fn get_settings_handler(State(state): State<SharedApiState>) -> Json<SettingsView> {
    Json(state.settings().await)
}

async fn update_settings_handler(
    State(state): State<SharedApiState>,
    Json(update): Json<SettingsUpdate>,
) -> Result<Json<SettingsView>, ApiError> {
    state.update_settings(update).await.map(Json).map_err(api_error)
}

async fn list_models_handler(
    State(state): State<SharedApiState>,
    Path(provider): Path<String>,
) -> Result<Json<ModelListResponse>, ApiError> {
    let provider = parse_provider(&provider)?;
    let models = state.list_models(provider).await.map_err(api_error)?;
    Ok(Json(ModelListResponse { provider, models }))
}

// ── Tests ─────────────────────────────────────────────────────────────────
