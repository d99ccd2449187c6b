//! End-to-end tests for the Citeweave research pipeline.
//!
//! These exercise search → select → generate → chat against scripted
//! providers and a fixed paper index, with state persisted in a real file
//! so that each `open` behaves like a separate CLI invocation.

use std::path::Path;
use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::http::{Request, StatusCode};
use citeweave_config::AppConfig;
use citeweave_core::error::{Error, ProviderError, SearchError};
use citeweave_core::message::Role;
use citeweave_core::paper::{Paper, SearchPage};
use citeweave_core::provider::{
    ConverseRequest, ConverseResponse, Generation, GenerationRequest, Provider, ProviderKind,
};
use citeweave_core::search::{PaperSearch, SearchRequest};
use citeweave_providers::ProviderRouter;
use citeweave_research::{SectionKind, SectionStatus, SettingsUpdate, Workspace};
use citeweave_state::FileStateStore;
use http_body_util::BodyExt;
use tower::ServiceExt;

// ── Mock Provider ────────────────────────────────────────────────────────

/// A provider that records every request and answers from a script.
struct ScriptedProvider {
    kind: ProviderKind,
    generations: Mutex<Vec<GenerationRequest>>,
    conversations: Mutex<Vec<ConverseRequest>>,
    fail_auth: bool,
}

impl ScriptedProvider {
    fn new(kind: ProviderKind) -> Self {
        Self {
            kind,
            generations: Mutex::new(Vec::new()),
            conversations: Mutex::new(Vec::new()),
            fail_auth: false,
        }
    }

    fn rejecting_keys(kind: ProviderKind) -> Self {
        Self {
            fail_auth: true,
            ..Self::new(kind)
        }
    }

    fn last_generation(&self) -> Option<GenerationRequest> {
        self.generations.lock().unwrap().last().cloned()
    }

    fn conversation_calls(&self) -> usize {
        self.conversations.lock().unwrap().len()
    }

    fn last_conversation(&self) -> Option<ConverseRequest> {
        self.conversations.lock().unwrap().last().cloned()
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    async fn generate_once(&self, request: GenerationRequest) -> Result<Generation, ProviderError> {
        let model = request.model.clone();
        self.generations.lock().unwrap().push(request);
        if self.fail_auth {
            return Err(ProviderError::AuthenticationFailed("API key not valid".into()));
        }
        Ok(Generation {
            text: "Dense retrieval [1] improved open-domain QA [2].\n\nReferences\n[1] ...".into(),
            grounding: Some(serde_json::json!({
                "groundingChunks": [{"web": {"uri": "https://example.org", "title": "Example"}}]
            })),
            model,
        })
    }

    async fn converse(&self, request: ConverseRequest) -> Result<ConverseResponse, ProviderError> {
        self.conversations.lock().unwrap().push(request.clone());
        if self.fail_auth {
            return Err(ProviderError::AuthenticationFailed("API key not valid".into()));
        }
        let reply = format!("[{}] {}", self.kind.as_str(), request.user_text);
        Ok(ConverseResponse::appended(
            request.history,
            &request.user_text,
            reply,
        ))
    }

    async fn list_models(&self, _api_key: &str) -> Result<Vec<String>, ProviderError> {
        Ok(vec![format!("{}-large", self.kind.as_str())])
    }
}

// ── Mock paper index ─────────────────────────────────────────────────────

struct FixedIndex {
    corpus: Vec<Paper>,
    requests: Mutex<usize>,
}

impl FixedIndex {
    fn new(count: usize) -> Self {
        Self {
            corpus: (0..count)
                .map(|i| Paper {
                    authors: vec![format!("Researcher {i}")],
                    year: Some(2015 + (i % 10) as i32),
                    citation_count: Some((i as u64 + 1) * 7),
                    abstract_text: Some(format!("We study problem {i} in depth.")),
                    ..Paper::new(format!("s2-{i:03}"), format!("Study {i}"))
                })
                .collect(),
            requests: Mutex::new(0),
        }
    }

    fn requests(&self) -> usize {
        *self.requests.lock().unwrap()
    }
}

#[async_trait::async_trait]
impl PaperSearch for FixedIndex {
    fn name(&self) -> &str {
        "fixed"
    }

    async fn search(&self, request: SearchRequest) -> Result<SearchPage, SearchError> {
        *self.requests.lock().unwrap() += 1;
        let end = (request.offset + request.page_size).min(self.corpus.len());
        Ok(SearchPage {
            papers: self
                .corpus
                .get(request.offset..end)
                .map(<[Paper]>::to_vec)
                .unwrap_or_default(),
            total: self.corpus.len() as u64,
        })
    }
}

// ── Harness ──────────────────────────────────────────────────────────────

struct Harness {
    gemini: Arc<ScriptedProvider>,
    openai: Arc<ScriptedProvider>,
    index: Arc<FixedIndex>,
}

impl Harness {
    fn new() -> Self {
        Self::with_gemini(ScriptedProvider::new(ProviderKind::Gemini))
    }

    fn with_gemini(gemini: ScriptedProvider) -> Self {
        Self {
            gemini: Arc::new(gemini),
            openai: Arc::new(ScriptedProvider::new(ProviderKind::OpenAi)),
            index: Arc::new(FixedIndex::new(42)),
        }
    }

    /// Open a workspace on `state_file`, like one CLI invocation would.
    async fn open(&self, state_file: &Path) -> Workspace {
        let providers = ProviderRouter::new()
            .with(self.gemini.clone())
            .with(self.openai.clone());
        Workspace::open(
            &config(),
            providers,
            self.index.clone(),
            Arc::new(FileStateStore::new(state_file.to_path_buf())),
        )
        .await
        .unwrap()
    }
}

fn config() -> AppConfig {
    let mut config = AppConfig::default();
    config.providers.insert(
        "gemini".into(),
        citeweave_config::ProviderConfig {
            api_key: Some("AIzaSyE2eTestKey000".into()),
            api_url: None,
            default_model: Some("gemini-2.0-flash".into()),
        },
    );
    config
}

// ── Tests ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn search_select_generate_across_invocations() {
    let dir = tempfile::tempdir().unwrap();
    let state_file = dir.path().join("state.json");
    let harness = Harness::new();

    // Invocation 1: search.
    {
        let ws = harness.open(&state_file).await;
        let listing = ws.search("dense retrieval", 1).await.unwrap();
        assert_eq!(listing.papers.len(), 10);
        assert_eq!(listing.pages, 5);
    }

    // Invocation 2: select two papers from the page.
    {
        let ws = harness.open(&state_file).await;
        assert_eq!(ws.topic().await, "dense retrieval");
        assert_eq!(ws.select(vec!["s2-002".into(), "s2-007".into()]).await, 2);
    }

    // Invocation 3: generate from the persisted selection.
    let ws = harness.open(&state_file).await;
    let section = ws
        .generate(SectionKind::Introduction, None, None)
        .await
        .unwrap();
    assert_eq!(section.status, SectionStatus::Done);
    assert!(section.grounding.is_some());

    let request = harness.gemini.last_generation().unwrap();
    assert_eq!(request.model, "gemini-2.0-flash");
    assert!(request.prompt.contains("dense retrieval"));
    // Higher citation count ranks first: s2-007 (56) before s2-002 (21).
    let first = request.prompt.find("Study 7").unwrap();
    let second = request.prompt.find("Study 2").unwrap();
    assert!(first < second);
    assert!(!request.prompt.contains("Study 3"));

    // Only the search itself reached the index.
    assert_eq!(harness.index.requests(), 1);

    // Invocation 4: the finished section survives a restart.
    drop(ws);
    let ws = harness.open(&state_file).await;
    let sections = ws.sections().await;
    assert_eq!(sections[&SectionKind::Introduction].status, SectionStatus::Done);
    assert_eq!(sections[&SectionKind::RelatedWorks].status, SectionStatus::Idle);
}

#[tokio::test]
async fn page_fallback_when_nothing_is_selected() {
    let dir = tempfile::tempdir().unwrap();
    let harness = Harness::new();
    let ws = harness.open(&dir.path().join("state.json")).await;

    ws.search("retrieval", 2).await.unwrap();
    ws.generate(SectionKind::RelatedWorks, None, None)
        .await
        .unwrap();

    let prompt = harness.gemini.last_generation().unwrap().prompt;
    assert!(prompt.contains("Study 10"));
    assert!(prompt.contains("Study 19"));
    assert!(!prompt.contains("Study 20"));
}

#[tokio::test]
async fn select_all_pages_then_generate() {
    let dir = tempfile::tempdir().unwrap();
    let state_file = dir.path().join("state.json");
    let harness = Harness::new();

    {
        let ws = harness.open(&state_file).await;
        ws.search("retrieval", 1).await.unwrap();
        assert_eq!(ws.select_all_results(None).await.unwrap(), 42);
    }

    let ws = harness.open(&state_file).await;
    assert_eq!(ws.listing().await.selected_count, 42);
    let preview = ws.context_preview().await;
    assert!(preview.metadata.from_selection);
    assert_eq!(preview.metadata.candidates, 42);
    assert_eq!(preview.metadata.cited_ids[0], "s2-041");
}

#[tokio::test]
async fn chat_history_persists_and_is_replayed() {
    let dir = tempfile::tempdir().unwrap();
    let state_file = dir.path().join("state.json");
    let harness = Harness::new();

    {
        let ws = harness.open(&state_file).await;
        let exchange = ws.chat(ProviderKind::Gemini, "What is DPR?").await.unwrap();
        assert_eq!(exchange.reply, "[gemini] What is DPR?");
    }

    let ws = harness.open(&state_file).await;
    assert_eq!(ws.chat_history(ProviderKind::Gemini).await.len(), 2);

    ws.chat(ProviderKind::Gemini, "And ColBERT?").await.unwrap();
    let sent = harness.gemini.last_conversation().unwrap();
    assert_eq!(sent.history.len(), 2);
    assert_eq!(sent.history[0].content, "What is DPR?");

    // The other provider's transcript is independent.
    assert!(ws.chat_history(ProviderKind::OpenAi).await.is_empty());
}

#[tokio::test]
async fn chat_without_key_fails_before_any_call() {
    let dir = tempfile::tempdir().unwrap();
    let harness = Harness::new();
    let ws = harness.open(&dir.path().join("state.json")).await;

    let err = ws.chat(ProviderKind::OpenAi, "hello").await.unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
    assert_eq!(harness.openai.conversation_calls(), 0);
}

#[tokio::test]
async fn rejected_key_then_corrected_key() {
    let dir = tempfile::tempdir().unwrap();
    let harness = Harness::with_gemini(ScriptedProvider::rejecting_keys(ProviderKind::Gemini));
    let ws = harness.open(&dir.path().join("state.json")).await;

    let err = ws.chat(ProviderKind::Gemini, "hi").await.unwrap_err();
    assert!(matches!(
        err,
        Error::Provider(ProviderError::AuthenticationFailed(_))
    ));

    let history = ws.chat_history(ProviderKind::Gemini).await;
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].role, Role::User);
    assert!(history[1].is_error);

    // A new key resets the session; the failed exchange is not replayed.
    ws.update_settings(SettingsUpdate {
        api_keys: [(ProviderKind::Gemini, "AIzaSyFixedKey111".to_string())].into(),
        ..SettingsUpdate::default()
    })
    .await
    .unwrap();
    let _ = ws.chat(ProviderKind::Gemini, "hi again").await;
    let sent = harness.gemini.last_conversation().unwrap();
    assert_eq!(sent.api_key, "AIzaSyFixedKey111");
    assert!(sent.history.is_empty());
}

#[tokio::test]
async fn gateway_drives_the_same_workspace() {
    let dir = tempfile::tempdir().unwrap();
    let state_file = dir.path().join("state.json");
    let harness = Harness::new();
    let ws = Arc::new(harness.open(&state_file).await);

    let app = citeweave_gateway::build_router(ws.clone(), "http://localhost:5173");
    let req = Request::builder()
        .method("POST")
        .uri("/v1/search")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"topic":"colbert"}"#))
        .unwrap();
    let response = app.oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let listing: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(listing["topic"], "colbert");

    let app = citeweave_gateway::build_router(ws.clone(), "http://localhost:5173");
    let req = Request::builder()
        .method("POST")
        .uri("/v1/generate/introduction")
        .header("content-type", "application/json")
        .body(Body::from("{}"))
        .unwrap();
    let response = app.oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // A later CLI invocation sees what the API did.
    drop(ws);
    let ws = harness.open(&state_file).await;
    assert_eq!(ws.topic().await, "colbert");
    assert_eq!(
        ws.sections().await[&SectionKind::Introduction].status,
        SectionStatus::Done
    );
}
