//! Research workspace: the single owner of mutable research state.
//!
//! Holds the paper store, the section slots, the chat transcripts, the user
//! settings and one `ProviderSession` per provider. Every mutation is
//! written through to the `StateStore` under its key, and everything is read
//! back once in `open`.
//!
//! Locking: the state lock is never held across a network call. Chat turns
//! hold their provider's session mutex for the whole turn, so turns on one
//! provider are strictly ordered.

use citeweave_config::AppConfig;
use citeweave_core::error::{Error, ProviderError, Result, ValidationError};
use citeweave_core::message::ConversationTurn;
use citeweave_core::paper::{Paper, PaperId};
use citeweave_core::provider::{Provider, ProviderKind, SessionConfig};
use citeweave_core::search::{PaperSearch, SearchRequest};
use citeweave_core::state::{StateStore, keys};
use citeweave_providers::ProviderRouter;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::context::{AssembledContext, ContextAssembler};
use crate::orchestrator::{
    GeneratedSection, GenerationInput, GenerationOrchestrator, ProviderTarget, SectionKind,
};
use crate::session::ProviderSession;
use crate::settings::{Settings, SettingsUpdate, SettingsView};
use crate::store::{PageCursor, PaperStore};

/// A paper on the displayed page.
#[derive(Debug, Clone, Serialize)]
pub struct ListedPaper {
    #[serde(flatten)]
    pub paper: Paper,
    pub selected: bool,
}

/// The displayed page with selection flags.
#[derive(Debug, Clone, Serialize)]
pub struct PaperListing {
    pub topic: String,
    pub papers: Vec<ListedPaper>,
    pub cursor: PageCursor,
    pub page: usize,
    pub pages: usize,
    pub selected_count: usize,
}

/// A completed chat turn.
#[derive(Debug, Clone, Serialize)]
pub struct ChatExchange {
    pub reply: String,
    pub history: Vec<ConversationTurn>,
}

struct WorkspaceState {
    papers: PaperStore,
    sections: BTreeMap<SectionKind, GeneratedSection>,
    settings: Settings,
    topic: String,
    chats: HashMap<ProviderKind, Vec<ConversationTurn>>,
}

impl WorkspaceState {
    fn listing(&self) -> PaperListing {
        let cursor = self.papers.cursor();
        PaperListing {
            topic: self.topic.clone(),
            papers: self
                .papers
                .current_page()
                .into_iter()
                .map(|p| ListedPaper {
                    selected: self.papers.is_selected(&p.id),
                    paper: p.clone(),
                })
                .collect(),
            cursor,
            page: cursor.page_number(),
            pages: cursor.page_count(),
            selected_count: self.papers.selection().len(),
        }
    }

    fn cached_papers(&self) -> Vec<&Paper> {
        let mut papers: Vec<&Paper> = self.papers.cache().values().collect();
        papers.sort_by(|a, b| a.id.cmp(&b.id));
        papers
    }
}

pub struct Workspace {
    state: RwLock<WorkspaceState>,
    sessions: HashMap<ProviderKind, Mutex<ProviderSession>>,
    providers: ProviderRouter,
    search: Arc<dyn PaperSearch>,
    store: Arc<dyn StateStore>,
    page_size: usize,
    select_all_limit: usize,
    chat_system_instruction: String,
}

impl Workspace {
    /// Build the workspace and restore persisted state.
    ///
    /// Persisted settings override config values. Unreadable entries are
    /// logged and skipped.
    pub async fn open(
        config: &AppConfig,
        providers: ProviderRouter,
        search: Arc<dyn PaperSearch>,
        store: Arc<dyn StateStore>,
    ) -> Result<Self> {
        let sessions = providers
            .list()
            .into_iter()
            .filter_map(|kind| providers.get(kind).map(|p| (kind, Mutex::new(ProviderSession::new(p)))))
            .collect();

        let state = Self::restore(config, store.as_ref()).await;
        info!(
            store = store.name(),
            search = search.name(),
            papers = state.papers.cache().len(),
            selected = state.papers.selection().len(),
            "Workspace opened"
        );

        Ok(Self {
            state: RwLock::new(state),
            sessions,
            providers,
            search,
            store,
            page_size: config.page_size,
            select_all_limit: config.select_all_limit,
            chat_system_instruction: config.chat_system_instruction.clone(),
        })
    }

    async fn restore(config: &AppConfig, store: &dyn StateStore) -> WorkspaceState {
        let mut settings = Settings::from_config(config);
        // Once persisted, settings replace config values so cleared entries stay cleared.
        if let Some(api_keys) = load::<HashMap<ProviderKind, String>>(store, keys::API_KEYS).await {
            settings.api_keys = api_keys;
        }
        if let Some(models) = load::<HashMap<ProviderKind, String>>(store, keys::MODELS).await {
            settings.models = models;
        }
        if let Some(kind) = load(store, keys::ACTIVE_PROVIDER).await {
            settings.active_provider = kind;
        }
        if let Some(key) = load::<Option<String>>(store, keys::SEARCH_API_KEY).await {
            settings.search_api_key = key;
        }
        if let Some(budget) = load::<usize>(store, keys::WORD_BUDGET).await.filter(|b| *b > 0) {
            settings.word_budget = budget;
        }

        let mut papers = PaperStore::new();
        if let Some(cached) = load::<Vec<Paper>>(store, keys::PAPERS).await {
            papers.record_fetch(cached);
        }
        papers.restore(
            load(store, keys::PAGE_IDS).await.unwrap_or_default(),
            load(store, keys::CURSOR).await.unwrap_or_default(),
            load(store, keys::SELECTED_IDS).await.unwrap_or_default(),
        );

        let mut sections: BTreeMap<SectionKind, GeneratedSection> =
            load(store, keys::SECTIONS).await.unwrap_or_default();
        for slot in sections.values_mut() {
            if slot.is_generating() {
                slot.fail("Generation was interrupted.");
            }
        }

        let mut chats = HashMap::new();
        for kind in ProviderKind::ALL {
            if let Some(history) = load(store, &keys::chat_history(kind.as_str())).await {
                chats.insert(kind, history);
            }
        }

        WorkspaceState {
            papers,
            sections,
            settings,
            topic: load(store, keys::TOPIC).await.unwrap_or_default(),
            chats,
        }
    }

    /// Write one key. Persistence failures are logged, never surfaced.
    async fn persist<T: Serialize + ?Sized>(&self, key: &str, value: &T) {
        let value = match serde_json::to_value(value) {
            Ok(v) => v,
            Err(e) => {
                warn!(key, error = %e, "Failed to serialize workspace state");
                return;
            }
        };
        if let Err(e) = self.store.save(key, value).await {
            warn!(key, error = %e, "Failed to persist workspace state");
        }
    }

    async fn persist_settings(&self, settings: &Settings) {
        self.persist(keys::API_KEYS, &settings.api_keys).await;
        self.persist(keys::MODELS, &settings.models).await;
        self.persist(keys::ACTIVE_PROVIDER, &settings.active_provider).await;
        self.persist(keys::SEARCH_API_KEY, &settings.search_api_key).await;
        self.persist(keys::WORD_BUDGET, &settings.word_budget).await;
    }

    fn provider(&self, kind: ProviderKind) -> Result<Arc<dyn Provider>> {
        self.providers.get(kind).ok_or_else(|| {
            ProviderError::NotConfigured(format!("{kind} is not available in this build.")).into()
        })
    }

    /// Providers that can be used.
    pub fn providers(&self) -> Vec<ProviderKind> {
        self.providers.list()
    }

    // --- Settings ---

    pub async fn settings(&self) -> SettingsView {
        self.state.read().await.settings.view()
    }

    /// The provider used when a request does not name one.
    pub async fn active_provider(&self) -> ProviderKind {
        self.state.read().await.settings.active_provider
    }

    /// Apply a settings change. Providers whose key or model changed have
    /// their session reset.
    pub async fn update_settings(&self, update: SettingsUpdate) -> Result<SettingsView> {
        let (changed, view) = {
            let mut state = self.state.write().await;
            let changed = state.settings.apply(&update)?;
            self.persist_settings(&state.settings).await;
            (changed, state.settings.view())
        };

        for kind in changed {
            if let Some(session) = self.sessions.get(&kind) {
                session.lock().await.reset();
                info!(provider = kind.as_str(), "Credentials changed, session reset");
            }
        }

        Ok(view)
    }

    // --- Papers ---

    pub async fn topic(&self) -> String {
        self.state.read().await.topic.clone()
    }

    /// Search one page (1-based) and make it the displayed page.
    pub async fn search(&self, topic: &str, page: usize) -> Result<PaperListing> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(ValidationError::MissingTopic.into());
        }

        let offset = (page.max(1) - 1) * self.page_size;
        let api_key = self.state.read().await.settings.search_api_key.clone();

        let result = self
            .search
            .search(SearchRequest {
                topic: topic.to_string(),
                api_key,
                page_size: self.page_size,
                offset,
            })
            .await?;

        let mut state = self.state.write().await;
        state.topic = topic.to_string();
        state
            .papers
            .set_page(result.papers, result.total, offset, self.page_size);
        info!(topic, page = page.max(1), total = result.total, "Search page recorded");

        self.persist(keys::TOPIC, &state.topic).await;
        self.persist(keys::CURSOR, &state.papers.cursor()).await;
        self.persist(keys::PAGE_IDS, state.papers.page_ids()).await;
        self.persist(keys::PAPERS, &state.cached_papers()).await;

        Ok(state.listing())
    }

    pub async fn listing(&self) -> PaperListing {
        self.state.read().await.listing()
    }

    /// Flip selection of one paper. Returns whether it is now selected.
    pub async fn toggle(&self, id: &str) -> bool {
        let mut state = self.state.write().await;
        let selected = state.papers.toggle_select(id);
        self.persist(keys::SELECTED_IDS, &state.papers.selected_ids()).await;
        selected
    }

    /// Add ids to the selection.
    pub async fn select(&self, ids: Vec<PaperId>) -> usize {
        let mut state = self.state.write().await;
        state.papers.select_all(ids);
        self.persist(keys::SELECTED_IDS, &state.papers.selected_ids()).await;
        state.papers.selection().len()
    }

    /// Fetch every result for the current topic, up to `limit`, and select
    /// them all. Returns how many papers were fetched.
    pub async fn select_all_results(&self, limit: Option<usize>) -> Result<usize> {
        let (topic, api_key) = {
            let state = self.state.read().await;
            (state.topic.clone(), state.settings.search_api_key.clone())
        };
        if topic.trim().is_empty() {
            return Err(ValidationError::MissingTopic.into());
        }

        let limit = limit.unwrap_or(self.select_all_limit);
        let papers = self
            .search
            .fetch_all(&topic, api_key.as_deref(), limit)
            .await?;
        let fetched = papers.len();
        let ids: Vec<PaperId> = papers.iter().map(|p| p.id.clone()).collect();

        let mut state = self.state.write().await;
        state.papers.record_fetch(papers);
        state.papers.select_all(ids);
        info!(topic = %topic, fetched, selected = state.papers.selection().len(), "Selected all results");

        self.persist(keys::SELECTED_IDS, &state.papers.selected_ids()).await;
        self.persist(keys::PAPERS, &state.cached_papers()).await;
        Ok(fetched)
    }

    pub async fn deselect_all(&self) {
        let mut state = self.state.write().await;
        state.papers.deselect_all();
        self.persist(keys::SELECTED_IDS, &state.papers.selected_ids()).await;
    }

    /// The context a generation would send right now.
    pub async fn context_preview(&self) -> AssembledContext {
        let state = self.state.read().await;
        ContextAssembler::new(state.settings.word_budget).assemble(
            state.papers.selection(),
            state.papers.page_ids(),
            state.papers.cache(),
        )
    }

    // --- Sections ---

    pub async fn sections(&self) -> BTreeMap<SectionKind, GeneratedSection> {
        let state = self.state.read().await;
        SectionKind::ALL
            .into_iter()
            .map(|kind| (kind, state.sections.get(&kind).cloned().unwrap_or_default()))
            .collect()
    }

    /// Generate one section.
    ///
    /// `topic` replaces the stored topic when given. Validation failures
    /// change nothing. Provider failures are recorded in the slot and
    /// returned.
    pub async fn generate(
        &self,
        section: SectionKind,
        topic: Option<&str>,
        provider: Option<ProviderKind>,
    ) -> Result<GeneratedSection> {
        let (prepared, client) = {
            let mut state = self.state.write().await;
            let kind = provider.unwrap_or(state.settings.active_provider);
            let topic = topic.map(str::trim).map_or_else(|| state.topic.clone(), String::from);
            let target = ProviderTarget {
                kind,
                api_key: state.settings.api_key(kind).map(String::from),
                model: state.settings.model(kind).map(String::from),
            };

            let input = GenerationInput {
                section,
                topic: &topic,
                selection: state.papers.selection(),
                fallback_page: state.papers.page_ids(),
                cache: state.papers.cache(),
                word_budget: state.settings.word_budget,
            };
            let prepared = GenerationOrchestrator::prepare(&input, &target)?;
            let client = self.provider(kind)?;

            let slot = state.sections.entry(section).or_default();
            if slot.is_generating() {
                return Err(ValidationError::AlreadyGenerating(section.to_string()).into());
            }
            slot.begin();

            if state.topic != topic {
                state.topic = topic;
                self.persist(keys::TOPIC, &state.topic).await;
            }
            self.persist(keys::SECTIONS, &state.sections).await;
            (prepared, client)
        };

        let result = GenerationOrchestrator::dispatch(client.as_ref(), prepared).await;

        let mut state = self.state.write().await;
        let slot = state.sections.entry(section).or_default();
        let outcome = match result {
            Ok(generation) => {
                slot.complete(generation);
                Ok(slot.clone())
            }
            Err(e) => {
                slot.fail(e.to_string());
                Err(Error::from(e))
            }
        };
        debug!(section = section.as_str(), status = ?slot.status, "Section slot updated");
        self.persist(keys::SECTIONS, &state.sections).await;
        outcome
    }

    // --- Chat ---

    pub async fn chat_history(&self, kind: ProviderKind) -> Vec<ConversationTurn> {
        self.state
            .read()
            .await
            .chats
            .get(&kind)
            .cloned()
            .unwrap_or_default()
    }

    /// Send one chat message.
    ///
    /// On a provider failure the message and a visible error turn are added
    /// to the transcript and the error is returned.
    pub async fn chat(&self, kind: ProviderKind, message: &str) -> Result<ChatExchange> {
        let message = message.trim();
        if message.is_empty() {
            return Err(ValidationError::EmptyMessage.into());
        }
        let session = self.sessions.get(&kind).ok_or_else(|| {
            Error::from(ProviderError::NotConfigured(format!(
                "{kind} is not available in this build."
            )))
        })?;

        let mut session = session.lock().await;

        let (config, prior) = {
            let state = self.state.read().await;
            let api_key = state
                .settings
                .api_key(kind)
                .ok_or(ValidationError::MissingApiKey(kind))?;
            let model = state
                .settings
                .model(kind)
                .ok_or(ValidationError::MissingModel(kind))?;
            let config = SessionConfig {
                api_key: api_key.to_string(),
                model: model.to_string(),
                system_instruction: self.chat_system_instruction.clone(),
            };
            (config, state.chats.get(&kind).cloned().unwrap_or_default())
        };

        let handle = session.get_or_create(&config, &prior);
        let result = session.send_turn(handle, message).await;

        let mut state = self.state.write().await;
        let transcript = state.chats.entry(kind).or_default();
        transcript.push(ConversationTurn::user(message));

        let outcome = match result {
            Ok((reply, _)) => {
                transcript.push(ConversationTurn::assistant(reply.clone()));
                Ok(ChatExchange {
                    reply,
                    history: transcript.clone(),
                })
            }
            Err(e) => {
                warn!(provider = kind.as_str(), error = %e, "Chat turn failed");
                transcript.push(ConversationTurn::error(e.to_string()));
                Err(Error::from(e))
            }
        };

        let key = keys::chat_history(kind.as_str());
        self.persist(&key, &state.chats[&kind]).await;
        outcome
    }

    /// Clear a provider's transcript and reset its session.
    pub async fn clear_chat(&self, kind: ProviderKind) {
        if let Some(session) = self.sessions.get(&kind) {
            session.lock().await.reset();
        }
        self.state.write().await.chats.remove(&kind);
        if let Err(e) = self.store.remove(&keys::chat_history(kind.as_str())).await {
            warn!(provider = kind.as_str(), error = %e, "Failed to remove chat history");
        }
    }

    // --- Models ---

    /// Models the provider offers for the stored key.
    pub async fn list_models(&self, kind: ProviderKind) -> Result<Vec<String>> {
        let api_key = self
            .state
            .read()
            .await
            .settings
            .api_key(kind)
            .map(String::from)
            .ok_or(ValidationError::MissingApiKey(kind))?;
        let client = self.provider(kind)?;
        Ok(client.list_models(&api_key).await?)
    }
}

/// Read and decode one key. Missing, unreadable or malformed values are `None`.
async fn load<T: DeserializeOwned>(store: &dyn StateStore, key: &str) -> Option<T> {
    match store.load(key).await {
        Ok(Some(value)) => match serde_json::from_value(value) {
            Ok(v) => Some(v),
            Err(e) => {
                warn!(key, error = %e, "Ignoring malformed persisted value");
                None
            }
        },
        Ok(None) => None,
        Err(e) => {
            warn!(key, error = %e, "Failed to read persisted value");
            None
        }
    }
}
