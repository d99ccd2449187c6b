//! Provider router: maps each provider kind to its client.
//!
//! Exactly one client per kind; clients are stateless apart from their HTTP
//! connection pool, so they are shared behind `Arc`.

use std::collections::HashMap;
use std::sync::Arc;

use citeweave_core::provider::{Provider, ProviderKind};

use crate::gemini::GeminiProvider;
use crate::openai_compat::OpenAiCompatProvider;

/// Routes LLM requests to the correct provider.
#[derive(Clone, Default)]
pub struct ProviderRouter {
    providers: HashMap<ProviderKind, Arc<dyn Provider>>,
}

impl ProviderRouter {
    /// Create an empty router.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider under its own kind, replacing any previous one.
    pub fn register(&mut self, provider: Arc<dyn Provider>) {
        self.providers.insert(provider.kind(), provider);
    }

    /// Builder-style registration.
    pub fn with(mut self, provider: Arc<dyn Provider>) -> Self {
        self.register(provider);
        self
    }

    /// Get the client for a provider kind.
    pub fn get(&self, kind: ProviderKind) -> Option<Arc<dyn Provider>> {
        self.providers.get(&kind).cloned()
    }

    /// List registered provider kinds in a stable order.
    pub fn list(&self) -> Vec<ProviderKind> {
        let mut kinds: Vec<ProviderKind> = self.providers.keys().copied().collect();
        kinds.sort();
        kinds
    }
}

/// Build both provider clients from configuration.
pub fn build_from_config(config: &citeweave_config::AppConfig) -> ProviderRouter {
    let mut gemini = GeminiProvider::new();
    if let Some(url) = config
        .provider(ProviderKind::Gemini)
        .and_then(|p| p.api_url.as_deref())
    {
        gemini = gemini.with_base_url(url);
    }

    let openai = match config
        .provider(ProviderKind::OpenAi)
        .and_then(|p| p.api_url.as_deref())
    {
        Some(url) => OpenAiCompatProvider::new(url),
        None => OpenAiCompatProvider::openai(),
    };

    ProviderRouter::new()
        .with(Arc::new(gemini))
        .with(Arc::new(openai))
}
