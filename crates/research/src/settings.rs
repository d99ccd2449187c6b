//! User settings: API keys, model choices, active provider, word budget.
//!
//! Seeded from `AppConfig`; values the user edits are persisted and win over
//! config defaults on the next start.

use citeweave_config::AppConfig;
use citeweave_core::error::ValidationError;
use citeweave_core::provider::ProviderKind;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

#[derive(Clone, PartialEq, Eq)]
pub struct Settings {
    pub api_keys: HashMap<ProviderKind, String>,
    pub models: HashMap<ProviderKind, String>,
    pub active_provider: ProviderKind,
    pub search_api_key: Option<String>,
    pub word_budget: usize,
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let keys: Vec<&ProviderKind> = self.api_keys.keys().collect();
        f.debug_struct("Settings")
            .field("api_keys_set", &keys)
            .field("models", &self.models)
            .field("active_provider", &self.active_provider)
            .field("search_api_key", &self.search_api_key.as_ref().map(|_| "[REDACTED]"))
            .field("word_budget", &self.word_budget)
            .finish()
    }
}

impl Settings {
    pub fn from_config(config: &AppConfig) -> Self {
        let mut api_keys = HashMap::new();
        let mut models = HashMap::new();
        for kind in ProviderKind::ALL {
            if let Some(key) = config.api_key(kind).filter(|k| !k.trim().is_empty()) {
                api_keys.insert(kind, key);
            }
            models.insert(kind, config.model(kind));
        }

        Self {
            api_keys,
            models,
            active_provider: config.default_provider,
            search_api_key: config.search.api_key.clone().filter(|k| !k.trim().is_empty()),
            word_budget: config.word_budget,
        }
    }

    pub fn api_key(&self, kind: ProviderKind) -> Option<&str> {
        self.api_keys.get(&kind).map(String::as_str)
    }

    pub fn model(&self, kind: ProviderKind) -> Option<&str> {
        self.models.get(&kind).map(String::as_str)
    }

    /// Apply an update and return the providers whose key or model changed.
    ///
    /// The update is validated first; a rejected update changes nothing.
    pub fn apply(&mut self, update: &SettingsUpdate) -> Result<Vec<ProviderKind>, ValidationError> {
        if update.word_budget == Some(0) {
            return Err(ValidationError::InvalidWordBudget);
        }

        let mut changed = Vec::new();
        for kind in ProviderKind::ALL {
            let key_changed = update
                .api_keys
                .get(&kind)
                .is_some_and(|v| set_or_clear(&mut self.api_keys, kind, v));
            let model_changed = update
                .models
                .get(&kind)
                .is_some_and(|v| set_or_clear(&mut self.models, kind, v));
            if key_changed || model_changed {
                changed.push(kind);
            }
        }

        if let Some(kind) = update.active_provider {
            self.active_provider = kind;
        }
        if let Some(key) = &update.search_api_key {
            self.search_api_key = Some(key.trim().to_string()).filter(|k| !k.is_empty());
        }
        if let Some(budget) = update.word_budget {
            self.word_budget = budget;
        }

        Ok(changed)
    }

    /// A copy safe to show: keys reduced to their last four characters.
    pub fn view(&self) -> SettingsView {
        SettingsView {
            api_keys: ProviderKind::ALL
                .into_iter()
                .map(|kind| (kind, self.api_key(kind).map(mask)))
                .collect(),
            models: ProviderKind::ALL
                .into_iter()
                .map(|kind| (kind, self.model(kind).map(String::from)))
                .collect(),
            active_provider: self.active_provider,
            search_api_key: self.search_api_key.as_deref().map(mask),
            word_budget: self.word_budget,
        }
    }
}

/// Set `kind` to the trimmed value, or remove it when blank. Returns whether
/// anything changed.
fn set_or_clear(map: &mut HashMap<ProviderKind, String>, kind: ProviderKind, value: &str) -> bool {
    let value = value.trim();
    if value.is_empty() {
        map.remove(&kind).is_some()
    } else if map.get(&kind).map(String::as_str) == Some(value) {
        false
    } else {
        map.insert(kind, value.to_string());
        true
    }
}

fn mask(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 8 {
        return "****".into();
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("****{tail}")
}

/// A partial settings change. Blank key or model strings clear the value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SettingsUpdate {
    pub api_keys: HashMap<ProviderKind, String>,
    pub models: HashMap<ProviderKind, String>,
    pub active_provider: Option<ProviderKind>,
    pub search_api_key: Option<String>,
    pub word_budget: Option<usize>,
}

/// Settings as shown to the user.
#[derive(Debug, Clone, Serialize)]
pub struct SettingsView {
    pub api_keys: BTreeMap<ProviderKind, Option<String>>,
    pub models: BTreeMap<ProviderKind, Option<String>>,
    pub active_provider: ProviderKind,
    pub search_api_key: Option<String>,
    pub word_budget: usize,
}
