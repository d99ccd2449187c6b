//! Configuration loading, validation, and management for Citeweave.
//!
//! Loads configuration from `~/.citeweave/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use citeweave_core::ProviderKind;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.citeweave/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Provider used for generation and chat until the user picks another
    #[serde(default = "default_provider")]
    pub default_provider: ProviderKind,

    /// Maximum words of paper context sent with a generation request
    #[serde(default = "default_word_budget")]
    pub word_budget: usize,

    /// Search results per page
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Maximum papers fetched by "select all across pages"
    #[serde(default = "default_select_all_limit")]
    pub select_all_limit: usize,

    /// System instruction for the chat panel
    #[serde(default = "default_chat_system_instruction")]
    pub chat_system_instruction: String,

    /// Paper search configuration
    #[serde(default)]
    pub search: SearchConfig,

    /// Provider-specific configurations, keyed by provider name
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,

    /// Gateway configuration
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Persisted state configuration
    #[serde(default)]
    pub state: StateConfig,
}

fn default_provider() -> ProviderKind {
    ProviderKind::Gemini
}
fn default_word_budget() -> usize {
    3000
}
fn default_page_size() -> usize {
    10
}
fn default_select_all_limit() -> usize {
    100
}
fn default_chat_system_instruction() -> String {
    "You are a knowledgeable research assistant. Answer questions about academic \
     literature clearly and accurately, and say so when you are unsure."
        .into()
}

/// Built-in model used when neither config nor the user picked one.
pub fn builtin_model(kind: ProviderKind) -> &'static str {
    match kind {
        ProviderKind::Gemini => "gemini-2.0-flash",
        ProviderKind::OpenAi => "gpt-4o-mini",
    }
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("default_provider", &self.default_provider)
            .field("word_budget", &self.word_budget)
            .field("page_size", &self.page_size)
            .field("select_all_limit", &self.select_all_limit)
            .field("search", &self.search)
            .field("providers", &self.providers)
            .field("gateway", &self.gateway)
            .field("state", &self.state)
            .finish()
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("default_model", &self.default_model)
            .finish()
    }
}

impl std::fmt::Debug for SearchConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .finish()
    }
}

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Override the Semantic Scholar base URL (proxies, tests)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
}

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,

    /// Browser origin allowed by CORS
    #[serde(default = "default_allowed_origin")]
    pub allowed_origin: String,
}

fn default_port() -> u16 {
    42618
}
fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_allowed_origin() -> String {
    "http://localhost:5173".into()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            allowed_origin: default_allowed_origin(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StateConfig {
    /// Where persisted state lives (default: `~/.citeweave/state.json`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl AppConfig {
    /// Load configuration from the default path (~/.citeweave/config.toml).
    ///
    /// Environment variables override the file:
    /// - `GEMINI_API_KEY`, `OPENAI_API_KEY` (only when the file sets no key)
    /// - `SEMANTIC_SCHOLAR_API_KEY`
    /// - `CITEWEAVE_PROVIDER`, `CITEWEAVE_WORD_BUDGET`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides through `lookup` (injectable for tests).
    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        for (kind, var) in [
            (ProviderKind::Gemini, "GEMINI_API_KEY"),
            (ProviderKind::OpenAi, "OPENAI_API_KEY"),
        ] {
            let entry = self.providers.entry(kind.as_str().to_string()).or_default();
            if entry.api_key.is_none() {
                entry.api_key = lookup(var).filter(|k| !k.trim().is_empty());
            }
        }

        if self.search.api_key.is_none() {
            self.search.api_key =
                lookup("SEMANTIC_SCHOLAR_API_KEY").filter(|k| !k.trim().is_empty());
        }

        if let Some(provider) = lookup("CITEWEAVE_PROVIDER") {
            self.default_provider = provider
                .parse()
                .map_err(|e| ConfigError::ValidationError(format!("CITEWEAVE_PROVIDER: {e}")))?;
        }

        if let Some(budget) = lookup("CITEWEAVE_WORD_BUDGET") {
            self.word_budget = budget.trim().parse().map_err(|_| {
                ConfigError::ValidationError(format!(
                    "CITEWEAVE_WORD_BUDGET must be a positive integer, got '{budget}'"
                ))
            })?;
        }

        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".citeweave")
    }

    /// Resolved location of the persisted state file.
    pub fn state_path(&self) -> PathBuf {
        self.state
            .path
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| Self::config_dir().join("state.json"))
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.word_budget == 0 {
            return Err(ConfigError::ValidationError(
                "word_budget must be greater than 0".into(),
            ));
        }

        if !(1..=100).contains(&self.page_size) {
            return Err(ConfigError::ValidationError(
                "page_size must be between 1 and 100".into(),
            ));
        }

        if self.select_all_limit == 0 {
            return Err(ConfigError::ValidationError(
                "select_all_limit must be greater than 0".into(),
            ));
        }

        for name in self.providers.keys() {
            if name.parse::<ProviderKind>().is_err() {
                return Err(ConfigError::ValidationError(format!(
                    "unknown provider section [providers.{name}]"
                )));
            }
        }

        Ok(())
    }

    /// Provider-specific settings, if configured.
    pub fn provider(&self, kind: ProviderKind) -> Option<&ProviderConfig> {
        self.providers.get(kind.as_str())
    }

    /// API key configured for a provider.
    pub fn api_key(&self, kind: ProviderKind) -> Option<String> {
        self.provider(kind).and_then(|p| p.api_key.clone())
    }

    /// Model configured for a provider, falling back to the built-in default.
    pub fn model(&self, kind: ProviderKind) -> String {
        self.provider(kind)
            .and_then(|p| p.default_model.clone())
            .unwrap_or_else(|| builtin_model(kind).to_string())
    }

    /// A copy with every secret replaced, safe to print.
    pub fn redacted(&self) -> Self {
        let mut config = self.clone();
        for provider in config.providers.values_mut() {
            if provider.api_key.is_some() {
                provider.api_key = Some("***REDACTED***".into());
            }
        }
        if config.search.api_key.is_some() {
            config.search.api_key = Some("***REDACTED***".into());
        }
        config
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_provider: default_provider(),
            word_budget: default_word_budget(),
            page_size: default_page_size(),
            select_all_limit: default_select_all_limit(),
            chat_system_instruction: default_chat_system_instruction(),
            search: SearchConfig::default(),
            providers: HashMap::new(),
            gateway: GatewayConfig::default(),
            state: StateConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
