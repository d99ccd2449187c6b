//! Subcommand implementations.

pub mod chat;
pub mod config_cmd;
pub mod generate;
pub mod search;
pub mod select;
pub mod serve;

use citeweave_config::AppConfig;
use citeweave_research::Workspace;
use citeweave_state::FileStateStore;
use std::sync::Arc;

pub(crate) fn load_config() -> Result<AppConfig, Box<dyn std::error::Error>> {
    AppConfig::load().map_err(|e| format!("Failed to load config: {e}").into())
}

/// Open the workspace over the configured clients and the state file.
pub(crate) async fn open_workspace(
    config: &AppConfig,
) -> Result<Arc<Workspace>, Box<dyn std::error::Error>> {
    tracing::debug!(state = %config.state_path().display(), "Opening workspace");
    let providers = citeweave_providers::router::build_from_config(config);
    let search = Arc::new(citeweave_papers::build_from_config(config));
    let store = Arc::new(FileStateStore::new(config.state_path()));
    let workspace = Workspace::open(config, providers, search, store).await?;
    Ok(Arc::new(workspace))
}
