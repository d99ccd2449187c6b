//! Academic paper search clients for Citeweave.
//!
//! All clients implement the `citeweave_core::PaperSearch` trait.

pub mod semantic_scholar;

pub use semantic_scholar::SemanticScholarClient;

/// Build the configured search client.
pub fn build_from_config(config: &citeweave_config::AppConfig) -> SemanticScholarClient {
    match config.search.api_url.as_deref() {
        Some(url) => SemanticScholarClient::new().with_base_url(url),
        None => SemanticScholarClient::new(),
    }
}
