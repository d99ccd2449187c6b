//! Semantic Scholar Graph API client.
//!
//! - Base URL: `https://api.semanticscholar.org`
//! - Endpoint: `GET /graph/v1/paper/search`
//! - Anonymous access is rate limited; an optional key goes in `x-api-key`
//! - At most 100 results per page

use async_trait::async_trait;
use citeweave_core::error::SearchError;
use citeweave_core::paper::{Paper, SearchPage};
use citeweave_core::search::{MAX_PAGE_SIZE, PaperSearch, SearchRequest};
use serde::Deserialize;
use tracing::{debug, warn};

const DEFAULT_BASE_URL: &str = "https://api.semanticscholar.org";

/// Fields requested for every paper.
const PAPER_FIELDS: &str = "paperId,title,authors,year,venue,url,abstract,citationCount";

/// Client for the Semantic Scholar paper search endpoint.
pub struct SemanticScholarClient {
    base_url: String,
    client: reqwest::Client,
}

impl SemanticScholarClient {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            base_url: DEFAULT_BASE_URL.into(),
            client,
        }
    }

    /// Point the client at another host (proxies, test servers).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn search_url(&self) -> String {
        format!("{}/graph/v1/paper/search", self.base_url)
    }

    /// Query parameters for one page; the page size is clamped to 1..=100.
    fn query_params(request: &SearchRequest) -> Vec<(&'static str, String)> {
        let limit = request.page_size.clamp(1, MAX_PAGE_SIZE);
        vec![
            ("query", request.topic.trim().to_string()),
            ("offset", request.offset.to_string()),
            ("limit", limit.to_string()),
            ("fields", PAPER_FIELDS.to_string()),
        ]
    }

    /// Convert a raw response into a page, dropping entries without an id.
    fn to_search_page(response: SearchResponse) -> SearchPage {
        let papers: Vec<Paper> = response
            .data
            .into_iter()
            .filter_map(PaperData::into_paper)
            .collect();
        let total = response.total.unwrap_or(papers.len() as u64);
        SearchPage { papers, total }
    }
}

impl Default for SemanticScholarClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Map a non-200 status to a search error.
fn classify_error(status: u16, body: &str) -> SearchError {
    match status {
        401 | 403 => SearchError::Unauthorized,
        429 => SearchError::RateLimited,
        _ => {
            let message = serde_json::from_str::<serde_json::Value>(body)
                .ok()
                .and_then(|v| {
                    v.get("message")
                        .or_else(|| v.get("error"))
                        .and_then(|m| m.as_str())
                        .map(String::from)
                })
                .unwrap_or_else(|| body.to_string());
            SearchError::ApiError {
                status_code: status,
                message,
            }
        }
    }
}

#[async_trait]
impl PaperSearch for SemanticScholarClient {
    fn name(&self) -> &str {
        "semantic_scholar"
    }

    async fn search(&self, request: SearchRequest) -> Result<SearchPage, SearchError> {
        debug!(topic = %request.topic, offset = request.offset, limit = request.page_size, "Searching Semantic Scholar");

        let mut builder = self
            .client
            .get(self.search_url())
            .query(&Self::query_params(&request));
        if let Some(key) = request.api_key.as_deref().filter(|k| !k.trim().is_empty()) {
            builder = builder.header("x-api-key", key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| SearchError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        if status != 200 {
            let body = response.text().await.unwrap_or_default();
            warn!(status, body = %body, "Semantic Scholar returned error");
            return Err(classify_error(status, &body));
        }

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| SearchError::InvalidResponse(e.to_string()))?;

        let page = Self::to_search_page(parsed);
        debug!(count = page.papers.len(), total = page.total, "Search page received");
        Ok(page)
    }
}

// --- Semantic Scholar API types ---

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    total: Option<u64>,
    #[serde(default)]
    data: Vec<PaperData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PaperData {
    #[serde(default)]
    paper_id: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    authors: Vec<AuthorData>,
    #[serde(default)]
    year: Option<i32>,
    #[serde(default)]
    venue: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(rename = "abstract", default)]
    abstract_text: Option<String>,
    #[serde(default)]
    citation_count: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct AuthorData {
    #[serde(default)]
    name: Option<String>,
}

/// Blank strings from the index are treated as absent.
fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

impl PaperData {
    fn into_paper(self) -> Option<Paper> {
        let id = non_blank(self.paper_id)?;
        Some(Paper {
            id,
            title: non_blank(self.title).unwrap_or_else(|| "Untitled".into()),
            authors: self
                .authors
                .into_iter()
                .filter_map(|a| non_blank(a.name))
                .collect(),
            year: self.year,
            venue: non_blank(self.venue),
            url: non_blank(self.url),
            abstract_text: non_blank(self.abstract_text),
            citation_count: self.citation_count,
        })
    }
}
