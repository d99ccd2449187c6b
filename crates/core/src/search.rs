//! PaperSearch trait: the abstraction over academic paper indexes.

use async_trait::async_trait;

use crate::error::SearchError;
use crate::paper::{Paper, SearchPage};

/// Largest page an index is asked for in one request.
pub const MAX_PAGE_SIZE: usize = 100;

/// A paged search request.
#[derive(Clone)]
pub struct SearchRequest {
    pub topic: String,

    /// Optional key for the index; anonymous access when absent
    pub api_key: Option<String>,

    pub page_size: usize,

    pub offset: usize,
}

impl std::fmt::Debug for SearchRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchRequest")
            .field("topic", &self.topic)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("page_size", &self.page_size)
            .field("offset", &self.offset)
            .finish()
    }
}

/// An academic paper index.
#[async_trait]
pub trait PaperSearch: Send + Sync {
    /// A human-readable name for this index.
    fn name(&self) -> &str;

    /// Fetch one page of results for a topic.
    async fn search(&self, request: SearchRequest) -> Result<SearchPage, SearchError>;

    /// Fetch up to `limit` results across pages.
    ///
    /// Pages are requested one at a time. Stops early when the index reports
    /// no further results.
    async fn fetch_all(
        &self,
        topic: &str,
        api_key: Option<&str>,
        limit: usize,
    ) -> Result<Vec<Paper>, SearchError> {
        let mut papers: Vec<Paper> = Vec::new();
        let mut offset = 0;

        while papers.len() < limit {
            let page_size = (limit - papers.len()).min(MAX_PAGE_SIZE);
            let page = self
                .search(SearchRequest {
                    topic: topic.to_string(),
                    api_key: api_key.map(String::from),
                    page_size,
                    offset,
                })
                .await?;

            let received = page.papers.len();
            papers.extend(page.papers);
            offset += page_size;

            if received == 0 || offset as u64 >= page.total {
                break;
            }
        }

        papers.truncate(limit);
        Ok(papers)
    }
}
