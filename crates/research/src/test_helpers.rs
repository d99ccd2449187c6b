//! Shared test helpers: scripted providers and paper indexes.

use async_trait::async_trait;
use citeweave_core::error::{ProviderError, SearchError};
use citeweave_core::paper::{Paper, SearchPage};
use citeweave_core::provider::*;
use citeweave_core::search::{PaperSearch, SearchRequest};
use std::collections::VecDeque;
use std::sync::Mutex;

/// A provider that replays scripted results.
///
/// When a queue runs dry it falls back to a canned success, so tests only
/// script the calls they care about.
pub struct MockProvider {
    kind: ProviderKind,
    generations: Mutex<VecDeque<Result<Generation, ProviderError>>>,
    replies: Mutex<VecDeque<Result<String, ProviderError>>>,
    generate_calls: Mutex<Vec<GenerationRequest>>,
    converse_calls: Mutex<Vec<ConverseRequest>>,
}

impl MockProvider {
    pub fn new(kind: ProviderKind) -> Self {
        Self {
            kind,
            generations: Mutex::new(VecDeque::new()),
            replies: Mutex::new(VecDeque::new()),
            generate_calls: Mutex::new(Vec::new()),
            converse_calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_generation(self, result: Result<Generation, ProviderError>) -> Self {
        self.generations.lock().unwrap().push_back(result);
        self
    }

    pub fn with_reply(self, result: Result<String, ProviderError>) -> Self {
        self.replies.lock().unwrap().push_back(result);
        self
    }

    pub fn generate_count(&self) -> usize {
        self.generate_calls.lock().unwrap().len()
    }

    pub fn converse_count(&self) -> usize {
        self.converse_calls.lock().unwrap().len()
    }

    pub fn last_converse(&self) -> Option<ConverseRequest> {
        self.converse_calls.lock().unwrap().last().cloned()
    }

    pub fn last_generation(&self) -> Option<GenerationRequest> {
        self.generate_calls.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    async fn generate_once(&self, request: GenerationRequest) -> Result<Generation, ProviderError> {
        let model = request.model.clone();
        self.generate_calls.lock().unwrap().push(request);
        self.generations
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Ok(Generation {
                    text: "Generated section citing [1].".into(),
                    grounding: None,
                    model,
                })
            })
    }

    async fn converse(&self, request: ConverseRequest) -> Result<ConverseResponse, ProviderError> {
        self.converse_calls.lock().unwrap().push(request.clone());
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(format!("Reply to: {}", request.user_text)))?;
        Ok(ConverseResponse::appended(
            request.history,
            &request.user_text,
            reply,
        ))
    }

    async fn list_models(&self, _api_key: &str) -> Result<Vec<String>, ProviderError> {
        Ok(vec![format!("{}-mock-model", self.kind.as_str())])
    }
}

/// A paper index over a fixed corpus.
pub struct MockSearch {
    corpus: Vec<Paper>,
    requests: Mutex<Vec<SearchRequest>>,
    failure: Mutex<Option<SearchError>>,
}

impl MockSearch {
    pub fn new(corpus: Vec<Paper>) -> Self {
        Self {
            corpus,
            requests: Mutex::new(Vec::new()),
            failure: Mutex::new(None),
        }
    }

    /// `count` papers with descending citation counts: p0 is the most cited.
    pub fn numbered(count: usize) -> Self {
        Self::new(
            (0..count)
                .map(|i| Paper {
                    citation_count: Some((count - i) as u64 * 10),
                    year: Some(2000 + (i % 25) as i32),
                    authors: vec![format!("Author {i}")],
                    ..Paper::new(format!("p{i}"), format!("Paper {i}"))
                })
                .collect(),
        )
    }

    /// Fail the next request.
    pub fn fail_next(&self, error: SearchError) {
        *self.failure.lock().unwrap() = Some(error);
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last_request(&self) -> Option<SearchRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl PaperSearch for MockSearch {
    fn name(&self) -> &str {
        "mock"
    }

    async fn search(&self, request: SearchRequest) -> Result<SearchPage, SearchError> {
        let (offset, size) = (request.offset, request.page_size);
        self.requests.lock().unwrap().push(request);
        if let Some(error) = self.failure.lock().unwrap().take() {
            return Err(error);
        }
        let end = (offset + size).min(self.corpus.len());
        let papers = self.corpus.get(offset..end).map(<[Paper]>::to_vec).unwrap_or_default();
        Ok(SearchPage {
            papers,
            total: self.corpus.len() as u64,
        })
    }
}
