//! Academic paper records.
//!
//! A `Paper` is created from a search response and never mutated afterwards;
//! re-fetching the same id replaces the cached record wholesale.

use serde::{Deserialize, Serialize};

/// Externally assigned, unique paper identifier.
pub type PaperId = String;

/// An academic paper as returned by the search index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paper {
    pub id: PaperId,

    pub title: String,

    /// Author names, in byline order
    #[serde(default)]
    pub authors: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub venue: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(
        rename = "abstract",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub abstract_text: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub citation_count: Option<u64>,
}

impl Paper {
    /// Create a paper with only the required fields set.
    pub fn new(id: impl Into<PaperId>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            authors: Vec::new(),
            year: None,
            venue: None,
            url: None,
            abstract_text: None,
            citation_count: None,
        }
    }

    /// Citation count used for ranking; missing counts rank as zero.
    pub fn citations_or_zero(&self) -> u64 {
        self.citation_count.unwrap_or(0)
    }

    /// Year used for ranking; missing years rank as zero.
    pub fn year_or_zero(&self) -> i32 {
        self.year.unwrap_or(0)
    }
}

/// One page of search results.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchPage {
    pub papers: Vec<Paper>,

    /// Total number of matches reported by the index
    pub total: u64,
}
