//! Paper store: search results, the paper cache and the selection.
//!
//! Every paper ever fetched stays in the cache for the life of the
//! workspace, so a selection made on page 1 still resolves after the user
//! moves to page 3. Selected ids that are not cached are skipped when
//! resolved, never reported as errors.

use citeweave_core::paper::{Paper, PaperId};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Where the displayed page sits in the result set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageCursor {
    pub offset: usize,
    pub page_size: usize,
    /// Total results the index reported for the query
    pub total: u64,
}

impl PageCursor {
    /// 1-based number of the displayed page.
    pub fn page_number(&self) -> usize {
        if self.page_size == 0 {
            1
        } else {
            self.offset / self.page_size + 1
        }
    }

    /// Number of pages the result set spans.
    pub fn page_count(&self) -> usize {
        if self.page_size == 0 {
            return 0;
        }
        (self.total as usize).div_ceil(self.page_size)
    }
}

#[derive(Debug, Clone, Default)]
pub struct PaperStore {
    cache: HashMap<PaperId, Paper>,
    selection: HashSet<PaperId>,
    page_ids: Vec<PaperId>,
    cursor: PageCursor,
}

impl PaperStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge papers into the cache. A re-fetched id replaces its entry.
    pub fn record_fetch(&mut self, papers: impl IntoIterator<Item = Paper>) {
        for paper in papers {
            self.cache.insert(paper.id.clone(), paper);
        }
    }

    /// Flip membership of `id`. Returns whether it is now selected.
    pub fn toggle_select(&mut self, id: &str) -> bool {
        if self.selection.remove(id) {
            false
        } else {
            self.selection.insert(id.to_string());
            true
        }
    }

    /// Add every id to the selection.
    pub fn select_all(&mut self, ids: impl IntoIterator<Item = PaperId>) {
        self.selection.extend(ids);
    }

    pub fn deselect_all(&mut self) {
        self.selection.clear();
    }

    /// Record a fetched page: cache its papers and make it the displayed page.
    pub fn set_page(&mut self, papers: Vec<Paper>, total: u64, offset: usize, page_size: usize) {
        self.page_ids = papers.iter().map(|p| p.id.clone()).collect();
        self.cursor = PageCursor {
            offset,
            page_size,
            total,
        };
        self.record_fetch(papers);
    }

    /// The displayed page, in index order.
    pub fn current_page(&self) -> Vec<&Paper> {
        self.resolve(self.page_ids.iter())
    }

    /// The selected papers that are cached, ordered by id.
    pub fn selected_papers(&self) -> Vec<&Paper> {
        let mut ids: Vec<&PaperId> = self.selection.iter().collect();
        ids.sort();
        self.resolve(ids.into_iter())
    }

    /// Selected ids in a stable order, for persistence and display.
    pub fn selected_ids(&self) -> Vec<PaperId> {
        let mut ids: Vec<PaperId> = self.selection.iter().cloned().collect();
        ids.sort();
        ids
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.selection.contains(id)
    }

    pub fn selection(&self) -> &HashSet<PaperId> {
        &self.selection
    }

    pub fn page_ids(&self) -> &[PaperId] {
        &self.page_ids
    }

    pub fn cache(&self) -> &HashMap<PaperId, Paper> {
        &self.cache
    }

    pub fn get(&self, id: &str) -> Option<&Paper> {
        self.cache.get(id)
    }

    pub fn cursor(&self) -> PageCursor {
        self.cursor
    }

    /// Restore the displayed page and selection from persisted state.
    pub fn restore(&mut self, page_ids: Vec<PaperId>, cursor: PageCursor, selection: Vec<PaperId>) {
        self.page_ids = page_ids;
        self.cursor = cursor;
        self.selection = selection.into_iter().collect();
    }

    fn resolve<'a>(&'a self, ids: impl Iterator<Item = &'a PaperId>) -> Vec<&'a Paper> {
        ids.filter_map(|id| self.cache.get(id)).collect()
    }
}
