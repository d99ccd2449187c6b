//! Context assembly: the citation-numbered paper block fed to generation.
//!
//! Candidates are the selected papers, or the displayed page when nothing is
//! selected. They are ranked by citation count, then year, then id, numbered
//! `[1]..[k]` in that order, and appended while the running word count stays
//! within the budget. Assembly stops at the first block that does not fit.
//!
//! Assembly is deterministic: identical inputs produce identical text.

use citeweave_core::paper::{Paper, PaperId};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

const NOT_AVAILABLE: &str = "N/A";

/// The assembled context plus what went into it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssembledContext {
    pub text: String,
    pub metadata: ContextMetadata,
}

impl AssembledContext {
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextMetadata {
    /// Whitespace-delimited words in the emitted text
    pub word_count: usize,
    pub budget: usize,
    /// Papers that received a citation number
    pub included: usize,
    /// Papers that resolved against the cache
    pub candidates: usize,
    /// True when the selection was used, false for the page fallback
    pub from_selection: bool,
    /// Ids in citation order; `cited_ids[0]` is `[1]`
    pub cited_ids: Vec<PaperId>,
}

/// Builds budgeted context blocks.
#[derive(Debug, Clone, Copy)]
pub struct ContextAssembler {
    word_budget: usize,
}

impl ContextAssembler {
    pub fn new(word_budget: usize) -> Self {
        Self { word_budget }
    }

    pub fn word_budget(&self) -> usize {
        self.word_budget
    }

    /// Assemble context from the selection, falling back to the page.
    pub fn assemble(
        &self,
        selection: &HashSet<PaperId>,
        fallback_page: &[PaperId],
        cache: &HashMap<PaperId, Paper>,
    ) -> AssembledContext {
        let from_selection = !selection.is_empty();
        let candidates = if from_selection {
            resolve(selection.iter(), cache)
        } else {
            resolve(fallback_page.iter(), cache)
        };
        let ranked = rank(candidates);

        let mut text = String::new();
        let mut word_count = 0;
        let mut cited_ids = Vec::new();

        for (index, paper) in ranked.iter().enumerate() {
            let block = render_block(index + 1, paper);
            let block_words = block.split_whitespace().count();
            if word_count + block_words > self.word_budget {
                break;
            }
            word_count += block_words;
            text.push_str(&block);
            cited_ids.push(paper.id.clone());
        }

        let text = text.trim_end().to_string();

        AssembledContext {
            text,
            metadata: ContextMetadata {
                word_count,
                budget: self.word_budget,
                included: cited_ids.len(),
                candidates: ranked.len(),
                from_selection,
                cited_ids,
            },
        }
    }
}

/// Assemble and return only the text. Empty means no context is available.
pub fn build_context(
    selection: &HashSet<PaperId>,
    fallback_page: &[PaperId],
    cache: &HashMap<PaperId, Paper>,
    word_budget: usize,
) -> String {
    ContextAssembler::new(word_budget)
        .assemble(selection, fallback_page, cache)
        .text
}

/// Resolve ids against the cache, dropping misses and repeated ids.
fn resolve<'a>(
    ids: impl Iterator<Item = &'a PaperId>,
    cache: &'a HashMap<PaperId, Paper>,
) -> Vec<&'a Paper> {
    let mut seen: HashSet<&PaperId> = HashSet::new();
    ids.filter(|id| seen.insert(*id))
        .filter_map(|id| cache.get(id))
        .collect()
}

/// Citations descending, then year descending, then id ascending.
fn rank(mut papers: Vec<&Paper>) -> Vec<&Paper> {
    papers.sort_by(|a, b| {
        b.citations_or_zero()
            .cmp(&a.citations_or_zero())
            .then_with(|| b.year_or_zero().cmp(&a.year_or_zero()))
            .then_with(|| a.id.cmp(&b.id))
    });
    papers
}

fn or_na(value: Option<&str>) -> &str {
    value.filter(|s| !s.trim().is_empty()).unwrap_or(NOT_AVAILABLE)
}

fn render_block(number: usize, paper: &Paper) -> String {
    let authors = if paper.authors.is_empty() {
        NOT_AVAILABLE.to_string()
    } else {
        paper.authors.join(", ")
    };
    let year = paper
        .year
        .map_or_else(|| NOT_AVAILABLE.to_string(), |y| y.to_string());

    format!(
        "[{number}] Title: {title}\nAuthors: {authors}\nYear: {year}\nVenue: {venue}\nURL: {url}\nAbstract: {abstract_text}\n\n",
        title = paper.title,
        venue = or_na(paper.venue.as_deref()),
        url = or_na(paper.url.as_deref()),
        abstract_text = or_na(paper.abstract_text.as_deref()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paper(id: &str, citations: Option<u64>, year: Option<i32>) -> Paper {
        Paper {
            citation_count: citations,
            year,
            authors: vec!["Ada Lovelace".into(), "Alan Turing".into()],
            venue: Some("NeurIPS".into()),
            url: Some(format!("https://example.org/{id}")),
            abstract_text: Some("We study things.".into()),
            ..Paper::new(id, format!("Title {id}"))
        }
    }

    fn cache_of(papers: &[Paper]) -> HashMap<PaperId, Paper> {
        papers.iter().map(|p| (p.id.clone(), p.clone())).collect()
    }

    fn selection_of(ids: &[&str]) -> HashSet<PaperId> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn higher_citations_are_numbered_first() {
        let cache = cache_of(&[
            paper("P1", Some(10), Some(2020)),
            paper("P2", Some(50), Some(2019)),
        ]);
        let text = build_context(&selection_of(&["P1", "P2"]), &[], &cache, 3000);

        let p2 = text.find("[1] Title: Title P2").unwrap();
        let p1 = text.find("[2] Title: Title P1").unwrap();
        assert!(p2 < p1);
    }

    #[test]
    fn order_is_citations_then_year_then_id() {
        let cache = cache_of(&[
            paper("c", Some(5), Some(2018)),
            paper("b", Some(5), Some(2021)),
            paper("a", Some(5), Some(2021)),
            paper("d", None, Some(2024)),
            paper("e", Some(7), None),
        ]);
        let ctx = ContextAssembler::new(10_000).assemble(
            &selection_of(&["a", "b", "c", "d", "e"]),
            &[],
            &cache,
        );
        assert_eq!(ctx.metadata.cited_ids, vec!["e", "a", "b", "c", "d"]);
    }

    #[test]
    fn citation_numbers_are_sequential() {
        let cache = cache_of(&[
            paper("x", Some(3), None),
            paper("y", Some(2), None),
            paper("z", Some(1), None),
        ]);
        let ctx = ContextAssembler::new(10_000).assemble(
            &selection_of(&["x", "y", "z"]),
            &[],
            &cache,
        );
        let numbers: Vec<&str> = ctx
            .text
            .lines()
            .filter(|l| l.starts_with('['))
            .map(|l| &l[..3])
            .collect();
        assert_eq!(numbers, vec!["[1]", "[2]", "[3]"]);
        assert_eq!(ctx.metadata.included, 3);
    }

    #[test]
    fn block_shape_uses_na_for_missing_fields() {
        let cache = cache_of(&[Paper::new("bare", "A Bare Paper")]);
        let text = build_context(&HashSet::new(), &["bare".to_string()], &cache, 3000);
        assert_eq!(
            text,
            "[1] Title: A Bare Paper\nAuthors: N/A\nYear: N/A\nVenue: N/A\nURL: N/A\nAbstract: N/A"
        );
    }

    #[test]
    fn empty_selection_falls_back_to_page() {
        let cache = cache_of(&[paper("P3", Some(1), Some(2022)), paper("P4", Some(99), None)]);
        let ctx = ContextAssembler::new(3000).assemble(&HashSet::new(), &["P3".to_string()], &cache);
        assert!(ctx.text.starts_with("[1] Title: Title P3"));
        assert!(!ctx.text.contains("[2]"));
        assert!(!ctx.text.contains("P4"));
        assert!(!ctx.metadata.from_selection);
    }

    #[test]
    fn uncached_selected_ids_are_skipped() {
        let cache = cache_of(&[paper("known", Some(1), None)]);
        let ctx = ContextAssembler::new(3000).assemble(
            &selection_of(&["known", "missing"]),
            &[],
            &cache,
        );
        assert_eq!(ctx.metadata.candidates, 1);
        assert_eq!(ctx.metadata.cited_ids, vec!["known"]);
    }

    #[test]
    fn never_exceeds_budget_and_stops_at_first_overflow() {
        let mut long = paper("long", Some(100), None);
        long.abstract_text = Some("word ".repeat(200));
        let short = paper("short", Some(1), None);
        let cache = cache_of(&[long, short]);

        // The long paper ranks first and does not fit; the short one is not
        // tried after it.
        let ctx = ContextAssembler::new(100).assemble(
            &selection_of(&["long", "short"]),
            &[],
            &cache,
        );
        assert!(ctx.is_empty());
        assert_eq!(ctx.metadata.included, 0);

        for budget in [0, 10, 25, 40, 60, 500] {
            let ctx = ContextAssembler::new(budget).assemble(
                &selection_of(&["long", "short"]),
                &[],
                &cache,
            );
            assert!(ctx.text.split_whitespace().count() <= budget);
            assert_eq!(ctx.metadata.word_count, ctx.text.split_whitespace().count());
        }
    }

    #[test]
    fn zero_budget_yields_empty() {
        let cache = cache_of(&[paper("p", Some(1), None)]);
        assert!(build_context(&selection_of(&["p"]), &[], &cache, 0).is_empty());
    }

    #[test]
    fn output_has_no_trailing_whitespace() {
        let cache = cache_of(&[paper("p", Some(1), None), paper("q", Some(2), None)]);
        let text = build_context(&selection_of(&["p", "q"]), &[], &cache, 3000);
        assert_eq!(text, text.trim_end());
        assert!(text.contains("\n\n[2]"));
    }

    #[test]
    fn deterministic_assembly() {
        let cache = cache_of(&[
            paper("a", Some(1), Some(2000)),
            paper("b", Some(1), Some(2000)),
            paper("c", Some(1), Some(2000)),
        ]);
        let sel = selection_of(&["c", "a", "b"]);
        let first = build_context(&sel, &[], &cache, 3000);
        for _ in 0..10 {
            assert_eq!(build_context(&sel, &[], &cache, 3000), first);
        }
    }

    #[test]
    fn duplicate_page_ids_are_cited_once() {
        let cache = cache_of(&[paper("dup", Some(1), None)]);
        let page = vec!["dup".to_string(), "dup".to_string()];
        let ctx = ContextAssembler::new(3000).assemble(&HashSet::new(), &page, &cache);
        assert_eq!(ctx.metadata.included, 1);
    }
}
