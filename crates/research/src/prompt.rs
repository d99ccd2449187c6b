//! Prompt templates for generated sections.
//!
//! Prompts are pure functions of (section, topic, context) so a repeated
//! request sends byte-identical text.

use crate::orchestrator::SectionKind;

/// System instruction sent with every section generation.
pub const GENERATION_SYSTEM_INSTRUCTION: &str = "You are an expert academic writer. \
Write in a formal scholarly register, ground every claim in the numbered papers \
you are given, and never invent sources, authors or results.";

const CITATION_RULES: &str = "\
Citation rules:
- Cite papers inline with their bracketed number, e.g. [1] or [2, 5].
- Cite only the numbered papers listed above.
- Finish with a \"References\" section listing every number you cited, in \
numeric order, as: [n] Authors (Year). Title. Venue. URL";

/// Build the user prompt for a section.
pub fn build_prompt(section: SectionKind, topic: &str, context: &str) -> String {
    let task = match section {
        SectionKind::Introduction => format!(
            "Write the Introduction section of a research paper on \"{topic}\".\n\
             Motivate the problem, summarize the state of the art using the papers below, \
             identify the open gap, and close with the contributions a paper on this topic \
             would make. Aim for four to six paragraphs."
        ),
        SectionKind::RelatedWorks => format!(
            "Write the Related Work section of a research paper on \"{topic}\".\n\
             Group the papers below into thematic lines of work, compare their approaches \
             and findings, and point out the limitations that remain. Do not summarize \
             papers one by one; synthesize across them."
        ),
    };

    format!("{task}\n\nPapers:\n\n{context}\n\n{CITATION_RULES}")
}
