//! # Citeweave Research
//!
//! The research workspace: everything between the user's clicks and the
//! remote APIs.
//!
//! - [`PaperStore`]: search results, the paper cache and the selection
//! - [`ContextAssembler`]: the budgeted, citation-numbered context block
//! - [`ProviderSession`]: per-provider conversational state
//! - [`GenerationOrchestrator`]: validation, prompt building and dispatch
//!   for the generated sections
//! - [`Workspace`]: owns all of the above plus settings and persistence

pub mod context;
pub mod orchestrator;
pub mod prompt;
pub mod session;
pub mod settings;
pub mod store;
pub mod workspace;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use context::{AssembledContext, ContextAssembler, ContextMetadata, build_context};
pub use orchestrator::{
    GeneratedSection, GenerationInput, GenerationOrchestrator, ProviderTarget, SectionKind,
    SectionStatus,
};
pub use session::{ProviderSession, SessionHandle};
pub use settings::{Settings, SettingsUpdate, SettingsView};
pub use store::{PageCursor, PaperStore};
pub use workspace::{ChatExchange, PaperListing, Workspace};
