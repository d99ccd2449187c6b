//! LLM Provider implementations for Citeweave.
//!
//! All providers implement the `citeweave_core::Provider` trait.
//! The router hands out the client for a given provider kind.

pub mod gemini;
pub mod openai_compat;
pub mod router;

pub use gemini::GeminiProvider;
pub use openai_compat::OpenAiCompatProvider;
pub use router::ProviderRouter;
