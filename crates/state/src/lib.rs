//! State backends for Citeweave.
//!
//! - `file`: a single JSON document on disk, rewritten on every mutation
//! - `in_memory`: ephemeral storage for tests and one-off runs

pub mod file;
pub mod in_memory;

pub use file::FileStateStore;
pub use in_memory::InMemoryStateStore;
