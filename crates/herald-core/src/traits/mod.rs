//! Core traits for herald collaborators and providers.

mod directory;
mod llm;
mod store;

pub use directory::*;
pub use llm::*;
pub use store::*;
