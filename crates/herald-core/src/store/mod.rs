//! Storage backends.
//!
//! [`InMemoryStore`] and [`InMemoryDirectory`] serve tests and single-process
//! deployments; [`SqliteStore`] persists cache entries, counters, feedback and
//! profiles on disk. [`PurgeScheduler`] reclaims expired key-value entries.

mod memory;
mod purge;
mod sqlite;

pub use memory::{InMemoryDirectory, InMemoryStore};
pub use purge::{PurgeScheduler, DEFAULT_PURGE_INTERVAL_SECS};
pub use sqlite::SqliteStore;
