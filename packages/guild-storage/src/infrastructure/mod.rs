//! Infrastructure layer - Storage adapters
//!
//! - `sqlite`: file-backed, the production adapter
//! - `memory`: DashMap-backed, for tests and embedding

pub mod memory;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use memory::InMemoryAccountStore;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteAccountStore;
