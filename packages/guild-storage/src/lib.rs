//! Account store for the guild resync
//!
//! ## Core Principles
//!
//! 1. **Per-account replace**: account summary, balances, profile metadata and
//!    relationship edges are replaced together in one transaction
//! 2. **Derived state is written later**: delegation flags, received votes
//!    and reputation scores are filled in by the resync passes
//! 3. **Port/adapter**: callers depend on `AccountRepository` only
//!
//! ## Usage
//!
//! ```rust,ignore
//! use guild_storage::{AccountRepository, SqliteAccountStore};
//!
//! let store = SqliteAccountStore::new("guild.db")?;
//! store.replace_account(&record).await?;
//!
//! let edges = store.rating_edges().await?;
//! let infos = store.rater_infos().await?;
//! ```

pub mod domain;
pub mod error;
pub mod infrastructure;

pub use error::{ErrorKind, Result, StorageError};

pub use domain::{
    confirmed_connection_counts, display_name, AccountRepository, DelegationState, StorageStats,
    StoredAccount, DISPLAY_NAME_KEY,
};

pub use infrastructure::InMemoryAccountStore;

#[cfg(feature = "sqlite")]
pub use infrastructure::SqliteAccountStore;
