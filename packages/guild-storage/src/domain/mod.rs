//! Domain layer for the account store
//!
//! # Core Principles
//!
//! 1. **Wholesale replace**: an account and its child collections (balances,
//!    profile metadata, relationship edges) are replaced in one transaction
//! 2. **Derived state is separate**: delegation flags, received votes,
//!    portfolio value and reputation scores are written by later passes and
//!    survive an account replace until explicitly reset
//!
//! # Port Trait
//!
//! - `AccountRepository`: storage abstraction used by the resync passes
//!
//! # Examples
//!
//! ```rust,ignore
//! use guild_storage::{AccountRepository, InMemoryAccountStore};
//!
//! async fn example(store: impl AccountRepository) -> Result<()> {
//!     store.replace_account(&record).await?;
//!
//!     store.reset_delegation_state().await?;
//!     let rows = store.delegation_rows(&governance_asset).await?;
//!     let outcome = DelegationResolver::new(&rows).resolve();
//!     for (account, votes) in &outcome.received_votes {
//!         store.set_received_votes(account, *votes).await?;
//!     }
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use guild_core::{
    AccountRecord, AssetKey, AssociationTag, DelegationNode, MetadataEntry, RaterInfo,
    RatingEdge, RelationshipEdge, ReputationScore,
};

use crate::Result;

/// Profile field shown as a rater's display name
pub const DISPLAY_NAME_KEY: &str = "Name";

// ═══════════════════════════════════════════════════════════════════════════
// Domain Models
// ═══════════════════════════════════════════════════════════════════════════

/// Derived delegation fields of one account
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegationState {
    pub delegation_error: bool,
    pub in_cycle: bool,
    /// Cycle members in delegation order, when `in_cycle`
    pub cycle_path: Option<Vec<String>>,
    pub received_votes: i64,
}

/// Account as persisted, parsed facts plus derived state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredAccount {
    pub record: AccountRecord,
    pub delegation: DelegationState,
    pub portfolio_value: f64,
    pub updated_at: DateTime<Utc>,
}

impl StoredAccount {
    pub fn new(record: AccountRecord) -> Self {
        Self {
            record,
            delegation: DelegationState::default(),
            portfolio_value: 0.0,
            updated_at: Utc::now(),
        }
    }

    pub fn display_name(&self) -> Option<String> {
        display_name(&self.record.metadata)
    }
}

/// Storage statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageStats {
    pub accounts: usize,
    pub balances: usize,
    pub metadata_entries: usize,
    pub relationships: usize,
    pub association_tags: usize,
    pub reputation_scores: usize,
}

// ═══════════════════════════════════════════════════════════════════════════
// Port
// ═══════════════════════════════════════════════════════════════════════════

/// Account Repository Port
///
/// All storage backends must implement this trait. Setters on an account
/// that was never stored fail with `ErrorKind::AccountNotFound`.
#[async_trait]
pub trait AccountRepository: Send + Sync {
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // Accounts
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// Replace an account and all of its child collections atomically
    async fn replace_account(&self, record: &AccountRecord) -> Result<()>;

    /// Read one account back
    async fn get_account(&self, account_id: &str) -> Result<Option<StoredAccount>>;

    /// All stored account ids, sorted
    async fn account_ids(&self) -> Result<Vec<String>>;

    /// Distinct (code, issuer) pairs held by any account, sorted
    async fn distinct_assets(&self) -> Result<Vec<AssetKey>>;

    /// Portfolio valuation happens elsewhere; the store only keeps the number
    async fn set_portfolio_value(&self, account_id: &str, value: f64) -> Result<()>;

    /// Delete every account not in `keep`, with its child rows and score.
    /// Returns the removed ids, sorted.
    async fn prune_accounts(&self, keep: &[String]) -> Result<Vec<String>>;

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // Association tags
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// Replace the whole association tag set
    async fn replace_association_tags(&self, tags: &[AssociationTag]) -> Result<()>;

    async fn association_tags(&self) -> Result<Vec<AssociationTag>>;

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // Delegation
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// Clear error/cycle flags, paths and received votes on every account
    async fn reset_delegation_state(&self) -> Result<()>;

    /// Snapshot of every account's delegation pointers and its balance of
    /// `governance_asset`
    async fn delegation_rows(&self, governance_asset: &AssetKey) -> Result<Vec<DelegationNode>>;

    async fn set_delegation_error(&self, account_id: &str) -> Result<()>;

    async fn set_delegation_cycle(&self, account_id: &str, path: &[String]) -> Result<()>;

    async fn set_received_votes(&self, account_id: &str, votes: i64) -> Result<()>;

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // Reputation
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// Every rating edge (relationship edges tagged A/B/C/D)
    async fn rating_edges(&self) -> Result<Vec<RatingEdge>>;

    /// Rater info for every stored account, keyed by account id
    async fn rater_infos(&self) -> Result<HashMap<String, RaterInfo>>;

    async fn save_reputation_score(&self, score: &ReputationScore) -> Result<()>;

    async fn get_reputation_score(&self, account_id: &str) -> Result<Option<ReputationScore>>;

    async fn clear_reputation_scores(&self) -> Result<()>;

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // Stats
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    async fn get_stats(&self) -> Result<StorageStats>;
}

// ═══════════════════════════════════════════════════════════════════════════
// Shared derivations
// ═══════════════════════════════════════════════════════════════════════════

/// `Name` profile field at its lowest index
pub fn display_name(metadata: &[MetadataEntry]) -> Option<String> {
    metadata
        .iter()
        .filter(|entry| entry.base_key == DISPLAY_NAME_KEY)
        .min_by(|a, b| (a.index.len(), &a.index).cmp(&(b.index.len(), &b.index)))
        .map(|entry| entry.value.clone())
}

/// Confirmed connections per account
///
/// A connection is confirmed when both sides declare a non-rating
/// relationship to each other (tags may differ). Each counterpart counts
/// once, however many slots link the pair.
pub fn confirmed_connection_counts<'a>(
    edges: impl IntoIterator<Item = &'a RelationshipEdge>,
) -> HashMap<String, u32> {
    let declared: HashSet<(&str, &str)> = edges
        .into_iter()
        .filter(|edge| edge.relation.rating().is_none() && edge.source != edge.target)
        .map(|edge| (edge.source.as_str(), edge.target.as_str()))
        .collect();

    let mut counts: HashMap<String, u32> = HashMap::new();
    for &(source, target) in &declared {
        if declared.contains(&(target, source)) {
            *counts.entry(source.to_string()).or_default() += 1;
        }
    }
    counts
}
