//! In-memory account store
//!
//! DashMap-backed implementation for tests and embedding. Same semantics as
//! the SQLite adapter, nothing survives the process.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use guild_core::{
    AccountRecord, AssetKey, AssociationTag, DelegationNode, RaterInfo, RatingEdge,
    RelationshipEdge, ReputationScore,
};

use crate::domain::{
    confirmed_connection_counts, AccountRepository, DelegationState, StorageStats, StoredAccount,
};
use crate::error::{Result, StorageError};

#[derive(Clone, Default)]
pub struct InMemoryAccountStore {
    accounts: Arc<DashMap<String, StoredAccount>>,
    association_tags: Arc<RwLock<Vec<AssociationTag>>>,
    scores: Arc<DashMap<String, ReputationScore>>,
}

impl InMemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_account<F>(&self, account_id: &str, update: F) -> Result<()>
    where
        F: FnOnce(&mut StoredAccount),
    {
        let mut entry = self
            .accounts
            .get_mut(account_id)
            .ok_or_else(|| StorageError::account_not_found(account_id))?;
        update(entry.value_mut());
        Ok(())
    }
}

#[async_trait]
impl AccountRepository for InMemoryAccountStore {
    async fn replace_account(&self, record: &AccountRecord) -> Result<()> {
        let mut record = record.clone();
        record.relationships.sort();

        self.accounts
            .entry(record.account_id.clone())
            .and_modify(|stored| {
                stored.record = record.clone();
                stored.updated_at = Utc::now();
            })
            .or_insert_with(|| StoredAccount::new(record.clone()));
        Ok(())
    }

    async fn get_account(&self, account_id: &str) -> Result<Option<StoredAccount>> {
        Ok(self.accounts.get(account_id).map(|entry| entry.value().clone()))
    }

    async fn account_ids(&self) -> Result<Vec<String>> {
        let mut ids: Vec<String> = self.accounts.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        Ok(ids)
    }

    async fn distinct_assets(&self) -> Result<Vec<AssetKey>> {
        let assets: BTreeSet<AssetKey> = self
            .accounts
            .iter()
            .flat_map(|entry| {
                entry
                    .value()
                    .record
                    .balances
                    .iter()
                    .map(|b| b.asset.clone())
                    .collect::<Vec<_>>()
            })
            .collect();
        Ok(assets.into_iter().collect())
    }

    async fn set_portfolio_value(&self, account_id: &str, value: f64) -> Result<()> {
        self.with_account(account_id, |stored| stored.portfolio_value = value)
    }

    async fn prune_accounts(&self, keep: &[String]) -> Result<Vec<String>> {
        let keep: HashSet<&str> = keep.iter().map(String::as_str).collect();
        let mut removed: Vec<String> = self
            .accounts
            .iter()
            .filter(|entry| !keep.contains(entry.key().as_str()))
            .map(|entry| entry.key().clone())
            .collect();
        removed.sort();

        for account_id in &removed {
            self.accounts.remove(account_id);
            self.scores.remove(account_id);
        }
        Ok(removed)
    }

    async fn replace_association_tags(&self, tags: &[AssociationTag]) -> Result<()> {
        let mut sorted = tags.to_vec();
        sorted.sort();
        sorted.dedup_by(|a, b| a.tag == b.tag && a.index == b.index);
        *self.association_tags.write() = sorted;
        Ok(())
    }

    async fn association_tags(&self) -> Result<Vec<AssociationTag>> {
        Ok(self.association_tags.read().clone())
    }

    async fn reset_delegation_state(&self) -> Result<()> {
        for mut entry in self.accounts.iter_mut() {
            entry.value_mut().delegation = DelegationState::default();
        }
        Ok(())
    }

    async fn delegation_rows(&self, governance_asset: &AssetKey) -> Result<Vec<DelegationNode>> {
        let mut rows: Vec<DelegationNode> = self
            .accounts
            .iter()
            .map(|entry| {
                let record = &entry.value().record;
                DelegationNode {
                    account_id: record.account_id.clone(),
                    delegate_to: record.delegate_to.clone(),
                    council_delegate_to: record.council_delegate_to.clone(),
                    council_ready: record.council_ready,
                    governance_balance: record.balance_of(governance_asset),
                }
            })
            .collect();
        rows.sort_by(|a, b| a.account_id.cmp(&b.account_id));
        Ok(rows)
    }

    async fn set_delegation_error(&self, account_id: &str) -> Result<()> {
        self.with_account(account_id, |stored| stored.delegation.delegation_error = true)
    }

    async fn set_delegation_cycle(&self, account_id: &str, path: &[String]) -> Result<()> {
        self.with_account(account_id, |stored| {
            stored.delegation.in_cycle = true;
            stored.delegation.cycle_path = Some(path.to_vec());
        })
    }

    async fn set_received_votes(&self, account_id: &str, votes: i64) -> Result<()> {
        self.with_account(account_id, |stored| stored.delegation.received_votes = votes)
    }

    async fn rating_edges(&self) -> Result<Vec<RatingEdge>> {
        let mut edges: Vec<RatingEdge> = self
            .accounts
            .iter()
            .flat_map(|entry| entry.value().record.rating_edges())
            .collect();
        edges.sort();
        Ok(edges)
    }

    async fn rater_infos(&self) -> Result<HashMap<String, RaterInfo>> {
        let mut infos = HashMap::new();
        let mut edges: Vec<RelationshipEdge> = Vec::new();

        for entry in self.accounts.iter() {
            let stored = entry.value();
            edges.extend(stored.record.relationships.iter().cloned());

            let mut info = RaterInfo::new(stored.record.account_id.clone());
            info.display_name = stored.display_name();
            info.portfolio_value = stored.portfolio_value;
            info.own_score = self
                .scores
                .get(&stored.record.account_id)
                .map(|score| score.weighted_score);
            infos.insert(stored.record.account_id.clone(), info);
        }

        for (account_id, count) in confirmed_connection_counts(&edges) {
            if let Some(info) = infos.get_mut(&account_id) {
                info.connection_count = count;
            }
        }
        Ok(infos)
    }

    async fn save_reputation_score(&self, score: &ReputationScore) -> Result<()> {
        self.scores.insert(score.account_id.clone(), score.clone());
        Ok(())
    }

    async fn get_reputation_score(&self, account_id: &str) -> Result<Option<ReputationScore>> {
        Ok(self.scores.get(account_id).map(|entry| entry.value().clone()))
    }

    async fn clear_reputation_scores(&self) -> Result<()> {
        self.scores.clear();
        Ok(())
    }

    async fn get_stats(&self) -> Result<StorageStats> {
        let mut stats = StorageStats {
            accounts: self.accounts.len(),
            association_tags: self.association_tags.read().len(),
            reputation_scores: self.scores.len(),
            ..Default::default()
        };
        for entry in self.accounts.iter() {
            let record = &entry.value().record;
            stats.balances += record.balances.len();
            stats.metadata_entries += record.metadata.len();
            stats.relationships += record.relationships.len();
        }
        Ok(stats)
    }
}
