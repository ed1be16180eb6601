//! Shared fixtures for orchestration integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Once;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use guild_core::{
    AccountRecord, Amount, AssetKey, AssociationTag, Balance, DelegationNode, RaterInfo,
    RatingEdge, ReputationScore,
};
use guild_orchestration::{AccountDetail, LedgerClient, LedgerError, DEFAULT_ASSOCIATION_ACCOUNT};
use guild_storage::{
    AccountRepository, InMemoryAccountStore, StorageError, StorageStats, StoredAccount,
};

pub fn id(name: &str) -> String {
    format!("G{:A>55}", name)
}

pub fn governance() -> AssetKey {
    AssetKey::new("MTLAP", DEFAULT_ASSOCIATION_ACCOUNT)
}

pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::registry()
            .with(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| EnvFilter::new("guild_orchestration=debug")),
            )
            .with(tracing_subscriber::fmt::layer().with_test_writer())
            .try_init();
    });
}

/// Scriptable ledger: fixed account set, optional latency and failures
#[derive(Default)]
pub struct FakeLedger {
    accounts: BTreeMap<String, AccountDetail>,
    failing: HashSet<String>,
    delay: Option<Duration>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    fetched: Mutex<Vec<String>>,
}

impl FakeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an account holding `tokens` governance tokens with plain-text data
    pub fn with_account(mut self, account_id: &str, tokens: i64, data: &[(&str, &str)]) -> Self {
        let mut detail = AccountDetail::new(account_id);
        detail.balances = vec![
            Balance::new(AssetKey::native(), Amount::from_whole(5)),
            Balance::new(governance(), Amount::from_whole(tokens)),
        ];
        detail.data = data
            .iter()
            .map(|(k, v)| (k.to_string(), STANDARD.encode(v)))
            .collect();
        self.accounts.insert(account_id.to_string(), detail);
        self
    }

    /// Drop an account, as if it sold its governance tokens and left
    pub fn without_account(mut self, account_id: &str) -> Self {
        self.accounts.remove(account_id);
        self
    }

    pub fn with_failure(mut self, account_id: &str) -> Self {
        self.failing.insert(account_id.to_string());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Highest number of fetches observed running at once
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn fetched(&self) -> Vec<String> {
        let mut ids = self.fetched.lock().clone();
        ids.sort();
        ids
    }
}

#[async_trait]
impl LedgerClient for FakeLedger {
    async fn list_holders_page(
        &self,
        asset: &AssetKey,
        cursor: Option<&str>,
        limit: usize,
    ) -> Result<Vec<String>, LedgerError> {
        Ok(self
            .accounts
            .values()
            .filter(|detail| detail.balances.iter().any(|b| &b.asset == asset))
            .map(|detail| detail.account_id.clone())
            .filter(|account_id| cursor.map_or(true, |c| account_id.as_str() > c))
            .take(limit)
            .collect())
    }

    async fn fetch_account(
        &self,
        account_id: &str,
        cancel: &CancellationToken,
    ) -> Result<AccountDetail, LedgerError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        self.fetched.lock().push(account_id.to_string());

        let result = async {
            if let Some(delay) = self.delay {
                tokio::select! {
                    _ = cancel.cancelled() => return Err(LedgerError::Cancelled),
                    _ = tokio::time::sleep(delay) => {}
                }
            }
            if self.failing.contains(account_id) {
                return Err(LedgerError::Transport(format!("connection reset: {}", account_id)));
            }
            self.accounts
                .get(account_id)
                .cloned()
                .ok_or_else(|| LedgerError::NotFound(account_id.to_string()))
        }
        .await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

/// In-memory store whose account writes fail for chosen ids
#[derive(Default)]
pub struct FailingStore {
    inner: InMemoryAccountStore,
    failing: HashSet<String>,
}

impl FailingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_write_failure(mut self, account_id: &str) -> Self {
        self.failing.insert(account_id.to_string());
        self
    }
}

#[async_trait]
impl AccountRepository for FailingStore {
    async fn replace_account(&self, record: &AccountRecord) -> guild_storage::Result<()> {
        if self.failing.contains(&record.account_id) {
            return Err(StorageError::database(format!(
                "disk full writing {}",
                record.account_id
            )));
        }
        self.inner.replace_account(record).await
    }

    async fn get_account(&self, account_id: &str) -> guild_storage::Result<Option<StoredAccount>> {
        self.inner.get_account(account_id).await
    }

    async fn account_ids(&self) -> guild_storage::Result<Vec<String>> {
        self.inner.account_ids().await
    }

    async fn distinct_assets(&self) -> guild_storage::Result<Vec<AssetKey>> {
        self.inner.distinct_assets().await
    }

    async fn set_portfolio_value(&self, account_id: &str, value: f64) -> guild_storage::Result<()> {
        self.inner.set_portfolio_value(account_id, value).await
    }

    async fn prune_accounts(&self, keep: &[String]) -> guild_storage::Result<Vec<String>> {
        self.inner.prune_accounts(keep).await
    }

    async fn replace_association_tags(&self, tags: &[AssociationTag]) -> guild_storage::Result<()> {
        self.inner.replace_association_tags(tags).await
    }

    async fn association_tags(&self) -> guild_storage::Result<Vec<AssociationTag>> {
        self.inner.association_tags().await
    }

    async fn reset_delegation_state(&self) -> guild_storage::Result<()> {
        self.inner.reset_delegation_state().await
    }

    async fn delegation_rows(
        &self,
        governance_asset: &AssetKey,
    ) -> guild_storage::Result<Vec<DelegationNode>> {
        self.inner.delegation_rows(governance_asset).await
    }

    async fn set_delegation_error(&self, account_id: &str) -> guild_storage::Result<()> {
        self.inner.set_delegation_error(account_id).await
    }

    async fn set_delegation_cycle(
        &self,
        account_id: &str,
        path: &[String],
    ) -> guild_storage::Result<()> {
        self.inner.set_delegation_cycle(account_id, path).await
    }

    async fn set_received_votes(&self, account_id: &str, votes: i64) -> guild_storage::Result<()> {
        self.inner.set_received_votes(account_id, votes).await
    }

    async fn rating_edges(&self) -> guild_storage::Result<Vec<RatingEdge>> {
        self.inner.rating_edges().await
    }

    async fn rater_infos(&self) -> guild_storage::Result<HashMap<String, RaterInfo>> {
        self.inner.rater_infos().await
    }

    async fn save_reputation_score(&self, score: &ReputationScore) -> guild_storage::Result<()> {
        self.inner.save_reputation_score(score).await
    }

    async fn get_reputation_score(
        &self,
        account_id: &str,
    ) -> guild_storage::Result<Option<ReputationScore>> {
        self.inner.get_reputation_score(account_id).await
    }

    async fn clear_reputation_scores(&self) -> guild_storage::Result<()> {
        self.inner.clear_reputation_scores().await
    }

    async fn get_stats(&self) -> guild_storage::Result<StorageStats> {
        self.inner.get_stats().await
    }
}
