//! Ledger client port
//!
//! The network client itself lives outside this workspace. The orchestrator
//! only needs two calls: a paginated holder listing for one asset and a
//! single-account fetch that honours a cancellation token.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use guild_core::{parse_association_tags, parse_metadata, AccountRecord, AssetKey, AssociationTag, Balance};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LedgerError {
    #[error("Account not found on ledger: {0}")]
    NotFound(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Rate limited")]
    RateLimited,

    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("Request cancelled")]
    Cancelled,
}

impl LedgerError {
    pub fn is_transient(&self) -> bool {
        matches!(self, LedgerError::Transport(_) | LedgerError::RateLimited)
    }
}

/// Raw ledger state of one account
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccountDetail {
    pub account_id: String,
    pub balances: Vec<Balance>,
    /// Data entries as served by the ledger: key → base64 value
    pub data: BTreeMap<String, String>,
}

impl AccountDetail {
    pub fn new(account_id: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
            ..Default::default()
        }
    }

    /// Decode the data entries and assemble the persisted record
    pub fn to_record(&self) -> AccountRecord {
        AccountRecord::from_parsed(
            self.account_id.clone(),
            self.balances.clone(),
            parse_metadata(&self.data),
        )
    }

    /// Association tags, meaningful for the association account only
    pub fn association_tags(&self) -> Vec<AssociationTag> {
        parse_association_tags(&self.data)
    }
}

#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// One page of holders of `asset`, ascending by account id.
    ///
    /// `cursor` is the last id of the previous page (`None` for the first).
    async fn list_holders_page(
        &self,
        asset: &AssetKey,
        cursor: Option<&str>,
        limit: usize,
    ) -> Result<Vec<String>, LedgerError>;

    /// Current state of one account
    async fn fetch_account(
        &self,
        account_id: &str,
        cancel: &CancellationToken,
    ) -> Result<AccountDetail, LedgerError>;
}

/// Every holder of `asset`, following pages until one comes back short
pub async fn collect_holders(
    client: &dyn LedgerClient,
    asset: &AssetKey,
    page_size: usize,
) -> Result<Vec<String>, LedgerError> {
    let page_size = page_size.max(1);
    let mut holders = Vec::new();
    let mut cursor: Option<String> = None;

    loop {
        let page = client
            .list_holders_page(asset, cursor.as_deref(), page_size)
            .await?;
        let page_len = page.len();
        debug!(asset = %asset, page_len, total = holders.len() + page_len, "holder page");

        cursor = page.last().cloned();
        holders.extend(page);

        if page_len < page_size || cursor.is_none() {
            break;
        }
    }

    Ok(holders)
}
