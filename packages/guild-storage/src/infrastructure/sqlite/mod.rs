//! SQLite account store
//!
//! File-based persistent storage using SQLite. One connection behind a
//! mutex; every multi-statement write runs in its own transaction.
//!
//! Amounts are stored as integer stroops, cycle paths as JSON arrays.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

use guild_core::{
    AccountRecord, Amount, AssetKey, AssociationTag, AssociationTagKind, Balance,
    DelegationNode, Grade, MetadataEntry, RaterInfo, Rating, RatingEdge, RelationType,
    RelationshipEdge, ReputationScore,
};

use crate::domain::{
    confirmed_connection_counts, display_name, AccountRepository, DelegationState, StorageStats,
    StoredAccount, DISPLAY_NAME_KEY,
};
use crate::error::{Result, StorageError};

const RATING_TAGS: &str = "('A', 'B', 'C', 'D')";

/// SQLite-based AccountRepository implementation
#[derive(Clone)]
pub struct SqliteAccountStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteAccountStore {
    /// Open (or create) a store at the given path
    pub fn new(db_path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(db_path)?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory SQLite store (for testing)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Initialize database schema
    fn init_schema(&self) -> Result<()> {
        let conn = self.conn.lock();

        conn.execute(
            "CREATE TABLE IF NOT EXISTS accounts (
                account_id TEXT PRIMARY KEY,
                delegate_to TEXT,
                council_delegate_to TEXT,
                council_ready INTEGER NOT NULL DEFAULT 0,
                delegation_error INTEGER NOT NULL DEFAULT 0,
                in_cycle INTEGER NOT NULL DEFAULT 0,
                cycle_path TEXT,
                received_votes INTEGER NOT NULL DEFAULT 0,
                portfolio_value REAL NOT NULL DEFAULT 0,
                updated_at TEXT NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS balances (
                account_id TEXT NOT NULL,
                asset_code TEXT NOT NULL,
                asset_issuer TEXT NOT NULL,
                amount INTEGER NOT NULL,
                PRIMARY KEY (account_id, asset_code, asset_issuer),
                FOREIGN KEY (account_id) REFERENCES accounts(account_id)
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_balances_asset
             ON balances(asset_code, asset_issuer)",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS account_metadata (
                account_id TEXT NOT NULL,
                base_key TEXT NOT NULL,
                idx TEXT NOT NULL,
                value TEXT NOT NULL,
                PRIMARY KEY (account_id, base_key, idx),
                FOREIGN KEY (account_id) REFERENCES accounts(account_id)
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS relationships (
                source TEXT NOT NULL,
                target TEXT NOT NULL,
                relation TEXT NOT NULL,
                idx TEXT NOT NULL,
                PRIMARY KEY (source, relation, idx),
                FOREIGN KEY (source) REFERENCES accounts(account_id)
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_relationships_target
             ON relationships(target, relation)",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS association_tags (
                tag TEXT NOT NULL,
                idx TEXT NOT NULL,
                target TEXT NOT NULL,
                PRIMARY KEY (tag, idx)
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS reputation_scores (
                account_id TEXT PRIMARY KEY,
                weighted_score REAL NOT NULL,
                base_score REAL NOT NULL,
                a_count INTEGER NOT NULL,
                b_count INTEGER NOT NULL,
                c_count INTEGER NOT NULL,
                d_count INTEGER NOT NULL,
                total_ratings INTEGER NOT NULL,
                total_weight REAL NOT NULL,
                computed_at TEXT NOT NULL,
                grade TEXT NOT NULL
            )",
            [],
        )?;

        Ok(())
    }

    /// Run an `UPDATE accounts ...` that must touch exactly the given account
    fn update_account(
        &self,
        account_id: &str,
        sql: &str,
        params: &[&dyn rusqlite::ToSql],
    ) -> Result<()> {
        let conn = self.conn.lock();
        let changed = conn.execute(sql, params)?;
        if changed == 0 {
            return Err(StorageError::account_not_found(account_id));
        }
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Row decoding
// ═══════════════════════════════════════════════════════════════════════════

/// Open a write transaction; failure to begin is a transaction error
fn begin(conn: &Connection) -> Result<Transaction<'_>> {
    conn.unchecked_transaction().map_err(|e| {
        StorageError::transaction(format!("Failed to begin transaction: {}", e)).with_source(e)
    })
}

fn commit(tx: Transaction<'_>) -> Result<()> {
    tx.commit().map_err(|e| {
        StorageError::transaction(format!("Failed to commit transaction: {}", e)).with_source(e)
    })
}

fn relation_from_db(value: &str) -> Result<RelationType> {
    RelationType::from_str(value)
        .ok_or_else(|| StorageError::corrupt(format!("Unknown relation tag in store: {}", value)))
}

fn load_account(conn: &Connection, account_id: &str) -> Result<Option<StoredAccount>> {
    let row = conn
        .query_row(
            "SELECT account_id, delegate_to, council_delegate_to, council_ready,
                    delegation_error, in_cycle, cycle_path, received_votes,
                    portfolio_value, updated_at
             FROM accounts WHERE account_id = ?1",
            params![account_id],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, Option<String>>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, bool>(3)?,
                    row.get::<_, bool>(4)?,
                    row.get::<_, bool>(5)?,
                    row.get::<_, Option<String>>(6)?,
                    row.get::<_, i64>(7)?,
                    row.get::<_, f64>(8)?,
                    row.get::<_, DateTime<Utc>>(9)?,
                ))
            },
        )
        .optional()?;

    let Some((
        id,
        delegate_to,
        council_delegate_to,
        council_ready,
        delegation_error,
        in_cycle,
        cycle_path,
        received_votes,
        portfolio_value,
        updated_at,
    )) = row
    else {
        return Ok(None);
    };

    let mut record = AccountRecord::empty(id);
    record.delegate_to = delegate_to;
    record.council_delegate_to = council_delegate_to;
    record.council_ready = council_ready;

    let mut stmt = conn.prepare(
        "SELECT asset_code, asset_issuer, amount FROM balances
         WHERE account_id = ?1 ORDER BY asset_code, asset_issuer",
    )?;
    record.balances = stmt
        .query_map(params![account_id], |row| {
            Ok(Balance::new(
                AssetKey::new(row.get::<_, String>(0)?, row.get::<_, String>(1)?),
                Amount::from_units(row.get(2)?),
            ))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let mut stmt = conn.prepare(
        "SELECT base_key, idx, value FROM account_metadata
         WHERE account_id = ?1 ORDER BY base_key, idx",
    )?;
    record.metadata = stmt
        .query_map(params![account_id], |row| {
            Ok(MetadataEntry::new(
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let mut stmt = conn.prepare(
        "SELECT target, relation, idx FROM relationships
         WHERE source = ?1 ORDER BY relation, idx",
    )?;
    let raw = stmt
        .query_map(params![account_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    record.relationships = raw
        .into_iter()
        .map(|(target, relation, index)| -> Result<RelationshipEdge> {
            Ok(RelationshipEdge {
                source: account_id.to_string(),
                target,
                relation: relation_from_db(&relation)?,
                index,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    record.relationships.sort();

    let cycle_path = match cycle_path {
        Some(json) => Some(serde_json::from_str::<Vec<String>>(&json)?),
        None => None,
    };

    Ok(Some(StoredAccount {
        record,
        delegation: DelegationState {
            delegation_error,
            in_cycle,
            cycle_path,
            received_votes,
        },
        portfolio_value,
        updated_at,
    }))
}

// ═══════════════════════════════════════════════════════════════════════════
// AccountRepository
// ═══════════════════════════════════════════════════════════════════════════

#[async_trait]
impl AccountRepository for SqliteAccountStore {
    async fn replace_account(&self, record: &AccountRecord) -> Result<()> {
        let conn = self.conn.lock();
        let tx = begin(&conn)?;

        tx.execute(
            "INSERT INTO accounts (account_id, delegate_to, council_delegate_to, council_ready, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(account_id) DO UPDATE SET
                delegate_to = excluded.delegate_to,
                council_delegate_to = excluded.council_delegate_to,
                council_ready = excluded.council_ready,
                updated_at = excluded.updated_at",
            params![
                &record.account_id,
                &record.delegate_to,
                &record.council_delegate_to,
                record.council_ready,
                Utc::now(),
            ],
        )?;

        tx.execute(
            "DELETE FROM balances WHERE account_id = ?1",
            params![&record.account_id],
        )?;
        tx.execute(
            "DELETE FROM account_metadata WHERE account_id = ?1",
            params![&record.account_id],
        )?;
        tx.execute(
            "DELETE FROM relationships WHERE source = ?1",
            params![&record.account_id],
        )?;

        for balance in &record.balances {
            tx.execute(
                "INSERT INTO balances (account_id, asset_code, asset_issuer, amount)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(account_id, asset_code, asset_issuer)
                 DO UPDATE SET amount = amount + excluded.amount",
                params![
                    &record.account_id,
                    &balance.asset.code,
                    &balance.asset.issuer,
                    balance.amount.units(),
                ],
            )?;
        }

        for entry in &record.metadata {
            tx.execute(
                "INSERT OR REPLACE INTO account_metadata (account_id, base_key, idx, value)
                 VALUES (?1, ?2, ?3, ?4)",
                params![&record.account_id, &entry.base_key, &entry.index, &entry.value],
            )?;
        }

        for edge in &record.relationships {
            tx.execute(
                "INSERT OR REPLACE INTO relationships (source, target, relation, idx)
                 VALUES (?1, ?2, ?3, ?4)",
                params![&record.account_id, &edge.target, edge.relation.as_str(), &edge.index],
            )?;
        }

        commit(tx)?;
        debug!(
            account = %record.account_id,
            balances = record.balances.len(),
            metadata = record.metadata.len(),
            relationships = record.relationships.len(),
            "account replaced"
        );
        Ok(())
    }

    async fn get_account(&self, account_id: &str) -> Result<Option<StoredAccount>> {
        let conn = self.conn.lock();
        load_account(&conn, account_id)
    }

    async fn account_ids(&self) -> Result<Vec<String>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT account_id FROM accounts ORDER BY account_id")?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(ids)
    }

    async fn distinct_assets(&self) -> Result<Vec<AssetKey>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT DISTINCT asset_code, asset_issuer FROM balances
             ORDER BY asset_code, asset_issuer",
        )?;
        let assets = stmt
            .query_map([], |row| {
                Ok(AssetKey::new(row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(assets)
    }

    async fn set_portfolio_value(&self, account_id: &str, value: f64) -> Result<()> {
        self.update_account(
            account_id,
            "UPDATE accounts SET portfolio_value = ?2 WHERE account_id = ?1",
            params![account_id, value],
        )
    }

    async fn prune_accounts(&self, keep: &[String]) -> Result<Vec<String>> {
        let keep: HashSet<&str> = keep.iter().map(String::as_str).collect();
        let conn = self.conn.lock();

        let mut stmt = conn.prepare("SELECT account_id FROM accounts ORDER BY account_id")?;
        let removed: Vec<String> = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?
            .into_iter()
            .filter(|account_id| !keep.contains(account_id.as_str()))
            .collect();
        drop(stmt);

        if removed.is_empty() {
            return Ok(removed);
        }

        let tx = begin(&conn)?;
        for account_id in &removed {
            tx.execute("DELETE FROM balances WHERE account_id = ?1", params![account_id])?;
            tx.execute(
                "DELETE FROM account_metadata WHERE account_id = ?1",
                params![account_id],
            )?;
            tx.execute("DELETE FROM relationships WHERE source = ?1", params![account_id])?;
            tx.execute(
                "DELETE FROM reputation_scores WHERE account_id = ?1",
                params![account_id],
            )?;
            tx.execute("DELETE FROM accounts WHERE account_id = ?1", params![account_id])?;
        }
        commit(tx)?;

        debug!(removed = removed.len(), "Pruned accounts");
        Ok(removed)
    }

    async fn replace_association_tags(&self, tags: &[AssociationTag]) -> Result<()> {
        let conn = self.conn.lock();
        let tx = begin(&conn)?;

        tx.execute("DELETE FROM association_tags", [])?;
        for tag in tags {
            tx.execute(
                "INSERT OR REPLACE INTO association_tags (tag, idx, target) VALUES (?1, ?2, ?3)",
                params![tag.tag.as_str(), &tag.index, &tag.target],
            )?;
        }

        commit(tx)?;
        Ok(())
    }

    async fn association_tags(&self) -> Result<Vec<AssociationTag>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT tag, idx, target FROM association_tags")?;
        let raw = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut tags = raw
            .into_iter()
            .map(|(tag, index, target)| -> Result<AssociationTag> {
                let tag = AssociationTagKind::from_str(&tag).ok_or_else(|| {
                    StorageError::corrupt(format!("Unknown association tag in store: {}", tag))
                })?;
                Ok(AssociationTag { tag, index, target })
            })
            .collect::<Result<Vec<_>>>()?;
        tags.sort();
        Ok(tags)
    }

    async fn reset_delegation_state(&self) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "UPDATE accounts SET delegation_error = 0, in_cycle = 0,
                    cycle_path = NULL, received_votes = 0",
            [],
        )?;
        Ok(())
    }

    async fn delegation_rows(&self, governance_asset: &AssetKey) -> Result<Vec<DelegationNode>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT a.account_id, a.delegate_to, a.council_delegate_to, a.council_ready,
                    COALESCE((SELECT SUM(b.amount) FROM balances b
                              WHERE b.account_id = a.account_id
                                AND b.asset_code = ?1 AND b.asset_issuer = ?2), 0)
             FROM accounts a ORDER BY a.account_id",
        )?;
        let rows = stmt
            .query_map(params![&governance_asset.code, &governance_asset.issuer], |row| {
                Ok(DelegationNode {
                    account_id: row.get(0)?,
                    delegate_to: row.get(1)?,
                    council_delegate_to: row.get(2)?,
                    council_ready: row.get(3)?,
                    governance_balance: Amount::from_units(row.get(4)?),
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    async fn set_delegation_error(&self, account_id: &str) -> Result<()> {
        self.update_account(
            account_id,
            "UPDATE accounts SET delegation_error = 1 WHERE account_id = ?1",
            params![account_id],
        )
    }

    async fn set_delegation_cycle(&self, account_id: &str, path: &[String]) -> Result<()> {
        let json = serde_json::to_string(path)?;
        self.update_account(
            account_id,
            "UPDATE accounts SET in_cycle = 1, cycle_path = ?2 WHERE account_id = ?1",
            params![account_id, json],
        )
    }

    async fn set_received_votes(&self, account_id: &str, votes: i64) -> Result<()> {
        self.update_account(
            account_id,
            "UPDATE accounts SET received_votes = ?2 WHERE account_id = ?1",
            params![account_id, votes],
        )
    }

    async fn rating_edges(&self) -> Result<Vec<RatingEdge>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT source, target, relation FROM relationships
             WHERE relation IN {} ORDER BY source, target, relation",
            RATING_TAGS
        ))?;
        let raw = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        raw.into_iter()
            .map(|(rater, ratee, rating)| -> Result<RatingEdge> {
                Ok(RatingEdge::new(rater, ratee, Rating::parse(&rating)?))
            })
            .collect()
    }

    async fn rater_infos(&self) -> Result<HashMap<String, RaterInfo>> {
        let conn = self.conn.lock();

        let mut infos: HashMap<String, RaterInfo> = HashMap::new();
        let mut stmt = conn.prepare("SELECT account_id, portfolio_value FROM accounts")?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?)))?;
        for row in rows {
            let (account_id, portfolio_value) = row?;
            let mut info = RaterInfo::new(account_id.clone());
            info.portfolio_value = portfolio_value;
            infos.insert(account_id, info);
        }

        let mut names: HashMap<String, Vec<MetadataEntry>> = HashMap::new();
        let mut stmt = conn.prepare(
            "SELECT account_id, idx, value FROM account_metadata WHERE base_key = ?1",
        )?;
        let rows = stmt.query_map(params![DISPLAY_NAME_KEY], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;
        for row in rows {
            let (account_id, index, value) = row?;
            names
                .entry(account_id)
                .or_default()
                .push(MetadataEntry::new(DISPLAY_NAME_KEY, index, value));
        }
        for (account_id, entries) in names {
            if let Some(info) = infos.get_mut(&account_id) {
                info.display_name = display_name(&entries);
            }
        }

        let mut stmt = conn.prepare(&format!(
            "SELECT source, target, relation, idx FROM relationships WHERE relation NOT IN {}",
            RATING_TAGS
        ))?;
        let raw = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        let edges = raw
            .into_iter()
            .map(|(source, target, relation, index)| -> Result<RelationshipEdge> {
                Ok(RelationshipEdge {
                    source,
                    target,
                    relation: relation_from_db(&relation)?,
                    index,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        for (account_id, count) in confirmed_connection_counts(&edges) {
            if let Some(info) = infos.get_mut(&account_id) {
                info.connection_count = count;
            }
        }

        let mut stmt = conn.prepare("SELECT account_id, weighted_score FROM reputation_scores")?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?)))?;
        for row in rows {
            let (account_id, score) = row?;
            if let Some(info) = infos.get_mut(&account_id) {
                info.own_score = Some(score);
            }
        }

        Ok(infos)
    }

    async fn save_reputation_score(&self, score: &ReputationScore) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT OR REPLACE INTO reputation_scores
                (account_id, weighted_score, base_score, a_count, b_count, c_count, d_count,
                 total_ratings, total_weight, computed_at, grade)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                &score.account_id,
                score.weighted_score,
                score.base_score,
                score.a_count,
                score.b_count,
                score.c_count,
                score.d_count,
                score.total_ratings,
                score.total_weight,
                score.computed_at,
                score.grade.as_str(),
            ],
        )?;
        Ok(())
    }

    async fn get_reputation_score(&self, account_id: &str) -> Result<Option<ReputationScore>> {
        let conn = self.conn.lock();
        let row = conn
            .query_row(
                "SELECT account_id, weighted_score, base_score, a_count, b_count, c_count,
                        d_count, total_ratings, total_weight, computed_at, grade
                 FROM reputation_scores WHERE account_id = ?1",
                params![account_id],
                |row| {
                    Ok((
                        ReputationScore {
                            account_id: row.get(0)?,
                            weighted_score: row.get(1)?,
                            base_score: row.get(2)?,
                            a_count: row.get(3)?,
                            b_count: row.get(4)?,
                            c_count: row.get(5)?,
                            d_count: row.get(6)?,
                            total_ratings: row.get(7)?,
                            total_weight: row.get(8)?,
                            computed_at: row.get(9)?,
                            grade: Grade::NotAvailable,
                        },
                        row.get::<_, String>(10)?,
                    ))
                },
            )
            .optional()?;

        match row {
            Some((mut score, grade)) => {
                score.grade = Grade::parse(&grade).ok_or_else(|| {
                    StorageError::corrupt(format!("Unknown grade in store: {}", grade))
                })?;
                Ok(Some(score))
            }
            None => Ok(None),
        }
    }

    async fn clear_reputation_scores(&self) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute("DELETE FROM reputation_scores", [])?;
        Ok(())
    }

    async fn get_stats(&self) -> Result<StorageStats> {
        let conn = self.conn.lock();
        let count = |table: &str| -> Result<usize> {
            let n: i64 =
                conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))?;
            Ok(n as usize)
        };

        Ok(StorageStats {
            accounts: count("accounts")?,
            balances: count("balances")?,
            metadata_entries: count("account_metadata")?,
            relationships: count("relationships")?,
            association_tags: count("association_tags")?,
            reputation_scores: count("reputation_scores")?,
        })
    }
}
