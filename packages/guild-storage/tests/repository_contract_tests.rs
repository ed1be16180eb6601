//! Repository contract tests
//!
//! Every scenario runs against both adapters so the in-memory store stays a
//! faithful stand-in for SQLite.

use chrono::Utc;
use guild_core::{
    parse_metadata, AccountRecord, Amount, AssetKey, AssociationTag, AssociationTagKind, Balance,
    Grade, Rating, RatingEdge, ReputationScore,
};
use guild_storage::{AccountRepository, ErrorKind, InMemoryAccountStore, SqliteAccountStore};

const ISSUER: &str = "GCNVDZIHGX473FEI7IXCUAEXUJ4BGCKEMHF36VYP5EMS7PX2QBLAMTLA";

fn id(name: &str) -> String {
    format!("G{:A>55}", name)
}

fn governance() -> AssetKey {
    AssetKey::new("MTLAP", ISSUER)
}

fn b64(value: &str) -> String {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    STANDARD.encode(value)
}

fn account(name: &str, tokens: i64, raw: Vec<(String, String)>) -> AccountRecord {
    AccountRecord::from_parsed(
        id(name),
        vec![
            Balance::new(AssetKey::native(), Amount::from_whole(10)),
            Balance::new(governance(), Amount::from_whole(tokens)),
        ],
        parse_metadata(raw),
    )
}

fn stores() -> Vec<(&'static str, Box<dyn AccountRepository>)> {
    vec![
        ("memory", Box::new(InMemoryAccountStore::new())),
        ("sqlite", Box::new(SqliteAccountStore::in_memory().unwrap())),
    ]
}

// ============================================================================
// Accounts
// ============================================================================

#[tokio::test]
async fn test_replace_is_wholesale() {
    for (name, store) in stores() {
        let first = account(
            "X",
            5,
            vec![
                ("Name".into(), b64("Xavier")),
                ("Partner1".into(), b64(&id("Y"))),
                ("Website".into(), b64("https://x.example")),
            ],
        );
        store.replace_account(&first).await.unwrap();

        let second = account("X", 6, vec![("Name".into(), b64("Xavi"))]);
        store.replace_account(&second).await.unwrap();

        let stored = store.get_account(&id("X")).await.unwrap().unwrap();
        assert_eq!(stored.record.metadata.len(), 1, "{}", name);
        assert!(stored.record.relationships.is_empty(), "{}", name);
        assert_eq!(stored.display_name().as_deref(), Some("Xavi"), "{}", name);
        assert_eq!(
            stored.record.balance_of(&governance()),
            Amount::from_whole(6),
            "{}",
            name
        );
    }
}

#[tokio::test]
async fn test_readback_matches_record() {
    for (name, store) in stores() {
        let record = account(
            "X",
            5,
            vec![
                ("Owner".into(), b64(&id("Y"))),
                ("Own2".into(), b64(&id("Z"))),
                ("mtla_a_delegate".into(), b64(&id("Y"))),
                ("mtla_c_delegate".into(), b64("Ready")),
            ],
        );
        store.replace_account(&record).await.unwrap();

        let stored = store.get_account(&id("X")).await.unwrap().unwrap();
        let mut expected = record.clone();
        expected.relationships.sort();
        expected.balances.sort_by(|a, b| a.asset.cmp(&b.asset));
        let mut actual = stored.record.clone();
        actual.balances.sort_by(|a, b| a.asset.cmp(&b.asset));
        assert_eq!(actual, expected, "{}", name);
        assert!(stored.record.council_ready, "{}", name);
    }
}

#[tokio::test]
async fn test_distinct_assets_sorted() {
    for (name, store) in stores() {
        store.replace_account(&account("X", 1, vec![])).await.unwrap();
        store.replace_account(&account("Y", 2, vec![])).await.unwrap();

        let assets = store.distinct_assets().await.unwrap();
        assert_eq!(assets, vec![governance(), AssetKey::native()], "{}", name);
    }
}

#[tokio::test]
async fn test_unknown_account_setters_fail() {
    for (name, store) in stores() {
        let err = store.set_delegation_error(&id("NOPE")).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::AccountNotFound, "{}", name);
        let err = store.set_portfolio_value(&id("NOPE"), 1.0).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::AccountNotFound, "{}", name);
        assert!(store.get_account(&id("NOPE")).await.unwrap().is_none(), "{}", name);
    }
}

#[tokio::test]
async fn test_prune_removes_departed_accounts() {
    for (name, store) in stores() {
        store
            .replace_account(&account("X", 3, vec![("mtla_c_delegate".into(), b64(&id("Y")))]))
            .await
            .unwrap();
        store
            .replace_account(&account("Y", 2, vec![("A".into(), b64(&id("X")))]))
            .await
            .unwrap();
        store
            .save_reputation_score(&ReputationScore::unrated(id("X"), Utc::now()))
            .await
            .unwrap();

        let removed = store.prune_accounts(&[id("Y")]).await.unwrap();
        assert_eq!(removed, vec![id("X")], "{}", name);

        assert!(store.get_account(&id("X")).await.unwrap().is_none(), "{}", name);
        assert!(store.get_reputation_score(&id("X")).await.unwrap().is_none(), "{}", name);
        let rows = store.delegation_rows(&governance()).await.unwrap();
        assert_eq!(rows.len(), 1, "{}", name);
        assert_eq!(rows[0].account_id, id("Y"), "{}", name);
        // Y's outgoing rating of X survives; only the departed side's rows go
        assert_eq!(store.rating_edges().await.unwrap().len(), 1, "{}", name);
        assert_eq!(store.get_stats().await.unwrap().reputation_scores, 0, "{}", name);

        let again = store.prune_accounts(&[id("Y")]).await.unwrap();
        assert!(again.is_empty(), "{}", name);
    }
}

// ============================================================================
// Delegation state
// ============================================================================

#[tokio::test]
async fn test_delegation_rows_and_flags() {
    for (name, store) in stores() {
        store
            .replace_account(&account("X", 3, vec![("mtla_a_delegate".into(), b64(&id("Y")))]))
            .await
            .unwrap();
        store
            .replace_account(&account("Y", 0, vec![("mtla_c_delegate".into(), b64("ready"))]))
            .await
            .unwrap();

        let rows = store.delegation_rows(&governance()).await.unwrap();
        assert_eq!(rows.len(), 2, "{}", name);
        assert_eq!(rows[0].account_id, id("X"));
        assert_eq!(rows[0].delegate_to.as_deref(), Some(id("Y").as_str()));
        assert_eq!(rows[0].governance_balance, Amount::from_whole(3));
        assert!(rows[1].council_ready);
        assert_eq!(rows[1].governance_balance, Amount::ZERO);

        store.set_delegation_error(&id("X")).await.unwrap();
        store.set_received_votes(&id("Y"), 42).await.unwrap();
        store
            .set_delegation_cycle(&id("Y"), &[id("X"), id("Y")])
            .await
            .unwrap();

        let y = store.get_account(&id("Y")).await.unwrap().unwrap();
        assert_eq!(y.delegation.received_votes, 42, "{}", name);
        assert_eq!(y.delegation.cycle_path, Some(vec![id("X"), id("Y")]));

        store.reset_delegation_state().await.unwrap();
        for account_id in store.account_ids().await.unwrap() {
            let stored = store.get_account(&account_id).await.unwrap().unwrap();
            assert!(!stored.delegation.delegation_error, "{}", name);
            assert!(!stored.delegation.in_cycle, "{}", name);
            assert_eq!(stored.delegation.received_votes, 0, "{}", name);
        }
    }
}

#[tokio::test]
async fn test_association_tags_replaced() {
    for (name, store) in stores() {
        let tag = |kind, index: &str, target: &str| AssociationTag {
            tag: kind,
            index: index.to_string(),
            target: id(target),
        };
        store
            .replace_association_tags(&[
                tag(AssociationTagKind::Program, "1", "P"),
                tag(AssociationTagKind::Candidate, "", "C"),
            ])
            .await
            .unwrap();
        store
            .replace_association_tags(&[tag(AssociationTagKind::Faction, "2", "F")])
            .await
            .unwrap();

        let tags = store.association_tags().await.unwrap();
        assert_eq!(tags, vec![tag(AssociationTagKind::Faction, "2", "F")], "{}", name);
    }
}

// ============================================================================
// Reputation inputs
// ============================================================================

#[tokio::test]
async fn test_rating_edges_and_rater_info() {
    for (name, store) in stores() {
        store
            .replace_account(&account(
                "R",
                1,
                vec![
                    ("Name".into(), b64("Rita")),
                    ("A".into(), b64(&id("T"))),
                    ("Partner".into(), b64(&id("T"))),
                ],
            ))
            .await
            .unwrap();
        store
            .replace_account(&account(
                "T",
                1,
                vec![("Employer".into(), b64(&id("R"))), ("D1".into(), b64(&id("R")))],
            ))
            .await
            .unwrap();
        store.set_portfolio_value(&id("R"), 250.0).await.unwrap();

        let edges = store.rating_edges().await.unwrap();
        assert_eq!(
            edges,
            vec![
                RatingEdge::new(id("R"), id("T"), Rating::A),
                RatingEdge::new(id("T"), id("R"), Rating::D),
            ],
            "{}",
            name
        );

        let infos = store.rater_infos().await.unwrap();
        let rita = &infos[&id("R")];
        assert_eq!(rita.display_name.as_deref(), Some("Rita"), "{}", name);
        assert_eq!(rita.portfolio_value, 250.0, "{}", name);
        assert_eq!(rita.connection_count, 1, "{}", name);
        assert_eq!(rita.own_score, None, "{}", name);
    }
}

#[tokio::test]
async fn test_reputation_score_roundtrip_and_clear() {
    for (name, store) in stores() {
        store.replace_account(&account("T", 1, vec![])).await.unwrap();

        let mut score = ReputationScore::unrated(id("T"), Utc::now());
        score.weighted_score = 3.25;
        score.base_score = 3.0;
        score.a_count = 1;
        score.b_count = 1;
        score.total_ratings = 2;
        score.total_weight = 2.5;
        score.grade = Grade::AMinus;
        store.save_reputation_score(&score).await.unwrap();

        let loaded = store.get_reputation_score(&id("T")).await.unwrap().unwrap();
        assert_eq!(loaded.grade, Grade::AMinus, "{}", name);
        assert_eq!(loaded.weighted_score, 3.25, "{}", name);
        assert_eq!(loaded.total_ratings, 2, "{}", name);

        let infos = store.rater_infos().await.unwrap();
        assert_eq!(infos[&id("T")].own_score, Some(3.25), "{}", name);

        store.clear_reputation_scores().await.unwrap();
        assert!(store.get_reputation_score(&id("T")).await.unwrap().is_none());
        assert_eq!(store.get_stats().await.unwrap().reputation_scores, 0);
    }
}
