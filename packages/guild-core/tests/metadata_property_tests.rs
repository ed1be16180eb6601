//! Property-based tests for the metadata parser
//!
//! Invariants that should hold for ALL inputs:
//! - Determinism: same input → same output
//! - Order independence: shuffling the pairs does not change the output
//! - Relation edges only ever point at valid account ids
//! - Index suffixes are preserved literally

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use guild_core::{is_valid_account_id, parse_metadata, RelationType};
use proptest::prelude::*;

const ALICE: &str = "GAAZI4TCR3TY5OJHCTJC2A4QSY6CJWJH5IAJTGKIN2ER7LBNVKOCCWN7";

fn encode(value: &str) -> String {
    BASE64.encode(value.as_bytes())
}

// ============================================================================
// Strategies
// ============================================================================

fn key_strategy() -> impl Strategy<Value = String> {
    let prefixes = prop::sample::select(vec![
        "Own", "Owner", "OwnerMajority", "A", "B", "Partner", "Name", "About", "Website",
        "mtla_a_delegate", "mtla_c_delegate", "RecommendToMTLA", "Love",
    ]);
    (prefixes, "[0-9]{0,3}").prop_map(|(prefix, suffix)| format!("{}{}", prefix, suffix))
}

fn value_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(ALICE.to_string()),
        "G[A-Z2-7]{55}",
        "[a-zA-Z ]{0,20}",
        Just("ready".to_string()),
        Just("READY".to_string()),
    ]
    .prop_map(|v| encode(&v))
}

fn raw_strategy() -> impl Strategy<Value = Vec<(String, String)>> {
    prop::collection::vec(
        (key_strategy(), prop_oneof![value_strategy(), Just("!!not base64!!".to_string())]),
        0..24,
    )
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn prop_parse_is_deterministic(raw in raw_strategy()) {
        let first = parse_metadata(raw.clone());
        let second = parse_metadata(raw);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn prop_parse_is_order_independent(raw in raw_strategy(), seed in any::<u64>()) {
        let mut shuffled = raw.clone();
        // deterministic rotation + reversal
        if !shuffled.is_empty() {
            let shift = (seed as usize) % shuffled.len();
            shuffled.rotate_left(shift);
        }
        if seed % 2 == 0 {
            shuffled.reverse();
        }
        prop_assert_eq!(parse_metadata(raw), parse_metadata(shuffled));
    }

    #[test]
    fn prop_relation_targets_are_account_ids(raw in raw_strategy()) {
        let parsed = parse_metadata(raw);
        for relation in &parsed.relations {
            prop_assert!(is_valid_account_id(&relation.target));
        }
        if let Some(target) = &parsed.delegate_to {
            prop_assert!(is_valid_account_id(target));
        }
        if let Some(target) = &parsed.council_delegate_to {
            prop_assert!(is_valid_account_id(target));
            prop_assert!(!parsed.council_ready);
        }
    }

    #[test]
    fn prop_reserved_keys_never_reach_profile(raw in raw_strategy()) {
        let parsed = parse_metadata(raw);
        for entry in &parsed.profile {
            // suffixed variants like "mtla_a_delegate1" are ordinary fields
            let reserved = entry.base_key == "mtla_a_delegate" || entry.base_key == "mtla_c_delegate";
            prop_assert!(!(reserved && entry.index.is_empty()));
        }
    }

    #[test]
    fn prop_suffix_preserved_literally(suffix in "[0-9]{1,4}") {
        let key = format!("Partner{}", suffix);
        let parsed = parse_metadata(vec![(key, encode(ALICE))]);
        prop_assert_eq!(parsed.relations.len(), 1);
        prop_assert_eq!(parsed.relations[0].relation, RelationType::Partner);
        prop_assert_eq!(&parsed.relations[0].index, &suffix);
    }
}

// ============================================================================
// Fixed cases
// ============================================================================

#[test]
fn test_longest_prefix_wins() {
    let raw = vec![
        ("OwnerMajority1".to_string(), encode(ALICE)),
        ("Owner1".to_string(), encode(ALICE)),
        ("Own1".to_string(), encode(ALICE)),
    ];
    let parsed = parse_metadata(raw);
    let tags: Vec<_> = parsed.relations.iter().map(|r| r.relation).collect();
    assert!(tags.contains(&RelationType::OwnerMajority));
    assert!(tags.contains(&RelationType::Owner));
    assert!(tags.contains(&RelationType::Own));
    assert_eq!(tags.len(), 3);
}

#[test]
fn test_zero_padded_indices_are_distinct_slots() {
    let raw = vec![
        ("Partner2".to_string(), encode(ALICE)),
        ("Partner002".to_string(), encode(ALICE)),
        ("Partner".to_string(), encode(ALICE)),
    ];
    let parsed = parse_metadata(raw);
    let indices: Vec<_> = parsed.relations.iter().map(|r| r.index.as_str()).collect();
    assert_eq!(indices, vec!["", "002", "2"]);
}
