//! Metadata parser
//!
//! Pure function from raw `key → base64` pairs to [`ParsedMetadata`].
//!
//! # Classification order
//!
//! 1. Decode (bad base64, non UTF-8 or empty after trim ⇒ pair dropped)
//! 2. Reserved directives ([`DELEGATE_KEY`], [`COUNCIL_DELEGATE_KEY`])
//! 3. Relationship tags, longest prefix first, value must be an account id
//! 4. Everything else is a profile field split at its trailing digits
//!
//! Output collections are sorted, so equal inputs give equal outputs no
//! matter what order the pairs arrive in.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use super::tags::{
    ASSOCIATION_PREFIXES, COUNCIL_DELEGATE_KEY, COUNCIL_READY_SENTINEL, DELEGATE_KEY,
    RELATION_PREFIXES,
};
use crate::shared::account_id::is_valid_account_id;
use crate::shared::models::{AssociationTag, MetadataEntry, RelationType};

/// Relationship found in an account's own metadata (source is implicit)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RelationDeclaration {
    pub relation: RelationType,
    pub index: String,
    pub target: String,
}

/// Structured facts decoded from one account's data entries
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedMetadata {
    /// Profile fields, sorted by (base_key, index)
    pub profile: Vec<MetadataEntry>,
    /// Relationship declarations, sorted by (relation, index)
    pub relations: Vec<RelationDeclaration>,
    pub delegate_to: Option<String>,
    pub council_delegate_to: Option<String>,
    pub council_ready: bool,
}

impl ParsedMetadata {
    /// Profile entries grouped by base key
    pub fn profile_groups(&self) -> BTreeMap<&str, Vec<&MetadataEntry>> {
        let mut groups: BTreeMap<&str, Vec<&MetadataEntry>> = BTreeMap::new();
        for entry in &self.profile {
            groups.entry(entry.base_key.as_str()).or_default().push(entry);
        }
        groups
    }

    /// First value of a profile field (lowest index), if present
    pub fn profile_value(&self, base_key: &str) -> Option<&str> {
        self.profile
            .iter()
            .find(|e| e.base_key == base_key)
            .map(|e| e.value.as_str())
    }
}

/// Split a key into `(base, suffix)` where `suffix` is the trailing run of
/// ASCII digits (possibly empty).
///
/// ```rust
/// use guild_core::features::metadata::split_index;
///
/// assert_eq!(split_index("Website002"), ("Website", "002"));
/// assert_eq!(split_index("Name"), ("Name", ""));
/// assert_eq!(split_index("Skill0"), ("Skill", "0"));
/// ```
pub fn split_index(key: &str) -> (&str, &str) {
    let base_len = key.trim_end_matches(|c: char| c.is_ascii_digit()).len();
    key.split_at(base_len)
}

/// Parse one account's raw data entries.
///
/// Never fails: anomalies are dropped at the granularity of a single key.
pub fn parse_metadata<I, K, V>(raw: I) -> ParsedMetadata
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut parsed = ParsedMetadata::default();
    let mut profile = BTreeSet::new();
    let mut relations = BTreeSet::new();

    for (key, value) in decode_all(raw) {
        match key.as_str() {
            DELEGATE_KEY => {
                if is_valid_account_id(&value) {
                    parsed.delegate_to = Some(value);
                } else {
                    debug!(key = %key, "ignoring delegation directive with non-account value");
                }
            }
            COUNCIL_DELEGATE_KEY => {
                if value.eq_ignore_ascii_case(COUNCIL_READY_SENTINEL) {
                    parsed.council_ready = true;
                } else if is_valid_account_id(&value) {
                    parsed.council_delegate_to = Some(value);
                } else {
                    debug!(key = %key, "ignoring council directive with unrecognised value");
                }
            }
            _ => {
                if let Some((relation, index)) = match_relation(&key, &value) {
                    relations.insert(RelationDeclaration {
                        relation,
                        index: index.to_string(),
                        target: value,
                    });
                } else {
                    let (base, index) = split_index(&key);
                    profile.insert(MetadataEntry::new(base, index, value));
                }
            }
        }
    }

    parsed.profile = profile.into_iter().collect();
    parsed.relations = relations.into_iter().collect();
    parsed
}

/// Parse the association account's governance tags.
///
/// Keys that are not `<Tag><digits>` with an account-id value are ignored.
pub fn parse_association_tags<I, K, V>(raw: I) -> Vec<AssociationTag>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let tags: BTreeSet<AssociationTag> = decode_all(raw)
        .into_iter()
        .filter(|(_, value)| is_valid_account_id(value))
        .filter_map(|(key, target)| {
            ASSOCIATION_PREFIXES.iter().find_map(|(prefix, tag)| {
                let index = digit_suffix(&key, prefix)?;
                Some(AssociationTag {
                    tag: *tag,
                    index: index.to_string(),
                    target: target.clone(),
                })
            })
        })
        .collect();

    tags.into_iter().collect()
}

// ═══════════════════════════════════════════════════════════════════════════
// Helpers
// ═══════════════════════════════════════════════════════════════════════════

/// Decode every pair, dropping the ones that do not survive decoding.
///
/// Duplicate raw keys keep the greatest decoded value so the result does not
/// depend on input order.
fn decode_all<I, K, V>(raw: I) -> BTreeMap<String, String>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut decoded: BTreeMap<String, String> = BTreeMap::new();
    for (key, value) in raw {
        let key = key.as_ref();
        let Some(value) = decode_value(value.as_ref()) else {
            debug!(key = %key, "dropping undecodable data entry");
            continue;
        };
        decoded
            .entry(key.to_string())
            .and_modify(|existing| {
                if value > *existing {
                    *existing = value.clone();
                }
            })
            .or_insert(value);
    }
    decoded
}

fn decode_value(encoded: &str) -> Option<String> {
    let bytes = BASE64.decode(encoded.trim()).ok()?;
    let text = String::from_utf8(bytes).ok()?;
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// `Some(suffix)` if `key` is `prefix` followed by zero or more ASCII digits
fn digit_suffix<'k>(key: &'k str, prefix: &str) -> Option<&'k str> {
    let rest = key.strip_prefix(prefix)?;
    rest.bytes().all(|b| b.is_ascii_digit()).then_some(rest)
}

fn match_relation<'k>(key: &'k str, value: &str) -> Option<(RelationType, &'k str)> {
    if !is_valid_account_id(value) {
        return None;
    }
    RELATION_PREFIXES
        .iter()
        .find_map(|(prefix, relation)| digit_suffix(key, prefix).map(|index| (*relation, index)))
}
