//! Account domain models
//!
//! An `AccountRecord` is the parsed view of one ledger account at sync
//! time. It is replaced wholesale on every resync, so nothing here is
//! mutable state with history.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::amount::Amount;
use crate::errors::{CoreError, Result};
use crate::features::metadata::ParsedMetadata;

// ═══════════════════════════════════════════════════════════════════════════
// Assets & Balances
// ═══════════════════════════════════════════════════════════════════════════

/// Asset code reserved for the native currency
pub const NATIVE_ASSET_CODE: &str = "XLM";

/// (code, issuer) pair identifying an asset
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AssetKey {
    pub code: String,
    /// Empty for the native asset
    #[serde(default)]
    pub issuer: String,
}

impl AssetKey {
    pub fn new(code: impl Into<String>, issuer: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            issuer: issuer.into(),
        }
    }

    pub fn native() -> Self {
        Self::new(NATIVE_ASSET_CODE, "")
    }

    pub fn is_native(&self) -> bool {
        self.code == NATIVE_ASSET_CODE && self.issuer.is_empty()
    }
}

impl fmt::Display for AssetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.issuer.is_empty() {
            write!(f, "{}", self.code)
        } else {
            write!(f, "{}:{}", self.code, self.issuer)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    pub asset: AssetKey,
    pub amount: Amount,
}

impl Balance {
    pub fn new(asset: AssetKey, amount: Amount) -> Self {
        Self { asset, amount }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Metadata & Relationships
// ═══════════════════════════════════════════════════════════════════════════

/// One decoded profile field
///
/// `index` is the literal trailing-digit suffix of the raw key. `"2"` and
/// `"002"` are different slots, and `""` (no suffix) differs from `"0"`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MetadataEntry {
    pub base_key: String,
    pub index: String,
    pub value: String,
}

impl MetadataEntry {
    pub fn new(
        base_key: impl Into<String>,
        index: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            base_key: base_key.into(),
            index: index.into(),
            value: value.into(),
        }
    }
}

/// Closed set of relationship tags an account may declare
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RelationType {
    Own,
    Owner,
    OwnerMajority,
    OwnerMinority,
    Employer,
    Employee,
    Contractor,
    Client,
    Partner,
    Collaboration,
    MyPart,
    PartOf,
    RecommendToMTLA,
    FactionMember,
    OneFamily,
    Spouse,
    Guardian,
    Ward,
    Sympathy,
    Love,
    Divorce,
    A,
    B,
    C,
    D,
}

impl RelationType {
    /// Key prefix used on the ledger (identical to the variant name)
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationType::Own => "Own",
            RelationType::Owner => "Owner",
            RelationType::OwnerMajority => "OwnerMajority",
            RelationType::OwnerMinority => "OwnerMinority",
            RelationType::Employer => "Employer",
            RelationType::Employee => "Employee",
            RelationType::Contractor => "Contractor",
            RelationType::Client => "Client",
            RelationType::Partner => "Partner",
            RelationType::Collaboration => "Collaboration",
            RelationType::MyPart => "MyPart",
            RelationType::PartOf => "PartOf",
            RelationType::RecommendToMTLA => "RecommendToMTLA",
            RelationType::FactionMember => "FactionMember",
            RelationType::OneFamily => "OneFamily",
            RelationType::Spouse => "Spouse",
            RelationType::Guardian => "Guardian",
            RelationType::Ward => "Ward",
            RelationType::Sympathy => "Sympathy",
            RelationType::Love => "Love",
            RelationType::Divorce => "Divorce",
            RelationType::A => "A",
            RelationType::B => "B",
            RelationType::C => "C",
            RelationType::D => "D",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        crate::features::metadata::RELATION_PREFIXES
            .iter()
            .find(|(prefix, _)| *prefix == s)
            .map(|(_, relation)| *relation)
    }

    /// Rating letter if this relation is one of the A..D rating tags
    pub fn rating(&self) -> Option<Rating> {
        match self {
            RelationType::A => Some(Rating::A),
            RelationType::B => Some(Rating::B),
            RelationType::C => Some(Rating::C),
            RelationType::D => Some(Rating::D),
            _ => None,
        }
    }
}

impl fmt::Display for RelationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Directed relationship declared by `source` about `target`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RelationshipEdge {
    pub source: String,
    pub target: String,
    pub relation: RelationType,
    /// Literal numeric suffix of the raw key
    pub index: String,
}

/// Governance classification tags published by the association account
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AssociationTagKind {
    Program,
    Faction,
    Candidate,
}

impl AssociationTagKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssociationTagKind::Program => "Program",
            AssociationTagKind::Faction => "Faction",
            AssociationTagKind::Candidate => "Candidate",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "Program" => Some(AssociationTagKind::Program),
            "Faction" => Some(AssociationTagKind::Faction),
            "Candidate" => Some(AssociationTagKind::Candidate),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AssociationTag {
    pub tag: AssociationTagKind,
    pub index: String,
    pub target: String,
}

// ═══════════════════════════════════════════════════════════════════════════
// Ratings
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Rating {
    A,
    B,
    C,
    D,
}

impl Rating {
    /// Numeric value used in score computation (A=4 .. D=1)
    pub fn value(&self) -> f64 {
        match self {
            Rating::A => 4.0,
            Rating::B => 3.0,
            Rating::C => 2.0,
            Rating::D => 1.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Rating::A => "A",
            Rating::B => "B",
            Rating::C => "C",
            Rating::D => "D",
        }
    }

    /// Strict parse of a rating tag. Anything outside `A`..`D` is rejected,
    /// so an unknown tag never contributes to a score.
    ///
    /// ```rust
    /// use guild_core::Rating;
    ///
    /// assert_eq!(Rating::parse("B").unwrap().value(), 3.0);
    /// assert!(Rating::parse("E").is_err());
    /// assert!(Rating::parse("a").is_err());
    /// ```
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "A" => Ok(Rating::A),
            "B" => Ok(Rating::B),
            "C" => Ok(Rating::C),
            "D" => Ok(Rating::D),
            other => Err(CoreError::InvalidRating(other.to_string())),
        }
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RatingEdge {
    pub rater: String,
    pub ratee: String,
    pub rating: Rating,
}

impl RatingEdge {
    pub fn new(rater: impl Into<String>, ratee: impl Into<String>, rating: Rating) -> Self {
        Self {
            rater: rater.into(),
            ratee: ratee.into(),
            rating,
        }
    }

    /// Rating edge carried by a relationship edge, if it is one
    pub fn from_relationship(edge: &RelationshipEdge) -> Option<Self> {
        edge.relation
            .rating()
            .map(|rating| RatingEdge::new(&edge.source, &edge.target, rating))
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// AccountRecord
// ═══════════════════════════════════════════════════════════════════════════

/// Parsed state of one ledger account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRecord {
    pub account_id: String,
    pub balances: Vec<Balance>,
    pub metadata: Vec<MetadataEntry>,
    pub relationships: Vec<RelationshipEdge>,
    pub delegate_to: Option<String>,
    pub council_delegate_to: Option<String>,
    pub council_ready: bool,
}

impl AccountRecord {
    /// Account with no balances and no metadata
    pub fn empty(account_id: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
            balances: Vec::new(),
            metadata: Vec::new(),
            relationships: Vec::new(),
            delegate_to: None,
            council_delegate_to: None,
            council_ready: false,
        }
    }

    /// Assemble a record from fetched balances and parsed metadata
    pub fn from_parsed(
        account_id: impl Into<String>,
        balances: Vec<Balance>,
        parsed: ParsedMetadata,
    ) -> Self {
        let account_id = account_id.into();
        let relationships = parsed
            .relations
            .into_iter()
            .map(|decl| RelationshipEdge {
                source: account_id.clone(),
                target: decl.target,
                relation: decl.relation,
                index: decl.index,
            })
            .collect();

        Self {
            account_id,
            balances,
            metadata: parsed.profile,
            relationships,
            delegate_to: parsed.delegate_to,
            council_delegate_to: parsed.council_delegate_to,
            council_ready: parsed.council_ready,
        }
    }

    /// Balance of `asset`, zero when the account holds no trustline
    pub fn balance_of(&self, asset: &AssetKey) -> Amount {
        self.balances
            .iter()
            .filter(|b| &b.asset == asset)
            .map(|b| b.amount)
            .sum()
    }

    pub fn rating_edges(&self) -> Vec<RatingEdge> {
        self.relationships
            .iter()
            .filter_map(RatingEdge::from_relationship)
            .collect()
    }
}
