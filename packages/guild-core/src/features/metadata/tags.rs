//! Reserved keys and tag prefix tables
//!
//! Several tag names are textual prefixes of others (`Own` ⊂ `Owner` ⊂
//! `OwnerMajority`), so the tables below are ordered longest prefix first and
//! scanned in order. Keep them that way; `tests::test_*_longest_first`
//! guards the ordering.

use crate::shared::models::{AssociationTagKind, RelationType};

/// General-purpose delegation directive
pub const DELEGATE_KEY: &str = "mtla_a_delegate";

/// Council participation directive
pub const COUNCIL_DELEGATE_KEY: &str = "mtla_c_delegate";

/// Value of [`COUNCIL_DELEGATE_KEY`] marking the account as council-ready
/// (compared case-insensitively)
pub const COUNCIL_READY_SENTINEL: &str = "ready";

/// Relationship tags, longest prefix first
pub const RELATION_PREFIXES: &[(&str, RelationType)] = &[
    ("RecommendToMTLA", RelationType::RecommendToMTLA),
    ("OwnerMajority", RelationType::OwnerMajority),
    ("OwnerMinority", RelationType::OwnerMinority),
    ("Collaboration", RelationType::Collaboration),
    ("FactionMember", RelationType::FactionMember),
    ("Contractor", RelationType::Contractor),
    ("OneFamily", RelationType::OneFamily),
    ("Employer", RelationType::Employer),
    ("Employee", RelationType::Employee),
    ("Guardian", RelationType::Guardian),
    ("Sympathy", RelationType::Sympathy),
    ("Partner", RelationType::Partner),
    ("Divorce", RelationType::Divorce),
    ("Client", RelationType::Client),
    ("PartOf", RelationType::PartOf),
    ("MyPart", RelationType::MyPart),
    ("Spouse", RelationType::Spouse),
    ("Owner", RelationType::Owner),
    ("Love", RelationType::Love),
    ("Ward", RelationType::Ward),
    ("Own", RelationType::Own),
    ("A", RelationType::A),
    ("B", RelationType::B),
    ("C", RelationType::C),
    ("D", RelationType::D),
];

/// Association account tags, longest prefix first
pub const ASSOCIATION_PREFIXES: &[(&str, AssociationTagKind)] = &[
    ("Candidate", AssociationTagKind::Candidate),
    ("Program", AssociationTagKind::Program),
    ("Faction", AssociationTagKind::Faction),
];
