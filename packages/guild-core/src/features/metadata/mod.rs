//! Account metadata decoding
//!
//! Ledger accounts carry free-form `key → base64(value)` data entries.
//! This slice turns them into profile fields, relationship declarations,
//! delegation directives and (for the association account) governance tags.

mod parser;
mod tags;

pub use crate::shared::models::{AssociationTagKind, RelationType};
pub use parser::{
    parse_association_tags, parse_metadata, split_index, ParsedMetadata, RelationDeclaration,
};
pub use tags::{
    ASSOCIATION_PREFIXES, COUNCIL_DELEGATE_KEY, COUNCIL_READY_SENTINEL, DELEGATE_KEY,
    RELATION_PREFIXES,
};
