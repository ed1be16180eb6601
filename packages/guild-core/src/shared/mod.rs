//! Shared domain models
//!
//! - `account_id`: identifier syntax checks
//! - `amount`: exact 7-digit fixed point balances
//! - `models`: AccountRecord and its child collections

pub mod account_id;
pub mod amount;
pub mod models;

pub use account_id::{is_valid_account_id, ACCOUNT_ID_LEN, ACCOUNT_ID_SIGIL};
pub use amount::Amount;
pub use models::{
    AccountRecord, AssetKey, AssociationTag, Balance, MetadataEntry, Rating, RatingEdge,
    RelationshipEdge,
};
