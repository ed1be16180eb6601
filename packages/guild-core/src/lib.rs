/*
 * Guild Core - account facts and governance graphs
 *
 * Feature-First Architecture:
 * - shared/      : Common models (AccountId, Amount, AccountRecord, edges)
 * - features/    : Vertical slices (metadata → delegation → reputation)
 * - config/      : Tunables for the graph computations
 *
 * Everything in this crate is pure: no I/O, no async, no shared state.
 * Persistence lives in guild-storage, fetching in guild-orchestration.
 */

pub mod config;
pub mod errors;
pub mod features;
pub mod shared;

pub use config::{ConfigError, ReputationConfig};
pub use errors::{CoreError, Result};
pub use features::delegation::{
    CycleMark, DelegationNode, DelegationOutcome, DelegationResolver,
};
pub use features::metadata::{
    parse_association_tags, parse_metadata, AssociationTagKind, ParsedMetadata,
    RelationDeclaration, RelationType, COUNCIL_DELEGATE_KEY, COUNCIL_READY_SENTINEL,
    DELEGATE_KEY,
};
pub use features::reputation::{
    Grade, GraphNode, RaterInfo, ReputationGraph, ReputationGraphBuilder, ReputationScore,
};
pub use shared::{
    is_valid_account_id, AccountRecord, Amount, AssetKey, AssociationTag, Balance,
    MetadataEntry, Rating, RatingEdge, RelationshipEdge, ACCOUNT_ID_LEN, ACCOUNT_ID_SIGIL,
};
