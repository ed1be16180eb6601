//! Two-level weighted reputation
//!
//! Level 1 is everyone who rated the target, Level 2 is everyone who rated a
//! Level-1 rater. Only Level 1 feeds the score; Level 2 is context for the
//! display graph. Depth is fixed, so there is no traversal to bound.

mod builder;
mod models;

pub use builder::ReputationGraphBuilder;
pub use models::{Grade, GraphNode, RaterInfo, ReputationGraph, ReputationScore};
