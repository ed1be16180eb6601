//! Delegation graph resolution
//!
//! Two independent pointer graphs over the same account key space:
//!
//! - `delegate_to`: ordinary delegation. Validity needs a funded target;
//!   cycles are reported with their full path.
//! - `council_delegate_to`: council vote routing. No balance requirement on
//!   intermediate hops; chains end at a council-ready account.

mod resolver;

pub use resolver::{CycleMark, DelegationNode, DelegationOutcome, DelegationResolver};
