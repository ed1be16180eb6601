//! Feature slices
//!
//! - `metadata`: raw key/value account data → structured facts
//! - `delegation`: delegation chains, cycles, council vote tally
//! - `reputation`: two-level weighted rating graph

pub mod delegation;
pub mod metadata;
pub mod reputation;
