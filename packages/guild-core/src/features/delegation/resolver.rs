//! Delegation resolver
//!
//! Works on an immutable snapshot of [`DelegationNode`]s indexed by account
//! id. Every walk is an explicit loop with a visited set, never recursion,
//! so arbitrarily long or cyclic chains are safe.
//!
//! Walk results are memoized per node, so a full pass is O(V) for both
//! graphs regardless of chain shape.

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::shared::amount::Amount;

/// Delegation-relevant fields of one account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegationNode {
    pub account_id: String,
    pub delegate_to: Option<String>,
    pub council_delegate_to: Option<String>,
    pub council_ready: bool,
    /// Balance of the governance token
    pub governance_balance: Amount,
}

impl DelegationNode {
    pub fn new(account_id: impl Into<String>, governance_balance: Amount) -> Self {
        Self {
            account_id: account_id.into(),
            delegate_to: None,
            council_delegate_to: None,
            council_ready: false,
            governance_balance,
        }
    }

    pub fn delegating_to(mut self, target: impl Into<String>) -> Self {
        self.delegate_to = Some(target.into());
        self
    }

    pub fn council_delegating_to(mut self, target: impl Into<String>) -> Self {
        self.council_delegate_to = Some(target.into());
        self
    }

    pub fn council_ready(mut self) -> Self {
        self.council_ready = true;
        self
    }
}

/// Account sitting on a delegation cycle
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CycleMark {
    pub account_id: String,
    /// Cycle members in delegation order, starting at the smallest id
    pub path: Vec<String>,
}

/// Everything one resolver pass derives
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegationOutcome {
    /// Accounts delegating to a missing or unfunded target
    pub delegation_errors: BTreeSet<String>,
    /// One mark per account on a delegate_to cycle, sorted by account
    pub cycles: Vec<CycleMark>,
    /// Council-ready account → received votes (whole tokens, truncated)
    pub received_votes: BTreeMap<String, i64>,
    /// Council delegator → council-ready account its chain resolves to
    pub council_targets: BTreeMap<String, String>,
}

impl DelegationOutcome {
    /// Number of distinct cycles (not cycle members)
    pub fn cycle_count(&self) -> usize {
        self.cycles
            .iter()
            .map(|mark| &mark.path)
            .collect::<BTreeSet<_>>()
            .len()
    }
}

/// Resolver over one snapshot
///
/// # Examples
///
/// ```rust
/// use guild_core::{Amount, DelegationNode, DelegationResolver};
///
/// let id = |c: char| format!("G{}", c.to_string().repeat(55));
/// let nodes = vec![
///     DelegationNode::new(id('A'), Amount::from_whole(10)).council_delegating_to(id('B')),
///     DelegationNode::new(id('B'), Amount::from_whole(1)).council_ready(),
/// ];
///
/// let outcome = DelegationResolver::new(&nodes).resolve();
/// assert_eq!(outcome.received_votes[&id('B')], 10);
/// ```
pub struct DelegationResolver<'a> {
    index: FxHashMap<&'a str, &'a DelegationNode>,
}

impl<'a> DelegationResolver<'a> {
    /// Index the snapshot. Later duplicates of an id replace earlier ones.
    pub fn new(nodes: &'a [DelegationNode]) -> Self {
        let mut index = FxHashMap::default();
        index.reserve(nodes.len());
        for node in nodes {
            index.insert(node.account_id.as_str(), node);
        }
        Self { index }
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Run both passes
    pub fn resolve(&self) -> DelegationOutcome {
        let (delegation_errors, cycles) = self.resolve_delegations();
        let (received_votes, council_targets) = self.tally_council_votes();

        DelegationOutcome {
            delegation_errors,
            cycles,
            received_votes,
            council_targets,
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Ordinary delegation
    // ═══════════════════════════════════════════════════════════════════════

    fn resolve_delegations(&self) -> (BTreeSet<String>, Vec<CycleMark>) {
        let mut errors = BTreeSet::new();
        let mut cycle_paths: BTreeMap<&str, Vec<String>> = BTreeMap::new();
        // Nodes whose whole downstream chain has already been walked
        let mut settled: FxHashSet<&str> = FxHashSet::default();

        for (&account, node) in &self.index {
            let Some(target) = node.delegate_to.as_deref() else {
                continue;
            };

            let funded = self
                .index
                .get(target)
                .is_some_and(|t| t.governance_balance.is_positive());
            if !funded {
                errors.insert(account.to_string());
                continue;
            }

            if settled.contains(account) {
                continue;
            }

            if let Some(cycle) = self.walk_delegation(account, &mut settled) {
                let path: Vec<String> = cycle.iter().map(|s| s.to_string()).collect();
                for member in cycle {
                    cycle_paths.insert(member, path.clone());
                }
            }
        }

        let cycles = cycle_paths
            .into_iter()
            .map(|(account, path)| CycleMark {
                account_id: account.to_string(),
                path,
            })
            .collect();

        (errors, cycles)
    }

    /// Follow `delegate_to` from `start`. Returns the cyclic portion of the
    /// path (rotated to its smallest id) if the walk revisits a node.
    fn walk_delegation(&self, start: &'a str, settled: &mut FxHashSet<&'a str>) -> Option<Vec<&'a str>> {
        let mut path: Vec<&'a str> = vec![start];
        let mut position: FxHashMap<&'a str, usize> = FxHashMap::default();
        position.insert(start, 0);

        let mut current = start;
        let mut cycle = None;

        while let Some(next) = self.index[current].delegate_to.as_deref() {
            let Some((&next, _)) = self.index.get_key_value(next) else {
                break;
            };
            if let Some(&at) = position.get(next) {
                cycle = Some(canonical_cycle(&path[at..]));
                break;
            }
            if settled.contains(next) {
                break;
            }
            position.insert(next, path.len());
            path.push(next);
            current = next;
        }

        settled.extend(path);
        cycle
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Council delegation
    // ═══════════════════════════════════════════════════════════════════════

    fn tally_council_votes(&self) -> (BTreeMap<String, i64>, BTreeMap<String, String>) {
        let mut memo: FxHashMap<&'a str, Option<&'a str>> = FxHashMap::default();
        let mut totals: BTreeMap<&str, Amount> = self
            .index
            .values()
            .filter(|n| n.council_ready)
            .map(|n| (n.account_id.as_str(), Amount::ZERO))
            .collect();
        let mut targets = BTreeMap::new();

        for (&account, node) in &self.index {
            if node.council_ready || node.council_delegate_to.is_none() {
                continue;
            }
            let Some(target) = self.council_target_memo(account, &mut memo) else {
                continue;
            };
            if target == account {
                continue;
            }
            if let Some(total) = totals.get_mut(target) {
                *total = *total + node.governance_balance;
            }
            targets.insert(account.to_string(), target.to_string());
        }

        let votes = totals
            .into_iter()
            .map(|(account, total)| (account.to_string(), total.whole_units()))
            .collect();

        (votes, targets)
    }

    /// Council-ready account that `start`'s council chain resolves to.
    ///
    /// `None` for dead ends, unknown accounts and cycles.
    pub fn council_target(&self, start: &str) -> Option<&'a str> {
        let mut memo = FxHashMap::default();
        let (&start, _) = self.index.get_key_value(start)?;
        self.council_target_memo(start, &mut memo)
    }

    fn council_target_memo(
        &self,
        start: &'a str,
        memo: &mut FxHashMap<&'a str, Option<&'a str>>,
    ) -> Option<&'a str> {
        let mut visited: FxHashSet<&'a str> = FxHashSet::default();
        let mut chain: Vec<&'a str> = Vec::new();
        let mut current = start;

        let result = loop {
            if let Some(&known) = memo.get(current) {
                break known;
            }
            let Some(node) = self.index.get(current) else {
                break None;
            };
            if node.council_ready {
                break Some(current);
            }
            if !visited.insert(current) {
                break None;
            }
            chain.push(current);

            let Some(next) = node.council_delegate_to.as_deref() else {
                break None;
            };
            match self.index.get_key_value(next) {
                Some((&next, _)) => current = next,
                None => break None,
            }
        };

        for member in chain {
            memo.insert(member, result);
        }
        result
    }
}

/// Rotate a cycle so it starts at its smallest member
fn canonical_cycle<'a>(cycle: &[&'a str]) -> Vec<&'a str> {
    let start = cycle
        .iter()
        .enumerate()
        .min_by_key(|(_, id)| **id)
        .map(|(i, _)| i)
        .unwrap_or(0);
    cycle[start..].iter().chain(&cycle[..start]).copied().collect()
}
