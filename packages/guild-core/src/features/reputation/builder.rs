//! Reputation graph builder
//!
//! The builder indexes a rating-edge set once (ratee → rater → rating) and
//! then answers any number of score or graph queries against it, which is how
//! the reputation pass scores every rated account in one sweep.
//!
//! # Examples
//!
//! ```rust
//! use std::collections::HashMap;
//! use chrono::Utc;
//! use guild_core::{Grade, Rating, RatingEdge, ReputationConfig, ReputationGraphBuilder};
//!
//! let id = |c: char| format!("G{}", c.to_string().repeat(55));
//! let edges = vec![
//!     RatingEdge::new(id('B'), id('T'), Rating::A),
//!     RatingEdge::new(id('C'), id('T'), Rating::A),
//! ];
//!
//! let builder = ReputationGraphBuilder::new(ReputationConfig::default(), &edges);
//! let graph = builder.build(&id('T'), &HashMap::new(), Utc::now());
//! assert_eq!(graph.score.grade, Grade::A);
//! assert_eq!(graph.level1.len(), 2);
//! ```

use chrono::{DateTime, Utc};
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::{BTreeMap, HashMap};

use super::models::{Grade, GraphNode, RaterInfo, ReputationGraph, ReputationScore};
use crate::config::ReputationConfig;
use crate::shared::models::{Rating, RatingEdge};

pub struct ReputationGraphBuilder<'a> {
    config: ReputationConfig,
    /// ratee → (rater → rating); inner map sorted for deterministic output
    by_ratee: FxHashMap<&'a str, BTreeMap<&'a str, Rating>>,
}

impl<'a> ReputationGraphBuilder<'a> {
    /// Index `edges`. Self-ratings are dropped; when a rater rates the same
    /// account more than once, the lowest rating is kept.
    pub fn new(config: ReputationConfig, edges: &'a [RatingEdge]) -> Self {
        let mut by_ratee: FxHashMap<&str, BTreeMap<&str, Rating>> = FxHashMap::default();

        for edge in edges {
            if edge.rater == edge.ratee {
                continue;
            }
            by_ratee
                .entry(edge.ratee.as_str())
                .or_default()
                .entry(edge.rater.as_str())
                .and_modify(|kept| {
                    if edge.rating.value() < kept.value() {
                        *kept = edge.rating;
                    }
                })
                .or_insert(edge.rating);
        }

        Self { config, by_ratee }
    }

    /// Accounts with at least one rating, sorted
    pub fn rated_accounts(&self) -> Vec<&'a str> {
        let mut accounts: Vec<&str> = self.by_ratee.keys().copied().collect();
        accounts.sort_unstable();
        accounts
    }

    /// Raters of `ratee` with the rating each gave, sorted by rater
    pub fn raters_of(&self, ratee: &str) -> impl Iterator<Item = (&'a str, Rating)> + '_ {
        self.by_ratee
            .get(ratee)
            .into_iter()
            .flat_map(|raters| raters.iter().map(|(&rater, &rating)| (rater, rating)))
    }

    /// Weight of a rater; unknown raters get the baseline weight
    pub fn weight_of(&self, info: Option<&RaterInfo>) -> f64 {
        match info {
            Some(info) => self.config.weight(info.portfolio_value, info.connection_count),
            None => self.config.weight(0.0, 0),
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Score
    // ═══════════════════════════════════════════════════════════════════════

    /// Score `target` from its Level-1 raters
    pub fn score(
        &self,
        target: &str,
        infos: &HashMap<String, RaterInfo>,
        computed_at: DateTime<Utc>,
    ) -> ReputationScore {
        let mut score = ReputationScore::unrated(target, computed_at);
        let mut weighted_sum = 0.0;
        let mut value_sum = 0.0;

        for (rater, rating) in self.raters_of(target) {
            let weight = self.weight_of(infos.get(rater));
            let value = rating.value();

            weighted_sum += weight * value;
            value_sum += value;
            score.total_weight += weight;
            score.total_ratings += 1;
            match rating {
                Rating::A => score.a_count += 1,
                Rating::B => score.b_count += 1,
                Rating::C => score.c_count += 1,
                Rating::D => score.d_count += 1,
            }
        }

        if score.total_ratings > 0 && score.total_weight > 0.0 {
            score.weighted_score = (weighted_sum / score.total_weight).clamp(0.0, 4.0);
            score.base_score = (value_sum / f64::from(score.total_ratings)).clamp(0.0, 4.0);
            score.grade = Grade::from_score(score.weighted_score);
        }

        score
    }

    /// Score every rated account, sorted by account
    pub fn score_all(
        &self,
        infos: &HashMap<String, RaterInfo>,
        computed_at: DateTime<Utc>,
    ) -> Vec<ReputationScore> {
        self.rated_accounts()
            .into_iter()
            .map(|account| self.score(account, infos, computed_at))
            .collect()
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Graph
    // ═══════════════════════════════════════════════════════════════════════

    /// Build the two-level display graph for `target`
    pub fn build(
        &self,
        target: &str,
        infos: &HashMap<String, RaterInfo>,
        computed_at: DateTime<Utc>,
    ) -> ReputationGraph {
        let score = self.score(target, infos, computed_at);

        let level1: Vec<GraphNode> = self
            .raters_of(target)
            .map(|(rater, rating)| self.node(rater, target, rating, 1, infos))
            .collect();

        // Deduplicated by account. A Level-1 rater or the target itself may
        // show up here too when ratings are mutual.
        let mut seen: FxHashSet<&str> = FxHashSet::default();
        let mut level2 = Vec::new();
        for first in &level1 {
            for (rater, rating) in self.raters_of(&first.account_id) {
                if !seen.insert(rater) {
                    continue;
                }
                level2.push(self.node(rater, &first.account_id, rating, 2, infos));
            }
        }

        ReputationGraph {
            target: target.to_string(),
            score,
            level1,
            level2,
        }
    }

    fn node(
        &self,
        rater: &str,
        rates: &str,
        rating: Rating,
        distance: u8,
        infos: &HashMap<String, RaterInfo>,
    ) -> GraphNode {
        let info = infos.get(rater);
        GraphNode {
            account_id: rater.to_string(),
            display_name: info.and_then(|i| i.display_name.clone()),
            rates: rates.to_string(),
            rating,
            weight: self.weight_of(info),
            portfolio_value: info.map_or(0.0, |i| i.portfolio_value),
            connection_count: info.map_or(0, |i| i.connection_count),
            own_score: info.and_then(|i| i.own_score),
            distance,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(name: &str) -> String {
        format!("G{:A>55}", name)
    }

    fn edge(rater: &str, ratee: &str, rating: Rating) -> RatingEdge {
        RatingEdge::new(id(rater), id(ratee), rating)
    }

    fn info(name: &str, portfolio: f64, connections: u32) -> (String, RaterInfo) {
        let mut info = RaterInfo::new(id(name));
        info.portfolio_value = portfolio;
        info.connection_count = connections;
        (id(name), info)
    }

    #[test]
    fn test_no_raters_is_not_available() {
        let builder = ReputationGraphBuilder::new(ReputationConfig::default(), &[]);
        let graph = builder.build(&id("T"), &HashMap::new(), Utc::now());
        assert_eq!(graph.score.weighted_score, 0.0);
        assert_eq!(graph.score.base_score, 0.0);
        assert_eq!(graph.score.grade, Grade::NotAvailable);
        assert_eq!(graph.node_count(), 0);
    }

    #[test]
    fn test_equal_weights_match_base_score() {
        let edges = vec![edge("R1", "T", Rating::A), edge("R2", "T", Rating::C)];
        let builder = ReputationGraphBuilder::new(ReputationConfig::default(), &edges);
        let score = builder.score(&id("T"), &HashMap::new(), Utc::now());

        assert_eq!(score.total_ratings, 2);
        assert_eq!(score.a_count, 1);
        assert_eq!(score.c_count, 1);
        assert!((score.base_score - 3.0).abs() < 1e-12);
        assert!((score.weighted_score - 3.0).abs() < 1e-12);
        assert!((score.total_weight - 2.0).abs() < 1e-12);
        assert_eq!(score.grade, Grade::AMinus);
    }

    #[test]
    fn test_heavier_rater_pulls_score() {
        let edges = vec![edge("RICH", "T", Rating::A), edge("POOR", "T", Rating::D)];
        let infos: HashMap<_, _> = [info("RICH", 10_000.0, 5), info("POOR", 0.0, 0)]
            .into_iter()
            .collect();
        let builder = ReputationGraphBuilder::new(ReputationConfig::default(), &edges);
        let score = builder.score(&id("T"), &infos, Utc::now());

        assert!((score.base_score - 2.5).abs() < 1e-12);
        assert!(score.weighted_score > score.base_score);
        assert!(score.weighted_score <= 4.0);
    }

    #[test]
    fn test_self_rating_ignored() {
        let edges = vec![edge("T", "T", Rating::A), edge("R", "T", Rating::D)];
        let builder = ReputationGraphBuilder::new(ReputationConfig::default(), &edges);
        let score = builder.score(&id("T"), &HashMap::new(), Utc::now());
        assert_eq!(score.total_ratings, 1);
        assert_eq!(score.grade, Grade::C);
    }

    #[test]
    fn test_duplicate_rating_keeps_lowest() {
        let edges = vec![
            edge("R", "T", Rating::A),
            edge("R", "T", Rating::C),
            edge("R", "T", Rating::B),
        ];
        let builder = ReputationGraphBuilder::new(ReputationConfig::default(), &edges);
        let raters: Vec<_> = builder.raters_of(&id("T")).collect();
        assert_eq!(raters.len(), 1);
        assert_eq!(raters[0].1, Rating::C);
    }

    #[test]
    fn test_level_two_dedup() {
        // L1: R1, R2 rate T. L2: X rates both R1 and R2.
        let edges = vec![
            edge("R1", "T", Rating::A),
            edge("R2", "T", Rating::B),
            edge("X", "R1", Rating::C),
            edge("X", "R2", Rating::A),
        ];
        let builder = ReputationGraphBuilder::new(ReputationConfig::default(), &edges);
        let graph = builder.build(&id("T"), &HashMap::new(), Utc::now());

        assert_eq!(graph.level1.len(), 2);
        assert!(graph.level1.iter().all(|n| n.distance == 1 && n.rates == id("T")));

        assert_eq!(graph.level2.len(), 1);
        let x = &graph.level2[0];
        assert_eq!(x.account_id, id("X"));
        assert_eq!(x.distance, 2);
        // first Level-1 rater in sorted order wins
        assert_eq!(x.rates, id("R1"));
        assert_eq!(x.rating, Rating::C);
    }

    #[test]
    fn test_mutual_rating_puts_target_on_level_two() {
        let edges = vec![
            edge("R", "T", Rating::A),
            edge("T", "R", Rating::B),
            edge("X", "R", Rating::C),
        ];
        let builder = ReputationGraphBuilder::new(ReputationConfig::default(), &edges);
        let graph = builder.build(&id("T"), &HashMap::new(), Utc::now());

        assert_eq!(graph.level1.len(), 1);
        let level2: Vec<(&str, &str, Rating, u8)> = graph
            .level2
            .iter()
            .map(|n| (n.account_id.as_str(), n.rates.as_str(), n.rating, n.distance))
            .collect();
        assert_eq!(level2.len(), 2);
        assert!(level2.contains(&(id("T").as_str(), id("R").as_str(), Rating::B, 2)));
        assert!(level2.contains(&(id("X").as_str(), id("R").as_str(), Rating::C, 2)));
    }

    #[test]
    fn test_rater_on_both_levels() {
        // R2 rates T directly and also rates R1
        let edges = vec![
            edge("R1", "T", Rating::A),
            edge("R2", "T", Rating::B),
            edge("R2", "R1", Rating::D),
        ];
        let builder = ReputationGraphBuilder::new(ReputationConfig::default(), &edges);
        let graph = builder.build(&id("T"), &HashMap::new(), Utc::now());

        assert!(graph.level1.iter().any(|n| n.account_id == id("R2")));
        assert_eq!(graph.level2.len(), 1);
        assert_eq!(graph.level2[0].account_id, id("R2"));
        assert_eq!(graph.level2[0].rates, id("R1"));
        assert_eq!(graph.level2[0].rating, Rating::D);
    }

    #[test]
    fn test_level_two_does_not_affect_score() {
        let base = vec![edge("R", "T", Rating::B)];
        let mut extended = base.clone();
        extended.push(edge("Y", "R", Rating::D));

        let now = Utc::now();
        let a = ReputationGraphBuilder::new(ReputationConfig::default(), &base)
            .score(&id("T"), &HashMap::new(), now);
        let b = ReputationGraphBuilder::new(ReputationConfig::default(), &extended)
            .score(&id("T"), &HashMap::new(), now);
        assert_eq!(a, b);
    }

    #[test]
    fn test_nodes_carry_rater_info() {
        let edges = vec![edge("R", "T", Rating::A)];
        let (key, mut rater) = info("R", 42.0, 3);
        rater.display_name = Some("Rita".to_string());
        rater.own_score = Some(3.2);
        let infos = HashMap::from([(key, rater)]);

        let builder = ReputationGraphBuilder::new(ReputationConfig::default(), &edges);
        let graph = builder.build(&id("T"), &infos, Utc::now());
        let node = &graph.level1[0];
        assert_eq!(node.display_name.as_deref(), Some("Rita"));
        assert_eq!(node.portfolio_value, 42.0);
        assert_eq!(node.connection_count, 3);
        assert_eq!(node.own_score, Some(3.2));
        assert!((node.weight - ReputationConfig::default().weight(42.0, 3)).abs() < 1e-12);
    }

    #[test]
    fn test_score_all_covers_rated_accounts() {
        let edges = vec![
            edge("R", "T", Rating::A),
            edge("T", "R", Rating::D),
            edge("Q", "Q", Rating::A),
        ];
        let builder = ReputationGraphBuilder::new(ReputationConfig::default(), &edges);
        let scores = builder.score_all(&HashMap::new(), Utc::now());
        let accounts: Vec<_> = scores.iter().map(|s| s.account_id.clone()).collect();
        assert_eq!(accounts, vec![id("R"), id("T")]);
    }
}
