//! Reputation data types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::shared::models::Rating;

// ═══════════════════════════════════════════════════════════════════════════
// Grade
// ═══════════════════════════════════════════════════════════════════════════

/// Letter grade derived from the weighted score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Grade {
    A,
    AMinus,
    BPlus,
    B,
    CPlus,
    C,
    D,
    NotAvailable,
}

impl Grade {
    /// Grade thresholds are inclusive lower bounds; anything not above zero
    /// is `N/A`.
    pub fn from_score(score: f64) -> Self {
        if score >= 3.5 {
            Grade::A
        } else if score >= 3.0 {
            Grade::AMinus
        } else if score >= 2.5 {
            Grade::BPlus
        } else if score >= 2.0 {
            Grade::B
        } else if score >= 1.5 {
            Grade::CPlus
        } else if score >= 1.0 {
            Grade::C
        } else if score > 0.0 {
            Grade::D
        } else {
            Grade::NotAvailable
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Grade::A => "A",
            Grade::AMinus => "A-",
            Grade::BPlus => "B+",
            Grade::B => "B",
            Grade::CPlus => "C+",
            Grade::C => "C",
            Grade::D => "D",
            Grade::NotAvailable => "N/A",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "A" => Grade::A,
            "A-" => Grade::AMinus,
            "B+" => Grade::BPlus,
            "B" => Grade::B,
            "C+" => Grade::CPlus,
            "C" => Grade::C,
            "D" => Grade::D,
            "N/A" => Grade::NotAvailable,
            _ => return None,
        })
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Inputs
// ═══════════════════════════════════════════════════════════════════════════

/// What the builder needs to know about a rater
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RaterInfo {
    pub account_id: String,
    pub display_name: Option<String>,
    pub portfolio_value: f64,
    /// Confirmed (mutual) non-rating relationships
    pub connection_count: u32,
    /// The rater's own weighted score, if one was computed
    pub own_score: Option<f64>,
}

impl RaterInfo {
    pub fn new(account_id: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
            ..Default::default()
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Outputs
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReputationScore {
    pub account_id: String,
    /// Σ wᵢvᵢ / Σ wᵢ over Level-1 raters, in [0, 4]
    pub weighted_score: f64,
    /// Unweighted mean of Level-1 ratings, in [0, 4]
    pub base_score: f64,
    pub a_count: u32,
    pub b_count: u32,
    pub c_count: u32,
    pub d_count: u32,
    pub total_ratings: u32,
    pub total_weight: f64,
    pub computed_at: DateTime<Utc>,
    pub grade: Grade,
}

impl ReputationScore {
    /// Score of an account nobody rated
    pub fn unrated(account_id: impl Into<String>, computed_at: DateTime<Utc>) -> Self {
        Self {
            account_id: account_id.into(),
            weighted_score: 0.0,
            base_score: 0.0,
            a_count: 0,
            b_count: 0,
            c_count: 0,
            d_count: 0,
            total_ratings: 0,
            total_weight: 0.0,
            computed_at,
            grade: Grade::NotAvailable,
        }
    }

    pub fn count_of(&self, rating: Rating) -> u32 {
        match rating {
            Rating::A => self.a_count,
            Rating::B => self.b_count,
            Rating::C => self.c_count,
            Rating::D => self.d_count,
        }
    }
}

/// One rater in the display graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub account_id: String,
    pub display_name: Option<String>,
    /// Account this node rated (the target for Level 1)
    pub rates: String,
    pub rating: Rating,
    pub weight: f64,
    pub portfolio_value: f64,
    pub connection_count: u32,
    pub own_score: Option<f64>,
    /// 1 or 2
    pub distance: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReputationGraph {
    pub target: String,
    pub score: ReputationScore,
    pub level1: Vec<GraphNode>,
    pub level2: Vec<GraphNode>,
}

impl ReputationGraph {
    pub fn node_count(&self) -> usize {
        self.level1.len() + self.level2.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grade_boundaries() {
        let cases = [
            (4.0, Grade::A),
            (3.5, Grade::A),
            (3.4999, Grade::AMinus),
            (3.0, Grade::AMinus),
            (2.5, Grade::BPlus),
            (2.0, Grade::B),
            (1.5, Grade::CPlus),
            (1.0, Grade::C),
            (0.9999, Grade::D),
            (0.0001, Grade::D),
            (0.0, Grade::NotAvailable),
        ];
        for (score, grade) in cases {
            assert_eq!(Grade::from_score(score), grade, "score {}", score);
        }
    }

    #[test]
    fn test_grade_string_roundtrip() {
        for grade in [
            Grade::A,
            Grade::AMinus,
            Grade::BPlus,
            Grade::B,
            Grade::CPlus,
            Grade::C,
            Grade::D,
            Grade::NotAvailable,
        ] {
            assert_eq!(Grade::parse(grade.as_str()), Some(grade));
        }
        assert_eq!(Grade::parse("E"), None);
    }

    #[test]
    fn test_unrated_score() {
        let score = ReputationScore::unrated("G", Utc::now());
        assert_eq!(score.grade, Grade::NotAvailable);
        assert_eq!(score.total_ratings, 0);
        assert_eq!(score.count_of(Rating::B), 0);
    }
}
