//! Outcome Scoring
//!
//! Converts an agent's behavioral parameter into an outcome score: threshold
//! bands for the learning model, a payoff-table lookup for the dilemma model.

use serde::{Deserialize, Serialize};

use crate::agent::Move;

/// Band widths for the child-outcome score.
///
/// A discrepancy within `tight` of the optimum earns the full score, within
/// `loose` the partial score, anything beyond earns nothing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreBands {
    pub tight: f64,
    pub loose: f64,
}

impl Default for ScoreBands {
    fn default() -> Self {
        Self {
            tight: 5.0,
            loose: 10.0,
        }
    }
}

/// Score for a discrepancy within the tight band.
pub const FULL_OUTCOME: f64 = 20.0;
/// Score for a discrepancy within the loose band.
pub const PARTIAL_OUTCOME: f64 = 10.0;

/// Banded child-outcome score from the distance to the optimal investment.
pub fn banded_score(investment: f64, optimal: f64, bands: ScoreBands) -> f64 {
    let discrepancy = (investment - optimal).abs();
    if discrepancy <= bands.tight {
        FULL_OUTCOME
    } else if discrepancy <= bands.loose {
        PARTIAL_OUTCOME
    } else {
        0.0
    }
}

/// 2x2 payoff table keyed by the ordered (own move, neighbor move) pair.
///
/// Entries are externally configured (defaults: CC=1, CD=0, DC=2, DD=0).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PayoffMatrix {
    pub cc: f64,
    pub cd: f64,
    pub dc: f64,
    pub dd: f64,
}

impl Default for PayoffMatrix {
    fn default() -> Self {
        Self {
            cc: 1.0,
            cd: 0.0,
            dc: 2.0,
            dd: 0.0,
        }
    }
}

impl PayoffMatrix {
    pub fn payoff(&self, own: Move, neighbor: Move) -> f64 {
        match (own, neighbor) {
            (Move::Cooperate, Move::Cooperate) => self.cc,
            (Move::Cooperate, Move::Defect) => self.cd,
            (Move::Defect, Move::Cooperate) => self.dc,
            (Move::Defect, Move::Defect) => self.dd,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.cc.is_finite() && self.cd.is_finite() && self.dc.is_finite() && self.dd.is_finite()
    }
}
