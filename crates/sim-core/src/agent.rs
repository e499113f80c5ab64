//! Agent Records
//!
//! The per-agent state for both model families and its admissible mutations.
//! Only the engine constructs agents; everything else reads through the
//! accessors or the [`AgentView`] projection.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique, immutable agent identifier (dense index into the population).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AgentId(pub u32);

impl AgentId {
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "agent_{}", self.0)
    }
}

/// Education tier of a parent agent - fixed at creation.
///
/// The tier selects which threshold/probability parameters apply to the
/// agent; dilemma agents carry no tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    High,
    Medium,
    Low,
}

impl Tier {
    pub const ALL: [Tier; 3] = [Tier::High, Tier::Medium, Tier::Low];

    pub fn label(&self) -> &'static str {
        match self {
            Tier::High => "high",
            Tier::Medium => "medium",
            Tier::Low => "low",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Structured per-tier mapping keyed by [`Tier`].
///
/// Replaces ad-hoc lookups keyed by formatted tier names: every per-tier
/// parameter or aggregate lives in one of these, resolved at configuration
/// time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: serde::Deserialize<'de> + Default"))]
pub struct TierTable<T> {
    #[serde(default)]
    pub high: T,
    #[serde(default)]
    pub medium: T,
    #[serde(default)]
    pub low: T,
}

impl<T> TierTable<T> {
    pub fn get(&self, tier: Tier) -> &T {
        match tier {
            Tier::High => &self.high,
            Tier::Medium => &self.medium,
            Tier::Low => &self.low,
        }
    }

    pub fn get_mut(&mut self, tier: Tier) -> &mut T {
        match tier {
            Tier::High => &mut self.high,
            Tier::Medium => &mut self.medium,
            Tier::Low => &mut self.low,
        }
    }
}

/// Behavior variant of a learning-model agent.
///
/// `Individual` relies on private experience only; the three social variants
/// read the neighborhood. Mutable after initialization, but only through the
/// switching policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LearningStrategy {
    Individual,
    CopyBest,
    CopyMostFrequent,
    CopyRandom,
}

impl LearningStrategy {
    /// The social variants, the only targets a strategy switch may select.
    pub const SOCIAL: [LearningStrategy; 3] = [
        LearningStrategy::CopyBest,
        LearningStrategy::CopyMostFrequent,
        LearningStrategy::CopyRandom,
    ];

    pub fn is_social(&self) -> bool {
        !matches!(self, LearningStrategy::Individual)
    }
}

/// A single round's move in the dilemma model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Move {
    Cooperate,
    Defect,
}

/// Move-decision rule of a dilemma agent - fixed for the whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DilemmaStrategy {
    MajorityRule,
    BestNeighbor,
    Random,
}

/// A parent agent in the social-learning model.
///
/// `score` is derived anew from the investment every step and never carries
/// over across steps.
#[derive(Debug, Clone, PartialEq)]
pub struct LearningAgent {
    id: AgentId,
    tier: Tier,
    strategy: LearningStrategy,
    investment: f64,
    score: f64,
}

impl LearningAgent {
    pub(crate) fn new(id: AgentId, tier: Tier, strategy: LearningStrategy, investment: f64) -> Self {
        Self {
            id,
            tier,
            strategy,
            investment,
            score: 0.0,
        }
    }

    pub fn id(&self) -> AgentId {
        self.id
    }

    pub fn tier(&self) -> Tier {
        self.tier
    }

    pub fn strategy(&self) -> LearningStrategy {
        self.strategy
    }

    pub fn investment(&self) -> f64 {
        self.investment
    }

    pub fn score(&self) -> f64 {
        self.score
    }

    pub(crate) fn set_investment(&mut self, value: f64) {
        self.investment = value;
    }

    pub(crate) fn set_score(&mut self, value: f64) {
        self.score = value;
    }

    pub(crate) fn set_strategy(&mut self, strategy: LearningStrategy) {
        self.strategy = strategy;
    }
}

/// An agent in the dilemma model.
///
/// Moves are staged during the compute phase and only become visible to
/// neighbors once every agent has committed; `score` accumulates round
/// payoffs for the whole run.
#[derive(Debug, Clone, PartialEq)]
pub struct DilemmaAgent {
    id: AgentId,
    strategy: DilemmaStrategy,
    current_move: Move,
    staged_move: Option<Move>,
    cooperate_prob: f64,
    score: f64,
}

impl DilemmaAgent {
    pub(crate) fn new(
        id: AgentId,
        strategy: DilemmaStrategy,
        initial_move: Move,
        cooperate_prob: f64,
    ) -> Self {
        Self {
            id,
            strategy,
            current_move: initial_move,
            staged_move: None,
            cooperate_prob,
            score: 0.0,
        }
    }

    pub fn id(&self) -> AgentId {
        self.id
    }

    pub fn strategy(&self) -> DilemmaStrategy {
        self.strategy
    }

    /// The last committed move; during the compute phase this is still the
    /// previous round's move.
    pub fn current_move(&self) -> Move {
        self.current_move
    }

    pub fn cooperate_prob(&self) -> f64 {
        self.cooperate_prob
    }

    pub fn score(&self) -> f64 {
        self.score
    }

    pub(crate) fn stage_move(&mut self, next: Move) {
        self.staged_move = Some(next);
    }

    pub(crate) fn commit_move(&mut self) {
        if let Some(next) = self.staged_move.take() {
            self.current_move = next;
        }
    }

    pub(crate) fn add_score(&mut self, gain: f64) {
        self.score += gain;
    }
}

/// Read-only per-agent projection for reporting and visualization layers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum AgentView {
    SocialLearning {
        id: AgentId,
        tier: Tier,
        strategy: LearningStrategy,
        investment: f64,
        score: f64,
    },
    Dilemma {
        id: AgentId,
        strategy: DilemmaStrategy,
        current_move: Move,
        score: f64,
    },
}
