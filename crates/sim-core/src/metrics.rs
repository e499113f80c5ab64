//! Metrics Aggregation
//!
//! Population-level aggregates collected once per step. External reporting
//! layers poll these snapshots; the engine never renders or exports them
//! itself.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::agent::{
    DilemmaAgent, DilemmaStrategy, LearningAgent, LearningStrategy, Move, Tier, TierTable,
};

/// One tick's aggregates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub tick: u64,
    #[serde(flatten)]
    pub metrics: ModelMetrics,
}

/// Aggregates for whichever model family is running.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum ModelMetrics {
    SocialLearning(LearningMetrics),
    Dilemma(DilemmaMetrics),
}

/// Per-strategy mapping for the learning model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LearningStrategyTable<T> {
    pub individual: T,
    pub copy_best: T,
    pub copy_most_frequent: T,
    pub copy_random: T,
}

impl<T> LearningStrategyTable<T> {
    pub fn get(&self, strategy: LearningStrategy) -> &T {
        match strategy {
            LearningStrategy::Individual => &self.individual,
            LearningStrategy::CopyBest => &self.copy_best,
            LearningStrategy::CopyMostFrequent => &self.copy_most_frequent,
            LearningStrategy::CopyRandom => &self.copy_random,
        }
    }

    pub fn get_mut(&mut self, strategy: LearningStrategy) -> &mut T {
        match strategy {
            LearningStrategy::Individual => &mut self.individual,
            LearningStrategy::CopyBest => &mut self.copy_best,
            LearningStrategy::CopyMostFrequent => &mut self.copy_most_frequent,
            LearningStrategy::CopyRandom => &mut self.copy_random,
        }
    }
}

/// Per-strategy mapping for the dilemma model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DilemmaStrategyTable<T> {
    pub majority_rule: T,
    pub best_neighbor: T,
    pub random: T,
}

impl<T> DilemmaStrategyTable<T> {
    pub fn get(&self, strategy: DilemmaStrategy) -> &T {
        match strategy {
            DilemmaStrategy::MajorityRule => &self.majority_rule,
            DilemmaStrategy::BestNeighbor => &self.best_neighbor,
            DilemmaStrategy::Random => &self.random,
        }
    }

    pub fn get_mut(&mut self, strategy: DilemmaStrategy) -> &mut T {
        match strategy {
            DilemmaStrategy::MajorityRule => &mut self.majority_rule,
            DilemmaStrategy::BestNeighbor => &mut self.best_neighbor,
            DilemmaStrategy::Random => &mut self.random,
        }
    }
}

/// Learning-model aggregates: mean investment and mean outcome score per
/// tier, and the strategy census. Empty tiers report 0 means.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LearningMetrics {
    pub mean_investment: TierTable<f64>,
    pub mean_score: TierTable<f64>,
    pub strategy_counts: LearningStrategyTable<usize>,
    pub population: usize,
}

impl LearningMetrics {
    pub fn collect(agents: &[LearningAgent]) -> Self {
        let mut investment_sum = TierTable::<f64>::default();
        let mut score_sum = TierTable::<f64>::default();
        let mut count = TierTable::<usize>::default();
        let mut strategy_counts = LearningStrategyTable::<usize>::default();

        for agent in agents {
            *investment_sum.get_mut(agent.tier()) += agent.investment();
            *score_sum.get_mut(agent.tier()) += agent.score();
            *count.get_mut(agent.tier()) += 1;
            *strategy_counts.get_mut(agent.strategy()) += 1;
        }

        let mut mean_investment = TierTable::<f64>::default();
        let mut mean_score = TierTable::<f64>::default();
        for tier in Tier::ALL {
            let n = *count.get(tier);
            if n > 0 {
                *mean_investment.get_mut(tier) = investment_sum.get(tier) / n as f64;
                *mean_score.get_mut(tier) = score_sum.get(tier) / n as f64;
            }
        }

        Self {
            mean_investment,
            mean_score,
            strategy_counts,
            population: agents.len(),
        }
    }
}

/// Dilemma-model aggregates: strategy census, mean cumulative score per
/// strategy, and the cooperate/defect split of the last committed round.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DilemmaMetrics {
    pub strategy_counts: DilemmaStrategyTable<usize>,
    pub mean_score: DilemmaStrategyTable<f64>,
    pub cooperating: usize,
    pub defecting: usize,
    pub population: usize,
}

impl DilemmaMetrics {
    pub fn collect(agents: &[DilemmaAgent]) -> Self {
        let mut strategy_counts = DilemmaStrategyTable::<usize>::default();
        let mut score_sum = DilemmaStrategyTable::<f64>::default();
        let mut cooperating = 0;

        for agent in agents {
            *strategy_counts.get_mut(agent.strategy()) += 1;
            *score_sum.get_mut(agent.strategy()) += agent.score();
            if agent.current_move() == Move::Cooperate {
                cooperating += 1;
            }
        }

        let mut mean_score = DilemmaStrategyTable::<f64>::default();
        for strategy in [
            DilemmaStrategy::MajorityRule,
            DilemmaStrategy::BestNeighbor,
            DilemmaStrategy::Random,
        ] {
            let n = *strategy_counts.get(strategy);
            if n > 0 {
                *mean_score.get_mut(strategy) = score_sum.get(strategy) / n as f64;
            }
        }

        Self {
            strategy_counts,
            mean_score,
            cooperating,
            defecting: agents.len() - cooperating,
            population: agents.len(),
        }
    }
}

/// Accumulates one snapshot per tick for the whole run.
#[derive(Debug, Default)]
pub struct MetricsHistory {
    snapshots: Vec<MetricsSnapshot>,
}

impl MetricsHistory {
    pub fn record(&mut self, snapshot: MetricsSnapshot) {
        self.snapshots.push(snapshot);
    }

    pub fn snapshots(&self) -> &[MetricsSnapshot] {
        &self.snapshots
    }

    pub fn last(&self) -> Option<&MetricsSnapshot> {
        self.snapshots.last()
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Write the full history as pretty-printed JSON, creating parent
    /// directories as needed.
    pub fn write_json(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(&self.snapshots)?;
        fs::write(path, json)
    }
}
