//! Strategy Rules
//!
//! The behavior functions: pure maps from (agent, neighborhood) to the
//! agent's next parameter. Neighbor sets come from topology adjacency and
//! never change; an empty neighborhood always leaves the agent unchanged.

use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::agent::{DilemmaAgent, DilemmaStrategy, LearningAgent, LearningStrategy, Move};

/// Next investment for a learning-model agent.
pub fn next_investment(
    agent: &LearningAgent,
    neighbors: &[&LearningAgent],
    rng: &mut SmallRng,
) -> f64 {
    match agent.strategy() {
        LearningStrategy::Individual => agent.investment(),
        LearningStrategy::CopyBest => copy_best(agent, neighbors, rng),
        LearningStrategy::CopyMostFrequent => copy_most_frequent(agent, neighbors),
        LearningStrategy::CopyRandom => copy_random(agent, neighbors, rng),
    }
}

/// Adopt the investment of the strictly highest-scoring neighbor. Equal-best
/// neighbors are broken by a seeded uniform draw; without a strictly better
/// neighbor the investment is kept.
fn copy_best(agent: &LearningAgent, neighbors: &[&LearningAgent], rng: &mut SmallRng) -> f64 {
    let best_score = neighbors
        .iter()
        .map(|n| n.score())
        .fold(f64::NEG_INFINITY, f64::max);
    if best_score <= agent.score() {
        return agent.investment();
    }
    let best: Vec<&&LearningAgent> = neighbors.iter().filter(|n| n.score() == best_score).collect();
    match best.choose(rng) {
        Some(neighbor) => neighbor.investment(),
        None => agent.investment(),
    }
}

/// Adopt the most frequent investment among neighbors. Frequency ties
/// resolve to the lowest value, so the rule is fully deterministic.
fn copy_most_frequent(agent: &LearningAgent, neighbors: &[&LearningAgent]) -> f64 {
    if neighbors.is_empty() {
        return agent.investment();
    }
    let mut values: Vec<f64> = neighbors.iter().map(|n| n.investment()).collect();
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let mut best_value = values[0];
    let mut best_count = 0;
    let mut i = 0;
    while i < values.len() {
        let mut j = i + 1;
        while j < values.len() && values[j] == values[i] {
            j += 1;
        }
        if j - i > best_count {
            best_count = j - i;
            best_value = values[i];
        }
        i = j;
    }
    best_value
}

/// Adopt one uniformly random neighbor's investment.
fn copy_random(agent: &LearningAgent, neighbors: &[&LearningAgent], rng: &mut SmallRng) -> f64 {
    match neighbors.choose(rng) {
        Some(neighbor) => neighbor.investment(),
        None => agent.investment(),
    }
}

/// Next move for a dilemma agent.
///
/// Callers must pass neighbors in their committed previous-round state; the
/// engine's two-phase step guarantees no concurrently-updated move is ever
/// visible here.
pub fn next_move(agent: &DilemmaAgent, neighbors: &[&DilemmaAgent], rng: &mut SmallRng) -> Move {
    match agent.strategy() {
        DilemmaStrategy::MajorityRule => {
            if neighbors.is_empty() {
                return agent.current_move();
            }
            let defectors = neighbors
                .iter()
                .filter(|n| n.current_move() == Move::Defect)
                .count();
            // An exact tie favors Cooperate.
            if defectors > neighbors.len() - defectors {
                Move::Defect
            } else {
                Move::Cooperate
            }
        }
        DilemmaStrategy::BestNeighbor => {
            let mut best: Option<&DilemmaAgent> = None;
            for neighbor in neighbors.iter().copied() {
                let replace = match best {
                    None => true,
                    // Score ties resolve to the lowest agent id.
                    Some(current) => {
                        neighbor.score() > current.score()
                            || (neighbor.score() == current.score()
                                && neighbor.id() < current.id())
                    }
                };
                if replace {
                    best = Some(neighbor);
                }
            }
            match best {
                Some(neighbor) => neighbor.current_move(),
                None => agent.current_move(),
            }
        }
        DilemmaStrategy::Random => {
            if rng.gen::<f64>() < agent.cooperate_prob() {
                Move::Cooperate
            } else {
                Move::Defect
            }
        }
    }
}
