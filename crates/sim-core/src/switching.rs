//! Strategy Switching
//!
//! Stochastic strategy reassignment for the learning model, plus the initial
//! strategy draw at placement time. This is the only mechanism that changes
//! a strategy after initialization, and it never selects `Individual`.

use rand::rngs::SmallRng;
use rand::Rng;

use crate::agent::{LearningAgent, LearningStrategy};
use crate::config::TierParams;

/// Decide whether an agent abandons its strategy this step.
///
/// A switch requires the discrepancy to exceed the tier threshold AND a
/// Bernoulli draw with the tier's switch probability to succeed; the new
/// strategy is then drawn from the tier's social-strategy weights.
pub fn maybe_switch(
    agent: &LearningAgent,
    params: &TierParams,
    optimal: f64,
    rng: &mut SmallRng,
) -> Option<LearningStrategy> {
    let discrepancy = (agent.investment() - optimal).abs();
    if discrepancy <= params.discrepancy_threshold {
        return None;
    }
    if rng.gen::<f64>() >= params.switch_probability {
        return None;
    }
    Some(draw_social(&params.social_weights(), rng))
}

/// Initial strategy for a freshly placed agent: individual learner with the
/// tier's `individual_ratio`, otherwise a weighted social draw.
pub fn initial_strategy(params: &TierParams, rng: &mut SmallRng) -> LearningStrategy {
    if rng.gen::<f64>() < params.individual_ratio {
        LearningStrategy::Individual
    } else {
        draw_social(&params.social_weights(), rng)
    }
}

/// Weighted draw over the social strategies. Weights are renormalized by
/// their total before sampling.
pub fn draw_social(weights: &[(LearningStrategy, f64)], rng: &mut SmallRng) -> LearningStrategy {
    let total: f64 = weights.iter().map(|(_, w)| w).sum();
    if total <= 0.0 {
        // Degenerate weights fall back to a uniform pick.
        return weights[rng.gen_range(0..weights.len())].0;
    }
    let mut draw = rng.gen::<f64>() * total;
    for (strategy, weight) in weights {
        if draw < *weight {
            return *strategy;
        }
        draw -= *weight;
    }
    weights[weights.len() - 1].0
}
