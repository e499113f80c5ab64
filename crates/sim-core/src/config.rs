//! Simulation Configuration
//!
//! All tunables for both model families, loaded from a TOML file. Every
//! section carries usable defaults, so a partial (or empty) file is a valid
//! configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::agent::{LearningStrategy, Tier, TierTable};
use crate::error::SetupError;
use crate::scoring::{PayoffMatrix, ScoreBands};

/// Top-level configuration: run seed, optional run length, and the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Seed for the single generator threaded through the whole run.
    pub seed: u64,
    /// Run length in ticks; the engine terminates once it is exhausted.
    /// `None` leaves the run length to the caller.
    pub ticks: Option<u64>,
    pub model: ModelConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            ticks: None,
            model: ModelConfig::SocialLearning(LearningConfig::default()),
        }
    }
}

impl SimConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigLoadError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Parses configuration from a TOML string.
    pub fn from_str(content: &str) -> Result<Self, ConfigLoadError> {
        Ok(toml::from_str(content)?)
    }

    /// Rejects inconsistent settings before any placement begins.
    pub fn validate(&self) -> Result<(), SetupError> {
        match &self.model {
            ModelConfig::SocialLearning(cfg) => cfg.validate(),
            ModelConfig::Dilemma(cfg) => cfg.validate(),
        }
    }
}

/// Which model family to run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelConfig {
    SocialLearning(LearningConfig),
    Dilemma(DilemmaConfig),
}

/// Configuration for the social-learning model on tiered small-world
/// networks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LearningConfig {
    /// Grid extent used to size the population (`width * height` nodes at
    /// full density).
    pub width: usize,
    pub height: usize,
    /// Fraction of `width * height` that is seeded with agents.
    pub initial_density: f64,
    /// The investment the outcome bands are centered on.
    pub optimal_investment: f64,
    /// Every agent starts at this investment.
    pub initial_investment: f64,
    /// Tier receiving `primary_tier_ratio` of the population; the remainder
    /// splits evenly across the other two tiers.
    pub primary_tier: Tier,
    pub primary_tier_ratio: f64,
    pub tiers: TierTable<TierParams>,
    pub bands: ScoreBands,
    /// Retry budget for placement collisions before giving up.
    pub max_attempts: u32,
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            width: 50,
            height: 50,
            initial_density: 0.8,
            optimal_investment: 40.0,
            initial_investment: 30.0,
            primary_tier: Tier::High,
            primary_tier_ratio: 0.33,
            tiers: default_tier_table(),
            bands: ScoreBands::default(),
            max_attempts: 2000,
        }
    }
}

impl LearningConfig {
    /// Share of the population per tier: the primary tier takes
    /// `primary_tier_ratio`, the remainder splits evenly.
    pub fn tier_ratios(&self) -> TierTable<f64> {
        let rest = (1.0 - self.primary_tier_ratio) / 2.0;
        let mut ratios = TierTable {
            high: rest,
            medium: rest,
            low: rest,
        };
        *ratios.get_mut(self.primary_tier) = self.primary_tier_ratio;
        ratios
    }

    /// Agents per tier for a given population size. Shares are floored, so
    /// a handful of agents may go unassigned.
    pub fn tier_counts(&self, population: usize) -> TierTable<usize> {
        let ratios = self.tier_ratios();
        let mut counts = TierTable::default();
        for tier in Tier::ALL {
            *counts.get_mut(tier) = (population as f64 * *ratios.get(tier)) as usize;
        }
        counts
    }

    /// Population implied by the grid extent and density.
    pub fn population_size(&self) -> usize {
        let total = self.width * self.height;
        ((total as f64 * self.initial_density) as usize).min(total)
    }

    fn validate(&self) -> Result<(), SetupError> {
        if self.width == 0 || self.height == 0 {
            return Err(SetupError::configuration("grid dimensions must be positive"));
        }
        if !(self.initial_density > 0.0 && self.initial_density <= 1.0) {
            return Err(SetupError::configuration(format!(
                "initial density must lie in (0, 1], got {}",
                self.initial_density
            )));
        }
        if !self.optimal_investment.is_finite() || !self.initial_investment.is_finite() {
            return Err(SetupError::configuration("investment values must be finite"));
        }
        if self.bands.tight < 0.0 || self.bands.loose < self.bands.tight {
            return Err(SetupError::configuration(
                "score bands must satisfy 0 <= tight <= loose",
            ));
        }
        check_unit("primary tier ratio", self.primary_tier_ratio)?;

        for tier in Tier::ALL {
            let params = self.tiers.get(tier);
            check_unit(&format!("{tier} individual ratio"), params.individual_ratio)?;
            check_unit(
                &format!("{tier} primary social ratio"),
                params.primary_social_ratio,
            )?;
            check_unit(
                &format!("{tier} switch probability"),
                params.switch_probability,
            )?;
            check_unit(&format!("{tier} rewiring probability"), params.rewiring_prob)?;
            if params.discrepancy_threshold < 0.0 {
                return Err(SetupError::configuration(format!(
                    "{tier} discrepancy threshold must be non-negative"
                )));
            }
            if !params.primary_social_strategy.is_social() {
                return Err(SetupError::configuration(format!(
                    "{tier} primary social strategy must be a social variant"
                )));
            }
        }
        Ok(())
    }
}

/// Per-tier learning, network, and switching parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TierParams {
    /// Probability that an agent of this tier starts as an individual
    /// learner.
    pub individual_ratio: f64,
    /// Share of the social probability mass given to the tier's primary
    /// social strategy; the rest splits evenly across the other two.
    pub primary_social_ratio: f64,
    pub primary_social_strategy: LearningStrategy,
    /// Mean degree of the tier's small-world sub-network.
    pub mean_degree: usize,
    pub rewiring_prob: f64,
    /// Discrepancy beyond which a strategy switch becomes possible.
    pub discrepancy_threshold: f64,
    pub switch_probability: f64,
}

impl Default for TierParams {
    fn default() -> Self {
        Self {
            individual_ratio: 0.7,
            primary_social_ratio: 0.5,
            primary_social_strategy: LearningStrategy::CopyBest,
            mean_degree: 4,
            rewiring_prob: 0.1,
            discrepancy_threshold: 5.0,
            switch_probability: 0.1,
        }
    }
}

impl TierParams {
    /// Weights over the social strategies: the primary strategy takes
    /// `primary_social_ratio`, the rest splits evenly. Sampling renormalizes
    /// by the total, so the weights only need to be proportional.
    pub fn social_weights(&self) -> [(LearningStrategy, f64); 3] {
        let rest = (1.0 - self.primary_social_ratio) / 2.0;
        LearningStrategy::SOCIAL.map(|s| {
            let weight = if s == self.primary_social_strategy {
                self.primary_social_ratio
            } else {
                rest
            };
            (s, weight)
        })
    }
}

/// Default tier table: sparser, tighter networks and lower switching
/// pressure at the high tier, the opposite at the low tier.
fn default_tier_table() -> TierTable<TierParams> {
    TierTable {
        high: TierParams::default(),
        medium: TierParams {
            mean_degree: 6,
            rewiring_prob: 0.3,
            discrepancy_threshold: 10.0,
            switch_probability: 0.3,
            ..TierParams::default()
        },
        low: TierParams {
            mean_degree: 8,
            rewiring_prob: 0.5,
            discrepancy_threshold: 15.0,
            switch_probability: 0.5,
            ..TierParams::default()
        },
    }
}

/// Configuration for the dilemma model on a toroidal grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DilemmaConfig {
    pub width: usize,
    pub height: usize,
    /// Probability that an agent's initial move (and every move of a
    /// `Random` agent) is Cooperate.
    pub initial_cooperate_prob: f64,
    pub payoffs: PayoffMatrix,
    pub strategy_mix: StrategyMix,
    /// Retry budget for placement collisions before giving up.
    pub max_attempts: u32,
}

impl Default for DilemmaConfig {
    fn default() -> Self {
        Self {
            width: 50,
            height: 50,
            initial_cooperate_prob: 0.5,
            payoffs: PayoffMatrix::default(),
            strategy_mix: StrategyMix::Preset(MixPreset::Equal),
            max_attempts: 2000,
        }
    }
}

impl DilemmaConfig {
    fn validate(&self) -> Result<(), SetupError> {
        if self.width == 0 || self.height == 0 {
            return Err(SetupError::configuration("grid dimensions must be positive"));
        }
        check_unit("initial cooperate probability", self.initial_cooperate_prob)?;
        if !self.payoffs.is_finite() {
            return Err(SetupError::configuration("payoff entries must be finite"));
        }
        if let StrategyMix::Explicit(ratios) = &self.strategy_mix {
            if ratios.majority < 0.0 || ratios.best_neighbor < 0.0 || ratios.random < 0.0 {
                return Err(SetupError::configuration(
                    "strategy ratios must be non-negative",
                ));
            }
            let total = ratios.majority + ratios.best_neighbor + ratios.random;
            if total <= 0.0 {
                return Err(SetupError::configuration(
                    "strategy ratios must sum to a positive value",
                ));
            }
            if total > 1.0 + 1e-9 {
                return Err(SetupError::configuration(format!(
                    "strategy ratios must sum to at most 1, got {total}"
                )));
            }
        }
        Ok(())
    }
}

/// Distribution of move-decision rules across the dilemma population.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StrategyMix {
    Preset(MixPreset),
    Explicit(MixRatios),
}

impl StrategyMix {
    pub fn ratios(&self) -> MixRatios {
        match self {
            StrategyMix::Preset(preset) => preset.ratios(),
            StrategyMix::Explicit(ratios) => *ratios,
        }
    }
}

/// Named strategy distributions for batch sweeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MixPreset {
    Equal,
    MoreMajority,
    MoreBest,
    MoreRandom,
}

impl MixPreset {
    pub fn ratios(&self) -> MixRatios {
        match self {
            MixPreset::Equal => MixRatios {
                majority: 1.0 / 3.0,
                best_neighbor: 1.0 / 3.0,
                random: 1.0 / 3.0,
            },
            MixPreset::MoreMajority => MixRatios {
                majority: 0.5,
                best_neighbor: 0.25,
                random: 0.25,
            },
            MixPreset::MoreBest => MixRatios {
                majority: 0.25,
                best_neighbor: 0.5,
                random: 0.25,
            },
            MixPreset::MoreRandom => MixRatios {
                majority: 0.25,
                best_neighbor: 0.25,
                random: 0.5,
            },
        }
    }
}

/// Explicit strategy shares; normalized before use.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MixRatios {
    pub majority: f64,
    pub best_neighbor: f64,
    pub random: f64,
}

impl MixRatios {
    pub fn normalized(&self) -> MixRatios {
        let total = self.majority + self.best_neighbor + self.random;
        if total > 0.0 {
            MixRatios {
                majority: self.majority / total,
                best_neighbor: self.best_neighbor / total,
                random: self.random / total,
            }
        } else {
            MixPreset::Equal.ratios()
        }
    }
}

/// Errors that can occur while loading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Toml(#[from] toml::de::Error),
}

fn check_unit(name: &str, value: f64) -> Result<(), SetupError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(SetupError::configuration(format!(
            "{name} must lie in [0, 1], got {value}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = SimConfig::default();
        assert_eq!(config.seed, 42);
        assert!(config.validate().is_ok());

        match &config.model {
            ModelConfig::SocialLearning(cfg) => {
                assert_eq!(cfg.width, 50);
                assert_eq!(cfg.tiers.low.mean_degree, 8);
                assert_eq!(cfg.tiers.medium.switch_probability, 0.3);
            }
            ModelConfig::Dilemma(_) => panic!("default model should be social learning"),
        }
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = SimConfig::from_str("").unwrap();
        assert_eq!(config, SimConfig::default());
    }

    #[test]
    fn test_parse_learning_config() {
        let toml = r#"
            seed = 7
            ticks = 100

            [model]
            kind = "social_learning"
            width = 10
            height = 10
            initial_density = 1.0
            optimal_investment = 35.0

            [model.tiers.medium]
            individual_ratio = 0.2
            mean_degree = 4
        "#;

        let config = SimConfig::from_str(toml).unwrap();
        assert_eq!(config.seed, 7);
        assert_eq!(config.ticks, Some(100));

        match &config.model {
            ModelConfig::SocialLearning(cfg) => {
                assert_eq!(cfg.width, 10);
                assert_eq!(cfg.optimal_investment, 35.0);
                // Overridden fields
                assert_eq!(cfg.tiers.medium.individual_ratio, 0.2);
                assert_eq!(cfg.tiers.medium.mean_degree, 4);
                // Untouched section falls back entirely
                assert_eq!(cfg.tiers.high, TierParams::default());
            }
            ModelConfig::Dilemma(_) => panic!("expected social learning model"),
        }
    }

    #[test]
    fn test_parse_dilemma_config_with_preset() {
        let toml = r#"
            [model]
            kind = "dilemma"
            width = 20
            height = 20
            initial_cooperate_prob = 0.25
            strategy_mix = "more_random"

            [model.payoffs]
            cc = 3.0
            cd = 0.0
            dc = 5.0
            dd = 1.0
        "#;

        let config = SimConfig::from_str(toml).unwrap();
        match &config.model {
            ModelConfig::Dilemma(cfg) => {
                assert_eq!(cfg.payoffs.dc, 5.0);
                assert_eq!(cfg.strategy_mix, StrategyMix::Preset(MixPreset::MoreRandom));
                assert_eq!(cfg.strategy_mix.ratios().random, 0.5);
            }
            ModelConfig::SocialLearning(_) => panic!("expected dilemma model"),
        }
    }

    #[test]
    fn test_parse_explicit_strategy_mix() {
        let toml = r#"
            [model]
            kind = "dilemma"

            [model.strategy_mix]
            majority = 0.6
            best_neighbor = 0.2
            random = 0.2
        "#;

        let config = SimConfig::from_str(toml).unwrap();
        match &config.model {
            ModelConfig::Dilemma(cfg) => {
                let ratios = cfg.strategy_mix.ratios();
                assert_eq!(ratios.majority, 0.6);
                assert!(config.validate().is_ok());
            }
            ModelConfig::SocialLearning(_) => panic!("expected dilemma model"),
        }
    }

    #[test]
    fn test_tier_ratios_follow_primary() {
        let cfg = LearningConfig {
            primary_tier: Tier::Low,
            primary_tier_ratio: 0.5,
            ..LearningConfig::default()
        };
        let ratios = cfg.tier_ratios();
        assert_eq!(*ratios.get(Tier::Low), 0.5);
        assert_eq!(*ratios.get(Tier::High), 0.25);
        assert_eq!(*ratios.get(Tier::Medium), 0.25);
    }

    #[test]
    fn test_tier_counts_floor() {
        let cfg = LearningConfig {
            primary_tier: Tier::High,
            primary_tier_ratio: 0.33,
            ..LearningConfig::default()
        };
        let counts = cfg.tier_counts(100);
        assert_eq!(*counts.get(Tier::High), 33);
        assert_eq!(*counts.get(Tier::Medium), 33);
        assert_eq!(*counts.get(Tier::Low), 33);
    }

    #[test]
    fn test_population_size_from_density() {
        let cfg = LearningConfig {
            width: 10,
            height: 10,
            initial_density: 0.8,
            ..LearningConfig::default()
        };
        assert_eq!(cfg.population_size(), 80);
    }

    #[test]
    fn test_social_weights_favor_primary() {
        let params = TierParams {
            primary_social_ratio: 0.6,
            primary_social_strategy: LearningStrategy::CopyRandom,
            ..TierParams::default()
        };
        let weights = params.social_weights();
        for (strategy, weight) in weights {
            if strategy == LearningStrategy::CopyRandom {
                assert_eq!(weight, 0.6);
            } else {
                assert!((weight - 0.2).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_validate_rejects_bad_density() {
        let mut config = SimConfig::default();
        if let ModelConfig::SocialLearning(cfg) = &mut config.model {
            cfg.initial_density = 1.5;
        }
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_dimension() {
        let config = SimConfig {
            model: ModelConfig::Dilemma(DilemmaConfig {
                width: 0,
                ..DilemmaConfig::default()
            }),
            ..SimConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_individual_as_primary_social() {
        let mut config = SimConfig::default();
        if let ModelConfig::SocialLearning(cfg) = &mut config.model {
            cfg.tiers.high.primary_social_strategy = LearningStrategy::Individual;
        }
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_oversummed_mix() {
        let config = SimConfig {
            model: ModelConfig::Dilemma(DilemmaConfig {
                strategy_mix: StrategyMix::Explicit(MixRatios {
                    majority: 0.7,
                    best_neighbor: 0.5,
                    random: 0.3,
                }),
                ..DilemmaConfig::default()
            }),
            ..SimConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_mix_normalization() {
        let ratios = MixRatios {
            majority: 0.2,
            best_neighbor: 0.2,
            random: 0.1,
        }
        .normalized();
        assert!((ratios.majority - 0.4).abs() < 1e-12);
        assert!((ratios.random - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_config_round_trip() {
        let config = SimConfig::default();
        let toml = toml::to_string_pretty(&config).unwrap();
        let parsed = SimConfig::from_str(&toml).unwrap();
        assert_eq!(parsed, config);
    }
}
