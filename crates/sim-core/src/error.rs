//! Setup Errors
//!
//! Everything that can fail while validating configuration or seeding the
//! population. Nothing here is raised mid-run: per-step computations degrade
//! to no-ops instead (an empty neighborhood leaves the agent unchanged).

use thiserror::Error;

use crate::agent::Tier;

/// Fatal initialization failures.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SetupError {
    /// The configuration is internally inconsistent; rejected before any
    /// topology construction or placement begins.
    #[error("invalid configuration: {reason}")]
    Configuration { reason: String },

    /// A small-world sub-network cannot host the requested mean degree.
    #[error("mean degree {degree} is not smaller than the {tier} sub-population of {population}")]
    DegreeExceedsPopulation {
        tier: Tier,
        degree: usize,
        population: usize,
    },

    /// The topology ran out of empty nodes, or the bounded retry budget was
    /// exhausted, while seeding agents.
    #[error("placement exhausted after {placed} of {requested} agents ({attempts} collision retries)")]
    PlacementExhausted {
        placed: usize,
        requested: usize,
        attempts: u32,
    },
}

impl SetupError {
    pub(crate) fn configuration(reason: impl Into<String>) -> Self {
        SetupError::Configuration {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SetupError::DegreeExceedsPopulation {
            tier: Tier::Medium,
            degree: 8,
            population: 6,
        };
        let msg = err.to_string();
        assert!(msg.contains("medium"));
        assert!(msg.contains('8'));
        assert!(msg.contains('6'));
    }

    #[test]
    fn test_configuration_helper() {
        let err = SetupError::configuration("density out of range");
        assert_eq!(
            err,
            SetupError::Configuration {
                reason: "density out of range".to_string()
            }
        );
    }
}
