//! Core simulation logic for populations of adaptive learning agents.
//!
//! Agents live on a fixed topology (tiered small-world sub-networks or a
//! toroidal grid), update a behavioral parameter each step from their
//! neighborhood, are scored on the outcome, and may stochastically switch
//! strategies. Reporting and visualization layers consume the per-step
//! metrics snapshots; nothing in here renders or exports.

pub mod agent;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod metrics;
pub mod rules;
pub mod scoring;
pub mod switching;
pub mod topology;

pub use agent::{AgentId, AgentView, Move, Tier};
pub use config::SimConfig;
pub use engine::{Engine, RunState};
pub use error::SetupError;
pub use events::{EventLogger, SimEvent};
pub use metrics::MetricsSnapshot;
pub use topology::Topology;
