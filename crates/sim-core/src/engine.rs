//! Simulation Engine
//!
//! Owns the agent population and the topology, and drives one step =
//! {update, score, maybe-switch} per agent. The learning model activates
//! agents sequentially in a fresh random order each step; the dilemma model
//! activates all agents simultaneously with a compute-all-then-commit-all
//! phase split, so no agent ever sees a concurrently-updated move.

use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, warn};

use petgraph::graph::NodeIndex;

use crate::agent::{
    AgentId, AgentView, DilemmaAgent, DilemmaStrategy, LearningAgent, Move, Tier, TierTable,
};
use crate::config::{DilemmaConfig, LearningConfig, ModelConfig, SimConfig, TierParams};
use crate::error::SetupError;
use crate::events::{EventLogger, SimEvent};
use crate::metrics::{
    DilemmaMetrics, LearningMetrics, MetricsHistory, MetricsSnapshot, ModelMetrics,
};
use crate::rules;
use crate::scoring::{banded_score, PayoffMatrix, ScoreBands};
use crate::switching;
use crate::topology::{SmallWorldSpec, Topology};

/// Run state of an initialized engine. (Before `initialize` succeeds there
/// is no engine value at all, which is the uninitialized state.)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Ready,
    Stepping,
    Terminated,
}

/// The simulation engine and sole owner of all mutable run state.
pub struct Engine {
    tick: u64,
    ticks_limit: Option<u64>,
    state: RunState,
    rng: SmallRng,
    topology: Topology,
    model: ModelRuntime,
    events: EventLogger,
    history: MetricsHistory,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("tick", &self.tick)
            .field("ticks_limit", &self.ticks_limit)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

enum ModelRuntime {
    Learning(LearningModel),
    Dilemma(DilemmaModel),
}

struct LearningModel {
    agents: Vec<LearningAgent>,
    /// Node hosting each agent, indexed by agent id. Fixed after placement.
    placements: Vec<NodeIndex>,
    optimal: f64,
    bands: ScoreBands,
    tiers: TierTable<TierParams>,
}

struct DilemmaModel {
    agents: Vec<DilemmaAgent>,
    placements: Vec<NodeIndex>,
    payoffs: PayoffMatrix,
}

impl Engine {
    /// Validate the configuration, build the topology, and seed the
    /// population. All configuration errors surface here; a run never fails
    /// mid-step.
    pub fn initialize(config: SimConfig) -> Result<Self, SetupError> {
        Self::initialize_with_logger(config, EventLogger::null())
    }

    /// As [`Engine::initialize`], with a caller-owned event sink.
    pub fn initialize_with_logger(
        config: SimConfig,
        events: EventLogger,
    ) -> Result<Self, SetupError> {
        config.validate()?;
        let mut rng = SmallRng::seed_from_u64(config.seed);

        let (topology, model) = match &config.model {
            ModelConfig::SocialLearning(cfg) => init_learning(cfg, &mut rng)?,
            ModelConfig::Dilemma(cfg) => init_dilemma(cfg, &mut rng)?,
        };

        let mut engine = Self {
            tick: 0,
            ticks_limit: config.ticks,
            state: RunState::Ready,
            rng,
            topology,
            model,
            events,
            history: MetricsHistory::default(),
        };

        let agents = engine.agent_count();
        let nodes = engine.topology.node_count();
        if let Err(e) = engine.events.log(SimEvent::PopulationSeeded { agents, nodes }) {
            warn!("failed to log population seeding: {}", e);
        }

        // Baseline aggregates before the first step, as tick 0.
        let baseline = engine.snapshot();
        engine.history.record(baseline);

        info!(
            "engine initialized: {} agents on {} nodes ({} edges)",
            agents,
            nodes,
            engine.topology.edge_count()
        );
        Ok(engine)
    }

    /// Advance one tick and return the new aggregates. Stepping a terminated
    /// engine is a no-op that re-reports the current aggregates.
    pub fn step(&mut self) -> MetricsSnapshot {
        if self.state == RunState::Terminated {
            debug!("step requested on terminated engine; state unchanged");
            return self.snapshot();
        }

        self.state = RunState::Stepping;
        self.tick += 1;

        match &mut self.model {
            ModelRuntime::Learning(model) => step_learning(
                model,
                &self.topology,
                &mut self.rng,
                &mut self.events,
                self.tick,
            ),
            ModelRuntime::Dilemma(model) => step_dilemma(model, &self.topology, &mut self.rng),
        }

        let snapshot = self.snapshot();
        self.history.record(snapshot.clone());

        self.state = match self.ticks_limit {
            Some(limit) if self.tick >= limit => {
                if let Err(e) = self.events.log(SimEvent::RunTerminated { tick: self.tick }) {
                    warn!("failed to log run termination: {}", e);
                }
                debug!("run length of {} ticks exhausted", limit);
                RunState::Terminated
            }
            _ => RunState::Ready,
        };

        snapshot
    }

    /// Convenience loop over [`Engine::step`].
    pub fn run(&mut self, ticks: u64) -> Vec<MetricsSnapshot> {
        (0..ticks).map(|_| self.step()).collect()
    }

    /// Read-only view of one agent, for display layers. Never a handle for
    /// mutation.
    pub fn agent_state(&self, id: AgentId) -> Option<AgentView> {
        match &self.model {
            ModelRuntime::Learning(model) => {
                model.agents.get(id.index()).map(|a| AgentView::SocialLearning {
                    id: a.id(),
                    tier: a.tier(),
                    strategy: a.strategy(),
                    investment: a.investment(),
                    score: a.score(),
                })
            }
            ModelRuntime::Dilemma(model) => {
                model.agents.get(id.index()).map(|a| AgentView::Dilemma {
                    id: a.id(),
                    strategy: a.strategy(),
                    current_move: a.current_move(),
                    score: a.score(),
                })
            }
        }
    }

    /// Views of the whole population, in id order.
    pub fn agent_views(&self) -> Vec<AgentView> {
        (0..self.agent_count() as u32)
            .filter_map(|i| self.agent_state(AgentId(i)))
            .collect()
    }

    pub fn agent_count(&self) -> usize {
        match &self.model {
            ModelRuntime::Learning(model) => model.agents.len(),
            ModelRuntime::Dilemma(model) => model.agents.len(),
        }
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn history(&self) -> &MetricsHistory {
        &self.history
    }

    /// Replace the event sink (e.g. to start logging mid-run).
    pub fn set_event_logger(&mut self, events: EventLogger) {
        self.events = events;
    }

    fn snapshot(&self) -> MetricsSnapshot {
        let metrics = match &self.model {
            ModelRuntime::Learning(model) => {
                ModelMetrics::SocialLearning(LearningMetrics::collect(&model.agents))
            }
            ModelRuntime::Dilemma(model) => {
                ModelMetrics::Dilemma(DilemmaMetrics::collect(&model.agents))
            }
        };
        MetricsSnapshot {
            tick: self.tick,
            metrics,
        }
    }
}

fn init_learning(
    cfg: &LearningConfig,
    rng: &mut SmallRng,
) -> Result<(Topology, ModelRuntime), SetupError> {
    let total_nodes = cfg.width * cfg.height;
    let requested = cfg.population_size();
    debug!(
        "seeding learning model: {} of {} candidate slots",
        requested, total_nodes
    );

    let counts = cfg.tier_counts(requested);
    let specs: Vec<SmallWorldSpec> = Tier::ALL
        .iter()
        .map(|&tier| SmallWorldSpec {
            tier,
            nodes: *counts.get(tier),
            mean_degree: cfg.tiers.get(tier).mean_degree,
            rewiring_prob: cfg.tiers.get(tier).rewiring_prob,
        })
        .collect();
    let mut topology = Topology::small_world(&specs, rng)?;

    let total: usize = Tier::ALL.iter().map(|&tier| *counts.get(tier)).sum();
    let mut agents = Vec::with_capacity(total);
    let mut placements = Vec::with_capacity(total);

    for tier in Tier::ALL {
        let count = *counts.get(tier);
        let params = cfg.tiers.get(tier);
        let mut candidates = topology.tier_nodes(tier);
        candidates.shuffle(rng);

        for _ in 0..count {
            let node = claim_node(
                &topology,
                &mut candidates,
                cfg.max_attempts,
                agents.len(),
                total,
            )?;
            let id = AgentId(agents.len() as u32);
            topology.set_occupant(node, id);

            let strategy = switching::initial_strategy(params, rng);
            agents.push(LearningAgent::new(id, tier, strategy, cfg.initial_investment));
            placements.push(node);
        }
        debug!("placed {} {} agents", count, tier);
    }

    Ok((
        topology,
        ModelRuntime::Learning(LearningModel {
            agents,
            placements,
            optimal: cfg.optimal_investment,
            bands: cfg.bands,
            tiers: cfg.tiers.clone(),
        }),
    ))
}

fn init_dilemma(
    cfg: &DilemmaConfig,
    rng: &mut SmallRng,
) -> Result<(Topology, ModelRuntime), SetupError> {
    let mut topology = Topology::torus(cfg.width, cfg.height);
    let total = cfg.width * cfg.height;

    let ratios = cfg.strategy_mix.ratios().normalized();
    let num_majority = (total as f64 * ratios.majority) as usize;
    let num_best = (total as f64 * ratios.best_neighbor) as usize;
    let num_random = total - num_majority - num_best;
    debug!(
        "seeding dilemma model: {} majority, {} best-neighbor, {} random",
        num_majority, num_best, num_random
    );

    let mut candidates = topology.vacant_nodes();
    candidates.shuffle(rng);

    let blocks = [
        (DilemmaStrategy::MajorityRule, num_majority),
        (DilemmaStrategy::BestNeighbor, num_best),
        (DilemmaStrategy::Random, num_random),
    ];

    let mut agents = Vec::with_capacity(total);
    let mut placements = Vec::with_capacity(total);

    for (strategy, count) in blocks {
        for _ in 0..count {
            let node = claim_node(
                &topology,
                &mut candidates,
                cfg.max_attempts,
                agents.len(),
                total,
            )?;
            let id = AgentId(agents.len() as u32);
            topology.set_occupant(node, id);

            let initial_move = if rng.gen::<f64>() < cfg.initial_cooperate_prob {
                Move::Cooperate
            } else {
                Move::Defect
            };
            agents.push(DilemmaAgent::new(
                id,
                strategy,
                initial_move,
                cfg.initial_cooperate_prob,
            ));
            placements.push(node);
        }
    }

    Ok((
        topology,
        ModelRuntime::Dilemma(DilemmaModel {
            agents,
            placements,
            payoffs: cfg.payoffs,
        }),
    ))
}

/// Pop candidate nodes until a vacant one turns up, within the bounded retry
/// budget. Exhausting either the candidates or the budget is fatal.
fn claim_node(
    topology: &Topology,
    candidates: &mut Vec<NodeIndex>,
    max_attempts: u32,
    placed: usize,
    requested: usize,
) -> Result<NodeIndex, SetupError> {
    let mut attempts = 0;
    while attempts < max_attempts {
        let Some(node) = candidates.pop() else {
            return Err(SetupError::PlacementExhausted {
                placed,
                requested,
                attempts,
            });
        };
        if topology.is_vacant(node) {
            return Ok(node);
        }
        attempts += 1;
    }
    Err(SetupError::PlacementExhausted {
        placed,
        requested,
        attempts: max_attempts,
    })
}

/// Sequential activation: a fresh random permutation each step, with each
/// agent's full update-score-switch cycle completed before the next agent
/// starts. An agent may therefore read a neighbor's just-updated state,
/// which is the intended semantics of this discipline.
fn step_learning(
    model: &mut LearningModel,
    topology: &Topology,
    rng: &mut SmallRng,
    events: &mut EventLogger,
    tick: u64,
) {
    let mut order: Vec<usize> = (0..model.agents.len()).collect();
    order.shuffle(rng);

    for idx in order {
        let neighbor_ids = topology.neighbor_occupants(model.placements[idx]);

        let next = {
            let agent = &model.agents[idx];
            let neighbors: Vec<&LearningAgent> = neighbor_ids
                .iter()
                .map(|id| &model.agents[id.index()])
                .collect();
            rules::next_investment(agent, &neighbors, rng)
        };

        let score = banded_score(next, model.optimal, model.bands);
        {
            let agent = &mut model.agents[idx];
            agent.set_investment(next);
            agent.set_score(score);
        }

        let params = model.tiers.get(model.agents[idx].tier());
        if let Some(to) = switching::maybe_switch(&model.agents[idx], params, model.optimal, rng) {
            let from = model.agents[idx].strategy();
            if from != to {
                model.agents[idx].set_strategy(to);
                let agent = &model.agents[idx];
                if let Err(e) = events.log(SimEvent::StrategySwitched {
                    tick,
                    agent: agent.id(),
                    tier: agent.tier(),
                    from,
                    to,
                }) {
                    warn!("failed to log strategy switch: {}", e);
                }
            }
        }
    }
}

/// Simultaneous activation: all next moves are computed from the committed
/// previous-round state before any agent's move is committed, then the
/// realized round is scored. Order-independent by construction.
fn step_dilemma(model: &mut DilemmaModel, topology: &Topology, rng: &mut SmallRng) {
    for idx in 0..model.agents.len() {
        let next = {
            let agent = &model.agents[idx];
            let neighbors: Vec<&DilemmaAgent> = topology
                .neighbor_occupants(model.placements[idx])
                .iter()
                .map(|id| &model.agents[id.index()])
                .collect();
            rules::next_move(agent, &neighbors, rng)
        };
        model.agents[idx].stage_move(next);
    }

    for agent in &mut model.agents {
        agent.commit_move();
    }

    let gains: Vec<f64> = (0..model.agents.len())
        .map(|idx| {
            let own = model.agents[idx].current_move();
            topology
                .neighbor_occupants(model.placements[idx])
                .iter()
                .map(|id| model.payoffs.payoff(own, model.agents[id.index()].current_move()))
                .sum()
        })
        .collect();
    for (agent, gain) in model.agents.iter_mut().zip(gains) {
        agent.add_score(gain);
    }
}
