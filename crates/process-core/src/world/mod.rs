//! The simulation world: context, population, event log, and replay hashing.

mod events;
mod snapshot;
mod step;


use std::collections::BTreeSet;

use contracts::features::{FeatureVector, FEATURE_COUNT};
use contracts::{Event, RunConfig, RunMode, RunStatus, RunTallies, StageKind, SCHEMA_VERSION_V1};

use crate::agent::Claimant;
use crate::constraints::FeatureCatalog;
use crate::graph::{NodeId, StageGraph};
use crate::oracle::{LinearRiskOracle, RecourseOracle, RiskOracle, TargetProfileRecourseOracle};
use crate::rng::{mix_seed, sample_range_i64, StreamRng};
use crate::topology::{ParseWarning, STANDARD_TOPOLOGY};
use crate::{transition, SimError};

// ---------------------------------------------------------------------------
// Simulation context
// ---------------------------------------------------------------------------

/// Everything a stage behavior may consult or mutate besides the agent
/// itself. Owned by one `ProcessWorld` for the lifetime of a run; only the
/// stream and the tick counter change after construction.
#[derive(Debug)]
pub struct SimContext {
    pub graph: StageGraph,
    pub investigation_frequency: u64,
    pub random_nomination_p: f64,
    pub self_evaluation_p: f64,
    pub target_label: i64,
    pub rng: StreamRng,
    pub risk_oracle: Option<Box<dyn RiskOracle>>,
    pub recourse_oracle: Option<Box<dyn RecourseOracle>>,
    pub difficulties: [f64; FEATURE_COUNT],
    pub tick: u64,
}

impl SimContext {
    pub fn new(graph: StageGraph, config: &RunConfig, catalog: &FeatureCatalog) -> Self {
        Self {
            graph,
            investigation_frequency: config.investigation_frequency,
            random_nomination_p: config.random_nomination_p,
            self_evaluation_p: config.self_evaluation_p,
            target_label: config.target_label,
            rng: StreamRng::new(config.seed),
            risk_oracle: None,
            recourse_oracle: None,
            difficulties: catalog.difficulty_table(),
            tick: 0,
        }
    }

    /// First-declared node for a stage kind a behavior needs to route to.
    pub fn stage(&self, kind: StageKind) -> Result<NodeId, SimError> {
        self.graph.require(kind)
    }

    /// Weighted draw over the node's outgoing edges minus `excluded`.
    pub fn select_from(
        &mut self,
        node: NodeId,
        excluded: &BTreeSet<NodeId>,
    ) -> Result<NodeId, SimError> {
        let Self { graph, rng, .. } = self;
        transition::select(node, graph.outgoing(node)?, excluded, rng)
    }
}

// ---------------------------------------------------------------------------
// World
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct ProcessWorld {
    config: RunConfig,
    status: RunStatus,
    ctx: SimContext,
    agents: Vec<Claimant>,
    event_log: Vec<Event>,
    parse_warnings: Vec<ParseWarning>,
    tallies: RunTallies,
    replay_hash: u64,
    state_hash: u64,
}

impl ProcessWorld {
    /// Build the graph, generate the population at the Idle node, and wire
    /// the reference oracles if the config asks for them. Setup failures
    /// abort before any tick executes.
    pub fn new(config: RunConfig) -> Result<Self, SimError> {
        let topology_text = config.topology.as_deref().unwrap_or(STANDARD_TOPOLOGY);
        let (graph, parse_warnings) = StageGraph::from_text(topology_text)?;
        let idle = graph.require(StageKind::Idle)?;

        let catalog = FeatureCatalog::default_catalog();
        let mut ctx = SimContext::new(graph, &config, &catalog);
        if config.reference_oracles {
            ctx.risk_oracle = Some(Box::new(LinearRiskOracle::reference()));
            ctx.recourse_oracle = Some(Box::new(TargetProfileRecourseOracle::reference(
                &catalog,
                config.target_label,
            )));
        }

        let agents = (0..config.agent_count)
            .map(|index| {
                Claimant::new(
                    index as u64,
                    idle,
                    generated_features(config.seed, index),
                )
            })
            .collect();

        let status = RunStatus {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            run_id: config.run_id.clone(),
            current_tick: 0,
            max_ticks: config.max_ticks,
            mode: RunMode::Paused,
        };

        Ok(Self {
            config,
            status,
            ctx,
            agents,
            event_log: Vec::new(),
            parse_warnings,
            tallies: RunTallies::default(),
            replay_hash: 0,
            state_hash: 0,
        })
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn status(&self) -> &RunStatus {
        &self.status
    }

    pub fn events(&self) -> &[Event] {
        &self.event_log
    }

    pub fn parse_warnings(&self) -> &[ParseWarning] {
        &self.parse_warnings
    }

    pub fn tallies(&self) -> RunTallies {
        self.tallies
    }

    pub fn replay_hash(&self) -> u64 {
        self.replay_hash
    }

    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }

    /// Replace the risk classifier oracle (None disconnects it).
    pub fn set_risk_oracle(&mut self, oracle: Option<Box<dyn RiskOracle>>) {
        self.ctx.risk_oracle = oracle;
    }

    /// Replace the recourse recommendation oracle (None disconnects it).
    pub fn set_recourse_oracle(&mut self, oracle: Option<Box<dyn RecourseOracle>>) {
        self.ctx.recourse_oracle = oracle;
    }
}

// ---------------------------------------------------------------------------
// Deterministic population generation (off-stream)
// ---------------------------------------------------------------------------

/// Starting features for agent `index`, derived by seed salting so the
/// shared stream is untouched.
fn generated_features(seed: u64, index: usize) -> FeatureVector {
    let seed = mix_seed(seed, 7_919_u64.wrapping_mul(index as u64 + 1));
    let cost_sharers = (sample_range_i64(seed, 22, 0, 9) - 6).max(0);
    FeatureVector {
        age: sample_range_i64(seed, 10, 18, 72),
        resident: sample_range_i64(seed, 11, 0, 9) < 9,
        documented: sample_range_i64(seed, 12, 0, 19) < 19,
        other_assistance: sample_range_i64(seed, 13, 0, 9) == 0,
        incarcerated: sample_range_i64(seed, 14, 0, 49) == 0,
        home_equity: if sample_range_i64(seed, 15, 0, 4) == 0 {
            sample_range_i64(seed, 16, 10_000, 90_000)
        } else {
            0
        },
        assets: sample_range_i64(seed, 17, 0, 12_000),
        income: if sample_range_i64(seed, 18, 0, 2) == 0 {
            sample_range_i64(seed, 19, 200, 1_600)
        } else {
            0
        },
        has_partner: sample_range_i64(seed, 20, 0, 9) < 4,
        dependent_children: (sample_range_i64(seed, 21, 0, 9) - 6).max(0),
        cost_sharers,
        has_cost_sharer: cost_sharers > 0,
        unemployment_days: sample_range_i64(seed, 23, 0, 720),
    }
}

// ---------------------------------------------------------------------------
// Hash mixing
// ---------------------------------------------------------------------------

fn mix_state_hash(state_hash: u64, tick: u64, sequence_in_tick: u64) -> u64 {
    let mut hash = state_hash ^ tick.wrapping_mul(0x9E37_79B9_7F4A_7C15);
    hash ^= sequence_in_tick.wrapping_mul(0x517C_C1B7_2722_0A95);
    hash.rotate_left(17)
}

fn mix_replay_hash(current: u64, event_id: &str, tick: u64, sequence: u64) -> u64 {
    let mut hash = current ^ tick.wrapping_mul(0xA24B_1C62_5B93_2D47);
    hash ^= sequence.wrapping_mul(0x9E37_79B9_7F4A_7C15);
    for byte in event_id.as_bytes() {
        hash = hash.rotate_left(7) ^ u64::from(*byte);
        hash = hash.wrapping_mul(0x517C_C1B7_2722_0A95);
    }
    hash
}
