//! One behavior per stage kind, selected by explicit match.
//!
//! Every behavior consumes the agent and the simulation context and returns
//! the agent's next node plus the events the stage produced. Draw order
//! within a tick is fixed: recourse difficulty draws (canonical feature
//! order), then the self-evaluation draw, then nomination (model call first,
//! at most one random draw), then the transition draw.

use std::collections::BTreeSet;

use contracts::features::FEATURE_COUNT;
use contracts::{AgentStatus, AgentTag, StageKind};

use crate::agent::Claimant;
use crate::graph::NodeId;
use crate::world::SimContext;
use crate::{eligibility, nomination, recourse, SimError};

// ---------------------------------------------------------------------------
// Stage events
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionTrigger {
    Application,
    IdleRecheck,
    SelfEvaluation,
    Investigation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NominationMethod {
    Model,
    Random,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OracleKind {
    Risk,
    Recourse,
}

/// What a stage did to an agent this tick, for the world's event log.
#[derive(Debug, Clone, PartialEq)]
pub enum StageEvent {
    Decided {
        trigger: DecisionTrigger,
        status: AgentStatus,
        amount: i64,
    },
    Nominated {
        method: NominationMethod,
    },
    InvestigationClosed {
        changed: bool,
    },
    SelfEvaluationExit,
    RecourseRecommended {
        nonzero: usize,
    },
    RecourseProgressed {
        acted: usize,
        remaining: usize,
    },
    RecourseCompleted,
    OracleFailed {
        oracle: OracleKind,
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct StageOutcome {
    pub next_node: NodeId,
    pub events: Vec<StageEvent>,
}

impl StageOutcome {
    fn movement(next_node: NodeId) -> Self {
        Self {
            next_node,
            events: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

/// Run the behavior bound to the agent's current node.
pub fn run_stage(agent: &mut Claimant, ctx: &mut SimContext) -> Result<StageOutcome, SimError> {
    match ctx.graph.kind_of(agent.node)? {
        StageKind::Idle => idle(agent, ctx),
        StageKind::Application => application(agent, ctx),
        StageKind::Decision => decision(agent, ctx),
        StageKind::PostDecision => post_decision(agent, ctx),
        StageKind::ReceivingBenefits => receiving_benefits(agent, ctx),
        StageKind::Investigation => investigation(agent, ctx),
        StageKind::PostInvestigation => post_investigation(agent, ctx),
        StageKind::Recourse => recourse_referral(agent, ctx),
        StageKind::Complaint => Err(SimError::MalformedTopology(format!(
            "agent {} reached node {}: no behavior bound to stage Complaint",
            agent.id, agent.node
        ))),
    }
}

// ---------------------------------------------------------------------------
// Behaviors
// ---------------------------------------------------------------------------

/// Out of the process. An agent carrying an unimplemented recommendation
/// keeps working on it and re-applies once the changes make it eligible;
/// everyone else drifts along the default edges.
fn idle(agent: &mut Claimant, ctx: &mut SimContext) -> Result<StageOutcome, SimError> {
    if agent.has_pending_recommendation() {
        let mut events = Vec::new();
        apply_pending_recommendation(agent, ctx, &mut events);

        let (status, amount) = eligibility::evaluate(&agent.features);
        agent.record_decision(status, amount);
        events.push(StageEvent::Decided {
            trigger: DecisionTrigger::IdleRecheck,
            status,
            amount,
        });

        let next_node = if status == AgentStatus::Accepted {
            ctx.stage(StageKind::Application)?
        } else {
            agent.node
        };
        return Ok(StageOutcome { next_node, events });
    }

    let next_node = ctx.select_from(agent.node, &BTreeSet::new())?;
    Ok(StageOutcome::movement(next_node))
}

fn application(agent: &mut Claimant, ctx: &mut SimContext) -> Result<StageOutcome, SimError> {
    let next_node = ctx.select_from(agent.node, &BTreeSet::new())?;
    Ok(StageOutcome::movement(next_node))
}

fn decision(agent: &mut Claimant, ctx: &mut SimContext) -> Result<StageOutcome, SimError> {
    let (status, amount) = eligibility::evaluate(&agent.features);
    agent.record_decision(status, amount);
    Ok(StageOutcome {
        next_node: ctx.stage(StageKind::PostDecision)?,
        events: vec![StageEvent::Decided {
            trigger: DecisionTrigger::Application,
            status,
            amount,
        }],
    })
}

fn post_decision(agent: &mut Claimant, ctx: &mut SimContext) -> Result<StageOutcome, SimError> {
    if agent.status == AgentStatus::Accepted {
        agent.cycles_since_investigation = 0;
        return Ok(StageOutcome::movement(
            ctx.stage(StageKind::ReceivingBenefits)?,
        ));
    }
    let excluded = BTreeSet::from([ctx.stage(StageKind::ReceivingBenefits)?]);
    let next_node = ctx.select_from(agent.node, &excluded)?;
    Ok(StageOutcome::movement(next_node))
}

fn receiving_benefits(
    agent: &mut Claimant,
    ctx: &mut SimContext,
) -> Result<StageOutcome, SimError> {
    let mut events = Vec::new();
    if agent.has_pending_recommendation() {
        apply_pending_recommendation(agent, ctx, &mut events);
    }

    // Occasional self-evaluation; a now-ineligible agent reports the change
    // and leaves the process, skipping the rest of this tick's logic.
    if ctx.rng.chance(ctx.self_evaluation_p) {
        let (status, amount) = eligibility::evaluate(&agent.features);
        if status == AgentStatus::Rejected {
            agent.record_decision(status, amount);
            events.push(StageEvent::Decided {
                trigger: DecisionTrigger::SelfEvaluation,
                status,
                amount,
            });
            events.push(StageEvent::SelfEvaluationExit);
            return Ok(StageOutcome {
                next_node: ctx.stage(StageKind::Idle)?,
                events,
            });
        }
    }

    agent.cycles_since_investigation += 1;
    let investigation = ctx.stage(StageKind::Investigation)?;

    if agent.cycles_since_investigation >= ctx.investigation_frequency {
        // Model nomination first; the random draw happens only if the model
        // declines. Reordering this changes stream consumption.
        match nomination::nominate_model(&agent.features, ctx.risk_oracle.as_deref()) {
            Ok(true) => {
                agent.model_investigations += 1;
                events.push(StageEvent::Nominated {
                    method: NominationMethod::Model,
                });
                return Ok(StageOutcome {
                    next_node: investigation,
                    events,
                });
            }
            Ok(false) => {}
            Err(err) => events.push(StageEvent::OracleFailed {
                oracle: OracleKind::Risk,
                message: err.to_string(),
            }),
        }

        if nomination::nominate_random(ctx.random_nomination_p, &mut ctx.rng) {
            agent.options.insert(AgentTag::FlaggedByRandom);
            events.push(StageEvent::Nominated {
                method: NominationMethod::Random,
            });
            return Ok(StageOutcome {
                next_node: investigation,
                events,
            });
        }
    }

    let excluded = BTreeSet::from([investigation]);
    let next_node = ctx.select_from(agent.node, &excluded)?;
    Ok(StageOutcome { next_node, events })
}

fn investigation(agent: &mut Claimant, ctx: &mut SimContext) -> Result<StageOutcome, SimError> {
    let (status, amount) = eligibility::evaluate(&agent.features);
    let changed = status != agent.status || amount != agent.outcome;
    if !changed {
        agent.options.insert(AgentTag::NoChangeOnReinvestigation);
    }
    agent.record_decision(status, amount);
    agent.cycles_since_investigation = 0;
    agent.investigations += 1;

    Ok(StageOutcome {
        next_node: ctx.stage(StageKind::PostInvestigation)?,
        events: vec![
            StageEvent::Decided {
                trigger: DecisionTrigger::Investigation,
                status,
                amount,
            },
            StageEvent::InvestigationClosed { changed },
        ],
    })
}

fn post_investigation(
    agent: &mut Claimant,
    ctx: &mut SimContext,
) -> Result<StageOutcome, SimError> {
    agent.options.remove(&AgentTag::NoChangeOnReinvestigation);

    if agent.options.remove(&AgentTag::FlaggedByRandom) {
        let next_node = if agent.status == AgentStatus::Accepted {
            ctx.stage(StageKind::ReceivingBenefits)?
        } else {
            ctx.stage(StageKind::Idle)?
        };
        return Ok(StageOutcome::movement(next_node));
    }

    let excluded = if agent.status == AgentStatus::Accepted {
        BTreeSet::from([ctx.stage(StageKind::Idle)?])
    } else {
        BTreeSet::from([ctx.stage(StageKind::ReceivingBenefits)?])
    };
    let next_node = ctx.select_from(agent.node, &excluded)?;
    Ok(StageOutcome::movement(next_node))
}

/// Request a recommendation from the recourse oracle, then route by status:
/// rejected agents pursue the changes from outside the process.
fn recourse_referral(agent: &mut Claimant, ctx: &mut SimContext) -> Result<StageOutcome, SimError> {
    let mut events = Vec::new();

    if let Some(oracle) = ctx.recourse_oracle.as_deref() {
        match oracle.recommend(&agent.features, ctx.target_label) {
            Ok(deltas) if deltas.len() == FEATURE_COUNT => {
                let nonzero = deltas.iter().filter(|delta| **delta != 0).count();
                agent.recommendation = Some(deltas);
                events.push(StageEvent::RecourseRecommended { nonzero });
            }
            Ok(deltas) => events.push(StageEvent::OracleFailed {
                oracle: OracleKind::Recourse,
                message: format!(
                    "recommendation has {} entries, expected {FEATURE_COUNT}",
                    deltas.len()
                ),
            }),
            Err(err) => events.push(StageEvent::OracleFailed {
                oracle: OracleKind::Recourse,
                message: err.to_string(),
            }),
        }
    }

    let next_node = if agent.status == AgentStatus::Rejected {
        ctx.stage(StageKind::Idle)?
    } else {
        ctx.stage(StageKind::ReceivingBenefits)?
    };
    Ok(StageOutcome { next_node, events })
}

// ---------------------------------------------------------------------------
// Shared pieces
// ---------------------------------------------------------------------------

fn apply_pending_recommendation(
    agent: &mut Claimant,
    ctx: &mut SimContext,
    events: &mut Vec<StageEvent>,
) {
    let Some(mut deltas) = agent.recommendation.take() else {
        return;
    };
    let pass = recourse::apply(
        &mut agent.features,
        &mut deltas,
        &ctx.difficulties,
        &mut ctx.rng,
    );
    if pass.remaining == 0 {
        events.push(StageEvent::RecourseCompleted);
    } else {
        agent.recommendation = Some(deltas);
        events.push(StageEvent::RecourseProgressed {
            acted: pass.acted,
            remaining: pass.remaining,
        });
    }
}
