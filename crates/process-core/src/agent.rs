//! The simulated individual: stable identity, current stage node, decision
//! state, transient tags, investigation counters, and the exclusively-owned
//! feature record.

use std::collections::BTreeSet;

use contracts::features::FeatureVector;
use contracts::{AgentSnapshot, AgentStatus, AgentTag, StageKind};

use crate::graph::NodeId;

/// One individual moving through the process.
///
/// Agents are created once at simulation start and persist for the whole run;
/// "leaving the process" is a transition back to Idle, never deletion.
#[derive(Debug, Clone, PartialEq)]
pub struct Claimant {
    pub id: u64,
    pub node: NodeId,
    pub status: AgentStatus,
    /// Non-negative monthly benefit amount; 0 unless Accepted.
    pub outcome: i64,
    /// Transient tags set by one stage and cleared by a later one.
    pub options: BTreeSet<AgentTag>,
    /// Signed per-feature deltas still to implement, in canonical order.
    pub recommendation: Option<Vec<i64>>,
    pub cycles_since_investigation: u64,
    pub investigations: u64,
    pub model_investigations: u64,
    pub features: FeatureVector,
}

impl Claimant {
    pub fn new(id: u64, node: NodeId, features: FeatureVector) -> Self {
        Self {
            id,
            node,
            status: AgentStatus::Unset,
            outcome: 0,
            options: BTreeSet::new(),
            recommendation: None,
            cycles_since_investigation: 0,
            investigations: 0,
            model_investigations: 0,
            features,
        }
    }

    /// A recommendation counts as pending only while it has nonzero entries.
    pub fn has_pending_recommendation(&self) -> bool {
        self.recommendation
            .as_ref()
            .is_some_and(|deltas| deltas.iter().any(|delta| *delta != 0))
    }

    pub fn record_decision(&mut self, status: AgentStatus, outcome: i64) {
        self.status = status;
        self.outcome = outcome;
    }

    pub fn to_snapshot(&self, stage_kind: StageKind) -> AgentSnapshot {
        AgentSnapshot {
            agent_id: self.id,
            node: self.node,
            stage_kind,
            status: self.status,
            outcome: self.outcome,
            cycles_since_investigation: self.cycles_since_investigation,
            investigations: self.investigations,
            model_investigations: self.model_investigations,
            options: self.options.iter().copied().collect(),
            pending_recommendation: self.recommendation.clone(),
            features: self.features.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::features::FEATURE_COUNT;

    #[test]
    fn new_agent_starts_unset_with_zeroed_counters() {
        let agent = Claimant::new(7, 0, FeatureVector::default());
        assert_eq!(agent.status, AgentStatus::Unset);
        assert_eq!(agent.outcome, 0);
        assert_eq!(agent.cycles_since_investigation, 0);
        assert_eq!(agent.investigations, 0);
        assert!(agent.options.is_empty());
        assert!(!agent.has_pending_recommendation());
    }

    #[test]
    fn zeroed_recommendation_is_not_pending() {
        let mut agent = Claimant::new(1, 0, FeatureVector::default());
        agent.recommendation = Some(vec![0; FEATURE_COUNT]);
        assert!(!agent.has_pending_recommendation());

        let mut deltas = vec![0; FEATURE_COUNT];
        deltas[6] = -3;
        agent.recommendation = Some(deltas);
        assert!(agent.has_pending_recommendation());
    }
}
