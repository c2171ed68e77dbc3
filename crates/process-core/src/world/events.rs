use super::*;

use contracts::EventType;
use serde_json::{json, Value};

use crate::behavior::{DecisionTrigger, NominationMethod, OracleKind, StageEvent};

fn trigger_label(trigger: DecisionTrigger) -> &'static str {
    match trigger {
        DecisionTrigger::Application => "application",
        DecisionTrigger::IdleRecheck => "idle_recheck",
        DecisionTrigger::SelfEvaluation => "self_evaluation",
        DecisionTrigger::Investigation => "investigation",
    }
}

fn render(stage_event: StageEvent) -> (EventType, Option<Value>) {
    match stage_event {
        StageEvent::Decided {
            trigger,
            status,
            amount,
        } => (
            EventType::EligibilityDecided,
            Some(json!({
                "trigger": trigger_label(trigger),
                "status": format!("{status:?}").to_lowercase(),
                "amount": amount,
            })),
        ),
        StageEvent::Nominated { method } => (
            EventType::InvestigationNominated,
            Some(json!({
                "method": match method {
                    NominationMethod::Model => "model",
                    NominationMethod::Random => "random",
                },
            })),
        ),
        StageEvent::InvestigationClosed { changed } => (
            EventType::InvestigationCompleted,
            Some(json!({ "changed": changed })),
        ),
        StageEvent::SelfEvaluationExit => (EventType::SelfEvaluationExited, None),
        StageEvent::RecourseRecommended { nonzero } => (
            EventType::RecourseRecommended,
            Some(json!({ "nonzero_entries": nonzero })),
        ),
        StageEvent::RecourseProgressed { acted, remaining } => (
            EventType::RecourseProgressed,
            Some(json!({ "acted": acted, "remaining": remaining })),
        ),
        StageEvent::RecourseCompleted => (EventType::RecourseCompleted, None),
        StageEvent::OracleFailed { oracle, message } => (
            EventType::OracleFailed,
            Some(json!({
                "oracle": match oracle {
                    OracleKind::Risk => "risk",
                    OracleKind::Recourse => "recourse",
                },
                "message": message,
            })),
        ),
    }
}

impl ProcessWorld {
    pub(super) fn push_event(
        &mut self,
        tick: u64,
        sequence_in_tick: &mut u64,
        agent_id: u64,
        stage_event: StageEvent,
    ) {
        *sequence_in_tick += 1;
        let sequence = *sequence_in_tick;
        let event_id = format!("evt_{tick:06}_{sequence:04}");
        let (event_type, details) = render(stage_event);

        // Fold the acting agent and event kind in, so equal event counts with
        // different trajectories still diverge.
        let fingerprint = format!("{event_id}:{agent_id}:{event_type:?}");
        self.replay_hash = mix_replay_hash(self.replay_hash, &fingerprint, tick, sequence);

        self.event_log.push(Event {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            run_id: self.config.run_id.clone(),
            event_id,
            tick,
            sequence_in_tick: sequence,
            agent_id,
            event_type,
            details,
        });
    }
}
