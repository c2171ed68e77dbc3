//! v1 cross-boundary contracts for the assistance-process kernel, API, and
//! persistence layers.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub mod features;
pub mod serde_u64_string;

use features::FeatureVector;

pub const SCHEMA_VERSION_V1: &str = "1.0";

// ---------------------------------------------------------------------------
// Stage vocabulary
// ---------------------------------------------------------------------------

/// The fixed vocabulary of stage kinds a topology may assign to its nodes.
///
/// `Complaint` is declared but carries no behavior; topologies may mention it,
/// the kernel refuses to dispatch an agent standing on such a node.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    Idle,
    Application,
    Decision,
    PostDecision,
    ReceivingBenefits,
    Investigation,
    PostInvestigation,
    Recourse,
    Complaint,
}

impl StageKind {
    pub const ALL: [StageKind; 9] = [
        StageKind::Idle,
        StageKind::Application,
        StageKind::Decision,
        StageKind::PostDecision,
        StageKind::ReceivingBenefits,
        StageKind::Investigation,
        StageKind::PostInvestigation,
        StageKind::Recourse,
        StageKind::Complaint,
    ];

    /// The token used for this kind in topology descriptions.
    pub fn token(self) -> &'static str {
        match self {
            StageKind::Idle => "Idle",
            StageKind::Application => "Application",
            StageKind::Decision => "Decision",
            StageKind::PostDecision => "PostDecision",
            StageKind::ReceivingBenefits => "ReceivingBenefits",
            StageKind::Investigation => "Investigation",
            StageKind::PostInvestigation => "PostInvestigation",
            StageKind::Recourse => "Recourse",
            StageKind::Complaint => "Complaint",
        }
    }

    /// Reverse lookup from a topology token.
    pub fn parse_token(token: &str) -> Option<StageKind> {
        StageKind::ALL.into_iter().find(|kind| kind.token() == token)
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

// ---------------------------------------------------------------------------
// Agent state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Accepted,
    Rejected,
    #[default]
    Unset,
}

/// Transient tags set by one stage and consumed by a later one.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum AgentTag {
    FlaggedByRandom,
    NoChangeOnReinvestigation,
}

// ---------------------------------------------------------------------------
// Run configuration & status
// ---------------------------------------------------------------------------

fn default_self_evaluation_p() -> f64 {
    1.0 / 12.0
}

fn default_reference_oracles() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunConfig {
    pub schema_version: String,
    pub run_id: String,
    #[serde(with = "serde_u64_string")]
    pub seed: u64,
    pub agent_count: usize,
    pub max_ticks: u64,
    /// Minimum benefit cycles between investigations of the same agent.
    pub investigation_frequency: u64,
    /// Per-cycle probability of a uniform-random investigation nomination.
    pub random_nomination_p: f64,
    /// Per-cycle probability that a receiving agent re-checks its own
    /// eligibility and reports a change.
    #[serde(default = "default_self_evaluation_p")]
    pub self_evaluation_p: f64,
    /// Label the recourse oracle is asked to steer agents toward.
    pub target_label: i64,
    pub snapshot_every_ticks: u64,
    /// Inline topology description; the built-in standard topology when None.
    #[serde(default)]
    pub topology: Option<String>,
    /// Wire the built-in reference oracles (linear risk scorer,
    /// target-profile recourse generator) into the run.
    #[serde(default = "default_reference_oracles")]
    pub reference_oracles: bool,
    #[serde(default)]
    pub notes: Option<String>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            run_id: "run_local_001".to_string(),
            seed: 1337,
            agent_count: 50,
            max_ticks: 120,
            investigation_frequency: 4,
            random_nomination_p: 0.175,
            self_evaluation_p: default_self_evaluation_p(),
            target_label: 0,
            snapshot_every_ticks: 12,
            topology: None,
            reference_oracles: true,
            notes: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    Running,
    Paused,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunStatus {
    pub schema_version: String,
    pub run_id: String,
    pub current_tick: u64,
    pub max_ticks: u64,
    pub mode: RunMode,
}

impl RunStatus {
    pub fn is_complete(&self) -> bool {
        self.current_tick >= self.max_ticks
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "run_id={} tick={}/{} mode={:?}",
            self.run_id, self.current_tick, self.max_ticks, self.mode
        )
    }
}

// ---------------------------------------------------------------------------
// Event log
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    EligibilityDecided,
    InvestigationNominated,
    InvestigationCompleted,
    SelfEvaluationExited,
    RecourseRecommended,
    RecourseProgressed,
    RecourseCompleted,
    OracleFailed,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Event {
    pub schema_version: String,
    pub run_id: String,
    pub event_id: String,
    pub tick: u64,
    pub sequence_in_tick: u64,
    pub agent_id: u64,
    pub event_type: EventType,
    #[serde(default)]
    pub details: Option<Value>,
}

// ---------------------------------------------------------------------------
// Snapshots
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentSnapshot {
    pub agent_id: u64,
    pub node: usize,
    pub stage_kind: StageKind,
    pub status: AgentStatus,
    pub outcome: i64,
    pub cycles_since_investigation: u64,
    pub investigations: u64,
    pub model_investigations: u64,
    pub options: Vec<AgentTag>,
    #[serde(default)]
    pub pending_recommendation: Option<Vec<i64>>,
    pub features: FeatureVector,
}

/// Population-level counters derived at snapshot time.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunTallies {
    pub receiving: usize,
    pub idle: usize,
    pub accepted: usize,
    pub rejected: usize,
    pub investigations_total: u64,
    pub model_investigations_total: u64,
    pub benefits_outlay: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Snapshot {
    pub schema_version: String,
    pub run_id: String,
    pub tick: u64,
    #[serde(with = "serde_u64_string")]
    pub replay_hash: u64,
    pub tallies: RunTallies,
    pub agents: Vec<AgentSnapshot>,
}

// ---------------------------------------------------------------------------
// API error envelope
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    RunNotFound,
    InvalidQuery,
    InvalidCommand,
    RunStateConflict,
    InternalError,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiError {
    pub schema_version: String,
    pub code: ErrorCode,
    pub message: String,
    #[serde(default)]
    pub details: Option<String>,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>, details: Option<String>) -> Self {
        Self {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            code,
            message: message.into(),
            details,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_kind_tokens_round_trip() {
        for kind in StageKind::ALL {
            assert_eq!(StageKind::parse_token(kind.token()), Some(kind));
        }
        assert_eq!(StageKind::parse_token("Appeal"), None);
    }

    #[test]
    fn run_config_round_trips_with_string_seed() {
        let config = RunConfig {
            seed: u64::MAX,
            ..RunConfig::default()
        };
        let encoded = serde_json::to_string(&config).expect("serialize");
        assert!(encoded.contains(&format!("\"{}\"", u64::MAX)));
        let decoded: RunConfig = serde_json::from_str(&encoded).expect("deserialize");
        assert_eq!(config, decoded);
    }

    #[test]
    fn run_status_reports_completion() {
        let status = RunStatus {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            run_id: "run_x".to_string(),
            current_tick: 12,
            max_ticks: 12,
            mode: RunMode::Paused,
        };
        assert!(status.is_complete());
        assert!(status.to_string().contains("tick=12/12"));
    }
}
