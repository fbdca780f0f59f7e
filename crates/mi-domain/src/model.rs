//! Entity types for the market-insight orchestrator (spec.md §3).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Session
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl SessionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionStatus::Completed | SessionStatus::Failed | SessionStatus::Cancelled
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Init,
    Gather,
    DebatePeer,
    DebateRedteam,
    Synthesize,
    Complete,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DegradeMode {
    #[default]
    Partial,
    Skip,
    Fail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub target_market: String,
    pub supply_chain: String,
    pub seller_type: String,
    pub min_price: f64,
    pub max_price: f64,
}

/// Per-session run configuration, taken verbatim from the stream/generate
/// request body (spec.md §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "d_debate_rounds")]
    pub debate_rounds: u8,
    #[serde(default)]
    pub enable_followup: bool,
    #[serde(default)]
    pub enable_websearch: bool,
    #[serde(default = "d_retry_max_attempts")]
    pub retry_max_attempts: u32,
    #[serde(default = "d_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
    #[serde(default = "d_degrade_mode")]
    pub degrade_mode: DegradeMode,
}

fn d_debate_rounds() -> u8 {
    0
}
fn d_retry_max_attempts() -> u32 {
    3
}
fn d_retry_backoff_ms() -> u64 {
    500
}
fn d_degrade_mode() -> DegradeMode {
    DegradeMode::Partial
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            debate_rounds: d_debate_rounds(),
            enable_followup: false,
            enable_websearch: false,
            retry_max_attempts: d_retry_max_attempts(),
            retry_backoff_ms: d_retry_backoff_ms(),
            degrade_mode: d_degrade_mode(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub profile: Profile,
    pub config: SessionConfig,
    pub status: SessionStatus,
    pub phase: SessionPhase,
    pub current_debate_round: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub synthesized_report: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evidence_pack: Option<EvidencePack>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_snapshot: Option<MemorySnapshot>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    pub fn new(id: Uuid, profile: Profile, config: SessionConfig) -> Self {
        let now = Utc::now();
        Self {
            id,
            profile,
            config,
            status: SessionStatus::Pending,
            phase: SessionPhase::Init,
            current_debate_round: 0,
            synthesized_report: None,
            evidence_pack: None,
            memory_snapshot: None,
            created_at: now,
            updated_at: now,
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// AgentResult
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Pending,
    Running,
    Completed,
    Degraded,
    Skipped,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentResult {
    pub session_id: Uuid,
    pub agent_name: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub thinking: String,
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    pub status: AgentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AgentResult {
    pub fn new_pending(session_id: Uuid, agent_name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            session_id,
            agent_name: agent_name.into(),
            content: String::new(),
            thinking: String::new(),
            sources: Vec::new(),
            confidence: None,
            status: AgentStatus::Pending,
            duration_ms: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// DebateExchange
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DebateType {
    PeerReview,
    RedTeam,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebateExchange {
    pub id: Uuid,
    pub session_id: Uuid,
    pub round_number: u8,
    pub debate_type: DebateType,
    pub challenger: String,
    pub responder: String,
    pub challenge_content: String,
    #[serde(default)]
    pub response_content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub followup_content: Option<String>,
    pub revised: bool,
    pub created_at: DateTime<Utc>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// WorkflowEvent
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowEvent {
    pub id: Uuid,
    pub session_id: Uuid,
    pub event_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// ToolInvocation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolInvocationStatus {
    Pending,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInvocation {
    pub invocation_id: Uuid,
    pub session_id: Uuid,
    pub agent: String,
    pub tool_name: String,
    #[serde(default)]
    pub context: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_name: Option<String>,
    pub status: ToolInvocationStatus,
    #[serde(default)]
    pub cache_hit: bool,
    /// Redacted request input.
    pub input: serde_json::Value,
    /// Redacted response output.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    pub estimated_input_tokens: u32,
    pub estimated_output_tokens: u32,
    pub estimated_cost_usd: f64,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// EvidencePack / MemorySnapshot
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claim {
    pub id: String,
    pub text: String,
    pub source_agents: Vec<String>,
    pub supporting_sources: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceSource {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(rename = "ref")]
    pub reference: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Traceability {
    pub claim_id: String,
    pub agent_result_ids: Vec<String>,
    pub tool_invocation_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EvidencePack {
    pub claims: Vec<Claim>,
    pub sources: Vec<EvidenceSource>,
    pub traceability: Vec<Traceability>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemorySnapshot {
    pub entities: Vec<String>,
    pub agent_highlights: std::collections::HashMap<String, Vec<String>>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Feedback (ambient, §3.AMBIENT)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feedback {
    pub id: Uuid,
    pub session_id: Uuid,
    pub rating: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_status_is_terminal() {
        assert!(SessionStatus::Completed.is_terminal());
        assert!(SessionStatus::Failed.is_terminal());
        assert!(SessionStatus::Cancelled.is_terminal());
        assert!(!SessionStatus::Pending.is_terminal());
        assert!(!SessionStatus::Running.is_terminal());
    }

    #[test]
    fn session_config_defaults() {
        let cfg = SessionConfig::default();
        assert_eq!(cfg.debate_rounds, 0);
        assert!(!cfg.enable_websearch);
        assert_eq!(cfg.retry_max_attempts, 3);
        assert!(matches!(cfg.degrade_mode, DegradeMode::Partial));
    }

    #[test]
    fn session_new_starts_pending_init() {
        let s = Session::new(
            Uuid::new_v4(),
            Profile {
                target_market: "Germany".into(),
                supply_chain: "Consumer Electronics".into(),
                seller_type: "brand".into(),
                min_price: 30.0,
                max_price: 90.0,
            },
            SessionConfig::default(),
        );
        assert_eq!(s.status, SessionStatus::Pending);
        assert_eq!(s.phase, SessionPhase::Init);
        assert_eq!(s.current_debate_round, 0);
    }
}
