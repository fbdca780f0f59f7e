//! The orchestrator event taxonomy (spec.md §6). One `OrchestratorEvent`
//! variant per SSE event type; `#[serde(tag = "type")]` makes the wire
//! shape match the taxonomy table exactly (`data: {"type": "agent_start", ...}`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum OrchestratorEvent {
    #[serde(rename = "orchestrator_start")]
    OrchestratorStart {
        session_id: Uuid,
        timestamp: DateTime<Utc>,
    },
    #[serde(rename = "orchestrator_end")]
    OrchestratorEnd {
        final_report: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        report_html_url: Option<String>,
    },
    #[serde(rename = "agent_start")]
    AgentStart {
        agent: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        task: Option<String>,
    },
    #[serde(rename = "agent_thinking_chunk")]
    AgentThinkingChunk { agent: String, content: String },
    #[serde(rename = "agent_chunk")]
    AgentChunk { agent: String, content: String },
    #[serde(rename = "agent_end")]
    AgentEnd {
        agent: String,
        status: String,
        duration_ms: u64,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    #[serde(rename = "agent_error")]
    AgentError { agent: String, error: String },
    #[serde(rename = "tool_start")]
    ToolStart {
        tool: String,
        agent: String,
        input: serde_json::Value,
    },
    #[serde(rename = "tool_end")]
    ToolEnd {
        tool: String,
        agent: String,
        output: serde_json::Value,
        duration_ms: u64,
        cache_hit: bool,
    },
    #[serde(rename = "tool_error")]
    ToolError {
        tool: String,
        agent: String,
        error: String,
    },
    #[serde(rename = "guardrail_triggered")]
    GuardrailTriggered {
        #[serde(skip_serializing_if = "Option::is_none")]
        agent: Option<String>,
        rule: String,
        details: String,
    },
    #[serde(rename = "retry")]
    Retry {
        target_type: String,
        target_id: String,
        attempt: u32,
    },
    #[serde(rename = "debate_round_start")]
    DebateRoundStart {
        round_number: u8,
        debate_type: String,
        participants: Vec<String>,
    },
    #[serde(rename = "debate_round_end")]
    DebateRoundEnd { round_number: u8 },
    #[serde(rename = "agent_challenge")]
    AgentChallenge {
        round_number: u8,
        from_agent: String,
        to_agent: String,
        challenge_content: String,
    },
    #[serde(rename = "agent_challenge_end")]
    AgentChallengeEnd {
        round_number: u8,
        from_agent: String,
        to_agent: String,
        challenge_content: String,
    },
    #[serde(rename = "agent_respond")]
    AgentRespond {
        round_number: u8,
        from_agent: String,
        to_agent: String,
        response_content: String,
        revised: bool,
    },
    #[serde(rename = "agent_respond_end")]
    AgentRespondEnd {
        round_number: u8,
        from_agent: String,
        to_agent: String,
        response_content: String,
        revised: bool,
    },
    #[serde(rename = "agent_followup_end")]
    AgentFollowupEnd {
        round_number: u8,
        from_agent: String,
        to_agent: String,
        followup_content: String,
    },
    #[serde(rename = "consensus_reached")]
    ConsensusReached {
        #[serde(skip_serializing_if = "Option::is_none")]
        summary: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        confidence: Option<f64>,
    },
    #[serde(rename = "error")]
    Error { error: String },
}

impl OrchestratorEvent {
    /// The `event_type` string recorded on the `WorkflowEvent` audit row,
    /// matching the `type` tag used on the wire.
    pub fn event_type(&self) -> &'static str {
        match self {
            OrchestratorEvent::OrchestratorStart { .. } => "orchestrator_start",
            OrchestratorEvent::OrchestratorEnd { .. } => "orchestrator_end",
            OrchestratorEvent::AgentStart { .. } => "agent_start",
            OrchestratorEvent::AgentThinkingChunk { .. } => "agent_thinking_chunk",
            OrchestratorEvent::AgentChunk { .. } => "agent_chunk",
            OrchestratorEvent::AgentEnd { .. } => "agent_end",
            OrchestratorEvent::AgentError { .. } => "agent_error",
            OrchestratorEvent::ToolStart { .. } => "tool_start",
            OrchestratorEvent::ToolEnd { .. } => "tool_end",
            OrchestratorEvent::ToolError { .. } => "tool_error",
            OrchestratorEvent::GuardrailTriggered { .. } => "guardrail_triggered",
            OrchestratorEvent::Retry { .. } => "retry",
            OrchestratorEvent::DebateRoundStart { .. } => "debate_round_start",
            OrchestratorEvent::DebateRoundEnd { .. } => "debate_round_end",
            OrchestratorEvent::AgentChallenge { .. } => "agent_challenge",
            OrchestratorEvent::AgentChallengeEnd { .. } => "agent_challenge_end",
            OrchestratorEvent::AgentRespond { .. } => "agent_respond",
            OrchestratorEvent::AgentRespondEnd { .. } => "agent_respond_end",
            OrchestratorEvent::AgentFollowupEnd { .. } => "agent_followup_end",
            OrchestratorEvent::ConsensusReached { .. } => "consensus_reached",
            OrchestratorEvent::Error { .. } => "error",
        }
    }

    /// Whether this event carries a high-frequency streaming chunk —
    /// these are not individually durability-checked (spec.md §8 invariant 4
    /// excludes "chunk streams").
    pub fn is_chunk(&self) -> bool {
        matches!(
            self,
            OrchestratorEvent::AgentThinkingChunk { .. } | OrchestratorEvent::AgentChunk { .. }
        )
    }

    pub fn agent_name(&self) -> Option<&str> {
        match self {
            OrchestratorEvent::AgentStart { agent, .. }
            | OrchestratorEvent::AgentThinkingChunk { agent, .. }
            | OrchestratorEvent::AgentChunk { agent, .. }
            | OrchestratorEvent::AgentEnd { agent, .. }
            | OrchestratorEvent::AgentError { agent, .. } => Some(agent),
            OrchestratorEvent::ToolStart { agent, .. }
            | OrchestratorEvent::ToolEnd { agent, .. }
            | OrchestratorEvent::ToolError { agent, .. } => Some(agent),
            _ => None,
        }
    }
}
