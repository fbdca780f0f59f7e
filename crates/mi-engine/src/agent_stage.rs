//! Agent Stage (spec.md §4.2): assemble a role prompt, call the LLM
//! adapter, consume the streaming response, split it into thinking/report
//! halves, and accumulate an `AgentResult`.
//!
//! Grounded on `crates/gateway/src/runtime/turn.rs`'s `run_turn_inner` —
//! the `while let Some(event) = stream.next().await` consumption loop,
//! emitting an event per chunk and finalizing into a persisted record on
//! stream close. Tool dispatch is capped at a small number of rounds the
//! same way `turn.rs` bounds its loop with `MAX_TOOL_LOOPS`, generalized
//! here to `MAX_TOOL_ROUNDS` since a market-insight agent only ever needs
//! the web-search tool once or twice per call.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use futures_util::StreamExt;
use mi_domain::events::OrchestratorEvent;
use mi_domain::message::{Message, ToolDefinition};
use mi_domain::model::{AgentResult, AgentStatus, ToolInvocation, ToolInvocationStatus};
use mi_domain::stream::{StreamEvent, Usage};
use mi_providers::{ChatRequest, LlmProvider};
use mi_tools::ToolRegistry;
use uuid::Uuid;

use crate::cancel::CancelToken;
use crate::content::split_thinking_report;
use crate::events::EventSink;

const MAX_TOOL_ROUNDS: u32 = 3;

pub struct AgentStageInput {
    pub session_id: Uuid,
    pub agent_name: String,
    pub system_prompt: String,
    pub user_prompt: String,
    pub provider: Arc<dyn LlmProvider>,
    pub model: Option<String>,
    pub tool_registry: Option<Arc<ToolRegistry>>,
    pub persistence: Option<Arc<mi_persistence::PersistenceGateway>>,
    pub enable_websearch: bool,
}

/// Run one agent stage to completion (or cancellation), emitting events on
/// `events_tx` along the way, and return the accumulated `AgentResult`.
pub async fn run_agent_stage(input: AgentStageInput, events_tx: &EventSink, cancel: &CancelToken) -> AgentResult {
    let started_at = Utc::now();
    events_tx
        .emit(OrchestratorEvent::AgentStart {
            agent: input.agent_name.clone(),
            task: None,
        })
        .await;

    let mut messages = vec![
        Message::system(input.system_prompt.clone()),
        Message::user(input.user_prompt.clone()),
    ];

    let tool_defs = if input.enable_websearch {
        vec![web_search_tool_definition()]
    } else {
        Vec::new()
    };

    let mut raw_buf = String::new();
    let mut emitted_thinking_len = 0usize;
    let mut emitted_report_len = 0usize;
    let mut usage: Option<Usage> = None;
    let mut finish_reason: Option<String> = None;
    let mut round = 0u32;
    let mut error: Option<String> = None;

    'rounds: loop {
        round += 1;
        let request = ChatRequest {
            messages: messages.clone(),
            tools: tool_defs.clone(),
            model: input.model.clone(),
            ..Default::default()
        };

        let mut stream = match input.provider.chat_stream(&request).await {
            Ok(s) => s,
            Err(e) => {
                error = Some(e.to_string());
                break 'rounds;
            }
        };

        let mut pending_tool_calls: HashMap<String, (String, String)> = HashMap::new();
        let mut tool_call_order: Vec<String> = Vec::new();

        while let Some(event) = stream.next().await {
            if cancel.is_cancelled() {
                error = Some("cancelled".into());
                break 'rounds;
            }
            let event = match event {
                Ok(event) => event,
                Err(e) => {
                    error = Some(e.to_string());
                    break 'rounds;
                }
            };
            match event {
                StreamEvent::Token { text } => {
                    raw_buf.push_str(&text);
                    emit_deltas(
                        &input.agent_name,
                        &raw_buf,
                        &mut emitted_thinking_len,
                        &mut emitted_report_len,
                        events_tx,
                    )
                    .await;
                }
                StreamEvent::Thinking { text } => {
                    events_tx
                        .emit(OrchestratorEvent::AgentThinkingChunk {
                            agent: input.agent_name.clone(),
                            content: text,
                        })
                        .await;
                }
                StreamEvent::ToolCallStarted { call_id, tool_name } => {
                    pending_tool_calls.insert(call_id.clone(), (tool_name, String::new()));
                    tool_call_order.push(call_id);
                }
                StreamEvent::ToolCallDelta { call_id, delta } => {
                    if let Some((_, args)) = pending_tool_calls.get_mut(&call_id) {
                        args.push_str(&delta);
                    }
                }
                StreamEvent::ToolCallFinished {
                    call_id,
                    tool_name,
                    arguments,
                } => {
                    pending_tool_calls.insert(call_id, (tool_name, arguments.to_string()));
                }
                StreamEvent::Done {
                    usage: u,
                    finish_reason: fr,
                } => {
                    usage = u;
                    finish_reason = fr;
                }
                StreamEvent::Error { message } => {
                    error = Some(message);
                    break 'rounds;
                }
            }
        }

        if tool_call_order.is_empty() || round >= MAX_TOOL_ROUNDS {
            break 'rounds;
        }

        for call_id in &tool_call_order {
            let Some((tool_name, args_json)) = pending_tool_calls.get(call_id) else {
                continue;
            };
            let args: serde_json::Value =
                serde_json::from_str(args_json).unwrap_or_else(|_| serde_json::json!({}));
            let result_text = dispatch_tool_call(&input, tool_name, args, events_tx).await;
            messages.push(Message::tool_result(call_id.clone(), result_text));
        }
    }

    let (thinking, report) = split_thinking_report(&raw_buf);
    let duration_ms = (Utc::now() - started_at).num_milliseconds().max(0) as u64;

    let (status, error_msg) = match &error {
        Some(e) => (AgentStatus::Failed, Some(e.clone())),
        None => (AgentStatus::Completed, None),
    };

    events_tx
        .emit(OrchestratorEvent::AgentEnd {
            agent: input.agent_name.clone(),
            status: format!("{status:?}").to_lowercase(),
            duration_ms,
            error: error_msg.clone(),
        })
        .await;

    let _ = finish_reason;
    let _ = usage;

    let mut result = AgentResult::new_pending(input.session_id, input.agent_name.clone());
    result.content = report;
    result.thinking = thinking;
    result.status = status;
    result.duration_ms = Some(duration_ms);
    result.error = error_msg;
    result.updated_at = Utc::now();
    result
}

async fn emit_deltas(
    agent: &str,
    raw_buf: &str,
    emitted_thinking_len: &mut usize,
    emitted_report_len: &mut usize,
    events_tx: &EventSink,
) {
    let (thinking, report) = split_thinking_report(raw_buf);
    if thinking.len() > *emitted_thinking_len {
        let delta = thinking[*emitted_thinking_len..].to_string();
        *emitted_thinking_len = thinking.len();
        if !delta.is_empty() {
            events_tx
                .emit(OrchestratorEvent::AgentThinkingChunk {
                    agent: agent.to_string(),
                    content: delta,
                })
                .await;
        }
    }
    if report.len() > *emitted_report_len {
        let delta = report[*emitted_report_len..].to_string();
        *emitted_report_len = report.len();
        if !delta.is_empty() {
            events_tx
                .emit(OrchestratorEvent::AgentChunk {
                    agent: agent.to_string(),
                    content: delta,
                })
                .await;
        }
    }
}

/// Dispatch one accumulated tool call: check guardrails, invoke through the
/// registry, and persist a `ToolInvocation` record (spec.md §4.5/§4.6) for
/// both the cost-guardrail running total and the session's tool-usage audit
/// trail, alongside the usual `tool_start`/`tool_end`/`tool_error` events.
async fn dispatch_tool_call(
    input: &AgentStageInput,
    tool_name: &str,
    args: serde_json::Value,
    events_tx: &EventSink,
) -> String {
    events_tx
        .emit(OrchestratorEvent::ToolStart {
            tool: tool_name.to_string(),
            agent: input.agent_name.clone(),
            input: args.clone(),
        })
        .await;

    let Some(registry) = &input.tool_registry else {
        events_tx
            .emit(OrchestratorEvent::ToolError {
                tool: tool_name.to_string(),
                agent: input.agent_name.clone(),
                error: "no tool registry configured".into(),
            })
            .await;
        return "tool registry unavailable".to_string();
    };

    if registry.error_rate_guardrail_tripped(&input.session_id, tool_name) {
        events_tx
            .emit(OrchestratorEvent::GuardrailTriggered {
                agent: Some(input.agent_name.clone()),
                rule: "tool_error_rate".into(),
                details: format!("{tool_name} exceeded its error-rate ceiling; skipping this call"),
            })
            .await;
        return "guardrail_triggered: tool error rate exceeded".to_string();
    }

    if let Some(persistence) = &input.persistence {
        let cumulative = persistence.tool_invocations.cumulative_cost_usd(&input.session_id);
        if registry.cost_guardrail_tripped(cumulative) {
            events_tx
                .emit(OrchestratorEvent::GuardrailTriggered {
                    agent: Some(input.agent_name.clone()),
                    rule: "tool_cost".into(),
                    details: format!("cumulative estimated tool cost ${cumulative:.4} exceeded the ceiling"),
                })
                .await;
            return "guardrail_triggered: tool cost ceiling exceeded".to_string();
        }
    }

    let started_at = Utc::now();
    let invocation_id = Uuid::new_v4();
    if let Some(persistence) = &input.persistence {
        persistence.tool_invocations.upsert(ToolInvocation {
            invocation_id,
            session_id: input.session_id,
            agent: input.agent_name.clone(),
            tool_name: tool_name.to_string(),
            context: String::new(),
            model_name: input.model.clone(),
            status: ToolInvocationStatus::Pending,
            cache_hit: false,
            input: args.clone(),
            output: None,
            duration_ms: None,
            estimated_input_tokens: 0,
            estimated_output_tokens: 0,
            estimated_cost_usd: 0.0,
            started_at,
            finished_at: None,
        });
    }

    let outcome = registry.invoke(input.session_id, tool_name, args).await;
    let result_text = match &outcome.output {
        Ok(value) => value.to_string(),
        Err(e) => format!("tool error: {e}"),
    };

    if let Some(persistence) = &input.persistence {
        let redacted_output = outcome.redacted_output.clone();
        let status = if outcome.output.is_ok() {
            ToolInvocationStatus::Completed
        } else {
            ToolInvocationStatus::Failed
        };
        let cache_hit = outcome.cache_hit;
        let duration_ms = outcome.duration_ms;
        persistence.tool_invocations.update(&invocation_id, |inv| {
            inv.status = status;
            inv.cache_hit = cache_hit;
            inv.output = redacted_output;
            inv.duration_ms = Some(duration_ms);
            inv.finished_at = Some(Utc::now());
        });
    }

    match outcome.output {
        Ok(value) => {
            events_tx
                .emit(OrchestratorEvent::ToolEnd {
                    tool: tool_name.to_string(),
                    agent: input.agent_name.clone(),
                    output: outcome.redacted_output.clone().unwrap_or(value),
                    duration_ms: outcome.duration_ms,
                    cache_hit: outcome.cache_hit,
                })
                .await;
            result_text
        }
        Err(e) => {
            events_tx
                .emit(OrchestratorEvent::ToolError {
                    tool: tool_name.to_string(),
                    agent: input.agent_name.clone(),
                    error: e.to_string(),
                })
                .await;
            result_text
        }
    }
}

fn web_search_tool_definition() -> ToolDefinition {
    ToolDefinition {
        name: "web_search".into(),
        description: "Search the web for supporting evidence on the current claim.".into(),
        parameters: serde_json::json!({
            "type": "object",
            "properties": { "query": { "type": "string" } },
            "required": ["query"],
        }),
    }
}
