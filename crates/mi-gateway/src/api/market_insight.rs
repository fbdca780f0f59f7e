//! Market-insight run API (spec.md §6): the orchestrator's only external
//! surface. Grounded on the teacher's `api/chat.rs` pairing of a
//! non-streaming aggregate handler with an SSE handler that share one
//! `run_turn`-equivalent kickoff — here, `mi_engine::run_session`.

use std::convert::Infallible;

use axum::extract::{Path, Query, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Json, Response};
use futures_util::stream::Stream;
use serde::Deserialize;

use mi_domain::events::OrchestratorEvent;
use mi_domain::model::{DegradeMode, Profile, Session, SessionConfig, SessionStatus};
use mi_tools::ToolStats;
use uuid::Uuid;

use crate::state::AppState;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Request shape
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Deserialize)]
pub struct RunRequest {
    /// Client-chosen session id. If absent, the gateway generates one.
    #[serde(default)]
    pub session_id: Option<Uuid>,
    pub profile: Profile,
    #[serde(default)]
    pub debate_rounds: u8,
    #[serde(default)]
    pub enable_followup: bool,
    #[serde(default)]
    pub enable_websearch: bool,
    #[serde(default = "default_retry_attempts")]
    pub retry_max_attempts: u32,
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
    #[serde(default)]
    pub degrade_mode: DegradeMode,
}

fn default_retry_attempts() -> u32 {
    3
}
fn default_retry_backoff_ms() -> u64 {
    500
}

fn api_error(status: axum::http::StatusCode, message: impl Into<String>) -> Response {
    (status, Json(serde_json::json!({ "error": message.into() }))).into_response()
}

/// Pre-flight check: 503 early if no LLM provider is available, rather
/// than letting every gather-stage call fail one by one. Grounded on the
/// teacher's `require_llm_provider` in `api/chat.rs`.
fn require_llm_provider(state: &AppState) -> Result<std::sync::Arc<dyn mi_providers::LlmProvider>, Response> {
    state.active_provider().ok_or_else(|| {
        api_error(
            axum::http::StatusCode::SERVICE_UNAVAILABLE,
            "no LLM provider configured; set [llm.providers] in config.toml",
        )
    })
}

fn build_session(state: &AppState, body: RunRequest) -> Session {
    let id = body.session_id.unwrap_or_else(Uuid::new_v4);
    let config = SessionConfig {
        debate_rounds: body.debate_rounds.min(2),
        enable_followup: body.enable_followup,
        enable_websearch: body.enable_websearch,
        retry_max_attempts: body.retry_max_attempts.max(1),
        retry_backoff_ms: body.retry_backoff_ms,
        degrade_mode: body.degrade_mode,
    };
    let session = Session::new(id, body.profile, config);
    state.persistence.sessions.upsert(session.clone());
    session
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// POST /api/v2/market-insight/stream
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub async fn stream(State(state): State<AppState>, Json(body): Json<RunRequest>) -> Response {
    let provider = match require_llm_provider(&state) {
        Ok(p) => p,
        Err(resp) => return resp,
    };
    let session = build_session(&state, body);
    let (_session_id, rx) = mi_engine::run_session(session, state.engine_deps(provider));

    let sse_stream = make_sse_stream(rx);
    Sse::new(sse_stream)
        .keep_alive(KeepAlive::default())
        .into_response()
}

fn make_sse_stream(
    mut rx: tokio::sync::mpsc::Receiver<OrchestratorEvent>,
) -> impl Stream<Item = Result<Event, Infallible>> {
    async_stream::stream! {
        while let Some(event) = rx.recv().await {
            let event_type = event.event_type();
            let data = serde_json::to_string(&event).unwrap_or_default();
            yield Ok(Event::default().event(event_type).data(data));
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// POST /api/v2/market-insight/generate
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub async fn generate(State(state): State<AppState>, Json(body): Json<RunRequest>) -> Response {
    let provider = match require_llm_provider(&state) {
        Ok(p) => p,
        Err(resp) => return resp,
    };
    let session = build_session(&state, body);
    let session_id = session.id;
    let (_session_id, mut rx) = mi_engine::run_session(session, state.engine_deps(provider));

    let mut final_report = String::new();
    let mut errors = Vec::new();
    while let Some(event) = rx.recv().await {
        match event {
            OrchestratorEvent::OrchestratorEnd { final_report: report, .. } => final_report = report,
            OrchestratorEvent::Error { error } => errors.push(error),
            _ => {}
        }
    }

    Json(serde_json::json!({
        "session_id": session_id,
        "final_report": final_report,
        "errors": errors,
    }))
    .into_response()
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// GET /api/v2/market-insight/status/{session_id}
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub async fn status(State(state): State<AppState>, Path(session_id): Path<Uuid>) -> Response {
    let Some(session) = state.persistence.sessions.get(&session_id) else {
        return Json(serde_json::json!({ "status": "not_found" })).into_response();
    };

    let agent_results = state.persistence.agent_results.list_for_session(&session_id);
    let debate_exchanges = state.persistence.debate_exchanges.list_for_session(&session_id);
    let workflow_events = state.persistence.workflow_events.list_for_session(&session_id);
    let tool_invocations = state.persistence.tool_invocations.list_for_session(&session_id);

    let tool_metrics = match &state.tool_registry {
        Some(registry) => tool_metrics_for_session(registry, &session_id, &tool_invocations),
        None => serde_json::json!({}),
    };

    Json(serde_json::json!({
        "session": session,
        "agent_results": agent_results,
        "debate_exchanges": debate_exchanges,
        "workflow_events": workflow_events,
        "tool_invocations": tool_invocations,
        "tool_metrics": tool_metrics,
        "demo_metrics": demo_metrics(&session, &agent_results),
        "report_charts": [],
        "report_html_url": serde_json::Value::Null,
    }))
    .into_response()
}

fn tool_metrics_for_session(
    registry: &mi_tools::ToolRegistry,
    session_id: &Uuid,
    invocations: &[mi_domain::model::ToolInvocation],
) -> serde_json::Value {
    let mut by_tool = serde_json::Map::new();
    let tool_names: std::collections::HashSet<&str> =
        invocations.iter().map(|inv| inv.tool_name.as_str()).collect();
    for tool_name in tool_names {
        let stats: ToolStats = registry.stats_for(session_id, tool_name);
        by_tool.insert(
            tool_name.to_string(),
            serde_json::json!({
                "total_calls": stats.total_calls,
                "failed_calls": stats.failed_calls,
                "error_rate": stats.error_rate(),
                "cache_hit_rate": stats.cache_hit_rate(),
                "avg_duration_ms": stats.avg_duration_ms(),
            }),
        );
    }
    serde_json::Value::Object(by_tool)
}

fn demo_metrics(session: &Session, agent_results: &[mi_domain::model::AgentResult]) -> serde_json::Value {
    let completed = agent_results
        .iter()
        .filter(|r| r.status == mi_domain::model::AgentStatus::Completed)
        .count();
    serde_json::json!({
        "phase": session.phase,
        "agents_completed": completed,
        "agents_total": agent_results.len(),
        "debate_round": session.current_debate_round,
    })
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// GET /api/v2/market-insight/sessions?status=&limit=&offset=
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Deserialize)]
pub struct ListSessionsQuery {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
}

fn default_limit() -> usize {
    50
}

fn parse_status(raw: &str) -> Option<SessionStatus> {
    match raw {
        "pending" => Some(SessionStatus::Pending),
        "running" => Some(SessionStatus::Running),
        "completed" => Some(SessionStatus::Completed),
        "failed" => Some(SessionStatus::Failed),
        "cancelled" => Some(SessionStatus::Cancelled),
        _ => None,
    }
}

pub async fn list_sessions(State(state): State<AppState>, Query(q): Query<ListSessionsQuery>) -> Response {
    let wanted_status = q.status.as_deref().and_then(parse_status);
    let mut sessions = state.persistence.sessions.list();
    sessions.sort_by_key(|s| std::cmp::Reverse(s.created_at));

    if let Some(wanted) = wanted_status {
        sessions.retain(|s| s.status == wanted);
    }

    let total = sessions.len();
    let limit = q.limit.min(200);
    let page: Vec<_> = sessions.into_iter().skip(q.offset).take(limit).collect();

    Json(serde_json::json!({
        "sessions": page,
        "total": total,
        "limit": limit,
        "offset": q.offset,
    }))
    .into_response()
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// GET /api/v2/market-insight/export/{session_id}.zip
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//
// Bundles the session's rendered artifacts (final report, evidence pack,
// raw agent results) into a single archive. The wire path ends in
// `.zip` per spec.md; the archive is actually a gzipped tarball — this
// crate's dependency stack carries `tar`/`flate2` (ported from the
// teacher's OpenClaw import/export path) rather than a zip crate the
// rest of the corpus never reaches for (see DESIGN.md).

pub async fn export(State(state): State<AppState>, Path(session_id): Path<String>) -> Response {
    let session_id = session_id.trim_end_matches(".zip");
    let Ok(session_id) = session_id.parse::<Uuid>() else {
        return api_error(axum::http::StatusCode::BAD_REQUEST, "invalid session id");
    };

    let Some(session) = state.persistence.sessions.get(&session_id) else {
        return api_error(axum::http::StatusCode::NOT_FOUND, "session not found");
    };

    match build_export_archive(&state, &session) {
        Ok(bytes) => (
            [
                ("content-type", "application/gzip"),
                (
                    "content-disposition",
                    "attachment; filename=\"market-insight-export.tar.gz\"",
                ),
            ],
            bytes,
        )
            .into_response(),
        Err(e) => api_error(axum::http::StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

fn build_export_archive(state: &AppState, session: &Session) -> std::io::Result<Vec<u8>> {
    let agent_results = state.persistence.agent_results.list_for_session(&session.id);
    let debate_exchanges = state.persistence.debate_exchanges.list_for_session(&session.id);

    let gz = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    let mut builder = tar::Builder::new(gz);

    append_json_entry(&mut builder, "session.json", session)?;
    append_json_entry(&mut builder, "agent_results.json", &agent_results)?;
    append_json_entry(&mut builder, "debate_exchanges.json", &debate_exchanges)?;

    let report = session.synthesized_report.clone().unwrap_or_default();
    append_bytes_entry(&mut builder, "final_report.md", report.as_bytes())?;

    builder.into_inner()?.finish()
}

fn append_json_entry<W: std::io::Write, T: serde::Serialize>(
    builder: &mut tar::Builder<W>,
    name: &str,
    value: &T,
) -> std::io::Result<()> {
    let bytes = serde_json::to_vec_pretty(value).unwrap_or_default();
    append_bytes_entry(builder, name, &bytes)
}

fn append_bytes_entry<W: std::io::Write>(
    builder: &mut tar::Builder<W>,
    name: &str,
    bytes: &[u8],
) -> std::io::Result<()> {
    let mut header = tar::Header::new_gnu();
    header.set_size(bytes.len() as u64);
    header.set_mode(0o644);
    header.set_cksum();
    builder.append_data(&mut header, name, bytes)
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// GET /health and GET /api/v2/market-insight/health
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": if state.providers.is_empty() { "degraded" } else { "ok" },
        "llm_providers_configured": state.providers.len(),
        "llm_provider_init_errors": state.providers.init_errors().len(),
        "sessions_tracked": state.persistence.sessions.list().len(),
    }))
}
