//! Graph Engine (spec.md §4.1): the fixed DAG — parallel `gather`, up to
//! two debate rounds, then a terminal `synthesize` stage — that schedules
//! every other component in this crate.
//!
//! Grounded on `crates/gateway/src/runtime/turn.rs`'s `run_turn`: a
//! `tokio::spawn`ed task wrapped in an `info_span!("orchestrator_run",
//! %session_id, "otel.kind" = "SERVER")`, registering a `CancelToken` via
//! `CancelMap`, returning `(Uuid, Receiver<OrchestratorEvent>)`. The
//! gather fan-out uses `futures_util::future::join_all` over four spawned
//! stage futures, exactly as `turn.rs` dispatches concurrent tool calls —
//! the barrier waits for all four to reach a terminal state regardless of
//! individual outcome.

use std::sync::Arc;

use chrono::Utc;
use futures_util::future::join_all;
use mi_domain::events::OrchestratorEvent;
use mi_domain::model::{
    AgentResult, AgentStatus, DebateType, Session, SessionPhase, SessionStatus,
};
use mi_persistence::PersistenceGateway;
use mi_providers::LlmProvider;
use mi_tools::ToolRegistry;
use tokio::sync::mpsc;
use tracing::Instrument;
use uuid::Uuid;

use crate::agent_stage::{run_agent_stage, AgentStageInput};
use crate::cancel::{CancelMap, CancelToken};
use crate::debate::{run_debate_round, DebateRoundInput};
use crate::events::EventSink;
use crate::packer::build_evidence_and_memory;
use crate::retry::{with_retry, RetryPolicy};

const GATHER_AGENTS: [&str; 4] = ["trend_scout", "competitor_analyst", "regulation_checker", "social_sentinel"];

pub struct EngineDeps {
    pub persistence: Arc<PersistenceGateway>,
    pub provider: Arc<dyn LlmProvider>,
    pub tool_registry: Option<Arc<ToolRegistry>>,
    pub cancel_map: Arc<CancelMap>,
}

/// Kick off a full orchestrator run for `session` and return its id plus a
/// channel of events the caller (SSE Emitter, or a batch collector for the
/// non-streaming `/generate` endpoint) drains.
pub fn run_session(session: Session, deps: EngineDeps) -> (Uuid, mpsc::Receiver<OrchestratorEvent>) {
    let (raw_tx, rx) = mpsc::channel(256);
    let session_id = session.id;
    let cancel = deps.cancel_map.register(&session_id.to_string());
    let tx = EventSink::new(raw_tx, deps.persistence.clone(), session_id);

    let span = tracing::info_span!("orchestrator_run", %session_id, "otel.kind" = "SERVER");
    tokio::spawn(run_session_inner(session, deps, tx, cancel.clone()).instrument(span));

    (session_id, rx)
}

async fn run_session_inner(mut session: Session, deps: EngineDeps, tx: EventSink, cancel: CancelToken) {
    let session_id = session.id;

    session.status = SessionStatus::Running;
    session.phase = SessionPhase::Gather;
    session.updated_at = Utc::now();
    deps.persistence.sessions.upsert(session.clone());

    tx.emit(OrchestratorEvent::OrchestratorStart {
        session_id,
        timestamp: Utc::now(),
    })
    .await;

    // ── Gather: four agent stages run in parallel, barrier on join_all ──
    let retry_policy = RetryPolicy::new(session.config.retry_max_attempts, session.config.retry_backoff_ms);
    let gather_futures = GATHER_AGENTS.iter().map(|&agent_name| {
        let deps = &deps;
        let tx = tx.clone();
        let cancel = cancel.clone();
        let session = &session;
        async move {
            run_gather_stage_with_retry(session, agent_name, deps, &tx, &cancel, retry_policy).await
        }
    });
    let gather_results: Vec<AgentResult> = join_all(gather_futures).await;

    for result in &gather_results {
        deps.persistence.agent_results.upsert(result.clone());
    }

    if cancel.is_cancelled() {
        finish_session(&mut session, &deps, &tx, SessionStatus::Cancelled, None).await;
        deps.cancel_map.remove(&session_id.to_string());
        return;
    }

    if matches!(crate::retry::degrade_outcome(session.config.degrade_mode), crate::retry::DegradeOutcome::Fail)
        && gather_results.iter().any(|r| r.status == AgentStatus::Failed)
    {
        tx.emit(OrchestratorEvent::Error {
            error: "gather stage failed under degrade_mode=fail".into(),
        })
        .await;
        finish_session(&mut session, &deps, &tx, SessionStatus::Failed, None).await;
        deps.cancel_map.remove(&session_id.to_string());
        return;
    }

    // ── Debate rounds ──
    let mut current_results = gather_results;
    let debate_rounds = session.config.debate_rounds.min(2);
    for round in 1..=debate_rounds {
        if cancel.is_cancelled() {
            break;
        }
        session.phase = if round == 1 { SessionPhase::DebatePeer } else { SessionPhase::DebateRedteam };
        session.current_debate_round = round;
        deps.persistence.sessions.upsert(session.clone());

        let debate_type = if round == 1 { DebateType::PeerReview } else { DebateType::RedTeam };
        let responders: Vec<(String, String)> = current_results
            .iter()
            .filter(|r| r.status == AgentStatus::Completed)
            .map(|r| (r.agent_name.clone(), r.content.clone()))
            .collect();

        let round_input = DebateRoundInput {
            session_id,
            round_number: round,
            debate_type,
            challenger_provider: deps.provider.clone(),
            enable_followup: session.config.enable_followup,
            revision_threshold_pct: 15.0,
            responders,
        };
        let exchanges = run_debate_round(round_input, &tx, &cancel).await;

        for (exchange, updated_content) in exchanges {
            deps.persistence.debate_exchanges.insert(exchange.clone());
            if let Some(content) = updated_content {
                if let Some(result) = current_results.iter_mut().find(|r| r.agent_name == exchange.responder) {
                    result.content = content.clone();
                    result.updated_at = Utc::now();
                }
                deps.persistence.agent_results.update(&session_id, &exchange.responder, |r| {
                    r.content = content;
                    r.updated_at = Utc::now();
                });
            }
        }
    }

    if cancel.is_cancelled() {
        finish_session(&mut session, &deps, &tx, SessionStatus::Cancelled, None).await;
        deps.cancel_map.remove(&session_id.to_string());
        return;
    }

    // ── Synthesize ──
    session.phase = SessionPhase::Synthesize;
    deps.persistence.sessions.upsert(session.clone());

    let synthesis_prompt = build_synthesis_prompt(&current_results);
    let synthesizer_input = AgentStageInput {
        session_id,
        agent_name: "synthesizer".to_string(),
        system_prompt: "You synthesize multiple analyst findings into one cohesive market-insight report.".to_string(),
        user_prompt: synthesis_prompt,
        provider: deps.provider.clone(),
        model: None,
        tool_registry: None,
        persistence: Some(deps.persistence.clone()),
        enable_websearch: false,
    };
    let synthesis_result = run_agent_stage(synthesizer_input, &tx, &cancel).await;
    deps.persistence.agent_results.upsert(synthesis_result.clone());

    let final_report = synthesis_result.content.clone();

    // ── Evidence & Memory Packer (best-effort) ──
    let (evidence_pack, memory_snapshot) = build_evidence_and_memory(&final_report, &current_results);
    session.evidence_pack = Some(evidence_pack);
    session.memory_snapshot = Some(memory_snapshot);
    session.synthesized_report = Some(final_report.clone());

    tx.emit(OrchestratorEvent::OrchestratorEnd {
        final_report,
        report_html_url: None,
    })
    .await;

    finish_session(&mut session, &deps, &tx, SessionStatus::Completed, None).await;
    deps.cancel_map.remove(&session_id.to_string());
}

async fn run_gather_stage_with_retry(
    session: &Session,
    agent_name: &str,
    deps: &EngineDeps,
    tx: &EventSink,
    cancel: &CancelToken,
    retry_policy: RetryPolicy,
) -> AgentResult {
    let session_id = session.id;
    let outcome = with_retry(
        retry_policy,
        || {
            let input = AgentStageInput {
                session_id,
                agent_name: agent_name.to_string(),
                system_prompt: gather_role_prompt(agent_name),
                user_prompt: gather_user_prompt(session),
                provider: deps.provider.clone(),
                model: None,
                tool_registry: deps.tool_registry.clone(),
                persistence: Some(deps.persistence.clone()),
                enable_websearch: session.config.enable_websearch,
            };
            let tx = tx.clone();
            let cancel = cancel.clone();
            async move {
                let result = run_agent_stage(input, &tx, &cancel).await;
                if result.status == AgentStatus::Failed {
                    Err(result)
                } else {
                    Ok(result)
                }
            }
        },
        |attempt| {
            let tx = tx.clone();
            let agent_name = agent_name.to_string();
            tokio::spawn(async move {
                tx.emit(OrchestratorEvent::Retry {
                    target_type: "agent_stage".into(),
                    target_id: agent_name,
                    attempt,
                })
                .await;
            });
        },
    )
    .await;

    match outcome.result {
        Ok(result) => result,
        Err(mut failed) => {
            match crate::retry::degrade_outcome(session.config.degrade_mode) {
                crate::retry::DegradeOutcome::Partial => {
                    failed.status = AgentStatus::Degraded;
                }
                crate::retry::DegradeOutcome::Skip => {
                    failed.status = AgentStatus::Skipped;
                }
                crate::retry::DegradeOutcome::Fail => {
                    failed.status = AgentStatus::Failed;
                }
            }
            failed
        }
    }
}

async fn finish_session(
    session: &mut Session,
    deps: &EngineDeps,
    _tx: &EventSink,
    status: SessionStatus,
    _error: Option<String>,
) {
    session.status = status;
    session.phase = if status == SessionStatus::Completed { SessionPhase::Complete } else { SessionPhase::Error };
    session.updated_at = Utc::now();
    deps.persistence.sessions.upsert(session.clone());
}

fn gather_role_prompt(agent_name: &str) -> String {
    match agent_name {
        "trend_scout" => "You identify and summarize market trends relevant to the given profile.",
        "competitor_analyst" => "You analyze the competitive landscape for the given profile.",
        "regulation_checker" => "You identify regulatory and compliance considerations for the given profile.",
        "social_sentinel" => "You assess public and social sentiment relevant to the given profile.",
        other => return format!("You are {other}, a market-insight analyst."),
    }
    .to_string()
}

fn gather_user_prompt(session: &Session) -> String {
    format!(
        "Target market: {}\nSupply chain: {}\nSeller type: {}\nPrice range: {:.2}-{:.2}\n\n\
         End your thinking with {} then write the report after {}.",
        session.profile.target_market,
        session.profile.supply_chain,
        session.profile.seller_type,
        session.profile.min_price,
        session.profile.max_price,
        crate::content::THINKING_ENDS,
        crate::content::REPORT_STARTS,
    )
}

fn build_synthesis_prompt(results: &[AgentResult]) -> String {
    let mut prompt = String::from("Synthesize the following analyst findings into one report:\n\n");
    for result in results {
        prompt.push_str(&format!("## {}\n{}\n\n", result.agent_name, result.content));
    }
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use mi_domain::model::{Profile, SessionConfig};
    use mi_domain::stream::StreamEvent;
    use mi_providers::mock::{MockLlmProvider, ScriptedCall};

    fn scripted_agent_events(report: &str) -> ScriptedCall {
        ScriptedCall::Events(vec![
            StreamEvent::Token {
                text: format!(
                    "{}{}final: {report}",
                    crate::content::THINKING_ENDS,
                    crate::content::REPORT_STARTS
                ),
            },
            StreamEvent::Done {
                usage: None,
                finish_reason: Some("stop".into()),
            },
        ])
    }

    fn test_session() -> Session {
        Session::new(
            Uuid::new_v4(),
            Profile {
                target_market: "Germany".into(),
                supply_chain: "Consumer Electronics".into(),
                seller_type: "brand".into(),
                min_price: 10.0,
                max_price: 50.0,
            },
            SessionConfig {
                debate_rounds: 0,
                retry_max_attempts: 1,
                ..SessionConfig::default()
            },
        )
    }

    #[tokio::test]
    async fn completes_a_zero_debate_round_session() {
        let dir = tempfile::tempdir().unwrap();
        let persistence = Arc::new(PersistenceGateway::open(dir.path()));

        // 4 gather calls + 1 synthesize call.
        let calls: Vec<ScriptedCall> = (0..5).map(|i| scripted_agent_events(&format!("section {i}"))).collect();
        let provider: Arc<dyn LlmProvider> = Arc::new(MockLlmProvider::new("mock", calls));

        let deps = EngineDeps {
            persistence: persistence.clone(),
            provider,
            tool_registry: None,
            cancel_map: Arc::new(CancelMap::new()),
        };

        let (session_id, mut rx) = run_session(test_session(), deps);

        let mut saw_start = false;
        let mut saw_end = false;
        while let Some(ev) = rx.recv().await {
            match ev {
                OrchestratorEvent::OrchestratorStart { .. } => saw_start = true,
                OrchestratorEvent::OrchestratorEnd { .. } => saw_end = true,
                _ => {}
            }
        }

        assert!(saw_start);
        assert!(saw_end);
        let stored = persistence.sessions.get(&session_id).unwrap();
        assert_eq!(stored.status, SessionStatus::Completed);
        assert_eq!(persistence.agent_results.list_for_session(&session_id).len(), 5);
    }

    #[tokio::test]
    async fn degrade_mode_fail_fails_the_session_on_gather_failure() {
        use mi_domain::model::DegradeMode;
        use mi_providers::mock::ScriptedCall;

        let dir = tempfile::tempdir().unwrap();
        let persistence = Arc::new(PersistenceGateway::open(dir.path()));

        // All 4 gather agents fail their one allotted attempt.
        let calls: Vec<ScriptedCall> = (0..4).map(|_| ScriptedCall::Error("boom".into())).collect();
        let provider: Arc<dyn LlmProvider> = Arc::new(MockLlmProvider::new("mock", calls));

        let deps = EngineDeps {
            persistence: persistence.clone(),
            provider,
            tool_registry: None,
            cancel_map: Arc::new(CancelMap::new()),
        };

        let mut session = test_session();
        session.config.degrade_mode = DegradeMode::Fail;
        let (session_id, mut rx) = run_session(session, deps);

        let mut saw_error = false;
        let mut saw_end = false;
        while let Some(ev) = rx.recv().await {
            match ev {
                OrchestratorEvent::Error { .. } => saw_error = true,
                OrchestratorEvent::OrchestratorEnd { .. } => saw_end = true,
                _ => {}
            }
        }

        assert!(saw_error, "expected a final error event");
        assert!(!saw_end, "a failed session must never emit orchestrator_end");
        let stored = persistence.sessions.get(&session_id).unwrap();
        assert_eq!(stored.status, SessionStatus::Failed);
    }
}
