//! Debate Coordinator (spec.md §4.4): for each of up to two rounds, a
//! challenger critiques every responder that completed gather, the
//! responder replies (emitting a structured `<<<REVISED:true|false>>>`
//! footer), and an optional followup micro-exchange runs.
//!
//! Grounded on the fan-out-across-responders-in-parallel idiom used for
//! the gather stage (`futures_util::future::join_all`), with each
//! responder's own challenge -> response -> followup chain run strictly
//! sequentially, matching "all exchanges within a round run sequentially
//! per responder, but different responders within a round may run in
//! parallel."

use std::sync::Arc;

use chrono::Utc;
use futures_util::future::join_all;
use mi_domain::events::OrchestratorEvent;
use mi_domain::message::Message;
use mi_domain::model::{DebateExchange, DebateType};
use mi_providers::{ChatRequest, LlmProvider};
use uuid::Uuid;

use crate::cancel::CancelToken;
use crate::content::{content_differs_beyond_threshold, extract_revised_footer};
use crate::events::EventSink;

pub struct DebateRoundInput {
    pub session_id: Uuid,
    pub round_number: u8,
    pub debate_type: DebateType,
    pub challenger_provider: Arc<dyn LlmProvider>,
    pub enable_followup: bool,
    pub revision_threshold_pct: f64,
    /// (responder agent name, its current AgentResult content).
    pub responders: Vec<(String, String)>,
}

/// Run one full debate round across all responders, returning a
/// `DebateExchange` per responder plus that responder's possibly-revised
/// content (for the caller to update the `AgentResult` in place).
pub async fn run_debate_round(
    input: DebateRoundInput,
    events_tx: &EventSink,
    cancel: &CancelToken,
) -> Vec<(DebateExchange, Option<String>)> {
    let participants: Vec<String> = input.responders.iter().map(|(name, _)| name.clone()).collect();
    events_tx
        .emit(OrchestratorEvent::DebateRoundStart {
            round_number: input.round_number,
            debate_type: debate_type_label(input.debate_type).to_string(),
            participants,
        })
        .await;

    let challenger_provider = input.challenger_provider.clone();
    let futures = input.responders.into_iter().map(|(responder, content)| {
        let provider = challenger_provider.clone();
        let session_id = input.session_id;
        let round_number = input.round_number;
        let debate_type = input.debate_type;
        let enable_followup = input.enable_followup;
        let revision_threshold_pct = input.revision_threshold_pct;
        async move {
            run_responder_exchange(
                session_id,
                round_number,
                debate_type,
                responder,
                content,
                provider,
                enable_followup,
                revision_threshold_pct,
                events_tx,
                cancel,
            )
            .await
        }
    });

    let results = join_all(futures).await;

    events_tx
        .emit(OrchestratorEvent::DebateRoundEnd {
            round_number: input.round_number,
        })
        .await;

    results
}

#[allow(clippy::too_many_arguments)]
async fn run_responder_exchange(
    session_id: Uuid,
    round_number: u8,
    debate_type: DebateType,
    responder: String,
    prior_content: String,
    challenger_provider: Arc<dyn LlmProvider>,
    enable_followup: bool,
    revision_threshold_pct: f64,
    events_tx: &EventSink,
    cancel: &CancelToken,
) -> (DebateExchange, Option<String>) {
    let challenger_name = "debate_challenger".to_string();
    let tone = match debate_type {
        DebateType::PeerReview => "a collegial peer-review critique",
        DebateType::RedTeam => "an adversarial red-team critique",
    };

    let challenge_content = if cancel.is_cancelled() {
        String::new()
    } else {
        call_challenger(
            &challenger_provider,
            &format!(
                "Provide {tone} of the following analysis from {responder}:\n\n{prior_content}"
            ),
        )
        .await
        .unwrap_or_else(|e| format!("challenge generation failed: {e}"))
    };

    events_tx
        .emit(OrchestratorEvent::AgentChallenge {
            round_number,
            from_agent: challenger_name.clone(),
            to_agent: responder.clone(),
            challenge_content: challenge_content.clone(),
        })
        .await;
    events_tx
        .emit(OrchestratorEvent::AgentChallengeEnd {
            round_number,
            from_agent: challenger_name.clone(),
            to_agent: responder.clone(),
            challenge_content: challenge_content.clone(),
        })
        .await;

    let raw_response = if cancel.is_cancelled() {
        String::new()
    } else {
        call_challenger(
            &challenger_provider,
            &format!(
                "As {responder}, respond to this critique of your prior analysis.\n\n\
                 Prior analysis:\n{prior_content}\n\nCritique:\n{challenge_content}\n\n\
                 End your reply with a line `<<<REVISED:true>>>` if you changed your \
                 conclusions, or `<<<REVISED:false>>>` if you did not."
            ),
        )
        .await
        .unwrap_or_default()
    };

    let (response_content, revised_footer) = extract_revised_footer(&raw_response);
    let revised = revised_footer.unwrap_or_else(|| {
        content_differs_beyond_threshold(&prior_content, &response_content, revision_threshold_pct)
    });

    events_tx
        .emit(OrchestratorEvent::AgentRespond {
            round_number,
            from_agent: responder.clone(),
            to_agent: challenger_name.clone(),
            response_content: response_content.clone(),
            revised,
        })
        .await;
    events_tx
        .emit(OrchestratorEvent::AgentRespondEnd {
            round_number,
            from_agent: responder.clone(),
            to_agent: challenger_name.clone(),
            response_content: response_content.clone(),
            revised,
        })
        .await;

    let mut followup_content = None;
    if enable_followup && !cancel.is_cancelled() {
        let followup = call_challenger(
            &challenger_provider,
            &format!(
                "Brief follow-up only: does {responder}'s response adequately address the \
                 critique? One or two sentences."
            ),
        )
        .await
        .unwrap_or_default();

        events_tx
            .emit(OrchestratorEvent::AgentFollowupEnd {
                round_number,
                from_agent: challenger_name.clone(),
                to_agent: responder.clone(),
                followup_content: followup.clone(),
            })
            .await;
        followup_content = Some(followup);
    }

    let exchange = DebateExchange {
        id: Uuid::new_v4(),
        session_id,
        round_number,
        debate_type,
        challenger: challenger_name,
        responder: responder.clone(),
        challenge_content,
        response_content: response_content.clone(),
        followup_content,
        revised,
        created_at: Utc::now(),
    };

    let updated_content = if revised { Some(response_content) } else { None };
    (exchange, updated_content)
}

async fn call_challenger(provider: &Arc<dyn LlmProvider>, prompt: &str) -> mi_domain::Result<String> {
    let request = ChatRequest {
        messages: vec![Message::user(prompt)],
        ..Default::default()
    };
    let response = provider.chat(&request).await?;
    Ok(response.content)
}

fn debate_type_label(debate_type: DebateType) -> &'static str {
    match debate_type {
        DebateType::PeerReview => "peer_review",
        DebateType::RedTeam => "red_team",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mi_providers::mock::{MockLlmProvider, ScriptedCall};
    use mi_domain::stream::StreamEvent;
    use tokio::sync::mpsc;

    fn test_sink() -> (EventSink, mpsc::Receiver<OrchestratorEvent>, Arc<mi_persistence::PersistenceGateway>) {
        let dir = tempfile::tempdir().unwrap();
        let persistence = Arc::new(mi_persistence::PersistenceGateway::open(dir.path()));
        let (tx, rx) = mpsc::channel(64);
        let sink = EventSink::new(tx, persistence.clone(), Uuid::new_v4());
        (sink, rx, persistence)
    }

    fn provider_with_responses(texts: Vec<&str>) -> Arc<dyn LlmProvider> {
        let calls = texts
            .into_iter()
            .map(|t| {
                ScriptedCall::Events(vec![
                    StreamEvent::Token { text: t.to_string() },
                    StreamEvent::Done {
                        usage: None,
                        finish_reason: Some("stop".into()),
                    },
                ])
            })
            .collect();
        Arc::new(MockLlmProvider::new("challenger", calls))
    }

    #[tokio::test]
    async fn structured_footer_drives_revised_flag() {
        let provider = provider_with_responses(vec![
            "this analysis overlooks tariff exposure",
            "reworked conclusions incorporating tariff risk\n<<<REVISED:true>>>",
        ]);
        let (sink, mut rx, _persistence) = test_sink();
        let cancel = CancelToken::new();

        let input = DebateRoundInput {
            session_id: Uuid::new_v4(),
            round_number: 1,
            debate_type: DebateType::PeerReview,
            challenger_provider: provider,
            enable_followup: false,
            revision_threshold_pct: 15.0,
            responders: vec![("trend_scout".to_string(), "original content".to_string())],
        };

        let results = run_debate_round(input, &sink, &cancel).await;
        drop(sink);
        while rx.recv().await.is_some() {}

        assert_eq!(results.len(), 1);
        let (exchange, updated) = &results[0];
        assert!(exchange.revised);
        assert!(updated.is_some());
        assert!(!exchange.response_content.contains("REVISED"));
    }

    #[tokio::test]
    async fn unrevised_footer_does_not_update_content() {
        let provider = provider_with_responses(vec![
            "minor critique",
            "unchanged conclusions\n<<<REVISED:false>>>",
        ]);
        let (sink, mut rx, _persistence) = test_sink();
        let cancel = CancelToken::new();

        let input = DebateRoundInput {
            session_id: Uuid::new_v4(),
            round_number: 2,
            debate_type: DebateType::RedTeam,
            challenger_provider: provider,
            enable_followup: false,
            revision_threshold_pct: 15.0,
            responders: vec![("regulation_checker".to_string(), "original content".to_string())],
        };

        let results = run_debate_round(input, &sink, &cancel).await;
        drop(sink);
        while rx.recv().await.is_some() {}

        let (exchange, updated) = &results[0];
        assert!(!exchange.revised);
        assert!(updated.is_none());
    }

    #[tokio::test]
    async fn followup_exchange_runs_when_enabled() {
        let provider = provider_with_responses(vec![
            "critique",
            "response\n<<<REVISED:false>>>",
            "yes, adequately addressed",
        ]);
        let (sink, mut rx, _persistence) = test_sink();
        let cancel = CancelToken::new();

        let input = DebateRoundInput {
            session_id: Uuid::new_v4(),
            round_number: 1,
            debate_type: DebateType::PeerReview,
            challenger_provider: provider,
            enable_followup: true,
            revision_threshold_pct: 15.0,
            responders: vec![("social_sentinel".to_string(), "content".to_string())],
        };

        let results = run_debate_round(input, &sink, &cancel).await;
        drop(sink);
        while rx.recv().await.is_some() {}

        assert!(results[0].0.followup_content.is_some());
    }
}
