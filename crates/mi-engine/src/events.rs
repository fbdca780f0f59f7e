//! Event Sink (spec.md §5, §8 invariant 4): every non-chunk
//! `OrchestratorEvent` is durably recorded as a `WorkflowEvent` before it is
//! forwarded to whoever is draining the session's event channel (the SSE
//! emitter or the batch collector behind `/generate`). High-frequency
//! `agent_thinking_chunk`/`agent_chunk` events are forwarded without a
//! matching ledger row.
//!
//! Grounded on the persist-then-notify ordering in
//! `crates/gateway/src/runtime/turn.rs`, which writes its ledger rows ahead
//! of pushing a `TurnEvent` onto the caller's channel.

use std::sync::Arc;

use chrono::Utc;
use mi_domain::events::OrchestratorEvent;
use mi_domain::model::WorkflowEvent;
use mi_persistence::PersistenceGateway;
use tokio::sync::mpsc::Sender;
use uuid::Uuid;

#[derive(Clone)]
pub struct EventSink {
    tx: Sender<OrchestratorEvent>,
    persistence: Arc<PersistenceGateway>,
    session_id: Uuid,
}

impl EventSink {
    pub fn new(tx: Sender<OrchestratorEvent>, persistence: Arc<PersistenceGateway>, session_id: Uuid) -> Self {
        Self { tx, persistence, session_id }
    }

    /// Persist (unless a chunk) then forward. Best-effort on both counts:
    /// a dropped receiver must never unwind the orchestrator run.
    pub async fn emit(&self, event: OrchestratorEvent) {
        if !event.is_chunk() {
            self.persistence.workflow_events.append(WorkflowEvent {
                id: Uuid::new_v4(),
                session_id: self.session_id,
                event_type: event.event_type().to_string(),
                agent_name: event.agent_name().map(str::to_string),
                tool_name: None,
                node_id: None,
                payload: serde_json::to_value(&event).unwrap_or(serde_json::Value::Null),
                created_at: Utc::now(),
            });
        }
        let _ = self.tx.send(event).await;
    }
}
