use std::path::Path;

use mi_domain::model::WorkflowEvent;
use uuid::Uuid;

use crate::store::{JsonlStore, Keyed};

impl Keyed for WorkflowEvent {
    type Key = Uuid;
    fn key(&self) -> Uuid {
        self.id
    }
}

const CAPACITY: usize = 50_000;

/// Append-only audit log. Every non-chunk `OrchestratorEvent` (spec.md §8
/// invariant 4) is durably recorded here before it is broadcast to SSE
/// subscribers.
pub struct WorkflowEventStore {
    inner: JsonlStore<WorkflowEvent>,
}

impl WorkflowEventStore {
    pub fn open(data_dir: &Path) -> Self {
        Self {
            inner: JsonlStore::open(data_dir, "workflow_events.jsonl", CAPACITY),
        }
    }

    pub fn append(&self, event: WorkflowEvent) {
        self.inner.insert(event);
    }

    pub fn list_for_session(&self, session_id: &Uuid) -> Vec<WorkflowEvent> {
        let mut events = self.inner.filter(|e| e.session_id == *session_id);
        events.sort_by_key(|e| e.created_at);
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn append_and_list_preserves_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = WorkflowEventStore::open(dir.path());
        let session_id = Uuid::new_v4();

        for event_type in ["orchestrator_start", "agent_start", "agent_end"] {
            store.append(WorkflowEvent {
                id: Uuid::new_v4(),
                session_id,
                event_type: event_type.into(),
                agent_name: None,
                tool_name: None,
                node_id: None,
                payload: serde_json::json!({}),
                created_at: Utc::now(),
            });
        }

        let events = store.list_for_session(&session_id);
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].event_type, "orchestrator_start");
        assert_eq!(events[2].event_type, "agent_end");
    }
}
