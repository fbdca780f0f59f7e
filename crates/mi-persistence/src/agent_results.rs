use std::path::Path;

use mi_domain::model::AgentResult;
use uuid::Uuid;

use crate::store::{JsonlStore, Keyed};

impl Keyed for AgentResult {
    type Key = (Uuid, String);
    fn key(&self) -> (Uuid, String) {
        (self.session_id, self.agent_name.clone())
    }
}

const CAPACITY: usize = 20_000;

/// Idempotent upsert keyed by `(session_id, agent_name)` — a re-run of the
/// same agent within a session replaces its prior result rather than
/// appending a duplicate row (spec.md §5 idempotency guarantee).
pub struct AgentResultStore {
    inner: JsonlStore<AgentResult>,
}

impl AgentResultStore {
    pub fn open(data_dir: &Path) -> Self {
        Self {
            inner: JsonlStore::open(data_dir, "agent_results.jsonl", CAPACITY),
        }
    }

    pub fn upsert(&self, result: AgentResult) {
        self.inner.upsert(result);
    }

    pub fn get(&self, session_id: &Uuid, agent_name: &str) -> Option<AgentResult> {
        self.inner.get(&(*session_id, agent_name.to_string()))
    }

    pub fn update<F>(&self, session_id: &Uuid, agent_name: &str, f: F) -> bool
    where
        F: FnOnce(&mut AgentResult),
    {
        self.inner.update(&(*session_id, agent_name.to_string()), f)
    }

    pub fn list_for_session(&self, session_id: &Uuid) -> Vec<AgentResult> {
        self.inner.filter(|r| r.session_id == *session_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upsert_replaces_same_session_agent_pair() {
        let dir = tempfile::tempdir().unwrap();
        let store = AgentResultStore::open(dir.path());
        let session_id = Uuid::new_v4();

        let mut r1 = AgentResult::new_pending(session_id, "trend_scout");
        r1.content = "v1".into();
        store.upsert(r1);

        let mut r2 = AgentResult::new_pending(session_id, "trend_scout");
        r2.content = "v2".into();
        store.upsert(r2);

        let results = store.list_for_session(&session_id);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].content, "v2");
    }

    #[test]
    fn list_for_session_excludes_other_sessions() {
        let dir = tempfile::tempdir().unwrap();
        let store = AgentResultStore::open(dir.path());
        let session_a = Uuid::new_v4();
        let session_b = Uuid::new_v4();

        store.upsert(AgentResult::new_pending(session_a, "trend_scout"));
        store.upsert(AgentResult::new_pending(session_b, "competitor_analyst"));

        assert_eq!(store.list_for_session(&session_a).len(), 1);
        assert_eq!(store.list_for_session(&session_b).len(), 1);
    }
}
