use std::path::Path;

use mi_domain::model::{ToolInvocation, ToolInvocationStatus};
use uuid::Uuid;

use crate::store::{JsonlStore, Keyed};

impl Keyed for ToolInvocation {
    type Key = Uuid;
    fn key(&self) -> Uuid {
        self.invocation_id
    }
}

const CAPACITY: usize = 50_000;

pub struct ToolInvocationStore {
    inner: JsonlStore<ToolInvocation>,
}

impl ToolInvocationStore {
    pub fn open(data_dir: &Path) -> Self {
        Self {
            inner: JsonlStore::open(data_dir, "tool_invocations.jsonl", CAPACITY),
        }
    }

    pub fn upsert(&self, invocation: ToolInvocation) {
        self.inner.upsert(invocation);
    }

    pub fn update<F>(&self, invocation_id: &Uuid, f: F) -> bool
    where
        F: FnOnce(&mut ToolInvocation),
    {
        self.inner.update(invocation_id, f)
    }

    pub fn list_for_session(&self, session_id: &Uuid) -> Vec<ToolInvocation> {
        self.inner.filter(|t| t.session_id == *session_id)
    }

    /// Cumulative estimated cost across all invocations in a session, used
    /// by the tool-usage guardrail (§6 `TOOL_GUARDRAIL_MAX_ESTIMATED_COST_USD`).
    pub fn cumulative_cost_usd(&self, session_id: &Uuid) -> f64 {
        self.list_for_session(session_id)
            .iter()
            .map(|t| t.estimated_cost_usd)
            .sum()
    }

    /// (total_calls, failed_calls) for a specific tool within a session,
    /// used by the error-rate guardrail.
    pub fn call_counts(&self, session_id: &Uuid, tool_name: &str) -> (u32, u32) {
        let invocations = self
            .list_for_session(session_id)
            .into_iter()
            .filter(|t| t.tool_name == tool_name);
        let mut total = 0;
        let mut failed = 0;
        for inv in invocations {
            total += 1;
            if inv.status == ToolInvocationStatus::Failed {
                failed += 1;
            }
        }
        (total, failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn invocation(session_id: Uuid, tool_name: &str, cost: f64, failed: bool) -> ToolInvocation {
        ToolInvocation {
            invocation_id: Uuid::new_v4(),
            session_id,
            agent: "trend_scout".into(),
            tool_name: tool_name.into(),
            context: String::new(),
            model_name: None,
            status: if failed {
                ToolInvocationStatus::Failed
            } else {
                ToolInvocationStatus::Completed
            },
            cache_hit: false,
            input: serde_json::json!({}),
            output: None,
            duration_ms: Some(10),
            estimated_input_tokens: 100,
            estimated_output_tokens: 50,
            estimated_cost_usd: cost,
            started_at: Utc::now(),
            finished_at: Some(Utc::now()),
        }
    }

    #[test]
    fn cumulative_cost_sums_across_invocations() {
        let dir = tempfile::tempdir().unwrap();
        let store = ToolInvocationStore::open(dir.path());
        let session_id = Uuid::new_v4();

        store.upsert(invocation(session_id, "web_search", 0.01, false));
        store.upsert(invocation(session_id, "web_search", 0.02, false));

        assert!((store.cumulative_cost_usd(&session_id) - 0.03).abs() < 1e-9);
    }

    #[test]
    fn call_counts_tracks_failures_per_tool() {
        let dir = tempfile::tempdir().unwrap();
        let store = ToolInvocationStore::open(dir.path());
        let session_id = Uuid::new_v4();

        store.upsert(invocation(session_id, "web_search", 0.01, false));
        store.upsert(invocation(session_id, "web_search", 0.01, true));
        store.upsert(invocation(session_id, "other_tool", 0.01, true));

        let (total, failed) = store.call_counts(&session_id, "web_search");
        assert_eq!(total, 2);
        assert_eq!(failed, 1);
    }
}
