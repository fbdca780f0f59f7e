use std::path::Path;

use crate::agent_results::AgentResultStore;
use crate::debate::DebateExchangeStore;
use crate::events::WorkflowEventStore;
use crate::feedback::FeedbackStore;
use crate::sessions::SessionStore;
use crate::tool_invocations::ToolInvocationStore;

/// Bundles every table the Persistence Gateway (§4.6) owns, opened against
/// a single `data_dir`.
pub struct PersistenceGateway {
    pub sessions: SessionStore,
    pub agent_results: AgentResultStore,
    pub debate_exchanges: DebateExchangeStore,
    pub workflow_events: WorkflowEventStore,
    pub tool_invocations: ToolInvocationStore,
    pub feedback: FeedbackStore,
}

impl PersistenceGateway {
    pub fn open(data_dir: &Path) -> Self {
        Self {
            sessions: SessionStore::open(data_dir),
            agent_results: AgentResultStore::open(data_dir),
            debate_exchanges: DebateExchangeStore::open(data_dir),
            workflow_events: WorkflowEventStore::open(data_dir),
            tool_invocations: ToolInvocationStore::open(data_dir),
            feedback: FeedbackStore::open(data_dir),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mi_domain::model::{Profile, Session, SessionConfig};
    use uuid::Uuid;

    #[test]
    fn opens_all_tables_against_one_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let gateway = PersistenceGateway::open(dir.path());

        let session = Session::new(
            Uuid::new_v4(),
            Profile {
                target_market: "Germany".into(),
                supply_chain: "Consumer Electronics".into(),
                seller_type: "brand".into(),
                min_price: 10.0,
                max_price: 50.0,
            },
            SessionConfig::default(),
        );
        let id = session.id;
        gateway.sessions.upsert(session);
        assert!(gateway.sessions.get(&id).is_some());
        assert!(gateway.agent_results.list_for_session(&id).is_empty());
    }
}
