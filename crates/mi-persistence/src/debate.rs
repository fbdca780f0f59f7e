use std::path::Path;

use mi_domain::model::DebateExchange;
use uuid::Uuid;

use crate::store::{JsonlStore, Keyed};

impl Keyed for DebateExchange {
    type Key = Uuid;
    fn key(&self) -> Uuid {
        self.id
    }
}

const CAPACITY: usize = 20_000;

pub struct DebateExchangeStore {
    inner: JsonlStore<DebateExchange>,
}

impl DebateExchangeStore {
    pub fn open(data_dir: &Path) -> Self {
        Self {
            inner: JsonlStore::open(data_dir, "debate_exchanges.jsonl", CAPACITY),
        }
    }

    pub fn insert(&self, exchange: DebateExchange) {
        self.inner.insert(exchange);
    }

    pub fn update<F>(&self, id: &Uuid, f: F) -> bool
    where
        F: FnOnce(&mut DebateExchange),
    {
        self.inner.update(id, f)
    }

    /// All exchanges for a session, ordered by round then creation time —
    /// the order a transcript or export should render them in.
    pub fn list_for_session(&self, session_id: &Uuid) -> Vec<DebateExchange> {
        let mut exchanges = self.inner.filter(|e| e.session_id == *session_id);
        exchanges.sort_by(|a, b| {
            a.round_number
                .cmp(&b.round_number)
                .then(a.created_at.cmp(&b.created_at))
        });
        exchanges
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use mi_domain::model::DebateType;

    fn exchange(session_id: Uuid, round: u8) -> DebateExchange {
        DebateExchange {
            id: Uuid::new_v4(),
            session_id,
            round_number: round,
            debate_type: DebateType::PeerReview,
            challenger: "competitor_analyst".into(),
            responder: "trend_scout".into(),
            challenge_content: "challenge".into(),
            response_content: String::new(),
            followup_content: None,
            revised: false,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn list_for_session_orders_by_round() {
        let dir = tempfile::tempdir().unwrap();
        let store = DebateExchangeStore::open(dir.path());
        let session_id = Uuid::new_v4();

        store.insert(exchange(session_id, 2));
        store.insert(exchange(session_id, 1));

        let exchanges = store.list_for_session(&session_id);
        assert_eq!(exchanges[0].round_number, 1);
        assert_eq!(exchanges[1].round_number, 2);
    }

    #[test]
    fn update_sets_revised_flag() {
        let dir = tempfile::tempdir().unwrap();
        let store = DebateExchangeStore::open(dir.path());
        let session_id = Uuid::new_v4();
        let e = exchange(session_id, 1);
        let id = e.id;
        store.insert(e);

        let found = store.update(&id, |e| {
            e.response_content = "revised response".into();
            e.revised = true;
        });
        assert!(found);
        let exchanges = store.list_for_session(&session_id);
        assert!(exchanges[0].revised);
    }
}
