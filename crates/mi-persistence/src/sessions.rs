use std::path::Path;

use mi_domain::model::Session;
use uuid::Uuid;

use crate::store::{JsonlStore, Keyed};

impl Keyed for Session {
    type Key = Uuid;
    fn key(&self) -> Uuid {
        self.id
    }
}

const CAPACITY: usize = 5_000;

pub struct SessionStore {
    inner: JsonlStore<Session>,
}

impl SessionStore {
    pub fn open(data_dir: &Path) -> Self {
        Self {
            inner: JsonlStore::open(data_dir, "sessions.jsonl", CAPACITY),
        }
    }

    pub fn upsert(&self, session: Session) {
        self.inner.upsert(session);
    }

    pub fn get(&self, id: &Uuid) -> Option<Session> {
        self.inner.get(id)
    }

    pub fn update<F>(&self, id: &Uuid, f: F) -> bool
    where
        F: FnOnce(&mut Session),
    {
        self.inner.update(id, f)
    }

    pub fn list(&self) -> Vec<Session> {
        self.inner.all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mi_domain::model::{Profile, SessionConfig};

    fn profile() -> Profile {
        Profile {
            target_market: "Germany".into(),
            supply_chain: "Consumer Electronics".into(),
            seller_type: "brand".into(),
            min_price: 10.0,
            max_price: 50.0,
        }
    }

    #[test]
    fn upsert_then_get() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::open(dir.path());
        let session = Session::new(Uuid::new_v4(), profile(), SessionConfig::default());
        let id = session.id;
        store.upsert(session);
        assert_eq!(store.get(&id).unwrap().id, id);
    }

    #[test]
    fn update_transitions_status() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::open(dir.path());
        let session = Session::new(Uuid::new_v4(), profile(), SessionConfig::default());
        let id = session.id;
        store.upsert(session);
        let found = store.update(&id, |s| s.status = mi_domain::model::SessionStatus::Running);
        assert!(found);
        assert_eq!(
            store.get(&id).unwrap().status,
            mi_domain::model::SessionStatus::Running
        );
    }
}
