use std::path::Path;

use mi_domain::model::Feedback;
use uuid::Uuid;

use crate::store::{JsonlStore, Keyed};

impl Keyed for Feedback {
    type Key = Uuid;
    fn key(&self) -> Uuid {
        self.id
    }
}

const CAPACITY: usize = 10_000;

/// Supplemental table (§3.AMBIENT) for post-session rating/comment capture.
pub struct FeedbackStore {
    inner: JsonlStore<Feedback>,
}

impl FeedbackStore {
    pub fn open(data_dir: &Path) -> Self {
        Self {
            inner: JsonlStore::open(data_dir, "feedback.jsonl", CAPACITY),
        }
    }

    pub fn insert(&self, feedback: Feedback) {
        self.inner.insert(feedback);
    }

    pub fn list_for_session(&self, session_id: &Uuid) -> Vec<Feedback> {
        self.inner.filter(|f| f.session_id == *session_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn insert_and_list() {
        let dir = tempfile::tempdir().unwrap();
        let store = FeedbackStore::open(dir.path());
        let session_id = Uuid::new_v4();

        store.insert(Feedback {
            id: Uuid::new_v4(),
            session_id,
            rating: 5,
            comment: Some("useful".into()),
            created_at: Utc::now(),
        });

        let feedback = store.list_for_session(&session_id);
        assert_eq!(feedback.len(), 1);
        assert_eq!(feedback[0].rating, 5);
    }
}
