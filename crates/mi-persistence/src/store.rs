//! Generic bounded-ring + JSONL + index store.
//!
//! Every table in §4.6 (sessions, agent results, debate exchanges, workflow
//! events, tool invocations, feedback) follows the same shape as a
//! production run tracker: recent records live in a bounded in-memory ring
//! with an O(1) key index, and every mutation is appended to a JSONL file
//! so a restart can reload recent history. This module extracts that shape
//! once; each concrete store in this crate is a thin instantiation.

use std::collections::{HashMap, VecDeque};
use std::hash::Hash;
use std::io::Write;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Implemented by every record type with a stable identity used for
/// in-place updates (`upsert`) as opposed to pure appends (`insert`).
pub trait Keyed {
    type Key: Eq + Hash + Clone;
    fn key(&self) -> Self::Key;
}

struct RingInner<T, K> {
    records: VecDeque<T>,
    index: HashMap<K, usize>,
    base_seq: usize,
}

impl<T: Keyed<Key = K>, K: Eq + Hash + Clone> RingInner<T, K> {
    fn new(records: VecDeque<T>) -> Self {
        let mut index = HashMap::with_capacity(records.len());
        for (i, r) in records.iter().enumerate() {
            index.insert(r.key(), i);
        }
        Self {
            records,
            index,
            base_seq: 0,
        }
    }

    fn deque_idx(&self, seq: usize) -> usize {
        seq - self.base_seq
    }

    fn get(&self, key: &K) -> Option<&T> {
        let seq = *self.index.get(key)?;
        self.records.get(self.deque_idx(seq))
    }

    fn get_mut(&mut self, key: &K) -> Option<&mut T> {
        let seq = *self.index.get(key)?;
        self.records.get_mut(self.deque_idx(seq))
    }

    fn push_back(&mut self, record: T) {
        let seq = self.base_seq + self.records.len();
        self.index.insert(record.key(), seq);
        self.records.push_back(record);
    }

    fn pop_front(&mut self) {
        if let Some(r) = self.records.pop_front() {
            self.index.remove(&r.key());
            self.base_seq += 1;
        }
    }
}

/// A JSONL-backed, bounded in-memory store keyed by `T::Key`.
pub struct JsonlStore<T: Keyed> {
    inner: RwLock<RingInner<T, T::Key>>,
    log_path: PathBuf,
    capacity: usize,
}

impl<T> JsonlStore<T>
where
    T: Keyed + Serialize + DeserializeOwned + Clone,
    T::Key: Eq + Hash + Clone,
{
    /// Open (or create) a JSONL-backed store at `data_dir/<filename>`,
    /// reloading up to `capacity` of the most recent records.
    pub fn open(data_dir: &Path, filename: &str, capacity: usize) -> Self {
        std::fs::create_dir_all(data_dir).ok();
        let log_path = data_dir.join(filename);
        let (records, total_on_disk) = Self::load_recent(&log_path, capacity);

        if total_on_disk > records.len() {
            tracing::info!(
                file = %filename,
                kept = records.len(),
                pruned = total_on_disk - records.len(),
                "pruning JSONL store on disk"
            );
            Self::rewrite_jsonl(&log_path, &records);
        }

        Self {
            inner: RwLock::new(RingInner::new(records)),
            log_path,
            capacity,
        }
    }

    /// Scans the JSONL file newest-first, keeping at most one record per
    /// key (the first one encountered scanning backwards is the newest
    /// write) and stopping once `capacity` distinct records are kept.
    fn load_recent(path: &Path, capacity: usize) -> (VecDeque<T>, usize) {
        let mut records = VecDeque::new();
        let mut seen = std::collections::HashSet::new();
        let mut total = 0;
        if let Ok(content) = std::fs::read_to_string(path) {
            let lines: Vec<&str> = content.lines().collect();
            total = lines.len();
            for line in lines.iter().rev() {
                if records.len() >= capacity {
                    break;
                }
                if let Ok(record) = serde_json::from_str::<T>(line) {
                    if seen.insert(record.key()) {
                        records.push_front(record);
                    }
                }
            }
        }
        (records, total)
    }

    fn rewrite_jsonl(path: &Path, records: &VecDeque<T>) {
        let tmp = path.with_extension("jsonl.tmp");
        let mut ok = false;
        if let Ok(mut f) = std::fs::File::create(&tmp) {
            ok = true;
            for record in records {
                if let Ok(json) = serde_json::to_string(record) {
                    if writeln!(f, "{json}").is_err() {
                        ok = false;
                        break;
                    }
                }
            }
        }
        if ok {
            let _ = std::fs::rename(&tmp, path);
        } else {
            let _ = std::fs::remove_file(&tmp);
        }
    }

    /// Append a durability record and insert into the in-memory ring,
    /// evicting the oldest entry once over capacity.
    pub fn insert(&self, record: T) {
        self.append_jsonl(&record);
        let mut inner = self.inner.write();
        inner.push_back(record);
        if inner.records.len() > self.capacity {
            inner.pop_front();
        }
    }

    /// Insert or, if a record with the same key already exists, replace it
    /// in the in-memory ring. The durability log still appends one line
    /// per call rather than rewriting in place; `load_recent` reconciles
    /// that on the next `open` by scanning newest-first and keeping only
    /// the first (i.e. newest) line it sees per key.
    pub fn upsert(&self, record: T) {
        self.append_jsonl(&record);
        let mut inner = self.inner.write();
        if let Some(slot) = inner.get_mut(&record.key()) {
            *slot = record;
        } else {
            inner.push_back(record);
            if inner.records.len() > self.capacity {
                inner.pop_front();
            }
        }
    }

    fn append_jsonl(&self, record: &T) {
        if let Ok(json) = serde_json::to_string(record) {
            if let Ok(mut file) = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.log_path)
            {
                let _ = writeln!(file, "{json}");
            }
        }
    }

    pub fn get(&self, key: &T::Key) -> Option<T> {
        self.inner.read().get(key).cloned()
    }

    /// Update a record in place via closure. Returns `true` if found.
    /// Also re-appends the updated record to the JSONL log so a reload
    /// picks up the latest state (last-write-wins on replay).
    pub fn update<F>(&self, key: &T::Key, f: F) -> bool
    where
        F: FnOnce(&mut T),
    {
        let mut inner = self.inner.write();
        if let Some(record) = inner.get_mut(key) {
            f(record);
            let snapshot = record.clone();
            drop(inner);
            self.append_jsonl(&snapshot);
            true
        } else {
            false
        }
    }

    /// All records currently held in the ring, oldest first.
    pub fn all(&self) -> Vec<T> {
        self.inner.read().records.iter().cloned().collect()
    }

    /// Records matching `filter`, oldest first.
    pub fn filter<F>(&self, filter: F) -> Vec<T>
    where
        F: Fn(&T) -> bool,
    {
        self.inner
            .read()
            .records
            .iter()
            .filter(|r| filter(r))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.read().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
