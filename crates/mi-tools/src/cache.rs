//! Per-session tool-result cache, keyed by `(tool_name, canonicalized input)`.
//!
//! Scope decision (spec.md §9 open question, resolved in SPEC_FULL.md):
//! the cache is per-session, not global — two concurrent sessions issuing
//! the identical web search never share a cache entry, avoiding stale
//! cross-session leakage at the cost of some duplicate calls.

use std::collections::HashMap;

use parking_lot::RwLock;
use serde_json::Value;
use uuid::Uuid;

/// Produce a stable cache key from a tool name and its (already redacted or
/// raw) JSON input by serializing with sorted object keys.
pub fn cache_key(tool_name: &str, input: &Value) -> String {
    format!("{tool_name}:{}", canonicalize(input))
}

fn canonicalize(value: &Value) -> String {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let parts: Vec<String> = keys
                .into_iter()
                .map(|k| format!("{k}={}", canonicalize(&map[k])))
                .collect();
            format!("{{{}}}", parts.join(","))
        }
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().map(canonicalize).collect();
            format!("[{}]", parts.join(","))
        }
        other => other.to_string(),
    }
}

#[derive(Default)]
pub struct ToolCache {
    sessions: RwLock<HashMap<Uuid, HashMap<String, Value>>>,
}

impl ToolCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, session_id: &Uuid, tool_name: &str, input: &Value) -> Option<Value> {
        let key = cache_key(tool_name, input);
        self.sessions
            .read()
            .get(session_id)
            .and_then(|m| m.get(&key))
            .cloned()
    }

    pub fn put(&self, session_id: Uuid, tool_name: &str, input: &Value, output: Value) {
        let key = cache_key(tool_name, input);
        self.sessions
            .write()
            .entry(session_id)
            .or_default()
            .insert(key, output);
    }

    pub fn clear_session(&self, session_id: &Uuid) {
        self.sessions.write().remove(session_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonicalize_ignores_key_order() {
        let a = serde_json::json!({"b": 1, "a": 2});
        let b = serde_json::json!({"a": 2, "b": 1});
        assert_eq!(canonicalize(&a), canonicalize(&b));
    }

    #[test]
    fn cache_hit_after_put() {
        let cache = ToolCache::new();
        let session_id = Uuid::new_v4();
        let input = serde_json::json!({"q": "tariffs"});
        assert!(cache.get(&session_id, "web_search", &input).is_none());

        cache.put(session_id, "web_search", &input, serde_json::json!({"results": []}));
        assert!(cache.get(&session_id, "web_search", &input).is_some());
    }

    #[test]
    fn cache_is_scoped_per_session() {
        let cache = ToolCache::new();
        let session_a = Uuid::new_v4();
        let session_b = Uuid::new_v4();
        let input = serde_json::json!({"q": "tariffs"});

        cache.put(session_a, "web_search", &input, serde_json::json!({"results": []}));
        assert!(cache.get(&session_a, "web_search", &input).is_some());
        assert!(cache.get(&session_b, "web_search", &input).is_none());
    }

    #[test]
    fn clear_session_removes_all_entries() {
        let cache = ToolCache::new();
        let session_id = Uuid::new_v4();
        let input = serde_json::json!({"q": "tariffs"});
        cache.put(session_id, "web_search", &input, serde_json::json!({"results": []}));
        cache.clear_session(&session_id);
        assert!(cache.get(&session_id, "web_search", &input).is_none());
    }
}
