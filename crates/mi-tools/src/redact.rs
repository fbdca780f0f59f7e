//! Redact sensitive fields from tool input/output before they are persisted
//! or replayed over SSE (spec.md §4.5, §6: `ToolInvocation.input`/`output`
//! are recorded "redacted").

use serde_json::Value;

const SENSITIVE_KEYS: &[&str] = &["api_key", "apikey", "token", "secret", "password", "authorization"];

/// Recursively replace the value of any object key that looks sensitive
/// with a fixed placeholder. Arrays and nested objects are walked.
pub fn redact(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut out = serde_json::Map::with_capacity(map.len());
            for (k, v) in map {
                if SENSITIVE_KEYS.iter().any(|s| k.to_lowercase().contains(s)) {
                    out.insert(k.clone(), Value::String("***redacted***".into()));
                } else {
                    out.insert(k.clone(), redact(v));
                }
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(redact).collect()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redacts_top_level_sensitive_key() {
        let input = serde_json::json!({"query": "tariffs", "api_key": "sk-live-123"});
        let redacted = redact(&input);
        assert_eq!(redacted["api_key"], "***redacted***");
        assert_eq!(redacted["query"], "tariffs");
    }

    #[test]
    fn redacts_nested_sensitive_key() {
        let input = serde_json::json!({"auth": {"Authorization": "Bearer x"}});
        let redacted = redact(&input);
        assert_eq!(redacted["auth"]["Authorization"], "***redacted***");
    }

    #[test]
    fn leaves_non_sensitive_values_untouched() {
        let input = serde_json::json!({"a": [1, 2, {"b": "c"}]});
        assert_eq!(redact(&input), input);
    }
}
