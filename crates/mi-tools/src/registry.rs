//! Tool Registry (spec.md §4.5): dispatch table plus per-session usage
//! counters and guardrail checks.
//!
//! Grounded on `crates/tools/src/manager.rs`'s `ProcessManager` — an
//! `RwLock<HashMap<...>>` registry keyed by session, with per-entity
//! bookkeeping updated under a short write lock and read back without
//! holding it across an `.await`. The dispatch-table shape (name ->
//! boxed handler) is grounded on `crates/gateway/src/runtime/tools.rs`'s
//! `build_tool_definitions`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use mi_domain::config::GuardrailConfig;
use mi_domain::{Error, Result};
use parking_lot::RwLock;
use serde_json::Value;
use uuid::Uuid;

use crate::cache::ToolCache;
use crate::redact::redact;
use crate::traits::Tool;

#[derive(Debug, Clone, Default)]
pub struct ToolStats {
    pub total_calls: u32,
    pub failed_calls: u32,
    pub cache_hits: u32,
    pub total_duration_ms: u64,
}

impl ToolStats {
    pub fn error_rate(&self) -> f64 {
        if self.total_calls == 0 {
            return 0.0;
        }
        self.failed_calls as f64 / self.total_calls as f64
    }

    pub fn avg_duration_ms(&self) -> f64 {
        if self.total_calls == 0 {
            return 0.0;
        }
        self.total_duration_ms as f64 / self.total_calls as f64
    }

    pub fn cache_hit_rate(&self) -> f64 {
        if self.total_calls == 0 {
            return 0.0;
        }
        self.cache_hits as f64 / self.total_calls as f64
    }
}

/// Outcome of a dispatched tool call, shaped to feed directly into a
/// `mi_domain::model::ToolInvocation` record by the caller.
pub struct ToolOutcome {
    pub output: Result<Value>,
    pub cache_hit: bool,
    pub duration_ms: u64,
    pub redacted_input: Value,
    pub redacted_output: Option<Value>,
}

pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    cache: ToolCache,
    stats: RwLock<HashMap<Uuid, HashMap<String, ToolStats>>>,
    guardrails: GuardrailConfig,
}

impl ToolRegistry {
    pub fn new(guardrails: GuardrailConfig) -> Self {
        Self {
            tools: HashMap::new(),
            cache: ToolCache::new(),
            stats: RwLock::new(HashMap::new()),
            guardrails,
        }
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        self.tools.keys().cloned().collect()
    }

    /// Dispatch a call, serving from cache when possible and recording
    /// per-session stats regardless of outcome.
    pub async fn invoke(&self, session_id: Uuid, tool_name: &str, input: Value) -> ToolOutcome {
        let redacted_input = redact(&input);

        let Some(tool) = self.get(tool_name) else {
            self.record(session_id, tool_name, true, 0, false);
            return ToolOutcome {
                output: Err(Error::Other(format!("unknown tool: {tool_name}"))),
                cache_hit: false,
                duration_ms: 0,
                redacted_input,
                redacted_output: None,
            };
        };

        if tool.cacheable() {
            if let Some(cached) = self.cache.get(&session_id, tool_name, &input) {
                self.record(session_id, tool_name, false, 0, true);
                return ToolOutcome {
                    output: Ok(cached.clone()),
                    cache_hit: true,
                    duration_ms: 0,
                    redacted_input,
                    redacted_output: Some(redact(&cached)),
                };
            }
        }

        let started = Instant::now();
        let result = tool.call(input.clone()).await;
        let duration_ms = started.elapsed().as_millis() as u64;
        let failed = result.is_err();
        self.record(session_id, tool_name, failed, duration_ms, false);

        if let Ok(output) = &result {
            if tool.cacheable() {
                self.cache.put(session_id, tool_name, &input, output.clone());
            }
        }

        let redacted_output = result.as_ref().ok().map(redact);
        ToolOutcome {
            output: result,
            cache_hit: false,
            duration_ms,
            redacted_input,
            redacted_output,
        }
    }

    fn record(&self, session_id: Uuid, tool_name: &str, failed: bool, duration_ms: u64, cache_hit: bool) {
        let mut stats = self.stats.write();
        let entry = stats.entry(session_id).or_default().entry(tool_name.to_string()).or_default();
        entry.total_calls += 1;
        if failed {
            entry.failed_calls += 1;
        }
        if cache_hit {
            entry.cache_hits += 1;
        }
        entry.total_duration_ms += duration_ms;
    }

    pub fn stats_for(&self, session_id: &Uuid, tool_name: &str) -> ToolStats {
        self.stats
            .read()
            .get(session_id)
            .and_then(|m| m.get(tool_name))
            .cloned()
            .unwrap_or_default()
    }

    /// True once this tool's error rate within the session crosses the
    /// configured guardrail (§6 `TOOL_GUARDRAIL_MAX_ERROR_RATE`).
    pub fn error_rate_guardrail_tripped(&self, session_id: &Uuid, tool_name: &str) -> bool {
        let stats = self.stats_for(session_id, tool_name);
        self.guardrails
            .error_rate_exceeded(stats.total_calls, stats.failed_calls)
    }

    /// True once cumulative estimated cost (supplied by the caller, which
    /// tracks actual `ToolInvocation` records via persistence) crosses the
    /// cost ceiling (§6 `TOOL_GUARDRAIL_MAX_ESTIMATED_COST_USD`).
    pub fn cost_guardrail_tripped(&self, cumulative_cost_usd: f64) -> bool {
        self.guardrails.cost_exceeded(cumulative_cost_usd)
    }

    pub fn clear_session(&self, session_id: &Uuid) {
        self.stats.write().remove(session_id);
        self.cache.clear_session(session_id);
    }
}
