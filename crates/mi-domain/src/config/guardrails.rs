use serde::{Deserialize, Serialize};

/// Tool-usage guardrail thresholds (spec.md §6 `TOOL_GUARDRAIL_*` options).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GuardrailConfig {
    #[serde(default = "d_max_cost")]
    pub max_estimated_cost_usd: f64,
    #[serde(default = "d_max_error_rate")]
    pub max_error_rate: f64,
    #[serde(default = "d_min_calls_for_error_rate")]
    pub min_calls_for_error_rate: u32,
}

impl Default for GuardrailConfig {
    fn default() -> Self {
        Self {
            max_estimated_cost_usd: d_max_cost(),
            max_error_rate: d_max_error_rate(),
            min_calls_for_error_rate: d_min_calls_for_error_rate(),
        }
    }
}

fn d_max_cost() -> f64 {
    1.0
}
fn d_max_error_rate() -> f64 {
    0.5
}
fn d_min_calls_for_error_rate() -> u32 {
    4
}

impl GuardrailConfig {
    /// True once cumulative estimated cost for a session crosses the ceiling.
    pub fn cost_exceeded(&self, cumulative_cost_usd: f64) -> bool {
        cumulative_cost_usd > self.max_estimated_cost_usd
    }

    /// True once a tool's error rate crosses the ceiling, but only after
    /// enough calls have been sampled to make the rate meaningful.
    pub fn error_rate_exceeded(&self, total_calls: u32, failed_calls: u32) -> bool {
        if total_calls < self.min_calls_for_error_rate {
            return false;
        }
        (failed_calls as f64 / total_calls as f64) > self.max_error_rate
    }
}
