use serde::{Deserialize, Serialize};

use crate::model::DegradeMode;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    #[serde(default = "d_debate_rounds")]
    pub debate_rounds: u8,
    #[serde(default)]
    pub enable_followup: bool,
    #[serde(default)]
    pub enable_websearch: bool,
    #[serde(default = "d_retry_max_attempts")]
    pub retry_max_attempts: u32,
    #[serde(default = "d_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
    #[serde(default)]
    pub degrade_mode: DegradeMode,
    /// Fallback `revised` heuristic threshold (percent content delta),
    /// used only when a responder omits the `<<<REVISED:...>>>` footer.
    #[serde(default = "d_revision_threshold_pct")]
    pub revision_threshold_pct: f64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            debate_rounds: d_debate_rounds(),
            enable_followup: false,
            enable_websearch: false,
            retry_max_attempts: d_retry_max_attempts(),
            retry_backoff_ms: d_retry_backoff_ms(),
            degrade_mode: DegradeMode::default(),
            revision_threshold_pct: d_revision_threshold_pct(),
        }
    }
}

fn d_debate_rounds() -> u8 {
    0
}
fn d_retry_max_attempts() -> u32 {
    3
}
fn d_retry_backoff_ms() -> u64 {
    500
}
fn d_revision_threshold_pct() -> f64 {
    15.0
}

impl OrchestratorConfig {
    /// Clamp `debate_rounds` to the spec's supported range (0-2).
    pub fn clamped_debate_rounds(&self) -> u8 {
        self.debate_rounds.min(2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_disables_debate_and_followup() {
        let cfg = OrchestratorConfig::default();
        assert_eq!(cfg.debate_rounds, 0);
        assert!(!cfg.enable_followup);
    }

    #[test]
    fn clamped_debate_rounds_caps_at_two() {
        let cfg = OrchestratorConfig {
            debate_rounds: 9,
            ..OrchestratorConfig::default()
        };
        assert_eq!(cfg.clamped_debate_rounds(), 2);
    }
}
