use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "d_timeout_ms")]
    pub default_timeout_ms: u64,
    /// Startup policy: abort (true) or boot degraded (false) if the
    /// configured provider fails to initialize.
    #[serde(default)]
    pub require_provider: bool,
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,
    /// Per-model pricing for `cost_mode=estimate` accounting (§4.5).
    #[serde(default)]
    pub pricing: std::collections::HashMap<String, ModelPricing>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            default_timeout_ms: d_timeout_ms(),
            require_provider: false,
            providers: Vec::new(),
            pricing: std::collections::HashMap::new(),
        }
    }
}

fn d_timeout_ms() -> u64 {
    60_000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub id: String,
    pub kind: ProviderKind,
    pub base_url: String,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub default_model: Option<String>,
    /// Must be a web-search-tool-capable model when `enable_websearch=true`
    /// (spec.md §6 `MODEL_NAME` recognized option).
    #[serde(default)]
    pub websearch_capable: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    OpenaiCompat,
    Anthropic,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AuthConfig {
    #[serde(default)]
    pub mode: AuthMode,
    #[serde(default)]
    pub header: Option<String>,
    #[serde(default)]
    pub prefix: Option<String>,
    /// Env var containing the key (spec.md §6 `ARK_API_KEY`).
    #[serde(default)]
    pub env: Option<String>,
    #[serde(default)]
    pub key: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AuthMode {
    #[default]
    ApiKey,
    None,
}

/// Pricing per million tokens for a specific model.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ModelPricing {
    pub input_per_1m: f64,
    pub output_per_1m: f64,
}

impl ModelPricing {
    pub fn estimate_cost(&self, input_tokens: u32, output_tokens: u32) -> f64 {
        (input_tokens as f64 * self.input_per_1m + output_tokens as f64 * self.output_per_1m)
            / 1_000_000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn estimate_cost_is_linear_in_tokens() {
        let pricing = ModelPricing {
            input_per_1m: 5.0,
            output_per_1m: 15.0,
        };
        let cost = pricing.estimate_cost(1_000_000, 1_000_000);
        assert!((cost - 20.0).abs() < 1e-9);
    }

    #[test]
    fn llm_config_default_allows_no_provider() {
        let cfg = LlmConfig::default();
        assert!(cfg.providers.is_empty());
        assert!(!cfg.require_provider);
    }
}
