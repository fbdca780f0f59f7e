mod guardrails;
mod llm;
mod orchestrator;
mod server;
mod store;

pub use guardrails::*;
pub use llm::*;
pub use orchestrator::*;
pub use server::*;
pub use store::*;

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
    #[serde(default)]
    pub guardrails: GuardrailConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "d_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: d_log_level(),
            json: false,
        }
    }
}

fn d_log_level() -> String {
    "info".to_string()
}

/// Severity level for a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Error,
    Warning,
}

/// A single configuration validation issue.
#[derive(Debug, Clone)]
pub struct ConfigError {
    pub severity: ConfigSeverity,
    pub field: String,
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            ConfigSeverity::Error => "ERROR",
            ConfigSeverity::Warning => "WARN",
        };
        write!(f, "[{tag}] {}: {}", self.field, self.message)
    }
}

impl Config {
    /// Validate the configuration and return a list of issues. An empty
    /// vec means there is nothing to report; `Error`-severity issues mean
    /// the process should refuse to serve traffic.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if self.server.bind_addr.parse::<std::net::SocketAddr>().is_err() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "server.bind_addr".into(),
                message: format!(
                    "bind_addr must be a valid socket address (got \"{}\")",
                    self.server.bind_addr
                ),
            });
        }

        if self.server.auth_token.is_none() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Warning,
                field: "server.auth_token".into(),
                message: "no auth token configured; all requests will be accepted unauthenticated"
                    .into(),
            });
        }

        if self.llm.providers.is_empty() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Warning,
                field: "llm.providers".into(),
                message: "no LLM providers configured".into(),
            });
        }

        let mut seen_ids: HashSet<&str> = HashSet::new();
        for (i, provider) in self.llm.providers.iter().enumerate() {
            if provider.id.is_empty() {
                errors.push(ConfigError {
                    severity: ConfigSeverity::Error,
                    field: format!("llm.providers[{i}].id"),
                    message: "provider id must not be empty".into(),
                });
            } else if !seen_ids.insert(provider.id.as_str()) {
                errors.push(ConfigError {
                    severity: ConfigSeverity::Error,
                    field: format!("llm.providers[{i}].id"),
                    message: format!("duplicate provider id \"{}\"", provider.id),
                });
            }

            if provider.base_url.is_empty() {
                errors.push(ConfigError {
                    severity: ConfigSeverity::Error,
                    field: format!("llm.providers[{i}].base_url"),
                    message: "provider base_url must not be empty".into(),
                });
            } else if !provider.base_url.starts_with("http://")
                && !provider.base_url.starts_with("https://")
            {
                errors.push(ConfigError {
                    severity: ConfigSeverity::Error,
                    field: format!("llm.providers[{i}].base_url"),
                    message: format!(
                        "base_url must start with http:// or https:// (got \"{}\")",
                        provider.base_url
                    ),
                });
            }
        }

        if self.orchestrator.debate_rounds > 2 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Warning,
                field: "orchestrator.debate_rounds".into(),
                message: format!(
                    "debate_rounds={} exceeds the supported maximum of 2 and will be clamped",
                    self.orchestrator.debate_rounds
                ),
            });
        }

        if self.orchestrator.retry_max_attempts == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "orchestrator.retry_max_attempts".into(),
                message: "retry_max_attempts must be at least 1".into(),
            });
        }

        if !(0.0..=100.0).contains(&self.orchestrator.revision_threshold_pct) {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "orchestrator.revision_threshold_pct".into(),
                message: "revision_threshold_pct must be between 0 and 100".into(),
            });
        }

        if self.guardrails.max_error_rate <= 0.0 || self.guardrails.max_error_rate > 1.0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "guardrails.max_error_rate".into(),
                message: "max_error_rate must be in (0, 1]".into(),
            });
        }

        if self.store.data_dir.is_empty() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "store.data_dir".into(),
                message: "data_dir must not be empty".into(),
            });
        }

        errors
    }

    /// True if any validation issue is `Error` severity.
    pub fn has_fatal_errors(&self) -> bool {
        self.validate()
            .iter()
            .any(|e| e.severity == ConfigSeverity::Error)
    }
}
