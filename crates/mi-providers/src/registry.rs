//! Resolves configured providers into `Arc<dyn LlmProvider>` instances.
//!
//! Mirrors the startup-policy behavior of a production provider registry:
//! a misconfigured provider is logged and skipped rather than panicking the
//! process, and the registry distinguishes "boot degraded" from "abort
//! startup" via [`mi_domain::config::LlmConfig::require_provider`].

use std::collections::HashMap;
use std::sync::Arc;

use mi_domain::config::{LlmConfig, ProviderKind};
use mi_domain::error::{Error, Result};

use crate::openai_compat::OpenAiCompatProvider;
use crate::traits::LlmProvider;

/// A provider that failed to initialize, recorded instead of aborting.
#[derive(Debug, Clone)]
pub struct ProviderInitError {
    pub provider_id: String,
    pub message: String,
}

pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn LlmProvider>>,
    init_errors: Vec<ProviderInitError>,
}

impl ProviderRegistry {
    pub fn from_config(cfg: &LlmConfig) -> Result<Self> {
        let mut providers = HashMap::new();
        let mut init_errors = Vec::new();

        for provider_cfg in &cfg.providers {
            let built: Result<Arc<dyn LlmProvider>> = match provider_cfg.kind {
                ProviderKind::OpenaiCompat => {
                    OpenAiCompatProvider::from_config(provider_cfg).map(|p| Arc::new(p) as _)
                }
                ProviderKind::Anthropic => Err(Error::Config(format!(
                    "provider '{}': kind 'anthropic' is not implemented",
                    provider_cfg.id
                ))),
            };

            match built {
                Ok(provider) => {
                    providers.insert(provider_cfg.id.clone(), provider);
                }
                Err(e) => {
                    tracing::warn!(provider = %provider_cfg.id, error = %e, "provider init failed");
                    init_errors.push(ProviderInitError {
                        provider_id: provider_cfg.id.clone(),
                        message: e.to_string(),
                    });
                }
            }
        }

        if providers.is_empty() && cfg.require_provider {
            return Err(Error::Config(format!(
                "no LLM providers initialized successfully ({} failures) and require_provider=true",
                init_errors.len()
            )));
        }

        Ok(Self {
            providers,
            init_errors,
        })
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn LlmProvider>> {
        self.providers.get(id).cloned()
    }

    /// The first configured provider, used when no per-agent override exists.
    pub fn any(&self) -> Option<Arc<dyn LlmProvider>> {
        self.providers.values().next().cloned()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub fn init_errors(&self) -> &[ProviderInitError] {
        &self.init_errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mi_domain::config::{AuthConfig, ProviderConfig};

    #[test]
    fn missing_key_is_recorded_not_fatal_when_not_required() {
        let cfg = LlmConfig {
            require_provider: false,
            providers: vec![ProviderConfig {
                id: "ark".into(),
                kind: ProviderKind::OpenaiCompat,
                base_url: "https://ark.example.com/v1".into(),
                auth: AuthConfig::default(),
                default_model: None,
                websearch_capable: false,
            }],
            ..LlmConfig::default()
        };
        let registry = ProviderRegistry::from_config(&cfg).unwrap();
        assert!(registry.is_empty());
        assert_eq!(registry.init_errors().len(), 1);
    }

    #[test]
    fn missing_key_is_fatal_when_required() {
        let cfg = LlmConfig {
            require_provider: true,
            providers: vec![ProviderConfig {
                id: "ark".into(),
                kind: ProviderKind::OpenaiCompat,
                base_url: "https://ark.example.com/v1".into(),
                auth: AuthConfig::default(),
                default_model: None,
                websearch_capable: false,
            }],
            ..LlmConfig::default()
        };
        assert!(ProviderRegistry::from_config(&cfg).is_err());
    }

    #[test]
    fn valid_provider_is_registered() {
        let cfg = LlmConfig {
            providers: vec![ProviderConfig {
                id: "ark".into(),
                kind: ProviderKind::OpenaiCompat,
                base_url: "https://ark.example.com/v1".into(),
                auth: AuthConfig {
                    key: Some("sk-test".into()),
                    ..Default::default()
                },
                default_model: Some("ep-default".into()),
                websearch_capable: false,
            }],
            ..LlmConfig::default()
        };
        let registry = ProviderRegistry::from_config(&cfg).unwrap();
        assert_eq!(registry.len(), 1);
        assert!(registry.get("ark").is_some());
    }
}
