//! Shared application state (spec.md §6.AMBIENT), grounded on the teacher's
//! `crates/gateway/src/state.rs`: one `#[derive(Clone)]` struct aggregating
//! every subsystem behind an `Arc`, grouped by concern.

use std::sync::Arc;

use mi_domain::config::Config;
use mi_engine::CancelMap;
use mi_persistence::PersistenceGateway;
use mi_providers::registry::ProviderRegistry;
use mi_providers::LlmProvider;
use mi_tools::ToolRegistry;

#[derive(Clone)]
pub struct AppState {
    // ── Config ───────────────────────────────────────────────────────
    pub config: Arc<Config>,

    // ── Persistence ──────────────────────────────────────────────────
    pub persistence: Arc<PersistenceGateway>,

    // ── LLM ──────────────────────────────────────────────────────────
    pub providers: Arc<ProviderRegistry>,

    // ── Tools & runtime ──────────────────────────────────────────────
    pub tool_registry: Option<Arc<ToolRegistry>>,
    pub cancel_map: Arc<CancelMap>,

    // ── Security ─────────────────────────────────────────────────────
    /// SHA-256 digest of the configured bearer token. `None` disables
    /// auth (dev mode only — see `Config::validate`'s warning).
    pub api_token_hash: Option<Vec<u8>>,
}

impl AppState {
    pub fn new(
        config: Arc<Config>,
        persistence: Arc<PersistenceGateway>,
        providers: Arc<ProviderRegistry>,
        tool_registry: Option<Arc<ToolRegistry>>,
    ) -> Self {
        let api_token_hash = config
            .server
            .auth_token
            .as_ref()
            .map(|token| crate::api::auth::hash_token(token));

        Self {
            config,
            persistence,
            providers,
            tool_registry,
            cancel_map: Arc::new(CancelMap::new()),
            api_token_hash,
        }
    }

    /// The provider used for every gather/debate/synthesize call this
    /// session makes. Callers must pre-flight-check with
    /// [`AppState::active_provider`] before starting a run.
    pub fn active_provider(&self) -> Option<Arc<dyn LlmProvider>> {
        self.providers.any()
    }

    pub fn engine_deps(&self, provider: Arc<dyn LlmProvider>) -> mi_engine::EngineDeps {
        mi_engine::EngineDeps {
            persistence: self.persistence.clone(),
            provider,
            tool_registry: self.tool_registry.clone(),
            cancel_map: self.cancel_map.clone(),
        }
    }
}
