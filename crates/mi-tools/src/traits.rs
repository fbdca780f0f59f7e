//! The `Tool` trait every tool exposed to agents implements (spec.md §4.5).

use async_trait::async_trait;
use mi_domain::Result;
use serde_json::Value;

#[async_trait]
pub trait Tool: Send + Sync {
    /// Stable identifier used in `ToolInvocation.tool_name` and as the
    /// function-call name surfaced to the LLM.
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// Whether results for this tool may be served from the per-session
    /// cache. Idempotent read-only tools (web search) are cacheable;
    /// anything with side effects should return `false`.
    fn cacheable(&self) -> bool {
        true
    }

    async fn call(&self, input: Value) -> Result<Value>;
}
