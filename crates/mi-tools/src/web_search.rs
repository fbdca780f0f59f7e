//! Web search stub tool.
//!
//! Grounded on the teacher's `web.search` tool definition (`runtime/tools.rs`),
//! which ships as a stub: "Search the web (SERP). Currently unavailable —
//! returns an error with alternatives." SPEC_FULL.md's Non-goals exclude
//! building a real SERP integration, but the tool still needs to exist so the
//! debate/research stages can name it, attempt it, and gracefully degrade
//! per the `degrade_mode` policy when it fails.

use async_trait::async_trait;
use mi_domain::{Error, Result};
use serde_json::Value;

use crate::traits::Tool;

pub struct WebSearchTool;

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        "web_search"
    }

    fn description(&self) -> &str {
        "Search the web for supporting evidence. Currently unavailable in this deployment — \
         callers should fall back to model-internal knowledge or mark the claim unverified."
    }

    fn cacheable(&self) -> bool {
        false
    }

    async fn call(&self, _input: Value) -> Result<Value> {
        Err(Error::Other(
            "web_search is not available in this deployment; rely on provider knowledge or \
             mark findings as unverified"
                .into(),
        ))
    }
}
