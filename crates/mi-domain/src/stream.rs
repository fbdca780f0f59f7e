use serde::{Deserialize, Serialize};
use std::pin::Pin;

use futures_core::Stream;

/// A boxed, pinned stream — the common currency between provider adapters
/// and the agent stage loop.
pub type BoxStream<'a, T> = Pin<Box<dyn Stream<Item = T> + Send + 'a>>;

/// Incremental events yielded by a provider's streaming chat call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum StreamEvent {
    /// Reasoning/thinking delta (e.g. DeepSeek `reasoning_content`, or text
    /// preceding the `THINKING_ENDS` sentinel).
    #[serde(rename = "thinking")]
    Thinking { text: String },
    /// Plain text delta.
    #[serde(rename = "token")]
    Token { text: String },
    #[serde(rename = "tool_call_started")]
    ToolCallStarted { call_id: String, tool_name: String },
    #[serde(rename = "tool_call_delta")]
    ToolCallDelta { call_id: String, delta: String },
    #[serde(rename = "tool_call_finished")]
    ToolCallFinished {
        call_id: String,
        tool_name: String,
        arguments: serde_json::Value,
    },
    #[serde(rename = "done")]
    Done {
        usage: Option<Usage>,
        finish_reason: Option<String>,
    },
    #[serde(rename = "error")]
    Error { message: String },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}
