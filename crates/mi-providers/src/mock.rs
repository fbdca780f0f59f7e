//! A scripted [`LlmProvider`] for deterministic tests, replaying a fixed
//! sequence of [`StreamEvent`]s per call rather than hitting the network.
//! Used to reproduce induced-failure scenarios (retry exhaustion, degrade
//! mode) without a live LLM endpoint.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use mi_domain::error::{Error, Result};
use mi_domain::stream::{BoxStream, StreamEvent};

use crate::traits::{ChatRequest, ChatResponse, LlmProvider};

/// One scripted outcome for a single `chat`/`chat_stream` call.
pub enum ScriptedCall {
    Events(Vec<StreamEvent>),
    Error(String),
}

pub struct MockLlmProvider {
    id: String,
    calls: Mutex<Vec<ScriptedCall>>,
    cursor: AtomicUsize,
}

impl MockLlmProvider {
    pub fn new(id: impl Into<String>, calls: Vec<ScriptedCall>) -> Self {
        Self {
            id: id.into(),
            calls: Mutex::new(calls),
            cursor: AtomicUsize::new(0),
        }
    }

    fn next_call(&self) -> Result<ScriptedCall> {
        let idx = self.cursor.fetch_add(1, Ordering::SeqCst);
        let mut calls = self.calls.lock().unwrap();
        if idx >= calls.len() {
            return Err(Error::Other(format!(
                "MockLlmProvider '{}' exhausted scripted calls at index {idx}",
                self.id
            )));
        }
        Ok(std::mem::replace(
            &mut calls[idx],
            ScriptedCall::Events(Vec::new()),
        ))
    }
}

#[async_trait]
impl LlmProvider for MockLlmProvider {
    async fn chat(&self, _req: &ChatRequest) -> Result<ChatResponse> {
        match self.next_call()? {
            ScriptedCall::Error(message) => Err(Error::Provider {
                provider: self.id.clone(),
                message,
            }),
            ScriptedCall::Events(events) => {
                let mut content = String::new();
                let mut tool_calls = Vec::new();
                let mut usage = None;
                let mut finish_reason = None;
                for event in events {
                    match event {
                        StreamEvent::Token { text } | StreamEvent::Thinking { text } => {
                            content.push_str(&text)
                        }
                        StreamEvent::ToolCallFinished {
                            call_id,
                            tool_name,
                            arguments,
                        } => tool_calls.push(mi_domain::message::ToolCall {
                            call_id,
                            tool_name,
                            arguments,
                        }),
                        StreamEvent::Done {
                            usage: u,
                            finish_reason: fr,
                        } => {
                            usage = u;
                            finish_reason = fr;
                        }
                        _ => {}
                    }
                }
                Ok(ChatResponse {
                    content,
                    tool_calls,
                    usage,
                    model: self.id.clone(),
                    finish_reason,
                })
            }
        }
    }

    async fn chat_stream(&self, _req: &ChatRequest) -> Result<BoxStream<'static, Result<StreamEvent>>> {
        match self.next_call()? {
            ScriptedCall::Error(message) => Err(Error::Provider {
                provider: self.id.clone(),
                message,
            }),
            ScriptedCall::Events(events) => {
                let stream = futures_util::stream::iter(events.into_iter().map(Ok));
                Ok(Box::pin(stream))
            }
        }
    }

    fn provider_id(&self) -> &str {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;

    #[tokio::test]
    async fn replays_scripted_events_in_order() {
        let provider = MockLlmProvider::new(
            "mock",
            vec![ScriptedCall::Events(vec![
                StreamEvent::Thinking {
                    text: "thinking...".into(),
                },
                StreamEvent::Token {
                    text: "report".into(),
                },
                StreamEvent::Done {
                    usage: None,
                    finish_reason: Some("stop".into()),
                },
            ])],
        );
        let req = ChatRequest::default();
        let mut stream = provider.chat_stream(&req).await.unwrap();
        let mut events = Vec::new();
        while let Some(ev) = stream.next().await {
            events.push(ev.unwrap());
        }
        assert_eq!(events.len(), 3);
        assert!(matches!(events[0], StreamEvent::Thinking { .. }));
    }

    #[tokio::test]
    async fn exhausted_script_returns_error() {
        let provider = MockLlmProvider::new("mock", vec![]);
        let req = ChatRequest::default();
        assert!(provider.chat(&req).await.is_err());
    }

    #[tokio::test]
    async fn scripted_error_surfaces_as_provider_error() {
        let provider = MockLlmProvider::new("mock", vec![ScriptedCall::Error("boom".into())]);
        let req = ChatRequest::default();
        let err = provider.chat(&req).await.unwrap_err();
        assert!(err.to_string().contains("boom"));
    }
}
