pub mod config;
pub mod error;
pub mod events;
pub mod message;
pub mod model;
pub mod stream;

pub use config::Config;
pub use error::{Error, Result};
pub use events::OrchestratorEvent;
pub use message::{ContentPart, Message, MessageContent, Role, ToolCall, ToolDefinition};
pub use model::*;
pub use stream::{BoxStream, StreamEvent, Usage};
