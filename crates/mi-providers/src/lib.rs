pub mod openai_compat;
pub mod registry;
pub mod sse;
pub mod traits;
pub mod util;

#[cfg(any(test, feature = "test-util"))]
pub mod mock;

pub use openai_compat::OpenAiCompatProvider;
pub use registry::{ProviderInitError, ProviderRegistry};
pub use traits::{ChatRequest, ChatResponse, LlmProvider};
