pub mod cache;
pub mod redact;
pub mod registry;
pub mod traits;
pub mod web_search;

pub use cache::ToolCache;
pub use redact::redact;
pub use registry::{ToolOutcome, ToolRegistry, ToolStats};
pub use traits::Tool;
pub use web_search::WebSearchTool;
