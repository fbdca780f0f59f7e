pub mod agent_stage;
pub mod cancel;
pub mod content;
pub mod debate;
pub mod events;
pub mod graph;
pub mod packer;
pub mod retry;

pub use cancel::{CancelMap, CancelToken};
pub use events::EventSink;
pub use graph::{run_session, EngineDeps};
