pub mod agent_results;
pub mod debate;
pub mod events;
pub mod feedback;
pub mod gateway;
pub mod sessions;
pub mod store;
pub mod tool_invocations;

pub use agent_results::AgentResultStore;
pub use debate::DebateExchangeStore;
pub use events::WorkflowEventStore;
pub use feedback::FeedbackStore;
pub use gateway::PersistenceGateway;
pub use sessions::SessionStore;
pub use store::{JsonlStore, Keyed};
pub use tool_invocations::ToolInvocationStore;
