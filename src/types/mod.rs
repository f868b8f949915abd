// Public modules
pub mod agent_event;
pub mod agent_info;
pub mod context_item;
pub mod run_agent_input;
pub mod wire_message;

// Re-exports
pub use agent_event::AgentEvent;
pub use agent_info::{AgentInfo, HealthStatus};
pub use context_item::ContextItem;
pub use run_agent_input::RunAgentInput;
pub use wire_message::{WireFunctionCall, WireMessage, WireRole, WireToolCall};
