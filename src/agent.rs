//! Agent run graph
//!
//! A run alternates between a chat node (one model call) and a tool node
//! (execute requested calls) until the model stops asking for tools:
//!
//! ```text
//! Chat --dispatch--> Tools --always--> Chat --no dispatch--> Terminal
//! ```
//!
//! Control flow lives in the pure [`transition`] function; the nodes only do
//! I/O and report what they produced.

mod chat_node;
mod decision;
mod orchestrator;
mod state;
mod tool_node;
mod transition;

#[cfg(test)]
mod proptests;
#[cfg(test)]
pub mod testing;

pub use orchestrator::{AgentConfig, AgentError, Orchestrator};
pub use state::{ConversationState, Message, Role, RunResult};
#[cfg(test)]
pub use state::ToolCall;
