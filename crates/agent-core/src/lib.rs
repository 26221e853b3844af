pub mod agent_loop;
pub mod config;
pub mod error;
pub mod provider;
pub mod session;
pub mod tool_registry;
pub mod types;

pub use agent_loop::{AgentLoop, AgentSettings, TurnOutcome};
pub use config::AppConfig;
pub use error::AgentError;
pub use provider::{ChatModel, ModelReply, OpenAiChatModel};
pub use session::Session;
pub use tool_registry::{Tool, ToolRegistry};
