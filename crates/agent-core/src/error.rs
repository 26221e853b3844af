use agent_db::StoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Model call timed out after {0}s")]
    ModelTimeout(u64),

    #[error("Tool execution error: {tool_name}: {message}")]
    ToolExecution { tool_name: String, message: String },

    #[error("Tool {tool_name} timed out after {secs}s")]
    ToolTimeout { tool_name: String, secs: u64 },

    #[error("Unknown tool requested by model: {0}")]
    UnknownTool(String),

    #[error("Turn exceeded {0} model iterations")]
    TurnLimitExceeded(usize),

    #[error("Catalog error: {0}")]
    Store(#[from] StoreError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Schema build error: {0}")]
    Schema(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AgentError {
    /// Whether this error only fails the current turn. Everything else is
    /// fatal for the session.
    pub fn is_turn_error(&self) -> bool {
        matches!(
            self,
            AgentError::Provider(_)
                | AgentError::ModelTimeout(_)
                | AgentError::ToolExecution { .. }
                | AgentError::ToolTimeout { .. }
                | AgentError::UnknownTool(_)
                | AgentError::TurnLimitExceeded(_)
                | AgentError::Store(_)
                | AgentError::Serialization(_)
                | AgentError::Schema(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, AgentError>;
