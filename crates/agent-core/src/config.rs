use crate::error::AgentError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a movie database assistant.

Rules:
- ALWAYS use the provided tools when the user asks about movies.
- NEVER use your own knowledge.
- Base your answers ONLY on tool results.
- If no data is found, explicitly say so.
- Do not guess or hallucinate.";

/// Top-level application configuration, loaded from TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub provider: ProviderConfig,
    pub agent: AgentConfig,
    pub catalog: CatalogConfig,
    pub search: SearchConfig,
    pub system_prompt: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            provider: ProviderConfig::default(),
            agent: AgentConfig::default(),
            catalog: CatalogConfig::default(),
            search: SearchConfig::default(),
            system_prompt: Some(DEFAULT_SYSTEM_PROMPT.into()),
        }
    }
}

impl AppConfig {
    /// Load configuration from default path (~/.config/movie-agent/config.toml),
    /// falling back to defaults if the file doesn't exist.
    pub fn load() -> anyhow::Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject limits that would make every turn fail.
    pub fn validate(&self) -> Result<(), AgentError> {
        let agent = &self.agent;
        for (key, value) in [
            ("agent.max_iterations", agent.max_iterations as u64),
            ("agent.model_timeout_secs", agent.model_timeout_secs),
            ("agent.tool_timeout_secs", agent.tool_timeout_secs),
        ] {
            if value == 0 {
                return Err(AgentError::Config(format!("{} must be at least 1", key)));
            }
        }
        Ok(())
    }

    /// Write current configuration to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Default config file path.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("movie-agent")
            .join("config.toml")
    }

    /// Data directory for REPL history.
    pub fn data_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("movie-agent")
    }
}

/// LLM provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Base URL for the OpenAI-compatible API.
    pub api_base: String,
    /// Model name.
    pub model: String,
    /// API key. Takes precedence over `api_key_env`.
    pub api_key: Option<String>,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    /// Maximum tokens to generate.
    pub max_tokens: u32,
    /// Sampling temperature; omitted from requests when unset.
    pub temperature: Option<f32>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.openai.com/v1".into(),
            model: "gpt-5-mini".into(),
            api_key: None,
            api_key_env: "OPENAI_API_KEY".into(),
            max_tokens: 4096,
            temperature: None,
        }
    }
}

impl ProviderConfig {
    /// Resolve the API key from config or the environment.
    pub fn resolve_api_key(&self) -> Result<String, AgentError> {
        if let Some(key) = self.api_key.as_ref().filter(|k| !k.is_empty()) {
            return Ok(key.clone());
        }
        require_env(&self.api_key_env)
    }
}

/// Whether conversation state survives between user turns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryPolicy {
    /// Every input starts a fresh conversation.
    #[default]
    PerTurn,
    /// Completed turns are kept and replayed on the next input.
    Accumulate,
}

/// Agent loop limits and history handling.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Maximum model calls per turn.
    pub max_iterations: usize,
    /// Timeout for a single model call, in seconds.
    pub model_timeout_secs: u64,
    /// Timeout for a single tool call, in seconds.
    pub tool_timeout_secs: u64,
    /// History policy; `None` lets the selected mode decide.
    pub history: Option<HistoryPolicy>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: 20,
            model_timeout_secs: 120,
            tool_timeout_secs: 30,
            history: None,
        }
    }
}

impl AgentConfig {
    pub fn model_timeout(&self) -> Duration {
        Duration::from_secs(self.model_timeout_secs)
    }

    pub fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.tool_timeout_secs)
    }
}

/// Local movie catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Path to the SQLite catalog file.
    pub db_path: PathBuf,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("movies.db"),
        }
    }
}

/// Remote web-search tool server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// MCP endpoint (streamable HTTP).
    pub mcp_url: String,
    /// Environment variable holding the search API key.
    pub api_key_env: String,
    /// System instruction for the search agent; none by default.
    pub system_prompt: Option<String>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            mcp_url: "https://mcp.tavily.com/mcp/".into(),
            api_key_env: "TAVILY_API_KEY".into(),
            system_prompt: None,
        }
    }
}

impl SearchConfig {
    /// Full endpoint URL with the API key from the environment attached.
    pub fn endpoint(&self) -> Result<String, AgentError> {
        let key = require_env(&self.api_key_env)?;
        Ok(format!("{}?tavilyApiKey={}", self.mcp_url, key))
    }
}

fn require_env(name: &str) -> Result<String, AgentError> {
    match std::env::var(name) {
        Ok(v) if !v.is_empty() => Ok(v),
        _ => Err(AgentError::Config(format!("{} not found in environment", name))),
    }
}
