use crate::config::AppConfig;
use crate::error::AgentError;
use crate::provider::{ChatModel, ModelReply};
use crate::tool_registry::{Tool, ToolRegistry};
use crate::types::{AgentEvent, Message, Role, ToolCall, ToolOutput, ToolSchema};

use futures::future::join_all;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Limits and prompt for a single turn.
#[derive(Debug, Clone)]
pub struct AgentSettings {
    /// Maximum model calls per turn before failing with `TurnLimitExceeded`.
    pub max_iterations: usize,
    pub model_timeout: Duration,
    pub tool_timeout: Duration,
    /// Prepended when the history does not already start with a system message.
    pub system_prompt: Option<String>,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

impl AgentSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            max_iterations: config.agent.max_iterations,
            model_timeout: config.agent.model_timeout(),
            tool_timeout: config.agent.tool_timeout(),
            system_prompt: config.system_prompt.clone(),
        }
    }
}

/// Where a turn currently is.
#[derive(Debug)]
enum LoopState {
    AwaitingModel,
    ExecutingTools(Vec<ToolCall>),
    Done(Message),
}

/// Result of a completed turn.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    /// The final assistant message.
    pub reply: Message,
    /// Full history of the turn, including the system prompt, tool calls and results.
    pub history: Vec<Message>,
    /// Number of model calls made.
    pub iterations: usize,
}

/// The core agent loop: alternates model calls and tool execution until the
/// model answers without requesting tools.
pub struct AgentLoop {
    model: Arc<dyn ChatModel>,
    tools: Arc<ToolRegistry>,
    settings: AgentSettings,
}

impl AgentLoop {
    pub fn new(model: Arc<dyn ChatModel>, tools: Arc<ToolRegistry>, settings: AgentSettings) -> Self {
        Self {
            model,
            tools,
            settings,
        }
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Run one turn starting from `history`.
    pub async fn run(&self, history: Vec<Message>) -> Result<TurnOutcome, AgentError> {
        self.run_with_events(history, None).await
    }

    /// Run one turn, reporting progress on `event_tx` if given.
    ///
    /// `history` is owned by the turn; the caller only sees the extended
    /// history through the returned [`TurnOutcome`], so an error or a dropped
    /// future leaves the caller's state untouched.
    pub async fn run_with_events(
        &self,
        history: Vec<Message>,
        event_tx: Option<&mpsc::UnboundedSender<AgentEvent>>,
    ) -> Result<TurnOutcome, AgentError> {
        let emit = |event: AgentEvent| {
            if let Some(tx) = event_tx {
                let _ = tx.send(event);
            }
        };

        let schemas = self.tools.schemas();
        let mut history = self.seed(history);
        let mut iterations = 0;
        let mut state = LoopState::AwaitingModel;

        loop {
            state = match state {
                LoopState::AwaitingModel => {
                    iterations += 1;
                    if iterations > self.settings.max_iterations {
                        warn!("Hit max model iterations ({})", self.settings.max_iterations);
                        return Err(AgentError::TurnLimitExceeded(self.settings.max_iterations));
                    }
                    debug!("Agent loop iteration {}", iterations);

                    let reply = self.call_model(&history, &schemas).await?;
                    let message = reply.into_message();
                    history.push(message.clone());

                    if message.requested_tools().is_empty() {
                        LoopState::Done(message)
                    } else {
                        let calls = message.requested_tools().to_vec();
                        debug!("Routing to tools: {:?}", calls);
                        emit(AgentEvent::RoutingToTools(calls.clone()));
                        LoopState::ExecutingTools(calls)
                    }
                }
                LoopState::ExecutingTools(calls) => {
                    let outputs = self.execute_tools(&calls).await?;
                    for output in outputs {
                        history.push(Message::tool_result(&output.tool_call_id, &output.content));
                        emit(AgentEvent::ToolResult(output));
                    }
                    LoopState::AwaitingModel
                }
                LoopState::Done(reply) => {
                    emit(AgentEvent::Done(reply.clone()));
                    return Ok(TurnOutcome {
                        reply,
                        history,
                        iterations,
                    });
                }
            };
        }
    }

    /// Prefix the system prompt unless the history already starts with one.
    fn seed(&self, mut history: Vec<Message>) -> Vec<Message> {
        let has_system = history.first().map(|m| m.role == Role::System).unwrap_or(false);
        if !has_system {
            if let Some(prompt) = &self.settings.system_prompt {
                history.insert(0, Message::system(prompt.as_str()));
            }
        }
        history
    }

    async fn call_model(&self, history: &[Message], schemas: &[ToolSchema]) -> Result<ModelReply, AgentError> {
        let timeout = self.settings.model_timeout;
        match tokio::time::timeout(timeout, self.model.complete(history, schemas)).await {
            Ok(reply) => reply,
            Err(_) => Err(AgentError::ModelTimeout(timeout.as_secs())),
        }
    }

    /// Resolve every call up front, then run them concurrently. Outputs come
    /// back in request order.
    async fn execute_tools(&self, calls: &[ToolCall]) -> Result<Vec<ToolOutput>, AgentError> {
        let mut resolved: Vec<(&ToolCall, Arc<dyn Tool>, Value)> = Vec::with_capacity(calls.len());
        for call in calls {
            let tool = self
                .tools
                .get(&call.name)
                .cloned()
                .ok_or_else(|| AgentError::UnknownTool(call.name.clone()))?;
            let args = parse_arguments(call)?;
            resolved.push((call, tool, args));
        }

        let timeout = self.settings.tool_timeout;
        let runs = resolved.into_iter().map(|(call, tool, args)| async move {
            debug!("Executing tool {} ({})", call.name, call.id);
            let content = tokio::time::timeout(timeout, tool.execute(args))
                .await
                .map_err(|_| AgentError::ToolTimeout {
                    tool_name: call.name.clone(),
                    secs: timeout.as_secs(),
                })??;
            Ok::<_, AgentError>(ToolOutput {
                tool_call_id: call.id.clone(),
                tool_name: call.name.clone(),
                content,
            })
        });

        join_all(runs).await.into_iter().collect()
    }
}

/// Parse a call's raw argument text. Empty arguments mean an empty object.
fn parse_arguments(call: &ToolCall) -> Result<Value, AgentError> {
    if call.arguments.trim().is_empty() {
        return Ok(Value::Object(Default::default()));
    }
    serde_json::from_str(&call.arguments).map_err(|e| AgentError::ToolExecution {
        tool_name: call.name.clone(),
        message: format!("Invalid JSON arguments: {}", e),
    })
}
