//! Conversational model client.
//!
//! The agent loop only depends on [`ChatModel`]; [`OpenAiChatModel`] is the
//! production implementation over any OpenAI-compatible chat-completions API.

use crate::config::ProviderConfig;
use crate::error::AgentError;
use crate::types::{Message, Role, ToolCall, ToolSchema};

use async_openai::config::OpenAIConfig;
use async_openai::types::{
    ChatCompletionMessageToolCall, ChatCompletionRequestAssistantMessageArgs,
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestToolMessageArgs, ChatCompletionRequestUserMessageArgs,
    ChatCompletionTool, ChatCompletionToolArgs, ChatCompletionToolType,
    CreateChatCompletionRequestArgs, FunctionCall, FunctionObjectArgs,
};
use async_openai::Client;
use async_trait::async_trait;
use tracing::debug;

/// What the model said back: free text, tool requests, or both.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelReply {
    pub content: String,
    pub tool_calls: Vec<ToolCall>,
}

impl ModelReply {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            tool_calls: Vec::new(),
        }
    }

    pub fn tools(tool_calls: Vec<ToolCall>) -> Self {
        Self {
            content: String::new(),
            tool_calls,
        }
    }

    /// Convert into the assistant message that goes into the history.
    pub fn into_message(self) -> Message {
        if self.tool_calls.is_empty() {
            Message::assistant(self.content)
        } else {
            Message::assistant_with_tool_calls(self.content, self.tool_calls)
        }
    }
}

/// A language model that can be offered tools.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Send the history and available tools; return the model's reply.
    async fn complete(&self, messages: &[Message], tools: &[ToolSchema]) -> Result<ModelReply, AgentError>;
}

/// Chat-completions client built on `async-openai`.
pub struct OpenAiChatModel {
    client: Client<OpenAIConfig>,
    config: ProviderConfig,
}

impl OpenAiChatModel {
    /// Build a client; fails with `AgentError::Config` when no API key is available.
    pub fn from_config(config: &ProviderConfig) -> Result<Self, AgentError> {
        let api_key = config.resolve_api_key()?;
        let openai_config = OpenAIConfig::new()
            .with_api_base(&config.api_base)
            .with_api_key(api_key);

        Ok(Self {
            client: Client::with_config(openai_config),
            config: config.clone(),
        })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }
}

#[async_trait]
impl ChatModel for OpenAiChatModel {
    async fn complete(&self, messages: &[Message], tools: &[ToolSchema]) -> Result<ModelReply, AgentError> {
        let mut request_builder = CreateChatCompletionRequestArgs::default();
        request_builder
            .model(&self.config.model)
            .messages(to_openai_messages(messages)?)
            .max_completion_tokens(self.config.max_tokens);
        if let Some(temperature) = self.config.temperature {
            request_builder.temperature(temperature);
        }
        if !tools.is_empty() {
            request_builder.tools(to_openai_tools(tools)?);
        }

        let request = request_builder
            .build()
            .map_err(|e| AgentError::Provider(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| AgentError::Provider(e.to_string()))?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AgentError::Provider("No choices in response".into()))?;

        let tool_calls: Vec<ToolCall> = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|tc| ToolCall {
                id: tc.id,
                name: tc.function.name,
                arguments: tc.function.arguments,
            })
            .collect();
        debug!("Model replied with {} tool call(s)", tool_calls.len());

        Ok(ModelReply {
            content: choice.message.content.unwrap_or_default(),
            tool_calls,
        })
    }
}

fn to_openai_tools(schemas: &[ToolSchema]) -> Result<Vec<ChatCompletionTool>, AgentError> {
    schemas
        .iter()
        .map(|s| {
            let func = FunctionObjectArgs::default()
                .name(&s.name)
                .description(&s.description)
                .parameters(s.parameters.clone())
                .build()
                .map_err(|e| AgentError::Schema(format!("function '{}': {}", s.name, e)))?;
            ChatCompletionToolArgs::default()
                .r#type(ChatCompletionToolType::Function)
                .function(func)
                .build()
                .map_err(|e| AgentError::Schema(format!("tool '{}': {}", s.name, e)))
        })
        .collect()
}

/// Convert our Message types to async-openai request messages.
fn to_openai_messages(messages: &[Message]) -> Result<Vec<ChatCompletionRequestMessage>, AgentError> {
    messages
        .iter()
        .map(|msg| {
            let converted = match msg.role {
                Role::System => ChatCompletionRequestSystemMessageArgs::default()
                    .content(msg.content.as_str())
                    .build()
                    .map(ChatCompletionRequestMessage::System),
                Role::User => ChatCompletionRequestUserMessageArgs::default()
                    .content(msg.content.as_str())
                    .build()
                    .map(ChatCompletionRequestMessage::User),
                Role::Assistant => {
                    let mut builder = ChatCompletionRequestAssistantMessageArgs::default();
                    builder.content(msg.content.as_str());
                    if !msg.requested_tools().is_empty() {
                        let tc_openai: Vec<ChatCompletionMessageToolCall> = msg
                            .requested_tools()
                            .iter()
                            .map(|tc| ChatCompletionMessageToolCall {
                                id: tc.id.clone(),
                                r#type: ChatCompletionToolType::Function,
                                function: FunctionCall {
                                    name: tc.name.clone(),
                                    arguments: tc.arguments.clone(),
                                },
                            })
                            .collect();
                        builder.tool_calls(tc_openai);
                    }
                    builder.build().map(ChatCompletionRequestMessage::Assistant)
                }
                Role::Tool => ChatCompletionRequestToolMessageArgs::default()
                    .tool_call_id(msg.tool_call_id.as_deref().unwrap_or(""))
                    .content(msg.content.as_str())
                    .build()
                    .map(ChatCompletionRequestMessage::Tool),
            };
            converted.map_err(|e| AgentError::Provider(e.to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_reply_without_tools_is_plain_assistant() {
        let msg = ModelReply::text("Pulp Fiction").into_message();
        assert_eq!(msg.role, Role::Assistant);
        assert!(msg.tool_calls.is_none());
    }

    #[test]
    fn test_reply_with_tools_keeps_calls() {
        let call = ToolCall {
            id: "call_1".into(),
            name: "get_movies_by_actor".into(),
            arguments: r#"{"actor":"Travolta"}"#.into(),
        };
        let msg = ModelReply::tools(vec![call.clone()]).into_message();
        assert_eq!(msg.requested_tools(), &[call]);
    }

    #[test]
    fn test_history_converts_every_role() {
        let history = vec![
            Message::system("rules"),
            Message::user("find movies with Travolta"),
            Message::assistant_with_tool_calls(
                "",
                vec![ToolCall {
                    id: "call_1".into(),
                    name: "get_movies_by_actor".into(),
                    arguments: "{}".into(),
                }],
            ),
            Message::tool_result("call_1", "[]"),
            Message::assistant("Nothing found."),
        ];
        let converted = to_openai_messages(&history).unwrap();
        assert_eq!(converted.len(), 5);
        assert!(matches!(converted[0], ChatCompletionRequestMessage::System(_)));
        assert!(matches!(converted[3], ChatCompletionRequestMessage::Tool(_)));
    }

    #[test]
    fn test_tool_schemas_convert() {
        let schemas = vec![ToolSchema {
            name: "get_movies_by_year".into(),
            description: "Use this tool whenever the user asks for movies by year.".into(),
            parameters: json!({"type": "object", "properties": {"year": {"type": "integer"}}}),
        }];
        let tools = to_openai_tools(&schemas).unwrap();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].function.name, "get_movies_by_year");
    }

    #[test]
    fn test_missing_key_fails_construction() {
        let config = ProviderConfig {
            api_key_env: "MOVIE_AGENT_TEST_UNSET_KEY".into(),
            ..ProviderConfig::default()
        };
        assert!(matches!(
            OpenAiChatModel::from_config(&config),
            Err(AgentError::Config(_))
        ));
    }
}
