//! Remote tools served over MCP (streamable HTTP).
//!
//! [`RemoteToolClient`] holds one initialized rmcp session. Every tool the
//! server advertises is wrapped as a [`McpTool`] so the agent loop can call it
//! exactly like a local tool.

use agent_core::error::AgentError;
use agent_core::tool_registry::Tool;
use agent_core::types::ToolSchema;
use async_trait::async_trait;
use rmcp::model::{CallToolRequestParams, CallToolResult, ClientInfo, Content, JsonObject, ResourceContents};
use rmcp::service::{RoleClient, RunningService, ServiceError};
use rmcp::transport::StreamableHttpClientTransport;
use rmcp::ServiceExt;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

/// Invocation primitive shared by all tools of one remote server.
#[async_trait]
pub trait RemoteInvoker: Send + Sync {
    async fn call_tool(&self, name: &str, arguments: Value) -> Result<String, AgentError>;
}

/// Client for a remote MCP tool server.
pub struct RemoteToolClient {
    service: RunningService<RoleClient, ClientInfo>,
}

impl RemoteToolClient {
    /// Connect and run the MCP initialize handshake.
    pub async fn connect(url: &str) -> Result<Self, AgentError> {
        let transport = StreamableHttpClientTransport::from_uri(url.to_string());
        let service = ClientInfo::default()
            .serve(transport)
            .await
            .map_err(|e| AgentError::Other(anyhow::anyhow!("MCP initialize failed: {}", e)))?;

        if let Some(server) = service.peer_info() {
            info!("Connected to MCP server {}", server.server_info.name);
        }
        Ok(Self { service })
    }

    /// Discover the tools the server exposes.
    pub async fn list_tools(&self) -> Result<Vec<ToolSchema>, AgentError> {
        let tools = match self.service.list_all_tools().await {
            Ok(tools) => tools,
            Err(ServiceError::UnexpectedResponse) => {
                self.service
                    .list_tools(None)
                    .await
                    .map_err(|e| service_error("list_tools", e))?
                    .tools
            }
            Err(e) => return Err(service_error("list_tools", e)),
        };

        Ok(tools
            .into_iter()
            .map(|tool| ToolSchema {
                name: tool.name.to_string(),
                description: tool.description.map(|d| d.to_string()).unwrap_or_default(),
                parameters: Value::Object((*tool.input_schema).clone()),
            })
            .collect())
    }

    /// Close the session.
    pub async fn shutdown(self) {
        if let Err(e) = self.service.cancel().await {
            debug!("MCP session shutdown: {}", e);
        }
    }
}

#[async_trait]
impl RemoteInvoker for RemoteToolClient {
    async fn call_tool(&self, name: &str, arguments: Value) -> Result<String, AgentError> {
        let arguments = object_arguments(name, arguments)?;
        let result = self
            .service
            .call_tool(CallToolRequestParams {
                meta: None,
                name: name.to_owned().into(),
                arguments,
                task: None,
            })
            .await
            .map_err(|e| service_error(name, e))?;

        render_call_result(name, result)
    }
}

/// A single remote tool, adapted to the local [`Tool`] trait.
pub struct McpTool {
    schema: ToolSchema,
    invoker: Arc<dyn RemoteInvoker>,
}

impl McpTool {
    pub fn new(schema: ToolSchema, invoker: Arc<dyn RemoteInvoker>) -> Self {
        Self { schema, invoker }
    }
}

#[async_trait]
impl Tool for McpTool {
    fn name(&self) -> &str {
        &self.schema.name
    }

    fn description(&self) -> &str {
        &self.schema.description
    }

    fn parameters_schema(&self) -> Value {
        self.schema.parameters.clone()
    }

    async fn execute(&self, args: Value) -> Result<String, AgentError> {
        self.invoker.call_tool(&self.schema.name, args).await
    }
}

fn object_arguments(name: &str, value: Value) -> Result<Option<JsonObject>, AgentError> {
    match value {
        Value::Null => Ok(None),
        Value::Object(map) if map.is_empty() => Ok(None),
        Value::Object(map) => Ok(Some(map)),
        other => Err(AgentError::ToolExecution {
            tool_name: name.to_string(),
            message: format!("MCP tool arguments must be a JSON object; got {}", other),
        }),
    }
}

fn text_content(content: &[Content]) -> Option<String> {
    let mut lines = Vec::new();
    for item in content {
        if let Some(text) = item.as_text() {
            lines.push(text.text.clone());
            continue;
        }
        if let Some(resource) = item.as_resource() {
            if let ResourceContents::TextResourceContents { text, .. } = &resource.resource {
                lines.push(text.clone());
            }
        }
    }

    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}

/// Structured content wins, then text, then the raw content list.
fn render_call_result(name: &str, result: CallToolResult) -> Result<String, AgentError> {
    let text = text_content(&result.content);

    if result.is_error.unwrap_or(false) {
        let message = result
            .structured_content
            .as_ref()
            .map(|v| v.to_string())
            .or(text)
            .unwrap_or_else(|| "MCP tool returned an error result".into());
        return Err(AgentError::ToolExecution {
            tool_name: name.to_string(),
            message,
        });
    }

    if let Some(structured) = result.structured_content {
        return Ok(structured.to_string());
    }
    if let Some(text) = text {
        return Ok(text);
    }
    Ok(serde_json::to_string(&result.content)?)
}

fn service_error(context: &str, error: ServiceError) -> AgentError {
    let message = match error {
        ServiceError::McpError(e) => format!("MCP error {}: {}", e.code.0, e.message),
        ServiceError::TransportClosed => "MCP transport closed".to_string(),
        ServiceError::Timeout { timeout } => format!("MCP request timed out after {:?}", timeout),
        other => format!("MCP service error: {}", other),
    };
    AgentError::ToolExecution {
        tool_name: context.to_string(),
        message,
    }
}
