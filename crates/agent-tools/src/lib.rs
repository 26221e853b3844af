pub mod food;
pub mod mcp;
pub mod movie_lookup;

use agent_core::error::AgentError;
use agent_core::tool_registry::ToolRegistry;
use agent_db::MovieCatalog;
use mcp::{McpTool, RemoteInvoker, RemoteToolClient};
use movie_lookup::{MovieField, MovieLookupTool};
use std::sync::Arc;

/// Register the five catalog lookup tools.
pub fn register_catalog_tools(registry: &mut ToolRegistry, catalog: &MovieCatalog) {
    for field in MovieField::ALL {
        registry.register(Arc::new(MovieLookupTool::new(field, catalog.clone())));
    }
}

/// Register every tool the remote server advertises, plus `get_food`.
///
/// Returns the number of remote tools discovered.
pub async fn register_search_tools(
    registry: &mut ToolRegistry,
    client: Arc<RemoteToolClient>,
) -> Result<usize, AgentError> {
    let schemas = client.list_tools().await?;
    let count = schemas.len();
    let invoker: Arc<dyn RemoteInvoker> = client;
    for schema in schemas {
        registry.register(Arc::new(McpTool::new(schema, invoker.clone())));
    }
    registry.register(Arc::new(food::FoodTool));
    Ok(count)
}
