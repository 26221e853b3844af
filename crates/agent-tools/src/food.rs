use agent_core::error::AgentError;
use agent_core::tool_registry::Tool;
use async_trait::async_trait;
use serde_json::{json, Value};

/// Serves spaghetti. Takes no arguments.
pub struct FoodTool;

#[async_trait]
impl Tool for FoodTool {
    fn name(&self) -> &str {
        "get_food"
    }

    fn description(&self) -> &str {
        "Get a plate of spaghetti."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {}
        })
    }

    async fn execute(&self, _args: Value) -> Result<String, AgentError> {
        Ok("Here is your plate of spaghetti 🍝".into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_food_ignores_arguments() {
        let out = FoodTool.execute(json!({"anything": true})).await.unwrap();
        assert!(out.contains("spaghetti"));
    }
}
