//! Client side of the capability exchange: wraps one target agent and turns
//! typed calls into protocol messages.

use crate::protocol::{AgentNode, Message, Payload, Response};
use crate::types::{AppError, Capability, Result, ToolDefinition, ToolResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Identity of a capability server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
}

/// Full capability advertisement of one agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapabilityReport {
    pub capabilities: Vec<Capability>,
    pub server_info: ServerInfo,
}

/// Wraps one target agent. Every method composes a [`Message`], dispatches
/// it, and unwraps the response — the sole mechanism by which one agent
/// invokes another.
#[derive(Clone)]
pub struct AgentClient {
    from: String,
    target: Arc<AgentNode>,
}

impl AgentClient {
    pub fn new(from: impl Into<String>, target: Arc<AgentNode>) -> Self {
        Self {
            from: from.into(),
            target,
        }
    }

    pub fn target_name(&self) -> &str {
        self.target.name()
    }

    async fn call(&self, payload: Payload) -> Response {
        let message = Message::request(&self.from, self.target.name(), payload);
        tracing::debug!(
            from = %self.from,
            to = %self.target.name(),
            action = message.action(),
            id = %message.id,
            "agent call"
        );
        self.target.dispatch(message).await
    }

    fn unwrap_data(&self, response: Response, action: &str) -> Result<Value> {
        if !response.success {
            let error = response
                .error
                .unwrap_or_else(|| "unspecified agent error".to_string());
            return Err(AppError::Agent(format!(
                "{} rejected {action}: {error}",
                self.target.name()
            )));
        }
        response
            .data
            .ok_or_else(|| AppError::Agent(format!("{action} returned no data")))
    }

    /// Liveness probe.
    pub async fn ping(&self) -> Result<()> {
        self.unwrap_data(self.call(Payload::Ping).await, "ping")
            .map(|_| ())
    }

    /// Enumerate the tools the target exposes.
    pub async fn list_tools(&self) -> Result<Vec<ToolDefinition>> {
        let data = self
            .unwrap_data(self.call(Payload::ListTools).await, "list_tools")?;
        serde_json::from_value(data["tools"].clone())
            .map_err(|e| AppError::Parse(format!("Malformed tool list: {e}")))
    }

    /// Invoke a named tool. Tool-level failures come back as a
    /// [`ToolResult`] with `is_error` set; only routing failures (unknown
    /// tool, malformed payload) surface as `Err`.
    pub async fn call_tool(&self, name: &str, args: Value) -> Result<ToolResult> {
        let payload = Payload::CallTool {
            name: name.to_string(),
            args,
        };
        let data = self.unwrap_data(self.call(payload).await, "call_tool")?;
        serde_json::from_value(data)
            .map_err(|e| AppError::Parse(format!("Malformed tool result: {e}")))
    }

    /// Fetch the target's capability advertisement.
    pub async fn get_capabilities(&self) -> Result<CapabilityReport> {
        let data = self
            .unwrap_data(self.call(Payload::GetCapabilities).await, "get_capabilities")?;
        serde_json::from_value(data)
            .map_err(|e| AppError::Parse(format!("Malformed capability report: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{serve_tools, Tool, ToolRegistry};
    use async_trait::async_trait;
    use serde_json::json;

    struct UpperTool;

    #[async_trait]
    impl Tool for UpperTool {
        fn name(&self) -> &str {
            "upper"
        }

        fn description(&self) -> &str {
            "Uppercase a string"
        }

        fn input_schema(&self) -> Value {
            json!({
                "type": "object",
                "properties": { "text": { "type": "string" } },
                "required": ["text"]
            })
        }

        async fn execute(&self, args: Value) -> Result<ToolResult> {
            let text = args["text"].as_str().unwrap_or_default();
            ToolResult::json(&json!({ "text": text.to_uppercase() }))
        }
    }

    fn client() -> AgentClient {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(UpperTool));
        let node = serve_tools(AgentNode::builder("text"), Arc::new(registry)).build();
        AgentClient::new("test", Arc::new(node))
    }

    #[tokio::test]
    async fn ping_and_discovery() {
        let client = client();
        client.ping().await.unwrap();

        let tools = client.list_tools().await.unwrap();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].name, "upper");

        let report = client.get_capabilities().await.unwrap();
        assert_eq!(report.server_info.name, "text");
        assert_eq!(report.capabilities[0].parameters["text"], "string");
    }

    #[tokio::test]
    async fn call_tool_unwraps_the_result() {
        let client = client();
        let result = client
            .call_tool("upper", json!({"text": "quiet"}))
            .await
            .unwrap();
        let payload: Value = result.decode().unwrap();
        assert_eq!(payload["text"], "QUIET");
    }

    #[tokio::test]
    async fn unknown_tool_surfaces_as_error() {
        let client = client();
        let err = client.call_tool("lower", json!({})).await.unwrap_err();
        assert!(err.to_string().contains("lower"));
    }
}
