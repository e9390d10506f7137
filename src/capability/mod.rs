//! Capability exchange layer: schema-described tools, the per-agent tool
//! registry, and the canonical `list_tools` / `call_tool` /
//! `get_capabilities` actions wired onto an [`AgentNode`].

pub mod client;

pub use client::{AgentClient, CapabilityReport, ServerInfo};

use crate::protocol::{ActionHandler, AgentNodeBuilder, Message, Payload, Response};
use crate::types::{AppError, Capability, Result, ToolDefinition, ToolResult};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// A named, schema-described operation an agent exposes for invocation.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    /// Structural JSON schema of the argument bundle: type, named properties
    /// with types, required-property list.
    fn input_schema(&self) -> Value;
    async fn execute(&self, args: Value) -> Result<ToolResult>;
}

/// Registry of the tools one agent exposes. Built once at agent
/// construction; lookups during dispatch are read-only.
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    /// Descriptors for every registered tool, sorted by name so repeated
    /// discovery calls return structurally identical lists.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        let mut definitions: Vec<ToolDefinition> = self
            .tools
            .values()
            .map(|tool| ToolDefinition {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
                input_schema: tool.input_schema(),
            })
            .collect();
        definitions.sort_by(|a, b| a.name.cmp(&b.name));
        definitions
    }

    /// Coarse capability advertisements derived from the tool schemas.
    pub fn capabilities(&self) -> Vec<Capability> {
        self.definitions()
            .into_iter()
            .map(|def| {
                let mut parameters = BTreeMap::new();
                if let Some(properties) = def.input_schema["properties"].as_object() {
                    for (name, prop) in properties {
                        let kind = prop["type"].as_str().unwrap_or("any").to_string();
                        parameters.insert(name.clone(), kind);
                    }
                }
                Capability {
                    name: def.name,
                    description: def.description,
                    parameters,
                }
            })
            .collect()
    }

    pub fn has_tool(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn tool_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    pub async fn execute(&self, name: &str, args: Value) -> Result<ToolResult> {
        match self.tools.get(name) {
            Some(tool) => tool.execute(args).await,
            None => Err(AppError::NotFound(format!("Tool not found: {name}"))),
        }
    }
}

/// Wire the three canonical capability-exchange actions onto a node builder.
///
/// The `get_capabilities` handler installed here overwrites the node's
/// built-in one (last-write-wins is intentional), replacing it with the
/// richer `{capabilities, server_info}` shape.
pub fn serve_tools(builder: AgentNodeBuilder, registry: Arc<ToolRegistry>) -> AgentNodeBuilder {
    let server_name = builder.name().to_string();
    let server_version = builder.version().to_string();

    let mut builder = builder;
    for capability in registry.capabilities() {
        builder = builder.capability(capability);
    }

    builder
        .handler(
            "list_tools",
            Arc::new(ListToolsHandler {
                registry: registry.clone(),
            }),
        )
        .handler(
            "call_tool",
            Arc::new(CallToolHandler {
                registry: registry.clone(),
            }),
        )
        .handler(
            "get_capabilities",
            Arc::new(ToolCapabilitiesHandler {
                registry,
                server_name,
                server_version,
            }),
        )
}

struct ListToolsHandler {
    registry: Arc<ToolRegistry>,
}

#[async_trait]
impl ActionHandler for ListToolsHandler {
    async fn handle(&self, _message: Message) -> Result<Response> {
        Ok(Response::from_value(&json!({
            "tools": self.registry.definitions()
        })))
    }
}

struct CallToolHandler {
    registry: Arc<ToolRegistry>,
}

#[async_trait]
impl ActionHandler for CallToolHandler {
    async fn handle(&self, message: Message) -> Result<Response> {
        let Payload::CallTool { name, args } = message.payload else {
            return Ok(Response::failure(
                "call_tool requires a tool name and argument bundle",
            ));
        };

        // Unknown tool is a routing error. A failure inside the tool still
        // yields a successful response whose data is a well-formed error
        // ToolResult, so callers only ever deal with one failure shape.
        if !self.registry.has_tool(&name) {
            return Ok(Response::failure(format!("Unknown tool: {name}")));
        }

        let result = match self.registry.execute(&name, args).await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(tool = %name, error = %e, "tool execution failed");
                ToolResult::error(e.to_string())
            }
        };

        Ok(Response::from_value(&result))
    }
}

struct ToolCapabilitiesHandler {
    registry: Arc<ToolRegistry>,
    server_name: String,
    server_version: String,
}

#[async_trait]
impl ActionHandler for ToolCapabilitiesHandler {
    async fn handle(&self, _message: Message) -> Result<Response> {
        Ok(Response::from_value(&json!({
            "capabilities": self.registry.capabilities(),
            "server_info": {
                "name": self.server_name,
                "version": self.server_version,
            }
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::AgentNode;

    /// Test tool that echoes its argument bundle back as its JSON result.
    pub(crate) struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            "Echo the argument bundle back unchanged"
        }

        fn input_schema(&self) -> Value {
            json!({
                "type": "object",
                "properties": {},
                "required": []
            })
        }

        async fn execute(&self, args: Value) -> Result<ToolResult> {
            ToolResult::json(&args)
        }
    }

    struct FailingTool;

    #[async_trait]
    impl Tool for FailingTool {
        fn name(&self) -> &str {
            "always_fails"
        }

        fn description(&self) -> &str {
            "Fails on every invocation"
        }

        fn input_schema(&self) -> Value {
            json!({"type": "object", "properties": {}, "required": []})
        }

        async fn execute(&self, _args: Value) -> Result<ToolResult> {
            Err(AppError::Internal("tool blew up".to_string()))
        }
    }

    fn test_node() -> AgentNode {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool));
        registry.register(Arc::new(FailingTool));
        serve_tools(AgentNode::builder("tester"), Arc::new(registry)).build()
    }

    #[tokio::test]
    async fn list_tools_is_idempotent() {
        let node = test_node();
        let message = || Message::request("test", "tester", Payload::ListTools);
        let first = node.dispatch(message()).await;
        let second = node.dispatch(message()).await;
        assert_eq!(first.data, second.data);
        let tools = first.data.unwrap()["tools"].clone();
        assert_eq!(tools.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn call_tool_round_trips_arguments() {
        let node = test_node();
        let args = json!({"query": "2br near park", "limit": 3});
        let message = Message::request(
            "test",
            "tester",
            Payload::CallTool {
                name: "echo".to_string(),
                args: args.clone(),
            },
        );
        let response = node.dispatch(message).await;
        assert!(response.success);
        let result: ToolResult = serde_json::from_value(response.data.unwrap()).unwrap();
        assert!(!result.is_error);
        let echoed: Value = serde_json::from_str(result.first_text().unwrap()).unwrap();
        assert_eq!(echoed, args);
    }

    #[tokio::test]
    async fn unknown_tool_is_a_routing_error() {
        let node = test_node();
        let message = Message::request(
            "test",
            "tester",
            Payload::CallTool {
                name: "nonexistent".to_string(),
                args: json!({}),
            },
        );
        let response = node.dispatch(message).await;
        assert!(!response.success);
        assert!(response.error.unwrap().contains("nonexistent"));
    }

    #[tokio::test]
    async fn tool_failure_stays_inside_the_result_envelope() {
        let node = test_node();
        let message = Message::request(
            "test",
            "tester",
            Payload::CallTool {
                name: "always_fails".to_string(),
                args: json!({}),
            },
        );
        let response = node.dispatch(message).await;
        assert!(response.success, "tool failure must not fail call_tool");
        let result: ToolResult = serde_json::from_value(response.data.unwrap()).unwrap();
        assert!(result.is_error);
        assert!(result.first_text().unwrap().contains("tool blew up"));
    }

    #[tokio::test]
    async fn capabilities_include_server_info() {
        let node = test_node();
        let message = Message::request("test", "tester", Payload::GetCapabilities);
        let response = node.dispatch(message).await;
        let data = response.data.unwrap();
        assert_eq!(data["server_info"]["name"], "tester");
        assert_eq!(data["capabilities"].as_array().unwrap().len(), 2);
    }
}
