//! Agent nodes: an instance-owned action registry with a fault-isolating
//! dispatch loop.

use crate::types::{Capability, Result};
use async_trait::async_trait;
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::message::{Message, Response};

/// An asynchronous handler for one registered action.
#[async_trait]
pub trait ActionHandler: Send + Sync {
    async fn handle(&self, message: Message) -> Result<Response>;
}

/// Adapter so closures returning futures can serve as handlers.
pub struct FnHandler<F>(pub F);

#[async_trait]
impl<F, Fut> ActionHandler for FnHandler<F>
where
    F: Fn(Message) -> Fut + Send + Sync,
    Fut: std::future::Future<Output = Result<Response>> + Send,
{
    async fn handle(&self, message: Message) -> Result<Response> {
        (self.0)(message).await
    }
}

/// One agent's dispatch surface: a name, an advertised capability list, and
/// a registry mapping action names to handlers.
///
/// The registry is written once at construction and read-only during
/// dispatch, so concurrent dispatches on the same node are safe without
/// locking.
pub struct AgentNode {
    name: String,
    version: String,
    capabilities: Vec<Capability>,
    handlers: HashMap<String, Arc<dyn ActionHandler>>,
    requests_handled: Arc<AtomicU64>,
}

impl AgentNode {
    /// Start building a node. Built-in `ping`, `get_capabilities`, and
    /// `get_status` handlers are installed automatically.
    pub fn builder(name: impl Into<String>) -> AgentNodeBuilder {
        AgentNodeBuilder {
            name: name.into(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            capabilities: Vec::new(),
            handlers: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn capabilities(&self) -> &[Capability] {
        &self.capabilities
    }

    /// Route a message to its handler.
    ///
    /// Total by construction: an unknown action becomes a failure response
    /// naming the action, and any handler error is caught at this boundary
    /// and converted to a failure response. Nothing propagates past dispatch.
    pub async fn dispatch(&self, message: Message) -> Response {
        self.requests_handled.fetch_add(1, Ordering::Relaxed);
        let action = message.action();

        let Some(handler) = self.handlers.get(action) else {
            return Response::failure(format!("Unknown action: {action}"));
        };

        match handler.handle(message).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(agent = %self.name, action, error = %e, "handler failed");
                Response::failure(e.to_string())
            }
        }
    }
}

/// Builder for [`AgentNode`]. Handler registration is append-only;
/// re-registering an action name overwrites the previous handler
/// (last-write-wins), which lets composition layers wrap or replace the
/// built-in actions.
pub struct AgentNodeBuilder {
    name: String,
    version: String,
    capabilities: Vec<Capability>,
    handlers: Vec<(String, Arc<dyn ActionHandler>)>,
}

impl AgentNodeBuilder {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn version_string(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Advertise a capability for discovery. Not enforced anywhere.
    pub fn capability(mut self, capability: Capability) -> Self {
        self.capabilities.push(capability);
        self
    }

    /// Register a handler for an action name.
    pub fn handler(mut self, action: impl Into<String>, handler: Arc<dyn ActionHandler>) -> Self {
        self.handlers.push((action.into(), handler));
        self
    }

    pub fn build(self) -> AgentNode {
        let requests_handled = Arc::new(AtomicU64::new(0));

        let mut handlers: HashMap<String, Arc<dyn ActionHandler>> = HashMap::new();
        handlers.insert(
            "ping".to_string(),
            Arc::new(PingHandler {
                agent: self.name.clone(),
            }),
        );
        handlers.insert(
            "get_capabilities".to_string(),
            Arc::new(CapabilitiesHandler {
                capabilities: self.capabilities.clone(),
            }),
        );
        handlers.insert(
            "get_status".to_string(),
            Arc::new(StatusHandler {
                agent: self.name.clone(),
                version: self.version.clone(),
                capability_count: self.capabilities.len(),
                requests_handled: requests_handled.clone(),
            }),
        );

        // Registration order decides winners: later registrations overwrite.
        for (action, handler) in self.handlers {
            handlers.insert(action, handler);
        }

        AgentNode {
            name: self.name,
            version: self.version,
            capabilities: self.capabilities,
            handlers,
            requests_handled,
        }
    }
}

struct PingHandler {
    agent: String,
}

#[async_trait]
impl ActionHandler for PingHandler {
    async fn handle(&self, _message: Message) -> Result<Response> {
        Ok(Response::ok(json!({ "agent": self.agent, "alive": true })))
    }
}

struct CapabilitiesHandler {
    capabilities: Vec<Capability>,
}

#[async_trait]
impl ActionHandler for CapabilitiesHandler {
    async fn handle(&self, _message: Message) -> Result<Response> {
        Ok(Response::from_value(&json!({
            "capabilities": self.capabilities
        })))
    }
}

struct StatusHandler {
    agent: String,
    version: String,
    capability_count: usize,
    requests_handled: Arc<AtomicU64>,
}

#[async_trait]
impl ActionHandler for StatusHandler {
    async fn handle(&self, _message: Message) -> Result<Response> {
        Ok(Response::ok(json!({
            "agent": self.agent,
            "version": self.version,
            "capabilities": self.capability_count,
            "requests_handled": self.requests_handled.load(Ordering::Relaxed),
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Payload;
    use crate::types::AppError;

    fn ping(to: &str) -> Message {
        Message::request("test", to, Payload::Ping)
    }

    #[tokio::test]
    async fn dispatch_answers_builtin_ping() {
        let node = AgentNode::builder("listings").build();
        let response = node.dispatch(ping("listings")).await;
        assert!(response.success);
        assert_eq!(response.data.unwrap()["agent"], "listings");
    }

    #[tokio::test]
    async fn unknown_action_names_the_action() {
        let node = AgentNode::builder("listings").build();
        let message = Message::request(
            "test",
            "listings",
            Payload::CallTool {
                name: "x".to_string(),
                args: serde_json::Value::Null,
            },
        );
        let response = node.dispatch(message).await;
        assert!(!response.success);
        assert!(response.error.unwrap().contains("call_tool"));
    }

    #[tokio::test]
    async fn handler_errors_become_failure_responses() {
        let node = AgentNode::builder("flaky")
            .handler(
                "ping",
                Arc::new(FnHandler(|_msg| async {
                    Err(AppError::Internal("exploded".to_string()))
                })),
            )
            .build();
        let response = node.dispatch(ping("flaky")).await;
        assert!(!response.success);
        assert!(response.error.unwrap().contains("exploded"));
    }

    #[tokio::test]
    async fn last_registration_wins() {
        let node = AgentNode::builder("wrapped")
            .handler(
                "ping",
                Arc::new(FnHandler(|_msg| async {
                    Ok(Response::ok(json!({"generation": 1})))
                })),
            )
            .handler(
                "ping",
                Arc::new(FnHandler(|_msg| async {
                    Ok(Response::ok(json!({"generation": 2})))
                })),
            )
            .build();
        let response = node.dispatch(ping("wrapped")).await;
        assert_eq!(response.data.unwrap()["generation"], 2);
    }

    #[tokio::test]
    async fn status_counts_dispatches() {
        let node = AgentNode::builder("counted").build();
        node.dispatch(ping("counted")).await;
        node.dispatch(ping("counted")).await;
        let response = node
            .dispatch(Message::request("test", "counted", Payload::GetStatus))
            .await;
        // The status request itself is the third dispatch.
        assert_eq!(response.data.unwrap()["requests_handled"], 3);
    }
}
