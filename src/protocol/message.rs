//! Message envelope types for the inter-agent protocol.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Direction of a message on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Request,
    Response,
    Broadcast,
}

/// Typed message payload, tagged by action name.
///
/// One variant exists per action so that handlers receive a precisely-typed
/// argument structure instead of probing an untyped map for fields. The
/// serde tag doubles as the action name used for registry lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Payload {
    /// Liveness probe.
    Ping,
    /// Capability advertisement for discovery and documentation.
    GetCapabilities,
    /// Diagnostic snapshot of the agent.
    GetStatus,
    /// Enumerate the tools this agent exposes for invocation.
    ListTools,
    /// Invoke a named tool with an argument bundle.
    CallTool {
        name: String,
        #[serde(default)]
        args: Value,
    },
}

impl Payload {
    /// The action name this payload dispatches to.
    pub fn action(&self) -> &'static str {
        match self {
            Payload::Ping => "ping",
            Payload::GetCapabilities => "get_capabilities",
            Payload::GetStatus => "get_status",
            Payload::ListTools => "list_tools",
            Payload::CallTool { .. } => "call_tool",
        }
    }
}

/// The envelope for one inter-agent message. Immutable once built; `id` is
/// unique per message, not per conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub from_agent: String,
    pub to_agent: String,
    pub kind: MessageKind,
    pub payload: Payload,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Build a request message from one agent to another.
    pub fn request(from: impl Into<String>, to: impl Into<String>, payload: Payload) -> Self {
        Self {
            id: Uuid::new_v4(),
            from_agent: from.into(),
            to_agent: to.into(),
            kind: MessageKind::Request,
            payload,
            timestamp: Utc::now(),
        }
    }

    /// The action name this message dispatches to.
    pub fn action(&self) -> &'static str {
        self.payload.action()
    }
}

/// Structured reply to one message.
///
/// `success == false` always pairs with a non-empty `error`. A handler
/// returning a degraded result may carry both `data` and `error`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl Response {
    /// Successful response carrying a data payload.
    pub fn ok(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            confidence: None,
            metadata: None,
        }
    }

    /// Serialize a value into a successful response. Encoding failure is
    /// reported as a failure response rather than propagated.
    pub fn from_value<T: Serialize>(value: &T) -> Self {
        match serde_json::to_value(value) {
            Ok(data) => Self::ok(data),
            Err(e) => Self::failure(format!("Failed to encode response: {e}")),
        }
    }

    /// Failed response with a human-readable error.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            confidence: None,
            metadata: None,
        }
    }

    /// Degraded response: partial data alongside an error description.
    pub fn degraded(data: Value, error: impl Into<String>) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: Some(error.into()),
            confidence: None,
            metadata: None,
        }
    }
}
