//! Messaging agent: drafts and sends listing inquiries and manages the
//! outbound session.
//!
//! The actual delivery channel (browser automation against the listing
//! site) is an external collaborator, abstracted behind [`MessageGateway`].
//! [`InMemoryGateway`] backs tests and local runs.

use crate::capability::{serve_tools, Tool, ToolRegistry};
use crate::llm::InferenceClient;
use crate::protocol::AgentNode;
use crate::types::{AppError, Result, ToolResult};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

/// Outbound message transport and session holder.
#[async_trait]
pub trait MessageGateway: Send + Sync {
    async fn login(&self) -> Result<()>;
    fn logged_in(&self) -> bool;
    fn clear_session(&self);
    /// Deliver a message to a listing's contact. Requires an active session.
    async fn send(&self, listing_id: &str, body: &str) -> Result<()>;
}

/// Gateway that keeps session state and sent messages in memory.
#[derive(Default)]
pub struct InMemoryGateway {
    logged_in: RwLock<bool>,
    outbox: RwLock<Vec<(String, String)>>,
}

impl InMemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages sent so far, as `(listing_id, body)` pairs.
    pub fn sent(&self) -> Vec<(String, String)> {
        self.outbox.read().clone()
    }
}

#[async_trait]
impl MessageGateway for InMemoryGateway {
    async fn login(&self) -> Result<()> {
        *self.logged_in.write() = true;
        Ok(())
    }

    fn logged_in(&self) -> bool {
        *self.logged_in.read()
    }

    fn clear_session(&self) {
        *self.logged_in.write() = false;
    }

    async fn send(&self, listing_id: &str, body: &str) -> Result<()> {
        if !self.logged_in() {
            return Err(AppError::InvalidInput(
                "No active session; log in before sending".to_string(),
            ));
        }
        self.outbox
            .write()
            .push((listing_id.to_string(), body.to_string()));
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct DraftArgs {
    listing_id: String,
    #[serde(default)]
    notes: String,
}

/// `draft_message`: ask the inference service for a short, polite inquiry.
struct DraftMessageTool {
    llm: Arc<dyn InferenceClient>,
}

#[async_trait]
impl Tool for DraftMessageTool {
    fn name(&self) -> &str {
        "draft_message"
    }

    fn description(&self) -> &str {
        "Draft a short inquiry message for a listing"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "listing_id": { "type": "string" },
                "notes": { "type": "string", "description": "What the renter wants mentioned" }
            },
            "required": ["listing_id"]
        })
    }

    async fn execute(&self, args: Value) -> Result<ToolResult> {
        let args: DraftArgs = serde_json::from_value(args)
            .map_err(|e| AppError::InvalidInput(format!("Bad draft arguments: {e}")))?;

        let prompt = format!(
            "Draft a short, polite rental inquiry (3-4 sentences, plain text, no subject \
             line) for listing {}. Renter notes: {}",
            args.listing_id,
            if args.notes.is_empty() {
                "none"
            } else {
                &args.notes
            }
        );
        let body = self.llm.infer(&prompt).await?;
        ToolResult::json(&json!({
            "listing_id": args.listing_id,
            "body": body.trim(),
        }))
    }
}

#[derive(Debug, Deserialize)]
struct SendArgs {
    listing_id: String,
    #[serde(default)]
    body: String,
}

/// `send_message`: deliver an inquiry through the gateway.
struct SendMessageTool {
    gateway: Arc<dyn MessageGateway>,
}

#[async_trait]
impl Tool for SendMessageTool {
    fn name(&self) -> &str {
        "send_message"
    }

    fn description(&self) -> &str {
        "Send an inquiry message to a listing's contact"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "listing_id": { "type": "string" },
                "body": { "type": "string" }
            },
            "required": ["listing_id"]
        })
    }

    async fn execute(&self, args: Value) -> Result<ToolResult> {
        let args: SendArgs = serde_json::from_value(args)
            .map_err(|e| AppError::InvalidInput(format!("Bad send arguments: {e}")))?;

        let body = if args.body.trim().is_empty() {
            "Hi, I'm interested in this listing and would love to arrange a viewing."
        } else {
            args.body.trim()
        };

        self.gateway.send(&args.listing_id, body).await?;
        ToolResult::json(&json!({ "listing_id": args.listing_id, "sent": true }))
    }
}

/// Session management tools share one struct, parameterized by operation.
enum SessionOp {
    Login,
    Check,
    Clear,
}

struct SessionTool {
    gateway: Arc<dyn MessageGateway>,
    op: SessionOp,
}

#[async_trait]
impl Tool for SessionTool {
    fn name(&self) -> &str {
        match self.op {
            SessionOp::Login => "session_login",
            SessionOp::Check => "session_check",
            SessionOp::Clear => "session_clear",
        }
    }

    fn description(&self) -> &str {
        match self.op {
            SessionOp::Login => "Log in to the messaging session",
            SessionOp::Check => "Check whether a messaging session is active",
            SessionOp::Clear => "Clear the messaging session",
        }
    }

    fn input_schema(&self) -> Value {
        json!({ "type": "object", "properties": {}, "required": [] })
    }

    async fn execute(&self, _args: Value) -> Result<ToolResult> {
        match self.op {
            SessionOp::Login => {
                self.gateway.login().await?;
                ToolResult::json(&json!({ "logged_in": true }))
            }
            SessionOp::Check => ToolResult::json(&json!({ "logged_in": self.gateway.logged_in() })),
            SessionOp::Clear => {
                self.gateway.clear_session();
                ToolResult::json(&json!({ "logged_in": false }))
            }
        }
    }
}

/// Build the messenger agent node.
pub fn messenger_agent(llm: Arc<dyn InferenceClient>, gateway: Arc<dyn MessageGateway>) -> AgentNode {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(DraftMessageTool { llm }));
    registry.register(Arc::new(SendMessageTool {
        gateway: gateway.clone(),
    }));
    registry.register(Arc::new(SessionTool {
        gateway: gateway.clone(),
        op: SessionOp::Login,
    }));
    registry.register(Arc::new(SessionTool {
        gateway: gateway.clone(),
        op: SessionOp::Check,
    }));
    registry.register(Arc::new(SessionTool {
        gateway,
        op: SessionOp::Clear,
    }));
    serve_tools(AgentNode::builder("messenger"), Arc::new(registry)).build()
}
