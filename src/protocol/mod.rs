//! Inter-agent message protocol: the typed request/response envelope and the
//! per-agent action dispatch table.
//!
//! Every cross-agent call in HEARTH travels as a discrete [`Message`] through
//! [`AgentNode::dispatch`]; there is no shared-memory call path between
//! agents, which keeps every invocation serializable and loggable.

pub mod message;
pub mod node;

pub use message::{Message, MessageKind, Payload, Response};
pub use node::{ActionHandler, AgentNode, AgentNodeBuilder, FnHandler};
