//! Query-lifecycle observation.
//!
//! Observability is injected as an explicit capability instead of being
//! toggled through environment variables inside business logic. The
//! orchestrator and batch scorer emit [`QueryEvent`]s to whatever observer
//! they were constructed with; [`NoopObserver`] is the default and
//! [`TracingObserver`] forwards everything to `tracing`.

use crate::types::Intent;

/// Milestones in the life of one orchestrated query.
#[derive(Debug, Clone)]
pub enum QueryEvent {
    QueryClassified {
        intent: Intent,
        confidence: f32,
    },
    ClassificationFellBack {
        reason: String,
    },
    AgentInvoked {
        agent: String,
        tool: String,
    },
    ScoreGroupSettled {
        group: usize,
        candidates: usize,
        kept: usize,
    },
    ScoreGroupFailed {
        group: usize,
        reason: String,
    },
    PlanFinished {
        intent: Intent,
        success: bool,
    },
}

/// Receiver for query-lifecycle events. The default implementation ignores
/// everything, so observers only override what they care about.
pub trait QueryObserver: Send + Sync {
    fn observe(&self, _event: &QueryEvent) {}
}

/// Observer that discards all events.
pub struct NoopObserver;

impl QueryObserver for NoopObserver {}

/// Observer that forwards events to `tracing`.
pub struct TracingObserver;

impl QueryObserver for TracingObserver {
    fn observe(&self, event: &QueryEvent) {
        match event {
            QueryEvent::QueryClassified { intent, confidence } => {
                tracing::info!(intent = %intent, confidence, "query classified");
            }
            QueryEvent::ClassificationFellBack { reason } => {
                tracing::warn!(reason = %reason, "classification fell back to default intent");
            }
            QueryEvent::AgentInvoked { agent, tool } => {
                tracing::debug!(agent = %agent, tool = %tool, "agent invoked");
            }
            QueryEvent::ScoreGroupSettled {
                group,
                candidates,
                kept,
            } => {
                tracing::debug!(group, candidates, kept, "score group settled");
            }
            QueryEvent::ScoreGroupFailed { group, reason } => {
                tracing::warn!(group, reason = %reason, "score group contributed no results");
            }
            QueryEvent::PlanFinished { intent, success } => {
                tracing::info!(intent = %intent, success, "plan finished");
            }
        }
    }
}
