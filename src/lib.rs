//! # H.E.A.R.T.H - Housing Agent Routing & Tool Hub
//!
//! A multi-agent orchestration server: independent agents wrap a listing
//! store, a commute-scoring capability, and a messaging channel, and a
//! single orchestrator composes them to answer one free-text query at a
//! time.
//!
//! ## Overview
//!
//! HEARTH can be used in two ways:
//!
//! 1. **As a standalone server** - Run the `hearth-server` binary
//! 2. **As a library** - Import components into your own Rust project
//!
//! ### Basic Example
//!
//! ```rust,ignore
//! use hearth::{build_orchestrator, HearthConfig, HttpInferenceClient, ListingStore};
//! use hearth::agents::InMemoryGateway;
//! use hearth::trace::TracingObserver;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let config = HearthConfig::load("hearth.toml")?;
//! let llm = Arc::new(HttpInferenceClient::new(
//!     &config.inference.base_url,
//!     &config.inference.model,
//!     None,
//!     Duration::from_secs(config.inference.timeout_secs),
//! )?);
//! let store = Arc::new(ListingStore::load(&config.data.listings_path)?);
//! let orchestrator = build_orchestrator(
//!     &config,
//!     llm,
//!     store,
//!     Arc::new(InMemoryGateway::new()),
//!     Arc::new(TracingObserver),
//! );
//! let result = orchestrator.process_query("Find apartments under $2000").await;
//! ```
//!
//! ## Architecture
//!
//! Every inter-agent call travels as a typed [`protocol::Message`] through
//! an agent's dispatch table; tools are invoked through the
//! [`capability`] exchange layer; the [`scoring`] engine fans candidate
//! groups out to the inference service and merges them deterministically.

/// The agents HEARTH composes, plus the router and orchestrator.
pub mod agents;
/// HTTP API handlers and routes.
pub mod api;
/// Capability exchange: tools, registries, and the inter-agent client.
pub mod capability;
/// TOML configuration.
pub mod config;
/// Inference service boundary and structured-output recovery.
pub mod llm;
/// Inter-agent message protocol and dispatch.
pub mod protocol;
/// Batch scoring engine and score combiner.
pub mod scoring;
/// Query-lifecycle observation.
pub mod trace;
/// Core types (listings, analysis results, errors).
pub mod types;

// Re-export commonly used types
pub use agents::{InMemoryGateway, ListingStore, MessageGateway, Orchestrator};
pub use capability::{AgentClient, Tool, ToolRegistry};
pub use config::HearthConfig;
pub use llm::{HttpInferenceClient, InferenceClient};
pub use protocol::{AgentNode, Message, Payload, Response};
pub use scoring::{BatchScorer, ScoreWeights};
pub use types::{AppError, OrchestratedResult, Result};

use crate::trace::QueryObserver;
use std::sync::Arc;
use std::time::Duration;

/// Application state shared across HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<HearthConfig>,
    pub orchestrator: Arc<Orchestrator>,
}

/// Wire the full agent stack from its injected dependencies.
///
/// Construction is the only place allowed to fail fatally (and that happens
/// earlier, loading the [`ListingStore`]); everything built here degrades at
/// query time instead.
pub fn build_orchestrator(
    config: &HearthConfig,
    llm: Arc<dyn InferenceClient>,
    store: Arc<ListingStore>,
    gateway: Arc<dyn MessageGateway>,
    observer: Arc<dyn QueryObserver>,
) -> Orchestrator {
    let scorer = Arc::new(
        BatchScorer::new(llm.clone())
            .with_group_count(config.scoring.group_count)
            .with_cutoff(config.scoring.score_cutoff)
            .with_call_timeout(Duration::from_secs(config.inference.timeout_secs))
            .with_observer(observer.clone()),
    );

    let listings = Arc::new(agents::listings_agent(store, scorer));
    let commute = Arc::new(agents::commute_agent(llm.clone()));
    let messenger = Arc::new(agents::messenger_agent(llm.clone(), gateway));

    let router = agents::IntentRouter::new(llm).with_observer(observer.clone());

    Orchestrator::new(
        router,
        AgentClient::new("orchestrator", listings),
        AgentClient::new("orchestrator", commute),
        AgentClient::new("orchestrator", messenger),
    )
    .with_weights(ScoreWeights {
        primary: config.scoring.primary_weight,
        commute: config.scoring.commute_weight,
    })
    .with_result_limit(config.scoring.result_limit)
    .with_enrichment_limit(config.scoring.max_concurrency)
    .with_observer(observer)
}
