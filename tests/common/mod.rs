//! Shared fixtures for the integration tests: a scriptable inference stub
//! and a fully wired orchestrator over an in-memory listing store.

use async_trait::async_trait;
use hearth::agents::InMemoryGateway;
use hearth::llm::InferenceClient;
use hearth::trace::NoopObserver;
use hearth::types::{AppError, Listing, Result};
use hearth::{build_orchestrator, HearthConfig, ListingStore, Orchestrator};
use std::sync::Arc;

type Responder = Box<dyn Fn(&str) -> Result<String> + Send + Sync>;

/// Inference stub whose reply is computed from the prompt, so one stub can
/// play the classifier, the scorer, and the commute rater in a single query.
pub struct ScriptedInference {
    responder: Responder,
}

impl ScriptedInference {
    pub fn new<F>(responder: F) -> Arc<Self>
    where
        F: Fn(&str) -> Result<String> + Send + Sync + 'static,
    {
        Arc::new(Self {
            responder: Box::new(responder),
        })
    }

    pub fn fixed(reply: &str) -> Arc<Self> {
        let reply = reply.to_string();
        Self::new(move |_| Ok(reply.clone()))
    }

    #[allow(dead_code)]
    pub fn failing() -> Arc<Self> {
        Self::new(|_| Err(AppError::Inference("scripted failure".to_string())))
    }
}

#[async_trait]
impl InferenceClient for ScriptedInference {
    async fn infer(&self, prompt: &str) -> Result<String> {
        (self.responder)(prompt)
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

pub fn sample_listings() -> Vec<Listing> {
    vec![
        Listing {
            id: "lst-1".to_string(),
            title: "Sunny 2BR near the park".to_string(),
            price: 1900,
            bedrooms: 2,
            bathrooms: 1.0,
            neighborhood: "Downtown".to_string(),
            pet_friendly: true,
            furnished: false,
            description: "Bright unit two blocks from the metro".to_string(),
            url: None,
        },
        Listing {
            id: "lst-2".to_string(),
            title: "Furnished studio".to_string(),
            price: 1400,
            bedrooms: 0,
            bathrooms: 1.0,
            neighborhood: "Riverside".to_string(),
            pet_friendly: false,
            furnished: true,
            description: "Compact and move-in ready".to_string(),
            url: None,
        },
        Listing {
            id: "lst-3".to_string(),
            title: "Spacious 2BR loft".to_string(),
            price: 2600,
            bedrooms: 2,
            bathrooms: 2.0,
            neighborhood: "Downtown".to_string(),
            pet_friendly: false,
            furnished: false,
            description: "High ceilings, dedicated parking".to_string(),
            url: None,
        },
    ]
}

/// Wire a complete orchestrator over the sample listings, returning the
/// gateway so tests can inspect the outbox.
pub fn orchestrator(llm: Arc<dyn InferenceClient>) -> (Orchestrator, Arc<InMemoryGateway>) {
    let config = HearthConfig::default();
    let store = Arc::new(ListingStore::from_listings(sample_listings()).unwrap());
    let gateway = Arc::new(InMemoryGateway::new());
    let orchestrator = build_orchestrator(
        &config,
        llm,
        store,
        gateway.clone(),
        Arc::new(NoopObserver),
    );
    (orchestrator, gateway)
}
