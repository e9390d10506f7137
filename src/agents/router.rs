//! Intent classification: one inference call maps a free-text query onto a
//! closed vocabulary of execution plans, with a non-fatal fallback when the
//! service's output cannot be parsed.

use crate::llm::{parse_structured, InferenceClient};
use crate::trace::{NoopObserver, QueryEvent, QueryObserver};
use crate::types::{HousingCriteria, Intent, QueryAnalysis};
use std::sync::Arc;

/// The closed intent vocabulary offered to the classifier.
pub const INTENT_VOCABULARY: &[&str] = &[
    "housing_search",
    "combined_search",
    "market_summary",
    "draft_message",
    "send_message",
    "session_login",
    "session_check",
    "session_clear",
];

const FALLBACK_CONFIDENCE: f32 = 0.5;

/// Classifies free-text queries into intents with structured sub-criteria.
pub struct IntentRouter {
    llm: Arc<dyn InferenceClient>,
    observer: Arc<dyn QueryObserver>,
}

impl IntentRouter {
    pub fn new(llm: Arc<dyn InferenceClient>) -> Self {
        Self {
            llm,
            observer: Arc::new(NoopObserver),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn QueryObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Classify a query. Never fails: inference errors and unparseable
    /// output both fall back to the default search intent with the literal
    /// query preserved and the fallback cause recorded in `reasoning`.
    pub async fn classify(&self, query: &str) -> QueryAnalysis {
        let prompt = self.classification_prompt(query);

        let raw = match self.llm.infer(&prompt).await {
            Ok(raw) => raw,
            Err(e) => return self.fallback(query, &format!("inference failed: {e}")),
        };

        let mut analysis: QueryAnalysis = match parse_structured(&raw) {
            Ok(analysis) => analysis,
            Err(e) => return self.fallback(query, &e.to_string()),
        };

        analysis.confidence = analysis.confidence.clamp(0.0, 1.0);

        // Search plans need housing criteria; synthesize them from the
        // literal query if the classifier omitted the section.
        if analysis.intent.is_search() {
            let housing = analysis
                .criteria
                .housing
                .get_or_insert_with(HousingCriteria::default);
            if housing.query.trim().is_empty() {
                housing.query = query.to_string();
            }
        }

        analysis
    }

    fn fallback(&self, query: &str, cause: &str) -> QueryAnalysis {
        self.observer.observe(&QueryEvent::ClassificationFellBack {
            reason: cause.to_string(),
        });
        QueryAnalysis {
            intent: Intent::HousingSearch,
            confidence: FALLBACK_CONFIDENCE,
            criteria: crate::types::QueryCriteria {
                housing: Some(HousingCriteria {
                    query: query.to_string(),
                    filters: Default::default(),
                }),
                ..Default::default()
            },
            reasoning: format!("Fell back to housing_search: {cause}"),
        }
    }

    fn classification_prompt(&self, query: &str) -> String {
        format!(
            r#"Classify this housing-related query into exactly one intent.

Intents:
- housing_search: search listings by criteria
- combined_search: search listings AND rank by commute to a destination
- market_summary: aggregate statistics over available listings
- draft_message: write an inquiry for a specific listing
- send_message: send an inquiry to a specific listing
- session_login: log in to the messaging session
- session_check: check the messaging session
- session_clear: clear the messaging session

Query: {query}

Respond with ONLY a JSON object:
{{
  "intent": "<one of the intents above>",
  "confidence": <0.0-1.0>,
  "criteria": {{
    "housing": {{"query": "<free-text requirement>", "filters": {{"max_price": null, "min_price": null, "bedrooms": null, "pet_friendly": null, "furnished": null, "neighborhood": null}}}},
    "commute": {{"destination": "<where the renter commutes to>"}},
    "message": {{"listing_id": "<identifier if mentioned>", "notes": "<what to say>"}}
  }},
  "reasoning": "<one sentence>"
}}

Only populate the criteria sections relevant to the intent."#
        )
    }
}
