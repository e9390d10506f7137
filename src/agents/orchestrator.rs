//! The orchestrator: classifies each query, executes the matching plan
//! against the downstream agents through the capability-exchange layer, and
//! combines cross-agent scores into one ranking.
//!
//! Error policy follows the taxonomy used throughout the crate: routing
//! errors and downstream failures surface as data (`success: false` or a
//! degraded per-candidate result), never as errors crossing an agent
//! boundary. The one exception — missing listing data — already aborted
//! construction long before a query arrives.

use crate::capability::AgentClient;
use crate::scoring::{combine_scores, ScoreWeights};
use crate::trace::{NoopObserver, QueryEvent, QueryObserver};
use crate::types::{
    AppError, CommuteScore, HousingCriteria, Intent, MatchResult, OrchestratedResult,
    QueryAnalysis, RankedListing, Result,
};
use futures::future;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::Semaphore;

const DEFAULT_RESULT_LIMIT: usize = 10;
/// Commute enrichment fan-out cap, deliberately independent of candidate
/// count so large result sets cannot flood the inference service.
const DEFAULT_ENRICHMENT_LIMIT: usize = 8;

// The word boundary sits inside each alternative: a leading `\b` before the
// whole group would never hold ahead of a bare `#`.
static LISTING_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(?:\blisting\s*#?\s*|\blst-|#)(\d+)\b").expect("valid regex"));

/// Executes intent-specific plans across the downstream agents.
pub struct Orchestrator {
    router: super::IntentRouter,
    listings: AgentClient,
    commute: AgentClient,
    messenger: AgentClient,
    weights: ScoreWeights,
    result_limit: usize,
    enrichment_limit: usize,
    observer: Arc<dyn QueryObserver>,
}

impl Orchestrator {
    pub fn new(
        router: super::IntentRouter,
        listings: AgentClient,
        commute: AgentClient,
        messenger: AgentClient,
    ) -> Self {
        Self {
            router,
            listings,
            commute,
            messenger,
            weights: ScoreWeights::default(),
            result_limit: DEFAULT_RESULT_LIMIT,
            enrichment_limit: DEFAULT_ENRICHMENT_LIMIT,
            observer: Arc::new(NoopObserver),
        }
    }

    pub fn with_weights(mut self, weights: ScoreWeights) -> Self {
        self.weights = weights;
        self
    }

    pub fn with_result_limit(mut self, limit: usize) -> Self {
        self.result_limit = limit.max(1);
        self
    }

    pub fn with_enrichment_limit(mut self, limit: usize) -> Self {
        self.enrichment_limit = limit.max(1);
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn QueryObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Answer one query end to end. Always returns a result; every failure
    /// mode is folded into `success: false` with a readable `reasoning`.
    pub async fn process_query(&self, query: &str) -> OrchestratedResult {
        let analysis = self.router.classify(query).await;
        self.observer.observe(&QueryEvent::QueryClassified {
            intent: analysis.intent.clone(),
            confidence: analysis.confidence,
        });

        let result = match &analysis.intent {
            Intent::HousingSearch => self.housing_search(&analysis).await,
            Intent::CombinedSearch => self.combined_search(&analysis).await,
            Intent::MarketSummary => self.market_summary(&analysis).await,
            Intent::DraftMessage
            | Intent::SendMessage
            | Intent::SessionLogin
            | Intent::SessionCheck
            | Intent::SessionClear => self.message_plan(&analysis, query).await,
            Intent::Other(value) => OrchestratedResult {
                success: false,
                intent: analysis.intent.clone(),
                results: None,
                reasoning: format!("Unknown intent: {value}"),
                agents_used: Vec::new(),
            },
        };

        self.observer.observe(&QueryEvent::PlanFinished {
            intent: result.intent.clone(),
            success: result.success,
        });
        result
    }

    /// Run the listing search tool and decode its matches.
    async fn search(&self, criteria: &HousingCriteria) -> Result<Vec<MatchResult>> {
        self.observer.observe(&QueryEvent::AgentInvoked {
            agent: self.listings.target_name().to_string(),
            tool: "search_listings".to_string(),
        });

        let result = self
            .listings
            .call_tool(
                "search_listings",
                json!({
                    "query": criteria.query,
                    "filters": criteria.filters,
                    "limit": self.result_limit,
                }),
            )
            .await?;

        if result.is_error {
            return Err(AppError::Agent(format!(
                "Listing search failed: {}",
                result.first_text().unwrap_or("no detail")
            )));
        }

        #[derive(Deserialize)]
        struct SearchPayload {
            matches: Vec<MatchResult>,
        }
        Ok(result.decode::<SearchPayload>()?.matches)
    }

    async fn housing_search(&self, analysis: &QueryAnalysis) -> OrchestratedResult {
        let criteria = analysis.criteria.housing.clone().unwrap_or_default();
        match self.search(&criteria).await {
            Ok(matches) => OrchestratedResult {
                success: true,
                intent: analysis.intent.clone(),
                reasoning: format!("Found {} matching listings", matches.len()),
                results: Some(json!({ "matches": matches })),
                agents_used: vec![self.listings.target_name().to_string()],
            },
            Err(e) => self.plan_failure(analysis, e.to_string(), vec![
                self.listings.target_name().to_string(),
            ]),
        }
    }

    async fn combined_search(&self, analysis: &QueryAnalysis) -> OrchestratedResult {
        let criteria = analysis.criteria.housing.clone().unwrap_or_default();
        let mut agents_used = vec![self.listings.target_name().to_string()];

        let matches = match self.search(&criteria).await {
            Ok(matches) => matches,
            Err(e) => return self.plan_failure(analysis, e.to_string(), agents_used),
        };

        if matches.is_empty() {
            return OrchestratedResult {
                success: true,
                intent: analysis.intent.clone(),
                results: Some(json!({ "ranked": [] })),
                reasoning: "No listings matched the search criteria".to_string(),
                agents_used,
            };
        }

        let destination = analysis
            .criteria
            .commute
            .as_ref()
            .map(|c| c.destination.trim().to_string())
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| "the city center".to_string());

        agents_used.push(self.commute.target_name().to_string());
        let commute_scores = self.enrich_with_commutes(&matches, &destination).await;

        let mut ranked: Vec<RankedListing> = matches
            .into_iter()
            .zip(commute_scores)
            .map(|(m, commute)| {
                let commute_score = commute.as_ref().map(|c| c.score);
                let combined_score = combine_scores(self.weights, m.score, commute_score);
                let rationale = match &commute {
                    Some(c) if !c.rationale.is_empty() => {
                        format!("{} Commute: {}", m.rationale, c.rationale)
                    }
                    _ => m.rationale,
                };
                RankedListing {
                    listing: m.listing,
                    match_score: m.score,
                    commute_score,
                    combined_score,
                    rationale,
                }
            })
            .collect();

        // NaN is impossible here: both inputs are u8-derived.
        ranked.sort_by(|a, b| {
            b.combined_score
                .partial_cmp(&a.combined_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        OrchestratedResult {
            success: true,
            intent: analysis.intent.clone(),
            reasoning: format!(
                "Ranked {} listings by match and commute to {destination}",
                ranked.len()
            ),
            results: Some(json!({ "ranked": ranked })),
            agents_used,
        }
    }

    /// Per-candidate commute scoring with bounded fan-out. The returned
    /// vector is index-aligned with `matches`; a failed branch settles as
    /// `None` and the candidate degrades to its primary score.
    async fn enrich_with_commutes(
        &self,
        matches: &[MatchResult],
        destination: &str,
    ) -> Vec<Option<CommuteScore>> {
        let semaphore = Arc::new(Semaphore::new(self.enrichment_limit));

        let branches = matches.iter().map(|m| {
            let semaphore = semaphore.clone();
            let client = self.commute.clone();
            let args = json!({
                "origin": m.listing.neighborhood,
                "destination": destination,
                "listing_id": m.listing.id,
            });
            let listing_id = m.listing.id.clone();
            async move {
                let _permit = semaphore.acquire().await.ok()?;
                match client.call_tool("score_commute", args).await {
                    Ok(result) if !result.is_error => result.decode::<CommuteScore>().ok(),
                    Ok(result) => {
                        tracing::debug!(
                            listing = %listing_id,
                            detail = result.first_text().unwrap_or("none"),
                            "commute scoring degraded to primary score"
                        );
                        None
                    }
                    Err(e) => {
                        tracing::debug!(listing = %listing_id, error = %e, "commute call failed");
                        None
                    }
                }
            }
        });

        future::join_all(branches).await
    }

    async fn market_summary(&self, analysis: &QueryAnalysis) -> OrchestratedResult {
        self.observer.observe(&QueryEvent::AgentInvoked {
            agent: self.listings.target_name().to_string(),
            tool: "market_summary".to_string(),
        });
        let agents_used = vec![self.listings.target_name().to_string()];

        match self.listings.call_tool("market_summary", json!({})).await {
            Ok(result) if !result.is_error => {
                let summary: Value = result.decode().unwrap_or(Value::Null);
                OrchestratedResult {
                    success: true,
                    intent: analysis.intent.clone(),
                    results: Some(json!({ "summary": summary })),
                    reasoning: "Computed market summary".to_string(),
                    agents_used,
                }
            }
            Ok(result) => self.plan_failure(
                analysis,
                result.first_text().unwrap_or("summary failed").to_string(),
                agents_used,
            ),
            Err(e) => self.plan_failure(analysis, e.to_string(), agents_used),
        }
    }

    async fn message_plan(&self, analysis: &QueryAnalysis, query: &str) -> OrchestratedResult {
        let message = analysis.criteria.message.clone().unwrap_or_default();

        let (tool, args) = match &analysis.intent {
            Intent::SessionLogin => ("session_login", json!({})),
            Intent::SessionCheck => ("session_check", json!({})),
            Intent::SessionClear => ("session_clear", json!({})),
            intent => {
                // Drafting and sending require a concrete listing.
                let Some(listing_id) = message
                    .listing_id
                    .clone()
                    .filter(|id| !id.trim().is_empty())
                    .or_else(|| extract_listing_id(query))
                else {
                    return self.plan_failure(
                        analysis,
                        "No listing identifier found in query; mention the listing, e.g. \
                         \"listing #1042\""
                            .to_string(),
                        Vec::new(),
                    );
                };
                match intent {
                    Intent::DraftMessage => (
                        "draft_message",
                        json!({ "listing_id": listing_id, "notes": message.notes }),
                    ),
                    _ => (
                        "send_message",
                        json!({ "listing_id": listing_id, "body": message.notes }),
                    ),
                }
            }
        };

        self.observer.observe(&QueryEvent::AgentInvoked {
            agent: self.messenger.target_name().to_string(),
            tool: tool.to_string(),
        });
        let agents_used = vec![self.messenger.target_name().to_string()];

        match self.messenger.call_tool(tool, args).await {
            Ok(result) if !result.is_error => OrchestratedResult {
                success: true,
                intent: analysis.intent.clone(),
                results: result.decode::<Value>().ok().map(|v| json!({ "message": v })),
                reasoning: format!("Completed {tool}"),
                agents_used,
            },
            Ok(result) => self.plan_failure(
                analysis,
                result.first_text().unwrap_or("messaging failed").to_string(),
                agents_used,
            ),
            Err(e) => self.plan_failure(analysis, e.to_string(), agents_used),
        }
    }

    fn plan_failure(
        &self,
        analysis: &QueryAnalysis,
        reasoning: String,
        agents_used: Vec<String>,
    ) -> OrchestratedResult {
        OrchestratedResult {
            success: false,
            intent: analysis.intent.clone(),
            results: None,
            reasoning,
            agents_used,
        }
    }
}

/// Pull a listing identifier out of free text: "listing 1042", "listing
/// #1042", "#1042", or a literal "lst-1042" token.
fn extract_listing_id(text: &str) -> Option<String> {
    LISTING_ID
        .captures(text)
        .map(|captures| format!("lst-{}", &captures[1]))
}
