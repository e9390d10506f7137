//! Primary data agent: the listing store and its search/summary tools.
//!
//! Listings are loaded once at construction from the scraper's flat JSON
//! dump. An empty or missing store is the one error allowed to abort
//! startup; no query can be served without data.

use crate::capability::{serve_tools, Tool, ToolRegistry};
use crate::protocol::{AgentNode, AgentNodeBuilder};
use crate::scoring::BatchScorer;
use crate::types::{
    AppError, Listing, ListingFilters, MarketSummary, MatchResult, Result, ToolResult,
};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

/// Immutable in-memory listing store.
#[derive(Debug)]
pub struct ListingStore {
    listings: Vec<Listing>,
}

impl ListingStore {
    /// Load the flat JSON array produced by the scraper.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read listings from {}: {e}", path.display()))
        })?;
        let listings: Vec<Listing> = serde_json::from_str(&raw).map_err(|e| {
            AppError::Config(format!("Malformed listing data in {}: {e}", path.display()))
        })?;
        tracing::info!(count = listings.len(), path = %path.display(), "listings loaded");
        Self::from_listings(listings)
    }

    /// Build a store from already-loaded listings. Fails on an empty set.
    pub fn from_listings(listings: Vec<Listing>) -> Result<Self> {
        if listings.is_empty() {
            return Err(AppError::Config("No listings loaded".to_string()));
        }
        Ok(Self { listings })
    }

    pub fn len(&self) -> usize {
        self.listings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listings.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Listing> {
        self.listings.iter().find(|l| l.id == id)
    }

    /// Listings passing every set filter, in store order.
    pub fn filter(&self, filters: &ListingFilters) -> Vec<Listing> {
        self.listings
            .iter()
            .filter(|l| filters.matches(l))
            .cloned()
            .collect()
    }

    /// Aggregate statistics over the whole store.
    pub fn summary(&self) -> MarketSummary {
        let mut by_neighborhood: BTreeMap<String, usize> = BTreeMap::new();
        let mut by_bedrooms: BTreeMap<u8, usize> = BTreeMap::new();
        let mut min_price = u32::MAX;
        let mut max_price = 0u32;
        let mut price_sum = 0u64;

        for listing in &self.listings {
            *by_neighborhood
                .entry(listing.neighborhood.clone())
                .or_default() += 1;
            *by_bedrooms.entry(listing.bedrooms).or_default() += 1;
            min_price = min_price.min(listing.price);
            max_price = max_price.max(listing.price);
            price_sum += u64::from(listing.price);
        }

        MarketSummary {
            total_listings: self.listings.len(),
            min_price,
            max_price,
            avg_price: (price_sum / self.listings.len() as u64) as u32,
            by_neighborhood,
            by_bedrooms,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct SearchArgs {
    query: String,
    filters: ListingFilters,
    limit: usize,
}

impl Default for SearchArgs {
    fn default() -> Self {
        Self {
            query: String::new(),
            filters: ListingFilters::default(),
            limit: 10,
        }
    }
}

/// `search_listings`: deterministic filters, then semantic batch scoring of
/// the survivors.
struct SearchListingsTool {
    store: Arc<ListingStore>,
    scorer: Arc<BatchScorer>,
}

#[async_trait]
impl Tool for SearchListingsTool {
    fn name(&self) -> &str {
        "search_listings"
    }

    fn description(&self) -> &str {
        "Search listings with structured filters and a free-text requirement, \
         returning semantically ranked matches"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": { "type": "string", "description": "Free-text requirement for semantic ranking" },
                "filters": {
                    "type": "object",
                    "description": "Structured filters: max_price, min_price, bedrooms, pet_friendly, furnished, neighborhood"
                },
                "limit": { "type": "integer", "description": "Maximum results to return (default 10)" }
            },
            "required": []
        })
    }

    async fn execute(&self, args: Value) -> Result<ToolResult> {
        let args: SearchArgs = serde_json::from_value(args)
            .map_err(|e| AppError::InvalidInput(format!("Bad search arguments: {e}")))?;

        let filtered = self.store.filter(&args.filters);
        let matches: Vec<MatchResult> = if args.query.trim().is_empty() {
            // No semantic requirement: the filters already express the whole
            // query, so every survivor is a full match.
            filtered
                .into_iter()
                .take(args.limit)
                .map(|listing| MatchResult {
                    listing,
                    score: 100,
                    rationale: "Matched all structured filters".to_string(),
                })
                .collect()
        } else {
            self.scorer.score(&args.query, &filtered, args.limit).await
        };

        ToolResult::json(&json!({ "matches": matches }))
    }
}

/// `market_summary`: read-only aggregate statistics.
struct MarketSummaryTool {
    store: Arc<ListingStore>,
}

#[async_trait]
impl Tool for MarketSummaryTool {
    fn name(&self) -> &str {
        "market_summary"
    }

    fn description(&self) -> &str {
        "Aggregate statistics over the listing store: counts and price range"
    }

    fn input_schema(&self) -> Value {
        json!({ "type": "object", "properties": {}, "required": [] })
    }

    async fn execute(&self, _args: Value) -> Result<ToolResult> {
        ToolResult::json(&self.store.summary())
    }
}

/// Build the listings agent node.
pub fn listings_agent(store: Arc<ListingStore>, scorer: Arc<BatchScorer>) -> AgentNode {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(SearchListingsTool {
        store: store.clone(),
        scorer,
    }));
    registry.register(Arc::new(MarketSummaryTool { store }));

    let builder: AgentNodeBuilder = AgentNode::builder("listings");
    serve_tools(builder, Arc::new(registry)).build()
}
