//! Core types shared across the HEARTH crate: listings, scoring results,
//! query analysis, tool envelopes, and error handling.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============= Listing (Candidate) Types =============

/// One searchable rental listing, as produced by the scraper's flat JSON dump.
///
/// The orchestration core only relies on the stable `id`, the fields used by
/// deterministic filters, and the free-text fields fed to semantic scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub id: String,
    pub title: String,
    /// Monthly rent in whole dollars.
    pub price: u32,
    pub bedrooms: u8,
    #[serde(default)]
    pub bathrooms: f32,
    pub neighborhood: String,
    #[serde(default)]
    pub pet_friendly: bool,
    #[serde(default)]
    pub furnished: bool,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Deterministic filters applied before any semantic scoring.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListingFilters {
    pub max_price: Option<u32>,
    pub min_price: Option<u32>,
    pub bedrooms: Option<u8>,
    pub pet_friendly: Option<bool>,
    pub furnished: Option<bool>,
    pub neighborhood: Option<String>,
}

impl ListingFilters {
    /// Whether a listing passes every filter that is actually set.
    pub fn matches(&self, listing: &Listing) -> bool {
        if let Some(max) = self.max_price {
            if listing.price > max {
                return false;
            }
        }
        if let Some(min) = self.min_price {
            if listing.price < min {
                return false;
            }
        }
        if let Some(bedrooms) = self.bedrooms {
            if listing.bedrooms < bedrooms {
                return false;
            }
        }
        if let Some(pets) = self.pet_friendly {
            if listing.pet_friendly != pets {
                return false;
            }
        }
        if let Some(furnished) = self.furnished {
            if listing.furnished != furnished {
                return false;
            }
        }
        if let Some(hood) = &self.neighborhood {
            if !listing
                .neighborhood
                .to_lowercase()
                .contains(&hood.to_lowercase())
            {
                return false;
            }
        }
        true
    }
}

// ============= Scoring Types =============

/// A listing together with its semantic match score (0-100) and the
/// scorer's one-line rationale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchResult {
    pub listing: Listing,
    pub score: u8,
    pub rationale: String,
}

/// Commute convenience score for a single listing, on the same 0-100 scale
/// as match scores (the underlying 1-10 rating is multiplied by 10).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommuteScore {
    pub score: u8,
    pub rationale: String,
}

/// A listing ranked by the combined cross-agent score.
///
/// `commute_score` is `None` when the commute branch failed or was skipped;
/// in that case `combined_score` equals the match score alone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedListing {
    pub listing: Listing,
    pub match_score: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commute_score: Option<u8>,
    pub combined_score: f64,
    pub rationale: String,
}

/// Aggregate statistics over the whole listing store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketSummary {
    pub total_listings: usize,
    pub min_price: u32,
    pub max_price: u32,
    pub avg_price: u32,
    pub by_neighborhood: BTreeMap<String, usize>,
    pub by_bedrooms: BTreeMap<u8, usize>,
}

// ============= Intent / Query Analysis Types =============

/// Closed vocabulary of execution plans the orchestrator knows how to run.
///
/// Values outside the vocabulary survive as `Other` so the orchestrator can
/// report them back verbatim instead of panicking on an unexpected string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    HousingSearch,
    CombinedSearch,
    MarketSummary,
    DraftMessage,
    SendMessage,
    SessionLogin,
    SessionCheck,
    SessionClear,
    Other(String),
}

impl Intent {
    /// Parse an intent string from the classifier's output.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "housing_search" => Intent::HousingSearch,
            "combined_search" => Intent::CombinedSearch,
            "market_summary" => Intent::MarketSummary,
            "draft_message" => Intent::DraftMessage,
            "send_message" => Intent::SendMessage,
            "session_login" => Intent::SessionLogin,
            "session_check" => Intent::SessionCheck,
            "session_clear" => Intent::SessionClear,
            other => Intent::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Intent::HousingSearch => "housing_search",
            Intent::CombinedSearch => "combined_search",
            Intent::MarketSummary => "market_summary",
            Intent::DraftMessage => "draft_message",
            Intent::SendMessage => "send_message",
            Intent::SessionLogin => "session_login",
            Intent::SessionCheck => "session_check",
            Intent::SessionClear => "session_clear",
            Intent::Other(value) => value,
        }
    }

    /// Whether this intent runs a listing search as part of its plan.
    pub fn is_search(&self) -> bool {
        matches!(self, Intent::HousingSearch | Intent::CombinedSearch)
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Intent {
    fn serialize<S: serde::Serializer>(
        &self,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Intent {
    fn deserialize<D: serde::Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Ok(Intent::parse(&value))
    }
}

/// Search-specific criteria extracted by the classifier.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HousingCriteria {
    /// Free-text requirement fed to the semantic batch scorer.
    pub query: String,
    pub filters: ListingFilters,
}

/// Commute-specific criteria extracted by the classifier.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CommuteCriteria {
    /// Where the user commutes to ("downtown", an office address, ...).
    pub destination: String,
}

/// Messaging-specific criteria extracted by the classifier.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageCriteria {
    pub listing_id: Option<String>,
    pub notes: String,
}

/// Per-intent criteria bundle; only the sections relevant to the classified
/// intent are populated.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryCriteria {
    pub housing: Option<HousingCriteria>,
    pub commute: Option<CommuteCriteria>,
    pub message: Option<MessageCriteria>,
}

/// Structured output of intent classification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryAnalysis {
    pub intent: Intent,
    #[serde(default = "default_confidence")]
    pub confidence: f32,
    #[serde(default)]
    pub criteria: QueryCriteria,
    #[serde(default)]
    pub reasoning: String,
}

fn default_confidence() -> f32 {
    0.5
}

/// Final answer for one orchestrated query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratedResult {
    pub success: bool,
    pub intent: Intent,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<serde_json::Value>,
    pub reasoning: String,
    /// Ordered list of agents actually invoked while executing the plan.
    pub agents_used: Vec<String>,
}

// ============= Capability / Tool Types =============

/// A coarse, human-oriented capability advertisement. Parameters map a name
/// to a free-form type description; nothing is enforced from this.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Capability {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,
}

/// Machine-readable descriptor of a tool an agent exposes for invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: serde_json::Value,
}

/// One block of tool output. Only text content exists today; the tag keeps
/// the envelope open for other content kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ToolContent {
    Text { text: String },
}

/// Universal tool return envelope: an opaque text payload (frequently
/// JSON-encoded) plus an error flag. Callers never need per-tool return
/// types to compose heterogeneous tools.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub content: Vec<ToolContent>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,
}

impl ToolResult {
    /// Successful result carrying plain text.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::Text { text: text.into() }],
            is_error: false,
        }
    }

    /// Successful result carrying a JSON-encoded payload.
    pub fn json<T: Serialize>(value: &T) -> Result<Self> {
        let text = serde_json::to_string(value)
            .map_err(|e| AppError::Internal(format!("Failed to encode tool result: {e}")))?;
        Ok(Self::text(text))
    }

    /// Failed result carrying an error description.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::Text {
                text: message.into(),
            }],
            is_error: true,
        }
    }

    /// The first text block, if any.
    pub fn first_text(&self) -> Option<&str> {
        self.content.iter().next().map(|block| match block {
            ToolContent::Text { text } => text.as_str(),
        })
    }

    /// Decode the first text block as JSON.
    pub fn decode<T: serde::de::DeserializeOwned>(&self) -> Result<T> {
        let text = self
            .first_text()
            .ok_or_else(|| AppError::Parse("Tool result has no text content".to_string()))?;
        serde_json::from_str(text)
            .map_err(|e| AppError::Parse(format!("Failed to decode tool result: {e}")))
    }
}

// ============= Error Types =============

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Inference error: {0}")]
    Inference(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Agent error: {0}")]
    Agent(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            AppError::NotFound(msg) => (axum::http::StatusCode::NOT_FOUND, msg),
            AppError::InvalidInput(msg) => (axum::http::StatusCode::BAD_REQUEST, msg),
            AppError::Inference(msg)
            | AppError::Parse(msg)
            | AppError::Agent(msg)
            | AppError::Config(msg)
            | AppError::Internal(msg) => (axum::http::StatusCode::INTERNAL_SERVER_ERROR, msg),
            AppError::Io(e) => (axum::http::StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
        };

        let body = serde_json::json!({
            "error": message
        });

        (status, axum::Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn listing(price: u32, bedrooms: u8, neighborhood: &str) -> Listing {
        Listing {
            id: "lst-1".to_string(),
            title: "Test listing".to_string(),
            price,
            bedrooms,
            bathrooms: 1.0,
            neighborhood: neighborhood.to_string(),
            pet_friendly: true,
            furnished: false,
            description: String::new(),
            url: None,
        }
    }

    #[test]
    fn empty_filters_match_everything() {
        let filters = ListingFilters::default();
        assert!(filters.matches(&listing(2500, 1, "Mission")));
    }

    #[test]
    fn price_and_bedroom_filters() {
        let filters = ListingFilters {
            max_price: Some(2000),
            bedrooms: Some(2),
            ..Default::default()
        };
        assert!(filters.matches(&listing(1800, 2, "Mission")));
        assert!(!filters.matches(&listing(2100, 2, "Mission")));
        assert!(!filters.matches(&listing(1800, 1, "Mission")));
    }

    #[test]
    fn neighborhood_filter_is_case_insensitive_substring() {
        let filters = ListingFilters {
            neighborhood: Some("mission".to_string()),
            ..Default::default()
        };
        assert!(filters.matches(&listing(1800, 1, "Mission District")));
        assert!(!filters.matches(&listing(1800, 1, "SoMa")));
    }

    #[test]
    fn intent_round_trips_through_strings() {
        for name in [
            "housing_search",
            "combined_search",
            "market_summary",
            "draft_message",
            "send_message",
            "session_login",
            "session_check",
            "session_clear",
        ] {
            assert_eq!(Intent::parse(name).as_str(), name);
        }
        assert_eq!(
            Intent::parse("book_viewing"),
            Intent::Other("book_viewing".to_string())
        );
    }

    #[test]
    fn intent_serializes_as_a_plain_string() {
        let encoded = serde_json::to_value(Intent::CombinedSearch).unwrap();
        assert_eq!(encoded, serde_json::json!("combined_search"));

        let decoded: Intent = serde_json::from_value(encoded).unwrap();
        assert_eq!(decoded, Intent::CombinedSearch);

        let novel: Intent = serde_json::from_value(serde_json::json!("book_viewing")).unwrap();
        assert_eq!(novel, Intent::Other("book_viewing".to_string()));
    }

    #[test]
    fn tool_result_json_round_trip() {
        let result = ToolResult::json(&serde_json::json!({"a": 1})).unwrap();
        assert!(!result.is_error);
        let decoded: serde_json::Value = result.decode().unwrap();
        assert_eq!(decoded["a"], 1);
    }
}
