//! Commute scoring agent: rates how convenient a listing's location is for
//! a given destination via one inference call per listing.

use crate::capability::{serve_tools, Tool, ToolRegistry};
use crate::llm::{parse_structured, InferenceClient};
use crate::protocol::AgentNode;
use crate::types::{AppError, CommuteScore, Result, ToolResult};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

#[derive(Debug, Deserialize)]
struct CommuteArgs {
    origin: String,
    destination: String,
    #[serde(default)]
    listing_id: Option<String>,
}

/// Structured shape expected from the inference service: a 1-10 rating.
#[derive(Debug, Deserialize)]
struct CommuteRating {
    rating: f64,
    #[serde(default)]
    reason: String,
}

/// `score_commute`: one inference call producing a 1-10 convenience rating,
/// scaled by 10 onto the shared 0-100 scale.
struct ScoreCommuteTool {
    llm: Arc<dyn InferenceClient>,
}

#[async_trait]
impl Tool for ScoreCommuteTool {
    fn name(&self) -> &str {
        "score_commute"
    }

    fn description(&self) -> &str {
        "Rate commute convenience from a listing's location to a destination on a 0-100 scale"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "origin": { "type": "string", "description": "Listing neighborhood or address" },
                "destination": { "type": "string", "description": "Where the renter commutes to" },
                "listing_id": { "type": "string", "description": "Optional listing identifier for logging" }
            },
            "required": ["origin", "destination"]
        })
    }

    async fn execute(&self, args: Value) -> Result<ToolResult> {
        let args: CommuteArgs = serde_json::from_value(args)
            .map_err(|e| AppError::InvalidInput(format!("Bad commute arguments: {e}")))?;

        let prompt = format!(
            "Rate the commute from \"{}\" to \"{}\" for a renter.\n\
             Consider typical transit options and distance.\n\
             Respond with ONLY a JSON object: {{\"rating\": <1-10>, \"reason\": \"<one sentence>\"}}",
            args.origin, args.destination
        );

        let raw = self.llm.infer(&prompt).await?;
        let rating: CommuteRating = parse_structured(&raw).map_err(|e| {
            AppError::Parse(format!(
                "Commute rating for {} was unparseable: {e}",
                args.listing_id.as_deref().unwrap_or(&args.origin)
            ))
        })?;

        let score = (rating.rating.clamp(1.0, 10.0) * 10.0).round() as u8;
        ToolResult::json(&CommuteScore {
            score,
            rationale: rating.reason,
        })
    }
}

/// Build the commute agent node.
pub fn commute_agent(llm: Arc<dyn InferenceClient>) -> AgentNode {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(ScoreCommuteTool { llm }));
    serve_tools(AgentNode::builder("commute"), Arc::new(registry)).build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::AgentClient;
    use crate::llm::testing::StubInference;

    fn client(stub: Arc<StubInference>) -> AgentClient {
        AgentClient::new("test", Arc::new(commute_agent(stub)))
    }

    #[tokio::test]
    async fn rating_is_scaled_to_the_shared_scale() {
        let stub = StubInference::fixed(r#"The commute is decent. {"rating": 7, "reason": "one transfer"}"#);
        let result = client(stub)
            .call_tool(
                "score_commute",
                json!({"origin": "Riverside", "destination": "downtown"}),
            )
            .await
            .unwrap();
        let score: CommuteScore = result.decode().unwrap();
        assert_eq!(score.score, 70);
        assert_eq!(score.rationale, "one transfer");
    }

    #[tokio::test]
    async fn out_of_range_ratings_are_clamped() {
        let stub = StubInference::fixed(r#"{"rating": 14, "reason": "walkable"}"#);
        let result = client(stub)
            .call_tool(
                "score_commute",
                json!({"origin": "Downtown", "destination": "downtown"}),
            )
            .await
            .unwrap();
        let score: CommuteScore = result.decode().unwrap();
        assert_eq!(score.score, 100);
    }

    #[tokio::test]
    async fn unparseable_rating_becomes_an_error_tool_result() {
        let stub = StubInference::fixed("It depends on traffic.");
        let result = client(stub)
            .call_tool(
                "score_commute",
                json!({"origin": "Riverside", "destination": "downtown", "listing_id": "lst-9"}),
            )
            .await
            .unwrap();
        assert!(result.is_error);
        assert!(result.first_text().unwrap().contains("lst-9"));
    }
}
