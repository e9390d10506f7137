//! HTTP surface tests: the axum router over a scripted agent stack.

mod common;

use axum_test::TestServer;
use common::{orchestrator, ScriptedInference};
use hearth::{AppState, HearthConfig};
use serde_json::{json, Value};
use std::sync::Arc;

fn server(llm: Arc<ScriptedInference>) -> TestServer {
    let (orchestrator, _gateway) = orchestrator(llm);
    let state = AppState {
        config: Arc::new(HearthConfig::default()),
        orchestrator: Arc::new(orchestrator),
    };
    let app = hearth::api::create_router().with_state(state);
    TestServer::new(app).unwrap()
}

#[tokio::test]
async fn health_reports_ok() {
    let server = server(ScriptedInference::fixed("unused"));
    let response = server.get("/health").await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["status"], "ok");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn query_runs_the_orchestrator() {
    let stub = ScriptedInference::fixed(
        r#"{"intent": "market_summary", "confidence": 0.9, "reasoning": "stats"}"#,
    );
    let server = server(stub);

    let response = server
        .post("/query")
        .json(&json!({ "query": "how is the market" }))
        .await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["intent"], "market_summary");
    assert_eq!(body["results"]["summary"]["total_listings"], 3);
}

#[tokio::test]
async fn empty_query_is_rejected() {
    let server = server(ScriptedInference::fixed("unused"));
    let response = server.post("/query").json(&json!({ "query": "   " })).await;
    response.assert_status_bad_request();
}

#[tokio::test]
async fn failed_plans_still_return_a_structured_body() {
    let stub = ScriptedInference::fixed(
        r#"{"intent": "send_message", "confidence": 0.9, "reasoning": "contact"}"#,
    );
    let server = server(stub);

    let response = server
        .post("/query")
        .json(&json!({ "query": "message the first landlord" }))
        .await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["success"], false);
    assert!(body["reasoning"].as_str().unwrap().contains("listing"));
}
