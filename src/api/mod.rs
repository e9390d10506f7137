//! HTTP surface: a thin query-in/results-out boundary over the
//! orchestrator.

pub mod handlers;
pub mod routes;

pub use routes::create_router;
