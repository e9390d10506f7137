//! The agents HEARTH composes: the listings data agent, the commute scoring
//! agent, the messaging agent, the intent router, and the orchestrator that
//! plans across them.

pub mod commute;
pub mod listings;
pub mod messenger;
pub mod orchestrator;
pub mod router;

pub use commute::commute_agent;
pub use listings::{listings_agent, ListingStore};
pub use messenger::{messenger_agent, InMemoryGateway, MessageGateway};
pub use orchestrator::Orchestrator;
pub use router::IntentRouter;
