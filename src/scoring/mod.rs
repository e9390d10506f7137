//! Semantic scoring: the parallel batch engine and the cross-agent score
//! combiner.

pub mod batch;
pub mod combine;

pub use batch::BatchScorer;
pub use combine::{combine_scores, combine_weighted, ScoreWeights};
