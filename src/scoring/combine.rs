//! Linear combination of per-agent scores into one ranking key.
//!
//! Every contributing agent emits a score on a 0-100 scale. Weights are
//! fixed constants; when a source is missing for a candidate, the remaining
//! weights are renormalized so the combined score degrades toward the
//! sources that are present instead of collapsing to zero or NaN.

use serde::{Deserialize, Serialize};

/// Weights for the two sources the default plans combine.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScoreWeights {
    pub primary: f64,
    pub commute: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            primary: 0.6,
            commute: 0.4,
        }
    }
}

/// Combine the primary match score with an optional commute score.
///
/// A missing commute score renormalizes the weighting to the primary score
/// alone.
pub fn combine_scores(weights: ScoreWeights, primary: u8, commute: Option<u8>) -> f64 {
    let mut sources = vec![(f64::from(primary), weights.primary)];
    if let Some(commute) = commute {
        sources.push((f64::from(commute), weights.commute));
    }
    combine_weighted(&sources)
}

/// Weighted mean over the sources actually present, with weights
/// renormalized to sum to 1.0. Returns 0.0 for an empty source list and
/// falls back to an unweighted mean if every present weight is zero.
pub fn combine_weighted(sources: &[(f64, f64)]) -> f64 {
    if sources.is_empty() {
        return 0.0;
    }
    let total_weight: f64 = sources.iter().map(|(_, w)| w).sum();
    if total_weight <= 0.0 {
        return sources.iter().map(|(s, _)| s).sum::<f64>() / sources.len() as f64;
    }
    sources
        .iter()
        .map(|(score, weight)| score * weight / total_weight)
        .sum()
}
