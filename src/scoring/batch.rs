//! Parallel batch scoring of candidate listings against a free-text
//! requirement.
//!
//! The candidate set is partitioned into a fixed number of contiguous
//! groups, one inference call is issued per group concurrently, and the
//! surviving per-group results are merged, stable-sorted by score, and
//! capped. A group whose call fails, times out, or returns nothing
//! parseable contributes zero results; failure is local, never fatal to the
//! other groups.

use crate::llm::{parse_structured, InferenceClient};
use crate::trace::{NoopObserver, QueryEvent, QueryObserver};
use crate::types::{Listing, MatchResult};
use futures::future;
use serde::Deserialize;
use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

const DEFAULT_GROUP_COUNT: usize = 5;
const DEFAULT_SCORE_CUTOFF: u8 = 60;
const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// One entry of a group's structured scoring response.
#[derive(Debug, Deserialize)]
struct GroupScore {
    /// 1-based index within the group's candidate list.
    index: usize,
    score: f64,
    #[serde(default, alias = "rationale")]
    reason: String,
}

/// Fans a candidate set out to the inference service in fixed-count groups
/// and merges the scored results deterministically.
pub struct BatchScorer {
    llm: Arc<dyn InferenceClient>,
    observer: Arc<dyn QueryObserver>,
    group_count: usize,
    score_cutoff: u8,
    call_timeout: Duration,
}

impl BatchScorer {
    pub fn new(llm: Arc<dyn InferenceClient>) -> Self {
        Self {
            llm,
            observer: Arc::new(NoopObserver),
            group_count: DEFAULT_GROUP_COUNT,
            score_cutoff: DEFAULT_SCORE_CUTOFF,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn QueryObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_group_count(mut self, group_count: usize) -> Self {
        self.group_count = group_count.max(1);
        self
    }

    pub fn with_cutoff(mut self, cutoff: u8) -> Self {
        self.score_cutoff = cutoff;
        self
    }

    pub fn with_call_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    /// Score `candidates` against `requirement` and return at most `limit`
    /// results, sorted descending by score. Ties keep first-seen group
    /// order (stable sort), so the output order is a deterministic function
    /// of the scores alone.
    pub async fn score(
        &self,
        requirement: &str,
        candidates: &[Listing],
        limit: usize,
    ) -> Vec<MatchResult> {
        if candidates.is_empty() {
            return Vec::new();
        }

        let group_size = candidates.len().div_ceil(self.group_count);
        let groups = candidates
            .chunks(group_size)
            .enumerate()
            .map(|(index, group)| self.score_group(requirement, index, group));

        // Join-all: every branch settles, failed branches settle empty.
        let settled = future::join_all(groups).await;

        let mut merged: Vec<MatchResult> = settled.into_iter().flatten().collect();
        merged.sort_by(|a, b| b.score.cmp(&a.score));
        merged.truncate(limit);
        merged
    }

    async fn score_group(
        &self,
        requirement: &str,
        group_index: usize,
        group: &[Listing],
    ) -> Vec<MatchResult> {
        let prompt = self.group_prompt(requirement, group);

        let raw = match timeout(self.call_timeout, self.llm.infer(&prompt)).await {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => {
                self.fail_group(group_index, e.to_string());
                return Vec::new();
            }
            Err(_) => {
                self.fail_group(group_index, "inference call timed out".to_string());
                return Vec::new();
            }
        };

        let scores: Vec<GroupScore> = match parse_structured(&raw) {
            Ok(scores) => scores,
            Err(e) => {
                // No well-formed array means "no matches in this group".
                self.fail_group(group_index, e.to_string());
                return Vec::new();
            }
        };

        let mut kept = Vec::new();
        for entry in scores {
            if entry.index < 1 || entry.index > group.len() {
                tracing::debug!(group = group_index, index = entry.index, "index out of bounds");
                continue;
            }
            let score = entry.score.clamp(0.0, 100.0).round() as u8;
            if score < self.score_cutoff {
                continue;
            }
            kept.push(MatchResult {
                listing: group[entry.index - 1].clone(),
                score,
                rationale: entry.reason,
            });
        }

        self.observer.observe(&QueryEvent::ScoreGroupSettled {
            group: group_index,
            candidates: group.len(),
            kept: kept.len(),
        });
        kept
    }

    fn fail_group(&self, group_index: usize, reason: String) {
        tracing::warn!(group = group_index, reason = %reason, "score group failed");
        self.observer.observe(&QueryEvent::ScoreGroupFailed {
            group: group_index,
            reason,
        });
    }

    fn group_prompt(&self, requirement: &str, group: &[Listing]) -> String {
        let mut prompt = format!(
            "You are scoring rental listings against a renter's requirement.\n\
             Requirement: {requirement}\n\nListings:\n"
        );
        for (i, listing) in group.iter().enumerate() {
            let _ = writeln!(
                prompt,
                "{}. [{}] ${}/mo | {}BR | {} | pets: {} | furnished: {} | {}. {}",
                i + 1,
                listing.id,
                listing.price,
                listing.bedrooms,
                listing.neighborhood,
                listing.pet_friendly,
                listing.furnished,
                listing.title,
                listing.description,
            );
        }
        let _ = write!(
            prompt,
            "\nRespond with ONLY a JSON array, one entry per listing that plausibly \
             matches the requirement:\n\
             [{{\"index\": <1-based listing number>, \"score\": <0-100>, \"reason\": \"<one sentence>\"}}]\n\
             Omit listings scoring below {}.",
            self.score_cutoff
        );
        prompt
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::testing::StubInference;
    use crate::types::Result;
    use async_trait::async_trait;
    use regex::Regex;

    fn listings(n: usize) -> Vec<Listing> {
        (0..n)
            .map(|i| Listing {
                id: format!("lst-{i}"),
                title: format!("Listing {i}"),
                price: 1500 + (i as u32) * 10,
                bedrooms: 1 + (i as u8 % 3),
                bathrooms: 1.0,
                neighborhood: "Riverside".to_string(),
                pet_friendly: i % 2 == 0,
                furnished: false,
                description: "Bright unit near transit".to_string(),
                url: None,
            })
            .collect()
    }

    fn candidate_lines(prompt: &str) -> usize {
        let re = Regex::new(r"(?m)^\d+\. \[").unwrap();
        re.find_iter(prompt).count()
    }

    /// Scores every candidate line in the prompt with a deterministic score
    /// derived from its group-local index.
    fn score_all_stub() -> std::sync::Arc<StubInference> {
        StubInference::new(|prompt| {
            let count = {
                let re = Regex::new(r"(?m)^\d+\. \[").unwrap();
                re.find_iter(prompt).count()
            };
            let entries: Vec<String> = (1..=count)
                .map(|i| {
                    format!(
                        r#"{{"index": {i}, "score": {}, "reason": "fits"}}"#,
                        60 + (i * 7) % 41
                    )
                })
                .collect();
            Ok(format!("[{}]", entries.join(",")))
        })
    }

    #[tokio::test]
    async fn partitions_23_candidates_into_5_groups() {
        let stub = score_all_stub();
        let scorer = BatchScorer::new(stub.clone());
        let candidates = listings(23);

        let results = scorer.score("near transit", &candidates, 23).await;

        assert_eq!(stub.call_count(), 5);
        let sizes: Vec<usize> = stub.prompts().iter().map(|p| candidate_lines(p)).collect();
        assert_eq!(sizes, vec![5, 5, 5, 5, 3]);

        assert_eq!(results.len(), 23);
        assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
        assert!(results.iter().all(|r| r.score >= 60));
    }

    #[tokio::test]
    async fn empty_candidate_set_issues_no_calls() {
        let stub = score_all_stub();
        let scorer = BatchScorer::new(stub.clone());
        let results = scorer.score("anything", &[], 10).await;
        assert!(results.is_empty());
        assert_eq!(stub.call_count(), 0);
    }

    #[tokio::test]
    async fn cutoff_and_bounds_are_enforced() {
        let stub = StubInference::fixed(
            r#"[{"index": 1, "score": 95, "reason": "great"},
                {"index": 2, "score": 59, "reason": "below cutoff"},
                {"index": 3, "score": 10, "reason": "poor"},
                {"index": 9, "score": 99, "reason": "out of bounds"}]"#,
        );
        let scorer = BatchScorer::new(stub).with_group_count(1);
        let results = scorer.score("anything", &listings(3), 10).await;

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].score, 95);
        assert_eq!(results[0].listing.id, "lst-0");
    }

    #[tokio::test]
    async fn malformed_group_response_degrades_locally() {
        // Group holding lst-0 answers with prose; the other four groups of
        // two candidates each answer normally.
        let stub = StubInference::new(|prompt| {
            if prompt.contains("[lst-0]") {
                Ok("I could not find anything relevant.".to_string())
            } else {
                Ok(r#"[{"index": 1, "score": 80, "reason": "ok"},
                       {"index": 2, "score": 75, "reason": "ok"}]"#
                    .to_string())
            }
        });
        let scorer = BatchScorer::new(stub.clone());
        let results = scorer.score("anything", &listings(10), 10).await;

        assert_eq!(stub.call_count(), 5);
        assert_eq!(results.len(), 8);
        assert!(!results.iter().any(|r| r.listing.id == "lst-0"));
    }

    #[tokio::test]
    async fn truncates_to_the_result_cap() {
        let scorer = BatchScorer::new(score_all_stub());
        let results = scorer.score("anything", &listings(23), 4).await;
        assert_eq!(results.len(), 4);
    }

    /// Inference stub that hangs forever on prompts naming a chosen listing.
    struct SleepyStub {
        hang_on: String,
    }

    #[async_trait]
    impl InferenceClient for SleepyStub {
        async fn infer(&self, prompt: &str) -> Result<String> {
            if prompt.contains(&self.hang_on) {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }
            Ok(r#"[{"index": 1, "score": 82, "reason": "ok"}]"#.to_string())
        }

        fn model_name(&self) -> &str {
            "sleepy"
        }
    }

    #[tokio::test(start_paused = true)]
    async fn timed_out_group_degrades_like_any_failure() {
        let stub = Arc::new(SleepyStub {
            hang_on: "[lst-0]".to_string(),
        });
        let scorer = BatchScorer::new(stub)
            .with_group_count(5)
            .with_call_timeout(Duration::from_secs(5));
        let results = scorer.score("anything", &listings(5), 10).await;

        // One candidate per group; the hung group contributes nothing.
        assert_eq!(results.len(), 4);
        assert!(!results.iter().any(|r| r.listing.id == "lst-0"));
    }
}
