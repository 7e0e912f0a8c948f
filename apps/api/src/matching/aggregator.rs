//! Deduplicating Aggregator — collects scored candidates from concurrent
//! sources into one ranked, duplicate-free result.
//!
//! Identity is the application URL when there is one. Candidates without a URL
//! get a fresh token and never collapse into each other. For a shared key the
//! first offer to arrive wins; later offers are dropped regardless of score.

use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};

use serde::Serialize;
use uuid::Uuid;

use crate::matching::candidate::NormalizedCandidate;
use crate::matching::scorer::MatchOutcome;

/// A normalized candidate together with its score and identity.
///
/// Only constructible from a [`MatchOutcome`], so an unscored candidate can
/// never reach the aggregator.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredCandidate {
    #[serde(flatten)]
    candidate: NormalizedCandidate,
    match_score: u32,
    is_match: bool,
    #[serde(skip)]
    identity_key: String,
}

impl ScoredCandidate {
    pub fn new(candidate: NormalizedCandidate, outcome: MatchOutcome) -> Self {
        let identity_key = identity_key(&candidate);
        Self {
            candidate,
            match_score: outcome.match_score,
            is_match: outcome.is_match,
            identity_key,
        }
    }

    pub fn candidate(&self) -> &NormalizedCandidate {
        &self.candidate
    }

    pub fn match_score(&self) -> u32 {
        self.match_score
    }

    pub fn is_match(&self) -> bool {
        self.is_match
    }

    pub fn identity_key(&self) -> &str {
        &self.identity_key
    }

    pub fn into_candidate(self) -> NormalizedCandidate {
        self.candidate
    }
}

fn identity_key(candidate: &NormalizedCandidate) -> String {
    match candidate.application_url.as_deref() {
        Some(url) if !url.is_empty() => url.to_string(),
        _ => format!("anon:{}", Uuid::new_v4()),
    }
}

/// Finalized, ranked, duplicate-free scan output.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct AggregationResult(Vec<ScoredCandidate>);

impl AggregationResult {
    pub fn as_slice(&self) -> &[ScoredCandidate] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ScoredCandidate> {
        self.0.iter()
    }

    pub fn matched_count(&self) -> usize {
        self.0.iter().filter(|c| c.is_match).count()
    }

    pub fn into_vec(self) -> Vec<ScoredCandidate> {
        self.0
    }
}

impl IntoIterator for AggregationResult {
    type Item = ScoredCandidate;
    type IntoIter = std::vec::IntoIter<ScoredCandidate>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

#[derive(Default)]
struct Entries {
    seen: HashSet<String>,
    ordered: Vec<ScoredCandidate>,
}

/// Shared between the workers of one scan. All mutation goes through `offer`.
#[derive(Default)]
pub struct Aggregator {
    entries: Mutex<Entries>,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts the candidate unless its identity key is already present.
    /// Returns whether it was kept.
    pub fn offer(&self, candidate: ScoredCandidate) -> bool {
        // Poisoning cannot leave entries half-written: both inserts are infallible.
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if !entries.seen.insert(candidate.identity_key.clone()) {
            tracing::debug!("Dropping duplicate candidate {}", candidate.identity_key);
            return false;
        }
        entries.ordered.push(candidate);
        true
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .ordered
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Consumes the aggregator, sorting by descending score. The sort is
    /// stable, so equal scores keep arrival order.
    pub fn finalize(self) -> AggregationResult {
        let mut ordered = self
            .entries
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
            .ordered;
        ordered.sort_by(|a, b| b.match_score.cmp(&a.match_score));
        AggregationResult(ordered)
    }
}
