//! Match Scorer — fit of one normalized candidate against one set of preferences.
//!
//! Scoring rules:
//! 1. role axis: no target roles → +50; otherwise +50 when the title contains a
//!    target role as a whole word or phrase.
//! 2. location axis: no target locations → +50; otherwise +50 when the location
//!    contains a target location as a plain substring.
//! 3. remote only: "remote" in location or title → +10, else the location axis
//!    is vetoed (its points stay, the match does not).
//! 4. is_match = role axis && location axis.
//!
//! The score is not clamped: the remote bonus can take it to 110.

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::matching::candidate::NormalizedCandidate;
use crate::matching::preferences::UserPreferences;

pub const AXIS_POINTS: u32 = 50;
pub const REMOTE_BONUS: u32 = 10;
pub const MAX_SCORE: u32 = 2 * AXIS_POINTS + REMOTE_BONUS;

const REMOTE_MARKER: &str = "remote";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchOutcome {
    pub match_score: u32,
    pub is_match: bool,
}

/// Scorer with role patterns compiled once per set of preferences.
pub struct PreferenceScorer {
    role_patterns: Vec<RolePattern>,
    target_locations: Vec<String>,
    remote_only: bool,
}

enum RolePattern {
    Word(Regex),
    // Only reachable if a role blows the regex size limit.
    Substring(String),
}

impl RolePattern {
    fn compile(role: &str) -> Self {
        let lowered = role.to_lowercase();
        // ASCII word characters, same boundary set as a `\W` check in a browser
        let pattern = format!(
            r"(?i)(?:^|[^A-Za-z0-9_]){}(?:$|[^A-Za-z0-9_])",
            regex::escape(&lowered)
        );
        match Regex::new(&pattern) {
            Ok(re) => RolePattern::Word(re),
            Err(e) => {
                tracing::warn!("Role pattern for '{role}' failed to compile ({e}); using substring match");
                RolePattern::Substring(lowered)
            }
        }
    }

    fn is_match(&self, title: &str) -> bool {
        match self {
            RolePattern::Word(re) => re.is_match(title),
            RolePattern::Substring(s) => title.contains(s.as_str()),
        }
    }
}

impl PreferenceScorer {
    pub fn new(preferences: &UserPreferences) -> Self {
        Self {
            role_patterns: preferences
                .target_roles()
                .iter()
                .map(|r| RolePattern::compile(r))
                .collect(),
            target_locations: preferences
                .target_locations()
                .iter()
                .map(|l| l.to_lowercase())
                .collect(),
            remote_only: preferences.remote_only(),
        }
    }

    pub fn score(&self, candidate: &NormalizedCandidate) -> MatchOutcome {
        let title = candidate.title.to_lowercase();
        let location = candidate.location.to_lowercase();
        let mut score = 0;

        let role_ok = self.role_patterns.is_empty()
            || self.role_patterns.iter().any(|p| p.is_match(&title));
        if role_ok {
            score += AXIS_POINTS;
        }

        let mut location_ok = self.target_locations.is_empty()
            || self
                .target_locations
                .iter()
                .any(|l| location.contains(l.as_str()));
        if location_ok {
            score += AXIS_POINTS;
        }

        if self.remote_only {
            if location.contains(REMOTE_MARKER) || title.contains(REMOTE_MARKER) {
                score += REMOTE_BONUS;
            } else {
                location_ok = false;
            }
        }

        MatchOutcome {
            match_score: score,
            is_match: role_ok && location_ok,
        }
    }
}

/// Standalone scoring entry point, e.g. for re-scoring after preferences change.
pub fn score(candidate: &NormalizedCandidate, preferences: &UserPreferences) -> MatchOutcome {
    PreferenceScorer::new(preferences).score(candidate)
}
