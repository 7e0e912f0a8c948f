//! Candidate Normalizer — turns loosely-shaped extraction output into a fully
//! defaulted candidate so nothing downstream branches on field presence.

use serde::{Deserialize, Deserializer, Serialize};

pub const DEFAULT_TITLE: &str = "Unknown Role";
pub const DEFAULT_COMPANY: &str = "Unknown Company";
pub const DEFAULT_LOCATION: &str = "Remote";

/// Untrusted, partially-populated job record as produced by an extractor.
///
/// Unknown fields (`matchScore`, `fitReason`, ...) are ignored on purpose: the
/// only score that counts is the one computed by the scorer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCandidate {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub application_url: Option<String>,
    #[serde(default)]
    pub salary_range: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "deserialize_requirements")]
    pub requirements: Option<Vec<String>>,
}

/// A candidate with every field resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedCandidate {
    pub title: String,
    pub company: String,
    pub location: String,
    pub application_url: Option<String>,
    pub salary_range: Option<String>,
    pub description: String,
    pub requirements: Vec<String>,
}

impl From<RawCandidate> for NormalizedCandidate {
    fn from(raw: RawCandidate) -> Self {
        normalize(raw)
    }
}

/// Normalizes a raw candidate. Total over every input, including the empty one.
///
/// Empty strings count as absent. The application URL is never synthesized.
pub fn normalize(raw: RawCandidate) -> NormalizedCandidate {
    NormalizedCandidate {
        title: non_empty(raw.title).unwrap_or_else(|| DEFAULT_TITLE.to_string()),
        company: non_empty(raw.company).unwrap_or_else(|| DEFAULT_COMPANY.to_string()),
        location: non_empty(raw.location).unwrap_or_else(|| DEFAULT_LOCATION.to_string()),
        application_url: non_empty(raw.application_url),
        salary_range: non_empty(raw.salary_range),
        description: raw.description.unwrap_or_default(),
        requirements: raw.requirements.unwrap_or_default(),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RequirementsField {
    List(Vec<Option<String>>),
    Text(String),
}

/// Accepts `["a", "b"]`, a newline/bullet separated string, or null.
fn deserialize_requirements<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let field = Option::<RequirementsField>::deserialize(deserializer)?;
    Ok(field.map(|f| match f {
        RequirementsField::List(items) => items
            .into_iter()
            .flatten()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        RequirementsField::Text(text) => split_requirement_text(&text),
    }))
}

fn split_requirement_text(text: &str) -> Vec<String> {
    text.lines()
        .map(|line| {
            line.trim()
                .trim_start_matches(['-', '*', '•'])
                .trim()
                .to_string()
        })
        .filter(|line| !line.is_empty())
        .collect()
}
