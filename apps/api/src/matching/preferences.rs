use serde::{Deserialize, Deserializer, Serialize};

/// User-declared preferences for one scoring run.
///
/// Roles and locations are stored trimmed and lowercased, without blanks or
/// duplicates, so matching is case-insensitive. An empty list means "no filter
/// on this axis".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPreferences {
    #[serde(default, deserialize_with = "deserialize_terms")]
    target_roles: Vec<String>,
    #[serde(default, deserialize_with = "deserialize_terms")]
    target_locations: Vec<String>,
    #[serde(default, deserialize_with = "deserialize_flag")]
    remote_only: bool,
}

impl UserPreferences {
    pub fn new<R, L>(target_roles: R, target_locations: L, remote_only: bool) -> Self
    where
        R: IntoIterator,
        R::Item: AsRef<str>,
        L: IntoIterator,
        L::Item: AsRef<str>,
    {
        Self {
            target_roles: canonical_terms(target_roles),
            target_locations: canonical_terms(target_locations),
            remote_only,
        }
    }

    pub fn target_roles(&self) -> &[String] {
        &self.target_roles
    }

    pub fn target_locations(&self) -> &[String] {
        &self.target_locations
    }

    pub fn remote_only(&self) -> bool {
        self.remote_only
    }
}

/// Parses the comma-separated form used by the settings screen: `"rust, go,,"`.
pub fn parse_list(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn canonical_terms<I>(terms: I) -> Vec<String>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for term in terms {
        let term = term.as_ref().trim().to_lowercase();
        if !term.is_empty() && !out.contains(&term) {
            out.push(term);
        }
    }
    out
}

// Stored profiles are not always well-formed: a non-array value is treated as
// an empty list rather than rejecting the whole profile.
fn deserialize_terms<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    let terms = match value {
        serde_json::Value::Array(items) => items
            .into_iter()
            .filter_map(|item| item.as_str().map(String::from))
            .collect::<Vec<_>>(),
        _ => Vec::new(),
    };
    Ok(canonical_terms(terms))
}

fn deserialize_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Bool(b) => b,
        serde_json::Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        serde_json::Value::String(s) => !s.is_empty(),
        _ => false,
    })
}
