use url::Url;

const TRACKING_PARAMS: [&str; 3] = ["utm_source", "utm_medium", "utm_campaign"];

/// Drops campaign tracking parameters from an application link so the same
/// posting mailed through different campaigns shares one URL. Input that does
/// not parse as a URL is returned unchanged.
pub fn canonical_application_url(raw: &str) -> String {
    let Ok(mut url) = Url::parse(raw.trim()) else {
        return raw.to_string();
    };

    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !TRACKING_PARAMS.contains(&key.as_ref()))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    if kept.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(kept);
    }
    url.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_utm_parameters() {
        assert_eq!(
            canonical_application_url(
                "https://jobs.example/view?id=42&utm_source=mail&utm_medium=email&utm_campaign=x"
            ),
            "https://jobs.example/view?id=42"
        );
    }

    #[test]
    fn test_removes_empty_query() {
        assert_eq!(
            canonical_application_url("https://jobs.example/view?utm_source=mail"),
            "https://jobs.example/view"
        );
    }

    #[test]
    fn test_keeps_other_parameters_and_fragment() {
        assert_eq!(
            canonical_application_url("https://www.indeed.com/viewjob?jk=abc123#apply"),
            "https://www.indeed.com/viewjob?jk=abc123#apply"
        );
    }

    #[test]
    fn test_unparseable_input_is_unchanged() {
        assert_eq!(canonical_application_url("#"), "#");
        assert_eq!(canonical_application_url("not a url"), "not a url");
    }
}
