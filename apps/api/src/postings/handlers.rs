use axum::{extract::State, Json};
use serde::Deserialize;
use url::Url;
use uuid::Uuid;

use crate::cache::CachedExtractor;
use crate::errors::AppError;
use crate::inbox::handlers::{run_scan, ScanResponse};
use crate::matching::{NormalizedCandidate, UserPreferences};
use crate::models::job::JobSource;
use crate::postings::extractor::{JobUrl, UrlJobExtractor};
use crate::state::AppState;

const MAX_LINKS: usize = 50;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkScanRequest {
    pub scan_id: Option<Uuid>,
    #[serde(default)]
    pub urls: Vec<String>,
    #[serde(default)]
    pub preferences: UserPreferences,
    pub batch_width: Option<usize>,
}

/// POST /api/v1/scans/links
pub async fn handle_scan_links(
    State(state): State<AppState>,
    Json(req): Json<LinkScanRequest>,
) -> Result<Json<ScanResponse>, AppError> {
    let sources = job_urls(&req.urls)?;

    let extractor = CachedExtractor::new(
        UrlJobExtractor::new(state.llm.clone(), state.pages.clone()),
        state.cache.clone(),
    );
    let response = run_scan(
        &state,
        req.scan_id,
        &sources,
        &extractor,
        &req.preferences,
        req.batch_width,
        lead_source,
    )
    .await?;
    Ok(Json(response))
}

/// Blank entries are skipped; anything else must be an http(s) URL.
fn job_urls(urls: &[String]) -> Result<Vec<JobUrl>, AppError> {
    let urls: Vec<&str> = urls
        .iter()
        .map(|u| u.trim())
        .filter(|u| !u.is_empty())
        .collect();
    if urls.len() > MAX_LINKS {
        return Err(AppError::Validation(format!(
            "At most {MAX_LINKS} links can be scanned at once"
        )));
    }

    urls.into_iter()
        .map(|raw| match Url::parse(raw) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(JobUrl {
                url: raw.to_string(),
            }),
            _ => Err(AppError::Validation(format!("Not a web link: {raw}"))),
        })
        .collect()
}

fn lead_source(candidate: &NormalizedCandidate) -> JobSource {
    candidate
        .application_url
        .as_deref()
        .map(JobSource::for_url)
        .unwrap_or(JobSource::ImportedLink)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::{normalize, RawCandidate};

    #[test]
    fn test_job_urls_skips_blanks_and_trims() {
        let urls = vec![
            " https://jobs.example/1 ".to_string(),
            "".to_string(),
            "   ".to_string(),
            "http://jobs.example/2".to_string(),
        ];
        let sources = job_urls(&urls).unwrap();
        let found: Vec<&str> = sources.iter().map(|s| s.url.as_str()).collect();
        assert_eq!(found, ["https://jobs.example/1", "http://jobs.example/2"]);
    }

    #[test]
    fn test_job_urls_rejects_non_web_links() {
        for bad in ["ftp://jobs.example/1", "jobs.example/1", "mailto:hr@acme.example"] {
            let result = job_urls(&[bad.to_string()]);
            assert!(matches!(result, Err(AppError::Validation(_))), "{bad}");
        }
    }

    #[test]
    fn test_job_urls_caps_batch_size() {
        let urls: Vec<String> = (0..=MAX_LINKS)
            .map(|i| format!("https://jobs.example/{i}"))
            .collect();
        assert!(matches!(job_urls(&urls), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_leads_are_attributed_to_their_board() {
        let lead = |url: Option<&str>| {
            lead_source(&normalize(RawCandidate {
                application_url: url.map(str::to_string),
                ..Default::default()
            }))
        };
        assert_eq!(
            lead(Some("https://www.linkedin.com/jobs/view/1")),
            JobSource::LinkedIn
        );
        assert_eq!(
            lead(Some("https://www.indeed.com/viewjob?jk=1")),
            JobSource::Indeed
        );
        assert_eq!(lead(Some("https://jobs.example/1")), JobSource::ImportedLink);
        assert_eq!(lead(None), JobSource::ImportedLink);
    }
}
