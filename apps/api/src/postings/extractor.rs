use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};

use crate::cache::{content_digest, CacheKey};
use crate::inbox::links::canonical_application_url;
use crate::llm_client::LlmClient;
use crate::matching::{CandidateExtractor, ExtractionError, RawCandidate, ScanSource};
use crate::postings::page::{
    board_candidate, fetch_url, page_text, Board, PageFetcher, MIN_PAGE_CHARS,
};
use crate::postings::prompts::{build_page_prompt, PAGE_EXTRACT_SYSTEM};

/// A posting the user pasted a link to.
#[derive(Debug, Clone, Deserialize)]
pub struct JobUrl {
    pub url: String,
}

impl ScanSource for JobUrl {
    fn source_id(&self) -> &str {
        &self.url
    }
}

/// Public pages look the same to every user, so the URL is the content key.
impl CacheKey for JobUrl {
    fn cache_key(&self) -> String {
        format!("url:{}", content_digest(self.url.trim()))
    }
}

/// Reads one posting per link: board selectors where the board is known,
/// otherwise the page text goes to the model. Unreadable pages still yield a
/// placeholder candidate that points back at the link.
pub struct UrlJobExtractor {
    llm: LlmClient,
    pages: PageFetcher,
}

impl UrlJobExtractor {
    pub fn new(llm: LlmClient, pages: PageFetcher) -> Self {
        Self { llm, pages }
    }
}

#[async_trait]
impl CandidateExtractor<JobUrl> for UrlJobExtractor {
    async fn extract(&self, source: &JobUrl) -> Result<Vec<RawCandidate>, ExtractionError> {
        let target = fetch_url(&source.url);
        let application_url = canonical_application_url(&target);

        let html = match self.pages.fetch(&target).await {
            Some(html) if html.len() >= MIN_PAGE_CHARS => html,
            _ => {
                info!("Could not read {}, returning a placeholder", target);
                return Ok(vec![placeholder_candidate(&application_url)]);
            }
        };

        if let Some(mut candidate) = board_candidate(&html, Board::for_url(&target)) {
            debug!("Read {} with board selectors", target);
            candidate.application_url = Some(application_url);
            return Ok(vec![candidate]);
        }

        let text = page_text(&html);
        let prompt = build_page_prompt(&target, &text);
        let mut candidate: RawCandidate = self.llm.call_json(&prompt, PAGE_EXTRACT_SYSTEM).await?;
        candidate.application_url = Some(application_url);
        Ok(vec![candidate])
    }
}

/// Stand-in for a page that could not be read, with search links the user
/// can follow instead.
pub fn placeholder_candidate(url: &str) -> RawCandidate {
    let query: String = url::form_urlencoded::byte_serialize(url.as_bytes()).collect();
    let description = format!(
        "We could not extract this job automatically. Search for it on \
         Google (https://www.google.com/search?q={query}), \
         Indeed (https://www.indeed.com/jobs?q={query}) or \
         LinkedIn (https://www.linkedin.com/jobs/search/?keywords={query})."
    );
    RawCandidate {
        location: Some("Unknown".to_string()),
        application_url: Some(url.to_string()),
        description: Some(description),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::DEFAULT_MODEL;
    use crate::matching::normalize;
    use axum::{routing::get, Router};

    async fn spawn_page(body: &'static str) -> String {
        let app = Router::new().route(
            "/job",
            get(move || async move { axum::response::Html(body) }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/job")
    }

    fn extractor() -> UrlJobExtractor {
        UrlJobExtractor::new(
            LlmClient::new("test-key".to_string(), DEFAULT_MODEL.to_string()).unwrap(),
            PageFetcher::new().unwrap(),
        )
    }

    #[test]
    fn test_placeholder_keeps_link_and_defaults() {
        let raw = placeholder_candidate("https://jobs.example/view?id=1");
        assert_eq!(raw.application_url.as_deref(), Some("https://jobs.example/view?id=1"));
        let description = raw.description.clone().unwrap();
        assert!(description.starts_with("We could not extract this job automatically."));
        assert!(description.contains("https%3A%2F%2Fjobs.example%2Fview%3Fid%3D1"));

        let candidate = normalize(raw);
        assert_eq!(candidate.title, "Unknown Role");
        assert_eq!(candidate.company, "Unknown Company");
        assert_eq!(candidate.location, "Unknown");
    }

    #[test]
    fn test_url_cache_key_ignores_surrounding_whitespace() {
        let a = JobUrl { url: "https://jobs.example/1".to_string() };
        let b = JobUrl { url: " https://jobs.example/1\n".to_string() };
        let c = JobUrl { url: "https://jobs.example/2".to_string() };
        assert_eq!(a.cache_key(), b.cache_key());
        assert_ne!(a.cache_key(), c.cache_key());
    }

    #[tokio::test]
    async fn test_short_page_yields_placeholder_for_the_link() {
        let url = spawn_page("<html><body>Please sign in</body></html>").await;
        let jobs = extractor()
            .extract(&JobUrl { url: url.clone() })
            .await
            .unwrap();

        assert_eq!(jobs.len(), 1);
        assert!(jobs[0].title.is_none());
        assert_eq!(jobs[0].application_url.as_deref(), Some(url.as_str()));
    }

    #[tokio::test]
    async fn test_unreachable_page_yields_placeholder() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/gone", listener.local_addr().unwrap());
        drop(listener);

        let jobs = extractor().extract(&JobUrl { url: url.clone() }).await.unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].location.as_deref(), Some("Unknown"));
        assert_eq!(jobs[0].application_url.as_deref(), Some(url.as_str()));
    }
}
