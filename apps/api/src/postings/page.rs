//! Fetching posting pages and reading fields out of their markup.
//!
//! `scraper::Html` is not `Send`, so every parse happens inside a plain
//! function and only owned strings cross an await point.

use std::time::Duration;

use reqwest::{header, Client};
use scraper::{Html, Selector};
use tracing::debug;
use url::Url;

use crate::matching::RawCandidate;

pub const PAGE_TIMEOUT: Duration = Duration::from_secs(15);

/// Pages shorter than this are login walls or bot checks, not postings.
pub const MIN_PAGE_CHARS: usize = 2_000;

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

const SKIPPED_ELEMENTS: [&str; 5] = ["script", "style", "nav", "footer", "header"];

/// Job boards with markup we know how to read directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Board {
    LinkedIn,
    Indeed,
    Other,
}

impl Board {
    pub fn for_url(url: &str) -> Self {
        let host = Url::parse(url.trim())
            .ok()
            .and_then(|u| u.host_str().map(str::to_lowercase))
            .unwrap_or_default();
        if host == "linkedin.com" || host.ends_with(".linkedin.com") {
            Board::LinkedIn
        } else if host.split('.').any(|label| label == "indeed") {
            Board::Indeed
        } else {
            Board::Other
        }
    }

    /// CSS selectors for title, company, location and description.
    fn selectors(self) -> Option<[&'static str; 4]> {
        match self {
            Board::LinkedIn => Some([
                "h1",
                "a.topcard__org-name-link",
                "span.topcard__flavor--bullet",
                "div.show-more-less-html__markup",
            ]),
            Board::Indeed => Some([
                "h1",
                "div[data-company-name]",
                "div[data-testid='job-location']",
                "#jobDescriptionText",
            ]),
            Board::Other => None,
        }
    }
}

/// The address actually fetched for a posting. Indeed search results carry
/// the job key in `jk`; the standalone view page is far easier to read.
pub fn fetch_url(url: &str) -> String {
    let trimmed = url.trim();
    if Board::for_url(trimmed) != Board::Indeed {
        return trimmed.to_string();
    }
    let job_key = Url::parse(trimmed).ok().and_then(|u| {
        u.query_pairs()
            .find(|(key, _)| key == "jk")
            .map(|(_, value)| value.into_owned())
    });
    match job_key {
        Some(jk) if !jk.is_empty() => format!("https://www.indeed.com/viewjob?jk={jk}"),
        _ => trimmed.to_string(),
    }
}

#[derive(Clone)]
pub struct PageFetcher {
    client: Client,
}

impl PageFetcher {
    pub fn new() -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: Client::builder()
                .timeout(PAGE_TIMEOUT)
                .user_agent(BROWSER_USER_AGENT)
                .build()?,
        })
    }

    /// Body of the page, or `None` when it could not be loaded.
    pub async fn fetch(&self, url: &str) -> Option<String> {
        let response = self
            .client
            .get(url)
            .header(header::ACCEPT_LANGUAGE, "en-US,en;q=0.9")
            .header(
                header::ACCEPT,
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            )
            .send()
            .await;

        match response {
            Ok(r) if r.status().is_success() => r.text().await.ok(),
            Ok(r) => {
                debug!("Page {} answered {}", url, r.status());
                None
            }
            Err(e) => {
                debug!("Page {} could not be fetched: {}", url, e);
                None
            }
        }
    }
}

/// Reads a posting with the board's own selectors. `None` when the board is
/// unknown or the page has no title where the board puts it.
pub fn board_candidate(html: &str, board: Board) -> Option<RawCandidate> {
    let [title, company, location, description] = board.selectors()?;
    let document = Html::parse_document(html);

    let title = first_text(&document, title)?;
    Some(RawCandidate {
        title: Some(title),
        company: first_text(&document, company),
        location: first_text(&document, location),
        description: first_text(&document, description),
        ..Default::default()
    })
}

/// Visible text of the page body with page chrome removed and whitespace
/// collapsed.
pub fn page_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let Some(body) = Selector::parse("body")
        .ok()
        .and_then(|s| document.select(&s).next())
    else {
        return String::new();
    };

    let mut text = String::new();
    for node in body.descendants() {
        let Some(fragment) = node.value().as_text() else {
            continue;
        };
        let skipped = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|e| SKIPPED_ELEMENTS.contains(&e.name()))
        });
        if !skipped {
            text.push(' ');
            text.push_str(fragment);
        }
    }
    collapse_whitespace(&text)
}

fn first_text(document: &Html, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    let element = document.select(&selector).next()?;
    let text = collapse_whitespace(&element.text().collect::<String>());
    (!text.is_empty()).then_some(text)
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const LINKEDIN_PAGE: &str = r#"<html><body>
        <h1>  Senior Rust
            Engineer </h1>
        <a class="topcard__org-name-link" href="/company/acme">Acme</a>
        <span class="topcard__flavor--bullet">Berlin, Germany</span>
        <div class="show-more-less-html__markup"><p>Build things.</p><p>Ship them.</p></div>
    </body></html>"#;

    #[test]
    fn test_board_for_url() {
        assert_eq!(
            Board::for_url("https://www.linkedin.com/jobs/view/123"),
            Board::LinkedIn
        );
        assert_eq!(Board::for_url("https://de.indeed.com/viewjob?jk=1"), Board::Indeed);
        assert_eq!(Board::for_url("https://notlinkedin.com/jobs"), Board::Other);
        assert_eq!(Board::for_url("not a url"), Board::Other);
    }

    #[test]
    fn test_indeed_links_fetch_the_view_page() {
        assert_eq!(
            fetch_url("https://www.indeed.com/jobs?q=rust&jk=abc123&from=serp"),
            "https://www.indeed.com/viewjob?jk=abc123"
        );
        assert_eq!(
            fetch_url("https://www.indeed.com/cmp/acme"),
            "https://www.indeed.com/cmp/acme"
        );
        assert_eq!(
            fetch_url(" https://jobs.example/1?jk=x "),
            "https://jobs.example/1?jk=x"
        );
    }

    #[test]
    fn test_linkedin_markup_is_read_with_board_selectors() {
        let candidate = board_candidate(LINKEDIN_PAGE, Board::LinkedIn).unwrap();
        assert_eq!(candidate.title.as_deref(), Some("Senior Rust Engineer"));
        assert_eq!(candidate.company.as_deref(), Some("Acme"));
        assert_eq!(candidate.location.as_deref(), Some("Berlin, Germany"));
        assert_eq!(candidate.description.as_deref(), Some("Build things.Ship them."));
        assert!(candidate.application_url.is_none());
    }

    #[test]
    fn test_indeed_markup_is_read_with_board_selectors() {
        let html = r#"<html><body>
            <h1>Accountant</h1>
            <div data-company-name="true">Ledger GmbH</div>
            <div data-testid="job-location">Hamburg</div>
            <div id="jobDescriptionText">Keep the books.</div>
        </body></html>"#;
        let candidate = board_candidate(html, Board::Indeed).unwrap();
        assert_eq!(candidate.title.as_deref(), Some("Accountant"));
        assert_eq!(candidate.company.as_deref(), Some("Ledger GmbH"));
        assert_eq!(candidate.location.as_deref(), Some("Hamburg"));
        assert_eq!(candidate.description.as_deref(), Some("Keep the books."));
    }

    #[test]
    fn test_board_candidate_needs_a_title() {
        assert!(board_candidate("<html><body><p>Sign in</p></body></html>", Board::LinkedIn)
            .is_none());
        assert!(board_candidate(LINKEDIN_PAGE, Board::Other).is_none());
    }

    #[test]
    fn test_page_text_skips_chrome_and_scripts() {
        let html = r#"<html><head><title>t</title></head><body>
            <header>Site header</header>
            <nav>Home | Jobs</nav>
            <script>var tracking = 1;</script>
            <style>.x { color: red }</style>
            <main><h2>Rust   Engineer</h2>
            <p>Acme is hiring
            in Berlin.</p></main>
            <footer>Imprint</footer>
        </body></html>"#;
        assert_eq!(page_text(html), "Rust Engineer Acme is hiring in Berlin.");
    }
}
