//! Extractors that turn emails into raw job candidates.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::cache::{content_digest, CacheKey};
use crate::gmail::auth::{with_credential_refresh, CredentialProvider};
use crate::gmail::Mailbox;
use crate::inbox::links::canonical_application_url;
use crate::inbox::prompts::{build_email_prompt, EMAIL_EXTRACT_SYSTEM};
use crate::llm_client::LlmClient;
use crate::matching::{CandidateExtractor, ExtractionError, RawCandidate, ScanSource};

/// An email whose body the caller already has.
#[derive(Debug, Clone, Deserialize)]
pub struct EmailMessage {
    pub id: String,
    pub html: String,
}

impl ScanSource for EmailMessage {
    fn source_id(&self) -> &str {
        &self.id
    }
}

/// The id is chosen by the client, so only the body identifies the content.
impl CacheKey for EmailMessage {
    fn cache_key(&self) -> String {
        format!("email:{}", content_digest(&self.html))
    }
}

/// A message that still has to be fetched from the mailbox.
#[derive(Debug, Clone)]
pub struct InboxMessage {
    /// Mailbox address; message ids are only unique within one mailbox.
    pub account: String,
    pub message_id: String,
}

impl ScanSource for InboxMessage {
    fn source_id(&self) -> &str {
        &self.message_id
    }
}

impl CacheKey for InboxMessage {
    fn cache_key(&self) -> String {
        let account = self.account.trim().to_lowercase();
        format!("inbox:{}:{}", content_digest(&account), self.message_id)
    }
}

#[derive(Debug, Default, Deserialize)]
struct ExtractedJobs {
    #[serde(default)]
    jobs: Vec<RawCandidate>,
}

/// Asks the generative model to find job postings in an email body.
pub struct EmailJobExtractor {
    llm: LlmClient,
}

impl EmailJobExtractor {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl CandidateExtractor<EmailMessage> for EmailJobExtractor {
    async fn extract(&self, source: &EmailMessage) -> Result<Vec<RawCandidate>, ExtractionError> {
        if source.html.trim().is_empty() {
            return Ok(Vec::new());
        }

        let prompt = build_email_prompt(&source.html);
        let extracted: ExtractedJobs = self.llm.call_json(&prompt, EMAIL_EXTRACT_SYSTEM).await?;
        debug!(
            "Email {} yielded {} job candidates",
            source.id,
            extracted.jobs.len()
        );
        Ok(clean_extraction(extracted.jobs))
    }
}

fn clean_extraction(jobs: Vec<RawCandidate>) -> Vec<RawCandidate> {
    jobs.into_iter()
        .map(|mut job| {
            job.application_url = job
                .application_url
                .as_deref()
                .map(str::trim)
                .filter(|url| !url.is_empty())
                .map(canonical_application_url);
            job
        })
        .collect()
}

/// Fetches a message from the mailbox (refreshing credentials once on 401)
/// and hands its body to the email extractor.
pub struct InboxExtractor<M, P, E> {
    mailbox: M,
    credentials: P,
    extractor: E,
}

impl<M, P, E> InboxExtractor<M, P, E> {
    pub fn new(mailbox: M, credentials: P, extractor: E) -> Self {
        Self {
            mailbox,
            credentials,
            extractor,
        }
    }
}

#[async_trait]
impl<M, P, E> CandidateExtractor<InboxMessage> for InboxExtractor<M, P, E>
where
    M: Mailbox,
    P: CredentialProvider,
    E: CandidateExtractor<EmailMessage>,
{
    async fn extract(&self, source: &InboxMessage) -> Result<Vec<RawCandidate>, ExtractionError> {
        let mailbox = &self.mailbox;
        let message_id = source.message_id.as_str();
        let html = with_credential_refresh(&self.credentials, move |token| async move {
            mailbox.message_html(&token, message_id).await
        })
        .await?;

        self.extractor
            .extract(&EmailMessage {
                id: source.message_id.clone(),
                html,
            })
            .await
    }
}
