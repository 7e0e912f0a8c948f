use async_trait::async_trait;
use thiserror::Error;

use crate::matching::candidate::RawCandidate;

/// Why one source produced no candidates. The scanner logs it and moves on.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("upstream call failed: {0}")]
    Upstream(String),

    #[error("malformed extraction payload: {0}")]
    Malformed(String),

    #[error("credentials rejected by upstream")]
    Unauthorized,

    #[error("extraction timed out after {0:?}")]
    Timeout(std::time::Duration),
}

/// An opaque handle to something that can be scanned for jobs (an email, a URL).
pub trait ScanSource: Send + Sync {
    /// Identifier used in logs.
    fn source_id(&self) -> &str;
}

/// Turns one source into zero or more raw candidates. Usually backed by the
/// generative AI API or a page scraper; may fail per call.
#[async_trait]
pub trait CandidateExtractor<S: ScanSource>: Send + Sync {
    async fn extract(&self, source: &S) -> Result<Vec<RawCandidate>, ExtractionError>;
}

#[async_trait]
impl<S, E> CandidateExtractor<S> for std::sync::Arc<E>
where
    S: ScanSource,
    E: CandidateExtractor<S> + ?Sized,
{
    async fn extract(&self, source: &S) -> Result<Vec<RawCandidate>, ExtractionError> {
        self.as_ref().extract(source).await
    }
}
