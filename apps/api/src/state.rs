use std::sync::Arc;

use crate::cache::ReadThroughCache;
use crate::config::Config;
use crate::gmail::GmailClient;
use crate::inbox::registry::ScanRegistry;
use crate::llm_client::LlmClient;
use crate::postings::page::PageFetcher;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub llm: LlmClient,
    pub gmail: GmailClient,
    pub pages: PageFetcher,
    pub config: Config,
    /// Redis when `REDIS_URL` is set, process memory otherwise.
    pub cache: Arc<dyn ReadThroughCache>,
    pub scans: ScanRegistry,
}
