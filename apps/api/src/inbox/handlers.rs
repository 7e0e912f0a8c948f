use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::cache::CachedExtractor;
use crate::errors::AppError;
use crate::gmail::auth::{
    with_credential_refresh, CredentialProvider, OAuthClientCredentials, RefreshingToken,
    StaticToken,
};
use crate::gmail::{inbox_query, DEFAULT_MESSAGE_LIMIT};
use crate::inbox::extractor::{EmailJobExtractor, EmailMessage, InboxExtractor, InboxMessage};
use crate::matching::{
    normalize, scan, CandidateExtractor, NormalizedCandidate, PreferenceScorer, RawCandidate,
    ScanOutcome, ScanReport, ScanSource, ScanSummary, UserPreferences,
};
use crate::models::job::{JobLead, JobSource};
use crate::state::AppState;

const DEFAULT_INBOX_DAYS: u32 = 2;
const MAX_INBOX_MESSAGES: u32 = 100;

#[derive(Deserialize)]
pub struct ScoreRequest {
    #[serde(default)]
    pub candidates: Vec<RawCandidate>,
    #[serde(default)]
    pub preferences: UserPreferences,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredJob {
    #[serde(flatten)]
    pub candidate: NormalizedCandidate,
    pub match_score: u32,
    pub is_match: bool,
}

#[derive(Serialize)]
pub struct ScoreResponse {
    pub results: Vec<ScoredJob>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailScanRequest {
    pub scan_id: Option<Uuid>,
    #[serde(default)]
    pub emails: Vec<EmailMessage>,
    #[serde(default)]
    pub preferences: UserPreferences,
    pub batch_width: Option<usize>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboxScanRequest {
    pub scan_id: Option<Uuid>,
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub days: Option<u32>,
    pub limit: Option<u32>,
    #[serde(default)]
    pub preferences: UserPreferences,
    pub batch_width: Option<usize>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanResponse {
    pub scan_id: Uuid,
    pub outcome: ScanOutcome,
    pub total_sources: usize,
    pub sources_scanned: usize,
    pub failed_sources: usize,
    pub summary: ScanSummary,
    pub leads: Vec<JobLead>,
}

impl ScanResponse {
    pub fn from_report(
        scan_id: Uuid,
        report: ScanReport,
        source_of: impl Fn(&NormalizedCandidate) -> JobSource,
    ) -> Self {
        let summary = report.summary();
        Self {
            scan_id,
            outcome: report.outcome,
            total_sources: report.total_sources,
            sources_scanned: report.sources_scanned,
            failed_sources: report.failed_sources,
            summary,
            leads: report
                .candidates
                .into_iter()
                .map(|scored| {
                    let source = source_of(scored.candidate());
                    JobLead::from_scored(scored, source)
                })
                .collect(),
        }
    }
}

/// POST /api/v1/jobs/score
pub async fn handle_score(Json(req): Json<ScoreRequest>) -> Json<ScoreResponse> {
    let scorer = PreferenceScorer::new(&req.preferences);
    let results = req
        .candidates
        .into_iter()
        .map(|raw| {
            let candidate = normalize(raw);
            let outcome = scorer.score(&candidate);
            ScoredJob {
                candidate,
                match_score: outcome.match_score,
                is_match: outcome.is_match,
            }
        })
        .collect();
    Json(ScoreResponse { results })
}

/// POST /api/v1/scans
pub async fn handle_scan_emails(
    State(state): State<AppState>,
    Json(req): Json<EmailScanRequest>,
) -> Result<Json<ScanResponse>, AppError> {
    let extractor = CachedExtractor::new(
        EmailJobExtractor::new(state.llm.clone()),
        state.cache.clone(),
    );
    let response = run_scan(
        &state,
        req.scan_id,
        &req.emails,
        &extractor,
        &req.preferences,
        req.batch_width,
        |_| JobSource::Gmail,
    )
    .await?;
    Ok(Json(response))
}

/// POST /api/v1/scans/inbox
pub async fn handle_scan_inbox(
    State(state): State<AppState>,
    Json(req): Json<InboxScanRequest>,
) -> Result<Json<ScanResponse>, AppError> {
    if req.access_token.trim().is_empty() {
        return Err(AppError::Validation("accessToken is required".to_string()));
    }

    let credentials = inbox_credentials(&state, &req)?;
    let query = inbox_query(req.days.unwrap_or(DEFAULT_INBOX_DAYS));
    let limit = req
        .limit
        .unwrap_or(DEFAULT_MESSAGE_LIMIT)
        .clamp(1, MAX_INBOX_MESSAGES);

    let gmail = &state.gmail;
    let account = with_credential_refresh(&credentials, move |token| async move {
        gmail.account_email(&token).await
    })
    .await?;

    let query_ref = query.as_str();
    let messages = with_credential_refresh(&credentials, move |token| async move {
        gmail.list_messages(&token, query_ref, limit).await
    })
    .await?;
    info!("Inbox query '{}' matched {} messages", query, messages.len());

    let sources: Vec<InboxMessage> = messages
        .into_iter()
        .map(|m| InboxMessage {
            account: account.clone(),
            message_id: m.id,
        })
        .collect();

    let extractor = CachedExtractor::new(
        InboxExtractor::new(
            state.gmail.clone(),
            credentials,
            EmailJobExtractor::new(state.llm.clone()),
        ),
        state.cache.clone(),
    );
    let response = run_scan(
        &state,
        req.scan_id,
        &sources,
        &extractor,
        &req.preferences,
        req.batch_width,
        |_| JobSource::Gmail,
    )
    .await?;
    Ok(Json(response))
}

/// POST /api/v1/scans/:id/cancel
pub async fn handle_cancel_scan(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if state.scans.cancel(id) {
        info!("Cancellation requested for scan {}", id);
        Ok(StatusCode::ACCEPTED)
    } else {
        Err(AppError::NotFound(format!("Scan {id} is not running")))
    }
}

/// A refresh token is only usable when the server holds OAuth client credentials.
fn inbox_credentials(
    state: &AppState,
    req: &InboxScanRequest,
) -> Result<Arc<dyn CredentialProvider>, AppError> {
    let oauth = match (
        &state.config.google_client_id,
        &state.config.google_client_secret,
    ) {
        (Some(client_id), Some(client_secret)) => Some(OAuthClientCredentials {
            client_id: client_id.clone(),
            client_secret: client_secret.clone(),
        }),
        _ => None,
    };

    match (oauth, req.refresh_token.as_deref().filter(|t| !t.trim().is_empty())) {
        (Some(oauth), Some(refresh_token)) => Ok(Arc::new(RefreshingToken::new(
            oauth,
            &req.access_token,
            refresh_token.trim().to_string(),
        )?)),
        _ => Ok(Arc::new(StaticToken::new(&req.access_token))),
    }
}

/// Registers the scan, runs it, and turns the report into leads.
/// `source_of` decides which board each lead is attributed to.
pub(crate) async fn run_scan<S, E>(
    state: &AppState,
    scan_id: Option<Uuid>,
    sources: &[S],
    extractor: &E,
    preferences: &UserPreferences,
    batch_width: Option<usize>,
    source_of: impl Fn(&NormalizedCandidate) -> JobSource,
) -> Result<ScanResponse, AppError>
where
    S: ScanSource,
    E: CandidateExtractor<S>,
{
    let scan_id = scan_id.unwrap_or_else(Uuid::new_v4);
    let guard = state
        .scans
        .register(scan_id)
        .ok_or_else(|| AppError::Conflict(format!("Scan {scan_id} is already running")))?;

    let options = state.config.scan_options(batch_width);
    let report = scan(sources, extractor, preferences, &options, guard.signal()).await;
    info!("Scan {} finished: {}", scan_id, report.summary().message);

    Ok(ScanResponse::from_report(guard.id(), report, source_of))
}
