//! Scan orchestration — fans sources out in bounded chunks, scores what they
//! yield and aggregates the result.
//!
//! Each chunk runs all of its sources concurrently and is awaited as a whole
//! before the next chunk starts. A failing source counts as zero candidates.
//! Cancellation is checked between chunks and before each source starts;
//! sources already in flight are allowed to finish.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::matching::aggregator::{AggregationResult, Aggregator, ScoredCandidate};
use crate::matching::candidate::normalize;
use crate::matching::extract::{CandidateExtractor, ExtractionError, ScanSource};
use crate::matching::preferences::UserPreferences;
use crate::matching::scorer::PreferenceScorer;

pub const DEFAULT_BATCH_WIDTH: usize = 4;
pub const DEFAULT_CHUNK_PAUSE: Duration = Duration::from_millis(50);

const FAILURE_NOTICE: &str = "Some sources could not be analyzed.";

/// Cooperative stop signal shared between a scan and whoever may stop it.
#[derive(Debug, Clone, Default)]
pub struct CancelSignal(Arc<AtomicBool>);

impl CancelSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Sources per chunk. Zero is treated as one.
    pub width: usize,
    /// Pause between chunks to stay under upstream rate limits.
    pub chunk_pause: Duration,
    /// Upper bound for a single extraction call.
    pub unit_timeout: Option<Duration>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            width: DEFAULT_BATCH_WIDTH,
            chunk_pause: DEFAULT_CHUNK_PAUSE,
            unit_timeout: None,
        }
    }
}

impl ScanOptions {
    pub fn with_width(width: usize) -> Self {
        Self {
            width,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanOutcome {
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanReport {
    pub candidates: AggregationResult,
    pub total_sources: usize,
    pub sources_scanned: usize,
    pub failed_sources: usize,
    pub outcome: ScanOutcome,
}

/// What the host shows the user: counts and a generic notice, no internals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanSummary {
    pub discovered: usize,
    pub matched: usize,
    pub message: String,
    pub notice: Option<String>,
}

impl ScanReport {
    pub fn is_cancelled(&self) -> bool {
        self.outcome == ScanOutcome::Cancelled
    }

    pub fn summary(&self) -> ScanSummary {
        let discovered = self.candidates.len();
        let matched = self.candidates.matched_count();
        let message = match self.outcome {
            ScanOutcome::Completed => {
                format!("Completed: {discovered} found ({matched} matching)")
            }
            ScanOutcome::Cancelled => {
                format!("Cancelled: {discovered} found so far ({matched} matching)")
            }
        };
        ScanSummary {
            discovered,
            matched,
            message,
            notice: (self.failed_sources > 0).then(|| FAILURE_NOTICE.to_string()),
        }
    }
}

enum UnitOutcome {
    Extracted { offered: usize, kept: usize },
    Failed,
    Skipped,
}

/// Scans every source, scoring candidates against `preferences`.
pub async fn scan<S, E>(
    sources: &[S],
    extractor: &E,
    preferences: &UserPreferences,
    options: &ScanOptions,
    cancel: &CancelSignal,
) -> ScanReport
where
    S: ScanSource,
    E: CandidateExtractor<S> + ?Sized,
{
    let width = options.width.max(1);
    let total_sources = sources.len();
    let total_chunks = total_sources.div_ceil(width);
    let scorer = PreferenceScorer::new(preferences);
    let aggregator = Aggregator::new();

    let mut sources_scanned = 0;
    let mut failed_sources = 0;

    info!(
        "Scanning {} sources in {} chunks of up to {}",
        total_sources, total_chunks, width
    );

    for (chunk_index, chunk) in sources.chunks(width).enumerate() {
        if cancel.is_cancelled() {
            info!("Scan cancelled before chunk {}/{}", chunk_index + 1, total_chunks);
            break;
        }

        let units = chunk.iter().map(|source| {
            run_unit(source, extractor, &scorer, &aggregator, options, cancel)
        });

        for outcome in join_all(units).await {
            match outcome {
                UnitOutcome::Extracted { offered, kept } => {
                    sources_scanned += 1;
                    debug!("Source yielded {offered} candidates, {kept} new");
                }
                UnitOutcome::Failed => {
                    sources_scanned += 1;
                    failed_sources += 1;
                }
                UnitOutcome::Skipped => {}
            }
        }

        let processed = chunk_index * width + chunk.len();
        info!(
            "Chunk {}/{} done: processed {} of {} sources, {} candidates so far",
            chunk_index + 1,
            total_chunks,
            processed,
            total_sources,
            aggregator.len()
        );

        let is_last = chunk_index + 1 == total_chunks;
        if !is_last && !options.chunk_pause.is_zero() && !cancel.is_cancelled() {
            tokio::time::sleep(options.chunk_pause).await;
        }
    }

    let outcome = if sources_scanned < total_sources {
        ScanOutcome::Cancelled
    } else {
        ScanOutcome::Completed
    };

    let report = ScanReport {
        candidates: aggregator.finalize(),
        total_sources,
        sources_scanned,
        failed_sources,
        outcome,
    };

    info!(
        "Scan {:?}: {} candidates ({} matching), {} of {} sources failed",
        report.outcome,
        report.candidates.len(),
        report.candidates.matched_count(),
        report.failed_sources,
        report.total_sources
    );

    report
}

async fn run_unit<S, E>(
    source: &S,
    extractor: &E,
    scorer: &PreferenceScorer,
    aggregator: &Aggregator,
    options: &ScanOptions,
    cancel: &CancelSignal,
) -> UnitOutcome
where
    S: ScanSource,
    E: CandidateExtractor<S> + ?Sized,
{
    if cancel.is_cancelled() {
        debug!("Skipping source {} after cancellation", source.source_id());
        return UnitOutcome::Skipped;
    }

    let extracted = match options.unit_timeout {
        Some(limit) => match tokio::time::timeout(limit, extractor.extract(source)).await {
            Ok(result) => result,
            Err(_) => Err(ExtractionError::Timeout(limit)),
        },
        None => extractor.extract(source).await,
    };

    let raw_candidates = match extracted {
        Ok(raw) => raw,
        Err(e) => {
            warn!("Extraction failed for source {}: {}", source.source_id(), e);
            return UnitOutcome::Failed;
        }
    };

    let offered = raw_candidates.len();
    let mut kept = 0;
    for raw in raw_candidates {
        let candidate = normalize(raw);
        let outcome = scorer.score(&candidate);
        if aggregator.offer(ScoredCandidate::new(candidate, outcome)) {
            kept += 1;
        }
    }

    UnitOutcome::Extracted { offered, kept }
}
