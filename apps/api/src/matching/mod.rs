// Job match-scoring and de-duplication pipeline.
// Pure and synchronous except for `scan`, which only awaits the extractor.
// Nothing in here knows about HTTP, mail providers or storage.

pub mod aggregator;
pub mod candidate;
pub mod extract;
pub mod preferences;
pub mod scan;
pub mod scorer;

pub use aggregator::{AggregationResult, Aggregator, ScoredCandidate};
pub use candidate::{normalize, NormalizedCandidate, RawCandidate};
pub use extract::{CandidateExtractor, ExtractionError, ScanSource};
pub use preferences::UserPreferences;
pub use scan::{scan, CancelSignal, ScanOptions, ScanOutcome, ScanReport, ScanSummary};
pub use scorer::{score, MatchOutcome, PreferenceScorer};
