use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::matching::{NormalizedCandidate, ScoredCandidate};
use crate::postings::page::Board;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    Detected,
    Saved,
    Pending,
    Submitted,
    #[serde(rename = "Applied (AI)")]
    AppliedByAssistant,
    Applied,
    Failed,
    #[serde(rename = "Response Received")]
    ResponseReceived,
    #[serde(rename = "Interview Scheduled")]
    InterviewScheduled,
    Rejected,
    Offered,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobSource {
    Gmail,
    LinkedIn,
    Indeed,
    #[serde(rename = "Imported Link")]
    ImportedLink,
}

impl JobSource {
    /// Lowercase tag used as the lead id prefix.
    pub fn slug(self) -> &'static str {
        match self {
            JobSource::Gmail => "gmail",
            JobSource::LinkedIn => "linkedin",
            JobSource::Indeed => "indeed",
            JobSource::ImportedLink => "link",
        }
    }

    /// Board a pasted posting link belongs to.
    pub fn for_url(url: &str) -> Self {
        match Board::for_url(url) {
            Board::LinkedIn => JobSource::LinkedIn,
            Board::Indeed => JobSource::Indeed,
            Board::Other => JobSource::ImportedLink,
        }
    }
}

/// A scored job as handed back to the client after a scan.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobLead {
    pub id: String,
    pub source: JobSource,
    pub detected_at: DateTime<Utc>,
    pub status: JobStatus,
    #[serde(flatten)]
    pub candidate: NormalizedCandidate,
    pub match_score: u32,
    pub is_match: bool,
}

impl JobLead {
    pub fn from_scored(scored: ScoredCandidate, source: JobSource) -> Self {
        let match_score = scored.match_score();
        let is_match = scored.is_match();
        let suffix = Uuid::new_v4().simple().to_string();
        Self {
            id: format!("{}-{}", source.slug(), &suffix[..8]),
            source,
            detected_at: Utc::now(),
            status: JobStatus::Detected,
            candidate: scored.into_candidate(),
            match_score,
            is_match,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::{normalize, MatchOutcome, RawCandidate};

    fn scored() -> ScoredCandidate {
        let candidate = normalize(RawCandidate {
            title: Some("Rust Engineer".to_string()),
            application_url: Some("https://jobs.example/1".to_string()),
            ..Default::default()
        });
        ScoredCandidate::new(
            candidate,
            MatchOutcome {
                match_score: 60,
                is_match: true,
            },
        )
    }

    #[test]
    fn test_lead_from_scored_candidate() {
        let lead = JobLead::from_scored(scored(), JobSource::Gmail);
        assert!(lead.id.starts_with("gmail-"));
        assert_eq!(lead.id.len(), "gmail-".len() + 8);
        assert_eq!(lead.status, JobStatus::Detected);
        assert_eq!(lead.match_score, 60);
        assert!(lead.is_match);
        assert_eq!(lead.candidate.company, "Unknown Company");
    }

    #[test]
    fn test_lead_ids_are_unique() {
        let a = JobLead::from_scored(scored(), JobSource::Gmail);
        let b = JobLead::from_scored(scored(), JobSource::Gmail);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_lead_serializes_flat_with_display_names() {
        let lead = JobLead::from_scored(scored(), JobSource::ImportedLink);
        let value = serde_json::to_value(&lead).unwrap();
        assert_eq!(value["source"], "Imported Link");
        assert_eq!(value["status"], "Detected");
        assert_eq!(value["title"], "Rust Engineer");
        assert_eq!(value["applicationUrl"], "https://jobs.example/1");
        assert_eq!(value["matchScore"], 60);
        assert!(value.get("detectedAt").is_some());
    }

    #[test]
    fn test_source_for_pasted_link() {
        assert_eq!(
            JobSource::for_url("https://de.linkedin.com/jobs/view/42"),
            JobSource::LinkedIn
        );
        assert_eq!(
            JobSource::for_url("https://uk.indeed.com/viewjob?jk=1"),
            JobSource::Indeed
        );
        assert_eq!(
            JobSource::for_url("https://careers.acme.example/1"),
            JobSource::ImportedLink
        );
        let lead = JobLead::from_scored(scored(), JobSource::LinkedIn);
        assert!(lead.id.starts_with("linkedin-"));
    }

    #[test]
    fn test_status_names_round_trip() {
        let status: JobStatus = serde_json::from_str("\"Applied (AI)\"").unwrap();
        assert_eq!(status, JobStatus::AppliedByAssistant);
        assert_eq!(
            serde_json::to_string(&JobStatus::InterviewScheduled).unwrap(),
            "\"Interview Scheduled\""
        );
    }
}
