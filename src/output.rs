//! Result types returned by [`crate::extract()`] and friends.

use crate::classify::PageAssignment;
use crate::error::PageError;
use crate::merge::MergedRecord;
use crate::plan::ExtractionJob;
use crate::record::LoanRecord;
use serde::{Deserialize, Serialize};

/// Everything one extraction run produced.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionOutput {
    /// Fixed-key record, ready to persist.
    pub record: LoanRecord,

    /// Merged fields exactly as the pages produced them (original key names).
    pub merged: MergedRecord,

    /// Bank the document was routed with, if one was determined.
    pub bank: Option<String>,

    /// Labels per page, in page order.
    pub assignments: Vec<PageAssignment>,

    /// Outcome of every planned extraction call, in merge order.
    pub jobs: Vec<JobOutcome>,

    pub metadata: DocumentMetadata,

    pub stats: ExtractionStats,
}

/// The routing half of a run: which bank, which labels on which page.
///
/// Returned by [`crate::classify_document`], which stops before any field
/// extraction call is made.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentClassification {
    pub bank: Option<String>,
    pub assignments: Vec<PageAssignment>,
    pub metadata: DocumentMetadata,
    pub stats: ExtractionStats,
}

/// What happened to one [`ExtractionJob`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobOutcome {
    pub job: ExtractionJob,

    /// Number of non-empty fields the page returned.
    pub field_count: usize,

    pub input_tokens: usize,
    pub output_tokens: usize,
    pub duration_ms: u64,

    /// Set when the job contributed nothing to the merge.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<PageError>,
}

impl JobOutcome {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Counters for one run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractionStats {
    pub total_pages: usize,
    pub processed_pages: usize,
    /// Pages that received at least one label.
    pub labeled_pages: usize,
    /// Pages the classifier could not read.
    pub unreadable_pages: usize,
    /// Pages whose text came from VLM transcription instead of the text layer.
    pub transcribed_pages: usize,
    pub total_jobs: usize,
    pub succeeded_jobs: usize,
    pub failed_jobs: usize,
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
    pub render_time_ms: u64,
    pub classify_time_ms: u64,
    pub extract_time_ms: u64,
    pub total_time_ms: u64,
}

/// PDF document metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub creation_date: Option<String>,
    pub modification_date: Option<String>,
    pub page_count: usize,
    pub pdf_version: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::PageLabel;

    #[test]
    fn job_outcome_error_is_omitted_when_none() {
        let outcome = JobOutcome {
            job: ExtractionJob {
                page: 3,
                label: PageLabel::whole("law_firm_details"),
                fields: vec!["law_firm_name".into()],
            },
            field_count: 1,
            input_tokens: 900,
            output_tokens: 40,
            duration_ms: 1200,
            error: None,
        };
        assert!(outcome.succeeded());
        let json = serde_json::to_value(&outcome).unwrap();
        assert!(json.get("error").is_none());
        assert_eq!(json["job"]["label"], "law_firm_details");
    }
}
