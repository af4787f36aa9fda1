//! Progress-callback trait for per-document extraction events.
//!
//! Inject an [`Arc<dyn ExtractionProgressCallback>`] via
//! [`crate::config::ExtractionConfigBuilder::progress_callback`] to follow a
//! document through classification and extraction.
//!
//! Events arrive in two phases. Classification is sequential, so
//! `on_page_classified` fires in ascending page order. Extraction jobs run
//! concurrently, so `on_job_start` / `on_job_complete` / `on_job_error` may be
//! called from different tasks and in any order.
//!
//! # Example
//!
//! ```rust
//! use edgequake_loanscan::{ExtractionConfig, ExtractionProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     fields: AtomicUsize,
//! }
//!
//! impl ExtractionProgressCallback for CountingCallback {
//!     fn on_job_complete(&self, _job: usize, _total: usize, field_count: usize) {
//!         self.fields.fetch_add(field_count, Ordering::SeqCst);
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback { fields: AtomicUsize::new(0) });
//!
//! let config = ExtractionConfig::builder()
//!     .progress_callback(counter as Arc<dyn ExtractionProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the extraction pipeline as it works through a document.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Implementations must protect shared mutable state
/// (jobs run concurrently).
pub trait ExtractionProgressCallback: Send + Sync {
    /// Called once the page count is known, before any page is classified.
    fn on_document_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called once the bank has been decided (or detection gave up).
    fn on_bank_detected(&self, bank: Option<&str>) {
        let _ = bank;
    }

    /// Called for every page, in ascending order, with the labels it received.
    fn on_page_classified(&self, page_num: usize, labels: &[String]) {
        let _ = (page_num, labels);
    }

    /// Called just before the VLM request for a job is sent.
    ///
    /// `job` is 1-indexed within `total_jobs`.
    fn on_job_start(&self, job: usize, total_jobs: usize, label: &str) {
        let _ = (job, total_jobs, label);
    }

    /// Called when a job returned a usable field dictionary.
    fn on_job_complete(&self, job: usize, total_jobs: usize, field_count: usize) {
        let _ = (job, total_jobs, field_count);
    }

    /// Called when a job failed; the job contributes nothing to the merge.
    fn on_job_error(&self, job: usize, total_jobs: usize, error: &str) {
        let _ = (job, total_jobs, error);
    }

    /// Called once after the merge.
    fn on_document_complete(&self, total_jobs: usize, succeeded: usize) {
        let _ = (total_jobs, succeeded);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ExtractionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ExtractionConfig`].
pub type ProgressCallback = Arc<dyn ExtractionProgressCallback>;
