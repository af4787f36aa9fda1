//! # edgequake-loanscan
//!
//! Extract a structured record from a loan facility letter using page routing
//! and Vision Language Models (VLMs).
//!
//! A facility letter is dozens of pages, but the fields a conveyancing office
//! needs sit on a handful of them: the bank copy, the solicitors' page, the
//! facility table, the security documents, the property schedule. This crate
//! finds those pages by their headings, sends each one to a VLM with only the
//! fields that page can answer, and folds the answers into one record.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input     resolve local file or download from URL
//!  ├─ 2. Render    rasterise pages + read text layer (pdfium, spawn_blocking)
//!  ├─ 3. Text      transcribe scanned pages via the VLM
//!  ├─ 4. Bank      bank-copy page → registered name → VLM fallback
//!  ├─ 5. Classify  one sequential pass, with pending continuations
//!  ├─ 6. Plan      (page, label) → field list via the bank's field map
//!  ├─ 7. Extract   concurrent VLM calls, one per job
//!  └─ 8. Merge     order-preserving dedup into a fixed-key LoanRecord
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_loanscan::{extract, ExtractionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from OPENAI_API_KEY / ANTHROPIC_API_KEY / GEMINI_API_KEY
//!     let config = ExtractionConfig::default();
//!     let output = extract("facility_letter.pdf", &config).await?;
//!     println!("{}", serde_json::to_string_pretty(&output.record)?);
//!     eprintln!("bank: {:?}, jobs: {}/{}",
//!         output.bank,
//!         output.stats.succeeded_jobs,
//!         output.stats.total_jobs);
//!     Ok(())
//! }
//! ```
//!
//! ## Routing without a VLM
//!
//! The classifier, the field-map lookup and the merge are plain functions
//! over plain data and can be used on their own:
//!
//! ```rust
//! use edgequake_loanscan::{classify_pages, merge, BankRegistry, Page, PageFieldResult};
//!
//! let registry = BankRegistry::builtin();
//! let rules = registry.rules_for("RHB BANK BERHAD");
//! let pages = vec![
//!     Page::new(1, "BANK COPY"),
//!     Page::new(2, "Type of Facility: Term Loan"),
//!     Page::new(3, "Total RM500,000.00"),
//! ];
//! let assignments = classify_pages(rules, &pages);
//! assert_eq!(assignments[2].labels[0].to_string(), "subject_of_fa_2");
//!
//! let a = PageFieldResult::new(1, "bank_copy").with("borrower_name", "Tan Ah Kow");
//! let b = PageFieldResult::new(2, "subject_of_fa_1").with("borrower_name", vec!["Tan Ah Kow"]);
//! let merged = merge([&a, &b]);
//! assert_eq!(merged.get("borrower_name").and_then(|v| v.as_scalar()), Some("Tan Ah Kow"));
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `loanscan` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-loanscan = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod classify;
pub mod config;
pub mod error;
pub mod extract;
pub mod merge;
pub mod output;
pub mod pipeline;
pub mod plan;
pub mod progress;
pub mod prompts;
pub mod record;
pub mod registry;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use classify::{
    classify_page, classify_pages, contains_any, CategoryRule, ClassifierState, MarkerSet, Page,
    PageAssignment, PageLabel, RuleMatch, RuleOutcome,
};
pub use config::{ExtractionConfig, ExtractionConfigBuilder, PageSelection};
pub use error::{LoanScanError, PageError};
pub use extract::{
    classify_document, extract, extract_from_bytes, extract_sync, extract_to_file, inspect,
};
pub use merge::{merge, FieldValue, MergedRecord, PageFieldResult};
pub use output::{
    DocumentClassification, DocumentMetadata, ExtractionOutput, ExtractionStats, JobOutcome,
};
pub use plan::{plan_jobs, ExtractionJob};
pub use progress::{ExtractionProgressCallback, NoopProgressCallback, ProgressCallback};
pub use record::LoanRecord;
pub use registry::{BankProfile, BankRegistry, FieldMap};
