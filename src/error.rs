//! Error types for the edgequake-loanscan library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`LoanScanError`] is **fatal**: the document cannot be processed at all
//!   (bad input file, wrong password, provider not configured, unreadable
//!   rule table). Returned as `Err(LoanScanError)` from the top-level
//!   `extract*` functions.
//!
//! * [`PageError`] is **non-fatal**: a single page could not be classified or
//!   a single extraction call failed. Stored in
//!   [`crate::classify::PageAssignment`] and [`crate::output::JobOutcome`] so
//!   the caller sees what was lost, while the merged record is still built
//!   from everything that did succeed.
//!
//! An unknown bank or a category without a field list is neither: it simply
//! produces no extraction jobs.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-loanscan library.
#[derive(Debug, Error)]
pub enum LoanScanError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is not a valid file path or URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}\nTry repairing with: qpdf --decrypt input.pdf output.pdf")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { path: PathBuf },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    /// The page selection matched no page of the document.
    #[error("Page {page} is out of range (document has {total} pages)")]
    PageOutOfRange { page: usize, total: usize },

    /// Writing a labeled page copy failed.
    #[error("Failed to write labeled page '{path}': {detail}")]
    LabeledPageWriteFailed { path: PathBuf, detail: String },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Install libpdfium for your platform, or set PDFIUM_LIB_PATH=/path/to/libpdfium\n\
to point at an existing copy.\n"
    )]
    PdfiumBindingFailed(String),

    // ── LLM errors ────────────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// A bank rule table could not be read or parsed.
    #[error("Failed to load bank rules from '{source_name}': {detail}")]
    RulesLoadFailed { source_name: String, detail: String },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output JSON file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single page or a single extraction job.
///
/// Classification failures reset the classifier's pending continuations;
/// extraction failures simply contribute nothing to the merge.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum PageError {
    /// Page rasterisation failed.
    #[error("Page {page}: rasterisation failed: {detail}")]
    RenderFailed { page: usize, detail: String },

    /// The page had no text layer and the VLM transcription failed.
    #[error("Page {page}: transcription failed: {detail}")]
    TranscriptionFailed { page: usize, detail: String },

    /// The page text could not be evaluated by the classifier.
    #[error("Page {page}: unreadable: {detail}")]
    Unreadable { page: usize, detail: String },

    /// LLM call failed after retries.
    #[error("Page {page} ({label}): LLM call failed after {retries} retries: {detail}")]
    LlmFailed {
        page: usize,
        label: String,
        retries: u32,
        detail: String,
    },

    /// LLM call timed out.
    #[error("Page {page}: LLM call timed out after {secs}s")]
    Timeout { page: usize, secs: u64 },

    /// The VLM answered, but not with a JSON object.
    #[error("Page {page} ({label}): malformed response: {detail}")]
    MalformedResponse {
        page: usize,
        label: String,
        detail: String,
    },

    /// The VLM reported that the page holds nothing to extract.
    #[error("Page {page} ({label}): no useful data in response")]
    NoContent { page: usize, label: String },
}

impl PageError {
    /// The 1-indexed page this error refers to.
    pub fn page(&self) -> usize {
        match self {
            PageError::RenderFailed { page, .. }
            | PageError::TranscriptionFailed { page, .. }
            | PageError::Unreadable { page, .. }
            | PageError::LlmFailed { page, .. }
            | PageError::Timeout { page, .. }
            | PageError::MalformedResponse { page, .. }
            | PageError::NoContent { page, .. } => *page,
        }
    }
}
