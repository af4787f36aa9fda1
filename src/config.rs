//! Configuration types for loan-letter extraction.
//!
//! All pipeline behaviour is controlled through [`ExtractionConfig`], built via
//! its [`ExtractionConfigBuilder`]. The bank tables (routing rules and field
//! maps) travel inside the config as an `Arc<BankRegistry>`, so one registry
//! loaded at startup is shared by every document without copying.

use crate::error::LoanScanError;
use crate::progress::ProgressCallback;
use crate::registry::BankRegistry;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Configuration for extracting one facility letter.
///
/// # Example
/// ```rust
/// use edgequake_loanscan::ExtractionConfig;
///
/// let config = ExtractionConfig::builder()
///     .bank("CIMB BANK BERHAD")
///     .concurrency(2)
///     .model("gpt-4.1-mini")
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ExtractionConfig {
    /// Maximum rendered image dimension (width or height) in pixels. Default: 2000.
    ///
    /// Facility letters are A4; 2000 px on the long edge keeps NRIC numbers and
    /// registration numbers legible for the VLM.
    pub max_rendered_pixels: u32,

    /// Number of concurrent VLM extraction calls. Default: 4.
    ///
    /// Only the extraction and transcription calls run concurrently; page
    /// classification is always a single sequential pass.
    pub concurrency: usize,

    /// LLM model identifier. If None, uses `gpt-4.1-nano`.
    pub model: Option<String>,

    /// LLM provider name (e.g. "openai", "anthropic", "ollama").
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature. Default: 0.3.
    pub temperature: f32,

    /// Maximum tokens the LLM may generate per call. Default: 2048.
    pub max_tokens: usize,

    /// Maximum retry attempts on a failed VLM call. Default: 3.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds, doubled per attempt. Default: 500.
    pub retry_backoff_ms: u64,

    /// Per-VLM-call timeout in seconds. Default: 120.
    pub api_timeout_secs: u64,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Custom system prompt for field extraction. If None, uses built-in default.
    pub system_prompt: Option<String>,

    /// Page selection. Default: All pages.
    pub pages: PageSelection,

    /// Bank name override. When set, bank detection is skipped.
    pub bank: Option<String>,

    /// Bank routing rules and field maps. Default: [`BankRegistry::builtin`].
    pub registry: Arc<BankRegistry>,

    /// Ask the VLM to transcribe pages whose PDF text layer is empty. Default: true.
    ///
    /// Scanned letters have no text layer at all; without transcription the
    /// classifier sees blank pages and nothing is routed.
    pub transcribe_scanned_pages: bool,

    /// Directory to write one PNG per `(page, label)` into. Default: None.
    pub labeled_pages_dir: Option<PathBuf>,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Optional per-document progress callback.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            max_rendered_pixels: 2000,
            concurrency: 4,
            model: None,
            provider_name: None,
            provider: None,
            temperature: 0.3,
            max_tokens: 2048,
            max_retries: 3,
            retry_backoff_ms: 500,
            api_timeout_secs: 120,
            password: None,
            system_prompt: None,
            pages: PageSelection::default(),
            bank: None,
            registry: Arc::new(BankRegistry::builtin()),
            transcribe_scanned_pages: true,
            labeled_pages_dir: None,
            download_timeout_secs: 120,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ExtractionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionConfig")
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("concurrency", &self.concurrency)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("max_retries", &self.max_retries)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("pages", &self.pages)
            .field("bank", &self.bank)
            .field("registered_banks", &self.registry.banks().len())
            .field("transcribe_scanned_pages", &self.transcribe_scanned_pages)
            .field("labeled_pages_dir", &self.labeled_pages_dir)
            .finish()
    }
}

impl ExtractionConfig {
    /// Create a new builder for `ExtractionConfig`.
    pub fn builder() -> ExtractionConfigBuilder {
        ExtractionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ExtractionConfig`].
#[derive(Debug)]
pub struct ExtractionConfigBuilder {
    config: ExtractionConfig,
}

impl ExtractionConfigBuilder {
    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n;
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t;
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn pages(mut self, selection: PageSelection) -> Self {
        self.config.pages = selection;
        self
    }

    pub fn bank(mut self, bank: impl Into<String>) -> Self {
        self.config.bank = Some(bank.into());
        self
    }

    pub fn registry(mut self, registry: Arc<BankRegistry>) -> Self {
        self.config.registry = registry;
        self
    }

    pub fn transcribe_scanned_pages(mut self, v: bool) -> Self {
        self.config.transcribe_scanned_pages = v;
        self
    }

    pub fn labeled_pages_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.labeled_pages_dir = Some(dir.into());
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractionConfig, LoanScanError> {
        let c = &self.config;
        if c.concurrency == 0 {
            return Err(LoanScanError::InvalidConfig(
                "Concurrency must be ≥ 1".into(),
            ));
        }
        if !(0.0..=2.0).contains(&c.temperature) {
            return Err(LoanScanError::InvalidConfig(format!(
                "Temperature must be 0.0–2.0, got {}",
                c.temperature
            )));
        }
        if c.registry.banks().is_empty() {
            return Err(LoanScanError::InvalidConfig(
                "Bank registry has no banks".into(),
            ));
        }
        if let Some(bank) = c.bank.as_deref() {
            if bank.trim().is_empty() {
                return Err(LoanScanError::InvalidConfig(
                    "Bank override must not be blank".into(),
                ));
            }
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Specifies which pages of the PDF to process.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageSelection {
    /// All pages (default).
    #[default]
    All,
    /// A single page (1-indexed).
    Single(usize),
    /// A contiguous range of pages (1-indexed, inclusive).
    Range(usize, usize),
    /// Specific pages (1-indexed, deduplicated).
    Set(Vec<usize>),
}

impl PageSelection {
    /// Expand the selection into a sorted, deduplicated list of 0-indexed page numbers.
    pub fn to_indices(&self, total_pages: usize) -> Vec<usize> {
        let mut indices: Vec<usize> = match self {
            PageSelection::All => (0..total_pages).collect(),
            PageSelection::Single(p) => {
                if *p >= 1 && *p <= total_pages {
                    vec![p - 1]
                } else {
                    vec![]
                }
            }
            PageSelection::Range(start, end) => {
                let s = (*start).max(1) - 1;
                let e = (*end).min(total_pages);
                (s..e).collect()
            }
            PageSelection::Set(pages) => pages
                .iter()
                .filter(|&&p| p >= 1 && p <= total_pages)
                .map(|p| p - 1)
                .collect(),
        };
        indices.sort_unstable();
        indices.dedup();
        indices
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = ExtractionConfig::default();
        assert_eq!(c.concurrency, 4);
        assert_eq!(c.max_tokens, 2048);
        assert!(c.transcribe_scanned_pages);
        assert_eq!(c.registry.banks().len(), 5);
    }

    #[test]
    fn builder_rejects_zero_concurrency() {
        let err = ExtractionConfig::builder().concurrency(0).build().unwrap_err();
        assert!(matches!(err, LoanScanError::InvalidConfig(_)));
    }

    #[test]
    fn builder_rejects_out_of_range_temperature() {
        assert!(ExtractionConfig::builder().temperature(2.5).build().is_err());
        assert!(ExtractionConfig::builder().temperature(0.0).build().is_ok());
    }

    #[test]
    fn builder_rejects_blank_bank() {
        assert!(ExtractionConfig::builder().bank("   ").build().is_err());
    }

    #[test]
    fn debug_hides_provider() {
        let dbg = format!("{:?}", ExtractionConfig::default());
        assert!(dbg.contains("registered_banks: 5"));
    }

    #[test]
    fn page_selection_to_indices() {
        assert_eq!(PageSelection::All.to_indices(5), vec![0, 1, 2, 3, 4]);
        assert_eq!(PageSelection::Single(3).to_indices(5), vec![2]);
        assert_eq!(PageSelection::Single(6).to_indices(5), Vec::<usize>::new());
        assert_eq!(PageSelection::Range(2, 4).to_indices(5), vec![1, 2, 3]);
        assert_eq!(
            PageSelection::Set(vec![3, 1, 3]).to_indices(5),
            vec![0, 2]
        );
    }
}
