//! Document-level entry points.
//!
//! [`extract`] runs the whole pipeline; [`classify_document`] stops after
//! routing, which is what you want when tuning a bank's rule table.
//!
//! Only document-level problems (missing file, not a PDF, no provider, an
//! empty page selection) are errors. Everything that goes wrong on a single
//! page or a single VLM call is recorded in the output and the run carries on.

use crate::classify::{classify_pages, Page, PageAssignment};
use crate::config::{ExtractionConfig, PageSelection};
use crate::error::{LoanScanError, PageError};
use crate::merge::{merge, PageFieldResult};
use crate::output::{
    DocumentClassification, DocumentMetadata, ExtractionOutput, ExtractionStats, JobOutcome,
};
use crate::pipeline::render::RenderedPage;
use crate::pipeline::{encode, input, llm, render};
use crate::plan::{plan_jobs, ExtractionJob};
use crate::record::LoanRecord;
use crate::registry::BankRegistry;
use edgequake_llm::{ImageData, LLMProvider, ProviderFactory};
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Extract a loan record from a facility letter (file path or URL).
///
/// # Returns
/// `Ok(ExtractionOutput)` whenever the document could be opened, even if
/// every extraction call failed (check `output.stats.failed_jobs`).
///
/// # Errors
/// Returns `Err(LoanScanError)` only for fatal errors:
/// - file not found, permission denied, download failure
/// - not a PDF, corrupt, or wrong password
/// - no LLM provider could be configured
/// - the page selection matched no page
pub async fn extract(
    input_str: impl AsRef<str>,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, LoanScanError> {
    let total_start = Instant::now();
    let input_str = input_str.as_ref();
    info!("Starting extraction: {}", input_str);

    let provider = resolve_provider(config).await?;
    let routed = route_document(input_str, config, Some(&provider)).await?;
    let mut stats = routed.stats;

    // ── Plan ─────────────────────────────────────────────────────────────
    let jobs = plan_jobs(&config.registry, routed.bank.as_deref(), &routed.assignments);
    info!("Planned {} extraction jobs", jobs.len());

    // ── Extract ──────────────────────────────────────────────────────────
    let extract_start = Instant::now();
    let finished = run_jobs(&provider, &jobs, &routed.images, config).await;
    stats.extract_time_ms = extract_start.elapsed().as_millis() as u64;

    // ── Merge ────────────────────────────────────────────────────────────
    let results: Vec<&PageFieldResult> = finished.iter().filter_map(|(_, r)| r.as_ref()).collect();
    let merged = merge(results);
    let record = LoanRecord::from_merged(&merged);

    let outcomes: Vec<JobOutcome> = finished.into_iter().map(|(o, _)| o).collect();
    stats.total_jobs = outcomes.len();
    stats.succeeded_jobs = outcomes.iter().filter(|o| o.succeeded()).count();
    stats.failed_jobs = stats.total_jobs - stats.succeeded_jobs;
    stats.total_input_tokens += outcomes.iter().map(|o| o.input_tokens as u64).sum::<u64>();
    stats.total_output_tokens += outcomes.iter().map(|o| o.output_tokens as u64).sum::<u64>();
    stats.total_time_ms = total_start.elapsed().as_millis() as u64;

    info!(
        "Extraction complete: {}/{} jobs succeeded, {} fields merged, {}ms",
        stats.succeeded_jobs,
        stats.total_jobs,
        merged.len(),
        stats.total_time_ms
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_document_complete(stats.total_jobs, stats.succeeded_jobs);
    }

    Ok(ExtractionOutput {
        record,
        merged,
        bank: routed.bank,
        assignments: routed.assignments,
        jobs: outcomes,
        metadata: routed.metadata,
        stats,
    })
}

/// Route a document without extracting fields.
///
/// An LLM provider is used when one can be configured (for scanned pages and
/// the bank-name fallback); without one, only the PDF text layer is used.
pub async fn classify_document(
    input_str: impl AsRef<str>,
    config: &ExtractionConfig,
) -> Result<DocumentClassification, LoanScanError> {
    let total_start = Instant::now();
    let provider = match resolve_provider(config).await {
        Ok(p) => Some(p),
        Err(e) => {
            warn!("No LLM provider, classifying from the text layer only: {}", e);
            None
        }
    };
    let routed = route_document(input_str.as_ref(), config, provider.as_ref()).await?;
    let mut stats = routed.stats;
    stats.total_time_ms = total_start.elapsed().as_millis() as u64;

    Ok(DocumentClassification {
        bank: routed.bank,
        assignments: routed.assignments,
        metadata: routed.metadata,
        stats,
    })
}

/// Extract and write the [`LoanRecord`] to `output_path` as pretty JSON.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn extract_to_file(
    input_str: impl AsRef<str>,
    output_path: impl AsRef<Path>,
    config: &ExtractionConfig,
) -> Result<ExtractionStats, LoanScanError> {
    let output = extract(input_str, config).await?;
    let path = output_path.as_ref();
    let json = serde_json::to_string_pretty(&output.record)
        .map_err(|e| LoanScanError::Internal(format!("Record serialisation failed: {}", e)))?;
    write_atomic(path, json.as_bytes()).await?;
    info!("Record written to {}", path.display());
    Ok(output.stats)
}

/// Synchronous wrapper around [`extract`].
///
/// Creates a temporary tokio runtime internally.
pub fn extract_sync(
    input_str: impl AsRef<str>,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, LoanScanError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| LoanScanError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(extract(input_str, config))
}

/// Extract PDF metadata without classifying or extracting anything.
///
/// Does not require an LLM provider or API key.
pub async fn inspect(
    input_str: impl AsRef<str>,
    config: &ExtractionConfig,
) -> Result<DocumentMetadata, LoanScanError> {
    let resolved = input::resolve_input(input_str.as_ref(), config.download_timeout_secs).await?;
    render::extract_metadata(resolved.path(), config.password.as_deref()).await
}

/// Extract from PDF bytes held in memory.
///
/// The bytes are written to a managed [`tempfile`] that is removed when the
/// call returns.
///
/// # Example
/// ```rust,no_run
/// use edgequake_loanscan::{extract_from_bytes, ExtractionConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let bytes: Vec<u8> = std::fs::read("facility_letter.pdf")?;
/// let config = ExtractionConfig::default();
/// let output = extract_from_bytes(&bytes, &config).await?;
/// println!("{}", serde_json::to_string_pretty(&output.record)?);
/// # Ok(())
/// # }
/// ```
pub async fn extract_from_bytes(
    bytes: &[u8],
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, LoanScanError> {
    let mut tmp = tempfile::Builder::new()
        .suffix(".pdf")
        .tempfile()
        .map_err(|e| LoanScanError::Internal(format!("tempfile: {e}")))?;
    tmp.write_all(bytes)
        .map_err(|e| LoanScanError::Internal(format!("tempfile write: {e}")))?;
    let path = tmp.path().to_string_lossy().to_string();
    extract(&path, config).await
}

// ── Routing (steps shared by extract and classify_document) ──────────────

struct RoutedDocument {
    metadata: DocumentMetadata,
    bank: Option<String>,
    assignments: Vec<PageAssignment>,
    /// Encoded page images, keyed by 1-indexed page number.
    images: HashMap<usize, ImageData>,
    stats: ExtractionStats,
}

async fn route_document(
    input_str: &str,
    config: &ExtractionConfig,
    provider: Option<&Arc<dyn LLMProvider>>,
) -> Result<RoutedDocument, LoanScanError> {
    let mut stats = ExtractionStats::default();

    // ── Resolve input and select pages ───────────────────────────────────
    let resolved = input::resolve_input(input_str, config.download_timeout_secs).await?;
    let pdf_path = resolved.path().to_path_buf();

    let metadata = render::extract_metadata(&pdf_path, config.password.as_deref()).await?;
    let total_pages = metadata.page_count;
    stats.total_pages = total_pages;
    info!("PDF has {} pages", total_pages);

    let page_indices = config.pages.to_indices(total_pages);
    if page_indices.is_empty() {
        return Err(LoanScanError::PageOutOfRange {
            page: first_requested_page(&config.pages),
            total: total_pages,
        });
    }
    debug!("Selected {} pages", page_indices.len());

    if let Some(ref cb) = config.progress_callback {
        cb.on_document_start(page_indices.len());
    }

    // ── Render ───────────────────────────────────────────────────────────
    let render_start = Instant::now();
    let rendered = render::render_pages(
        &pdf_path,
        config.max_rendered_pixels,
        config.password.as_deref(),
        &page_indices,
    )
    .await?;
    stats.render_time_ms = render_start.elapsed().as_millis() as u64;
    stats.processed_pages = rendered.len();
    info!("Rendered {} pages in {}ms", rendered.len(), stats.render_time_ms);

    let images = encode::encode_pages(&rendered);

    // ── Page text, bank, labels ──────────────────────────────────────────
    let classify_start = Instant::now();
    let pages = page_texts(&rendered, &images, provider, config, &mut stats).await;

    let bank = detect_bank(&config.registry, &pages, &images, provider, config, &mut stats).await;
    match bank.as_deref() {
        Some(b) => info!("Bank: {}", b),
        None => warn!("Bank could not be determined; no pages will be routed"),
    }
    if let Some(ref cb) = config.progress_callback {
        cb.on_bank_detected(bank.as_deref());
    }

    let rules = bank.as_deref().and_then(|b| config.registry.rules_for(b));
    if bank.is_some() && rules.is_none() {
        warn!("No rule set registered for {:?}", bank);
    }
    let assignments = classify_pages(rules, &pages);
    stats.classify_time_ms = classify_start.elapsed().as_millis() as u64;
    stats.labeled_pages = assignments.iter().filter(|a| !a.labels.is_empty()).count();
    stats.unreadable_pages = assignments.iter().filter(|a| a.error.is_some()).count();

    if let Some(ref cb) = config.progress_callback {
        for a in &assignments {
            let labels: Vec<String> = a.labels.iter().map(|l| l.to_string()).collect();
            cb.on_page_classified(a.page, &labels);
        }
    }

    // ── Labeled page copies ──────────────────────────────────────────────
    if let Some(dir) = config.labeled_pages_dir.clone() {
        let assignments = assignments.clone();
        tokio::task::spawn_blocking(move || {
            render::write_labeled_pages(&dir, &rendered, &assignments)
        })
        .await
        .map_err(|e| LoanScanError::Internal(format!("Labeled page task panicked: {}", e)))??;
    }

    Ok(RoutedDocument {
        metadata,
        bank,
        assignments,
        images,
        stats,
    })
}

/// Build the classifier's view of each page.
///
/// The text layer is used when it has any content. Blank pages are
/// transcribed by the VLM, concurrently, when allowed and possible.
async fn page_texts(
    rendered: &[RenderedPage],
    images: &HashMap<usize, ImageData>,
    provider: Option<&Arc<dyn LLMProvider>>,
    config: &ExtractionConfig,
    stats: &mut ExtractionStats,
) -> Vec<Page> {
    let scanned: Vec<usize> = rendered
        .iter()
        .filter(|p| p.image.is_ok() && p.text.trim().is_empty())
        .map(|p| p.page_num)
        .collect();

    let mut transcribed: HashMap<usize, Result<String, PageError>> = HashMap::new();
    match provider {
        Some(provider) if config.transcribe_scanned_pages && !scanned.is_empty() => {
            info!("Transcribing {} scanned pages", scanned.len());
            let replies: Vec<(usize, Result<llm::LlmReply, PageError>)> =
                stream::iter(scanned.iter().filter_map(|&page_num| {
                    let image = images.get(&page_num)?.clone();
                    let provider = Arc::clone(provider);
                    Some(async move {
                        let reply = llm::transcribe_page(&provider, page_num, image, config).await;
                        (page_num, reply)
                    })
                }))
                .buffer_unordered(config.concurrency)
                .collect()
                .await;

            for (page_num, reply) in replies {
                let text = reply.map(|r| {
                    stats.total_input_tokens += r.input_tokens as u64;
                    stats.total_output_tokens += r.output_tokens as u64;
                    r.content
                });
                if text.is_ok() {
                    stats.transcribed_pages += 1;
                }
                transcribed.insert(page_num, text);
            }
        }
        _ if !scanned.is_empty() => {
            debug!("{} pages have no text layer and will not be transcribed", scanned.len());
        }
        _ => {}
    }

    rendered
        .iter()
        .map(|p| match (&p.image, transcribed.remove(&p.page_num)) {
            (Err(e), _) => Page::unreadable(p.page_num, e.clone()),
            (Ok(_), Some(Ok(text))) => Page::new(p.page_num, text),
            (Ok(_), Some(Err(e))) => Page::unreadable(p.page_num, e),
            (Ok(_), None) => Page::new(p.page_num, p.text.clone()),
        })
        .collect()
}

/// Decide which bank issued the letter.
///
/// The configured override wins. Otherwise the bank-copy page (or the first
/// page) is searched for a registered name, then every page, then the VLM
/// is asked to read the name off that page.
async fn detect_bank(
    registry: &BankRegistry,
    pages: &[Page],
    images: &HashMap<usize, ImageData>,
    provider: Option<&Arc<dyn LLMProvider>>,
    config: &ExtractionConfig,
    stats: &mut ExtractionStats,
) -> Option<String> {
    if let Some(bank) = config.bank.as_deref() {
        return Some(canonical_bank_name(registry, bank));
    }

    let anchor = find_bank_copy_page(registry, pages)?;
    if let Some(name) = bank_from_text(registry, pages, anchor) {
        debug!("Bank found in page text: {}", name);
        return Some(name);
    }

    let provider = provider?;
    let image = images.get(&anchor)?.clone();
    let (answer, input_tokens, output_tokens) =
        llm::detect_bank_name(provider, anchor, image, config).await;
    stats.total_input_tokens += input_tokens as u64;
    stats.total_output_tokens += output_tokens as u64;

    answer.map(|name| match registry.find_bank_in_text(&name) {
        Some(profile) => profile.name.clone(),
        None => canonical_bank_name(registry, &name),
    })
}

/// Page number of the bank-copy notice, else the first page.
fn find_bank_copy_page(registry: &BankRegistry, pages: &[Page]) -> Option<usize> {
    pages
        .iter()
        .find(|p| matches!(&p.text, Ok(t) if registry.bank_copy_markers.matches(t)))
        .or_else(|| pages.first())
        .map(|p| p.ordinal)
}

/// Search the anchor page's text, then every page's, for a registered bank.
fn bank_from_text(registry: &BankRegistry, pages: &[Page], anchor: usize) -> Option<String> {
    let anchor_hit = pages
        .iter()
        .filter(|p| p.ordinal == anchor)
        .filter_map(readable_text)
        .find_map(|t| registry.find_bank_in_text(t));
    if let Some(profile) = anchor_hit {
        return Some(profile.name.clone());
    }

    let all_text: Vec<&str> = pages.iter().filter_map(readable_text).collect();
    registry
        .find_bank_in_text(&all_text.join("\n"))
        .map(|profile| profile.name.clone())
}

fn readable_text(page: &Page) -> Option<&str> {
    page.text.as_ref().ok().map(String::as_str)
}

fn canonical_bank_name(registry: &BankRegistry, name: &str) -> String {
    registry
        .profile(name)
        .map(|p| p.name.clone())
        .unwrap_or_else(|| name.trim().to_string())
}

fn first_requested_page(selection: &PageSelection) -> usize {
    match selection {
        PageSelection::All => 0,
        PageSelection::Single(p) => *p,
        PageSelection::Range(start, _) => *start,
        PageSelection::Set(pages) => pages.iter().copied().min().unwrap_or(0),
    }
}

// ── Extraction ───────────────────────────────────────────────────────────

/// Run every job with bounded concurrency and return the results in plan
/// order, whatever order they finished in.
async fn run_jobs(
    provider: &Arc<dyn LLMProvider>,
    jobs: &[ExtractionJob],
    images: &HashMap<usize, ImageData>,
    config: &ExtractionConfig,
) -> Vec<(JobOutcome, Option<PageFieldResult>)> {
    let total_jobs = jobs.len();

    let mut finished: Vec<(usize, (JobOutcome, Option<PageFieldResult>))> =
        stream::iter(jobs.iter().enumerate().map(|(i, job)| {
            let provider = Arc::clone(provider);
            let image = images.get(&job.page).cloned();
            async move {
                let job_num = i + 1;
                let label = job.label.to_string();
                if let Some(ref cb) = config.progress_callback {
                    cb.on_job_start(job_num, total_jobs, &label);
                }

                let result = match image {
                    Some(image) => llm::extract_fields(&provider, job, image, config).await,
                    None => missing_image(job),
                };

                if let Some(ref cb) = config.progress_callback {
                    match &result.0.error {
                        None => cb.on_job_complete(job_num, total_jobs, result.0.field_count),
                        Some(e) => cb.on_job_error(job_num, total_jobs, &e.to_string()),
                    }
                }
                (i, result)
            }
        }))
        .buffer_unordered(config.concurrency)
        .collect()
        .await;

    finished.sort_by_key(|(i, _)| *i);
    finished.into_iter().map(|(_, r)| r).collect()
}

fn missing_image(job: &ExtractionJob) -> (JobOutcome, Option<PageFieldResult>) {
    let error = PageError::RenderFailed {
        page: job.page,
        detail: "no page image available".into(),
    };
    warn!("{}", error);
    (
        JobOutcome {
            job: job.clone(),
            field_count: 0,
            input_tokens: 0,
            output_tokens: 0,
            duration_ms: 0,
            error: Some(error),
        },
        None,
    )
}

// ── Provider ─────────────────────────────────────────────────────────────

fn create_vision_provider(
    provider_name: &str,
    model: &str,
) -> Result<Arc<dyn LLMProvider>, LoanScanError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        LoanScanError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Resolve the LLM provider, from most-specific to least-specific:
///
/// 1. `config.provider`, used as-is
/// 2. `config.provider_name` + `config.model`
/// 3. `EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`, when both are set
/// 4. OpenAI, when `OPENAI_API_KEY` is set
/// 5. whatever [`ProviderFactory::from_env`] finds
async fn resolve_provider(
    config: &ExtractionConfig,
) -> Result<Arc<dyn LLMProvider>, LoanScanError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
        return create_vision_provider(name, model);
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return create_vision_provider(&prov, &model);
        }
    }

    if let Ok(openai_key) = std::env::var("OPENAI_API_KEY") {
        if !openai_key.is_empty() {
            let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
            return create_vision_provider("openai", model);
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| LoanScanError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or configure a provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}

const DEFAULT_MODEL: &str = "gpt-4.1-nano";

// ── Output ───────────────────────────────────────────────────────────────

async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), LoanScanError> {
    let write_failed = |e: std::io::Error| LoanScanError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_failed)?;
    }

    let tmp_path = path.with_extension("json.tmp");
    tokio::fs::write(&tmp_path, bytes).await.map_err(write_failed)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_failed)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pages(texts: &[&str]) -> Vec<Page> {
        texts
            .iter()
            .enumerate()
            .map(|(i, t)| Page::new(i + 1, *t))
            .collect()
    }

    #[test]
    fn bank_copy_page_is_the_anchor() {
        let reg = BankRegistry::builtin();
        let p = pages(&["Letter of offer", "BANK COPY\nRHB Bank Berhad", "Terms"]);
        assert_eq!(find_bank_copy_page(&reg, &p), Some(2));
    }

    #[test]
    fn first_page_is_the_fallback_anchor() {
        let reg = BankRegistry::builtin();
        let p = pages(&["Letter of offer", "Terms"]);
        assert_eq!(find_bank_copy_page(&reg, &p), Some(1));
        assert_eq!(find_bank_copy_page(&reg, &[]), None);
    }

    #[test]
    fn anchor_page_name_wins_over_other_pages() {
        let reg = BankRegistry::builtin();
        let p = pages(&[
            "Refinancing of an existing facility with Public Bank Berhad",
            "BANK COPY  CIMB Bank Berhad (13491-P)",
        ]);
        assert_eq!(bank_from_text(&reg, &p, 2).as_deref(), Some("CIMB BANK BERHAD"));
    }

    #[test]
    fn all_pages_are_searched_when_anchor_has_no_name() {
        let reg = BankRegistry::builtin();
        let p = pages(&["BANK COPY", "Malayan Banking Berhad, Menara Maybank"]);
        assert_eq!(bank_from_text(&reg, &p, 1).as_deref(), Some("MAYBANK BERHAD"));
    }

    #[test]
    fn no_name_anywhere_is_none() {
        let reg = BankRegistry::builtin();
        let p = pages(&["BANK COPY", "Facility amount"]);
        assert_eq!(bank_from_text(&reg, &p, 1), None);
    }

    #[test]
    fn override_is_canonicalised_when_registered() {
        let reg = BankRegistry::builtin();
        assert_eq!(canonical_bank_name(&reg, "  rhb bank berhad "), "RHB BANK BERHAD");
        assert_eq!(canonical_bank_name(&reg, "Malayan Banking Berhad"), "MAYBANK BERHAD");
        assert_eq!(canonical_bank_name(&reg, "Some Credit Union"), "Some Credit Union");
    }

    #[test]
    fn out_of_range_reports_first_requested_page() {
        assert_eq!(first_requested_page(&PageSelection::Single(9)), 9);
        assert_eq!(first_requested_page(&PageSelection::Range(4, 8)), 4);
        assert_eq!(first_requested_page(&PageSelection::Set(vec![12, 10])), 10);
        assert_eq!(first_requested_page(&PageSelection::All), 0);
    }

    #[test]
    fn missing_image_is_a_failed_job() {
        let job = ExtractionJob {
            page: 3,
            label: crate::classify::PageLabel::whole("bank_copy"),
            fields: vec!["date".into()],
        };
        let (outcome, result) = missing_image(&job);
        assert!(result.is_none());
        assert!(matches!(outcome.error, Some(PageError::RenderFailed { page: 3, .. })));
    }

    #[tokio::test]
    async fn atomic_write_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("record.json");
        write_atomic(&path, b"{}").await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{}");
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn missing_input_is_fatal_before_provider_use() {
        let config = ExtractionConfig::default();
        let err = inspect("/no/such/letter.pdf", &config).await.unwrap_err();
        assert!(matches!(err, LoanScanError::FileNotFound { .. }));
    }
}
