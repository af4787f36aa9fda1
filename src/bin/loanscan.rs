//! CLI binary for edgequake-loanscan.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ExtractionConfig` and prints results as JSON.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_loanscan::{
    classify_document, extract, extract_to_file, inspect, BankRegistry, ExtractionConfig,
    ExtractionProgressCallback, PageSelection, ProgressCallback,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers ──────────────────────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Spinner while pages are read and routed, then a bar over extraction jobs.
/// Jobs complete out of order, so per-job timings are keyed by job index.
struct CliProgressCallback {
    bar: ProgressBar,
    jobs_started: AtomicBool,
    start_times: Mutex<HashMap<usize, Instant>>,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Opening PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            jobs_started: AtomicBool::new(false),
            start_times: Mutex::new(HashMap::new()),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} jobs  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Extracting");
        self.bar.reset_eta();
    }

    /// End the spinner when the run stops after classification.
    fn finish_routing(&self) {
        self.bar.finish_and_clear();
    }

    fn elapsed_secs(&self, job: usize) -> f64 {
        self.start_times
            .lock()
            .ok()
            .and_then(|mut m| m.remove(&job))
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl ExtractionProgressCallback for CliProgressCallback {
    fn on_document_start(&self, total_pages: usize) {
        self.bar.set_prefix("Routing");
        self.bar.set_message(format!("reading {total_pages} pages…"));
    }

    fn on_bank_detected(&self, bank: Option<&str>) {
        match bank {
            Some(b) => self.bar.println(format!("{} Bank: {}", cyan("◆"), bold(b))),
            None => self.bar.println(format!("{} Bank could not be determined", red("◆"))),
        }
    }

    fn on_page_classified(&self, page_num: usize, labels: &[String]) {
        if !labels.is_empty() {
            self.bar
                .println(format!("  {} {}", dim(&format!("p{page_num:>3}")), labels.join(", ")));
        }
    }

    fn on_job_start(&self, job: usize, total_jobs: usize, label: &str) {
        if !self.jobs_started.swap(true, Ordering::SeqCst) {
            self.activate_bar(total_jobs);
        }
        if let Ok(mut m) = self.start_times.lock() {
            m.insert(job, Instant::now());
        }
        self.bar.set_message(label.to_string());
    }

    fn on_job_complete(&self, job: usize, total_jobs: usize, field_count: usize) {
        let secs = self.elapsed_secs(job);
        self.bar.println(format!(
            "  {} Job {:>3}/{:<3}  {:<10}  {}",
            green("✓"),
            job,
            total_jobs,
            dim(&format!("{field_count:>2} fields")),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_job_error(&self, job: usize, total_jobs: usize, error: &str) {
        let secs = self.elapsed_secs(job);

        let msg: String = if error.chars().count() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error.to_string()
        };

        self.bar.println(format!(
            "  {} Job {:>3}/{:<3}  {}  {}",
            red("✗"),
            job,
            total_jobs,
            red(&msg),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_document_complete(&self, total_jobs: usize, succeeded: usize) {
        let failed = total_jobs.saturating_sub(succeeded);
        self.bar.finish_and_clear();

        if total_jobs == 0 {
            eprintln!("{} no pages were routed for extraction", cyan("⚠"));
        } else if failed == 0 {
            eprintln!("{} {} jobs extracted successfully", green("✔"), bold(&succeeded.to_string()));
        } else {
            eprintln!(
                "{} {}/{} jobs extracted  ({} failed)",
                if failed == total_jobs { red("✘") } else { cyan("⚠") },
                bold(&succeeded.to_string()),
                total_jobs,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Extract a record (JSON on stdout)
  loanscan facility_letter.pdf

  # Write the record to a file
  loanscan facility_letter.pdf -o record.json

  # Skip bank detection
  loanscan --bank "RHB BANK BERHAD" facility_letter.pdf

  # See how pages are routed, without extracting fields
  loanscan --classify-only facility_letter.pdf

  # Keep a copy of every routed page for review
  loanscan --labeled-pages ./pages facility_letter.pdf

  # Custom bank rule tables
  loanscan --rules banks.json facility_letter.pdf
  loanscan --rules banks.json --list-banks

  # Everything: record, merged fields, page labels, job outcomes, stats
  loanscan --full facility_letter.pdf > run.json

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  GEMINI_API_KEY          Google Gemini API key
  EDGEQUAKE_LLM_PROVIDER  Override provider (openai, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL         Override model ID
  PDFIUM_LIB_PATH         Path to libpdfium (file or containing directory)
  RUST_LOG                Log filter, e.g. edgequake_loanscan=debug
"#;

/// Extract structured records from loan facility letters using Vision LLMs.
#[derive(Parser, Debug)]
#[command(
    name = "loanscan",
    version,
    about = "Extract structured records from loan facility letters using Vision LLMs",
    long_about = "Route the pages of a loan facility letter (local file or URL) to the sections \
they hold, extract each section's fields with a Vision Language Model, and merge them into one \
JSON record. Supports OpenAI, Anthropic, Google Gemini, Azure OpenAI, and any OpenAI-compatible \
endpoint (Ollama, vLLM, LiteLLM, etc.).",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file path or HTTP/HTTPS URL.
    #[arg(required_unless_present = "list_banks")]
    input: Option<String>,

    /// Write the record to this file instead of stdout.
    #[arg(short, long, env = "LOANSCAN_OUTPUT")]
    output: Option<PathBuf>,

    /// Bank name; skips bank detection.
    #[arg(long, env = "LOANSCAN_BANK")]
    bank: Option<String>,

    /// JSON file with bank rule tables and field maps (replaces the built-ins).
    #[arg(long, env = "LOANSCAN_RULES")]
    rules: Option<PathBuf>,

    /// Page selection: all, 5, 3-15, or 1,3,5,7.
    #[arg(long, env = "LOANSCAN_PAGES", default_value = "all")]
    pages: String,

    /// LLM model ID (e.g. gpt-4.1-nano, gpt-4.1-mini, claude-sonnet-4-20250514).
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(long, env = "EDGEQUAKE_PROVIDER")]
    provider: Option<String>,

    /// Number of concurrent VLM API calls.
    #[arg(short, long, env = "LOANSCAN_CONCURRENCY", default_value_t = 4)]
    concurrency: usize,

    /// Max LLM output tokens per call.
    #[arg(long, env = "LOANSCAN_MAX_TOKENS", default_value_t = 2048)]
    max_tokens: usize,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "LOANSCAN_TEMPERATURE", default_value_t = 0.3)]
    temperature: f32,

    /// Retries per VLM call on failure.
    #[arg(long, env = "LOANSCAN_MAX_RETRIES", default_value_t = 3)]
    max_retries: u32,

    /// Longest rendered page edge in pixels.
    #[arg(long, env = "LOANSCAN_MAX_PIXELS", default_value_t = 2000)]
    max_pixels: u32,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "LOANSCAN_PASSWORD")]
    password: Option<String>,

    /// Path to a text file containing a custom extraction system prompt.
    #[arg(long, env = "LOANSCAN_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    /// Write one PNG per (page, label) into this directory.
    #[arg(long, env = "LOANSCAN_LABELED_PAGES")]
    labeled_pages: Option<PathBuf>,

    /// Do not ask the VLM to transcribe pages without a text layer.
    #[arg(long)]
    no_transcribe: bool,

    /// Print the page → labels routing and stop.
    #[arg(long)]
    classify_only: bool,

    /// Print the registered banks with their categories and fields.
    #[arg(long)]
    list_banks: bool,

    /// Print PDF metadata only.
    #[arg(long)]
    inspect_only: bool,

    /// Print the full run output (record, merged fields, labels, jobs, stats).
    #[arg(long)]
    full: bool,

    /// Disable progress output.
    #[arg(long, env = "LOANSCAN_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "LOANSCAN_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "LOANSCAN_QUIET")]
    quiet: bool,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "LOANSCAN_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Per-call LLM timeout in seconds.
    #[arg(long, env = "LOANSCAN_API_TIMEOUT", default_value_t = 120)]
    api_timeout: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress display replaces INFO logs; -v brings them all back.
    let show_progress = !cli.quiet && !cli.no_progress;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let registry = match cli.rules {
        Some(ref path) => BankRegistry::from_json_file(path).context("Failed to load bank rules")?,
        None => BankRegistry::builtin(),
    };

    // ── List-banks mode ──────────────────────────────────────────────────
    if cli.list_banks {
        print_banks(&registry);
        return Ok(());
    }

    let input = cli.input.clone().context("No input given")?;

    // ── Build config ─────────────────────────────────────────────────────
    let cli_progress = show_progress.then(CliProgressCallback::new);
    let progress_cb: Option<ProgressCallback> = cli_progress
        .clone()
        .map(|cb| cb as Arc<dyn ExtractionProgressCallback>);
    let config = build_config(&cli, registry, progress_cb).await?;

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let meta = inspect(&input, &config).await.context("Failed to inspect PDF")?;
        if let Some(ref cb) = cli_progress {
            cb.finish_routing();
        }
        println!(
            "{}",
            serde_json::to_string_pretty(&meta).context("Failed to serialise metadata")?
        );
        return Ok(());
    }

    // ── Classify-only mode ───────────────────────────────────────────────
    if cli.classify_only {
        let routed = classify_document(&input, &config)
            .await
            .context("Classification failed")?;
        if let Some(ref cb) = cli_progress {
            cb.finish_routing();
        }
        let json = serde_json::to_string_pretty(&routed).context("Failed to serialise output")?;
        println!("{json}");
        if !cli.quiet {
            eprintln!(
                "{} pages, {} labeled, {} unreadable",
                routed.stats.processed_pages,
                routed.stats.labeled_pages,
                routed.stats.unreadable_pages
            );
        }
        return Ok(());
    }

    // ── Run extraction ───────────────────────────────────────────────────
    match cli.output {
        Some(ref output_path) if !cli.full => {
            let stats = extract_to_file(&input, output_path, &config)
                .await
                .context("Extraction failed")?;
            if !cli.quiet {
                eprintln!(
                    "{}  {}/{} jobs  {}ms  →  {}",
                    if stats.failed_jobs == 0 { green("✔") } else { cyan("⚠") },
                    stats.succeeded_jobs,
                    stats.total_jobs,
                    stats.total_time_ms,
                    bold(&output_path.display().to_string()),
                );
                eprintln!(
                    "   {} tokens in  /  {} tokens out",
                    dim(&stats.total_input_tokens.to_string()),
                    dim(&stats.total_output_tokens.to_string()),
                );
            }
        }
        _ => {
            let output = extract(&input, &config).await.context("Extraction failed")?;
            let json = if cli.full {
                serde_json::to_string_pretty(&output)
            } else {
                serde_json::to_string_pretty(&output.record)
            }
            .context("Failed to serialise output")?;

            match cli.output {
                Some(ref path) => tokio::fs::write(path, format!("{json}\n"))
                    .await
                    .with_context(|| format!("Failed to write {}", path.display()))?,
                None => println!("{json}"),
            }

            if !cli.quiet {
                eprintln!(
                    "   bank {}  —  {} tokens in  /  {} tokens out  —  {}ms total",
                    output.bank.as_deref().unwrap_or("?"),
                    dim(&output.stats.total_input_tokens.to_string()),
                    dim(&output.stats.total_output_tokens.to_string()),
                    output.stats.total_time_ms,
                );
            }
        }
    }

    Ok(())
}

/// Map CLI args to `ExtractionConfig`.
async fn build_config(
    cli: &Cli,
    registry: BankRegistry,
    progress: Option<ProgressCallback>,
) -> Result<ExtractionConfig> {
    let mut builder = ExtractionConfig::builder()
        .registry(Arc::new(registry))
        .pages(parse_pages(&cli.pages)?)
        .concurrency(cli.concurrency)
        .max_tokens(cli.max_tokens)
        .temperature(cli.temperature)
        .max_retries(cli.max_retries)
        .max_rendered_pixels(cli.max_pixels)
        .transcribe_scanned_pages(!cli.no_transcribe)
        .download_timeout_secs(cli.download_timeout)
        .api_timeout_secs(cli.api_timeout);

    if let Some(ref path) = cli.system_prompt {
        let prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read system prompt from {:?}", path))?;
        builder = builder.system_prompt(prompt);
    }
    if let Some(ref bank) = cli.bank {
        builder = builder.bank(bank);
    }
    if let Some(ref model) = cli.model {
        builder = builder.model(model);
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider);
    }
    if let Some(ref password) = cli.password {
        builder = builder.password(password);
    }
    if let Some(ref dir) = cli.labeled_pages {
        builder = builder.labeled_pages_dir(dir);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

fn print_banks(registry: &BankRegistry) {
    for bank in registry.banks() {
        if bank.aliases.is_empty() {
            println!("{}", bold(&bank.name));
        } else {
            println!("{}  {}", bold(&bank.name), dim(&format!("(also: {})", bank.aliases.join(", "))));
        }
        for entry in bank.fields.entries() {
            println!("  {:<20} {}", cyan(&entry.category), entry.fields.join(", "));
        }
    }
}

/// Parse `--pages` string into `PageSelection`.
fn parse_pages(s: &str) -> Result<PageSelection> {
    let s = s.trim().to_lowercase();

    if s == "all" {
        return Ok(PageSelection::All);
    }

    // Range: "3-15"
    if let Some((start, end)) = s.split_once('-') {
        let start: usize = start.trim().parse().context("Invalid start page in range")?;
        let end: usize = end.trim().parse().context("Invalid end page in range")?;

        if start < 1 {
            anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", start);
        }
        if start > end {
            anyhow::bail!("Invalid page range '{}-{}': start must be <= end", start, end);
        }

        return Ok(PageSelection::Range(start, end));
    }

    // Set: "1,3,5,7"
    if s.contains(',') {
        let pages: Vec<usize> = s
            .split(',')
            .map(|p| {
                p.trim()
                    .parse::<usize>()
                    .with_context(|| format!("Invalid page number: '{}'", p.trim()))
            })
            .collect::<Result<Vec<_>>>()?;

        if let Some(&p) = pages.iter().find(|&&p| p < 1) {
            anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", p);
        }

        return Ok(PageSelection::Set(pages));
    }

    let page: usize = s.parse().context("Invalid page number")?;
    if page < 1 {
        anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", page);
    }

    Ok(PageSelection::Single(page))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_pages_forms() {
        assert_eq!(parse_pages("all").unwrap(), PageSelection::All);
        assert_eq!(parse_pages(" 5 ").unwrap(), PageSelection::Single(5));
        assert_eq!(parse_pages("3-15").unwrap(), PageSelection::Range(3, 15));
        assert_eq!(parse_pages("1,3,5").unwrap(), PageSelection::Set(vec![1, 3, 5]));
    }

    #[test]
    fn parse_pages_rejects_bad_input() {
        assert!(parse_pages("0").is_err());
        assert!(parse_pages("9-2").is_err());
        assert!(parse_pages("1,x").is_err());
        assert!(parse_pages("0,2").is_err());
    }

    #[test]
    fn classify_only_finish_closes_spinner_without_job_bar() {
        let cb = CliProgressCallback::new();
        cb.on_document_start(12);
        cb.on_page_classified(1, &["bank_copy".to_string()]);
        cb.finish_routing();
        assert!(cb.bar.is_finished());
        assert!(!cb.jobs_started.load(Ordering::SeqCst));
    }

    #[test]
    fn cli_requires_input_unless_listing_banks() {
        assert!(Cli::try_parse_from(["loanscan", "--list-banks"]).is_ok());
        assert!(Cli::try_parse_from(["loanscan", "--bank", "X"]).is_err());
        let cli = Cli::try_parse_from(["loanscan", "letter.pdf", "--classify-only"]).unwrap();
        assert_eq!(cli.input.as_deref(), Some("letter.pdf"));
        assert!(cli.classify_only);
    }
}
