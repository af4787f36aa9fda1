//! VLM interaction: build vision messages and call the provider.
//!
//! Three kinds of call go through here, all sharing one retry loop:
//!
//! * [`extract_fields`]: one call per planned `(page, label)` job
//! * [`detect_bank_name`]: read the lender off the bank-copy page
//! * [`transcribe_page`]: OCR a scanned page so it can be classified
//!
//! Prompt text lives in [`crate::prompts`]; response cleanup in
//! [`super::parse`].
//!
//! ## Retry Strategy
//!
//! HTTP 429 / 503 errors from LLM APIs are transient and frequent under
//! concurrent load. Each attempt is bounded by `api_timeout_secs`, and failed
//! attempts back off exponentially (`retry_backoff_ms * 2^(retry - 1)`): with
//! 500 ms base and 3 retries the wait sequence is 500 ms → 1 s → 2 s.

use super::parse;
use crate::config::ExtractionConfig;
use crate::error::PageError;
use crate::merge::PageFieldResult;
use crate::output::JobOutcome;
use crate::plan::ExtractionJob;
use crate::prompts::{
    extraction_user_prompt, BANK_NAME_SYSTEM_PROMPT, BANK_NAME_USER_PROMPT,
    EXTRACTION_SYSTEM_PROMPT, TRANSCRIPTION_SYSTEM_PROMPT,
};
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider};
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, warn};

/// A successful provider reply.
#[derive(Debug, Clone)]
pub struct LlmReply {
    pub content: String,
    pub input_tokens: usize,
    pub output_tokens: usize,
    pub retries: u32,
}

/// Why a call produced no reply.
#[derive(Debug, Clone, PartialEq, Eq)]
enum CallFailure {
    /// The final attempt hit the per-call timeout.
    TimedOut { secs: u64 },
    /// Every attempt returned a provider error.
    Exhausted { retries: u32, detail: String },
}

/// Run one extraction job.
///
/// Never fails: the outcome's `error` says whether the returned fields are
/// present. A failed job contributes nothing to the merge.
pub async fn extract_fields(
    provider: &Arc<dyn LLMProvider>,
    job: &ExtractionJob,
    image_data: ImageData,
    config: &ExtractionConfig,
) -> (JobOutcome, Option<PageFieldResult>) {
    let start = Instant::now();
    let label = job.label.to_string();
    let system_prompt = config
        .system_prompt
        .as_deref()
        .unwrap_or(EXTRACTION_SYSTEM_PROMPT);

    let messages = vec![
        ChatMessage::system(system_prompt),
        ChatMessage::user_with_images(
            extraction_user_prompt(&label, &job.fields),
            vec![image_data],
        ),
    ];
    let options = build_options(config);
    let what = format!("Page {} ({})", job.page, label);

    let mut outcome = JobOutcome {
        job: job.clone(),
        field_count: 0,
        input_tokens: 0,
        output_tokens: 0,
        duration_ms: 0,
        error: None,
    };

    let parsed = match chat_with_retry(provider, &messages, &options, config, &what).await {
        Ok(reply) => {
            outcome.input_tokens = reply.input_tokens;
            outcome.output_tokens = reply.output_tokens;
            parse::parse_extraction(job, &reply.content)
        }
        Err(CallFailure::TimedOut { secs }) => Err(PageError::Timeout {
            page: job.page,
            secs,
        }),
        Err(CallFailure::Exhausted { retries, detail }) => Err(PageError::LlmFailed {
            page: job.page,
            label: label.clone(),
            retries,
            detail,
        }),
    };
    outcome.duration_ms = start.elapsed().as_millis() as u64;

    match parsed {
        Ok(result) => {
            outcome.field_count = result
                .fields
                .iter()
                .filter(|(_, v)| !v.normalised().is_empty())
                .count();
            debug!("{}: {} non-empty fields", what, outcome.field_count);
            (outcome, Some(result))
        }
        Err(e) => {
            warn!("{}", e);
            outcome.error = Some(e);
            (outcome, None)
        }
    }
}

/// Ask the VLM which bank issued the letter.
///
/// Returns the cleaned answer (which may still be an unregistered name) and
/// the tokens spent. Failures are logged and yield `None`.
pub async fn detect_bank_name(
    provider: &Arc<dyn LLMProvider>,
    page_num: usize,
    image_data: ImageData,
    config: &ExtractionConfig,
) -> (Option<String>, usize, usize) {
    let messages = vec![
        ChatMessage::system(BANK_NAME_SYSTEM_PROMPT),
        ChatMessage::user_with_images(BANK_NAME_USER_PROMPT, vec![image_data]),
    ];
    let options = CompletionOptions {
        temperature: Some(0.0),
        max_tokens: Some(64),
        ..Default::default()
    };
    let what = format!("Page {} (bank name)", page_num);

    match chat_with_retry(provider, &messages, &options, config, &what).await {
        Ok(reply) => {
            let name = parse::parse_bank_name(&reply.content);
            debug!("{}: VLM answered {:?}", what, name);
            (name, reply.input_tokens, reply.output_tokens)
        }
        Err(failure) => {
            warn!("{}: bank detection failed: {:?}", what, failure);
            (None, 0, 0)
        }
    }
}

/// Transcribe a page that has no PDF text layer.
pub async fn transcribe_page(
    provider: &Arc<dyn LLMProvider>,
    page_num: usize,
    image_data: ImageData,
    config: &ExtractionConfig,
) -> Result<LlmReply, PageError> {
    let messages = vec![
        ChatMessage::system(TRANSCRIPTION_SYSTEM_PROMPT),
        ChatMessage::user_with_images("", vec![image_data]),
    ];
    let options = CompletionOptions {
        temperature: Some(0.0),
        max_tokens: Some(config.max_tokens.max(4096)),
        ..Default::default()
    };
    let what = format!("Page {} (transcription)", page_num);

    match chat_with_retry(provider, &messages, &options, config, &what).await {
        Ok(mut reply) => {
            reply.content = parse::clean_transcription(&reply.content);
            Ok(reply)
        }
        Err(CallFailure::TimedOut { secs }) => Err(PageError::TranscriptionFailed {
            page: page_num,
            detail: format!("timed out after {}s", secs),
        }),
        Err(CallFailure::Exhausted { retries, detail }) => Err(PageError::TranscriptionFailed {
            page: page_num,
            detail: format!("failed after {} retries: {}", retries, detail),
        }),
    }
}

/// Send `messages`, retrying with exponential backoff.
async fn chat_with_retry(
    provider: &Arc<dyn LLMProvider>,
    messages: &[ChatMessage],
    options: &CompletionOptions,
    config: &ExtractionConfig,
    what: &str,
) -> Result<LlmReply, CallFailure> {
    let call_timeout = Duration::from_secs(config.api_timeout_secs);
    let mut last_failure = CallFailure::Exhausted {
        retries: 0,
        detail: "Unknown error".to_string(),
    };

    for attempt in 0..=config.max_retries {
        if attempt > 0 {
            let backoff = backoff_ms(config.retry_backoff_ms, attempt);
            warn!(
                "{}: retry {}/{} after {}ms",
                what, attempt, config.max_retries, backoff
            );
            sleep(Duration::from_millis(backoff)).await;
        }

        match timeout(call_timeout, provider.chat(messages, Some(options))).await {
            Ok(Ok(response)) => {
                debug!(
                    "{}: {} input tokens, {} output tokens",
                    what, response.prompt_tokens, response.completion_tokens
                );
                return Ok(LlmReply {
                    content: response.content,
                    input_tokens: response.prompt_tokens,
                    output_tokens: response.completion_tokens,
                    retries: attempt,
                });
            }
            Ok(Err(e)) => {
                let err_msg = format!("{}", e);
                warn!("{}: attempt {} failed: {}", what, attempt + 1, err_msg);
                last_failure = CallFailure::Exhausted {
                    retries: attempt,
                    detail: err_msg,
                };
            }
            Err(_) => {
                warn!(
                    "{}: attempt {} timed out after {}s",
                    what,
                    attempt + 1,
                    config.api_timeout_secs
                );
                last_failure = CallFailure::TimedOut {
                    secs: config.api_timeout_secs,
                };
            }
        }
    }

    Err(last_failure)
}

/// Wait before retry number `attempt` (1-based). Saturates instead of
/// overflowing for large retry counts.
fn backoff_ms(base_ms: u64, attempt: u32) -> u64 {
    base_ms.saturating_mul(2u64.saturating_pow(attempt.saturating_sub(1)))
}

/// Build `CompletionOptions` for field extraction from the config.
fn build_options(config: &ExtractionConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_tokens),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_options_defaults() {
        let config = ExtractionConfig::default();
        let opts = build_options(&config);
        assert_eq!(opts.temperature, Some(0.3));
        assert_eq!(opts.max_tokens, Some(2048));
    }

    #[test]
    fn backoff_doubles_per_retry() {
        assert_eq!(backoff_ms(500, 1), 500);
        assert_eq!(backoff_ms(500, 2), 1000);
        assert_eq!(backoff_ms(500, 3), 2000);
    }

    #[test]
    fn backoff_saturates_for_large_retry_counts() {
        assert_eq!(backoff_ms(500, 65), u64::MAX);
        assert_eq!(backoff_ms(500, u32::MAX), u64::MAX);
        assert_eq!(backoff_ms(0, 200), 0);
    }

    #[test]
    fn build_options_follow_config() {
        let config = ExtractionConfig::builder()
            .temperature(0.0)
            .max_tokens(512)
            .build()
            .unwrap();
        let opts = build_options(&config);
        assert_eq!(opts.temperature, Some(0.0));
        assert_eq!(opts.max_tokens, Some(512));
    }
}
