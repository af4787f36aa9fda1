//! Response parsing: raw VLM text → field dictionary.
//!
//! Models are asked for a bare JSON object and mostly comply, but the raw
//! text still needs a few deterministic passes before it can be trusted:
//!
//! 1. strip invisible Unicode (BOM, zero-width spaces) and CRLF line endings
//! 2. strip an outer ```` ```json ```` fence
//! 3. cut out the outermost `{ … }` span, dropping chatter around it
//! 4. parse; a non-object or unparsable body is a malformed response
//! 5. drop placeholder values such as `"N/A"` or `"not found"`
//!
//! A response that contains no JSON at all but says "nothing" or "not found"
//! is the model's way of reporting an empty page. That is [`PageError::NoContent`],
//! not a malformed response, so the two can be counted separately.

use crate::error::PageError;
use crate::merge::{FieldValue, PageFieldResult};
use crate::plan::ExtractionJob;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

/// Parse one extraction response into a [`PageFieldResult`].
///
/// Requested fields come first, in the job's order; any other keys the model
/// returned follow in key order. The merge does not care which keys it sees.
pub fn parse_extraction(job: &ExtractionJob, raw: &str) -> Result<PageFieldResult, PageError> {
    let label = job.label.to_string();
    let cleaned = remove_invisible_chars(&normalise_line_endings(raw));
    let body = strip_code_fences(cleaned.trim());

    if body.trim().is_empty() {
        return Err(PageError::NoContent {
            page: job.page,
            label,
        });
    }

    let Some(object_text) = outermost_object(body) else {
        if reports_nothing(body) {
            return Err(PageError::NoContent {
                page: job.page,
                label,
            });
        }
        return Err(PageError::MalformedResponse {
            page: job.page,
            label,
            detail: format!("no JSON object in response: {}", preview(body)),
        });
    };

    let value: Value =
        serde_json::from_str(object_text).map_err(|e| PageError::MalformedResponse {
            page: job.page,
            label: label.clone(),
            detail: e.to_string(),
        })?;

    let Value::Object(map) = value else {
        return Err(PageError::MalformedResponse {
            page: job.page,
            label,
            detail: "response is not a JSON object".into(),
        });
    };

    let convert = |v: &Value| drop_placeholders(FieldValue::from_json(&stringify_numbers(v)));
    let mut result = PageFieldResult::new(job.page, label);
    for field in &job.fields {
        if let Some(raw_value) = map.get(field) {
            result.fields.push((field.clone(), convert(raw_value)));
        }
    }
    for (key, raw_value) in &map {
        if !job.fields.contains(key) {
            result.fields.push((key.clone(), convert(raw_value)));
        }
    }
    Ok(result)
}

/// Clean a bank-name answer: first non-empty line, quotes and labels removed.
pub fn parse_bank_name(raw: &str) -> Option<String> {
    let cleaned = remove_invisible_chars(&normalise_line_endings(raw));
    let body = strip_code_fences(cleaned.trim());
    let line = body.lines().map(str::trim).find(|l| !l.is_empty())?;
    let line = RE_BANK_LABEL.replace(line, "");
    let name = line
        .trim()
        .trim_matches(|c: char| c == '"' || c == '\'' || c == '*' || c == '.')
        .trim();
    if name.is_empty() || is_placeholder(name) {
        None
    } else {
        Some(name.to_string())
    }
}

/// Clean a page transcription for the classifier.
pub fn clean_transcription(raw: &str) -> String {
    let cleaned = remove_invisible_chars(&normalise_line_endings(raw));
    strip_code_fences(cleaned.trim()).trim().to_string()
}

// ── Line endings and invisible characters ────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

fn remove_invisible_chars(input: &str) -> String {
    input.replace(['\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}'], "")
}

// ── Fences ───────────────────────────────────────────────────────────────────

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```[A-Za-z]*[ \t]*\n?(.*?)\n?```\s*$").unwrap());

fn strip_code_fences(input: &str) -> &str {
    match RE_OUTER_FENCES.captures(input).and_then(|c| c.get(1)) {
        Some(m) => m.as_str(),
        None => input,
    }
}

// ── Object extraction ────────────────────────────────────────────────────────

fn outermost_object(input: &str) -> Option<&str> {
    let start = input.find('{')?;
    let end = input.rfind('}')?;
    (end > start).then(|| &input[start..=end])
}

static RE_NOTHING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(nothing|not found)\b").unwrap());

fn reports_nothing(input: &str) -> bool {
    RE_NOTHING.is_match(input)
}

fn preview(input: &str) -> String {
    let mut s: String = input.chars().take(80).collect();
    if input.chars().count() > 80 {
        s.push('…');
    }
    s
}

// ── Values ───────────────────────────────────────────────────────────────────

/// Amounts sometimes come back as JSON numbers; keep them as text.
fn stringify_numbers(value: &Value) -> Value {
    match value {
        Value::Number(n) => Value::String(n.to_string()),
        Value::Array(items) => Value::Array(items.iter().map(stringify_numbers).collect()),
        other => other.clone(),
    }
}

const PLACEHOLDERS: &[&str] = &["n/a", "na", "not found", "none", "null", "nil", "-", "not available"];

fn is_placeholder(s: &str) -> bool {
    let t = s.trim().to_lowercase();
    PLACEHOLDERS.contains(&t.as_str())
}

fn drop_placeholders(value: FieldValue) -> FieldValue {
    match value {
        FieldValue::Scalar(s) if is_placeholder(&s) => FieldValue::Scalar(String::new()),
        FieldValue::List(items) => {
            FieldValue::List(items.into_iter().filter(|s| !is_placeholder(s)).collect())
        }
        other => other,
    }
}

static RE_BANK_LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*(bank\s*name|bank)\s*:\s*").unwrap());
