//! Text marker matching: does a page's text contain any of a set of phrases?
//!
//! Page text arrives from two very different sources (the PDF text layer and
//! a VLM transcription of a scanned image), so a phrase like "Documents to be
//! Executed" may show up in any casing and with a line break or double space
//! in the middle. Both the page text and the markers are therefore reduced to
//! the same normal form before a plain substring search: lowercase, with every
//! whitespace run collapsed to a single space.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static RE_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Lowercase `text` and collapse whitespace runs to a single space.
pub fn normalise(text: &str) -> String {
    RE_WHITESPACE
        .replace_all(text.trim(), " ")
        .to_lowercase()
}

/// Returns true if any marker occurs in `text` (case-insensitive).
///
/// Empty markers never match. For repeated evaluation against the same page,
/// normalise the text once and use [`MarkerSet::matches_normalised`].
pub fn contains_any<S: AsRef<str>>(text: &str, markers: &[S]) -> bool {
    let haystack = normalise(text);
    markers.iter().any(|m| {
        let needle = normalise(m.as_ref());
        !needle.is_empty() && haystack.contains(&needle)
    })
}

/// An immutable set of marker phrases, stored pre-normalised.
///
/// Deserialises from a plain JSON array of strings so rule tables stay
/// readable: `["documents to be executed", "security documents"]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct MarkerSet {
    phrases: Vec<String>,
}

impl MarkerSet {
    pub fn new<I, S>(phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut normalised: Vec<String> = Vec::new();
        for p in phrases {
            let n = normalise(p.as_ref());
            if !n.is_empty() && !normalised.contains(&n) {
                normalised.push(n);
            }
        }
        Self { phrases: normalised }
    }

    pub fn is_empty(&self) -> bool {
        self.phrases.is_empty()
    }

    pub fn phrases(&self) -> &[String] {
        &self.phrases
    }

    /// Test raw page text.
    pub fn matches(&self, text: &str) -> bool {
        self.matches_normalised(&normalise(text))
    }

    /// Test text that has already been through [`normalise`].
    pub fn matches_normalised(&self, normalised_text: &str) -> bool {
        self.phrases.iter().any(|p| normalised_text.contains(p.as_str()))
    }
}

impl From<Vec<String>> for MarkerSet {
    fn from(v: Vec<String>) -> Self {
        MarkerSet::new(v)
    }
}

impl From<MarkerSet> for Vec<String> {
    fn from(m: MarkerSet) -> Self {
        m.phrases
    }
}
