//! The page classifier: one left-to-right pass that labels every page.
//!
//! ## Continuations
//!
//! Facility letters routinely run a section over a page break: the facility
//! table starts at the bottom of page 6 and its "Total" row sits on page 7.
//! When a rule decides a section continues ([`RuleMatch::Continues`]), the page
//! is labelled `<category>_1` and the category is recorded as *pending* in
//! [`ClassifierState`]. The very next page then receives `<category>_2` before
//! any of its own markers are considered, and the flag is cleared. A pending
//! flag never looks further than one page ahead.
//!
//! ## Why the state is a value
//!
//! [`classify_page`] is a pure transition `(state, page) -> (state', labels)`.
//! A fresh [`ClassifierState`] is created for every document, so nothing
//! leaks between runs, and the strictly sequential nature of the pass is
//! visible in the types: page *i + 1* cannot be classified without the state
//! returned for page *i*.
//!
//! ## Failure
//!
//! If a page cannot be evaluated, [`classify_page`] returns the error and the
//! driver ([`classify_pages`]) continues with [`ClassifierState::default`]:
//! every pending flag is dropped, so a stale continuation can never land on an
//! unrelated later page.

use super::markers::normalise;
use super::rules::{CategoryRule, RuleMatch};
use crate::error::PageError;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};

/// A page as the classifier sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    /// 1-indexed position in the document.
    pub ordinal: usize,
    /// Extracted text, or the reason none could be obtained.
    pub text: Result<String, PageError>,
}

impl Page {
    pub fn new(ordinal: usize, text: impl Into<String>) -> Self {
        Self {
            ordinal,
            text: Ok(text.into()),
        }
    }

    pub fn unreadable(ordinal: usize, error: PageError) -> Self {
        Self {
            ordinal,
            text: Err(error),
        }
    }
}

/// A category tag with an optional part index, e.g. `subject_of_fa_1`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PageLabel {
    pub category: String,
    pub part: Option<u32>,
}

impl PageLabel {
    pub fn whole(category: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            part: None,
        }
    }

    pub fn part(category: impl Into<String>, part: u32) -> Self {
        Self {
            category: category.into(),
            part: Some(part),
        }
    }

    /// Parse a label string. A trailing `_<digits>` is read as the part index.
    pub fn parse(s: &str) -> Self {
        if let Some((base, suffix)) = s.rsplit_once('_') {
            if !base.is_empty() && !suffix.is_empty() && suffix.bytes().all(|b| b.is_ascii_digit()) {
                if let Ok(part) = suffix.parse::<u32>() {
                    return Self::part(base, part);
                }
            }
        }
        Self::whole(s)
    }
}

impl fmt::Display for PageLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.part {
            Some(n) => write!(f, "{}_{}", self.category, n),
            None => f.write_str(&self.category),
        }
    }
}

impl Serialize for PageLabel {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PageLabel {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(PageLabel::parse(&s))
    }
}

/// Pending continuations carried from one page to the next.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassifierState {
    /// Categories awaiting their `_2` page, in the order they were flagged.
    pending: Vec<String>,
}

impl ClassifierState {
    pub fn is_pending(&self, category: &str) -> bool {
        self.pending.iter().any(|c| c == category)
    }

    pub fn pending(&self) -> &[String] {
        &self.pending
    }

    fn flag(&mut self, category: String) {
        if !self.is_pending(&category) {
            self.pending.push(category);
        }
    }
}

/// Classify one page.
///
/// Pending continuations from `state` are emitted first as `<category>_2`,
/// regardless of the page's own content; then every rule is evaluated in table
/// order and all hits are collected. Exact duplicate labels are collapsed.
///
/// When one rule finishes a category on this page and another starts it
/// (`property_details` and `property_details_1`), the finished label wins:
/// `_1` is dropped and no continuation is carried for that category.
pub fn classify_page(
    state: &ClassifierState,
    rules: &[CategoryRule],
    page: &Page,
) -> Result<(ClassifierState, Vec<PageLabel>), PageError> {
    let text = page.text.as_ref().map_err(|e| PageError::Unreadable {
        page: page.ordinal,
        detail: e.to_string(),
    })?;
    let text = normalise(text);

    let mut labels: Vec<PageLabel> = state
        .pending
        .iter()
        .map(|c| PageLabel::part(c.as_str(), 2))
        .collect();
    let hits: Vec<RuleMatch> = rules.iter().filter_map(|r| r.evaluate(&text)).collect();
    let finished = |category: &str| {
        hits.iter()
            .any(|h| matches!(h, RuleMatch::Complete(c) if c == category))
    };

    let mut next = ClassifierState::default();
    for hit in &hits {
        let label = match hit {
            RuleMatch::Complete(category) => PageLabel::whole(category.as_str()),
            RuleMatch::Continues(category) if finished(category.as_str()) => continue,
            RuleMatch::Continues(category) => {
                next.flag(category.clone());
                PageLabel::part(category.as_str(), 1)
            }
        };
        if !labels.contains(&label) {
            labels.push(label);
        }
    }

    Ok((next, labels))
}

/// Classification outcome for one page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageAssignment {
    /// 1-indexed page ordinal.
    pub page: usize,
    pub labels: Vec<PageLabel>,
    /// Set when the page could not be evaluated; `labels` is then empty.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<PageError>,
}

/// Classify a whole document in ascending page order.
///
/// `rules` is `None` for a bank without a registered rule set, in which case
/// every page gets an empty label list.
pub fn classify_pages(rules: Option<&[CategoryRule]>, pages: &[Page]) -> Vec<PageAssignment> {
    let Some(rules) = rules else {
        return pages
            .iter()
            .map(|p| PageAssignment {
                page: p.ordinal,
                labels: Vec::new(),
                error: None,
            })
            .collect();
    };

    let mut ordered: Vec<&Page> = pages.iter().collect();
    ordered.sort_by_key(|p| p.ordinal);

    let mut state = ClassifierState::default();
    let mut out = Vec::with_capacity(ordered.len());

    for page in ordered {
        match classify_page(&state, rules, page) {
            Ok((next, labels)) => {
                debug!(
                    "Page {}: {:?}",
                    page.ordinal,
                    labels.iter().map(|l| l.to_string()).collect::<Vec<_>>()
                );
                state = next;
                out.push(PageAssignment {
                    page: page.ordinal,
                    labels,
                    error: None,
                });
            }
            Err(e) => {
                if !state.pending().is_empty() {
                    warn!(
                        "Page {}: dropping pending continuations {:?}",
                        page.ordinal,
                        state.pending()
                    );
                }
                warn!("{}", e);
                state = ClassifierState::default();
                out.push(PageAssignment {
                    page: page.ordinal,
                    labels: Vec::new(),
                    error: Some(e),
                });
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::rules::{canonical_layout, LayoutMarkers};

    fn rules() -> Vec<CategoryRule> {
        canonical_layout(&LayoutMarkers::default())
    }

    fn labels_of(a: &PageAssignment) -> Vec<String> {
        a.labels.iter().map(|l| l.to_string()).collect()
    }

    #[test]
    fn label_display_and_parse() {
        assert_eq!(PageLabel::part("subject_of_fa", 1).to_string(), "subject_of_fa_1");
        assert_eq!(PageLabel::whole("bank_copy").to_string(), "bank_copy");
        assert_eq!(PageLabel::parse("guarantor_details_2"), PageLabel::part("guarantor_details", 2));
        assert_eq!(PageLabel::parse("law_firm_details"), PageLabel::whole("law_firm_details"));
        assert_eq!(PageLabel::parse("_3"), PageLabel::whole("_3"));
    }

    #[test]
    fn facility_with_total_is_self_contained() {
        let page = Page::new(1, "Type of Facility: Term Loan RM500,000. Total: RM500,000");
        let (state, labels) = classify_page(&ClassifierState::default(), &rules(), &page).unwrap();
        assert_eq!(labels, vec![PageLabel::whole("subject_of_fa")]);
        assert!(state.pending().is_empty());
    }

    #[test]
    fn facility_without_total_spills_to_next_page() {
        let pages = vec![
            Page::new(1, "Type of Facility: Overdraft (OD)"),
            Page::new(2, "Interest rate schedule"),
            Page::new(3, "Interest rate schedule"),
        ];
        let out = classify_pages(Some(&rules()), &pages);
        assert_eq!(labels_of(&out[0]), vec!["subject_of_fa_1"]);
        assert_eq!(labels_of(&out[1]), vec!["subject_of_fa_2"]);
        assert!(out[2].labels.is_empty(), "continuation must not reach page 3");
    }

    #[test]
    fn continuation_and_fresh_match_on_same_page() {
        let pages = vec![
            Page::new(1, "Facility Type: Term Loan"),
            Page::new(2, "BANK COPY"),
        ];
        let out = classify_pages(Some(&rules()), &pages);
        assert_eq!(labels_of(&out[1]), vec!["subject_of_fa_2", "bank_copy"]);
    }

    #[test]
    fn multiple_top_level_matches_all_emitted() {
        let page = Page::new(
            1,
            "BANK COPY ... Messrs Tan & Co, Advocates & Solicitors ... Facility amount ... Total",
        );
        let (_, labels) = classify_page(&ClassifierState::default(), &rules(), &page).unwrap();
        let names: Vec<String> = labels.iter().map(|l| l.to_string()).collect();
        assert_eq!(names, vec!["bank_copy", "law_firm_details", "subject_of_fa"]);
    }

    #[test]
    fn finished_label_suppresses_part_one_of_same_category() {
        let pages = vec![
            Page::new(
                1,
                "Documents to be executed: charge over the property with title. \
                 Property to be financed: Lot 12",
            ),
            Page::new(2, "Interest rate schedule"),
        ];
        let out = classify_pages(Some(&rules()), &pages);
        assert_eq!(labels_of(&out[0]), vec!["property_details"]);
        assert!(out[1].labels.is_empty(), "no continuation for a finished category");
    }

    #[test]
    fn security_section_without_sub_marker_continues_as_guarantor() {
        let pages = vec![
            Page::new(1, "Documents to be executed:"),
            Page::new(2, "1. Letter of Guarantee by Ali bin Abu"),
        ];
        let out = classify_pages(Some(&rules()), &pages);
        assert_eq!(labels_of(&out[0]), vec!["guarantor_details_1"]);
        assert_eq!(labels_of(&out[1]), vec!["guarantor_details_2"]);
    }

    #[test]
    fn property_to_finance_with_title_marker_is_terminal() {
        let page = Page::new(1, "Property to be financed: Individual Title HSD 2332");
        let (state, labels) = classify_page(&ClassifierState::default(), &rules(), &page).unwrap();
        assert_eq!(labels, vec![PageLabel::whole("property_details")]);
        assert!(!state.is_pending("property_details"));
    }

    #[test]
    fn two_pending_flags_emit_in_flag_order() {
        let pages = vec![
            Page::new(1, "Type of facility ... Property to be financed:"),
            Page::new(2, ""),
        ];
        let out = classify_pages(Some(&rules()), &pages);
        assert_eq!(labels_of(&out[0]), vec!["subject_of_fa_1", "property_details_1"]);
        assert_eq!(labels_of(&out[1]), vec!["subject_of_fa_2", "property_details_2"]);
    }

    #[test]
    fn unreadable_page_resets_pending_state() {
        let pages = vec![
            Page::new(1, "Type of facility: Overdraft"),
            Page::unreadable(
                2,
                PageError::RenderFailed {
                    page: 2,
                    detail: "bitmap".into(),
                },
            ),
            Page::new(3, "Schedule"),
        ];
        let out = classify_pages(Some(&rules()), &pages);
        assert_eq!(labels_of(&out[0]), vec!["subject_of_fa_1"]);
        assert!(out[1].labels.is_empty());
        assert!(matches!(out[1].error, Some(PageError::Unreadable { page: 2, .. })));
        assert!(out[2].labels.is_empty(), "stale continuation leaked past an error");
    }

    #[test]
    fn unknown_bank_yields_empty_labels() {
        let pages = vec![Page::new(1, "BANK COPY"), Page::new(2, "Type of facility")];
        let out = classify_pages(None, &pages);
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|a| a.labels.is_empty() && a.error.is_none()));
    }

    #[test]
    fn pages_are_processed_in_ordinal_order() {
        let pages = vec![Page::new(2, "continues"), Page::new(1, "Type of facility: Term Loan")];
        let out = classify_pages(Some(&rules()), &pages);
        assert_eq!(out[0].page, 1);
        assert_eq!(labels_of(&out[1]), vec!["subject_of_fa_2"]);
    }

    #[test]
    fn classification_is_deterministic() {
        let pages = vec![
            Page::new(1, "BANK COPY"),
            Page::new(2, "Type of facility"),
            Page::new(3, "Documents to be executed"),
            Page::new(4, "Property to be financed"),
            Page::new(5, "anything"),
        ];
        let a = classify_pages(Some(&rules()), &pages);
        let b = classify_pages(Some(&rules()), &pages);
        assert_eq!(a, b);
    }

    #[test]
    fn label_serialises_as_plain_string() {
        let json = serde_json::to_string(&PageLabel::part("subject_of_fa", 2)).unwrap();
        assert_eq!(json, "\"subject_of_fa_2\"");
        let back: PageLabel = serde_json::from_str(&json).unwrap();
        assert_eq!(back, PageLabel::part("subject_of_fa", 2));
    }
}
