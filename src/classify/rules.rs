//! Declarative page-routing rules.
//!
//! A bank's layout is described as an ordered list of [`CategoryRule`]s. Each
//! rule has a trigger [`MarkerSet`] and a [`RuleOutcome`] that says which label
//! the page receives and whether the section is expected to spill onto the
//! next page. One generic evaluator ([`CategoryRule::evaluate`]) interprets
//! every outcome kind, so supporting a new bank layout is a matter of writing
//! rule data, not code.

use super::markers::MarkerSet;
use serde::{Deserialize, Serialize};

/// One row of a bank's rule table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRule {
    /// Any of these phrases on the page triggers the rule.
    pub markers: MarkerSet,
    pub outcome: RuleOutcome,
}

/// What a triggered rule emits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RuleOutcome {
    /// The section always fits on one page.
    Terminal { category: String },

    /// Self-contained when any `complete_when` phrase is on the same page;
    /// otherwise the page is part 1 and the next page is part 2.
    Spill {
        category: String,
        complete_when: MarkerSet,
    },

    /// A heading shared by several sections. The first branch whose markers
    /// hit decides the (terminal) category; with no branch hit, the page is
    /// part 1 of `fallback` and the next page is part 2.
    Disambiguate {
        branches: Vec<Branch>,
        fallback: String,
    },
}

/// A sub-marker set that resolves a [`RuleOutcome::Disambiguate`] rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    pub markers: MarkerSet,
    pub category: String,
}

/// The decision of a single rule for a single page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleMatch {
    /// Emit the bare category.
    Complete(String),
    /// Emit `<category>_1` and carry a continuation to the next page.
    Continues(String),
}

impl CategoryRule {
    pub fn terminal(category: impl Into<String>, markers: MarkerSet) -> Self {
        Self {
            markers,
            outcome: RuleOutcome::Terminal {
                category: category.into(),
            },
        }
    }

    pub fn spill(category: impl Into<String>, markers: MarkerSet, complete_when: MarkerSet) -> Self {
        Self {
            markers,
            outcome: RuleOutcome::Spill {
                category: category.into(),
                complete_when,
            },
        }
    }

    pub fn disambiguate(markers: MarkerSet, branches: Vec<Branch>, fallback: impl Into<String>) -> Self {
        Self {
            markers,
            outcome: RuleOutcome::Disambiguate {
                branches,
                fallback: fallback.into(),
            },
        }
    }

    /// Evaluate this rule against already-normalised page text.
    pub fn evaluate(&self, normalised_text: &str) -> Option<RuleMatch> {
        if !self.markers.matches_normalised(normalised_text) {
            return None;
        }
        let decision = match &self.outcome {
            RuleOutcome::Terminal { category } => RuleMatch::Complete(category.clone()),
            RuleOutcome::Spill {
                category,
                complete_when,
            } => {
                if complete_when.matches_normalised(normalised_text) {
                    RuleMatch::Complete(category.clone())
                } else {
                    RuleMatch::Continues(category.clone())
                }
            }
            RuleOutcome::Disambiguate { branches, fallback } => branches
                .iter()
                .find(|b| b.markers.matches_normalised(normalised_text))
                .map(|b| RuleMatch::Complete(b.category.clone()))
                .unwrap_or_else(|| RuleMatch::Continues(fallback.clone())),
        };
        Some(decision)
    }

    /// Every category this rule can emit, in declaration order.
    pub fn categories(&self) -> Vec<&str> {
        match &self.outcome {
            RuleOutcome::Terminal { category } | RuleOutcome::Spill { category, .. } => {
                vec![category.as_str()]
            }
            RuleOutcome::Disambiguate { branches, fallback } => {
                let mut cats: Vec<&str> = branches.iter().map(|b| b.category.as_str()).collect();
                if !cats.contains(&fallback.as_str()) {
                    cats.push(fallback.as_str());
                }
                cats
            }
        }
    }
}

/// The canonical four-section facility-letter layout: bank-copy notice,
/// law-firm details, facility subject, and the security section with its
/// guarantor / property split.
///
/// Banks whose letters follow this layout with different wording pass their
/// own marker phrases through [`LayoutMarkers`].
pub fn canonical_layout(m: &LayoutMarkers) -> Vec<CategoryRule> {
    vec![
        CategoryRule::terminal("bank_copy", MarkerSet::new(&m.bank_copy)),
        CategoryRule::terminal("law_firm_details", MarkerSet::new(&m.law_firm)),
        CategoryRule::spill(
            "subject_of_fa",
            MarkerSet::new(&m.facility),
            MarkerSet::new(&m.facility_total),
        ),
        CategoryRule::disambiguate(
            MarkerSet::new(&m.security_section),
            vec![
                Branch {
                    markers: MarkerSet::new(&m.guarantee),
                    category: "guarantor_details".into(),
                },
                Branch {
                    markers: MarkerSet::new(&m.property_with),
                    category: "property_details".into(),
                },
            ],
            "guarantor_details",
        ),
        CategoryRule::spill(
            "property_details",
            MarkerSet::new(&m.property_to_finance),
            MarkerSet::new(&m.title_type),
        ),
    ]
}

/// Marker phrases plugged into [`canonical_layout`].
#[derive(Debug, Clone)]
pub struct LayoutMarkers {
    pub bank_copy: Vec<&'static str>,
    pub law_firm: Vec<&'static str>,
    pub facility: Vec<&'static str>,
    pub facility_total: Vec<&'static str>,
    pub security_section: Vec<&'static str>,
    pub guarantee: Vec<&'static str>,
    pub property_with: Vec<&'static str>,
    pub property_to_finance: Vec<&'static str>,
    pub title_type: Vec<&'static str>,
}

impl Default for LayoutMarkers {
    fn default() -> Self {
        Self {
            bank_copy: vec!["bank copy", "bank's copy", "salinan bank"],
            law_firm: vec![
                "advocates & solicitors",
                "advocates and solicitors",
                "peguambela dan peguamcara",
            ],
            facility: vec!["type of facility", "facility type", "facility amount"],
            facility_total: vec!["total"],
            security_section: vec!["documents to be executed"],
            guarantee: vec!["guarantee", "jaminan"],
            property_with: vec!["property with"],
            property_to_finance: vec!["property to be financed"],
            title_type: vec!["individual title", "strata title", "master title"],
        }
    }
}
