//! Bank registry: per-bank routing rules and field maps.
//!
//! Each registered bank has a [`BankProfile`] with two static tables:
//!
//! * **rules**: the ordered [`CategoryRule`] list the classifier runs over
//!   every page of that bank's letters;
//! * **fields**: the [`FieldMap`] naming which fields to request from the VLM
//!   for a page of each category.
//!
//! The registry is plain data. [`BankRegistry::builtin`] ships the banks we
//! support out of the box; [`BankRegistry::from_json_file`] replaces them
//! with a caller-maintained table, so onboarding a new bank never requires a
//! rebuild.
//!
//! Lookups by bank name are case-insensitive exact matches (after trimming)
//! against the bank's name and aliases. There is no fuzzy
//! matching: a VLM answering "CIMB" must not silently pick up the rules of
//! "CIMB ISLAMIC BANK BERHAD".

use crate::classify::markers::{normalise, MarkerSet};
use crate::classify::rules::{canonical_layout, CategoryRule, LayoutMarkers};
use crate::error::LoanScanError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

/// Ordered mapping of category → field names.
///
/// Order matters: extraction jobs are planned in field-map order, and that
/// order decides which value the merge sees first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldMap {
    entries: Vec<FieldMapEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMapEntry {
    pub category: String,
    pub fields: Vec<String>,
}

impl FieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a category. A category that is already present keeps its
    /// position and has its field list replaced.
    pub fn with<I, S>(mut self, category: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let category = category.into();
        let mut list: Vec<String> = Vec::new();
        for f in fields {
            let f = f.into();
            if !list.contains(&f) {
                list.push(f);
            }
        }
        match self.entries.iter_mut().find(|e| e.category == category) {
            Some(existing) => existing.fields = list,
            None => self.entries.push(FieldMapEntry {
                category,
                fields: list,
            }),
        }
        self
    }

    pub fn get(&self, category: &str) -> Option<&[String]> {
        self.entries
            .iter()
            .find(|e| e.category == category)
            .map(|e| e.fields.as_slice())
    }

    /// Position of `category` in the map, used to order extraction jobs.
    pub fn position(&self, category: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.category == category)
    }

    pub fn entries(&self) -> &[FieldMapEntry] {
        &self.entries
    }

    /// Every field name across all categories, first occurrence order.
    pub fn all_fields(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for e in &self.entries {
            for f in &e.fields {
                if !out.contains(&f.as_str()) {
                    out.push(f);
                }
            }
        }
        out
    }
}

/// Everything the pipeline knows about one bank's letters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankProfile {
    /// Canonical upper-case name, e.g. `"CIMB BANK BERHAD"`.
    pub name: String,
    /// Other names the bank appears under (legal vs. brand name).
    #[serde(default)]
    pub aliases: Vec<String>,
    pub rules: Vec<CategoryRule>,
    pub fields: FieldMap,
}

impl BankProfile {
    fn answers_to(&self, key: &str) -> bool {
        self.name.trim().eq_ignore_ascii_case(key)
            || self.aliases.iter().any(|a| a.trim().eq_ignore_ascii_case(key))
    }

    fn names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str()).chain(self.aliases.iter().map(String::as_str))
    }
}

/// The full set of registered banks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankRegistry {
    /// Bank-agnostic phrases that identify the bank-copy notice page, used to
    /// find the page the bank name is read from before any bank is known.
    #[serde(default = "default_bank_copy_markers")]
    pub bank_copy_markers: MarkerSet,
    pub banks: Vec<BankProfile>,
}

fn default_bank_copy_markers() -> MarkerSet {
    MarkerSet::new(LayoutMarkers::default().bank_copy)
}

impl Default for BankRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl BankRegistry {
    /// The banks supported out of the box.
    pub fn builtin() -> Self {
        let fields = standard_field_map();
        let base = LayoutMarkers::default();

        let islamic = LayoutMarkers {
            facility: vec![
                "type of facility",
                "type of financing",
                "facility type",
                "financing amount",
            ],
            property_to_finance: vec!["property to be financed", "asset to be financed"],
            ..base.clone()
        };

        let maybank = LayoutMarkers {
            facility: vec!["type of facility", "facility type", "facility(ies)", "facility amount"],
            property_to_finance: vec!["property to be financed", "property to be purchased"],
            ..base.clone()
        };

        let rhb = LayoutMarkers {
            security_section: vec!["documents to be executed", "security documents"],
            ..base.clone()
        };

        let public_bank = LayoutMarkers {
            facility: vec!["type of facility", "facility type", "facility/limit", "facility amount"],
            facility_total: vec!["total", "aggregate limit"],
            ..base.clone()
        };

        let profile = |name: &str, aliases: &[&str], markers: &LayoutMarkers| BankProfile {
            name: name.to_string(),
            aliases: aliases.iter().map(|a| a.to_string()).collect(),
            rules: canonical_layout(markers),
            fields: fields.clone(),
        };

        Self {
            bank_copy_markers: default_bank_copy_markers(),
            banks: vec![
                profile("CIMB BANK BERHAD", &[], &base),
                profile("CIMB ISLAMIC BANK BERHAD", &[], &islamic),
                profile("MAYBANK BERHAD", &["MALAYAN BANKING BERHAD"], &maybank),
                profile("RHB BANK BERHAD", &[], &rhb),
                profile("PUBLIC BANK BERHAD", &[], &public_bank),
            ],
        }
    }

    /// Parse a registry from JSON. `source_name` is only used in errors.
    pub fn from_json_str(json: &str, source_name: &str) -> Result<Self, LoanScanError> {
        let registry: BankRegistry =
            serde_json::from_str(json).map_err(|e| LoanScanError::RulesLoadFailed {
                source_name: source_name.to_string(),
                detail: e.to_string(),
            })?;
        registry.validate(source_name)?;
        debug!("Loaded {} banks from {}", registry.banks.len(), source_name);
        Ok(registry)
    }

    /// Read and parse a registry JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, LoanScanError> {
        let path = path.as_ref();
        let source_name = path.display().to_string();
        let json = std::fs::read_to_string(path).map_err(|e| LoanScanError::RulesLoadFailed {
            source_name: source_name.clone(),
            detail: e.to_string(),
        })?;
        let registry = Self::from_json_str(&json, &source_name)?;
        info!("Bank rules loaded from {}", source_name);
        Ok(registry)
    }

    fn validate(&self, source_name: &str) -> Result<(), LoanScanError> {
        let fail = |detail: String| LoanScanError::RulesLoadFailed {
            source_name: source_name.to_string(),
            detail,
        };
        if self.banks.is_empty() {
            return Err(fail("no banks defined".into()));
        }
        for (i, bank) in self.banks.iter().enumerate() {
            if bank.name.trim().is_empty() {
                return Err(fail(format!("bank #{} has an empty name", i + 1)));
            }
            for other in &self.banks[..i] {
                if let Some(dup) = bank.names().find(|n| other.answers_to(n.trim())) {
                    return Err(fail(format!(
                        "bank name '{}' is registered twice ('{}' and '{}')",
                        dup, other.name, bank.name
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn banks(&self) -> &[BankProfile] {
        &self.banks
    }

    /// Look up a bank by name or alias (trimmed, case-insensitive, exact).
    pub fn profile(&self, bank_name: &str) -> Option<&BankProfile> {
        let key = bank_name.trim();
        if key.is_empty() {
            return None;
        }
        self.banks.iter().find(|b| b.answers_to(key))
    }

    /// The classifier rule table for a bank, if the bank is registered.
    pub fn rules_for(&self, bank_name: &str) -> Option<&[CategoryRule]> {
        self.profile(bank_name).map(|b| b.rules.as_slice())
    }

    /// Field-map lookup: which fields to extract from a page of `category`.
    ///
    /// `None` for an unknown bank or a category the bank has no field list
    /// for. Callers treat that as "skip", never as an error.
    pub fn resolve(&self, bank_name: &str, category: &str) -> Option<&[String]> {
        self.profile(bank_name)?.fields.get(category)
    }

    /// Find the registered bank whose name or alias occurs in `text`.
    ///
    /// When several occur, the longest name wins ("CIMB ISLAMIC BANK BERHAD"
    /// beats a shorter name that happens to be mentioned in a clause).
    pub fn find_bank_in_text(&self, text: &str) -> Option<&BankProfile> {
        let haystack = normalise(text);
        let mut best: Option<(&BankProfile, usize)> = None;
        for bank in &self.banks {
            for name in bank.names() {
                let needle = normalise(name);
                if needle.is_empty() || !haystack.contains(&needle) {
                    continue;
                }
                if best.map(|(_, len)| needle.len() > len).unwrap_or(true) {
                    best = Some((bank, needle.len()));
                }
            }
        }
        best.map(|(bank, _)| bank)
    }
}

/// Field list shared by every built-in bank.
fn standard_field_map() -> FieldMap {
    FieldMap::new()
        .with(
            "bank_copy",
            [
                "date",
                "borrower_name",
                "borrower_registration_number",
                "borrower_address",
                "bank_name",
                "bank_address",
                "bank_registration_number",
            ],
        )
        .with("law_firm_details", ["law_firm_name", "law_firm_address"])
        .with("subject_of_fa", ["subject_of_FA", "total_loan_amount"])
        .with(
            "guarantor_details",
            [
                "guarantor_name",
                "guarantor_nric",
                "corporate_guarantor_name",
                "corporate_guarantor_registration_number",
            ],
        )
        .with("property_details", ["property_title", "property_address"])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_banks_registered() {
        let reg = BankRegistry::builtin();
        assert_eq!(reg.banks().len(), 5);
        assert!(reg.profile("PUBLIC BANK BERHAD").is_some());
    }

    #[test]
    fn lookup_is_case_insensitive_and_trimmed() {
        let reg = BankRegistry::builtin();
        assert_eq!(reg.profile("  cimb bank berhad\n").unwrap().name, "CIMB BANK BERHAD");
        assert_eq!(reg.profile("Malayan Banking Berhad").unwrap().name, "MAYBANK BERHAD");
    }

    #[test]
    fn lookup_is_not_fuzzy() {
        let reg = BankRegistry::builtin();
        assert!(reg.profile("CIMB").is_none());
        assert!(reg.profile("CIMB BANK").is_none());
        assert!(reg.profile("").is_none());
    }

    #[test]
    fn resolve_known_category() {
        let reg = BankRegistry::builtin();
        let fields = reg.resolve("RHB BANK BERHAD", "law_firm_details").unwrap();
        assert_eq!(fields, &["law_firm_name".to_string(), "law_firm_address".to_string()]);
    }

    #[test]
    fn resolve_misses_are_none() {
        let reg = BankRegistry::builtin();
        assert!(reg.resolve("HSBC BANK MALAYSIA BERHAD", "bank_copy").is_none());
        assert!(reg.resolve("CIMB BANK BERHAD", "valuation_report").is_none());
        assert!(reg.rules_for("HSBC BANK MALAYSIA BERHAD").is_none());
    }

    #[test]
    fn every_rule_category_has_fields() {
        let reg = BankRegistry::builtin();
        for bank in reg.banks() {
            for rule in &bank.rules {
                for cat in rule.categories() {
                    assert!(bank.fields.get(cat).is_some(), "{}: no fields for {}", bank.name, cat);
                }
            }
        }
    }

    #[test]
    fn field_map_keeps_order_and_replaces_in_place() {
        let map = FieldMap::new()
            .with("a", ["x", "y", "x"])
            .with("b", ["z"])
            .with("a", ["w"]);
        assert_eq!(map.position("a"), Some(0));
        assert_eq!(map.get("a").unwrap(), &["w".to_string()]);
        assert_eq!(map.all_fields(), vec!["w", "z"]);
    }

    #[test]
    fn find_bank_prefers_longest_name() {
        let reg = BankRegistry::builtin();
        let text = "CIMB ISLAMIC BANK BERHAD (200401032872)\nLevel 13, Menara CIMB";
        assert_eq!(reg.find_bank_in_text(text).unwrap().name, "CIMB ISLAMIC BANK BERHAD");
        let text = "Malayan Banking\nBerhad (3813-K)";
        assert_eq!(reg.find_bank_in_text(text).unwrap().name, "MAYBANK BERHAD");
        assert!(reg.find_bank_in_text("Bank Negara Malaysia").is_none());
    }

    #[test]
    fn json_round_trip() {
        let reg = BankRegistry::builtin();
        let json = serde_json::to_string_pretty(&reg).unwrap();
        let back = BankRegistry::from_json_str(&json, "inline").unwrap();
        assert_eq!(back, reg);
    }

    #[test]
    fn json_minimal_bank_uses_default_bank_copy_markers() {
        let json = r#"{
            "banks": [{
                "name": "HONG LEONG BANK BERHAD",
                "rules": [
                    {"markers": ["letter of offer"], "outcome": {"kind": "terminal", "category": "bank_copy"}}
                ],
                "fields": [{"category": "bank_copy", "fields": ["date", "borrower_name"]}]
            }]
        }"#;
        let reg = BankRegistry::from_json_str(json, "inline").unwrap();
        assert!(reg.bank_copy_markers.matches("BANK COPY"));
        assert_eq!(
            reg.resolve("hong leong bank berhad", "bank_copy").unwrap().len(),
            2
        );
    }

    #[test]
    fn json_duplicate_bank_rejected() {
        let json = r#"{"banks": [
            {"name": "A BANK", "rules": [], "fields": []},
            {"name": "B BANK", "aliases": ["a bank"], "rules": [], "fields": []}
        ]}"#;
        let err = BankRegistry::from_json_str(json, "dup.json").unwrap_err();
        assert!(err.to_string().contains("registered twice"), "got: {err}");
    }

    #[test]
    fn json_empty_registry_rejected() {
        let err = BankRegistry::from_json_str(r#"{"banks": []}"#, "empty.json").unwrap_err();
        assert!(matches!(err, LoanScanError::RulesLoadFailed { .. }));
    }

    #[test]
    fn json_file_missing() {
        let err = BankRegistry::from_json_file("/definitely/not/here.json").unwrap_err();
        assert!(err.to_string().contains("/definitely/not/here.json"));
    }
}
