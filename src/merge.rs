//! Folding per-page field dictionaries into one record.
//!
//! The same field routinely comes back from several pages: the borrower's name
//! is on the bank copy *and* the facility page, a guarantor list starts on one
//! page and finishes on the next, and the VLM sometimes returns a list where a
//! scalar was expected. [`merge`] reconciles all of that with three rules:
//!
//! 1. every value is normalised to a list of trimmed, non-empty strings;
//! 2. a string is appended to its field only if it is not already there
//!    (first occurrence keeps its position);
//! 3. on finalisation one value collapses to a scalar, none becomes `[]`,
//!    more than one stays a list.
//!
//! Rule 2 makes the merge idempotent: `merge(r) == merge(r ++ r)`. The *set*
//! of retained values does not depend on input order, but their *order* does,
//! so callers must feed results in a deterministic sequence.

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

/// A field value, tagged instead of dynamically typed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Scalar(String),
    List(Vec<String>),
    Empty,
}

impl FieldValue {
    /// Convert an arbitrary JSON value: strings become scalars, arrays keep
    /// their string elements, everything else is `Empty`.
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::String(s) => FieldValue::Scalar(s.clone()),
            serde_json::Value::Array(items) => FieldValue::List(
                items
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect(),
            ),
            _ => FieldValue::Empty,
        }
    }

    /// The trimmed, non-empty strings this value contributes to a merge.
    pub fn normalised(&self) -> Vec<&str> {
        match self {
            FieldValue::Scalar(s) => {
                let t = s.trim();
                if t.is_empty() {
                    vec![]
                } else {
                    vec![t]
                }
            }
            FieldValue::List(items) => items
                .iter()
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .collect(),
            FieldValue::Empty => vec![],
        }
    }

    /// Collapse an accumulated list by the finalisation rule.
    pub fn from_values(mut values: Vec<String>) -> Self {
        match values.len() {
            0 => FieldValue::Empty,
            1 => FieldValue::Scalar(values.remove(0)),
            _ => FieldValue::List(values),
        }
    }

    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            FieldValue::Scalar(s) => Some(s),
            _ => None,
        }
    }

    /// All strings held, in order.
    pub fn values(&self) -> Vec<&str> {
        match self {
            FieldValue::Scalar(s) => vec![s.as_str()],
            FieldValue::List(v) => v.iter().map(String::as_str).collect(),
            FieldValue::Empty => vec![],
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Scalar(s.to_string())
    }
}

impl From<Vec<&str>> for FieldValue {
    fn from(v: Vec<&str>) -> Self {
        FieldValue::List(v.into_iter().map(str::to_string).collect())
    }
}

/// `Scalar` → string, `List` → array, `Empty` → `[]`.
impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FieldValue::Scalar(s) => serializer.serialize_str(s),
            FieldValue::List(v) => v.serialize(serializer),
            FieldValue::Empty => Vec::<String>::new().serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for FieldValue {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let v = serde_json::Value::deserialize(deserializer)?;
        Ok(match FieldValue::from_json(&v) {
            FieldValue::List(items) if items.is_empty() => FieldValue::Empty,
            other => other,
        })
    }
}

/// The fields extracted from one `(page, label)` by one VLM call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageFieldResult {
    /// 1-indexed page the fields were read from.
    pub page: usize,
    /// Classifier label the page was routed under, e.g. `subject_of_fa_1`.
    pub label: String,
    pub fields: Vec<(String, FieldValue)>,
}

impl PageFieldResult {
    pub fn new(page: usize, label: impl Into<String>) -> Self {
        Self {
            page,
            label: label.into(),
            fields: Vec::new(),
        }
    }

    pub fn with(mut self, field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.push((field.into(), value.into()));
        self
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.iter().find(|(k, _)| k == field).map(|(_, v)| v)
    }
}

/// The merged document record. Keys keep the order they were first seen in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergedRecord {
    fields: Vec<(String, FieldValue)>,
}

impl MergedRecord {
    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.iter().find(|(k, _)| k == field).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl Serialize for MergedRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (k, v) in &self.fields {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

/// Ordered per-field accumulator. Not shared: each merge owns its own.
#[derive(Debug, Default)]
struct Accumulator {
    fields: Vec<(String, Vec<String>)>,
}

impl Accumulator {
    fn slot(&mut self, field: &str) -> &mut Vec<String> {
        let idx = match self.fields.iter().position(|(k, _)| k == field) {
            Some(i) => i,
            None => {
                self.fields.push((field.to_string(), Vec::new()));
                self.fields.len() - 1
            }
        };
        &mut self.fields[idx].1
    }

    fn add(&mut self, field: &str, value: &FieldValue) {
        let slot = self.slot(field);
        for s in value.normalised() {
            if !slot.iter().any(|existing| existing == s) {
                slot.push(s.to_string());
            }
        }
    }

    fn finish(self) -> MergedRecord {
        MergedRecord {
            fields: self
                .fields
                .into_iter()
                .map(|(k, v)| (k, FieldValue::from_values(v)))
                .collect(),
        }
    }
}

/// Merge per-page results into one record.
///
/// A field seen in any input is present in the output, even if every value
/// it carried was blank (it then finalises to `[]`). A field no input
/// mentions is absent.
pub fn merge<'a, I>(results: I) -> MergedRecord
where
    I: IntoIterator<Item = &'a PageFieldResult>,
{
    let mut acc = Accumulator::default();
    for result in results {
        for (field, value) in &result.fields {
            acc.add(field, value);
        }
    }
    acc.finish()
}
