//! Turning page labels into extraction requests.
//!
//! Every `(page, label)` pair the classifier emits becomes one VLM call,
//! provided the bank's field map knows the label's category. The resulting
//! jobs are ordered the way the field map is ordered (bank copy first, then
//! law firm, facility, guarantors, property), then by part index, then by
//! page. That order is the order results are merged in, so it decides which
//! spelling of a value wins when two pages disagree only in position.

use crate::classify::{PageAssignment, PageLabel};
use crate::registry::BankRegistry;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// One planned VLM extraction call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionJob {
    /// 1-indexed page ordinal.
    pub page: usize,
    pub label: PageLabel,
    /// Field names to request, in field-map order.
    pub fields: Vec<String>,
}

/// Plan extraction jobs for a classified document.
///
/// `bank` is the detected bank name; `None` or an unregistered name yields
/// no jobs at all.
pub fn plan_jobs(
    registry: &BankRegistry,
    bank: Option<&str>,
    assignments: &[PageAssignment],
) -> Vec<ExtractionJob> {
    let Some(profile) = bank.and_then(|b| registry.profile(b)) else {
        info!(
            "No field map for bank {:?}; nothing to extract",
            bank.unwrap_or("<none>")
        );
        return Vec::new();
    };

    let mut keyed: Vec<((usize, u32, usize), ExtractionJob)> = Vec::new();

    for assignment in assignments {
        for label in &assignment.labels {
            let Some(fields) = profile.fields.get(&label.category) else {
                info!(
                    "Page {}: no fields mapped for '{}' ({}), skipping",
                    assignment.page, label, profile.name
                );
                continue;
            };
            let order = profile.fields.position(&label.category).unwrap_or(usize::MAX);
            keyed.push((
                (order, label.part.unwrap_or(0), assignment.page),
                ExtractionJob {
                    page: assignment.page,
                    label: label.clone(),
                    fields: fields.to_vec(),
                },
            ));
        }
    }

    keyed.sort_by_key(|(key, _)| *key);
    let jobs: Vec<ExtractionJob> = keyed.into_iter().map(|(_, job)| job).collect();
    debug!("Planned {} extraction jobs for {}", jobs.len(), profile.name);
    jobs
}
