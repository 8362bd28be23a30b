//! Record browser
//!
//! Holds the latest subscription snapshot together with locally held
//! filter criteria and derives the filtered, display-ready view. The
//! filter is a pure function of (snapshot, criteria); the filtered list
//! is recomputed on every read so it can never go stale.

use bta_common::db::models::IntakeRecord;
use serde::{Deserialize, Serialize};

/// Confidence at or above this reads as "Tumor suspected"
pub const HIGH_RISK_THRESHOLD: f64 = 90.0;

/// Closed list of diagnosis labels offered by the result filter
///
/// Entries are the exact stored `result` strings; the filter is an exact
/// match.
pub const RESULT_FILTERS: &[&str] = &[
    "Glioma Tumor",
    "Meningioma Tumor",
    "No Tumor",
    "Pituitary Tumor",
];

/// Closed list of modalities offered by the modality filter
pub const MODALITY_FILTERS: &[&str] = &["MRI", "CT", "PET-CT"];

/// Risk banding derived from the stored confidence at render time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskLabel {
    TumorSuspected,
    NoTumor,
}

impl RiskLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLabel::TumorSuspected => "Tumor suspected",
            RiskLabel::NoTumor => "No tumor",
        }
    }
}

/// Band a confidence percentage into its display label
///
/// Never stored; computed from the persisted confidence whenever a record
/// is rendered.
pub fn risk_label(confidence: f64) -> RiskLabel {
    if confidence >= HIGH_RISK_THRESHOLD {
        RiskLabel::TumorSuspected
    } else {
        RiskLabel::NoTumor
    }
}

/// Detail-view confidence, two decimal places
pub fn format_confidence(confidence: f64) -> String {
    format!("{:.2}%", confidence)
}

/// Badge confidence, whole percent
pub fn format_confidence_badge(confidence: f64) -> String {
    format!("{:.0}%", confidence)
}

/// Local browsing filters; transient, never persisted
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterCriteria {
    /// Diagnosis label filter; empty matches every record
    pub category: String,
    /// Modality filter; empty matches every record
    pub modality: String,
    /// Case-insensitive substring over fullname, email, and patient id
    pub search: String,
}

/// Whether one record passes the criteria
///
/// Empty criteria fields pass everything; non-empty ones must all match.
pub fn matches(record: &IntakeRecord, criteria: &FilterCriteria) -> bool {
    if !criteria.category.is_empty() && record.result != criteria.category {
        return false;
    }
    if !criteria.modality.is_empty() && record.modality.as_str() != criteria.modality {
        return false;
    }

    let search = criteria.search.trim().to_lowercase();
    if search.is_empty() {
        return true;
    }
    record.fullname.to_lowercase().contains(&search)
        || record.email.to_lowercase().contains(&search)
        || record.patient_id.to_lowercase().contains(&search)
}

/// Snapshot plus criteria, yielding the filtered view
#[derive(Debug, Default)]
pub struct RecordBrowser {
    snapshot: Vec<IntakeRecord>,
    criteria: FilterCriteria,
}

impl RecordBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the held snapshot with a fresh one from the subscription
    pub fn set_snapshot(&mut self, snapshot: Vec<IntakeRecord>) {
        self.snapshot = snapshot;
    }

    pub fn snapshot(&self) -> &[IntakeRecord] {
        &self.snapshot
    }

    pub fn set_criteria(&mut self, criteria: FilterCriteria) {
        self.criteria = criteria;
    }

    pub fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    /// Records passing the current criteria, in snapshot (newest-first) order
    pub fn filtered(&self) -> Vec<&IntakeRecord> {
        self.snapshot
            .iter()
            .filter(|r| matches(r, &self.criteria))
            .collect()
    }
}
