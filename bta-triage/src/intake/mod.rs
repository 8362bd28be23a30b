//! Intake form state and submission
//!
//! The multi-section patient intake form, the one-shot hand-off slot that
//! carries an analysis result from the upload step, and the controller
//! that merges everything into an immutable record on submit.

mod controller;
mod handoff;

pub use controller::{IntakeController, SubmitError};
pub use handoff::AnalysisHandoff;

use bta_common::db::models::{
    AlcoholUse, FamilyHistory, Gender, HistoryItem, Modality, OnsetDuration, Sequence,
    SmokingStatus, Symptom,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Multi-section intake form state
///
/// Five sections: demographics & contact, clinical history, medical
/// background, family & social history, imaging selection. The two
/// checklist fields are sets; toggles are idempotent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IntakeForm {
    // Section I: demographics & contact
    pub fullname: String,
    pub phone: String,
    pub email: String,
    pub address: String,
    pub emergency_name: String,
    pub relationship: String,
    pub emergency_phone: String,
    pub gender: Gender,
    pub dob: Option<NaiveDate>,
    pub age: String,
    pub patient_id: String,
    // Section II: clinical history
    pub chief_complaint: String,
    pub symptom_description: String,
    pub symptoms: BTreeSet<Symptom>,
    pub onset_duration: Option<OnsetDuration>,
    // Section III: medical background
    pub neurological_exam: String,
    pub history: BTreeSet<HistoryItem>,
    pub medications: String,
    pub surgical_history: String,
    // Section IV: family & social history
    pub family_history: FamilyHistory,
    pub family_details: String,
    pub smoking_status: SmokingStatus,
    pub alcohol_use: AlcoholUse,
    pub occupational_exposures: String,
    // Section V: imaging selection
    pub modality: Modality,
    pub sequence: Sequence,
}

impl Default for IntakeForm {
    fn default() -> Self {
        Self {
            fullname: String::new(),
            phone: String::new(),
            email: String::new(),
            address: String::new(),
            emergency_name: String::new(),
            relationship: String::new(),
            emergency_phone: String::new(),
            gender: Gender::default(),
            dob: None,
            age: String::new(),
            patient_id: String::new(),
            chief_complaint: String::new(),
            symptom_description: String::new(),
            symptoms: BTreeSet::new(),
            onset_duration: None,
            neurological_exam: String::new(),
            history: BTreeSet::new(),
            medications: String::new(),
            surgical_history: String::new(),
            family_history: FamilyHistory::default(),
            family_details: String::new(),
            smoking_status: SmokingStatus::default(),
            alcohol_use: AlcoholUse::default(),
            occupational_exposures: String::new(),
            modality: Modality::default(),
            sequence: Sequence::default(),
        }
    }
}

impl IntakeForm {
    /// Add a symptom; adding an already-present member is a no-op
    pub fn add_symptom(&mut self, symptom: Symptom) {
        self.symptoms.insert(symptom);
    }

    /// Remove a symptom; removing an absent member is a no-op
    pub fn remove_symptom(&mut self, symptom: Symptom) {
        self.symptoms.remove(&symptom);
    }

    /// Checkbox-style toggle for a symptom
    pub fn set_symptom(&mut self, symptom: Symptom, checked: bool) {
        if checked {
            self.add_symptom(symptom);
        } else {
            self.remove_symptom(symptom);
        }
    }

    /// Add a history item; adding an already-present member is a no-op
    pub fn add_history(&mut self, item: HistoryItem) {
        self.history.insert(item);
    }

    /// Remove a history item; removing an absent member is a no-op
    pub fn remove_history(&mut self, item: HistoryItem) {
        self.history.remove(&item);
    }

    /// Checkbox-style toggle for a history item
    pub fn set_history(&mut self, item: HistoryItem, checked: bool) {
        if checked {
            self.add_history(item);
        } else {
            self.remove_history(item);
        }
    }

    /// Restore every field to its default value
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_initial_form_values() {
        let form = IntakeForm::default();
        assert_eq!(form.gender, Gender::Male);
        assert_eq!(form.family_history, FamilyHistory::No);
        assert_eq!(form.smoking_status, SmokingStatus::Never);
        assert_eq!(form.alcohol_use, AlcoholUse::Never);
        assert_eq!(form.modality, Modality::MRI);
        assert_eq!(form.sequence, Sequence::T1);
        assert!(form.onset_duration.is_none());
        assert!(form.symptoms.is_empty());
        assert!(form.history.is_empty());
        assert!(form.fullname.is_empty());
    }

    #[test]
    fn test_symptom_toggles_are_idempotent() {
        let mut form = IntakeForm::default();

        form.add_symptom(Symptom::Seizures);
        form.add_symptom(Symptom::Seizures);
        assert_eq!(form.symptoms.len(), 1);

        form.remove_symptom(Symptom::Weakness); // absent: no-op
        assert_eq!(form.symptoms.len(), 1);

        form.remove_symptom(Symptom::Seizures);
        form.remove_symptom(Symptom::Seizures);
        assert!(form.symptoms.is_empty());
    }

    #[test]
    fn test_membership_follows_most_recent_toggle() {
        let mut form = IntakeForm::default();

        form.set_symptom(Symptom::VisionChanges, true);
        form.set_symptom(Symptom::VisionChanges, false);
        form.set_symptom(Symptom::VisionChanges, true);
        assert!(form.symptoms.contains(&Symptom::VisionChanges));

        form.set_history(HistoryItem::Immunosuppression, true);
        form.set_history(HistoryItem::Immunosuppression, false);
        assert!(!form.history.contains(&HistoryItem::Immunosuppression));
    }

    #[test]
    fn test_reset_restores_defaults() {
        let mut form = IntakeForm::default();
        form.fullname = "Jane Doe".to_string();
        form.gender = Gender::Female;
        form.add_symptom(Symptom::Weakness);
        form.onset_duration = Some(OnsetDuration::Chronic);

        form.reset();
        assert!(form.fullname.is_empty());
        assert_eq!(form.gender, Gender::Male);
        assert!(form.symptoms.is_empty());
        assert!(form.onset_duration.is_none());
    }

    #[test]
    fn test_partial_json_deserializes_with_defaults() {
        let form: IntakeForm =
            serde_json::from_str(r#"{"fullname": "Jane Doe", "symptoms": ["Seizures"]}"#).unwrap();
        assert_eq!(form.fullname, "Jane Doe");
        assert!(form.symptoms.contains(&Symptom::Seizures));
        assert_eq!(form.modality, Modality::MRI);
    }
}
