//! Intake form controller
//!
//! Enforces the submit contract: a signed-in principal and an adopted
//! analysis result are required before the merged record is appended.
//! Submission is atomic from the caller's perspective: on failure the form
//! and the adopted result are kept intact for retry.

use super::handoff::AnalysisHandoff;
use super::IntakeForm;
use crate::identity::Session;
use crate::records::{RecordRepository, StoreError};
use crate::services::AnalysisResult;
use bta_common::db::models::NewIntakeRecord;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;
use tracing::info;

/// Submit contract violations and store failures
#[derive(Debug, Error)]
pub enum SubmitError {
    /// A submission is already in flight on this form instance
    #[error("A submission is already in progress")]
    Busy,

    /// No signed-in principal
    #[error("You must be logged in to submit test data")]
    Unauthenticated,

    /// No adopted analysis result; the caller should route back to the
    /// upload step
    #[error("Please upload and analyze an image before submitting the record")]
    MissingAnalysis,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Holds the form, the adopted analysis result, and the submit machinery
pub struct IntakeController {
    form: IntakeForm,
    adopted: Option<AnalysisResult>,
    session: watch::Receiver<Option<Session>>,
    repository: Arc<RecordRepository>,
    saving: bool,
}

impl IntakeController {
    pub fn new(
        session: watch::Receiver<Option<Session>>,
        repository: Arc<RecordRepository>,
    ) -> Self {
        Self {
            form: IntakeForm::default(),
            adopted: None,
            session,
            repository,
            saving: false,
        }
    }

    pub fn form(&self) -> &IntakeForm {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut IntakeForm {
        &mut self.form
    }

    /// Replace the whole form state (e.g. from a submitted payload)
    pub fn set_form(&mut self, form: IntakeForm) {
        self.form = form;
    }

    /// Consume the hand-off slot if a result is pending
    ///
    /// Returns true when a result was adopted. The slot is cleared either
    /// way it is read, so the same result is never delivered twice; a newly
    /// adopted result replaces the previous one.
    pub fn adopt_from(&mut self, handoff: &AnalysisHandoff) -> bool {
        match handoff.take() {
            Some(result) => {
                self.adopted = Some(result);
                true
            }
            None => false,
        }
    }

    pub fn adopted(&self) -> Option<&AnalysisResult> {
        self.adopted.as_ref()
    }

    /// Submit the merged record
    ///
    /// Precondition order: busy gate, signed-in principal, adopted analysis
    /// result. On success the form resets to defaults and the adopted
    /// result is discarded (preventing resubmission of the same analysis);
    /// on failure both are retained so the caller can retry.
    pub async fn submit(&mut self) -> Result<String, SubmitError> {
        if self.saving {
            return Err(SubmitError::Busy);
        }
        let session = self
            .session
            .borrow()
            .clone()
            .ok_or(SubmitError::Unauthenticated)?;
        let analysis = self.adopted.clone().ok_or(SubmitError::MissingAnalysis)?;

        self.saving = true;
        let record = merge_record(self.form.clone(), analysis, &session);
        let outcome = self.repository.append(record).await;
        self.saving = false;

        match outcome {
            Ok(record_id) => {
                info!(record_id = %record_id, "Intake record saved");
                self.form.reset();
                self.adopted = None;
                Ok(record_id)
            }
            // Field values and the adopted result stay put for retry
            Err(e) => Err(SubmitError::Store(e)),
        }
    }
}

/// Merge form fields, the adopted analysis, and the owner identity
fn merge_record(form: IntakeForm, analysis: AnalysisResult, session: &Session) -> NewIntakeRecord {
    NewIntakeRecord {
        fullname: form.fullname,
        phone: form.phone,
        email: form.email,
        address: form.address,
        emergency_name: form.emergency_name,
        relationship: form.relationship,
        emergency_phone: form.emergency_phone,
        gender: form.gender,
        dob: form.dob,
        age: form.age,
        patient_id: form.patient_id,
        chief_complaint: form.chief_complaint,
        symptom_description: form.symptom_description,
        symptoms: form.symptoms,
        onset_duration: form.onset_duration,
        neurological_exam: form.neurological_exam,
        history: form.history,
        medications: form.medications,
        surgical_history: form.surgical_history,
        family_history: form.family_history,
        family_details: form.family_details,
        smoking_status: form.smoking_status,
        alcohol_use: form.alcohol_use,
        occupational_exposures: form.occupational_exposures,
        modality: form.modality,
        sequence: form.sequence,
        result: analysis.label,
        confidence: analysis.confidence,
        image_url: analysis.image_ref,
        user_id: session.principal.id.clone(),
        user_email: Some(session.principal.email.clone()),
        user_name: session.profile.as_ref().map(|p| p.name.clone()),
    }
}
