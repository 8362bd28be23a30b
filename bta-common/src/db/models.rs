//! Database models
//!
//! Row structs and the closed field vocabularies used by intake records.
//! Vocabulary values serialize to the exact wire strings the store and the
//! inference endpoint use, so `as_str`/`FromStr` and serde stay in agreement.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::str::FromStr;
use thiserror::Error;

/// A stored value did not match any member of its closed vocabulary
#[derive(Debug, Clone, Error)]
#[error("unrecognized {0} value: {1}")]
pub struct UnknownValue(pub &'static str, pub String);

/// Supplementary profile data associated with a principal
///
/// Created alongside the auth identity at sign-up; absence is valid and
/// means "no profile yet".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub name: String,
    pub mobile: String,
    pub email: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
    pub owner_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub enum Gender {
    #[default]
    Male,
    Female,
    Other,
    #[serde(rename = "Prefer Not to Say")]
    PreferNotToSay,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
            Gender::Other => "Other",
            Gender::PreferNotToSay => "Prefer Not to Say",
        }
    }
}

impl FromStr for Gender {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Male" => Ok(Gender::Male),
            "Female" => Ok(Gender::Female),
            "Other" => Ok(Gender::Other),
            "Prefer Not to Say" => Ok(Gender::PreferNotToSay),
            other => Err(UnknownValue("gender", other.to_string())),
        }
    }
}

/// Neurological symptom checklist entries
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Symptom {
    Seizures,
    #[serde(rename = "Vision Changes")]
    VisionChanges,
    Weakness,
    #[serde(rename = "Cognitive Changes")]
    CognitiveChanges,
    #[serde(rename = "Speech Difficulties")]
    SpeechDifficulties,
}

impl Symptom {
    pub fn as_str(&self) -> &'static str {
        match self {
            Symptom::Seizures => "Seizures",
            Symptom::VisionChanges => "Vision Changes",
            Symptom::Weakness => "Weakness",
            Symptom::CognitiveChanges => "Cognitive Changes",
            Symptom::SpeechDifficulties => "Speech Difficulties",
        }
    }
}

impl FromStr for Symptom {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Seizures" => Ok(Symptom::Seizures),
            "Vision Changes" => Ok(Symptom::VisionChanges),
            "Weakness" => Ok(Symptom::Weakness),
            "Cognitive Changes" => Ok(Symptom::CognitiveChanges),
            "Speech Difficulties" => Ok(Symptom::SpeechDifficulties),
            other => Err(UnknownValue("symptom", other.to_string())),
        }
    }
}

/// Past medical history checklist entries
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum HistoryItem {
    #[serde(rename = "Previous Cancers")]
    PreviousCancers,
    #[serde(rename = "Neurological Disorders")]
    NeurologicalDisorders,
    Immunosuppression,
}

impl HistoryItem {
    pub fn as_str(&self) -> &'static str {
        match self {
            HistoryItem::PreviousCancers => "Previous Cancers",
            HistoryItem::NeurologicalDisorders => "Neurological Disorders",
            HistoryItem::Immunosuppression => "Immunosuppression",
        }
    }
}

impl FromStr for HistoryItem {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Previous Cancers" => Ok(HistoryItem::PreviousCancers),
            "Neurological Disorders" => Ok(HistoryItem::NeurologicalDisorders),
            "Immunosuppression" => Ok(HistoryItem::Immunosuppression),
            other => Err(UnknownValue("history", other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum OnsetDuration {
    Acute,
    Subacute,
    Chronic,
    #[serde(rename = "Rapidly Progressive")]
    RapidlyProgressive,
    Stable,
}

impl OnsetDuration {
    pub fn as_str(&self) -> &'static str {
        match self {
            OnsetDuration::Acute => "Acute",
            OnsetDuration::Subacute => "Subacute",
            OnsetDuration::Chronic => "Chronic",
            OnsetDuration::RapidlyProgressive => "Rapidly Progressive",
            OnsetDuration::Stable => "Stable",
        }
    }
}

impl FromStr for OnsetDuration {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Acute" => Ok(OnsetDuration::Acute),
            "Subacute" => Ok(OnsetDuration::Subacute),
            "Chronic" => Ok(OnsetDuration::Chronic),
            "Rapidly Progressive" => Ok(OnsetDuration::RapidlyProgressive),
            "Stable" => Ok(OnsetDuration::Stable),
            other => Err(UnknownValue("onset_duration", other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub enum FamilyHistory {
    Yes,
    #[default]
    No,
}

impl FamilyHistory {
    pub fn as_str(&self) -> &'static str {
        match self {
            FamilyHistory::Yes => "Yes",
            FamilyHistory::No => "No",
        }
    }
}

impl FromStr for FamilyHistory {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Yes" => Ok(FamilyHistory::Yes),
            "No" => Ok(FamilyHistory::No),
            other => Err(UnknownValue("family_history", other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub enum SmokingStatus {
    Current,
    Former,
    #[default]
    Never,
}

impl SmokingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SmokingStatus::Current => "Current",
            SmokingStatus::Former => "Former",
            SmokingStatus::Never => "Never",
        }
    }
}

impl FromStr for SmokingStatus {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Current" => Ok(SmokingStatus::Current),
            "Former" => Ok(SmokingStatus::Former),
            "Never" => Ok(SmokingStatus::Never),
            other => Err(UnknownValue("smoking_status", other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub enum AlcoholUse {
    Daily,
    Weekly,
    Occasionally,
    #[default]
    Never,
}

impl AlcoholUse {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlcoholUse::Daily => "Daily",
            AlcoholUse::Weekly => "Weekly",
            AlcoholUse::Occasionally => "Occasionally",
            AlcoholUse::Never => "Never",
        }
    }
}

impl FromStr for AlcoholUse {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Daily" => Ok(AlcoholUse::Daily),
            "Weekly" => Ok(AlcoholUse::Weekly),
            "Occasionally" => Ok(AlcoholUse::Occasionally),
            "Never" => Ok(AlcoholUse::Never),
            other => Err(UnknownValue("alcohol_use", other.to_string())),
        }
    }
}

/// Imaging modality of the analyzed scan
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub enum Modality {
    #[default]
    MRI,
    CT,
    #[serde(rename = "PET-CT")]
    PetCt,
}

impl Modality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Modality::MRI => "MRI",
            Modality::CT => "CT",
            Modality::PetCt => "PET-CT",
        }
    }
}

impl FromStr for Modality {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "MRI" => Ok(Modality::MRI),
            "CT" => Ok(Modality::CT),
            "PET-CT" => Ok(Modality::PetCt),
            other => Err(UnknownValue("modality", other.to_string())),
        }
    }
}

/// MRI acquisition sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub enum Sequence {
    #[default]
    T1,
    #[serde(rename = "T1c")]
    T1c,
    T2,
    FLAIR,
    DWI,
}

impl Sequence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sequence::T1 => "T1",
            Sequence::T1c => "T1c",
            Sequence::T2 => "T2",
            Sequence::FLAIR => "FLAIR",
            Sequence::DWI => "DWI",
        }
    }
}

impl FromStr for Sequence {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "T1" => Ok(Sequence::T1),
            "T1c" => Ok(Sequence::T1c),
            "T2" => Ok(Sequence::T2),
            "FLAIR" => Ok(Sequence::FLAIR),
            "DWI" => Ok(Sequence::DWI),
            other => Err(UnknownValue("sequence", other.to_string())),
        }
    }
}

/// A fully merged intake record ready for the store
///
/// Built by the intake controller from the form fields, the adopted analysis
/// result, and the submitting principal. The store assigns `id` and
/// `created_at` at commit, turning this into an [`IntakeRecord`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewIntakeRecord {
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
    // Adopted analysis result
    pub result: String,
    pub confidence: f64,
    pub image_url: String,
    // Owner identity
    pub user_id: String,
    pub user_email: Option<String>,
    pub user_name: Option<String>,
}

/// An immutable, persisted intake record
///
/// Identical to [`NewIntakeRecord`] plus the store-assigned id and creation
/// time. Records are append-only; no update or delete exists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntakeRecord {
    pub id: String,
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
    pub chief_complaint: String,
    pub symptom_description: String,
    pub symptoms: BTreeSet<Symptom>,
    pub onset_duration: Option<OnsetDuration>,
    pub neurological_exam: String,
    pub history: BTreeSet<HistoryItem>,
    pub medications: String,
    pub surgical_history: String,
    pub family_history: FamilyHistory,
    pub family_details: String,
    pub smoking_status: SmokingStatus,
    pub alcohol_use: AlcoholUse,
    pub occupational_exposures: String,
    pub modality: Modality,
    pub sequence: Sequence,
    pub result: String,
    pub confidence: f64,
    pub image_url: String,
    pub user_id: String,
    pub user_email: Option<String>,
    pub user_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl NewIntakeRecord {
    /// Attach store-assigned identity and creation time
    pub fn into_stored(self, id: String, created_at: DateTime<Utc>) -> IntakeRecord {
        IntakeRecord {
            id,
            fullname: self.fullname,
            phone: self.phone,
            email: self.email,
            address: self.address,
            emergency_name: self.emergency_name,
            relationship: self.relationship,
            emergency_phone: self.emergency_phone,
            gender: self.gender,
            dob: self.dob,
            age: self.age,
            patient_id: self.patient_id,
            chief_complaint: self.chief_complaint,
            symptom_description: self.symptom_description,
            symptoms: self.symptoms,
            onset_duration: self.onset_duration,
            neurological_exam: self.neurological_exam,
            history: self.history,
            medications: self.medications,
            surgical_history: self.surgical_history,
            family_history: self.family_history,
            family_details: self.family_details,
            smoking_status: self.smoking_status,
            alcohol_use: self.alcohol_use,
            occupational_exposures: self.occupational_exposures,
            modality: self.modality,
            sequence: self.sequence,
            result: self.result,
            confidence: self.confidence,
            image_url: self.image_url,
            user_id: self.user_id,
            user_email: self.user_email,
            user_name: self.user_name,
            created_at,
        }
    }
}
