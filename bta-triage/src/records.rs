//! Record repository
//!
//! Appends intake records to the owner-scoped collection and serves a
//! live, cancellable subscription of full newest-first snapshots. Every
//! append emits a `RecordAppended` event; subscriptions requery and
//! re-emit on each one for their owner.

use bta_common::db::models::{IntakeRecord, NewIntakeRecord};
use bta_common::events::{EventBus, TriageEvent};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use thiserror::Error;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;

/// Snapshot channel depth per subscription
const SUBSCRIPTION_BUFFER: usize = 16;

/// Record store failures
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// A stored row no longer matches the record vocabulary
    #[error("Corrupt record {0}: {1}")]
    Corrupt(String, String),
}

fn map_sqlx_error(e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &e {
        let message = db_err.message();
        if message.contains("readonly") || message.contains("read-only") {
            return StoreError::PermissionDenied(message.to_string());
        }
    }
    StoreError::Unavailable(e.to_string())
}

/// Append-only store of intake records with live owner-scoped snapshots
#[derive(Clone)]
pub struct RecordRepository {
    db: SqlitePool,
    bus: EventBus,
}

impl RecordRepository {
    pub fn new(db: SqlitePool, bus: EventBus) -> Self {
        Self { db, bus }
    }

    /// Append a new record
    ///
    /// The store assigns the id and creation time at commit. Emits
    /// `RecordAppended` so live subscriptions pick up the change.
    pub async fn append(&self, record: NewIntakeRecord) -> Result<String, StoreError> {
        let id = Uuid::new_v4().to_string();
        let created_at = Utc::now();
        let owner_id = record.user_id.clone();

        let symptoms = serde_json::to_string(&record.symptoms)
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        let history = serde_json::to_string(&record.history)
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO records (
                id, fullname, phone, email, address,
                emergency_name, relationship, emergency_phone, gender, dob,
                age, patient_id, chief_complaint, symptom_description, symptoms,
                onset_duration, neurological_exam, history, medications, surgical_history,
                family_history, family_details, smoking_status, alcohol_use, occupational_exposures,
                modality, sequence, result, confidence, image_url,
                user_id, user_email, user_name, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&record.fullname)
        .bind(&record.phone)
        .bind(&record.email)
        .bind(&record.address)
        .bind(&record.emergency_name)
        .bind(&record.relationship)
        .bind(&record.emergency_phone)
        .bind(record.gender.as_str())
        .bind(record.dob.map(|d| d.to_string()))
        .bind(&record.age)
        .bind(&record.patient_id)
        .bind(&record.chief_complaint)
        .bind(&record.symptom_description)
        .bind(&symptoms)
        .bind(record.onset_duration.map(|o| o.as_str()))
        .bind(&record.neurological_exam)
        .bind(&history)
        .bind(&record.medications)
        .bind(&record.surgical_history)
        .bind(record.family_history.as_str())
        .bind(&record.family_details)
        .bind(record.smoking_status.as_str())
        .bind(record.alcohol_use.as_str())
        .bind(&record.occupational_exposures)
        .bind(record.modality.as_str())
        .bind(record.sequence.as_str())
        .bind(&record.result)
        .bind(record.confidence)
        .bind(&record.image_url)
        .bind(&record.user_id)
        .bind(&record.user_email)
        .bind(&record.user_name)
        .bind(created_at)
        .execute(&self.db)
        .await
        .map_err(map_sqlx_error)?;

        debug!(record_id = %id, owner_id = %owner_id, "Appended intake record");

        self.bus.emit_lossy(TriageEvent::RecordAppended {
            record_id: id.clone(),
            owner_id,
            timestamp: created_at,
        });

        Ok(id)
    }

    /// Full snapshot of one owner's records, newest first
    pub async fn records_for_owner(&self, owner_id: &str) -> Result<Vec<IntakeRecord>, StoreError> {
        let rows = sqlx::query(
            "SELECT * FROM records WHERE user_id = ? ORDER BY created_at DESC, rowid DESC",
        )
        .bind(owner_id)
        .fetch_all(&self.db)
        .await
        .map_err(map_sqlx_error)?;

        rows.iter().map(row_to_record).collect()
    }

    /// Open a live subscription over one owner's records
    ///
    /// Delivers the current snapshot immediately, then a fresh full
    /// snapshot after every append for that owner. A delivery error
    /// terminates the stream once; resuming requires a fresh subscribe.
    /// Cancel (or drop) the subscription to release the listener.
    pub fn subscribe(&self, owner_id: &str) -> RecordSubscription {
        let (tx, rx) = mpsc::channel(SUBSCRIPTION_BUFFER);
        let repo = self.clone();
        let owner = owner_id.to_string();
        let mut events = self.bus.subscribe();

        let task = tokio::spawn(async move {
            // Initial snapshot
            match repo.records_for_owner(&owner).await {
                Ok(snapshot) => {
                    if tx.send(Ok(snapshot)).await.is_err() {
                        return;
                    }
                }
                Err(e) => {
                    let _ = tx.send(Err(e)).await;
                    return;
                }
            }

            loop {
                let requery = match events.recv().await {
                    Ok(TriageEvent::RecordAppended { owner_id, .. }) => owner_id == owner,
                    Ok(_) => false,
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        // Missed events are absorbed by the full requery
                        warn!(owner_id = %owner, missed, "Record subscription lagged; resyncing");
                        true
                    }
                    Err(broadcast::error::RecvError::Closed) => return,
                };
                if !requery {
                    continue;
                }

                match repo.records_for_owner(&owner).await {
                    Ok(snapshot) => {
                        if tx.send(Ok(snapshot)).await.is_err() {
                            return;
                        }
                    }
                    Err(e) => {
                        // One error, then the stream ends
                        let _ = tx.send(Err(e)).await;
                        return;
                    }
                }
            }
        });

        RecordSubscription { rx, task }
    }
}

/// Handle on a live record subscription
///
/// Snapshots arrive in non-decreasing freshness order. Dropping the handle
/// stops the feed; `cancel` does so explicitly and guarantees no further
/// deliveries.
pub struct RecordSubscription {
    rx: mpsc::Receiver<Result<Vec<IntakeRecord>, StoreError>>,
    task: JoinHandle<()>,
}

impl RecordSubscription {
    /// Wait for the next snapshot
    ///
    /// `None` after cancellation or once the stream has terminated.
    pub async fn next_snapshot(&mut self) -> Option<Result<Vec<IntakeRecord>, StoreError>> {
        self.rx.recv().await
    }

    /// Cancel the subscription; no snapshots are delivered afterwards
    pub fn cancel(mut self) {
        self.task.abort();
        self.rx.close();
    }
}

impl Drop for RecordSubscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn row_to_record(row: &SqliteRow) -> Result<IntakeRecord, StoreError> {
    let id: String = row.try_get("id").map_err(map_sqlx_error)?;

    let corrupt = |e: &dyn std::fmt::Display| StoreError::Corrupt(id.clone(), e.to_string());

    let get_text = |column: &str| -> Result<String, StoreError> {
        row.try_get::<String, _>(column).map_err(map_sqlx_error)
    };

    let gender = get_text("gender")?.parse().map_err(|e| corrupt(&e))?;
    let dob = row
        .try_get::<Option<String>, _>("dob")
        .map_err(map_sqlx_error)?
        .map(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d"))
        .transpose()
        .map_err(|e| corrupt(&e))?;
    let symptoms = serde_json::from_str(&get_text("symptoms")?).map_err(|e| corrupt(&e))?;
    let onset_duration = row
        .try_get::<Option<String>, _>("onset_duration")
        .map_err(map_sqlx_error)?
        .map(|s| s.parse())
        .transpose()
        .map_err(|e| corrupt(&e))?;
    let history = serde_json::from_str(&get_text("history")?).map_err(|e| corrupt(&e))?;
    let family_history = get_text("family_history")?.parse().map_err(|e| corrupt(&e))?;
    let smoking_status = get_text("smoking_status")?.parse().map_err(|e| corrupt(&e))?;
    let alcohol_use = get_text("alcohol_use")?.parse().map_err(|e| corrupt(&e))?;
    let modality = get_text("modality")?.parse().map_err(|e| corrupt(&e))?;
    let sequence = get_text("sequence")?.parse().map_err(|e| corrupt(&e))?;
    let created_at: DateTime<Utc> = row.try_get("created_at").map_err(map_sqlx_error)?;

    Ok(IntakeRecord {
        fullname: get_text("fullname")?,
        phone: get_text("phone")?,
        email: get_text("email")?,
        address: get_text("address")?,
        emergency_name: get_text("emergency_name")?,
        relationship: get_text("relationship")?,
        emergency_phone: get_text("emergency_phone")?,
        gender,
        dob,
        age: get_text("age")?,
        patient_id: get_text("patient_id")?,
        chief_complaint: get_text("chief_complaint")?,
        symptom_description: get_text("symptom_description")?,
        symptoms,
        onset_duration,
        neurological_exam: get_text("neurological_exam")?,
        history,
        medications: get_text("medications")?,
        surgical_history: get_text("surgical_history")?,
        family_history,
        family_details: get_text("family_details")?,
        smoking_status,
        alcohol_use,
        occupational_exposures: get_text("occupational_exposures")?,
        modality,
        sequence,
        result: get_text("result")?,
        confidence: row.try_get("confidence").map_err(map_sqlx_error)?,
        image_url: get_text("image_url")?,
        user_id: get_text("user_id")?,
        user_email: row.try_get("user_email").map_err(map_sqlx_error)?,
        user_name: row.try_get("user_name").map_err(map_sqlx_error)?,
        created_at,
        id,
    })
}
