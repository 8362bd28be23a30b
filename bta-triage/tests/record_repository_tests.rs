//! Integration tests for the record repository
//!
//! Covers append, newest-first owner snapshots, and the live subscription
//! contract: immediate initial snapshot, push after append, owner scoping,
//! and listener release on cancel.

use std::time::Duration;

use bta_common::db::init_database;
use bta_common::db::models::NewIntakeRecord;
use bta_common::events::EventBus;
use bta_triage::records::RecordRepository;

async fn setup_repository() -> (RecordRepository, EventBus, sqlx::SqlitePool, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let db = init_database(&dir.path().join("bta.db")).await.unwrap();
    let bus = EventBus::new(100);
    (RecordRepository::new(db.clone(), bus.clone()), bus, db, dir)
}

fn record_for(owner_id: &str, fullname: &str) -> NewIntakeRecord {
    NewIntakeRecord {
        fullname: fullname.to_string(),
        result: "Glioma Tumor".to_string(),
        confidence: 92.3,
        image_url: "/uploads/scan.jpg".to_string(),
        user_id: owner_id.to_string(),
        user_email: Some(format!("{owner_id}@example.com")),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_append_assigns_id_and_creation_time() {
    let (repo, _bus, _db, _dir) = setup_repository().await;

    let id = repo.append(record_for("user-1", "Jane Doe")).await.unwrap();
    assert!(!id.is_empty());

    let snapshot = repo.records_for_owner("user-1").await.unwrap();
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].id, id);
    assert_eq!(snapshot[0].fullname, "Jane Doe");
    assert_eq!(snapshot[0].result, "Glioma Tumor");
}

#[tokio::test]
async fn test_snapshots_are_newest_first() {
    let (repo, _bus, _db, _dir) = setup_repository().await;

    repo.append(record_for("user-1", "First")).await.unwrap();
    repo.append(record_for("user-1", "Second")).await.unwrap();
    repo.append(record_for("user-1", "Third")).await.unwrap();

    let snapshot = repo.records_for_owner("user-1").await.unwrap();
    let names: Vec<&str> = snapshot.iter().map(|r| r.fullname.as_str()).collect();
    assert_eq!(names, ["Third", "Second", "First"]);
}

#[tokio::test]
async fn test_snapshots_are_owner_scoped() {
    let (repo, _bus, _db, _dir) = setup_repository().await;

    repo.append(record_for("user-1", "Mine")).await.unwrap();
    repo.append(record_for("user-2", "Theirs")).await.unwrap();

    let snapshot = repo.records_for_owner("user-1").await.unwrap();
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].fullname, "Mine");
    assert!(snapshot.iter().all(|r| r.user_id == "user-1"));
}

#[tokio::test]
async fn test_subscription_delivers_initial_snapshot_immediately() {
    let (repo, _bus, _db, _dir) = setup_repository().await;
    repo.append(record_for("user-1", "Existing")).await.unwrap();

    let mut subscription = repo.subscribe("user-1");
    let snapshot = subscription.next_snapshot().await.unwrap().unwrap();
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].fullname, "Existing");
}

#[tokio::test]
async fn test_append_after_subscribe_pushes_a_later_snapshot() {
    let (repo, _bus, _db, _dir) = setup_repository().await;

    let mut subscription = repo.subscribe("user-1");
    let initial = subscription.next_snapshot().await.unwrap().unwrap();
    assert!(initial.is_empty());

    repo.append(record_for("user-1", "Jane Doe")).await.unwrap();

    let updated = tokio::time::timeout(Duration::from_secs(5), subscription.next_snapshot())
        .await
        .expect("snapshot within timeout")
        .unwrap()
        .unwrap();
    assert_eq!(updated.len(), 1);
    assert_eq!(updated[0].fullname, "Jane Doe");
}

#[tokio::test]
async fn test_subscription_ignores_other_owners_appends() {
    let (repo, _bus, _db, _dir) = setup_repository().await;

    let mut subscription = repo.subscribe("user-1");
    subscription.next_snapshot().await.unwrap().unwrap();

    repo.append(record_for("user-2", "Theirs")).await.unwrap();
    repo.append(record_for("user-1", "Mine")).await.unwrap();

    // The next snapshot is triggered by user-1's append only and never
    // contains user-2's record
    let snapshot = tokio::time::timeout(Duration::from_secs(5), subscription.next_snapshot())
        .await
        .expect("snapshot within timeout")
        .unwrap()
        .unwrap();
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].fullname, "Mine");
}

#[tokio::test]
async fn test_cancel_releases_the_listener() {
    let (repo, bus, _db, _dir) = setup_repository().await;

    let baseline = bus.subscriber_count();
    let mut subscription = repo.subscribe("user-1");
    subscription.next_snapshot().await.unwrap().unwrap();
    assert_eq!(bus.subscriber_count(), baseline + 1);

    subscription.cancel();

    // The subscription task drops its bus receiver on abort
    for _ in 0..50 {
        if bus.subscriber_count() == baseline {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(bus.subscriber_count(), baseline);
}

#[tokio::test]
async fn test_dropped_subscription_releases_the_listener() {
    let (repo, bus, _db, _dir) = setup_repository().await;

    let baseline = bus.subscriber_count();
    {
        let mut subscription = repo.subscribe("user-1");
        subscription.next_snapshot().await.unwrap().unwrap();
        assert_eq!(bus.subscriber_count(), baseline + 1);
    }

    for _ in 0..50 {
        if bus.subscriber_count() == baseline {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(bus.subscriber_count(), baseline);
}

#[tokio::test]
async fn test_store_failure_ends_the_stream_after_one_error() {
    use bta_common::events::TriageEvent;
    use bta_triage::records::StoreError;

    let (repo, bus, db, _dir) = setup_repository().await;

    let mut subscription = repo.subscribe("user-1");
    subscription.next_snapshot().await.unwrap().unwrap();

    // Break the store underneath the subscription, then trigger a requery
    sqlx::query("DROP TABLE records").execute(&db).await.unwrap();
    bus.emit_lossy(TriageEvent::RecordAppended {
        record_id: "r-1".to_string(),
        owner_id: "user-1".to_string(),
        timestamp: chrono::Utc::now(),
    });

    let delivery = tokio::time::timeout(Duration::from_secs(5), subscription.next_snapshot())
        .await
        .expect("delivery within timeout")
        .unwrap();
    assert!(matches!(delivery, Err(StoreError::Unavailable(_))));

    // The error was the final delivery; the stream has terminated
    let ended = tokio::time::timeout(Duration::from_secs(5), subscription.next_snapshot())
        .await
        .expect("termination within timeout");
    assert!(ended.is_none());
}

#[tokio::test]
async fn test_round_trip_preserves_sets_and_enums() {
    use bta_common::db::models::{HistoryItem, Modality, OnsetDuration, Symptom};
    use chrono::NaiveDate;

    let (repo, _bus, _db, _dir) = setup_repository().await;

    let mut record = record_for("user-1", "Jane Doe");
    record.symptoms.insert(Symptom::Seizures);
    record.symptoms.insert(Symptom::VisionChanges);
    record.history.insert(HistoryItem::PreviousCancers);
    record.onset_duration = Some(OnsetDuration::Chronic);
    record.modality = Modality::PetCt;
    record.dob = NaiveDate::from_ymd_opt(1985, 3, 14);

    repo.append(record).await.unwrap();

    let stored = &repo.records_for_owner("user-1").await.unwrap()[0];
    assert!(stored.symptoms.contains(&Symptom::Seizures));
    assert!(stored.symptoms.contains(&Symptom::VisionChanges));
    assert!(stored.history.contains(&HistoryItem::PreviousCancers));
    assert_eq!(stored.onset_duration, Some(OnsetDuration::Chronic));
    assert_eq!(stored.modality, Modality::PetCt);
    assert_eq!(stored.dob, NaiveDate::from_ymd_opt(1985, 3, 14));
}
