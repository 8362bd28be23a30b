//! Integration tests for identity and session state
//!
//! Covers two-phase sign-up, the distinct profile-write failure, session
//! fan-out through the watch channel, and profile fetch degradation.

use bta_common::db::init_database;
use bta_common::events::EventBus;
use bta_triage::identity::{
    AuthError, IdentityContext, LocalIdentityProvider, NewProfile, SignUpError,
};

async fn setup() -> (IdentityContext<LocalIdentityProvider>, sqlx::SqlitePool, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let db = init_database(&dir.path().join("bta.db")).await.unwrap();
    let bus = EventBus::new(100);
    let provider = LocalIdentityProvider::new(db.clone());
    (IdentityContext::new(provider, db.clone(), bus), db, dir)
}

fn profile_for(name: &str, email: &str) -> NewProfile {
    NewProfile {
        name: name.to_string(),
        mobile: "555-0100".to_string(),
        email: email.to_string(),
        role: None,
    }
}

#[tokio::test]
async fn test_sign_up_creates_principal_and_session_with_profile() {
    let (identity, _db, _dir) = setup().await;
    let rx = identity.subscribe();
    assert!(rx.borrow().is_none());

    let principal = identity
        .sign_up("jane@example.com", "secret1", profile_for("Jane Doe", "jane@example.com"))
        .await
        .unwrap();
    assert_eq!(principal.email, "jane@example.com");

    let session = rx.borrow().clone().expect("signed in after sign-up");
    assert_eq!(session.principal.id, principal.id);
    let profile = session.profile.expect("profile persisted at sign-up");
    assert_eq!(profile.name, "Jane Doe");
    assert_eq!(profile.role, "user");
}

#[tokio::test]
async fn test_duplicate_email_is_rejected() {
    let (identity, _db, _dir) = setup().await;
    identity
        .sign_up("jane@example.com", "secret1", profile_for("Jane", "jane@example.com"))
        .await
        .unwrap();

    let err = identity
        .sign_up("jane@example.com", "secret2", profile_for("Other", "jane@example.com"))
        .await
        .unwrap_err();
    assert!(matches!(err, SignUpError::Auth(AuthError::EmailInUse)));
}

#[tokio::test]
async fn test_short_password_is_rejected() {
    let (identity, _db, _dir) = setup().await;
    let err = identity
        .sign_up("jane@example.com", "short", profile_for("Jane", "jane@example.com"))
        .await
        .unwrap_err();
    assert!(matches!(err, SignUpError::Auth(AuthError::WeakPassword)));
}

#[tokio::test]
async fn test_profile_write_failure_is_distinct_and_account_stands() {
    let (identity, db, _dir) = setup().await;

    // Break phase two only
    sqlx::query("ALTER TABLE profiles RENAME TO profiles_hidden")
        .execute(&db)
        .await
        .unwrap();

    let err = identity
        .sign_up("jane@example.com", "secret1", profile_for("Jane", "jane@example.com"))
        .await
        .unwrap_err();
    assert!(matches!(err, SignUpError::ProfileWrite(_)));

    // The auth identity was still created and the session is live
    let session = identity.current().expect("session despite profile failure");
    assert_eq!(session.principal.email, "jane@example.com");

    // And the credentials work for a fresh sign-in
    sqlx::query("ALTER TABLE profiles_hidden RENAME TO profiles")
        .execute(&db)
        .await
        .unwrap();
    identity.sign_in("jane@example.com", "secret1").await.unwrap();
}

#[tokio::test]
async fn test_sign_in_with_wrong_password_fails() {
    let (identity, _db, _dir) = setup().await;
    identity
        .sign_up("jane@example.com", "secret1", profile_for("Jane", "jane@example.com"))
        .await
        .unwrap();

    let err = identity.sign_in("jane@example.com", "wrong99").await.unwrap_err();
    assert!(matches!(err, AuthError::InvalidCredential));

    let err = identity.sign_in("nobody@example.com", "secret1").await.unwrap_err();
    assert!(matches!(err, AuthError::InvalidCredential));
}

#[tokio::test]
async fn test_missing_profile_degrades_to_none() {
    let (identity, db, _dir) = setup().await;
    let principal = identity
        .sign_up("jane@example.com", "secret1", profile_for("Jane", "jane@example.com"))
        .await
        .unwrap();

    sqlx::query("DELETE FROM profiles WHERE owner_id = ?")
        .bind(&principal.id)
        .execute(&db)
        .await
        .unwrap();

    identity.sign_in("jane@example.com", "secret1").await.unwrap();
    let session = identity.current().expect("signed in");
    assert!(session.profile.is_none());
}

#[tokio::test]
async fn test_sign_out_clears_the_session_for_all_listeners() {
    let (identity, _db, _dir) = setup().await;
    let rx = identity.subscribe();

    identity
        .sign_up("jane@example.com", "secret1", profile_for("Jane", "jane@example.com"))
        .await
        .unwrap();
    assert!(rx.borrow().is_some());

    identity.sign_out().await.unwrap();
    assert!(rx.borrow().is_none());
    assert!(identity.current().is_none());
}

#[tokio::test]
async fn test_password_reset_requires_a_known_email() {
    let (identity, _db, _dir) = setup().await;
    identity
        .sign_up("jane@example.com", "secret1", profile_for("Jane", "jane@example.com"))
        .await
        .unwrap();

    identity.reset_password("jane@example.com").await.unwrap();

    let err = identity.reset_password("nobody@example.com").await.unwrap_err();
    assert!(matches!(err, AuthError::UserNotFound(_)));
}
