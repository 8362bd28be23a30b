//! Identity context
//!
//! Tracks the current authenticated principal and profile for the process
//! and fans out session transitions to all listeners through a watch
//! channel. Sign-up is two-phase: the auth identity is created first, then
//! the profile is persisted under it; a phase-two failure is reported as a
//! distinct error while the account (and the session) still stand.

mod local;
mod provider;

pub use local::LocalIdentityProvider;
pub use provider::{AuthError, IdentityProvider};

use bta_common::db::models::UserProfile;
use bta_common::events::{EventBus, TriageEvent};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, warn};

/// Authenticated identity of the current user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: String,
    pub email: String,
}

/// The logged-in state pushed to session listeners
///
/// `profile` is `None` when no profile row exists yet or the fetch failed;
/// neither condition blocks the session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub principal: Principal,
    pub profile: Option<UserProfile>,
}

/// Profile fields collected at sign-up
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProfile {
    pub name: String,
    pub mobile: String,
    pub email: String,
    #[serde(default)]
    pub role: Option<String>,
}

/// Sign-up outcome errors
///
/// `ProfileWrite` means the authentication identity was created but the
/// profile persist failed; callers can tell "account created" apart from a
/// failed sign-up.
#[derive(Debug, Clone, Error)]
pub enum SignUpError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Account created but failed to save user data: {0}")]
    ProfileWrite(String),
}

/// Process-wide session state with explicit init and teardown
///
/// Constructed once at startup and injected into consumers; listeners
/// subscribe to the watch channel rather than reading an ambient global.
pub struct IdentityContext<P: IdentityProvider> {
    provider: P,
    db: SqlitePool,
    bus: EventBus,
    tx: watch::Sender<Option<Session>>,
}

impl<P: IdentityProvider> IdentityContext<P> {
    pub fn new(provider: P, db: SqlitePool, bus: EventBus) -> Self {
        let (tx, _) = watch::channel(None);
        Self { provider, db, bus, tx }
    }

    /// Subscribe to session transitions
    ///
    /// The receiver immediately holds the current value; `None` means
    /// signed out.
    pub fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.tx.subscribe()
    }

    /// Snapshot of the current session
    pub fn current(&self) -> Option<Session> {
        self.tx.borrow().clone()
    }

    /// Two-phase sign-up: create the auth identity, then persist the profile
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        profile: NewProfile,
    ) -> Result<Principal, SignUpError> {
        // Phase 1: authentication identity
        let principal = self.provider.sign_up(email, password).await?;

        // Phase 2: profile document under the new identity
        let write_result = sqlx::query(
            "INSERT OR REPLACE INTO profiles (owner_id, name, mobile, email, role, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&principal.id)
        .bind(&profile.name)
        .bind(&profile.mobile)
        .bind(&profile.email)
        .bind(profile.role.as_deref().unwrap_or("user"))
        .bind(Utc::now())
        .execute(&self.db)
        .await;

        // The account stands either way; the session transitions to logged-in
        self.transition_signed_in(principal.clone()).await;

        match write_result {
            Ok(_) => Ok(principal),
            Err(e) => {
                warn!(user_id = %principal.id, error = %e, "Profile persist failed after sign-up");
                Err(SignUpError::ProfileWrite(e.to_string()))
            }
        }
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Principal, AuthError> {
        let principal = self.provider.sign_in(email, password).await?;
        self.transition_signed_in(principal.clone()).await;
        Ok(principal)
    }

    pub async fn sign_out(&self) -> Result<(), AuthError> {
        self.provider.sign_out().await?;
        self.tx.send_replace(None);
        self.bus
            .emit_lossy(TriageEvent::PrincipalSignedOut { timestamp: Utc::now() });
        Ok(())
    }

    pub async fn reset_password(&self, email: &str) -> Result<(), AuthError> {
        self.provider.send_password_reset(email).await
    }

    /// Fetch the profile and push the logged-in session to all listeners
    ///
    /// Profile absence is valid; a fetch error degrades to a null profile
    /// rather than blocking the session.
    async fn transition_signed_in(&self, principal: Principal) {
        let profile = match self.fetch_profile(&principal.id).await {
            Ok(Some(profile)) => Some(profile),
            Ok(None) => {
                debug!(user_id = %principal.id, "No profile yet for principal");
                None
            }
            Err(e) => {
                warn!(user_id = %principal.id, error = %e, "Profile fetch failed; continuing without profile");
                None
            }
        };

        self.bus.emit_lossy(TriageEvent::PrincipalSignedIn {
            user_id: principal.id.clone(),
            email: principal.email.clone(),
            timestamp: Utc::now(),
        });
        self.tx.send_replace(Some(Session { principal, profile }));
    }

    async fn fetch_profile(&self, owner_id: &str) -> Result<Option<UserProfile>, sqlx::Error> {
        let row = sqlx::query_as::<
            _,
            (String, String, String, String, chrono::DateTime<Utc>, String),
        >(
            "SELECT name, mobile, email, role, created_at, owner_id
             FROM profiles WHERE owner_id = ?",
        )
        .bind(owner_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(|(name, mobile, email, role, created_at, owner_id)| UserProfile {
            name,
            mobile,
            email,
            role,
            created_at,
            owner_id,
        }))
    }
}
