//! Local sqlite-backed identity provider
//!
//! Stores accounts in the `users` table with a salted SHA-256 password
//! hash. Password reset has no mailer in scope; the request is validated
//! and acknowledged in the log.

use super::provider::{AuthError, IdentityProvider};
use super::Principal;
use chrono::Utc;
use rand::Rng;
use sha2::{Digest, Sha256};
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

const MIN_PASSWORD_LEN: usize = 6;

/// Identity provider backed by the local database
#[derive(Clone)]
pub struct LocalIdentityProvider {
    db: SqlitePool,
}

impl LocalIdentityProvider {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    async fn lookup(&self, email: &str) -> Result<Option<(String, String, String)>, AuthError> {
        sqlx::query_as::<_, (String, String, String)>(
            "SELECT guid, password_hash, password_salt FROM users WHERE email = ?",
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await
        .map_err(|e| AuthError::ProviderUnavailable(e.to_string()))
    }
}

impl IdentityProvider for LocalIdentityProvider {
    async fn sign_up(&self, email: &str, password: &str) -> Result<Principal, AuthError> {
        if password.len() < MIN_PASSWORD_LEN {
            return Err(AuthError::WeakPassword);
        }
        if self.lookup(email).await?.is_some() {
            return Err(AuthError::EmailInUse);
        }

        let guid = Uuid::new_v4().to_string();
        let salt = generate_salt();
        let hash = hash_password(&salt, password);

        sqlx::query(
            "INSERT INTO users (guid, email, password_hash, password_salt, created_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&guid)
        .bind(email)
        .bind(&hash)
        .bind(&salt)
        .bind(Utc::now())
        .execute(&self.db)
        .await
        .map_err(|e| AuthError::ProviderUnavailable(e.to_string()))?;

        info!(user_id = %guid, "Created authentication identity");

        Ok(Principal {
            id: guid,
            email: email.to_string(),
        })
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Principal, AuthError> {
        let (guid, stored_hash, salt) =
            self.lookup(email).await?.ok_or(AuthError::InvalidCredential)?;

        if hash_password(&salt, password) != stored_hash {
            return Err(AuthError::InvalidCredential);
        }

        Ok(Principal {
            id: guid,
            email: email.to_string(),
        })
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        // Credential validation is stateless on the provider side
        Ok(())
    }

    async fn send_password_reset(&self, email: &str) -> Result<(), AuthError> {
        if self.lookup(email).await?.is_none() {
            return Err(AuthError::UserNotFound(email.to_string()));
        }
        info!(email = %email, "Password reset acknowledged");
        Ok(())
    }
}

/// Salted SHA-256 password hash as 64 hex characters
fn hash_password(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Random 16-byte salt as 32 hex characters
fn generate_salt() -> String {
    let bytes: [u8; 16] = rand::thread_rng().gen();
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
