//! Database initialization
//!
//! Creates the database on first run with the default schema. Schema
//! creation is idempotent so every module can call it at startup.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Use sqlite options to create database if it doesn't exist
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // Enable foreign keys
    sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await?;

    // WAL mode allows concurrent readers alongside the single writer
    sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;

    // Set busy timeout
    sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;

    // Run schema creation (idempotent - safe to call multiple times)
    create_users_table(&pool).await?;
    create_profiles_table(&pool).await?;
    create_records_table(&pool).await?;

    Ok(pool)
}

/// Create the users table
///
/// Holds the local authentication identities: one row per account with a
/// salted password hash.
pub async fn create_users_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            guid TEXT PRIMARY KEY,
            email TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            password_salt TEXT NOT NULL,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the profiles table
///
/// Supplementary profile data keyed by the owning user id. A user without a
/// profile row is valid ("no profile yet").
pub async fn create_profiles_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS profiles (
            owner_id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            mobile TEXT NOT NULL,
            email TEXT NOT NULL,
            role TEXT NOT NULL DEFAULT 'user',
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the records table
///
/// Append-only intake records. Set-valued fields (symptoms, history) are
/// stored as JSON arrays; closed-vocabulary fields as their wire strings.
pub async fn create_records_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS records (
            id TEXT PRIMARY KEY,
            fullname TEXT NOT NULL,
            phone TEXT NOT NULL,
            email TEXT NOT NULL,
            address TEXT NOT NULL,
            emergency_name TEXT NOT NULL,
            relationship TEXT NOT NULL,
            emergency_phone TEXT NOT NULL,
            gender TEXT NOT NULL,
            dob TEXT,
            age TEXT NOT NULL,
            patient_id TEXT NOT NULL,
            chief_complaint TEXT NOT NULL,
            symptom_description TEXT NOT NULL,
            symptoms TEXT NOT NULL DEFAULT '[]',
            onset_duration TEXT,
            neurological_exam TEXT NOT NULL,
            history TEXT NOT NULL DEFAULT '[]',
            medications TEXT NOT NULL,
            surgical_history TEXT NOT NULL,
            family_history TEXT NOT NULL,
            family_details TEXT NOT NULL,
            smoking_status TEXT NOT NULL,
            alcohol_use TEXT NOT NULL,
            occupational_exposures TEXT NOT NULL,
            modality TEXT NOT NULL,
            sequence TEXT NOT NULL,
            result TEXT NOT NULL,
            confidence REAL NOT NULL,
            image_url TEXT NOT NULL,
            user_id TEXT NOT NULL,
            user_email TEXT,
            user_name TEXT,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Owner-scoped listing is always newest-first
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_records_owner_created
         ON records(user_id, created_at DESC)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
