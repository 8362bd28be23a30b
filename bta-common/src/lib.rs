//! # BTA Common Library
//!
//! Shared code for the Brain Tumor Assistant service including:
//! - Database initialization and record models
//! - Event types (TriageEvent enum) and the EventBus
//! - Configuration loading and endpoint resolution
//! - Common error types

pub mod config;
pub mod db;
pub mod error;
pub mod events;

pub use error::{Error, Result};
