//! HTTP API handlers for bta-triage

pub mod analyze;
pub mod auth;
pub mod health;
pub mod records;

pub use analyze::analyze_routes;
pub use auth::auth_routes;
pub use health::health_routes;
pub use records::record_routes;
