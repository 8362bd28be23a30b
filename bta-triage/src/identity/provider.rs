//! Identity provider interface
//!
//! The authentication backend is an external collaborator; only its call
//! contract matters here. Implementations create accounts, validate
//! credentials, and acknowledge password resets.

use super::Principal;
use thiserror::Error;

/// Authentication errors surfaced by an identity provider
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    /// Email/password pair did not match an account
    #[error("Invalid email or password")]
    InvalidCredential,

    /// Sign-up attempted with an email that already has an account
    #[error("Email already in use")]
    EmailInUse,

    /// Password rejected by the provider's strength policy
    #[error("Password should be at least 6 characters")]
    WeakPassword,

    /// No account exists for the given email
    #[error("No account found for {0}")]
    UserNotFound(String),

    /// Provider could not be reached or failed internally
    #[error("Identity provider unavailable: {0}")]
    ProviderUnavailable(String),
}

/// Call contract of the external authentication backend
///
/// All operations are async and non-blocking. `sign_up` creates the
/// authentication identity only; profile persistence is the caller's
/// second phase.
#[allow(async_fn_in_trait)]
pub trait IdentityProvider: Send + Sync {
    /// Create a new authentication identity
    async fn sign_up(&self, email: &str, password: &str) -> Result<Principal, AuthError>;

    /// Validate credentials and return the matching principal
    async fn sign_in(&self, email: &str, password: &str) -> Result<Principal, AuthError>;

    /// End the provider-side session, if any
    async fn sign_out(&self) -> Result<(), AuthError>;

    /// Acknowledge a password reset request for the given email
    async fn send_password_reset(&self, email: &str) -> Result<(), AuthError>;
}
