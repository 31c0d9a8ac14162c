//! Identity-provider seam.
//!
//! Route handlers only talk to [`IdentityProvider`]. The production
//! implementation is [`clerk::ClerkClient`], which calls the hosted Backend API
//! and verifies session tokens against the provider's JWKS. Tests swap in an
//! in-memory fake through the same trait object.

pub mod clerk;
pub mod jwks;
pub mod session;
mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use self::types::{AuthContext, EmailAddress, NewUser, User, UserListQuery};

use async_trait::async_trait;
use reqwest::StatusCode;
use thiserror::Error;

/// Failure talking to the identity provider.
///
/// The `Display` text is what callers see in the `{"error": ...}` body, so
/// variants render the provider's own message where one exists.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{0}")]
    Request(#[from] reqwest::Error),
    #[error("{message}")]
    Api { status: StatusCode, message: String },
    #[error("unexpected provider response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("invalid provider URL: {0}")]
    Url(#[from] url::ParseError),
    #[error(transparent)]
    Token(#[from] session::TokenError),
}

/// Operations the gateway needs from the identity provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// List registered user identities.
    ///
    /// # Errors
    /// Returns [`ProviderError`] if the provider is unreachable or rejects the call.
    async fn list_users(&self, query: &UserListQuery) -> Result<Vec<User>, ProviderError>;

    /// Register a new user identity.
    ///
    /// # Errors
    /// Returns [`ProviderError`] if the provider is unreachable or rejects the user.
    async fn create_user(&self, user: &NewUser) -> Result<User, ProviderError>;

    /// Verify a session credential and return the caller's claims.
    ///
    /// # Errors
    /// Returns [`ProviderError::Token`] for invalid credentials, or another
    /// variant if the signing keys cannot be fetched.
    async fn authenticate(&self, token: &str) -> Result<AuthContext, ProviderError>;
}
