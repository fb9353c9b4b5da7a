//! Registration and login.
//!
//! Handles the credential-verification flow on top of the repository and
//! the hashing collaborator. Plaintext passwords exist only transiently in
//! these functions; they are never persisted or logged.

use thiserror::Error;
use tracing::debug;

use crate::account::credentials::{self, CredentialError};
use crate::account::{User, UserRepository, ValidationError, validate_registration};
use crate::error::StoreError;

/// Errors reported by [`Accounts::register`] and [`Accounts::login`].
#[derive(Debug, Error)]
pub enum AuthError {
    /// One or more registration fields were missing or invalid.
    #[error("{}", validation_summary(.0))]
    Validation(Vec<ValidationError>),

    /// The requested username is already in use.
    #[error("username already in use")]
    UsernameTaken,

    /// The requested email address is already in use.
    #[error("email address already in use")]
    EmailTaken,

    /// No account exists for the given username.
    #[error("username not found")]
    UnknownUsername,

    /// The password did not match the stored digest.
    #[error("invalid password")]
    InvalidPassword,

    /// The hashing collaborator failed.
    #[error(transparent)]
    Credential(#[from] CredentialError),

    /// The underlying store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result type for authentication operations.
pub type AuthResult<T> = std::result::Result<T, AuthError>;

fn validation_summary(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ValidationError::message)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Account registration and credential verification.
pub struct Accounts {
    repo: UserRepository,
}

impl Accounts {
    /// Build on an already-constructed repository.
    #[must_use]
    pub fn new(repo: UserRepository) -> Self {
        Self { repo }
    }

    /// Open against the named store via the process-wide registry.
    #[must_use]
    pub fn open(name: &str) -> Self {
        Self::new(UserRepository::open(name))
    }

    /// Open against an isolated in-memory store.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(UserRepository::in_memory())
    }

    /// Register a new account.
    ///
    /// Validates the fields, hashes the password, and inserts the account.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Validation`] for missing or malformed fields,
    /// [`AuthError::UsernameTaken`] / [`AuthError::EmailTaken`] on
    /// uniqueness conflicts, or the underlying failure otherwise.
    pub async fn register(&self, username: &str, password: &str, email: &str) -> AuthResult<()> {
        validate_registration(username, password, email).map_err(AuthError::Validation)?;

        let digest = credentials::hash(password)?;
        match self.repo.insert(&User::new(username, email, digest)).await {
            Ok(id) => {
                debug!("registered account {id} for username {username:?}");
                Ok(())
            }
            Err(StoreError::DuplicateUsername) => Err(AuthError::UsernameTaken),
            Err(StoreError::DuplicateEmail) => Err(AuthError::EmailTaken),
            Err(e) => Err(AuthError::Store(e)),
        }
    }

    /// Check a set of login credentials.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::UnknownUsername`] if no account exists for
    /// `username`, [`AuthError::InvalidPassword`] if the password does not
    /// match, or the underlying failure otherwise.
    pub async fn login(&self, username: &str, password: &str) -> AuthResult<()> {
        let user = self
            .repo
            .get_by_username(username)
            .await?
            .ok_or(AuthError::UnknownUsername)?;

        if credentials::verify(password, &user.password_digest) {
            debug!("login succeeded for username {username:?}");
            Ok(())
        } else {
            debug!("login failed for username {username:?}");
            Err(AuthError::InvalidPassword)
        }
    }

    /// Release the underlying store handle.
    pub async fn close(&self) {
        self.repo.close().await;
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_register_rejects_empty_fields() {
        let accounts = Accounts::in_memory();

        let result = accounts.register("", "secret123", "alice@example.com").await;
        assert!(matches!(result, Err(AuthError::Validation(_))));
        let result = accounts.register("alice", "", "alice@example.com").await;
        assert!(matches!(result, Err(AuthError::Validation(_))));
        let result = accounts.register("alice", "secret123", "").await;
        assert!(matches!(result, Err(AuthError::Validation(_))));
        accounts.close().await;
    }

    #[tokio::test]
    async fn test_register_stores_digest_not_plaintext() {
        let accounts = Accounts::in_memory();

        accounts
            .register("alice", "secret123", "alice@example.com")
            .await
            .unwrap();
        let user = accounts
            .repo
            .get_by_username("alice")
            .await
            .unwrap()
            .unwrap();
        assert_ne!(user.password_digest, "secret123");
        assert!(credentials::verify("secret123", &user.password_digest));
        accounts.close().await;
    }

    #[tokio::test]
    async fn test_register_duplicate_username() {
        let accounts = Accounts::in_memory();

        accounts
            .register("alice", "secret123", "alice@example.com")
            .await
            .unwrap();
        let result = accounts.register("alice", "other", "a2@example.com").await;
        assert!(matches!(result, Err(AuthError::UsernameTaken)));
        assert_eq!(
            result.unwrap_err().to_string(),
            "username already in use"
        );
        accounts.close().await;
    }

    #[tokio::test]
    async fn test_register_duplicate_email() {
        let accounts = Accounts::in_memory();

        accounts
            .register("alice", "secret123", "alice@example.com")
            .await
            .unwrap();
        let result = accounts
            .register("bob", "secret123", "alice@example.com")
            .await;
        assert!(matches!(result, Err(AuthError::EmailTaken)));
        accounts.close().await;
    }

    #[tokio::test]
    async fn test_login_outcomes() {
        let accounts = Accounts::in_memory();

        accounts
            .register("alice", "secret123", "alice@example.com")
            .await
            .unwrap();

        assert!(accounts.login("alice", "secret123").await.is_ok());
        assert!(matches!(
            accounts.login("alice", "wrong").await,
            Err(AuthError::InvalidPassword)
        ));
        assert!(matches!(
            accounts.login("bob", "x").await,
            Err(AuthError::UnknownUsername)
        ));
        accounts.close().await;
    }
}
