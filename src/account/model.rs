//! Account model types.

use serde::{Deserialize, Serialize};

/// Unique identifier for a stored user, assigned by the store on insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub i64);

impl UserId {
    /// Create a new user ID.
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A persisted user account.
///
/// Holds the hashed credential only; plaintext passwords never reach this
/// type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Store-assigned identifier. `None` until the user has been inserted.
    pub id: Option<UserId>,
    /// Unique, case-sensitive username.
    pub username: String,
    /// Unique, case-sensitive email address.
    pub email: String,
    /// Opaque password digest produced by [`crate::credentials::hash`].
    pub password_digest: String,
}

impl User {
    /// Create a user that has not been persisted yet.
    #[must_use]
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        password_digest: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            username: username.into(),
            email: email.into(),
            password_digest: password_digest.into(),
        }
    }
}
