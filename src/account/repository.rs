//! Account storage repository.

use sqlx::Row;
use sqlx::sqlite::SqliteRow;
use tracing::error;

use super::model::{User, UserId};
use crate::error::{StoreError, StoreResult};
use crate::store::{MEMORY, StoreHandle, StoreRegistry};

/// Sqlite's unique-violation message prefix; the qualified column list
/// follows it.
const UNIQUE_VIOLATION_PREFIX: &str = "UNIQUE constraint failed:";

/// Repository for user-account storage and retrieval.
///
/// Construction is synchronous and always succeeds: the underlying store is
/// opened and schema-initialized lazily, and every operation awaits that
/// step before touching data. If the open fails, the failure is fatal to
/// this instance and every operation reports [`StoreError::Unavailable`].
pub struct UserRepository {
    handle: StoreHandle,
}

impl UserRepository {
    /// Open a repository against the named store, sharing the connection
    /// with any other repository already open against the same name in the
    /// process-wide registry.
    #[must_use]
    pub fn open(name: &str) -> Self {
        Self::with_registry(StoreRegistry::global(), name)
    }

    /// Open a repository against the named store using an explicit registry.
    #[must_use]
    pub fn with_registry(registry: &StoreRegistry, name: &str) -> Self {
        Self {
            handle: registry.acquire(name),
        }
    }

    /// Open an isolated in-memory repository.
    ///
    /// Ephemeral stores are never shared; each call gets its own store.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::open(MEMORY)
    }

    /// Look up a user by exact username.
    ///
    /// Absence is a normal outcome: `Ok(None)` when no row matches.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the store is unavailable or the query
    /// fails.
    pub async fn get_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let pool = self.handle.pool().await?;
        let row = sqlx::query(
            "SELECT id, username, email, password_digest FROM users WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(pool)
        .await
        .map_err(translate)?;

        Ok(row.as_ref().map(row_to_user))
    }

    /// Look up a user by exact email address.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the store is unavailable or the query
    /// fails.
    pub async fn get_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let pool = self.handle.pool().await?;
        let row =
            sqlx::query("SELECT id, username, email, password_digest FROM users WHERE email = ?")
                .bind(email)
                .fetch_optional(pool)
                .await
                .map_err(translate)?;

        Ok(row.as_ref().map(row_to_user))
    }

    /// Insert a new user and return its store-assigned id.
    ///
    /// Uniqueness is enforced by the store's constraints, not by a
    /// read-then-write pre-check, so concurrent inserts cannot race past
    /// each other.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DuplicateUsername`] or
    /// [`StoreError::DuplicateEmail`] when the corresponding uniqueness
    /// constraint is violated; any other storage failure is logged and
    /// reported as [`StoreError::Unknown`].
    pub async fn insert(&self, user: &User) -> StoreResult<UserId> {
        let pool = self.handle.pool().await?;
        let result =
            sqlx::query("INSERT INTO users (username, email, password_digest) VALUES (?, ?, ?)")
                .bind(&user.username)
                .bind(&user.email)
                .bind(&user.password_digest)
                .execute(pool)
                .await
                .map_err(translate)?;

        Ok(UserId::new(result.last_insert_rowid()))
    }

    /// Update the email of the user identified by `username`.
    ///
    /// Updating a non-existent username is a silent no-op; callers that
    /// need existence confirmation must check separately.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DuplicateEmail`] if `new_email` collides with
    /// another account's email.
    pub async fn update_email(&self, username: &str, new_email: &str) -> StoreResult<()> {
        let pool = self.handle.pool().await?;
        sqlx::query("UPDATE users SET email = ? WHERE username = ?")
            .bind(new_email)
            .bind(username)
            .execute(pool)
            .await
            .map_err(translate)?;

        Ok(())
    }

    /// Overwrite the password digest of the user identified by `username`.
    ///
    /// No uniqueness constraint applies. Silent no-op if the username does
    /// not exist.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the store is unavailable or the query
    /// fails.
    pub async fn update_password(&self, username: &str, new_digest: &str) -> StoreResult<()> {
        let pool = self.handle.pool().await?;
        sqlx::query("UPDATE users SET password_digest = ? WHERE username = ?")
            .bind(new_digest)
            .bind(username)
            .execute(pool)
            .await
            .map_err(translate)?;

        Ok(())
    }

    /// Release this repository's store handle.
    ///
    /// Operations after `close` are not part of the contract; they fail
    /// with [`StoreError::Unavailable`] rather than panicking.
    pub async fn close(&self) {
        self.handle.close().await;
    }
}

fn row_to_user(row: &SqliteRow) -> User {
    User {
        id: Some(UserId::new(row.get("id"))),
        username: row.get("username"),
        email: row.get("email"),
        password_digest: row.get("password_digest"),
    }
}

/// Translate a storage failure into the stable [`StoreError`] taxonomy.
///
/// Uniqueness conflicts are recognized through the driver's structured
/// error, then attributed to a column; everything else is logged in full
/// and collapsed to [`StoreError::Unknown`].
fn translate(err: sqlx::Error) -> StoreError {
    match err.as_database_error() {
        Some(db) if db.is_unique_violation() => classify_unique_violation(db.message()),
        _ => {
            error!("account store operation failed: {err}");
            StoreError::Unknown
        }
    }
}

/// Attribute a unique violation to a column.
///
/// Sqlite reports `UNIQUE constraint failed: users.username[, ...]`. Only
/// whole qualified identifiers in that column list are matched; user data
/// never appears in the message, so a username containing the word "email"
/// cannot misfire.
fn classify_unique_violation(message: &str) -> StoreError {
    let Some(columns) = message.strip_prefix(UNIQUE_VIOLATION_PREFIX) else {
        error!("unique violation with unexpected message: {message}");
        return StoreError::Unknown;
    };

    for column in columns.split(',').map(str::trim) {
        match column {
            "users.username" => return StoreError::DuplicateUsername,
            "users.email" => return StoreError::DuplicateEmail,
            _ => {}
        }
    }

    error!("unique violation on unrecognized column: {message}");
    StoreError::Unknown
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

    fn user(username: &str, email: &str) -> User {
        User::new(username, email, "0123456789")
    }

    #[tokio::test]
    async fn test_insert_and_get_by_username() {
        let repo = UserRepository::in_memory();

        let id = repo.insert(&user("user1", "email1@example.com")).await.unwrap();
        let found = repo.get_by_username("user1").await.unwrap().unwrap();
        assert_eq!(found.id, Some(id));
        assert_eq!(found.username, "user1");
        assert_eq!(found.email, "email1@example.com");
        assert_eq!(found.password_digest, "0123456789");
        repo.close().await;
    }

    #[tokio::test]
    async fn test_get_unknown_username_is_none() {
        let repo = UserRepository::in_memory();

        repo.insert(&user("user1", "email1@example.com")).await.unwrap();
        assert!(repo.get_by_username("unknown").await.unwrap().is_none());
        repo.close().await;
    }

    #[tokio::test]
    async fn test_insert_and_get_by_email() {
        let repo = UserRepository::in_memory();

        repo.insert(&user("user1", "email1@example.com")).await.unwrap();
        let found = repo.get_by_email("email1@example.com").await.unwrap().unwrap();
        assert_eq!(found.username, "user1");
        repo.close().await;
    }

    #[tokio::test]
    async fn test_get_unknown_email_is_none() {
        let repo = UserRepository::in_memory();

        repo.insert(&user("user1", "email1@example.com")).await.unwrap();
        assert!(repo.get_by_email("unknown").await.unwrap().is_none());
        repo.close().await;
    }

    #[tokio::test]
    async fn test_duplicate_username() {
        let repo = UserRepository::in_memory();

        repo.insert(&user("user1", "email1@example.com")).await.unwrap();
        let result = repo.insert(&user("user1", "email2@example.com")).await;
        assert_eq!(result, Err(StoreError::DuplicateUsername));
        repo.close().await;
    }

    #[tokio::test]
    async fn test_duplicate_email() {
        let repo = UserRepository::in_memory();

        repo.insert(&user("user1", "email1@example.com")).await.unwrap();
        let result = repo.insert(&user("user2", "email1@example.com")).await;
        assert_eq!(result, Err(StoreError::DuplicateEmail));
        repo.close().await;
    }

    #[tokio::test]
    async fn test_update_email() {
        let repo = UserRepository::in_memory();

        repo.insert(&user("user1", "email1@example.com")).await.unwrap();
        repo.update_email("user1", "new@example.com").await.unwrap();
        let found = repo.get_by_username("user1").await.unwrap().unwrap();
        assert_eq!(found.email, "new@example.com");
        repo.close().await;
    }

    #[tokio::test]
    async fn test_update_to_duplicate_email_leaves_row_unchanged() {
        let repo = UserRepository::in_memory();

        repo.insert(&user("user1", "email1@example.com")).await.unwrap();
        repo.insert(&user("user2", "email2@example.com")).await.unwrap();

        let result = repo.update_email("user2", "email1@example.com").await;
        assert_eq!(result, Err(StoreError::DuplicateEmail));

        let unchanged = repo.get_by_username("user2").await.unwrap().unwrap();
        assert_eq!(unchanged.email, "email2@example.com");
        repo.close().await;
    }

    #[tokio::test]
    async fn test_update_email_unknown_username_is_noop() {
        let repo = UserRepository::in_memory();

        repo.update_email("ghost", "new@example.com").await.unwrap();
        assert!(repo.get_by_email("new@example.com").await.unwrap().is_none());
        repo.close().await;
    }

    #[tokio::test]
    async fn test_update_password() {
        let repo = UserRepository::in_memory();

        repo.insert(&user("user1", "email1@example.com")).await.unwrap();
        repo.update_password("user1", "qwerty").await.unwrap();
        let found = repo.get_by_username("user1").await.unwrap().unwrap();
        assert_eq!(found.password_digest, "qwerty");
        repo.close().await;
    }

    #[tokio::test]
    async fn test_update_password_unknown_username_is_noop() {
        let repo = UserRepository::in_memory();

        repo.update_password("ghost", "qwerty").await.unwrap();
        assert!(repo.get_by_username("ghost").await.unwrap().is_none());
        repo.close().await;
    }

    #[tokio::test]
    async fn test_in_memory_stores_are_isolated() {
        let first = UserRepository::in_memory();
        let second = UserRepository::in_memory();

        first.insert(&user("user1", "email1@example.com")).await.unwrap();
        assert!(second.get_by_username("user1").await.unwrap().is_none());
        first.close().await;
        second.close().await;
    }

    #[test]
    fn test_classify_username_violation() {
        let err = classify_unique_violation("UNIQUE constraint failed: users.username");
        assert_eq!(err, StoreError::DuplicateUsername);
    }

    #[test]
    fn test_classify_email_violation() {
        let err = classify_unique_violation("UNIQUE constraint failed: users.email");
        assert_eq!(err, StoreError::DuplicateEmail);
    }

    #[test]
    fn test_classify_multi_column_violation() {
        let err =
            classify_unique_violation("UNIQUE constraint failed: users.id, users.email");
        assert_eq!(err, StoreError::DuplicateEmail);
    }

    #[test]
    fn test_classify_matches_whole_identifiers_only() {
        // Identifiers merely containing "email" must not be attributed to
        // the email column.
        let err = classify_unique_violation("UNIQUE constraint failed: users.email_backup");
        assert_eq!(err, StoreError::Unknown);
    }

    #[test]
    fn test_classify_unexpected_message() {
        let err = classify_unique_violation("CHECK constraint failed: users");
        assert_eq!(err, StoreError::Unknown);
    }
}
