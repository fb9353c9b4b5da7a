//! Error taxonomy for store operations.

use thiserror::Error;

/// Errors reported by account-store operations.
///
/// These are the only failures callers see: low-level storage errors never
/// cross this boundary. Anything that is not a recognized uniqueness conflict
/// is logged in full and surfaced as the opaque [`StoreError::Unknown`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Insert would violate the username uniqueness constraint.
    #[error("username already in use")]
    DuplicateUsername,

    /// Insert or email update would violate the email uniqueness constraint.
    #[error("email address already in use")]
    DuplicateEmail,

    /// Opening or initializing the store failed; no operations can proceed
    /// on this repository instance. The underlying cause is logged.
    #[error("account store is unavailable")]
    Unavailable,

    /// Any other storage failure. The raw diagnostic is logged for operator
    /// follow-up, never carried in this value.
    #[error("unknown storage error, try again")]
    Unknown,
}

/// Result type alias for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;
