//! Registration field validation.

/// Validation error for registration input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    /// Username is empty.
    EmptyUsername,
    /// Email address is empty.
    EmptyEmail,
    /// Email address format is invalid.
    InvalidEmail,
    /// Password is empty.
    EmptyPassword,
}

impl ValidationError {
    /// Get human-readable error message.
    #[must_use]
    pub const fn message(&self) -> &'static str {
        match self {
            Self::EmptyUsername => "Username is required",
            Self::EmptyEmail => "Email address is required",
            Self::InvalidEmail => "Invalid email address format",
            Self::EmptyPassword => "Password is required",
        }
    }

    /// Get the field name this error relates to.
    #[must_use]
    pub const fn field(&self) -> &'static str {
        match self {
            Self::EmptyUsername => "username",
            Self::EmptyEmail | Self::InvalidEmail => "email",
            Self::EmptyPassword => "password",
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ValidationError {}

/// Result of validating registration input.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// Validate registration input before any storage call.
///
/// Fields are taken verbatim: no trimming or case folding is applied, so a
/// whitespace-only username counts as non-empty and identifiers stay case-
/// and whitespace-sensitive all the way to the store.
///
/// Returns `Ok(())` if valid, or `Err(Vec<ValidationError>)` with all errors.
///
/// # Errors
///
/// Returns a vector of `ValidationError` if any fields are invalid.
pub fn validate_registration(username: &str, password: &str, email: &str) -> ValidationResult {
    let mut errors = Vec::new();

    if username.is_empty() {
        errors.push(ValidationError::EmptyUsername);
    }

    if email.is_empty() {
        errors.push(ValidationError::EmptyEmail);
    } else if !is_valid_email(email) {
        errors.push(ValidationError::InvalidEmail);
    }

    if password.is_empty() {
        errors.push(ValidationError::EmptyPassword);
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

/// Basic email validation.
fn is_valid_email(email: &str) -> bool {
    // Must contain exactly one @
    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 {
        return false;
    }

    let local = parts[0];
    let domain = parts[1];

    if local.is_empty() {
        return false;
    }

    // Domain must contain at least one dot and no empty labels
    if domain.is_empty() || !domain.contains('.') {
        return false;
    }
    if domain.split('.').any(str::is_empty) {
        return false;
    }

    true
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

    #[test]
    fn test_valid_email() {
        assert!(is_valid_email("user@example.com"));
        assert!(is_valid_email("user.name@example.com"));
        assert!(is_valid_email("user@sub.example.com"));
    }

    #[test]
    fn test_invalid_email() {
        assert!(!is_valid_email(""));
        assert!(!is_valid_email("user"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("user@"));
        assert!(!is_valid_email("user@example"));
        assert!(!is_valid_email("user@@example.com"));
    }

    #[test]
    fn test_validate_empty_fields() {
        let result = validate_registration("", "", "");
        assert!(result.is_err());
        let errors = result.unwrap_err();
        assert!(errors.contains(&ValidationError::EmptyUsername));
        assert!(errors.contains(&ValidationError::EmptyEmail));
        assert!(errors.contains(&ValidationError::EmptyPassword));
    }

    #[test]
    fn test_validate_complete_registration() {
        let result = validate_registration("alice", "secret123", "alice@example.com");
        assert!(result.is_ok());
    }

    #[test]
    fn test_fields_taken_verbatim() {
        // No trimming: whitespace-only or padded fields pass the empty
        // checks and reach the store as-is.
        assert!(validate_registration("  ", "secret123", "a@example.com").is_ok());
        assert!(validate_registration(" alice ", " secret123 ", "a@example.com").is_ok());
    }

    #[test]
    fn test_validate_bad_email_only() {
        let errors = validate_registration("alice", "secret123", "not-an-email").unwrap_err();
        assert_eq!(errors, vec![ValidationError::InvalidEmail]);
        assert_eq!(errors[0].field(), "email");
    }
}
