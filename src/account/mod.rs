//! Account domain module.
//!
//! Provides the account model, registration validation, the storage
//! repository, and the password-hashing collaborator.

pub mod credentials;
mod model;
mod repository;
mod validation;

pub use credentials::{CredentialError, CredentialResult};
pub use model::{User, UserId};
pub use repository::UserRepository;
pub use validation::{ValidationError, ValidationResult, validate_registration};
