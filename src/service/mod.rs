//! Services built on the account repository.

mod auth;

pub use auth::{Accounts, AuthError, AuthResult};
