//! # userledger
//!
//! Embedded user-account store with credential verification.
//!
//! This crate provides:
//! - Account storage (`SQLite`) with uniqueness enforcement
//! - A process-wide registry of reference-counted store handles
//! - Stable, storage-agnostic error reporting for constraint violations
//! - Registration and login built on Argon2id password digests
//!
//! Storage is opened lazily: constructing a repository returns immediately
//! with a pending handle, and every operation awaits the open-and-initialize
//! step before touching data.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod account;
mod error;
pub mod service;
pub mod store;

pub use account::credentials;
pub use account::{User, UserId, UserRepository};
pub use account::{ValidationError, ValidationResult, validate_registration};
pub use error::{StoreError, StoreResult};
pub use service::{Accounts, AuthError, AuthResult};
pub use store::{MEMORY, StoreHandle, StoreRegistry};
