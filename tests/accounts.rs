//! Integration tests for the account store.
//!
//! These exercise the full stack: registry sharing across repository
//! instances, persistence across reopen, and the register/login flow.

use std::path::{Path, PathBuf};

use userledger::{Accounts, AuthError, StoreError, StoreRegistry, User, UserRepository};

fn temp_store(tag: &str) -> PathBuf {
    std::env::temp_dir().join(format!("userledger-{tag}-{}.db", std::process::id()))
}

fn cleanup(path: &Path) {
    for suffix in ["", "-wal", "-shm", "-journal"] {
        let mut name = path.as_os_str().to_os_string();
        name.push(suffix);
        let _ = std::fs::remove_file(name);
    }
}

#[tokio::test]
async fn shared_store_closes_exactly_once() {
    let path = temp_store("shared");
    cleanup(&path);
    let name = path.to_str().unwrap();
    let registry = StoreRegistry::new();

    let first = UserRepository::with_registry(&registry, name);
    let second = UserRepository::with_registry(&registry, name);
    assert_eq!(registry.active(name), 2);

    // Both handles reference the same underlying store.
    first
        .insert(&User::new("user1", "email1@example.com", "0123456789"))
        .await
        .unwrap();
    let seen = second.get_by_username("user1").await.unwrap().unwrap();
    assert_eq!(seen.email, "email1@example.com");

    // First release keeps the connection alive for the other referent.
    first.close().await;
    assert_eq!(registry.active(name), 1);
    assert!(second.get_by_username("user1").await.unwrap().is_some());

    second.close().await;
    assert_eq!(registry.active(name), 0);

    // A fresh acquire of the same name reopens cleanly and sees the
    // persisted data.
    let reopened = UserRepository::with_registry(&registry, name);
    let seen = reopened.get_by_username("user1").await.unwrap().unwrap();
    assert_eq!(seen.password_digest, "0123456789");
    reopened.close().await;

    cleanup(&path);
}

#[tokio::test]
async fn open_failure_is_fatal_to_the_repository() {
    let registry = StoreRegistry::new();
    let repo = UserRepository::with_registry(&registry, "/nonexistent-dir/accounts.db");

    let result = repo.get_by_username("user1").await;
    assert_eq!(result, Err(StoreError::Unavailable));

    // The cached failure replays; no operation can proceed.
    let result = repo
        .insert(&User::new("user1", "email1@example.com", "0123456789"))
        .await;
    assert_eq!(result, Err(StoreError::Unavailable));
    repo.close().await;
}

#[tokio::test]
async fn register_and_login_flow() {
    let accounts = Accounts::in_memory();

    accounts
        .register("alice", "secret123", "alice@example.com")
        .await
        .unwrap();

    let err = accounts
        .register("alice", "other", "a2@example.com")
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "username already in use");

    let err = accounts.login("alice", "wrong").await.unwrap_err();
    assert!(matches!(err, AuthError::InvalidPassword));
    assert_eq!(err.to_string(), "invalid password");

    accounts.login("alice", "secret123").await.unwrap();

    let err = accounts.login("bob", "x").await.unwrap_err();
    assert!(matches!(err, AuthError::UnknownUsername));
    assert_eq!(err.to_string(), "username not found");

    accounts.close().await;
}
