//! Shared fixtures for integration tests

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing_subscriber::EnvFilter;

use tutorlink_identity::session::DurableSlot;
use tutorlink_identity::store::{Filters, MemoryRecordStore, RecordStore};
use tutorlink_identity::{IdentityConfig, IdentityError, Result};

/// Install a subscriber once; `RUST_LOG=tutorlink_identity=debug` to see actor logs
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

pub fn test_config() -> IdentityConfig {
    IdentityConfig::default().with_request_timeout(Duration::from_millis(500))
}

pub fn user(id: &str, email: &str, password: &str, role: &str) -> Value {
    json!({
        "id": id,
        "email": email,
        "password": password,
        "fullName": format!("User {id}"),
        "role": role,
        "isActive": true,
    })
}

/// Three users: admin 1, tutor 2, student 3
pub fn seeded_store() -> Arc<MemoryRecordStore> {
    Arc::new(MemoryRecordStore::new().with_records(
        "users",
        vec![
            user("1", "admin@tutorlink.io", "admin123", "admin"),
            user("2", "lan@example.com", "secret1", "tutor"),
            user("3", "minh@example.com", "secret2", "student"),
        ],
    ))
}

/// Every call fails at the transport level
pub struct UnreachableStore;

#[async_trait]
impl RecordStore for UnreachableStore {
    async fn list(&self, _entity: &str, _filters: Filters<'_>) -> Result<Vec<Value>> {
        Err(IdentityError::Transport("connection refused".into()))
    }

    async fn get(&self, _entity: &str, _id: &str) -> Result<Value> {
        Err(IdentityError::Transport("connection refused".into()))
    }

    async fn create(&self, _entity: &str, _record: Value) -> Result<Value> {
        Err(IdentityError::Transport("connection refused".into()))
    }

    async fn update(&self, _entity: &str, _id: &str, _patch: Value) -> Result<Value> {
        Err(IdentityError::Transport("connection refused".into()))
    }

    async fn delete(&self, _entity: &str, _id: &str) -> Result<()> {
        Err(IdentityError::Transport("connection refused".into()))
    }
}

/// Never answers
pub struct StalledStore;

#[async_trait]
impl RecordStore for StalledStore {
    async fn list(&self, _entity: &str, _filters: Filters<'_>) -> Result<Vec<Value>> {
        std::future::pending().await
    }

    async fn get(&self, _entity: &str, _id: &str) -> Result<Value> {
        std::future::pending().await
    }

    async fn create(&self, _entity: &str, _record: Value) -> Result<Value> {
        std::future::pending().await
    }

    async fn update(&self, _entity: &str, _id: &str, _patch: Value) -> Result<Value> {
        std::future::pending().await
    }

    async fn delete(&self, _entity: &str, _id: &str) -> Result<()> {
        std::future::pending().await
    }
}

/// Reads succeed, writes fail
pub struct ReadOnlySlot {
    pub value: Option<String>,
}

impl DurableSlot for ReadOnlySlot {
    fn read(&self) -> Result<Option<String>> {
        Ok(self.value.clone())
    }

    fn write(&self, _value: &str) -> Result<()> {
        Err(IdentityError::Io(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "read-only slot",
        )))
    }

    fn delete(&self) -> Result<()> {
        Ok(())
    }
}

/// Reads and writes work, deletes fail
#[derive(Default)]
pub struct UndeletableSlot {
    pub value: parking_lot::Mutex<Option<String>>,
}

impl DurableSlot for UndeletableSlot {
    fn read(&self) -> Result<Option<String>> {
        Ok(self.value.lock().clone())
    }

    fn write(&self, value: &str) -> Result<()> {
        *self.value.lock() = Some(value.to_string());
        Ok(())
    }

    fn delete(&self) -> Result<()> {
        Err(IdentityError::Io(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "slot is locked",
        )))
    }
}
