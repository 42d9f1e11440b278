//! Record store client — thin transport boundary to the collection store
//!
//! One collection per entity kind, addressed by name (see [`crate::schema`]).
//! Records are JSON objects carrying an `id`. Implementations hold no
//! business logic: they move records and report failures.
//!
//! # Example
//!
//! ```rust,no_run
//! use tutorlink_identity::store::{HttpRecordStore, RecordStore};
//! use tutorlink_identity::IdentityConfig;
//!
//! #[tokio::main]
//! async fn main() -> tutorlink_identity::Result<()> {
//!     let store = HttpRecordStore::new(&IdentityConfig::new("http://localhost:3001"))?;
//!
//!     // Equality filters on arbitrary fields
//!     let tutors = store.list("users", &[("role", "tutor")]).await?;
//!
//!     // Partial update merges into the stored record
//!     let updated = store.update("users", "3", serde_json::json!({ "bio": "Maths" })).await?;
//!
//!     Ok(())
//! }
//! ```

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{IdentityError, Result};
use crate::schema;

#[cfg(feature = "http")]
pub mod http;
pub mod memory;

#[cfg(feature = "http")]
pub use http::HttpRecordStore;
pub use memory::{MemoryRecordStore, StoreCalls};

/// Equality filter: `(field, value)` pairs, all of which must match
pub type Filters<'a> = &'a [(&'a str, &'a str)];

/// Request/response access to the external collection store
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// All records of `entity` matching every filter, in store order
    async fn list(&self, entity: &str, filters: Filters<'_>) -> Result<Vec<Value>>;

    /// A single record by id
    async fn get(&self, entity: &str, id: &str) -> Result<Value>;

    /// Submit a new record (already carrying its id); returns the stored record
    async fn create(&self, entity: &str, record: Value) -> Result<Value>;

    /// Merge `patch` into the stored record; returns the merged record
    async fn update(&self, entity: &str, id: &str, patch: Value) -> Result<Value>;

    async fn delete(&self, entity: &str, id: &str) -> Result<()>;
}

/// Render a scalar JSON field the way a query string would carry it
pub fn field_as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// The record's `id`, whether stored as a string or a number
pub fn record_id(record: &Value) -> Option<String> {
    record.get(schema::FIELD_ID).and_then(field_as_string)
}

/// True if every `(field, value)` filter equals the record's field
pub fn matches_filters(record: &Value, filters: Filters<'_>) -> bool {
    filters.iter().all(|(field, expected)| {
        record
            .get(*field)
            .and_then(field_as_string)
            .is_some_and(|actual| actual == *expected)
    })
}

pub(crate) fn ensure_entity(entity: &str) -> Result<()> {
    if schema::is_valid_entity_name(entity) {
        Ok(())
    } else {
        Err(IdentityError::Config(format!("Invalid entity name: {entity:?}")))
    }
}

/// Bound a store call; elapsed deadline becomes [`IdentityError::Timeout`]
pub async fn with_timeout<T, F>(limit: Duration, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| IdentityError::Timeout)?
}
