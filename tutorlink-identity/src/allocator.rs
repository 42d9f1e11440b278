//! Sequential id allocation — "read all, take max, add one"
//!
//! Two allocators, deliberately kept apart:
//!
//! - [`SnapshotIdAllocator`] is the compatibility mode. It reads the whole
//!   collection, skips ids that are not integers, and returns `max + 1`.
//!   There is no serialization between callers: two allocations that observe
//!   the same collection return the same id, and the second record submitted
//!   with it collides. That duplicate is a known limitation, not an error.
//! - [`SerializedIdAllocator`] is the production mode. Allocations for one
//!   entity are serialized behind a mutex and a per-entity high-water mark is
//!   kept, so ids handed out by one instance never repeat even when the
//!   records they label have not been committed yet. It still reads the
//!   collection each time, so ids created elsewhere are respected.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tutorlink_identity::allocator::{create_with_next_id, IdAllocator, SnapshotIdAllocator};
//! use tutorlink_identity::store::{HttpRecordStore, RecordStore};
//! use tutorlink_identity::IdentityConfig;
//!
//! #[tokio::main]
//! async fn main() -> tutorlink_identity::Result<()> {
//!     let config = IdentityConfig::new("http://localhost:3001");
//!     let store: Arc<dyn RecordStore> = Arc::new(HttpRecordStore::new(&config)?);
//!     let allocator = SnapshotIdAllocator::new(store.clone(), config.request_timeout);
//!
//!     let next = allocator.next_id("schedules").await?;
//!
//!     let created = create_with_next_id(
//!         store.as_ref(),
//!         &allocator,
//!         "reviews",
//!         serde_json::json!({ "tutorId": "2", "rating": 5 }),
//!     )
//!     .await?;
//!     Ok(())
//! }
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{IdentityError, Result};
use crate::schema;
use crate::store::{record_id, with_timeout, RecordStore};

/// Source of fresh record ids
#[async_trait]
pub trait IdAllocator: Send + Sync {
    /// Next id for `entity`, as a decimal string
    async fn next_id(&self, entity: &str) -> Result<String>;
}

/// Non-negative decimal id of any width, kept in canonical form
///
/// Canonical means ASCII digits with no leading zeros (`"0"` for zero), so
/// ordering is length first, then lexicographic. Ids are never narrowed to a
/// machine integer, which keeps `successor` total.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NumericId(String);

impl NumericId {
    pub fn zero() -> Self {
        Self("0".to_string())
    }

    /// Digits only after trimming and an optional leading `+`; anything else is `None`
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let digits = raw.strip_prefix('+').unwrap_or(raw);
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let canonical = digits.trim_start_matches('0');
        Some(if canonical.is_empty() {
            Self::zero()
        } else {
            Self(canonical.to_string())
        })
    }

    /// `self + 1`, growing by a digit on carry-out
    pub fn successor(&self) -> Self {
        let mut digits = self.0.clone().into_bytes();
        for digit in digits.iter_mut().rev() {
            if *digit == b'9' {
                *digit = b'0';
            } else {
                *digit += 1;
                return Self(String::from_utf8_lossy(&digits).into_owned());
            }
        }
        digits.insert(0, b'1');
        Self(String::from_utf8_lossy(&digits).into_owned())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Ord for NumericId {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0
            .len()
            .cmp(&other.0.len())
            .then_with(|| self.0.cmp(&other.0))
    }
}

impl PartialOrd for NumericId {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl std::fmt::Display for NumericId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Highest numeric id among `records`; non-numeric ids are skipped, empty is 0
pub fn max_numeric_id(records: &[Value]) -> NumericId {
    records
        .iter()
        .filter_map(record_id)
        .filter_map(|id| NumericId::parse(&id))
        .max()
        .unwrap_or_else(NumericId::zero)
}

/// Fetch the whole collection, mapping any failure to `AllocationUnavailable`
async fn visible_max(
    store: &dyn RecordStore,
    entity: &str,
    timeout: Duration,
) -> Result<NumericId> {
    let records = with_timeout(timeout, store.list(entity, &[]))
        .await
        .map_err(|e| {
            warn!(entity, error = %e, "Id allocation fetch failed");
            IdentityError::AllocationUnavailable {
                entity: entity.to_string(),
                reason: e.server_message(),
            }
        })?;
    Ok(max_numeric_id(&records))
}

// ─── Compatibility mode ───

/// Unsynchronized read-then-compute allocator (concurrent callers may collide)
pub struct SnapshotIdAllocator {
    store: Arc<dyn RecordStore>,
    timeout: Duration,
}

impl SnapshotIdAllocator {
    pub fn new(store: Arc<dyn RecordStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }
}

#[async_trait]
impl IdAllocator for SnapshotIdAllocator {
    async fn next_id(&self, entity: &str) -> Result<String> {
        let max = visible_max(self.store.as_ref(), entity, self.timeout).await?;
        let next = max.successor();
        debug!(entity, max = %max, next = %next, "Allocated id from snapshot");
        Ok(next.to_string())
    }
}

// ─── Production mode ───

/// Mutex-guarded allocator with a per-entity high-water mark
pub struct SerializedIdAllocator {
    store: Arc<dyn RecordStore>,
    timeout: Duration,
    issued: Mutex<HashMap<String, NumericId>>,
}

impl SerializedIdAllocator {
    pub fn new(store: Arc<dyn RecordStore>, timeout: Duration) -> Self {
        Self {
            store,
            timeout,
            issued: Mutex::new(HashMap::new()),
        }
    }

    /// Highest id this instance has handed out for `entity`
    pub async fn last_issued(&self, entity: &str) -> Option<NumericId> {
        self.issued.lock().await.get(entity).cloned()
    }
}

#[async_trait]
impl IdAllocator for SerializedIdAllocator {
    async fn next_id(&self, entity: &str) -> Result<String> {
        // Held across the fetch: allocation is serialized per instance.
        let mut issued = self.issued.lock().await;
        let visible = visible_max(self.store.as_ref(), entity, self.timeout).await?;
        let next = match issued.get(entity) {
            Some(floor) if *floor > visible => floor.successor(),
            _ => visible.successor(),
        };
        issued.insert(entity.to_string(), next.clone());

        debug!(entity, visible = %visible, next = %next, "Allocated serialized id");
        Ok(next.to_string())
    }
}

// ─── Creation flow ───

/// Allocate an id, stamp it onto `record`, and submit it
///
/// Allocation failure aborts before anything is submitted.
pub async fn create_with_next_id(
    store: &dyn RecordStore,
    allocator: &dyn IdAllocator,
    entity: &str,
    record: Value,
) -> Result<Value> {
    let Value::Object(mut fields) = record else {
        return Err(IdentityError::Serialization(format!(
            "{entity} record must be a JSON object"
        )));
    };

    let id = allocator.next_id(entity).await?;
    fields.insert(schema::FIELD_ID.to_string(), Value::String(id.clone()));

    let created = store.create(entity, Value::Object(fields)).await?;
    info!(entity, id = %id, "Record created");
    Ok(created)
}
