//! In-process record store with REST-collection semantics
//!
//! Mirrors what the remote store does: insertion order is list order,
//! filters compare the rendered field value, creating a record whose id is
//! already taken is rejected, and updates merge top-level fields.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::error::{IdentityError, Result};
use crate::schema;

use super::{ensure_entity, matches_filters, record_id, Filters, RecordStore};

/// Per-operation call counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreCalls {
    pub list: usize,
    pub get: usize,
    pub create: usize,
    pub update: usize,
    pub delete: usize,
}

impl StoreCalls {
    pub fn total(&self) -> usize {
        self.list + self.get + self.create + self.update + self.delete
    }
}

#[derive(Default)]
struct Counters {
    list: AtomicUsize,
    get: AtomicUsize,
    create: AtomicUsize,
    update: AtomicUsize,
    delete: AtomicUsize,
}

/// Record store kept entirely in memory
#[derive(Default)]
pub struct MemoryRecordStore {
    collections: RwLock<HashMap<String, Vec<Value>>>,
    counters: Counters,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a collection, replacing whatever it held
    pub async fn seed(&self, entity: &str, records: Vec<Value>) {
        self.collections
            .write()
            .await
            .insert(entity.to_string(), records);
    }

    /// Builder form of [`seed`](Self::seed) for synchronous setup
    pub fn with_records(mut self, entity: &str, records: Vec<Value>) -> Self {
        self.collections
            .get_mut()
            .insert(entity.to_string(), records);
        self
    }

    /// Current contents of a collection, in store order
    pub async fn records(&self, entity: &str) -> Vec<Value> {
        self.collections
            .read()
            .await
            .get(entity)
            .cloned()
            .unwrap_or_default()
    }

    /// Calls served so far
    pub fn calls(&self) -> StoreCalls {
        StoreCalls {
            list: self.counters.list.load(Ordering::SeqCst),
            get: self.counters.get.load(Ordering::SeqCst),
            create: self.counters.create.load(Ordering::SeqCst),
            update: self.counters.update.load(Ordering::SeqCst),
            delete: self.counters.delete.load(Ordering::SeqCst),
        }
    }

    fn not_found(entity: &str, id: &str) -> IdentityError {
        IdentityError::NotFound {
            entity: entity.to_string(),
            id: id.to_string(),
        }
    }
}

fn as_object(record: Value) -> Result<Map<String, Value>> {
    match record {
        Value::Object(map) => Ok(map),
        other => Err(IdentityError::Server {
            status: 400,
            message: format!("Expected a JSON object, got {other}"),
        }),
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn list(&self, entity: &str, filters: Filters<'_>) -> Result<Vec<Value>> {
        ensure_entity(entity)?;
        self.counters.list.fetch_add(1, Ordering::SeqCst);

        let collections = self.collections.read().await;
        let records: Vec<Value> = collections
            .get(entity)
            .map(|records| {
                records
                    .iter()
                    .filter(|r| matches_filters(r, filters))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        debug!(entity, matched = records.len(), "Memory store list");
        Ok(records)
    }

    async fn get(&self, entity: &str, id: &str) -> Result<Value> {
        ensure_entity(entity)?;
        self.counters.get.fetch_add(1, Ordering::SeqCst);

        self.collections
            .read()
            .await
            .get(entity)
            .and_then(|records| {
                records
                    .iter()
                    .find(|r| record_id(r).as_deref() == Some(id))
                    .cloned()
            })
            .ok_or_else(|| Self::not_found(entity, id))
    }

    async fn create(&self, entity: &str, record: Value) -> Result<Value> {
        ensure_entity(entity)?;
        self.counters.create.fetch_add(1, Ordering::SeqCst);

        let mut map = as_object(record)?;
        let id = match map.get(schema::FIELD_ID).and_then(super::field_as_string) {
            Some(id) => id,
            None => {
                let generated = Uuid::new_v4().simple().to_string();
                map.insert(schema::FIELD_ID.into(), Value::String(generated.clone()));
                generated
            }
        };

        let mut collections = self.collections.write().await;
        let records = collections.entry(entity.to_string()).or_default();
        if records.iter().any(|r| record_id(r).as_deref() == Some(id.as_str())) {
            return Err(IdentityError::Server {
                status: 500,
                message: "Insert failed, duplicate id".into(),
            });
        }

        let stored = Value::Object(map);
        records.push(stored.clone());
        debug!(entity, id = %id, "Memory store create");
        Ok(stored)
    }

    async fn update(&self, entity: &str, id: &str, patch: Value) -> Result<Value> {
        ensure_entity(entity)?;
        self.counters.update.fetch_add(1, Ordering::SeqCst);

        let patch = as_object(patch)?;
        let mut collections = self.collections.write().await;
        let record = collections
            .get_mut(entity)
            .and_then(|records| {
                records
                    .iter_mut()
                    .find(|r| record_id(r).as_deref() == Some(id))
            })
            .ok_or_else(|| Self::not_found(entity, id))?;

        if let Value::Object(existing) = &mut *record {
            for (key, value) in patch {
                // id is immutable
                if key != schema::FIELD_ID {
                    existing.insert(key, value);
                }
            }
        }

        debug!(entity, id, "Memory store update");
        Ok(record.clone())
    }

    async fn delete(&self, entity: &str, id: &str) -> Result<()> {
        ensure_entity(entity)?;
        self.counters.delete.fetch_add(1, Ordering::SeqCst);

        let mut collections = self.collections.write().await;
        let records = collections
            .get_mut(entity)
            .ok_or_else(|| Self::not_found(entity, id))?;
        let before = records.len();
        records.retain(|r| record_id(r).as_deref() != Some(id));
        if records.len() == before {
            return Err(Self::not_found(entity, id));
        }
        Ok(())
    }
}
