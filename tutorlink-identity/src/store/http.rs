//! HTTP record store — REST collections over reqwest
//!
//! ```text
//! GET    /{entity}?field=value&…   list with equality filters
//! GET    /{entity}/{id}            get by id
//! POST   /{entity}                 create
//! PATCH  /{entity}/{id}            partial update (merge)
//! DELETE /{entity}/{id}            delete
//! ```

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::config::IdentityConfig;
use crate::error::{IdentityError, Result};

use super::{ensure_entity, Filters, RecordStore};

/// Record store reached over HTTP
#[derive(Debug, Clone)]
pub struct HttpRecordStore {
    client: Client,
    base_url: Url,
}

impl HttpRecordStore {
    /// Build a client whose every request is bounded by `config.request_timeout`
    pub fn new(config: &IdentityConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| IdentityError::Config(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url()?,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn collection_url(&self, entity: &str) -> Result<Url> {
        ensure_entity(entity)?;
        Ok(self.base_url.join(entity)?)
    }

    fn item_url(&self, entity: &str, id: &str) -> Result<Url> {
        let mut url = self.collection_url(entity)?;
        url.path_segments_mut()
            .map_err(|_| IdentityError::Config(format!("Not a base URL: {}", self.base_url)))?
            .push(id);
        Ok(url)
    }

    /// Turn a response into JSON, mapping non-2xx statuses to typed errors
    async fn read_json(response: Response, not_found: Option<(&str, &str)>) -> Result<Value> {
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            if let Some((entity, id)) = not_found {
                return Err(IdentityError::NotFound {
                    entity: entity.to_string(),
                    id: id.to_string(),
                });
            }
        }

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), message = %message, "Record store rejected request");
            return Err(IdentityError::Server {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json::<Value>().await?)
    }
}

#[async_trait]
impl RecordStore for HttpRecordStore {
    async fn list(&self, entity: &str, filters: Filters<'_>) -> Result<Vec<Value>> {
        let mut url = self.collection_url(entity)?;
        if !filters.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (field, value) in filters {
                pairs.append_pair(field, value);
            }
        }

        let response = self.client.get(url).send().await?;
        let body = Self::read_json(response, None).await?;
        let records: Vec<Value> = serde_json::from_value(body)?;

        debug!(entity, count = records.len(), "Listed records");
        Ok(records)
    }

    async fn get(&self, entity: &str, id: &str) -> Result<Value> {
        let url = self.item_url(entity, id)?;
        let response = self.client.get(url).send().await?;
        Self::read_json(response, Some((entity, id))).await
    }

    async fn create(&self, entity: &str, record: Value) -> Result<Value> {
        let url = self.collection_url(entity)?;
        let response = self.client.post(url).json(&record).send().await?;
        let created = Self::read_json(response, None).await?;

        debug!(entity, id = ?created.get("id"), "Created record");
        Ok(created)
    }

    async fn update(&self, entity: &str, id: &str, patch: Value) -> Result<Value> {
        let url = self.item_url(entity, id)?;
        let response = self.client.patch(url).json(&patch).send().await?;
        let updated = Self::read_json(response, Some((entity, id))).await?;

        debug!(entity, id, "Updated record");
        Ok(updated)
    }

    async fn delete(&self, entity: &str, id: &str) -> Result<()> {
        let url = self.item_url(entity, id)?;
        let response = self.client.delete(url).send().await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Err(IdentityError::NotFound {
                entity: entity.to_string(),
                id: id.to_string(),
            });
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(IdentityError::Server {
                status: status.as_u16(),
                message,
            });
        }

        debug!(entity, id, "Deleted record");
        Ok(())
    }
}
