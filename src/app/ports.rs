use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;
use crate::types::Entity;

// Ingest-side ports
#[async_trait]
pub trait HttpClientPort: Send + Sync {
    async fn get(&self, url: &str) -> Result<HttpGetResult>;
}

#[derive(Clone, Debug)]
pub struct HttpGetResult {
    pub status: u16,
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
    pub etag: Option<String>,
    pub last_modified: Option<String>,
}

impl HttpGetResult {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Where a batch's entities were read from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadOrigin {
    pub url: String,
    pub sha256: String,
    pub size_bytes: u64,
    pub fetched_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<String>,
}

/// Report returned once a batch has been flushed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchSummary {
    pub source: String,
    pub run_id: Uuid,
    pub entity_count: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Location of the written batch, for sinks that write one
    pub output: Option<String>,
}

// Emit-side ports

/// Opens output batches
#[async_trait]
pub trait Storage: Send + Sync {
    async fn new_source(&self, name: &str) -> Result<Box<dyn Source>>;
}

/// One open output batch. Entities are created from it, populated, then saved
/// back exactly once; `finish` flushes the whole batch.
#[async_trait]
pub trait Source: Send {
    fn create_entity(&self, id: String) -> Entity {
        Entity::new(id)
    }

    fn set_origin(&mut self, origin: PayloadOrigin);

    async fn save(&mut self, entity: Entity) -> Result<()>;

    async fn finish(&mut self) -> Result<BatchSummary>;
}
