use crate::app::ports::{BatchSummary, PayloadOrigin, Source, Storage};
use crate::error::{Result, ScraperError};
use crate::types::Entity;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};
use uuid::Uuid;

/// A flushed batch, as kept in memory or written to disk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchFile {
    pub source: String,
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub origin: Option<PayloadOrigin>,
    pub entity_count: usize,
    pub entities: Vec<Entity>,
}

/// State shared by every sink while a batch is open
struct OpenBatch {
    name: String,
    run_id: Uuid,
    started_at: DateTime<Utc>,
    origin: Option<PayloadOrigin>,
    entities: Vec<Entity>,
    finished: bool,
}

impl OpenBatch {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            origin: None,
            entities: Vec::new(),
            finished: false,
        }
    }

    fn push(&mut self, entity: Entity) -> Result<()> {
        if self.finished {
            return Err(ScraperError::storage(format!(
                "cannot save {} into finished batch {}",
                entity.id, self.name
            )));
        }
        debug!("Saved entity {} into batch {}", entity.id, self.name);
        self.entities.push(entity);
        Ok(())
    }

    fn close(&mut self) -> Result<BatchFile> {
        if self.finished {
            return Err(ScraperError::storage(format!(
                "batch {} already finished",
                self.name
            )));
        }
        self.finished = true;
        let entities = std::mem::take(&mut self.entities);
        Ok(BatchFile {
            source: self.name.clone(),
            run_id: self.run_id,
            started_at: self.started_at,
            finished_at: Utc::now(),
            origin: self.origin.clone(),
            entity_count: entities.len(),
            entities,
        })
    }
}

fn summarize(batch: &BatchFile, output: Option<String>) -> BatchSummary {
    BatchSummary {
        source: batch.source.clone(),
        run_id: batch.run_id,
        entity_count: batch.entity_count,
        started_at: batch.started_at,
        finished_at: batch.finished_at,
        output,
    }
}

/// In-memory storage implementation for dry runs and testing
#[derive(Clone, Default)]
pub struct InMemoryStorage {
    batches: Arc<Mutex<Vec<BatchFile>>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every batch finished through this storage, in finish order
    pub fn batches(&self) -> Result<Vec<BatchFile>> {
        let batches = self
            .batches
            .lock()
            .map_err(|_| ScraperError::storage("in-memory batch list poisoned"))?;
        Ok(batches.clone())
    }
}

#[async_trait]
impl Storage for InMemoryStorage {
    async fn new_source(&self, name: &str) -> Result<Box<dyn Source>> {
        Ok(Box::new(InMemorySource {
            batch: OpenBatch::new(name),
            finished: self.batches.clone(),
        }))
    }
}

pub struct InMemorySource {
    batch: OpenBatch,
    finished: Arc<Mutex<Vec<BatchFile>>>,
}

#[async_trait]
impl Source for InMemorySource {
    fn set_origin(&mut self, origin: PayloadOrigin) {
        self.batch.origin = Some(origin);
    }

    async fn save(&mut self, entity: Entity) -> Result<()> {
        self.batch.push(entity)
    }

    async fn finish(&mut self) -> Result<BatchSummary> {
        let batch = self.batch.close()?;
        let summary = summarize(&batch, None);
        self.finished
            .lock()
            .map_err(|_| ScraperError::storage("in-memory batch list poisoned"))?
            .push(batch);
        Ok(summary)
    }
}

/// Writes each finished batch to `{output_dir}/{source}_{timestamp}.json`
pub struct JsonFileStorage {
    output_dir: PathBuf,
}

impl JsonFileStorage {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }
}

#[async_trait]
impl Storage for JsonFileStorage {
    async fn new_source(&self, name: &str) -> Result<Box<dyn Source>> {
        Ok(Box::new(JsonFileSource {
            batch: OpenBatch::new(name),
            output_dir: self.output_dir.clone(),
        }))
    }
}

pub struct JsonFileSource {
    batch: OpenBatch,
    output_dir: PathBuf,
}

impl JsonFileSource {
    fn persist(&self, batch: &BatchFile) -> Result<String> {
        fs::create_dir_all(&self.output_dir)?;

        let timestamp = batch.finished_at.format("%Y%m%d_%H%M%S");
        let filename = format!("{}_{}.json", batch.source, timestamp);
        let filepath = self.output_dir.join(&filename);

        let json_content = serde_json::to_string_pretty(batch)?;
        fs::write(&filepath, json_content)?;

        Ok(filepath.to_string_lossy().to_string())
    }
}

#[async_trait]
impl Source for JsonFileSource {
    fn set_origin(&mut self, origin: PayloadOrigin) {
        self.batch.origin = Some(origin);
    }

    async fn save(&mut self, entity: Entity) -> Result<()> {
        self.batch.push(entity)
    }

    async fn finish(&mut self) -> Result<BatchSummary> {
        let batch = self.batch.close()?;
        let path = self.persist(&batch)?;
        info!("💾 Wrote {} entities to {}", batch.entity_count, path);
        Ok(summarize(&batch, Some(path)))
    }
}
