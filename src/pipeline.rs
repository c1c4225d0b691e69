use crate::app::ports::{HttpClientPort, HttpGetResult, PayloadOrigin, Storage};
use crate::error::{Result, ScraperError};
use crate::normalize::{Normalizer, SemaNormalizer};
use crate::parser::{Parser, SemaXmlParser};
use crate::types::EntityType;
use chrono::{DateTime, Utc};
use metrics::{counter, histogram};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{debug, info, instrument};
use uuid::Uuid;

/// Raw document plus the facts recorded about where it came from
#[derive(Debug, Clone)]
pub struct FetchedPayload {
    pub url: String,
    pub bytes: Vec<u8>,
    pub sha256: String,
    pub fetched_at: DateTime<Utc>,
    pub content_type: Option<String>,
    pub etag: Option<String>,
    pub last_modified: Option<String>,
}

impl FetchedPayload {
    pub fn new(url: impl Into<String>, bytes: Vec<u8>) -> Self {
        let sha256 = {
            let mut h = Sha256::new();
            h.update(&bytes);
            hex::encode(h.finalize())
        };
        Self {
            url: url.into(),
            bytes,
            sha256,
            fetched_at: Utc::now(),
            content_type: None,
            etag: None,
            last_modified: None,
        }
    }

    pub fn from_response(url: impl Into<String>, resp: HttpGetResult) -> Self {
        Self {
            content_type: resp.content_type,
            etag: resp.etag,
            last_modified: resp.last_modified,
            ..Self::new(url, resp.bytes)
        }
    }

    fn origin(&self) -> PayloadOrigin {
        PayloadOrigin {
            url: self.url.clone(),
            sha256: self.sha256.clone(),
            size_bytes: self.bytes.len() as u64,
            fetched_at: self.fetched_at,
            content_type: self.content_type.clone(),
            etag: self.etag.clone(),
            last_modified: self.last_modified.clone(),
        }
    }
}

/// Result of a complete pipeline run
#[derive(Debug, Serialize)]
pub struct PipelineResult {
    pub source: String,
    pub url: String,
    pub run_id: Uuid,
    pub total_records: usize,
    pub individuals: usize,
    pub entities: usize,
    pub payload_sha256: String,
    pub output: Option<String>,
}

/// Fetch, parse, normalize and emit one sanctions list
pub struct Pipeline {
    http: Option<Box<dyn HttpClientPort>>,
    parser: Box<dyn Parser + Send + Sync>,
    normalizer: Box<dyn Normalizer + Send + Sync>,
    storage: Arc<dyn Storage>,
}

impl Pipeline {
    pub fn new(http: Box<dyn HttpClientPort>, storage: Arc<dyn Storage>) -> Self {
        Self {
            http: Some(http),
            parser: Box::new(SemaXmlParser::new()),
            normalizer: Box::new(SemaNormalizer::new()),
            storage,
        }
    }

    /// Pipeline for documents read from disk; `fetch` and `run` fail on it.
    pub fn offline(storage: Arc<dyn Storage>) -> Self {
        Self {
            http: None,
            parser: Box::new(SemaXmlParser::new()),
            normalizer: Box::new(SemaNormalizer::new()),
            storage,
        }
    }

    /// Run the complete pipeline for one source
    #[instrument(skip(self))]
    pub async fn run(&self, source_name: &str, url: &str) -> Result<PipelineResult> {
        info!("🚀 Starting pipeline for {}", source_name);
        counter!("sema_pipeline_runs_total", "source" => source_name.to_string()).increment(1);
        let t_pipeline = std::time::Instant::now();

        let payload = self.fetch(url).await?;
        let result = self.process_payload(source_name, &payload).await?;

        histogram!("sema_pipeline_duration_seconds", "source" => source_name.to_string())
            .record(t_pipeline.elapsed().as_secs_f64());
        Ok(result)
    }

    /// One GET; anything but a 2xx response is fatal.
    pub async fn fetch(&self, url: &str) -> Result<FetchedPayload> {
        info!("📡 Fetching {}", url);
        let t_fetch = std::time::Instant::now();
        let http = self
            .http
            .as_ref()
            .ok_or_else(|| ScraperError::Config("pipeline has no HTTP client".into()))?;
        let resp = http.get(url).await?;
        histogram!("sema_fetch_duration_seconds").record(t_fetch.elapsed().as_secs_f64());

        if !resp.is_success() {
            return Err(ScraperError::Status {
                url: url.to_string(),
                status: resp.status,
            });
        }

        let payload = FetchedPayload::from_response(url, resp);
        info!(
            "✅ Fetched {} bytes ({}), sha256={}",
            payload.bytes.len(),
            payload.content_type.as_deref().unwrap_or("unknown type"),
            payload.sha256
        );
        Ok(payload)
    }

    /// Parse an already fetched document and emit one batch for it
    #[instrument(skip(self, payload), fields(url = %payload.url))]
    pub async fn process_payload(
        &self,
        source_name: &str,
        payload: &FetchedPayload,
    ) -> Result<PipelineResult> {
        let records = self.parser.parse(&payload.bytes)?;
        counter!("sema_records_parsed_total", "source" => source_name.to_string())
            .increment(records.len() as u64);

        let mut source = self.storage.new_source(source_name).await?;
        source.set_origin(payload.origin());

        let mut individuals = 0;
        let mut entities = 0;
        for (i, record) in records.iter().enumerate() {
            let mut entity = source.create_entity(self.normalizer.identifier(record));
            self.normalizer.populate(&mut entity, record);

            match entity.entity_type {
                EntityType::Individual => individuals += 1,
                EntityType::Entity => entities += 1,
            }
            source.save(entity).await?;

            if (i + 1) % 500 == 0 {
                debug!("Saved {}/{} records", i + 1, records.len());
            }
        }
        counter!("sema_entities_saved_total", "source" => source_name.to_string())
            .increment(records.len() as u64);

        let summary = source.finish().await?;
        info!(
            "✅ Saved {} records ({} individuals, {} entities)",
            summary.entity_count, individuals, entities
        );

        Ok(PipelineResult {
            source: summary.source,
            url: payload.url.clone(),
            run_id: summary.run_id,
            total_records: records.len(),
            individuals,
            entities,
            payload_sha256: payload.sha256.clone(),
            output: summary.output,
        })
    }
}
