//! Built-in source adapters

use super::Source;
use crate::decode::{decoder_for, DecoderConfig, DecoderFormat};
use crate::error::{Error, Result};
use crate::http::HttpClient;
use crate::types::{JsonValue, RawPayload, RawRecord};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// Split a fetched body into raw records
///
/// HTML is kept whole and decoded during extraction, with the source's
/// selectors. Other formats are decoded here, one record per row; a row
/// that fails to parse becomes a malformed record so the rest still load.
pub fn records_from_body(
    source_id: &str,
    body: &str,
    decoder: &DecoderConfig,
) -> Result<Vec<RawRecord>> {
    let fetched_at = Utc::now();

    if decoder.format == DecoderFormat::Html {
        return Ok(vec![RawRecord::html(source_id, body).fetched_at(fetched_at)]);
    }

    let rows = decoder_for(decoder)?.decode_rows(body)?;
    let malformed = rows.iter().filter(|row| row.is_err()).count();
    if malformed > 0 {
        debug!(source = source_id, malformed, "Body has rows that failed to decode");
    }

    Ok(rows
        .into_iter()
        .map(|row| match row {
            Ok(value) => raw_from_value(source_id, value),
            Err(reason) => RawRecord::malformed(source_id, reason),
        })
        .map(|record| record.fetched_at(fetched_at))
        .collect())
}

fn raw_from_value(source_id: &str, value: JsonValue) -> RawRecord {
    match value {
        JsonValue::Object(row) => RawRecord::row(source_id, row),
        other => RawRecord::new(source_id, RawPayload::Json(other)),
    }
}

// ============================================================================
// HTTP
// ============================================================================

/// Fetches a URL through the shared client
#[derive(Debug, Clone)]
pub struct HttpSource {
    id: String,
    url: String,
    headers: BTreeMap<String, String>,
    decoder: DecoderConfig,
    client: HttpClient,
}

impl HttpSource {
    pub fn new(
        id: impl Into<String>,
        url: impl Into<String>,
        decoder: DecoderConfig,
        client: HttpClient,
    ) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            headers: BTreeMap::new(),
            decoder,
            client,
        }
    }

    #[must_use]
    pub fn with_headers(mut self, headers: BTreeMap<String, String>) -> Self {
        self.headers = headers;
        self
    }
}

#[async_trait]
impl Source for HttpSource {
    fn id(&self) -> &str {
        &self.id
    }

    async fn fetch(&self) -> Result<Vec<RawRecord>> {
        let body = self.client.get_text(&self.url, &self.headers).await?;
        debug!(source = %self.id, url = %self.url, bytes = body.len(), "Fetched body");
        records_from_body(&self.id, &body, &self.decoder)
    }
}

// ============================================================================
// File
// ============================================================================

/// Reads a local HTML, CSV, JSON or JSONL file
#[derive(Debug, Clone)]
pub struct FileSource {
    id: String,
    path: PathBuf,
    decoder: DecoderConfig,
}

impl FileSource {
    pub fn new(id: impl Into<String>, path: impl Into<PathBuf>, decoder: DecoderConfig) -> Self {
        Self {
            id: id.into(),
            path: path.into(),
            decoder,
        }
    }
}

#[async_trait]
impl Source for FileSource {
    fn id(&self) -> &str {
        &self.id
    }

    async fn fetch(&self) -> Result<Vec<RawRecord>> {
        let body = match tokio::fs::read_to_string(&self.path).await {
            Ok(body) => body,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::FileNotFound {
                    path: self.path.display().to_string(),
                })
            }
            Err(e) => return Err(e.into()),
        };
        records_from_body(&self.id, &body, &self.decoder)
    }
}

// ============================================================================
// Inline
// ============================================================================

/// Serves records embedded in the config
#[derive(Debug, Clone)]
pub struct InlineSource {
    id: String,
    records: Vec<JsonValue>,
}

impl InlineSource {
    pub fn new(id: impl Into<String>, records: Vec<JsonValue>) -> Self {
        Self {
            id: id.into(),
            records,
        }
    }
}

#[async_trait]
impl Source for InlineSource {
    fn id(&self) -> &str {
        &self.id
    }

    async fn fetch(&self) -> Result<Vec<RawRecord>> {
        let fetched_at = Utc::now();
        Ok(self
            .records
            .iter()
            .cloned()
            .map(|value| raw_from_value(&self.id, value).fetched_at(fetched_at))
            .collect())
    }
}

// ============================================================================
// Registered
// ============================================================================

/// A registered adapter bound to a configured source id
///
/// Records are re-tagged with the configured id so provenance and extraction
/// profiles follow the config, not the adapter.
#[derive(Debug, Clone)]
pub struct RegisteredSource {
    id: String,
    inner: Arc<dyn Source>,
}

impl RegisteredSource {
    pub fn new(id: impl Into<String>, inner: Arc<dyn Source>) -> Self {
        Self {
            id: id.into(),
            inner,
        }
    }
}

#[async_trait]
impl Source for RegisteredSource {
    fn id(&self) -> &str {
        &self.id
    }

    async fn fetch(&self) -> Result<Vec<RawRecord>> {
        let mut records = self.inner.fetch().await?;
        for record in &mut records {
            record.source_id.clone_from(&self.id);
        }
        Ok(records)
    }
}
