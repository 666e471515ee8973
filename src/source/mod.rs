//! Source module
//!
//! Where raw records come from.
//!
//! # Overview
//!
//! - `Source` - the adapter trait: `fetch() -> Vec<RawRecord>`
//! - `HttpSource`, `FileSource`, `InlineSource` - built-in adapters
//! - `SourceRegistry` - adapters injected by name (`kind: registered`)
//! - `SourceDef` - config form of a source, with an optional fallback
//! - `SourceBinding` - a built source and its built fallback
//!
//! Sources do not retry; the controller owns retries and fallback.

mod adapters;
mod types;

pub use adapters::{records_from_body, FileSource, HttpSource, InlineSource, RegisteredSource};
pub use types::{SourceDef, SourceKind};

use crate::error::{Error, Result};
use crate::http::HttpClient;
use crate::types::RawRecord;
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::{Arc, RwLock};

/// A producer of raw records
#[async_trait]
pub trait Source: Send + Sync + Debug {
    /// Source id, used as provenance
    fn id(&self) -> &str;

    /// Fetch every record the source currently offers
    async fn fetch(&self) -> Result<Vec<RawRecord>>;
}

/// Shared handle to a source
pub type SharedSource = Arc<dyn Source>;

/// Adapters available to `kind: registered` sources
#[derive(Debug, Default)]
pub struct SourceRegistry {
    adapters: RwLock<HashMap<String, SharedSource>>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) an adapter under a name
    pub fn register(&self, name: impl Into<String>, source: SharedSource) {
        self.adapters
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(name.into(), source);
    }

    /// Look up an adapter
    pub fn get(&self, name: &str) -> Option<SharedSource> {
        self.adapters
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// Registered adapter names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .adapters
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }
}

/// A source ready to fetch, with its fallback
#[derive(Debug, Clone)]
pub struct SourceBinding {
    pub source: SharedSource,
    pub fallback: Option<Box<SourceBinding>>,
}

impl SourceBinding {
    pub fn new(source: SharedSource) -> Self {
        Self {
            source,
            fallback: None,
        }
    }

    #[must_use]
    pub fn with_fallback(mut self, fallback: SourceBinding) -> Self {
        self.fallback = Some(Box::new(fallback));
        self
    }

    pub fn id(&self) -> &str {
        self.source.id()
    }
}

impl SourceDef {
    /// Build the adapter and its fallback chain
    pub fn build(&self, client: &HttpClient, registry: &SourceRegistry) -> Result<SourceBinding> {
        let source: SharedSource = match &self.kind {
            SourceKind::Http {
                url,
                headers,
                decoder,
            } => Arc::new(
                HttpSource::new(&self.id, url, decoder.clone(), client.clone())
                    .with_headers(headers.clone()),
            ),
            SourceKind::File { path, decoder } => {
                Arc::new(FileSource::new(&self.id, path, decoder.clone()))
            }
            SourceKind::Inline { records } => Arc::new(InlineSource::new(&self.id, records.clone())),
            SourceKind::Registered { adapter } => {
                let inner = registry.get(adapter).ok_or_else(|| {
                    Error::config(format!(
                        "source '{}' uses unregistered adapter '{adapter}'",
                        self.id
                    ))
                })?;
                Arc::new(RegisteredSource::new(&self.id, inner))
            }
        };

        let mut binding = SourceBinding::new(source);
        if let Some(fallback) = &self.fallback {
            binding = binding.with_fallback(fallback.build(client, registry)?);
        }
        Ok(binding)
    }
}
