//! Source definitions as they appear in the config file
//!
//! ```yaml
//! - id: kpga-schedule
//!   kind: http
//!   url: https://example.com/schedule
//!   decoder:
//!     format: html
//!   defaults:
//!     association: KPGA
//!   fallback:
//!     id: kpga-fixture
//!     kind: file
//!     path: fixtures/kpga.json
//! ```

use crate::decode::{DecoderConfig, HtmlSelectors};
use crate::error::{Error, Result};
use crate::normalize::{ExtractionProfile, ExtractionProfiles};
use crate::types::JsonValue;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use url::Url;

/// One configured source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceDef {
    /// Unique id, used as provenance on records
    pub id: String,
    #[serde(flatten)]
    pub kind: SourceKind,
    /// Field values applied to rows that leave them blank
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub defaults: BTreeMap<String, String>,
    /// Selectors for HTML payloads, overriding the decoder's
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html: Option<HtmlSelectors>,
    /// Tried once this source has exhausted its retries
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback: Option<Box<SourceDef>>,
}

/// How a source obtains its data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceKind {
    /// GET a URL
    Http {
        url: String,
        #[serde(default)]
        headers: BTreeMap<String, String>,
        #[serde(default)]
        decoder: DecoderConfig,
    },
    /// Read a local file
    File {
        path: PathBuf,
        #[serde(default)]
        decoder: DecoderConfig,
    },
    /// Records embedded in the config
    Inline { records: Vec<JsonValue> },
    /// An adapter registered by name in the context
    Registered { adapter: String },
}

impl SourceKind {
    /// Short name of the kind
    pub fn name(&self) -> &'static str {
        match self {
            SourceKind::Http { .. } => "http",
            SourceKind::File { .. } => "file",
            SourceKind::Inline { .. } => "inline",
            SourceKind::Registered { .. } => "registered",
        }
    }
}

impl SourceDef {
    /// Definition with no defaults and no fallback
    pub fn new(id: impl Into<String>, kind: SourceKind) -> Self {
        Self {
            id: id.into(),
            kind,
            defaults: BTreeMap::new(),
            html: None,
            fallback: None,
        }
    }

    /// Inline source, mostly used as a fallback
    pub fn inline(id: impl Into<String>, records: Vec<JsonValue>) -> Self {
        Self::new(id, SourceKind::Inline { records })
    }

    /// Attach a fallback
    #[must_use]
    pub fn with_fallback(mut self, fallback: SourceDef) -> Self {
        self.fallback = Some(Box::new(fallback));
        self
    }

    /// Add a default field value
    #[must_use]
    pub fn with_default(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.defaults.insert(field.into(), value.into());
        self
    }

    /// Ids of this source and its fallback chain
    pub fn ids(&self) -> Vec<&str> {
        let mut ids = vec![self.id.as_str()];
        if let Some(fallback) = &self.fallback {
            ids.extend(fallback.ids());
        }
        ids
    }

    /// Extraction settings for this source and its fallbacks
    pub fn collect_profiles(&self, profiles: &mut ExtractionProfiles) {
        let html = self.html.clone().unwrap_or_else(|| match &self.kind {
            SourceKind::Http { decoder, .. } | SourceKind::File { decoder, .. } => {
                decoder.html.clone()
            }
            _ => HtmlSelectors::default(),
        });
        profiles.insert(
            self.id.clone(),
            ExtractionProfile {
                html,
                defaults: self.defaults.clone(),
            },
        );
        if let Some(fallback) = &self.fallback {
            fallback.collect_profiles(profiles);
        }
    }

    /// Check the definition without touching the network
    pub fn validate(&self, field: &str) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(Error::missing_field(format!("{field}.id")));
        }
        let field = format!("{field}.{}", self.id);

        match &self.kind {
            SourceKind::Http { url, .. } => {
                let parsed = Url::parse(url)
                    .map_err(|e| Error::invalid_value(format!("{field}.url"), e.to_string()))?;
                if !matches!(parsed.scheme(), "http" | "https") {
                    return Err(Error::invalid_value(
                        format!("{field}.url"),
                        format!("unsupported scheme '{}'", parsed.scheme()),
                    ));
                }
            }
            SourceKind::File { path, .. } if path.as_os_str().is_empty() => {
                return Err(Error::missing_field(format!("{field}.path")));
            }
            SourceKind::Registered { adapter } if adapter.trim().is_empty() => {
                return Err(Error::missing_field(format!("{field}.adapter")));
            }
            _ => {}
        }

        if let Some(fallback) = &self.fallback {
            fallback.validate(&format!("{field}.fallback"))?;
        }
        Ok(())
    }
}
