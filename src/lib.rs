// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::unused_self)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # Fairway ETL
//!
//! Collects Korean golf data (tournaments, golf courses, players) from
//! heterogeneous sources and publishes one versioned JSON snapshot.
//!
//! ## Features
//!
//! - **Sources**: HTTP, local files, inline records and injected adapters,
//!   each with an optional fallback
//! - **Normalization**: Korean/English header aliases, number and date
//!   coercion, canonical region codes
//! - **Merge**: dedup by logical key, stable ids, merge-on-write into the
//!   stored snapshot
//! - **Validation**: configurable required/range/enum rules and quality
//!   thresholds
//! - **Export**: versioned snapshot with backups, serialized writers
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use fairway_etl::{EtlConfig, EtlController};
//!
//! #[tokio::main]
//! async fn main() -> fairway_etl::Result<()> {
//!     let config = EtlConfig::from_file("fairway.yaml")?;
//!     let controller = EtlController::with_store(config.export.open_store());
//!
//!     let result = controller.run_etl(&config).await;
//!     println!("{:?}: {} warnings", result.outcome, result.warnings.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                          EtlController                           │
//! │  run_etl()   run_etl_for_type()   status()      (one run at once)│
//! └──────────────────────────────────────────────────────────────────┘
//!                                 │  per data type, concurrently
//! ┌──────────┬────────────┬───────┴─────┬────────────┬──────────────┐
//! │  Fetch   │ Normalize  │    Merge    │  Validate  │    Export    │
//! ├──────────┼────────────┼─────────────┼────────────┼──────────────┤
//! │ Batches  │ Aliases    │ Dedup       │ Rules      │ Snapshot     │
//! │ Retries  │ Coercion   │ Stable ids  │ Quality    │ Versions     │
//! │ Fallback │ Regions    │ Overlay     │            │ Backups      │
//! └──────────┴────────────┴─────────────┴────────────┴──────────────┘
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Common types and type aliases
pub mod types;

/// Typed domain records
pub mod record;

/// HTTP client with rate limiting
pub mod http;

/// Payload decoders (JSON, JSONL, CSV, HTML)
pub mod decode;

/// Source adapters and registry
pub mod source;

/// Extraction and normalization
pub mod normalize;

/// Dedup and merge-on-write
pub mod merge;

/// Validation rules
pub mod validate;

/// Quality thresholds and reports
pub mod quality;

/// Versioned snapshot store
pub mod export;

/// Pipeline configuration
pub mod config;

/// ETL controller
pub mod engine;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use config::EtlConfig;
pub use engine::{EtlContext, EtlController, RunOutcome, RunResult, RunState, StatusReport};
pub use error::{Error, Result};
pub use export::{PartialSnapshot, SnapshotStore, StoredSnapshot};
pub use record::{DomainRecord, GolfCourse, Player, Tournament};
pub use source::{Source, SourceDef, SourceRegistry};
pub use types::*;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
