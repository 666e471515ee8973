//! Payload decoder module
//!
//! Supports: JSON, JSONL, CSV, HTML
//!
//! # Overview
//!
//! Sources use these decoders to split a fetched body into rows. HTML bodies
//! are kept raw by sources and decoded during extraction.

mod decoders;
mod types;

pub use decoders::{decoder_for, CsvDecoder, HtmlDecoder, JsonDecoder, JsonlDecoder};
pub use types::{DecodedRow, DecoderConfig, DecoderFormat, HtmlSelectors, RecordDecoder};
