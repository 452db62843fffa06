//! Ingest pipeline for graphloom.
//!
//! Infrastructure crates provide capabilities (parsing, normalization,
//! storage, telemetry); this crate coordinates them:
//!
//! 1. collect markdown documents and normalize their metadata
//! 2. gate on the ingest cache and the quality checks
//! 3. extract entities/relationships through the configured adapter
//! 4. sanitize and normalize the extraction
//! 5. assemble write payloads and run the guards
//! 6. write one transaction per document and update the caches

pub mod cache;
pub mod collect;
pub mod extract;
pub mod ingest;
pub mod metadata;
pub mod payload;
pub mod quality;
pub mod sanitize;

pub use cache::{IngestCache, IngestCacheEntry};
pub use collect::{collect_documents, CollectOptions};
pub use extract::{create_extractor, PlaceholderExtractor};
pub use ingest::{IngestOptions, IngestPipeline, IngestSummary, SkipRecord};
pub use metadata::normalize_document;
pub use payload::{build_payload, PayloadOptions};
pub use quality::{QualityChecker, QualityConfig};
pub use sanitize::{sanitize_extraction, SanitizeLimits};
