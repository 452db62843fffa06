//! Core domain model and capability traits for graphloom.
//!
//! This crate defines the shapes that flow through the pipeline (documents,
//! chunks, entities, relationships, write payloads) and the trait seams the
//! infrastructure crates implement:
//!
//! - [`traits::Extractor`] — entity/relationship extraction over a document
//! - [`traits::Classifier`] — structured-output label classification
//! - [`traits::EmbeddingProvider`] — text-to-vector embedding
//! - [`traits::GraphStore`] — the property-graph store boundary
//!
//! Infrastructure crates depend on this one, never the other way around, so
//! the pipeline orchestrator can be wired from injected implementations.

pub mod document;
pub mod error;
pub mod graph;
pub mod hashing;
pub mod keys;
pub mod traits;
pub mod vocab;

pub use document::{CategoryRef, Chunk, NormalizedDoc, RawDocument, TagRef};
pub use error::{
    ClassifierError, ClassifierUnavailable, EmbeddingError, ExtractError, GraphStoreError,
};
pub use graph::{
    Diagnostic, DiagnosticLevel, DocEntityRoot, DocNode, Entity, EntityRef, ExtractionResult,
    Mention, Relationship, WritePayload,
};
pub use keys::{normalize_entity_key, normalize_loose_label};
