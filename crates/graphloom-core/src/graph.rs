//! Graph-side shapes: extraction results and write payloads.

use crate::document::{CategoryRef, Chunk, TagRef};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// An extracted entity. Identity is the `(type, name)` pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub name: String,
    #[serde(rename = "type")]
    pub entity_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub salience: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Free-form extracted properties, normalized by the property resolver.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub properties: Map<String, Value>,
}

impl Entity {
    pub fn new(name: impl Into<String>, entity_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entity_type: entity_type.into(),
            salience: None,
            description: None,
            summary: None,
            source: None,
            url: None,
            properties: Map::new(),
        }
    }
}

/// Lightweight endpoint reference inside relationships and mentions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRef {
    pub name: String,
    #[serde(rename = "type")]
    pub entity_type: String,
}

/// A typed edge between two entities. Stored direction follows extraction;
/// bidirectional relations arrive as two edges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    pub source: EntityRef,
    pub target: EntityRef,
    /// Relation label, normalized to the closed vocabulary.
    #[serde(rename = "type")]
    pub relation: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evidence: Option<String>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub properties: Map<String, Value>,
}

/// A chunk-to-entity extraction hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mention {
    pub chunk_id: String,
    pub entity: EntityRef,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
}

/// Candidate for the document's canonical `HAS_ENTITY` target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocEntityRoot {
    pub name: String,
    #[serde(rename = "type")]
    pub entity_type: String,
    /// Normalized entity key the candidate was deduplicated on.
    pub key: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticLevel {
    Info,
    Warning,
    Error,
}

/// Extractor-side note surfaced in the run summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub level: DiagnosticLevel,
    pub message: String,
}

/// Everything an [`crate::traits::Extractor`] produces for one document.
/// All collections may be empty; an entity-free document is not an error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractionResult {
    #[serde(default)]
    pub entities: Vec<Entity>,
    #[serde(default)]
    pub relationships: Vec<Relationship>,
    #[serde(default)]
    pub mentions: Vec<Mention>,
    #[serde(default)]
    pub doc_entity_roots: Vec<DocEntityRoot>,
    #[serde(default)]
    pub diagnostics: Vec<Diagnostic>,
}

/// Doc node properties as persisted to the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocNode {
    pub id: String,
    pub title: String,
    pub description: String,
    pub locale: String,
    pub updated_at: Option<DateTime<Utc>>,
    pub source_path: String,
    pub hash: String,
    /// Additional scalar properties (front-matter passthrough).
    #[serde(default, flatten)]
    pub extra: Map<String, Value>,
}

/// One document's worth of graph writes, applied as a single transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WritePayload {
    pub doc: DocNode,
    #[serde(default)]
    pub categories: Vec<CategoryRef>,
    #[serde(default)]
    pub tags: Vec<TagRef>,
    #[serde(default)]
    pub chunks: Vec<Chunk>,
    #[serde(default)]
    pub entities: Vec<Entity>,
    #[serde(default)]
    pub relationships: Vec<Relationship>,
    #[serde(default)]
    pub mentions: Vec<Mention>,
    #[serde(default)]
    pub doc_entity_roots: Vec<DocEntityRoot>,
    #[serde(default)]
    pub diagnostics: Vec<Diagnostic>,
}
