//! Capability traits implemented by the infrastructure crates.

use crate::document::NormalizedDoc;
use crate::error::{
    ClassifierError, ClassifierUnavailable, EmbeddingError, ExtractError, GraphStoreError,
};
use crate::graph::{ExtractionResult, WritePayload};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Entity/relationship extraction over one document.
///
/// Implementations must tolerate documents with nothing to extract and
/// return empty collections rather than an error.
#[async_trait]
pub trait Extractor: Send + Sync {
    fn name(&self) -> &str;
    async fn extract(&self, doc: &NormalizedDoc) -> Result<ExtractionResult, ExtractError>;
}

/// Provider and model a classifier resolved to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifierInfo {
    pub provider: String,
    pub model: String,
}

/// Structured-output label classification.
///
/// `ensure` resolves (and memoizes) the underlying client; `classify` runs
/// one schema-constrained prompt. The split lets callers distinguish "no
/// classifier available" (fallback, not counted as failure) from "a call
/// failed" (counted).
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn ensure(&self) -> Result<ClassifierInfo, ClassifierUnavailable>;
    async fn classify(&self, prompt: &str, schema: &Value) -> Result<Value, ClassifierError>;
}

/// Text-to-vector embedding, mean-pooled and L2-normalized by convention.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;
    fn dimensions(&self) -> usize;
    fn model_name(&self) -> &str;
}

/// A node as returned from the store: opaque identity, labels, properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNodeRecord {
    pub identity: String,
    pub labels: Vec<String>,
    pub properties: Map<String, Value>,
}

/// An edge as returned from the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphEdgeRecord {
    pub identity: String,
    pub source: String,
    pub target: String,
    #[serde(rename = "type")]
    pub edge_type: String,
    pub properties: Map<String, Value>,
}

impl GraphEdgeRecord {
    /// Relation label used for type filtering: the `relation` property for
    /// entity-to-entity edges, otherwise the edge type itself.
    pub fn relation_label(&self) -> &str {
        self.properties
            .get("relation")
            .and_then(Value::as_str)
            .unwrap_or(&self.edge_type)
    }
}

/// Entity attached to a document candidate, with whatever salience and
/// precomputed structure scores the store holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySummary {
    pub name: String,
    #[serde(rename = "type")]
    pub entity_type: Option<String>,
    pub salience: Option<f64>,
    #[serde(default)]
    pub properties: Map<String, Value>,
}

/// A document with its category/tag/entity context, as consumed by the
/// ranking and hybrid-search paths.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocCandidate {
    /// All Doc node properties (`id`, `title`, `updated_at`, `gnn_*`, ...).
    pub doc: Map<String, Value>,
    pub categories: Vec<String>,
    pub tags: Vec<String>,
    pub entities: Vec<EntitySummary>,
}

impl DocCandidate {
    pub fn doc_id(&self) -> Option<&str> {
        self.doc.get("id").and_then(Value::as_str)
    }
}

/// Uniqueness constraint over a node label + property tuple.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UniqueConstraint {
    pub name: String,
    pub label: String,
    pub properties: Vec<String>,
}

/// Supporting index over a node label + property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDef {
    pub name: String,
    pub label: String,
    pub property: String,
}

/// Declarative schema applied idempotently before the first write.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphSchema {
    pub constraints: Vec<UniqueConstraint>,
    pub indexes: Vec<IndexDef>,
}

/// The property-graph store boundary.
///
/// The engine assumes uniqueness constraints on label+property tuples,
/// per-payload write transactions (all-or-nothing per document), and the
/// reads below; it assumes no particular query language.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Apply constraints and indexes; safe to call repeatedly.
    async fn ensure_schema(&self, schema: &GraphSchema) -> Result<(), GraphStoreError>;

    /// Drop all schema objects and managed nodes.
    async fn reset_schema(&self, schema: &GraphSchema) -> Result<(), GraphStoreError>;

    /// Apply one document payload atomically with merge-by-identity
    /// semantics. A failure leaves the store as it was before the call.
    async fn write_payload(&self, payload: &WritePayload) -> Result<(), GraphStoreError>;

    /// Look up a single node by label and property value.
    async fn node_by_property(
        &self,
        label: &str,
        property: &str,
        value: &Value,
    ) -> Result<Option<GraphNodeRecord>, GraphStoreError>;

    /// All edges touching a node, regardless of direction.
    async fn incident_edges(&self, identity: &str)
        -> Result<Vec<GraphEdgeRecord>, GraphStoreError>;

    /// Resolve identities to node records; unknown identities are skipped.
    async fn nodes_by_identity(
        &self,
        identities: &[String],
    ) -> Result<Vec<GraphNodeRecord>, GraphStoreError>;

    /// All documents (optionally locale-filtered) with their category, tag,
    /// and mentioned-entity context.
    async fn collect_docs(
        &self,
        locale: Option<&str>,
    ) -> Result<Vec<DocCandidate>, GraphStoreError>;

    /// Candidate context for a specific set of document ids.
    async fn doc_metadata(
        &self,
        doc_ids: &[String],
    ) -> Result<HashMap<String, DocCandidate>, GraphStoreError>;
}
