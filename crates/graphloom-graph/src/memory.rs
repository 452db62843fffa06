//! In-memory reference implementation of the graph store boundary.
//!
//! A compact property graph (labels, properties, merge-by-identity writes,
//! per-payload transactions) with optional JSON snapshot persistence so CLI
//! runs survive across processes. Lookups scan; the managed graphs are
//! document-collection sized, not database sized.

use crate::schema::{edge_types, labels};
use async_trait::async_trait;
use chrono::Utc;
use graphloom_core::traits::{
    DocCandidate, EntitySummary, GraphNodeRecord, GraphEdgeRecord, GraphSchema, GraphStore,
};
use graphloom_core::vocab::select_type;
use graphloom_core::{Entity, GraphStoreError, WritePayload};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::io;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct NodeData {
    labels: Vec<String>,
    properties: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct EdgeData {
    source: u64,
    target: u64,
    edge_type: String,
    properties: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct GraphData {
    next_id: u64,
    nodes: BTreeMap<u64, NodeData>,
    edges: BTreeMap<u64, EdgeData>,
    schema: GraphSchema,
}

/// See module docs.
#[derive(Debug, Default)]
pub struct MemoryGraphStore {
    data: RwLock<GraphData>,
}

impl MemoryGraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a previously saved snapshot; a missing file yields an empty
    /// store.
    pub fn load_snapshot(path: &Path) -> io::Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(raw) => {
                let data: GraphData = serde_json::from_str(&raw)
                    .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;
                Ok(Self { data: RwLock::new(data) })
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(Self::new()),
            Err(err) => Err(err),
        }
    }

    pub fn save_snapshot(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let data = self.data.read();
        let serialized = serde_json::to_string(&*data)
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;
        std::fs::write(path, serialized)
    }

    pub fn node_count(&self) -> usize {
        self.data.read().nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.data.read().edges.len()
    }
}

fn new_node(data: &mut GraphData, label: &str, properties: Map<String, Value>) -> u64 {
    let id = data.next_id;
    data.next_id += 1;
    let mut properties = properties;
    properties
        .entry("created_at".to_string())
        .or_insert_with(|| Value::String(Utc::now().to_rfc3339()));
    data.nodes.insert(
        id,
        NodeData { labels: vec![label.to_string()], properties },
    );
    id
}

fn find_node(data: &GraphData, label: &str, property: &str, value: &Value) -> Option<u64> {
    data.nodes.iter().find_map(|(id, node)| {
        if node.labels.iter().any(|l| l == label) && node.properties.get(property) == Some(value) {
            Some(*id)
        } else {
            None
        }
    })
}

fn find_entity(data: &GraphData, entity_type: &str, name: &str) -> Option<u64> {
    data.nodes.iter().find_map(|(id, node)| {
        if node.labels.iter().any(|l| l == labels::ENTITY)
            && node.properties.get("name").and_then(Value::as_str) == Some(name)
            && node.properties.get("type").and_then(Value::as_str) == Some(entity_type)
        {
            Some(*id)
        } else {
            None
        }
    })
}

/// Merge an entity by `(type, name)`. When only the type differs from an
/// existing same-name node, the existing node is relabeled in place to the
/// higher-priority type instead of creating a duplicate logical entity.
fn merge_entity(data: &mut GraphData, entity_type: &str, name: &str) -> u64 {
    if let Some(id) = find_entity(data, entity_type, name) {
        return id;
    }
    if let Some(id) = find_node(data, labels::ENTITY, "name", &Value::String(name.to_string())) {
        let current = data.nodes[&id]
            .properties
            .get("type")
            .and_then(Value::as_str)
            .map(str::to_string);
        let winner = select_type(current.as_deref(), Some(entity_type));
        if let Some(node) = data.nodes.get_mut(&id) {
            node.properties
                .insert("type".to_string(), Value::String(winner));
        }
        return id;
    }
    let mut properties = Map::new();
    properties.insert("name".to_string(), Value::String(name.to_string()));
    properties.insert("type".to_string(), Value::String(entity_type.to_string()));
    new_node(data, labels::ENTITY, properties)
}

fn set_entity_properties(data: &mut GraphData, id: u64, entity: &Entity) {
    let Some(node) = data.nodes.get_mut(&id) else {
        return;
    };
    let props = &mut node.properties;
    if let Some(salience) = entity.salience {
        props.insert("salience".to_string(), Value::from(salience));
    }
    if let Some(description) = &entity.description {
        props.insert("description".to_string(), Value::String(description.clone()));
    }
    if let Some(summary) = &entity.summary {
        props.insert("summary".to_string(), Value::String(summary.clone()));
    }
    if let Some(source) = &entity.source {
        props.insert("source".to_string(), Value::String(source.clone()));
    }
    if let Some(url) = &entity.url {
        props.insert("url".to_string(), Value::String(url.clone()));
    }
    for (key, value) in &entity.properties {
        props.insert(key.clone(), value.clone());
    }
}

fn ensure_edge(
    data: &mut GraphData,
    source: u64,
    target: u64,
    edge_type: &str,
    relation: Option<&str>,
) -> u64 {
    let existing = data.edges.iter().find_map(|(id, edge)| {
        let relation_matches = match relation {
            Some(relation) => {
                edge.properties.get("relation").and_then(Value::as_str) == Some(relation)
            }
            None => true,
        };
        if edge.source == source
            && edge.target == target
            && edge.edge_type == edge_type
            && relation_matches
        {
            Some(*id)
        } else {
            None
        }
    });
    if let Some(id) = existing {
        return id;
    }
    let id = data.next_id;
    data.next_id += 1;
    let mut properties = Map::new();
    if let Some(relation) = relation {
        properties.insert("relation".to_string(), Value::String(relation.to_string()));
    }
    data.edges.insert(
        id,
        EdgeData {
            source,
            target,
            edge_type: edge_type.to_string(),
            properties,
        },
    );
    id
}

fn apply_payload(data: &mut GraphData, payload: &WritePayload) -> Result<(), GraphStoreError> {
    if payload.doc.id.trim().is_empty() {
        return Err(GraphStoreError::ConstraintViolation(
            "Doc.id must not be empty".to_string(),
        ));
    }

    // Doc node, merged by id.
    let doc_value = Value::String(payload.doc.id.clone());
    let doc_id = match find_node(data, labels::DOC, "id", &doc_value) {
        Some(id) => id,
        None => {
            let mut properties = Map::new();
            properties.insert("id".to_string(), doc_value.clone());
            new_node(data, labels::DOC, properties)
        }
    };
    if let Some(node) = data.nodes.get_mut(&doc_id) {
        let props = &mut node.properties;
        props.insert("title".to_string(), Value::String(payload.doc.title.clone()));
        props.insert(
            "description".to_string(),
            Value::String(payload.doc.description.clone()),
        );
        props.insert("locale".to_string(), Value::String(payload.doc.locale.clone()));
        props.insert(
            "updated_at".to_string(),
            payload
                .doc
                .updated_at
                .map(|ts| Value::String(ts.to_rfc3339()))
                .unwrap_or(Value::Null),
        );
        props.insert(
            "source_path".to_string(),
            Value::String(payload.doc.source_path.clone()),
        );
        props.insert("hash".to_string(), Value::String(payload.doc.hash.clone()));
        for (key, value) in &payload.doc.extra {
            props.insert(key.clone(), value.clone());
        }
    }

    for category in &payload.categories {
        let id = match find_node(
            data,
            labels::CATEGORY,
            "name",
            &Value::String(category.name.clone()),
        ) {
            Some(id) => id,
            None => {
                let mut properties = Map::new();
                properties.insert("name".to_string(), Value::String(category.name.clone()));
                new_node(data, labels::CATEGORY, properties)
            }
        };
        if let Some(node) = data.nodes.get_mut(&id) {
            node.properties
                .insert("slug".to_string(), Value::String(category.slug.clone()));
        }
        ensure_edge(data, doc_id, id, edge_types::IN_CATEGORY, None);
    }

    for tag in &payload.tags {
        let id = match find_node(data, labels::TAG, "name", &Value::String(tag.name.clone())) {
            Some(id) => id,
            None => {
                let mut properties = Map::new();
                properties.insert("name".to_string(), Value::String(tag.name.clone()));
                new_node(data, labels::TAG, properties)
            }
        };
        if let Some(node) = data.nodes.get_mut(&id) {
            node.properties
                .insert("slug".to_string(), Value::String(tag.slug.clone()));
        }
        ensure_edge(data, doc_id, id, edge_types::HAS_TAG, None);
    }

    for chunk in &payload.chunks {
        let id = match find_node(data, labels::CHUNK, "id", &Value::String(chunk.id.clone())) {
            Some(id) => id,
            None => {
                let mut properties = Map::new();
                properties.insert("id".to_string(), Value::String(chunk.id.clone()));
                new_node(data, labels::CHUNK, properties)
            }
        };
        if let Some(node) = data.nodes.get_mut(&id) {
            let props = &mut node.properties;
            props.insert("order".to_string(), Value::from(chunk.order as u64));
            props.insert("text".to_string(), Value::String(chunk.text.clone()));
            props.insert("doc_id".to_string(), Value::String(payload.doc.id.clone()));
        }
        ensure_edge(data, id, doc_id, edge_types::PART_OF, None);
    }

    for entity in &payload.entities {
        let id = merge_entity(data, &entity.entity_type, &entity.name);
        set_entity_properties(data, id, entity);
    }

    for mention in &payload.mentions {
        if mention.chunk_id.trim().is_empty() || mention.entity.name.trim().is_empty() {
            continue;
        }
        // Mentions attach to written chunks only.
        let Some(chunk_node) = find_node(
            data,
            labels::CHUNK,
            "id",
            &Value::String(mention.chunk_id.clone()),
        ) else {
            continue;
        };
        let entity_node = merge_entity(data, &mention.entity.entity_type, &mention.entity.name);
        let edge = ensure_edge(data, chunk_node, entity_node, edge_types::MENTIONS, None);
        if let Some(edge) = data.edges.get_mut(&edge) {
            if let Some(confidence) = mention.confidence {
                edge.properties
                    .insert("confidence".to_string(), Value::from(confidence));
            }
            if let Some(snippet) = &mention.snippet {
                edge.properties
                    .insert("snippet".to_string(), Value::String(snippet.clone()));
            }
        }
    }

    for relationship in &payload.relationships {
        let source = merge_entity(
            data,
            &relationship.source.entity_type,
            &relationship.source.name,
        );
        let target = merge_entity(
            data,
            &relationship.target.entity_type,
            &relationship.target.name,
        );
        let edge = ensure_edge(
            data,
            source,
            target,
            edge_types::RELATED,
            Some(&relationship.relation),
        );
        if let Some(edge) = data.edges.get_mut(&edge) {
            if let Some(weight) = relationship.weight {
                edge.properties.insert("weight".to_string(), Value::from(weight));
            }
            if let Some(evidence) = &relationship.evidence {
                edge.properties
                    .insert("evidence".to_string(), Value::String(evidence.clone()));
            }
            for (key, value) in &relationship.properties {
                edge.properties.insert(key.clone(), value.clone());
            }
        }
    }

    for root in &payload.doc_entity_roots {
        let entity = merge_entity(data, &root.entity_type, &root.name);
        ensure_edge(data, doc_id, entity, edge_types::HAS_ENTITY, None);
    }

    Ok(())
}

fn node_record(id: u64, node: &NodeData) -> GraphNodeRecord {
    GraphNodeRecord {
        identity: id.to_string(),
        labels: node.labels.clone(),
        properties: node.properties.clone(),
    }
}

fn edge_record(id: u64, edge: &EdgeData) -> GraphEdgeRecord {
    GraphEdgeRecord {
        identity: id.to_string(),
        source: edge.source.to_string(),
        target: edge.target.to_string(),
        edge_type: edge.edge_type.clone(),
        properties: edge.properties.clone(),
    }
}

fn candidate_for(data: &GraphData, doc_node: u64) -> DocCandidate {
    let mut categories = Vec::new();
    let mut tags = Vec::new();
    let mut chunk_ids = Vec::new();
    for edge in data.edges.values() {
        if edge.source == doc_node && edge.edge_type == edge_types::IN_CATEGORY {
            if let Some(name) = node_name(data, edge.target) {
                categories.push(name);
            }
        }
        if edge.source == doc_node && edge.edge_type == edge_types::HAS_TAG {
            if let Some(name) = node_name(data, edge.target) {
                tags.push(name);
            }
        }
        if edge.target == doc_node && edge.edge_type == edge_types::PART_OF {
            chunk_ids.push(edge.source);
        }
    }

    let mut seen = HashSet::new();
    let mut entities = Vec::new();
    for chunk in chunk_ids {
        for edge in data.edges.values() {
            if edge.source != chunk || edge.edge_type != edge_types::MENTIONS {
                continue;
            }
            if !seen.insert(edge.target) {
                continue;
            }
            if let Some(node) = data.nodes.get(&edge.target) {
                let name = node
                    .properties
                    .get("name")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                if name.is_empty() {
                    continue;
                }
                entities.push(EntitySummary {
                    name,
                    entity_type: node
                        .properties
                        .get("type")
                        .and_then(Value::as_str)
                        .map(str::to_string),
                    salience: node.properties.get("salience").and_then(Value::as_f64),
                    properties: node.properties.clone(),
                });
            }
        }
    }

    categories.sort();
    tags.sort();
    DocCandidate {
        doc: data
            .nodes
            .get(&doc_node)
            .map(|node| node.properties.clone())
            .unwrap_or_default(),
        categories,
        tags,
        entities,
    }
}

fn node_name(data: &GraphData, id: u64) -> Option<String> {
    data.nodes
        .get(&id)?
        .properties
        .get("name")
        .and_then(Value::as_str)
        .map(str::to_string)
}

#[async_trait]
impl GraphStore for MemoryGraphStore {
    async fn ensure_schema(&self, schema: &GraphSchema) -> Result<(), GraphStoreError> {
        let mut data = self.data.write();
        data.schema = schema.clone();
        debug!(
            constraints = schema.constraints.len(),
            indexes = schema.indexes.len(),
            "schema ensured"
        );
        Ok(())
    }

    async fn reset_schema(&self, _schema: &GraphSchema) -> Result<(), GraphStoreError> {
        let mut data = self.data.write();
        *data = GraphData::default();
        Ok(())
    }

    async fn write_payload(&self, payload: &WritePayload) -> Result<(), GraphStoreError> {
        let mut data = self.data.write();
        // Stage on a copy so a mid-payload failure cannot leave partial
        // writes behind.
        let mut staged = data.clone();
        apply_payload(&mut staged, payload)?;
        *data = staged;
        Ok(())
    }

    async fn node_by_property(
        &self,
        label: &str,
        property: &str,
        value: &Value,
    ) -> Result<Option<GraphNodeRecord>, GraphStoreError> {
        let data = self.data.read();
        Ok(find_node(&data, label, property, value)
            .map(|id| node_record(id, &data.nodes[&id])))
    }

    async fn incident_edges(
        &self,
        identity: &str,
    ) -> Result<Vec<GraphEdgeRecord>, GraphStoreError> {
        let id: u64 = identity
            .parse()
            .map_err(|_| GraphStoreError::NotFound(identity.to_string()))?;
        let data = self.data.read();
        Ok(data
            .edges
            .iter()
            .filter(|(_, edge)| edge.source == id || edge.target == id)
            .map(|(edge_id, edge)| edge_record(*edge_id, edge))
            .collect())
    }

    async fn nodes_by_identity(
        &self,
        identities: &[String],
    ) -> Result<Vec<GraphNodeRecord>, GraphStoreError> {
        let data = self.data.read();
        Ok(identities
            .iter()
            .filter_map(|identity| {
                let id: u64 = identity.parse().ok()?;
                data.nodes.get(&id).map(|node| node_record(id, node))
            })
            .collect())
    }

    async fn collect_docs(
        &self,
        locale: Option<&str>,
    ) -> Result<Vec<DocCandidate>, GraphStoreError> {
        let data = self.data.read();
        let mut candidates = Vec::new();
        for (id, node) in &data.nodes {
            if !node.labels.iter().any(|l| l == labels::DOC) {
                continue;
            }
            if let Some(locale) = locale {
                if node.properties.get("locale").and_then(Value::as_str) != Some(locale) {
                    continue;
                }
            }
            candidates.push(candidate_for(&data, *id));
        }
        Ok(candidates)
    }

    async fn doc_metadata(
        &self,
        doc_ids: &[String],
    ) -> Result<HashMap<String, DocCandidate>, GraphStoreError> {
        let data = self.data.read();
        let mut map = HashMap::new();
        for doc_id in doc_ids {
            let value = Value::String(doc_id.clone());
            if let Some(node) = find_node(&data, labels::DOC, "id", &value) {
                map.insert(doc_id.clone(), candidate_for(&data, node));
            }
        }
        Ok(map)
    }
}
