//! Store semantics: merge idempotence, entity identity, transaction
//! atomicity, snapshot round-trips.

use chrono::{TimeZone, Utc};
use graphloom_core::document::{CategoryRef, Chunk, TagRef};
use graphloom_core::traits::GraphStore;
use graphloom_core::{
    DocEntityRoot, DocNode, Entity, EntityRef, Mention, Relationship, WritePayload,
};
use graphloom_graph::{default_schema, GraphWriter, MemoryGraphStore};
use serde_json::{json, Map};
use std::sync::Arc;

fn doc_node(id: &str, title: &str) -> DocNode {
    DocNode {
        id: id.to_string(),
        title: title.to_string(),
        description: "a document".to_string(),
        locale: "en".to_string(),
        updated_at: Some(Utc.with_ymd_and_hms(2026, 5, 1, 12, 0, 0).unwrap()),
        source_path: format!("/content/{id}.md"),
        hash: "hash-1".to_string(),
        extra: Map::new(),
    }
}

fn base_payload(id: &str, title: &str) -> WritePayload {
    WritePayload {
        doc: doc_node(id, title),
        categories: vec![CategoryRef { name: "AI".into(), slug: "ai".into() }],
        tags: vec![TagRef { name: "graphs".into(), slug: "graphs".into() }],
        chunks: vec![Chunk {
            id: format!("{id}#001"),
            order: 1,
            text: "first paragraph".into(),
        }],
        entities: vec![Entity::new("Ada Lovelace", "Person")],
        relationships: Vec::new(),
        mentions: vec![Mention {
            chunk_id: format!("{id}#001"),
            entity: EntityRef { name: "Ada Lovelace".into(), entity_type: "Person".into() },
            confidence: Some(0.8),
            snippet: Some("Ada".into()),
        }],
        doc_entity_roots: vec![DocEntityRoot {
            name: "Ada Lovelace".into(),
            entity_type: "Person".into(),
            key: "adalovelace".into(),
        }],
        diagnostics: Vec::new(),
    }
}

#[tokio::test]
async fn rewriting_the_same_payload_is_idempotent() {
    let store = MemoryGraphStore::new();
    store.ensure_schema(&default_schema()).await.unwrap();

    let payload = base_payload("en/ada", "Ada Lovelace");
    store.write_payload(&payload).await.unwrap();
    let nodes = store.node_count();
    let edges = store.edge_count();

    store.write_payload(&payload).await.unwrap();
    assert_eq!(store.node_count(), nodes);
    assert_eq!(store.edge_count(), edges);
}

#[tokio::test]
async fn doc_rewrite_updates_properties_in_place() {
    let store = MemoryGraphStore::new();
    let mut payload = base_payload("en/ada", "Ada Lovelace");
    store.write_payload(&payload).await.unwrap();

    payload.doc.title = "Ada, revised".to_string();
    payload.doc.hash = "hash-2".to_string();
    store.write_payload(&payload).await.unwrap();

    let node = store
        .node_by_property("Doc", "id", &json!("en/ada"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(node.properties["title"], "Ada, revised");
    assert_eq!(node.properties["hash"], "hash-2");
}

#[tokio::test]
async fn same_name_entities_merge_keeping_higher_priority_type() {
    let store = MemoryGraphStore::new();
    let mut payload = base_payload("en/one", "One");
    payload.entities = vec![Entity::new("Turing", "Concept")];
    payload.mentions.clear();
    payload.doc_entity_roots.clear();
    store.write_payload(&payload).await.unwrap();

    let mut second = base_payload("en/two", "Two");
    second.entities = vec![Entity::new("Turing", "Person")];
    second.mentions.clear();
    second.doc_entity_roots.clear();
    store.write_payload(&second).await.unwrap();

    let node = store
        .node_by_property("Entity", "name", &json!("Turing"))
        .await
        .unwrap()
        .unwrap();
    // Relabeled in place, not duplicated.
    assert_eq!(node.properties["type"], "Person");

    let mut third = base_payload("en/three", "Three");
    third.entities = vec![Entity::new("Turing", "Concept")];
    third.mentions.clear();
    third.doc_entity_roots.clear();
    store.write_payload(&third).await.unwrap();
    let node = store
        .node_by_property("Entity", "name", &json!("Turing"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(node.properties["type"], "Person");
}

#[tokio::test]
async fn failed_payload_leaves_the_store_untouched() {
    let store = MemoryGraphStore::new();
    store.write_payload(&base_payload("en/ok", "Ok")).await.unwrap();
    let nodes = store.node_count();

    let mut bad = base_payload("", "broken");
    bad.doc.id = "  ".to_string();
    assert!(store.write_payload(&bad).await.is_err());
    assert_eq!(store.node_count(), nodes);
}

#[tokio::test]
async fn writer_reports_partial_success() {
    let store = Arc::new(MemoryGraphStore::new());
    let writer = GraphWriter::new(store.clone());

    let mut bad = base_payload("", "broken");
    bad.doc.id = String::new();
    let payloads = vec![base_payload("en/a", "A"), bad, base_payload("en/b", "B")];

    let report = writer.write_batch(&payloads).await;
    assert_eq!(report.written, 2);
    assert_eq!(report.failures.len(), 1);
    assert!(store
        .node_by_property("Doc", "id", &json!("en/b"))
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn writer_attaches_exactly_one_primary_entity() {
    let store = Arc::new(MemoryGraphStore::new());
    let writer = GraphWriter::new(store.clone());

    let mut payload = base_payload("en/rag", "GraphRAG ingestion");
    payload.doc_entity_roots = vec![
        DocEntityRoot { name: "Ada".into(), entity_type: "Person".into(), key: "ada".into() },
        DocEntityRoot {
            name: "GraphRAG".into(),
            entity_type: "Concept".into(),
            key: "graphrag".into(),
        },
    ];
    writer.write_batch(&[payload]).await;

    let doc = store
        .node_by_property("Doc", "id", &json!("en/rag"))
        .await
        .unwrap()
        .unwrap();
    let edges = store.incident_edges(&doc.identity).await.unwrap();
    let has_entity: Vec<_> = edges.iter().filter(|e| e.edge_type == "HAS_ENTITY").collect();
    assert_eq!(has_entity.len(), 1);
    let targets = store
        .nodes_by_identity(&[has_entity[0].target.clone()])
        .await
        .unwrap();
    assert_eq!(targets[0].properties["name"], "GraphRAG");
}

#[tokio::test]
async fn mentions_require_written_chunks() {
    let store = MemoryGraphStore::new();
    let mut payload = base_payload("en/nochunks", "No chunks");
    payload.chunks.clear();
    store.write_payload(&payload).await.unwrap();

    // The mention referenced a chunk that was never written, so no
    // MENTIONS edge may exist.
    let entity = store
        .node_by_property("Entity", "name", &json!("Ada Lovelace"))
        .await
        .unwrap()
        .unwrap();
    let edges = store.incident_edges(&entity.identity).await.unwrap();
    assert!(edges.iter().all(|e| e.edge_type != "MENTIONS"));
}

#[tokio::test]
async fn doc_candidates_carry_categories_tags_and_entities() {
    let store = MemoryGraphStore::new();
    store.write_payload(&base_payload("en/ada", "Ada Lovelace")).await.unwrap();

    let docs = store.collect_docs(Some("en")).await.unwrap();
    assert_eq!(docs.len(), 1);
    let candidate = &docs[0];
    assert_eq!(candidate.doc_id(), Some("en/ada"));
    assert_eq!(candidate.categories, vec!["AI"]);
    assert_eq!(candidate.tags, vec!["graphs"]);
    assert_eq!(candidate.entities.len(), 1);
    assert_eq!(candidate.entities[0].name, "Ada Lovelace");

    assert!(store.collect_docs(Some("zh")).await.unwrap().is_empty());

    let map = store.doc_metadata(&["en/ada".to_string()]).await.unwrap();
    assert!(map.contains_key("en/ada"));
}

#[tokio::test]
async fn relationships_merge_by_endpoint_pair_and_relation() {
    let store = MemoryGraphStore::new();
    let mut payload = base_payload("en/rel", "Relations");
    payload.mentions.clear();
    payload.doc_entity_roots.clear();
    payload.entities = vec![Entity::new("A", "Concept"), Entity::new("B", "Concept")];
    payload.relationships = vec![Relationship {
        source: EntityRef { name: "A".into(), entity_type: "Concept".into() },
        target: EntityRef { name: "B".into(), entity_type: "Concept".into() },
        relation: "Uses".into(),
        weight: Some(0.5),
        evidence: None,
        properties: Map::new(),
    }];
    store.write_payload(&payload).await.unwrap();
    let edges_before = store.edge_count();

    // Same pair + relation merges; a different relation adds an edge.
    payload.relationships[0].weight = Some(0.9);
    store.write_payload(&payload).await.unwrap();
    assert_eq!(store.edge_count(), edges_before);

    payload.relationships[0].relation = "Supports".into();
    store.write_payload(&payload).await.unwrap();
    assert_eq!(store.edge_count(), edges_before + 1);
}

#[tokio::test]
async fn snapshots_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("graph.json");
    let store = MemoryGraphStore::new();
    store.write_payload(&base_payload("en/snap", "Snapshot")).await.unwrap();
    store.save_snapshot(&path).unwrap();

    let reloaded = MemoryGraphStore::load_snapshot(&path).unwrap();
    assert_eq!(reloaded.node_count(), store.node_count());
    assert_eq!(reloaded.edge_count(), store.edge_count());
    assert!(reloaded
        .node_by_property("Doc", "id", &json!("en/snap"))
        .await
        .unwrap()
        .is_some());

    let empty = MemoryGraphStore::load_snapshot(&dir.path().join("missing.json")).unwrap();
    assert_eq!(empty.node_count(), 0);
}
