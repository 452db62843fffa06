//! Shortest path between two named entities over RELATED edges.

use graphloom_core::traits::{GraphEdgeRecord, GraphStore};
use graphloom_core::GraphStoreError;
use serde::Serialize;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};

pub const DEFAULT_MAX_LENGTH: usize = 4;
pub const MAX_LENGTH_CAP: usize = 8;

#[derive(Debug, Clone, Default)]
pub struct PathParams {
    pub source_entity: String,
    pub target_entity: String,
    pub max_length: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PathNode {
    pub identity: String,
    pub labels: Vec<String>,
    pub data: serde_json::Map<String, Value>,
}

/// Unreachable endpoints yield empty nodes/edges and `length: None`,
/// never an error.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PathResult {
    pub nodes: Vec<PathNode>,
    pub edges: Vec<GraphEdgeRecord>,
    pub length: Option<usize>,
}

/// Hop-count shortest path, breadth-first and direction-agnostic.
pub async fn fetch_shortest_path(
    store: &dyn GraphStore,
    params: &PathParams,
) -> Result<PathResult, GraphStoreError> {
    if params.source_entity.trim().is_empty() || params.target_entity.trim().is_empty() {
        return Err(GraphStoreError::Config(
            "source_entity and target_entity are required".to_string(),
        ));
    }
    let max_length = params
        .max_length
        .unwrap_or(DEFAULT_MAX_LENGTH)
        .clamp(1, MAX_LENGTH_CAP);

    let source = store
        .node_by_property("Entity", "name", &Value::String(params.source_entity.clone()))
        .await?;
    let target = store
        .node_by_property("Entity", "name", &Value::String(params.target_entity.clone()))
        .await?;
    let (Some(source), Some(target)) = (source, target) else {
        return Ok(PathResult::default());
    };
    if source.identity == target.identity {
        return Ok(PathResult {
            nodes: vec![PathNode {
                identity: source.identity,
                labels: source.labels,
                data: source.properties,
            }],
            edges: Vec::new(),
            length: Some(0),
        });
    }

    // BFS with predecessor tracking over RELATED edges only.
    let mut predecessor: HashMap<String, (String, GraphEdgeRecord)> = HashMap::new();
    let mut depth: HashMap<String, usize> = HashMap::new();
    depth.insert(source.identity.clone(), 0);
    let mut queue = VecDeque::from([source.identity.clone()]);
    let mut found = false;

    'search: while let Some(current) = queue.pop_front() {
        let current_depth = depth[&current];
        if current_depth >= max_length {
            continue;
        }
        for edge in store.incident_edges(&current).await? {
            if edge.edge_type != "RELATED" {
                continue;
            }
            let neighbor = if edge.source == current {
                edge.target.clone()
            } else {
                edge.source.clone()
            };
            if depth.contains_key(&neighbor) {
                continue;
            }
            depth.insert(neighbor.clone(), current_depth + 1);
            predecessor.insert(neighbor.clone(), (current.clone(), edge));
            if neighbor == target.identity {
                found = true;
                break 'search;
            }
            queue.push_back(neighbor);
        }
    }

    if !found {
        return Ok(PathResult::default());
    }

    // Walk predecessors back to the source.
    let mut node_ids = vec![target.identity.clone()];
    let mut edges = Vec::new();
    let mut cursor = target.identity.clone();
    while let Some((previous, edge)) = predecessor.get(&cursor) {
        edges.push(edge.clone());
        node_ids.push(previous.clone());
        cursor = previous.clone();
    }
    node_ids.reverse();
    edges.reverse();

    let records = store.nodes_by_identity(&node_ids).await?;
    let by_id: HashMap<&str, _> = records
        .iter()
        .map(|record| (record.identity.as_str(), record))
        .collect();
    let nodes = node_ids
        .iter()
        .filter_map(|id| by_id.get(id.as_str()))
        .map(|record| PathNode {
            identity: record.identity.clone(),
            labels: record.labels.clone(),
            data: record.properties.clone(),
        })
        .collect();

    Ok(PathResult {
        nodes,
        length: Some(edges.len()),
        edges,
    })
}
