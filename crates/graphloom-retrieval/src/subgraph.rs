//! Breadth-limited subgraph expansion with truncation-aware stats.

use graphloom_core::traits::{GraphEdgeRecord, GraphNodeRecord, GraphStore};
use graphloom_core::GraphStoreError;
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet};

pub const DEFAULT_MAX_HOPS: usize = 2;
pub const MAX_HOPS_CAP: usize = 6;
pub const DEFAULT_NODE_LIMIT: usize = 50;
pub const NODE_LIMIT_CAP: usize = 500;
pub const DEFAULT_EDGE_LIMIT: usize = 100;
pub const EDGE_LIMIT_CAP: usize = 1000;

#[derive(Debug, Clone, Default)]
pub struct SubgraphParams {
    pub doc_id: String,
    /// When non-empty, only Entity nodes with these names may be visited.
    pub entity_names: Vec<String>,
    /// When non-empty, only nodes carrying one of these labels may be
    /// visited (the root Doc is exempt).
    pub allowed_labels: Vec<String>,
    /// When non-empty, every traversed edge's relation label must match.
    pub allowed_relations: Vec<String>,
    pub max_hops: Option<usize>,
    pub node_limit: Option<usize>,
    pub edge_limit: Option<usize>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TruncationStats {
    pub total: usize,
    pub returned: usize,
    pub truncated: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubgraphStats {
    pub nodes: TruncationStats,
    pub edges: TruncationStats,
    pub by_label: BTreeMap<String, usize>,
    pub by_hop: BTreeMap<usize, usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubgraphNode {
    pub identity: String,
    pub labels: Vec<String>,
    pub data: serde_json::Map<String, Value>,
    pub hop: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct Subgraph {
    pub nodes: Vec<SubgraphNode>,
    pub edges: Vec<GraphEdgeRecord>,
    pub stats: SubgraphStats,
}

fn clamp(value: Option<usize>, default: usize, cap: usize) -> usize {
    value.unwrap_or(default).clamp(1, cap)
}

fn node_allowed(node: &GraphNodeRecord, params: &SubgraphParams) -> bool {
    if !params.entity_names.is_empty() {
        let is_entity = node.labels.iter().any(|label| label == "Entity");
        let name = node.properties.get("name").and_then(Value::as_str);
        if !is_entity || !name.is_some_and(|name| params.entity_names.iter().any(|n| n == name)) {
            return false;
        }
    }
    if !params.allowed_labels.is_empty()
        && !node
            .labels
            .iter()
            .any(|label| params.allowed_labels.iter().any(|allowed| allowed == label))
    {
        return false;
    }
    true
}

fn recency_key(node: &GraphNodeRecord) -> Option<String> {
    node.properties
        .get("updated_at")
        .and_then(Value::as_str)
        .or_else(|| node.properties.get("created_at").and_then(Value::as_str))
        .map(str::to_string)
}

fn identity_key(identity: &str) -> (u64, String) {
    (identity.parse().unwrap_or(u64::MAX), identity.to_string())
}

/// Expand outward from a Doc node. Results are bounded by hop count and
/// node/edge limits; `stats` reports what was dropped so callers never
/// mistake a truncated view for the whole neighborhood.
pub async fn fetch_subgraph(
    store: &dyn GraphStore,
    params: &SubgraphParams,
) -> Result<Subgraph, GraphStoreError> {
    if params.doc_id.trim().is_empty() {
        return Err(GraphStoreError::Config("doc_id is required".to_string()));
    }
    let max_hops = clamp(params.max_hops, DEFAULT_MAX_HOPS, MAX_HOPS_CAP);
    let node_limit = clamp(params.node_limit, DEFAULT_NODE_LIMIT, NODE_LIMIT_CAP);
    let edge_limit = clamp(params.edge_limit, DEFAULT_EDGE_LIMIT, EDGE_LIMIT_CAP);

    let root = match store
        .node_by_property("Doc", "id", &Value::String(params.doc_id.clone()))
        .await?
    {
        Some(root) => root,
        None => {
            return Ok(Subgraph {
                nodes: Vec::new(),
                edges: Vec::new(),
                stats: SubgraphStats {
                    nodes: TruncationStats { total: 0, returned: 0, truncated: false },
                    edges: TruncationStats { total: 0, returned: 0, truncated: false },
                    by_label: BTreeMap::new(),
                    by_hop: BTreeMap::new(),
                },
            })
        }
    };

    // BFS; filters gate traversal, so every edge along a kept path has
    // passed the relation allowlist and every intermediate node the node
    // filters.
    let mut hops: HashMap<String, usize> = HashMap::new();
    let mut records: HashMap<String, GraphNodeRecord> = HashMap::new();
    let mut visited_edges: HashMap<String, GraphEdgeRecord> = HashMap::new();
    hops.insert(root.identity.clone(), 0);
    records.insert(root.identity.clone(), root.clone());
    let mut frontier = vec![root.identity.clone()];

    for hop in 1..=max_hops {
        let mut next_frontier = Vec::new();
        for node_id in &frontier {
            let edges = store.incident_edges(node_id).await?;
            for edge in edges {
                if !params.allowed_relations.is_empty()
                    && !params
                        .allowed_relations
                        .iter()
                        .any(|allowed| allowed == edge.relation_label())
                {
                    continue;
                }
                let neighbor_id = if &edge.source == node_id {
                    edge.target.clone()
                } else {
                    edge.source.clone()
                };

                let neighbor = match records.get(&neighbor_id) {
                    Some(record) => record.clone(),
                    None => {
                        let fetched = store
                            .nodes_by_identity(std::slice::from_ref(&neighbor_id))
                            .await?;
                        match fetched.into_iter().next() {
                            Some(record) => record,
                            None => continue,
                        }
                    }
                };
                let neighbor_visited = hops.contains_key(&neighbor_id);
                if !neighbor_visited && !node_allowed(&neighbor, params) {
                    continue;
                }

                visited_edges.entry(edge.identity.clone()).or_insert(edge);
                if !neighbor_visited {
                    hops.insert(neighbor_id.clone(), hop);
                    records.insert(neighbor_id.clone(), neighbor);
                    next_frontier.push(neighbor_id);
                }
            }
        }
        frontier = next_frontier;
        if frontier.is_empty() {
            break;
        }
    }

    // Deterministic ordering: hop ascending, recency descending, id.
    let mut ordered: Vec<(String, usize)> =
        hops.iter().map(|(id, hop)| (id.clone(), *hop)).collect();
    ordered.sort_by(|(a_id, a_hop), (b_id, b_hop)| {
        a_hop
            .cmp(b_hop)
            .then_with(|| {
                let a_recency = recency_key(&records[a_id]);
                let b_recency = recency_key(&records[b_id]);
                b_recency.cmp(&a_recency)
            })
            .then_with(|| identity_key(a_id).cmp(&identity_key(b_id)))
    });

    let nodes_total = ordered.len();
    let returned_nodes: Vec<(String, usize)> =
        ordered.into_iter().take(node_limit).collect();
    let returned_ids: HashSet<&String> = returned_nodes.iter().map(|(id, _)| id).collect();

    let edges_total = visited_edges.len();
    let mut kept_edges: Vec<GraphEdgeRecord> = visited_edges
        .into_values()
        .filter(|edge| returned_ids.contains(&edge.source) && returned_ids.contains(&edge.target))
        .collect();
    kept_edges.sort_by(|a, b| identity_key(&a.identity).cmp(&identity_key(&b.identity)));
    kept_edges.truncate(edge_limit);

    let mut by_label: BTreeMap<String, usize> = BTreeMap::new();
    let mut by_hop: BTreeMap<usize, usize> = BTreeMap::new();
    let nodes: Vec<SubgraphNode> = returned_nodes
        .into_iter()
        .map(|(id, hop)| {
            let record = records.remove(&id).expect("record for visited node");
            for label in &record.labels {
                *by_label.entry(label.clone()).or_insert(0) += 1;
            }
            *by_hop.entry(hop).or_insert(0) += 1;
            SubgraphNode {
                identity: record.identity,
                labels: record.labels,
                data: record.properties,
                hop,
            }
        })
        .collect();

    let stats = SubgraphStats {
        nodes: TruncationStats {
            total: nodes_total,
            returned: nodes.len(),
            truncated: nodes.len() < nodes_total,
        },
        edges: TruncationStats {
            total: edges_total,
            returned: kept_edges.len(),
            truncated: kept_edges.len() < edges_total,
        },
        by_label,
        by_hop,
    };

    Ok(Subgraph { nodes, edges: kept_edges, stats })
}
