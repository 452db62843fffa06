//! Hybrid search: cosine similarity over the embedding index blended with
//! precomputed graph-structure scores.

use crate::index::{cosine_similarity, normalize_vector, EmbeddingIndex};
use crate::topn::round4;
use anyhow::{bail, Context, Result};
use graphloom_core::traits::{DocCandidate, EmbeddingProvider, GraphStore};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

pub const DEFAULT_LIMIT: usize = 5;
pub const DEFAULT_ALPHA: (f64, f64) = (0.7, 0.3);
/// Entities per document considered for structure metrics.
const MAX_STRUCTURE_ENTITIES: usize = 50;

#[derive(Debug, Clone, Default)]
pub struct HybridParams {
    pub question: Option<String>,
    pub embedding: Option<Vec<f32>>,
    pub limit: Option<usize>,
    pub sources: Vec<String>,
    pub alpha: Vec<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TopEntity {
    pub name: String,
    #[serde(rename = "type")]
    pub entity_type: Option<String>,
    pub pagerank: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PagerankSummary {
    pub avg: Option<f64>,
    pub max: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StructureDetail {
    pub feature: String,
    pub source: Option<String>,
    pub pagerank: PagerankSummary,
    pub top_entities: Vec<TopEntity>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HybridItem {
    pub doc_id: Option<String>,
    pub title: String,
    pub url: String,
    pub vector_score: f64,
    pub structure_score: Option<f64>,
    /// Blended score; ranking key, full precision.
    pub score: f64,
    pub categories: Vec<String>,
    pub tags: Vec<String>,
    pub locale: Option<String>,
    pub updated_at: Option<String>,
    pub reasons: Vec<String>,
    pub score_components: ScoreComponents,
    pub structure_score_normalized: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub structure_detail: Option<StructureDetail>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScoreComponents {
    pub vector: f64,
    pub structure: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct StructureMeta {
    pub feature: String,
    pub enabled: bool,
    pub normalization: String,
    pub max_score: Option<f64>,
    pub requested: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HybridMeta {
    pub vector_index: String,
    pub model: String,
    pub k: usize,
    pub alpha: [f64; 2],
    pub sources: Vec<String>,
    pub structure: StructureMeta,
}

#[derive(Debug, Clone, Serialize)]
pub struct HybridResult {
    pub mode: String,
    pub items: Vec<HybridItem>,
    pub meta: HybridMeta,
}

/// Map a raw cosine onto [0, 1].
pub fn normalize_cosine(score: f64) -> f64 {
    if !score.is_finite() {
        return 0.0;
    }
    ((score + 1.0) / 2.0).clamp(0.0, 1.0)
}

/// Resolve `(vector, structure)` weights from user input; always
/// renormalized to sum to 1, defaulting to 0.7/0.3.
pub fn resolve_alpha(alpha: &[f64]) -> (f64, f64) {
    let weights: Vec<f64> = alpha
        .iter()
        .copied()
        .filter(|value| value.is_finite() && *value >= 0.0)
        .collect();
    if weights.is_empty() {
        return DEFAULT_ALPHA;
    }
    let vector = weights.first().copied().unwrap_or(1.0);
    let structure = weights.get(1).copied().unwrap_or(0.0);
    let sum = vector + structure;
    if sum == 0.0 {
        return DEFAULT_ALPHA;
    }
    (vector / sum, structure / sum)
}

fn gnn_scores(properties: &serde_json::Map<String, Value>) -> BTreeMap<String, f64> {
    properties
        .iter()
        .filter(|(key, _)| key.starts_with("gnn_"))
        .filter_map(|(key, value)| {
            value
                .as_f64()
                .filter(|n| n.is_finite())
                .map(|n| (key.clone(), n))
        })
        .collect()
}

#[derive(Debug, Clone)]
struct StructureMetrics {
    score: f64,
    source: Option<&'static str>,
    pagerank_avg: Option<f64>,
    pagerank_max: Option<f64>,
    top_entities: Vec<TopEntity>,
}

/// Derive the structure score for one document. Preference order when
/// several signals exist: document PageRank, then entity-average, then
/// entity-max.
fn structure_metrics(candidate: &DocCandidate) -> StructureMetrics {
    let doc_scores = gnn_scores(&candidate.doc);

    let mut entities: Vec<(&str, Option<&str>, Option<f64>, Option<f64>)> = candidate
        .entities
        .iter()
        .map(|entity| {
            let scores = gnn_scores(&entity.properties);
            (
                entity.name.as_str(),
                entity.entity_type.as_deref(),
                entity.salience,
                scores.get("gnn_pagerank").copied(),
            )
        })
        .collect();
    entities.sort_by(|a, b| {
        b.2.unwrap_or(f64::NEG_INFINITY)
            .partial_cmp(&a.2.unwrap_or(f64::NEG_INFINITY))
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    entities.truncate(MAX_STRUCTURE_ENTITIES);

    let pageranks: Vec<f64> = entities.iter().filter_map(|entity| entity.3).collect();
    let pagerank_avg = if pageranks.is_empty() {
        None
    } else {
        Some(pageranks.iter().sum::<f64>() / pageranks.len() as f64)
    };
    let pagerank_max = pageranks.iter().copied().fold(None, |best: Option<f64>, value| {
        Some(best.map_or(value, |b| b.max(value)))
    });

    let mut ranked = entities.clone();
    ranked.sort_by(|a, b| {
        b.3.unwrap_or(f64::NEG_INFINITY)
            .partial_cmp(&a.3.unwrap_or(f64::NEG_INFINITY))
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    let top_entities: Vec<TopEntity> = ranked
        .iter()
        .take(3)
        .map(|(name, entity_type, _, pagerank)| TopEntity {
            name: name.to_string(),
            entity_type: entity_type.map(str::to_string),
            pagerank: *pagerank,
        })
        .collect();

    let (score, source) = if let Some(doc_pagerank) = doc_scores.get("gnn_pagerank") {
        (*doc_pagerank, Some("doc"))
    } else if let Some(avg) = pagerank_avg {
        (avg, Some("entity_avg"))
    } else if let Some(max) = pagerank_max {
        (max, Some("entity_max"))
    } else {
        (0.0, None)
    };

    StructureMetrics {
        score,
        source,
        pagerank_avg,
        pagerank_max,
        top_entities,
    }
}

fn structure_reason(metrics: &StructureMetrics) -> Option<String> {
    if metrics.score <= 0.0 {
        return None;
    }
    match metrics.source {
        Some("doc") => Some(format!("doc PageRank {:.3}", metrics.score)),
        Some("entity_avg") => Some(format!("entity PageRank mean {:.3}", metrics.score)),
        Some("entity_max") => {
            let name = metrics
                .top_entities
                .first()
                .map(|entity| entity.name.as_str())
                .unwrap_or("entity");
            Some(format!("{name} PageRank {:.3}", metrics.score))
        }
        _ => Some(format!("structure score {:.3}", metrics.score)),
    }
}

/// See module docs. The question is embedded unless a precomputed vector
/// is supplied; candidates come from the embedding index and are then
/// enriched with graph metadata for the structure signal.
pub async fn search_hybrid(
    store: &dyn GraphStore,
    embedder: &dyn EmbeddingProvider,
    index: &EmbeddingIndex,
    params: &HybridParams,
) -> Result<HybridResult> {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).max(1);

    let query_vector = match (&params.embedding, &params.question) {
        (Some(embedding), _) => {
            let mut vector = embedding.clone();
            if index.normalize {
                normalize_vector(&mut vector);
            }
            vector
        }
        (None, Some(question)) => embedder
            .embed(question)
            .await
            .context("embedding the question")?,
        (None, None) => bail!("hybrid search requires a question or an embedding"),
    };

    let mut scored: Vec<(f64, &crate::index::IndexEntry)> = index
        .entries
        .iter()
        .map(|entry| (cosine_similarity(&query_vector, &entry.embedding), entry))
        .collect();
    scored.sort_by(|(a, _), (b, _)| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(limit);

    let doc_ids: Vec<String> = scored
        .iter()
        .filter_map(|(_, entry)| entry.doc_id.clone())
        .collect();
    let metadata = store.doc_metadata(&doc_ids).await?;

    let requested: Vec<String> = if params.sources.is_empty() {
        vec!["vector".to_string(), "structure".to_string()]
    } else {
        params.sources.clone()
    };
    let structure_requested = requested
        .iter()
        .any(|source| source == "structure" || source == "graph");

    let mut weights = resolve_alpha(&params.alpha);
    if !structure_requested {
        weights = (1.0, 0.0);
    }

    struct Candidate<'a> {
        entry: &'a crate::index::IndexEntry,
        vector_score: f64,
        candidate: Option<&'a DocCandidate>,
        metrics: Option<StructureMetrics>,
    }

    let candidates: Vec<Candidate> = scored
        .iter()
        .map(|&(vector_score, entry)| {
            let candidate = entry.doc_id.as_deref().and_then(|id| metadata.get(id));
            let metrics = candidate.map(structure_metrics);
            Candidate {
                entry,
                vector_score: if vector_score.is_finite() { vector_score } else { 0.0 },
                candidate,
                metrics,
            }
        })
        .collect();

    let max_structure = candidates
        .iter()
        .filter_map(|c| c.metrics.as_ref())
        .map(|metrics| metrics.score)
        .filter(|score| *score > 0.0)
        .fold(0.0f64, f64::max);
    let structure_active = structure_requested && max_structure > 0.0;
    if structure_requested && !structure_active {
        weights = (1.0, 0.0);
    }

    let mut items: Vec<HybridItem> = candidates
        .into_iter()
        .map(|c| {
            let vector_norm = normalize_cosine(c.vector_score);
            let raw_structure = c.metrics.as_ref().map(|m| m.score).unwrap_or(0.0);
            let structure_norm = if structure_active && max_structure > 0.0 {
                raw_structure / max_structure
            } else {
                0.0
            };
            let combined = weights.0 * vector_norm + weights.1 * structure_norm;

            let mut reasons = vec![format!("semantic similarity {:.3}", c.vector_score)];
            if structure_requested {
                if let Some(reason) = c.metrics.as_ref().and_then(structure_reason) {
                    reasons.push(reason);
                }
            }

            let doc_props = c.candidate.map(|candidate| &candidate.doc);
            let title = doc_props
                .and_then(|props| props.get("title").and_then(Value::as_str))
                .map(str::to_string)
                .or_else(|| c.entry.title.clone())
                .or_else(|| c.entry.doc_id.clone())
                .unwrap_or_default();

            let structure_score = if structure_requested {
                c.metrics.as_ref().map(|m| m.score)
            } else {
                None
            };

            HybridItem {
                doc_id: c.entry.doc_id.clone(),
                title,
                url: c.entry.url.clone(),
                vector_score: c.vector_score,
                structure_score,
                score: combined,
                categories: c
                    .candidate
                    .map(|candidate| candidate.categories.clone())
                    .unwrap_or_default(),
                tags: c
                    .candidate
                    .map(|candidate| candidate.tags.clone())
                    .unwrap_or_default(),
                locale: c
                    .candidate
                    .and_then(|candidate| {
                        candidate.doc.get("locale").and_then(Value::as_str).map(str::to_string)
                    })
                    .or_else(|| c.entry.lang.clone()),
                updated_at: c.candidate.and_then(|candidate| {
                    candidate
                        .doc
                        .get("updated_at")
                        .and_then(Value::as_str)
                        .map(str::to_string)
                }),
                reasons,
                score_components: ScoreComponents {
                    vector: round4(vector_norm),
                    structure: round4(structure_norm),
                },
                structure_score_normalized: if structure_active {
                    round4(structure_norm)
                } else {
                    0.0
                },
                structure_detail: if structure_requested {
                    c.metrics.as_ref().map(|metrics| StructureDetail {
                        feature: "gnn_pagerank".to_string(),
                        source: metrics.source.map(str::to_string),
                        pagerank: PagerankSummary {
                            avg: metrics.pagerank_avg,
                            max: metrics.pagerank_max,
                        },
                        top_entities: metrics.top_entities.clone(),
                    })
                } else {
                    None
                },
            }
        })
        .collect();

    // Full-precision sort; rounding is presentation only.
    items.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));

    let mut active_sources = vec!["vector".to_string()];
    if structure_active {
        active_sources.push("structure".to_string());
    }

    Ok(HybridResult {
        mode: "hybrid".to_string(),
        items,
        meta: HybridMeta {
            vector_index: index.name.clone(),
            model: index.model.clone(),
            k: limit,
            alpha: [round4(weights.0), round4(weights.1)],
            sources: active_sources,
            structure: StructureMeta {
                feature: "gnn_pagerank".to_string(),
                enabled: structure_active,
                normalization: if structure_active { "max" } else { "none" }.to_string(),
                max_score: structure_active.then_some(max_structure),
                requested,
            },
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alpha_resolution_normalizes_and_defaults() {
        assert_eq!(resolve_alpha(&[]), DEFAULT_ALPHA);
        assert_eq!(resolve_alpha(&[1.0, 1.0]), (0.5, 0.5));
        assert_eq!(resolve_alpha(&[2.0]), (1.0, 0.0));
        assert_eq!(resolve_alpha(&[0.0, 0.0]), DEFAULT_ALPHA);
        assert_eq!(resolve_alpha(&[-1.0, f64::NAN]), DEFAULT_ALPHA);
        let (v, s) = resolve_alpha(&[3.0, 1.0]);
        assert!((v - 0.75).abs() < 1e-12);
        assert!((s - 0.25).abs() < 1e-12);
    }

    #[test]
    fn cosine_normalization_clamps() {
        assert_eq!(normalize_cosine(1.0), 1.0);
        assert_eq!(normalize_cosine(-1.0), 0.0);
        assert_eq!(normalize_cosine(0.0), 0.5);
        assert_eq!(normalize_cosine(f64::NAN), 0.0);
    }
}
