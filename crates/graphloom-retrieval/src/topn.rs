//! Top-N document ranking: salience sum + category bonus + recency.

use chrono::DateTime;
use graphloom_core::traits::{DocCandidate, EntitySummary, GraphStore};
use graphloom_core::GraphStoreError;
use serde::Serialize;
use serde_json::Value;

pub const DEFAULT_LIMIT: usize = 5;
const CATEGORY_BONUS: f64 = 0.1;
/// Milliseconds per thousand days; scales epoch time into a recency bonus.
const RECENCY_SCALE: f64 = 8.64e10;

#[derive(Debug, Clone, Default)]
pub struct TopNParams {
    pub entity_names: Vec<String>,
    pub category: Option<String>,
    pub language: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TopNItem {
    pub doc_id: String,
    pub title: String,
    pub updated_at: Option<String>,
    /// Rounded to 4 decimal places for reporting; ranking used full
    /// precision.
    pub score: f64,
    pub tags: Vec<String>,
    pub categories: Vec<String>,
    pub reasons: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TopNQuery {
    pub entity_names: Vec<String>,
    pub category: Option<String>,
    pub language: Option<String>,
    pub limit: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct TopNResult {
    pub items: Vec<TopNItem>,
    pub query: TopNQuery,
}

pub(crate) fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

fn updated_at_of(candidate: &DocCandidate) -> Option<String> {
    candidate
        .doc
        .get("updated_at")
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn recency_bonus(updated_at: Option<&str>) -> f64 {
    let Some(raw) = updated_at else {
        return 0.0;
    };
    match DateTime::parse_from_rfc3339(raw) {
        Ok(parsed) => parsed.timestamp_millis() as f64 / RECENCY_SCALE,
        Err(_) => 0.0,
    }
}

fn matched_entities<'a>(
    candidate: &'a DocCandidate,
    entity_names: &[String],
) -> Vec<&'a EntitySummary> {
    candidate
        .entities
        .iter()
        .filter(|entity| {
            entity_names.is_empty() || entity_names.iter().any(|name| name == &entity.name)
        })
        .collect()
}

/// Rank documents by matched-entity salience, category match, and
/// recency. Zero-score documents are excluded unless no filters were
/// supplied at all.
pub async fn fetch_top_n(
    store: &dyn GraphStore,
    params: &TopNParams,
) -> Result<TopNResult, GraphStoreError> {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).max(1);
    let candidates = store.collect_docs(params.language.as_deref()).await?;
    let unfiltered = params.entity_names.is_empty() && params.category.is_none();

    let mut scored: Vec<(f64, TopNItem)> = Vec::new();
    for candidate in candidates {
        if let Some(category) = &params.category {
            if !candidate.categories.iter().any(|c| c == category) {
                continue;
            }
        }

        let matches = matched_entities(&candidate, &params.entity_names);
        if !params.entity_names.is_empty() && matches.is_empty() {
            continue;
        }
        let mut score: f64 = matches.iter().filter_map(|entity| entity.salience).sum();

        let mut reasons: Vec<String> = matches
            .iter()
            .map(|entity| match entity.salience {
                Some(salience) if salience > 0.0 => {
                    format!("contains entity {} (salience {:.3})", entity.name, salience)
                }
                _ => format!("contains entity {}", entity.name),
            })
            .collect();

        if let Some(category) = &params.category {
            score += CATEGORY_BONUS;
            reasons.push(format!("category match {category}"));
        }

        let updated_at = updated_at_of(&candidate);
        score += recency_bonus(updated_at.as_deref());
        if let Some(updated) = &updated_at {
            reasons.push(format!("last updated {updated}"));
        }

        if score <= 0.0 && !unfiltered {
            continue;
        }

        let doc_id = candidate.doc_id().unwrap_or_default().to_string();
        let title = candidate
            .doc
            .get("title")
            .and_then(Value::as_str)
            .unwrap_or(&doc_id)
            .to_string();
        scored.push((
            score,
            TopNItem {
                doc_id,
                title,
                updated_at,
                score: round4(score),
                tags: candidate.tags.clone(),
                categories: candidate.categories.clone(),
                reasons,
            },
        ));
    }

    scored.sort_by(|(a, _), (b, _)| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));
    let items = scored.into_iter().take(limit).map(|(_, item)| item).collect();

    Ok(TopNResult {
        items,
        query: TopNQuery {
            entity_names: params.entity_names.clone(),
            category: params.category.clone(),
            language: params.language.clone(),
            limit,
        },
    })
}
