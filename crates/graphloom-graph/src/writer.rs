//! Batch payload writer: one transaction per document, partial success
//! reported rather than raised.

use graphloom_core::traits::GraphStore;
use graphloom_core::vocab::type_priority;
use graphloom_core::{normalize_entity_key, DocEntityRoot, WritePayload};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

/// Outcome of a batch write. `written < payloads.len()` is expected when
/// individual transactions fail; the failures carry the reasons.
#[derive(Debug, Clone, Default, Serialize)]
pub struct WriteReport {
    pub written: usize,
    pub failures: Vec<WriteFailure>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WriteFailure {
    pub doc_id: String,
    pub message: String,
}

/// Pick the document's single canonical `HAS_ENTITY` target from the
/// extracted root candidates, preferring:
/// (a) a name that is a substring of the title,
/// (b) a normalized key overlapping the normalized title,
/// (c) the highest type-priority score,
/// (d) the first candidate.
pub fn select_primary_root(title: &str, roots: &[DocEntityRoot]) -> Option<DocEntityRoot> {
    if roots.is_empty() {
        return None;
    }
    let title_lower = title.to_lowercase();
    if !title_lower.is_empty() {
        if let Some(root) = roots
            .iter()
            .find(|root| !root.name.is_empty() && title_lower.contains(&root.name.to_lowercase()))
        {
            return Some(root.clone());
        }
    }
    let title_key = normalize_entity_key(title);
    if !title_key.is_empty() {
        if let Some(root) = roots.iter().find(|root| {
            !root.key.is_empty()
                && (title_key.contains(&root.key) || root.key.contains(&title_key))
        }) {
            return Some(root.clone());
        }
    }
    roots
        .iter()
        .max_by_key(|root| type_priority(&root.entity_type))
        .cloned()
        .or_else(|| roots.first().cloned())
}

/// Writes payloads through the store boundary, one transaction each.
pub struct GraphWriter {
    store: Arc<dyn GraphStore>,
}

impl GraphWriter {
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self { store }
    }

    pub async fn write_batch(&self, payloads: &[WritePayload]) -> WriteReport {
        let mut report = WriteReport::default();
        for payload in payloads {
            let mut payload = payload.clone();
            payload.doc_entity_roots =
                select_primary_root(&payload.doc.title, &payload.doc_entity_roots)
                    .into_iter()
                    .collect();

            match self.store.write_payload(&payload).await {
                Ok(()) => {
                    report.written += 1;
                    info!(doc_id = %payload.doc.id, "payload written");
                }
                Err(err) => {
                    warn!(doc_id = %payload.doc.id, error = %err, "payload write failed");
                    report.failures.push(WriteFailure {
                        doc_id: payload.doc.id.clone(),
                        message: err.to_string(),
                    });
                }
            }
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root(name: &str, entity_type: &str) -> DocEntityRoot {
        DocEntityRoot {
            name: name.to_string(),
            entity_type: entity_type.to_string(),
            key: normalize_entity_key(name),
        }
    }

    #[test]
    fn title_substring_wins() {
        let roots = vec![root("Graphs", "Person"), root("RAG", "Concept")];
        let picked = select_primary_root("Intro to RAG pipelines", &roots).unwrap();
        assert_eq!(picked.name, "RAG");
    }

    #[test]
    fn normalized_key_overlap_beats_priority() {
        let roots = vec![root("Ada Lovelace", "Person"), root("graph-rag", "Concept")];
        let picked = select_primary_root("GraphRAG", &roots).unwrap();
        assert_eq!(picked.name, "graph-rag");
    }

    #[test]
    fn type_priority_breaks_remaining_ties() {
        let roots = vec![
            root("alpha", "Concept"),
            root("beta", "Person"),
            root("gamma", "Tool"),
        ];
        let picked = select_primary_root("unrelated title", &roots).unwrap();
        assert_eq!(picked.name, "beta");
    }

    #[test]
    fn first_candidate_is_the_last_resort() {
        let roots = vec![root("one", "Thing"), root("two", "Thing")];
        let picked = select_primary_root("unrelated", &roots).unwrap();
        assert_eq!(picked.name, "one");
        assert!(select_primary_root("title", &[]).is_none());
    }
}
