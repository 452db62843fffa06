//! Write payload assembly.

use graphloom_core::{DocNode, ExtractionResult, NormalizedDoc, WritePayload};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy)]
pub struct PayloadOptions {
    pub include_chunks: bool,
    pub include_mentions: bool,
    /// Copy scalar front-matter fields not already modeled onto the Doc
    /// node.
    pub include_frontmatter: bool,
}

impl Default for PayloadOptions {
    fn default() -> Self {
        Self {
            include_chunks: true,
            include_mentions: true,
            include_frontmatter: false,
        }
    }
}

/// Fields the Doc node already models; front-matter passthrough skips them.
const MODELED_FIELDS: &[&str] = &[
    "title",
    "description",
    "excerpt",
    "tags",
    "tags_zh",
    "category",
    "category_zh",
    "updated",
    "lastUpdated",
    "date",
    "draft",
];

pub fn build_payload(
    doc: &NormalizedDoc,
    aggregation: ExtractionResult,
    options: &PayloadOptions,
) -> WritePayload {
    let mut extra = Map::new();
    if options.include_frontmatter {
        if let Some(frontmatter) = doc.frontmatter.as_object() {
            for (key, value) in frontmatter {
                if MODELED_FIELDS.contains(&key.as_str()) {
                    continue;
                }
                if matches!(value, Value::String(_) | Value::Number(_) | Value::Bool(_)) {
                    extra.insert(key.clone(), value.clone());
                }
            }
        }
    }

    WritePayload {
        doc: DocNode {
            id: doc.id.clone(),
            title: doc.title.clone(),
            description: doc.description.clone(),
            locale: doc.locale.clone(),
            updated_at: doc.updated_at,
            source_path: doc.source_path.clone(),
            hash: doc.hash.clone(),
            extra,
        },
        categories: doc.categories.clone(),
        tags: doc.tags.clone(),
        chunks: if options.include_chunks {
            doc.chunks.clone()
        } else {
            Vec::new()
        },
        entities: aggregation.entities,
        relationships: aggregation.relationships,
        mentions: if options.include_mentions {
            aggregation.mentions
        } else {
            Vec::new()
        },
        doc_entity_roots: aggregation.doc_entity_roots,
        diagnostics: aggregation.diagnostics,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graphloom_core::document::Chunk;
    use serde_json::json;

    fn doc() -> NormalizedDoc {
        NormalizedDoc {
            id: "en/a".into(),
            source_path: "/content/en/a.md".into(),
            relative_path: "en/a.md".into(),
            locale: "en".into(),
            title: "A".into(),
            description: "Desc".into(),
            categories: Vec::new(),
            tags: Vec::new(),
            updated_at: None,
            frontmatter: json!({
                "title": "A",
                "author": "ada",
                "stars": 5,
                "nested": { "x": 1 }
            }),
            chunks: vec![Chunk { id: "en/a#001".into(), order: 1, text: "text".into() }],
            hash: "h".into(),
        }
    }

    #[test]
    fn chunk_toggle_controls_chunk_nodes() {
        let payload = build_payload(&doc(), ExtractionResult::default(), &PayloadOptions::default());
        assert_eq!(payload.chunks.len(), 1);

        let payload = build_payload(
            &doc(),
            ExtractionResult::default(),
            &PayloadOptions { include_chunks: false, ..PayloadOptions::default() },
        );
        assert!(payload.chunks.is_empty());
    }

    #[test]
    fn frontmatter_passthrough_copies_unmodeled_scalars_only() {
        let payload = build_payload(
            &doc(),
            ExtractionResult::default(),
            &PayloadOptions { include_frontmatter: true, ..PayloadOptions::default() },
        );
        assert_eq!(payload.doc.extra.get("author"), Some(&json!("ada")));
        assert_eq!(payload.doc.extra.get("stars"), Some(&json!(5)));
        assert!(payload.doc.extra.get("title").is_none());
        assert!(payload.doc.extra.get("nested").is_none());

        let payload = build_payload(&doc(), ExtractionResult::default(), &PayloadOptions::default());
        assert!(payload.doc.extra.is_empty());
    }
}
