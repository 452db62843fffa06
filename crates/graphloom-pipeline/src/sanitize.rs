//! Extraction sanitizer: drops structural noise, merges duplicate
//! entities by normalized key, remaps relationships and mentions onto the
//! surviving canonical entities, and derives the doc-root candidates.

use graphloom_core::vocab::{normalize_type_label, select_type, DEFAULT_ENTITY_TYPE, DEFAULT_RELATION};
use graphloom_core::{normalize_entity_key, DocEntityRoot, Entity, ExtractionResult};
use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Copy)]
pub struct SanitizeLimits {
    pub max_entities: usize,
    pub max_relationships: usize,
}

impl Default for SanitizeLimits {
    fn default() -> Self {
        Self { max_entities: 50, max_relationships: 100 }
    }
}

/// Section/chunk artifacts extractors like to emit as entities.
const STRUCTURE_KEYWORDS: &[&str] = &[
    "chunk", "section", "paragraph", "chapter", "part", "page", "step", "item", "lesson",
    "segment",
];

static STRUCTURE_PATTERN_EN: Lazy<Regex> = Lazy::new(|| {
    RegexBuilder::new(
        r"^(?:chunk|section|paragraph|chapter|part|page|step|item|lesson|segment)[\s\-_#]*(?:\d+|[ivxlcdm]+)$",
    )
    .case_insensitive(true)
    .build()
    .unwrap()
});

static STRUCTURE_PATTERN_CN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"第\s*[零一二三四五六七八九十百千\d]+(?:章节|部分|篇|节|段|章)$").unwrap());

fn is_structure_node(name: &str, entity_type: &str) -> bool {
    let name_lower = name.to_lowercase();
    let type_lower = entity_type.to_lowercase();
    STRUCTURE_KEYWORDS.contains(&name_lower.as_str())
        || (!type_lower.is_empty() && STRUCTURE_KEYWORDS.contains(&type_lower.as_str()))
        || STRUCTURE_PATTERN_EN.is_match(name)
        || STRUCTURE_PATTERN_CN.is_match(name)
}

/// A `type` key inside a property bag overrides the carried type and is
/// removed from the bag.
fn hoist_type_property(entity: &mut Entity) {
    if let Some(raw) = entity
        .properties
        .get("type")
        .and_then(serde_json::Value::as_str)
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
    {
        entity.entity_type = raw;
        entity.properties.remove("type");
    }
}

/// See module docs. Input order is preserved; caps drop the tail.
pub fn sanitize_extraction(
    result: ExtractionResult,
    limits: &SanitizeLimits,
) -> ExtractionResult {
    let mut entities: Vec<Entity> = Vec::new();
    let mut alias_map: HashMap<String, String> = HashMap::new();
    let mut index_by_key: HashMap<String, usize> = HashMap::new();

    for mut entity in result.entities {
        let name = entity.name.trim().to_string();
        if name.is_empty() || name.contains('#') || name.contains('/') {
            continue;
        }
        if is_structure_node(&name, &entity.entity_type) {
            continue;
        }
        let key = normalize_entity_key(&name);
        if key.is_empty() {
            continue;
        }

        hoist_type_property(&mut entity);
        let entity_type = normalize_type_label(&entity.entity_type)
            .unwrap_or_else(|| DEFAULT_ENTITY_TYPE.to_string());

        if let Some(&index) = index_by_key.get(&key) {
            let existing = &mut entities[index];
            existing.entity_type =
                select_type(Some(existing.entity_type.as_str()), Some(entity_type.as_str()));
            alias_map.insert(name, existing.name.clone());
            continue;
        }

        if entities.len() >= limits.max_entities {
            break;
        }
        entity.name = name.clone();
        entity.entity_type = entity_type;
        alias_map.insert(name, entity.name.clone());
        index_by_key.insert(key.clone(), entities.len());
        entities.push(entity);
    }

    let canonical: HashMap<String, (String, String)> = entities
        .iter()
        .map(|entity| (entity.name.clone(), (entity.name.clone(), entity.entity_type.clone())))
        .collect();
    let canonical_names: HashSet<&String> = canonical.keys().collect();

    let mut relationships = Vec::new();
    for mut relationship in result.relationships {
        let source_name = alias_map
            .get(relationship.source.name.trim())
            .cloned()
            .unwrap_or_else(|| relationship.source.name.trim().to_string());
        let target_name = alias_map
            .get(relationship.target.name.trim())
            .cloned()
            .unwrap_or_else(|| relationship.target.name.trim().to_string());
        if !canonical_names.contains(&source_name) || !canonical_names.contains(&target_name) {
            continue;
        }
        if relationships.len() >= limits.max_relationships {
            break;
        }
        relationship.properties.remove("type");
        relationship.source.name = source_name.clone();
        relationship.source.entity_type = canonical[&source_name].1.clone();
        relationship.target.name = target_name.clone();
        relationship.target.entity_type = canonical[&target_name].1.clone();
        let label = relationship.relation.trim().to_string();
        relationship.relation = if label.is_empty() {
            DEFAULT_RELATION.to_string()
        } else {
            label
        };
        relationships.push(relationship);
    }

    let mut mentions = Vec::new();
    for mut mention in result.mentions {
        let name = alias_map
            .get(mention.entity.name.trim())
            .cloned()
            .unwrap_or_else(|| mention.entity.name.trim().to_string());
        if !canonical_names.contains(&name) {
            continue;
        }
        mention.entity.entity_type = canonical[&name].1.clone();
        mention.entity.name = name;
        mentions.push(mention);
    }

    let doc_entity_roots = entities
        .iter()
        .map(|entity| DocEntityRoot {
            name: entity.name.clone(),
            entity_type: entity.entity_type.clone(),
            key: normalize_entity_key(&entity.name),
        })
        .collect();

    ExtractionResult {
        entities,
        relationships,
        mentions,
        doc_entity_roots,
        diagnostics: result.diagnostics,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graphloom_core::{EntityRef, Mention, Relationship};
    use serde_json::{json, Map};

    fn relationship(source: &str, target: &str, relation: &str) -> Relationship {
        Relationship {
            source: EntityRef { name: source.into(), entity_type: "Concept".into() },
            target: EntityRef { name: target.into(), entity_type: "Concept".into() },
            relation: relation.into(),
            weight: None,
            evidence: None,
            properties: Map::new(),
        }
    }

    #[test]
    fn duplicate_keys_merge_keeping_the_higher_priority_type() {
        let result = ExtractionResult {
            entities: vec![
                Entity::new("Node A", "Concept"),
                Entity::new("node-a", "Person"),
            ],
            ..ExtractionResult::default()
        };
        let sanitized = sanitize_extraction(result, &SanitizeLimits::default());
        assert_eq!(sanitized.entities.len(), 1);
        assert_eq!(sanitized.entities[0].name, "Node A");
        assert_eq!(sanitized.entities[0].entity_type, "Person");
        assert_eq!(sanitized.doc_entity_roots.len(), 1);
        assert_eq!(sanitized.doc_entity_roots[0].key, "nodea");
    }

    #[test]
    fn structure_nodes_and_path_like_names_are_dropped() {
        let result = ExtractionResult {
            entities: vec![
                Entity::new("Section 3", "Concept"),
                Entity::new("chunk", "Concept"),
                Entity::new("第三章", "Concept"),
                Entity::new("a/b", "Concept"),
                Entity::new("doc#001", "Concept"),
                Entity::new("Real Entity", "Tool"),
            ],
            ..ExtractionResult::default()
        };
        let sanitized = sanitize_extraction(result, &SanitizeLimits::default());
        assert_eq!(sanitized.entities.len(), 1);
        assert_eq!(sanitized.entities[0].name, "Real Entity");
    }

    #[test]
    fn relationships_remap_through_aliases_and_drop_orphans() {
        let result = ExtractionResult {
            entities: vec![
                Entity::new("Node A", "Concept"),
                Entity::new("node-a", "Person"),
                Entity::new("Other", "Tool"),
            ],
            relationships: vec![
                relationship("node-a", "Other", "uses"),
                relationship("Ghost", "Other", "uses"),
                relationship("Node A", "Other", ""),
            ],
            ..ExtractionResult::default()
        };
        let sanitized = sanitize_extraction(result, &SanitizeLimits::default());
        assert_eq!(sanitized.relationships.len(), 2);
        // Alias endpoint folded onto the canonical entity with its merged type.
        assert_eq!(sanitized.relationships[0].source.name, "Node A");
        assert_eq!(sanitized.relationships[0].source.entity_type, "Person");
        // Empty labels get the default relation.
        assert_eq!(sanitized.relationships[1].relation, "RelatedTo");
    }

    #[test]
    fn type_property_hoists_out_of_the_bag() {
        let mut entity = Entity::new("Thing", "");
        entity.properties.insert("type".into(), json!("product"));
        entity.properties.insert("color".into(), json!("red"));
        let result = ExtractionResult { entities: vec![entity], ..ExtractionResult::default() };
        let sanitized = sanitize_extraction(result, &SanitizeLimits::default());
        assert_eq!(sanitized.entities[0].entity_type, "Product");
        assert!(sanitized.entities[0].properties.get("type").is_none());
        assert!(sanitized.entities[0].properties.get("color").is_some());
    }

    #[test]
    fn caps_bound_entities_and_relationships() {
        let entities = (0..60).map(|i| Entity::new(format!("e{i}"), "Concept")).collect();
        let result = ExtractionResult { entities, ..ExtractionResult::default() };
        let sanitized = sanitize_extraction(
            result,
            &SanitizeLimits { max_entities: 10, max_relationships: 5 },
        );
        assert_eq!(sanitized.entities.len(), 10);
        assert_eq!(sanitized.doc_entity_roots.len(), 10);
    }

    #[test]
    fn mentions_follow_the_canonical_entity() {
        let result = ExtractionResult {
            entities: vec![Entity::new("Node A", "Person"), Entity::new("node-a", "Concept")],
            mentions: vec![
                Mention {
                    chunk_id: "d#001".into(),
                    entity: EntityRef { name: "node-a".into(), entity_type: "Concept".into() },
                    confidence: Some(0.7),
                    snippet: None,
                },
                Mention {
                    chunk_id: "d#001".into(),
                    entity: EntityRef { name: "Missing".into(), entity_type: "Concept".into() },
                    confidence: None,
                    snippet: None,
                },
            ],
            ..ExtractionResult::default()
        };
        let sanitized = sanitize_extraction(result, &SanitizeLimits::default());
        assert_eq!(sanitized.mentions.len(), 1);
        assert_eq!(sanitized.mentions[0].entity.name, "Node A");
        assert_eq!(sanitized.mentions[0].entity.entity_type, "Person");
    }
}
