//! Node labels, edge types, and the declarative schema applied before the
//! first write.

use graphloom_core::traits::{GraphSchema, IndexDef, UniqueConstraint};

pub mod labels {
    pub const DOC: &str = "Doc";
    pub const CHUNK: &str = "Chunk";
    pub const ENTITY: &str = "Entity";
    pub const CATEGORY: &str = "Category";
    pub const TAG: &str = "Tag";
}

pub mod edge_types {
    pub const IN_CATEGORY: &str = "IN_CATEGORY";
    pub const HAS_TAG: &str = "HAS_TAG";
    pub const PART_OF: &str = "PART_OF";
    pub const MENTIONS: &str = "MENTIONS";
    pub const RELATED: &str = "RELATED";
    pub const HAS_ENTITY: &str = "HAS_ENTITY";
}

/// Uniqueness constraints and supporting indexes for the managed labels.
pub fn default_schema() -> GraphSchema {
    GraphSchema {
        constraints: vec![
            constraint("doc_id_unique", labels::DOC, &["id"]),
            constraint("chunk_id_unique", labels::CHUNK, &["id"]),
            constraint("entity_identity_unique", labels::ENTITY, &["type", "name"]),
            constraint("category_name_unique", labels::CATEGORY, &["name"]),
            constraint("tag_name_unique", labels::TAG, &["name"]),
        ],
        indexes: vec![
            index("doc_updated_at_index", labels::DOC, "updated_at"),
            index("entity_salience_index", labels::ENTITY, "salience"),
            index("chunk_text_index", labels::CHUNK, "text"),
            index("tag_slug_index", labels::TAG, "slug"),
        ],
    }
}

fn constraint(name: &str, label: &str, properties: &[&str]) -> UniqueConstraint {
    UniqueConstraint {
        name: name.to_string(),
        label: label.to_string(),
        properties: properties.iter().map(|p| p.to_string()).collect(),
    }
}

fn index(name: &str, label: &str, property: &str) -> IndexDef {
    IndexDef {
        name: name.to_string(),
        label: label.to_string(),
        property: property.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_identity_is_the_type_name_pair() {
        let schema = default_schema();
        let entity = schema
            .constraints
            .iter()
            .find(|c| c.label == labels::ENTITY)
            .unwrap();
        assert_eq!(entity.properties, vec!["type", "name"]);
        assert_eq!(schema.constraints.len(), 5);
        assert_eq!(schema.indexes.len(), 4);
    }
}
