//! Entity-type normalization domain.

use crate::resolver::{AliasHit, LlmHit, NormalizationDomain, Resolver, ResolverOptions};
use crate::stats::{NormalizerSummary, SampleKind};
use crate::NormalizeOutcome;
use graphloom_core::normalize_entity_key;
use graphloom_core::traits::Classifier;
use graphloom_core::vocab::{
    is_entity_type, normalize_type_label, DEFAULT_ENTITY_TYPE, ENTITY_TYPE_CHOICES,
};
use graphloom_core::{ExtractionResult, NormalizedDoc, Relationship};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const DEFAULT_ALIAS_FILE: &str = "data/graphloom/entity-alias.json";
pub const DEFAULT_CACHE_FILE: &str = "data/graphloom/entity-type-cache.json";

/// One resolution input: the entity name plus its extracted type.
#[derive(Debug, Clone)]
pub struct EntityCandidate {
    pub name: String,
    pub current_type: Option<String>,
}

#[derive(Debug, Clone)]
struct AliasTarget {
    entity_type: String,
    canonical: String,
}

/// Domain half of the entity-type resolver.
#[derive(Debug, Default)]
pub struct EntityTypeDomain {
    alias_map: HashMap<String, AliasTarget>,
    alias_entries: usize,
}

impl NormalizationDomain for EntityTypeDomain {
    type Candidate = EntityCandidate;

    fn name(&self) -> &'static str {
        "entities"
    }

    fn load_aliases(&mut self, raw: &Value) {
        let Some(entries) = raw.as_array() else {
            return;
        };
        for entry in entries {
            let entity_type = entry
                .get("type")
                .and_then(Value::as_str)
                .and_then(normalize_type_label)
                .unwrap_or_else(|| DEFAULT_ENTITY_TYPE.to_string());
            let canonical = entry
                .get("canonical")
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|text| !text.is_empty());
            let aliases: Vec<&str> = entry
                .get("aliases")
                .and_then(Value::as_array)
                .map(|items| {
                    items
                        .iter()
                        .filter_map(Value::as_str)
                        .map(str::trim)
                        .filter(|text| !text.is_empty())
                        .collect()
                })
                .unwrap_or_default();

            let canonical = match canonical.or_else(|| aliases.first().copied()) {
                Some(canonical) => canonical.to_string(),
                None => continue,
            };

            let mut names: Vec<&str> = vec![canonical.as_str()];
            names.extend(aliases.iter().copied());

            let mut inserted = false;
            for name in names {
                let key = normalize_entity_key(name);
                if key.is_empty() {
                    continue;
                }
                self.alias_map.entry(key).or_insert_with(|| AliasTarget {
                    entity_type: entity_type.clone(),
                    canonical: canonical.clone(),
                });
                inserted = true;
            }
            if inserted {
                self.alias_entries += 1;
            }
        }
    }

    fn alias_entry_count(&self) -> usize {
        self.alias_entries
    }

    fn cache_key(&self, candidate: &EntityCandidate) -> Option<String> {
        Some(normalize_entity_key(&candidate.name))
    }

    fn alias_lookup(&self, candidate: &EntityCandidate) -> Option<AliasHit> {
        let key = normalize_entity_key(&candidate.name);
        self.alias_map.get(&key).map(|target| AliasHit {
            value: target.entity_type.clone(),
            reason: format!("matched-alias:{}", target.canonical),
        })
    }

    fn cache_value_field(&self) -> &'static str {
        "type"
    }

    fn classification_schema(&self) -> Value {
        let choices: Vec<&str> = ENTITY_TYPE_CHOICES.iter().map(|(value, _)| *value).collect();
        json!({
            "type": "object",
            "properties": {
                "type": {
                    "type": "string",
                    "description": "entity type chosen from the candidate list",
                    "enum": choices,
                },
                "confidence": {
                    "type": "number",
                    "description": "confidence between 0 and 1; use 0.5 when unsure",
                },
                "reason": {
                    "type": "string",
                    "description": "one or two sentences explaining the choice",
                },
            },
            "required": ["type"],
            "additionalProperties": false,
        })
    }

    fn prompt(&self, candidate: &EntityCandidate, context: &str) -> String {
        let mut lines = vec![
            "You are the entity-type normalizer for a knowledge graph.".to_string(),
            "Pick exactly one type from the list below for the entity; choose Concept when unsure:"
                .to_string(),
            format_choices(),
            format!("Entity name: {}", candidate.name),
        ];
        if let Some(current) = &candidate.current_type {
            if current != DEFAULT_ENTITY_TYPE {
                lines.push(format!("Original type: {current}"));
            }
        }
        if !context.is_empty() {
            lines.push(format!("Context: {context}"));
        }
        lines.push(
            "Return JSON with fields type (one of the list), confidence (0-1), and reason."
                .to_string(),
        );
        lines.join("\n")
    }

    fn parse_response(&self, response: &Value) -> Option<LlmHit> {
        let raw = response.get("type").and_then(Value::as_str)?;
        let normalized = normalize_type_label(raw)
            .filter(|label| is_entity_type(label))
            .unwrap_or_else(|| DEFAULT_ENTITY_TYPE.to_string());
        Some(LlmHit {
            value: normalized,
            reason: response
                .get("reason")
                .and_then(Value::as_str)
                .map(str::to_string),
        })
    }

    fn fallback_value(&self, candidate: &EntityCandidate) -> String {
        candidate
            .current_type
            .as_deref()
            .and_then(normalize_type_label)
            .unwrap_or_else(|| DEFAULT_ENTITY_TYPE.to_string())
    }

    fn describe(&self, candidate: &EntityCandidate) -> Value {
        json!({ "name": candidate.name })
    }
}

fn format_choices() -> String {
    ENTITY_TYPE_CHOICES
        .iter()
        .map(|(value, description)| format!("- {value}: {description}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Rewrites entity and doc-root types in place across an extraction result.
pub struct EntityTypeNormalizer {
    resolver: Resolver<EntityTypeDomain>,
}

impl EntityTypeNormalizer {
    pub async fn init(
        options: ResolverOptions,
        classifier: Option<Arc<dyn Classifier>>,
    ) -> io::Result<Self> {
        let resolver = Resolver::init(EntityTypeDomain::default(), options, classifier).await?;
        Ok(Self { resolver })
    }

    pub fn default_options(root: &Path, enabled: bool) -> ResolverOptions {
        ResolverOptions {
            enabled,
            alias_path: root.join(DEFAULT_ALIAS_FILE),
            cache_path: root.join(DEFAULT_CACHE_FILE),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.resolver.is_enabled()
    }

    /// Normalize every entity and doc-root type in the aggregation, then
    /// sync relationship endpoint types with the resolved decisions.
    pub async fn normalize_aggregation(
        &mut self,
        doc: &NormalizedDoc,
        aggregation: &mut ExtractionResult,
    ) -> NormalizeOutcome {
        if !self.is_enabled() {
            return NormalizeOutcome::default();
        }
        let context = doc.context_text();

        for entity in &mut aggregation.entities {
            let candidate = EntityCandidate {
                name: entity.name.clone(),
                current_type: non_empty(&entity.entity_type),
            };
            let decision = self.resolver.resolve(&candidate, &context).await;
            self.resolver.stats.records.total += 1;
            self.resolver.stats.records.entities += 1;
            let next = normalize_type_label(&decision.value)
                .unwrap_or_else(|| DEFAULT_ENTITY_TYPE.to_string());
            if entity.entity_type != next {
                let previous = std::mem::replace(&mut entity.entity_type, next.clone());
                self.resolver.stats.records.updated += 1;
                self.resolver.stats.samples.record(
                    SampleKind::Updates,
                    json!({
                        "name": candidate.name,
                        "previous": previous,
                        "next": next,
                        "source": decision.source.as_str(),
                    }),
                );
            }
        }

        for root in &mut aggregation.doc_entity_roots {
            let candidate = EntityCandidate {
                name: root.name.clone(),
                current_type: non_empty(&root.entity_type),
            };
            let decision = self.resolver.resolve(&candidate, &context).await;
            self.resolver.stats.records.total += 1;
            self.resolver.stats.records.doc_roots += 1;
            let next = normalize_type_label(&decision.value)
                .unwrap_or_else(|| DEFAULT_ENTITY_TYPE.to_string());
            if root.entity_type != next {
                let previous = std::mem::replace(&mut root.entity_type, next.clone());
                self.resolver.stats.records.updated += 1;
                self.resolver.stats.samples.record(
                    SampleKind::Updates,
                    json!({
                        "name": candidate.name,
                        "previous": previous,
                        "next": next,
                        "source": decision.source.as_str(),
                    }),
                );
            }
        }

        self.update_relationship_types(&mut aggregation.relationships);

        NormalizeOutcome {
            total: self.resolver.stats.records.total,
            updated: self.resolver.stats.records.updated,
        }
    }

    /// Keep relationship endpoints consistent with resolved entity types.
    pub fn update_relationship_types(&self, relationships: &mut [Relationship]) {
        for relationship in relationships {
            for endpoint in [&mut relationship.source, &mut relationship.target] {
                let key = normalize_entity_key(&endpoint.name);
                if let Some(decision) = self.resolver.memoized(&key) {
                    endpoint.entity_type = decision.value.clone();
                }
            }
        }
    }

    pub async fn persist_cache(&mut self) -> io::Result<Option<PathBuf>> {
        self.resolver.persist_cache().await
    }

    pub fn summary(&self) -> NormalizerSummary {
        self.resolver.summary()
    }
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
