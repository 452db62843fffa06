//! Relationship-type normalization domain.

use crate::resolver::{AliasHit, LlmHit, NormalizationDomain, Resolver, ResolverOptions};
use crate::stats::{NormalizerSummary, SampleKind};
use crate::NormalizeOutcome;
use graphloom_core::traits::Classifier;
use graphloom_core::vocab::{is_relation, DEFAULT_RELATION, RELATION_CHOICES};
use graphloom_core::{normalize_entity_key, normalize_loose_label};
use graphloom_core::{ExtractionResult, NormalizedDoc, Relationship};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const DEFAULT_ALIAS_FILE: &str = "data/graphloom/relationship-alias.json";
pub const DEFAULT_CACHE_FILE: &str = "data/graphloom/relationship-type-cache.json";

/// One resolution input, detached from the mutable relationship.
#[derive(Debug, Clone)]
pub struct RelationCandidate {
    pub label: Option<String>,
    pub source_name: Option<String>,
    pub source_type: Option<String>,
    pub target_name: Option<String>,
    pub target_type: Option<String>,
    pub properties_text: String,
}

impl RelationCandidate {
    pub fn from_relationship(relationship: &Relationship) -> Self {
        let properties_text = relationship
            .properties
            .iter()
            .map(|(key, value)| match value {
                Value::Array(items) => {
                    let joined = items
                        .iter()
                        .map(render_scalar)
                        .collect::<Vec<_>>()
                        .join("|");
                    format!("{key}={joined}")
                }
                other => format!("{key}={}", render_scalar(other)),
            })
            .collect::<Vec<_>>()
            .join(", ");
        Self {
            label: non_empty(&relationship.relation),
            source_name: non_empty(&relationship.source.name),
            source_type: non_empty(&relationship.source.entity_type),
            target_name: non_empty(&relationship.target.name),
            target_type: non_empty(&relationship.target.entity_type),
            properties_text,
        }
    }
}

fn render_scalar(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
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

/// Domain half of the relationship-type resolver.
#[derive(Debug, Default)]
pub struct RelationTypeDomain {
    alias_map: HashMap<String, String>,
    alias_entries: usize,
}

impl NormalizationDomain for RelationTypeDomain {
    type Candidate = RelationCandidate;

    fn name(&self) -> &'static str {
        "relationships"
    }

    fn load_aliases(&mut self, raw: &Value) {
        let Some(entries) = raw.as_array() else {
            return;
        };
        for entry in entries {
            let relation = entry
                .get("relation")
                .or_else(|| entry.get("type"))
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
            let relation = match relation.or_else(|| aliases.first().copied()) {
                Some(relation) => relation.to_string(),
                None => continue,
            };

            let mut names: Vec<&str> = vec![relation.as_str()];
            names.extend(aliases.iter().copied());
            let mut inserted = false;
            for name in names {
                let key = normalize_loose_label(name);
                if key.is_empty() {
                    continue;
                }
                self.alias_map.entry(key).or_insert_with(|| relation.clone());
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

    /// Cache by label when one exists, else by endpoint pair, else by the
    /// property bag; relationships with none of these are not cacheable.
    fn cache_key(&self, candidate: &RelationCandidate) -> Option<String> {
        if let Some(label) = &candidate.label {
            let loose = normalize_loose_label(label);
            if !loose.is_empty() {
                return Some(format!("label:{loose}"));
            }
        }
        let source_key = candidate
            .source_name
            .as_deref()
            .map(normalize_entity_key)
            .unwrap_or_default();
        let target_key = candidate
            .target_name
            .as_deref()
            .map(normalize_entity_key)
            .unwrap_or_default();
        if !source_key.is_empty() || !target_key.is_empty() {
            let source = if source_key.is_empty() { "unknown" } else { &source_key };
            let target = if target_key.is_empty() { "unknown" } else { &target_key };
            return Some(format!("pair:{source}>{target}"));
        }
        let props_key = normalize_loose_label(&candidate.properties_text);
        if !props_key.is_empty() {
            return Some(format!("props:{props_key}"));
        }
        None
    }

    fn alias_lookup(&self, candidate: &RelationCandidate) -> Option<AliasHit> {
        let label = candidate.label.as_deref()?;
        let loose = normalize_loose_label(label);
        if loose.is_empty() {
            return None;
        }
        self.alias_map.get(&loose).map(|relation| AliasHit {
            value: relation.clone(),
            reason: format!("matched-alias:{label}"),
        })
    }

    fn cache_value_field(&self) -> &'static str {
        "relation"
    }

    fn classification_schema(&self) -> Value {
        let choices: Vec<&str> = RELATION_CHOICES.iter().map(|(value, _)| *value).collect();
        json!({
            "type": "object",
            "properties": {
                "relation": {
                    "type": "string",
                    "description": "relation label chosen from the candidate list",
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
            "required": ["relation"],
            "additionalProperties": false,
        })
    }

    fn prompt(&self, candidate: &RelationCandidate, context: &str) -> String {
        let mut lines = vec![
            "You are the relationship-type normalizer for a knowledge graph.".to_string(),
            "Pick exactly one relation from the list below; answer RelatedTo when unsure:"
                .to_string(),
            format_choices(),
        ];
        let source = candidate.source_name.as_deref().unwrap_or("unknown source");
        let target = candidate.target_name.as_deref().unwrap_or("unknown target");
        lines.push(format!(
            "Source entity: {source} ({})",
            candidate.source_type.as_deref().unwrap_or("unknown type")
        ));
        lines.push(format!(
            "Target entity: {target} ({})",
            candidate.target_type.as_deref().unwrap_or("unknown type")
        ));
        if let Some(label) = &candidate.label {
            lines.push(format!("Original relation label: {label}"));
        }
        if !candidate.properties_text.is_empty() {
            lines.push(format!("Relation properties: {}", candidate.properties_text));
        }
        if !context.is_empty() {
            lines.push(format!("Document context: {context}"));
        }
        lines.push(
            "Return JSON with fields relation (one of the list), confidence (0-1), and reason."
                .to_string(),
        );
        lines.join("\n")
    }

    fn parse_response(&self, response: &Value) -> Option<LlmHit> {
        let raw = response.get("relation").and_then(Value::as_str)?;
        let value = if is_relation(raw) {
            raw.to_string()
        } else {
            DEFAULT_RELATION.to_string()
        };
        Some(LlmHit {
            value,
            reason: response
                .get("reason")
                .and_then(Value::as_str)
                .map(str::to_string),
        })
    }

    fn fallback_value(&self, candidate: &RelationCandidate) -> String {
        candidate
            .label
            .clone()
            .unwrap_or_else(|| DEFAULT_RELATION.to_string())
    }

    fn describe(&self, candidate: &RelationCandidate) -> Value {
        json!({
            "source": candidate.source_name,
            "target": candidate.target_name,
        })
    }
}

fn format_choices() -> String {
    RELATION_CHOICES
        .iter()
        .map(|(value, description)| format!("- {value}: {description}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Rewrites relationship labels in place across an extraction result.
pub struct RelationshipTypeNormalizer {
    resolver: Resolver<RelationTypeDomain>,
}

impl RelationshipTypeNormalizer {
    pub async fn init(
        options: ResolverOptions,
        classifier: Option<Arc<dyn Classifier>>,
    ) -> io::Result<Self> {
        let resolver = Resolver::init(RelationTypeDomain::default(), options, classifier).await?;
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

    pub async fn normalize_aggregation(
        &mut self,
        doc: &NormalizedDoc,
        aggregation: &mut ExtractionResult,
    ) -> NormalizeOutcome {
        if !self.is_enabled() {
            return NormalizeOutcome::default();
        }
        let context = doc.context_text();

        for relationship in &mut aggregation.relationships {
            let candidate = RelationCandidate::from_relationship(relationship);
            let decision = self.resolver.resolve(&candidate, &context).await;
            self.resolver.stats.records.total += 1;
            self.resolver.stats.records.relationships += 1;

            let next = if decision.value.is_empty() {
                DEFAULT_RELATION.to_string()
            } else {
                decision.value.clone()
            };
            if relationship.relation != next {
                let previous = std::mem::replace(&mut relationship.relation, next.clone());
                self.resolver.stats.records.updated += 1;
                self.resolver.stats.samples.record(
                    SampleKind::Updates,
                    json!({
                        "source": candidate.source_name,
                        "target": candidate.target_name,
                        "previous": previous,
                        "next": next,
                        "reason": decision.reason,
                        "via": decision.source.as_str(),
                    }),
                );
            }
        }

        NormalizeOutcome {
            total: self.resolver.stats.records.total,
            updated: self.resolver.stats.records.updated,
        }
    }

    pub async fn persist_cache(&mut self) -> io::Result<Option<PathBuf>> {
        self.resolver.persist_cache().await
    }

    pub fn summary(&self) -> NormalizerSummary {
        self.resolver.summary()
    }
}
