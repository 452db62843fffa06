//! Object-property normalization domain: canonical keys plus typed value
//! coercion driven by the curated property definitions.

use crate::resolver::{AliasHit, LlmHit, NormalizationDomain, Resolver, ResolverOptions};
use crate::stats::{NormalizerSummary, SampleKind};
use crate::value::{clamp, coerce_array, coerce_boolean, coerce_number, number_value, round_to};
use crate::NormalizeOutcome;
use graphloom_core::normalize_loose_label;
use graphloom_core::traits::Classifier;
use graphloom_core::{ExtractionResult, NormalizedDoc};
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const DEFAULT_ALIAS_FILE: &str = "data/graphloom/property-alias.json";
pub const DEFAULT_CACHE_FILE: &str = "data/graphloom/property-cache.json";

/// Sentinel the classifier may answer when no defined key fits.
pub const OTHER_CHOICE: &str = "Other";

/// Declared value type of a property definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PropertyType {
    Number,
    Boolean,
    Array,
    NumberArray,
    Object,
    #[default]
    String,
}

impl PropertyType {
    fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "number" => Self::Number,
            "boolean" => Self::Boolean,
            "array" => Self::Array,
            "number[]" => Self::NumberArray,
            "object" => Self::Object,
            _ => Self::String,
        }
    }
}

/// One curated property: canonical key, type, aliases, value rules.
#[derive(Debug, Clone)]
pub struct PropertyDefinition {
    pub key: String,
    pub value_type: PropertyType,
    pub description: String,
    pub aliases: Vec<String>,
    /// Free-text value variants mapped onto canonical values.
    pub value_aliases: Vec<(Value, Vec<String>)>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub precision: Option<u32>,
}

impl PropertyDefinition {
    fn from_json(entry: &Value) -> Option<Self> {
        let key = entry.get("key")?.as_str()?.trim();
        if key.is_empty() {
            return None;
        }
        let value_type = entry
            .get("type")
            .and_then(Value::as_str)
            .map(PropertyType::parse)
            .unwrap_or_default();
        let description = entry
            .get("description")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .trim()
            .to_string();
        let aliases = entry
            .get("aliases")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::trim)
                    .filter(|text| !text.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        let value_aliases = entry
            .get("valueAliases")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|alias_entry| {
                        let value = alias_entry.get("value").cloned().unwrap_or(Value::Null);
                        let aliases: Vec<String> = alias_entry
                            .get("aliases")
                            .and_then(Value::as_array)?
                            .iter()
                            .filter_map(Value::as_str)
                            .map(str::trim)
                            .filter(|text| !text.is_empty())
                            .map(str::to_string)
                            .collect();
                        if aliases.is_empty() {
                            None
                        } else {
                            Some((value, aliases))
                        }
                    })
                    .collect()
            })
            .unwrap_or_default();
        let range = entry.get("valueRange");
        let min = range
            .and_then(|r| r.get("min"))
            .and_then(Value::as_f64)
            .filter(|n| n.is_finite());
        let max = range
            .and_then(|r| r.get("max"))
            .and_then(Value::as_f64)
            .filter(|n| n.is_finite());
        let precision = entry
            .get("precision")
            .and_then(Value::as_f64)
            .filter(|n| *n >= 0.0)
            .map(|n| n as u32);

        Some(Self {
            key: key.to_string(),
            value_type,
            description,
            aliases,
            value_aliases,
            min,
            max,
            precision,
        })
    }

    /// Apply the value-alias table, then coerce to the declared type.
    /// Unparseable values are left unchanged.
    pub fn coerce(&self, raw: &Value) -> Value {
        let raw = self.apply_value_alias(raw);
        match self.value_type {
            PropertyType::Number => match coerce_number(&raw) {
                Some(parsed) => {
                    let mut result = clamp(parsed, self.min, self.max);
                    if let Some(precision) = self.precision {
                        result = round_to(result, precision);
                    }
                    number_value(result)
                }
                None => raw,
            },
            PropertyType::Boolean => match coerce_boolean(&raw) {
                Some(flag) => Value::Bool(flag),
                None => raw,
            },
            PropertyType::Array => coerce_array(&raw),
            PropertyType::NumberArray => match coerce_array(&raw) {
                Value::Array(items) => Value::Array(
                    items
                        .iter()
                        .filter_map(coerce_number)
                        .map(number_value)
                        .collect(),
                ),
                other => other,
            },
            PropertyType::Object => match &raw {
                Value::Object(_) => raw,
                Value::String(text) => match serde_json::from_str::<Value>(text) {
                    Ok(parsed @ Value::Object(_)) => parsed,
                    _ => raw,
                },
                _ => raw,
            },
            PropertyType::String => match &raw {
                Value::Null => raw,
                Value::String(text) => Value::String(text.trim().to_string()),
                Value::Number(_) | Value::Bool(_) => {
                    Value::String(render_scalar(&raw))
                }
                other => Value::String(other.to_string()),
            },
        }
    }

    fn apply_value_alias(&self, raw: &Value) -> Value {
        if let Value::String(text) = raw {
            let loose = normalize_loose_label(text);
            if !loose.is_empty() {
                for (value, aliases) in &self.value_aliases {
                    if aliases.iter().any(|alias| normalize_loose_label(alias) == loose) {
                        return value.clone();
                    }
                }
            }
        }
        raw.clone()
    }
}

fn render_scalar(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Bool(flag) => flag.to_string(),
        other => other.to_string(),
    }
}

/// Domain half of the property-key resolver.
#[derive(Debug, Default)]
pub struct PropertyDomain {
    alias_map: HashMap<String, String>,
    definitions: HashMap<String, PropertyDefinition>,
    ordered_keys: Vec<String>,
}

impl PropertyDomain {
    pub fn definition(&self, key: &str) -> Option<&PropertyDefinition> {
        self.definitions.get(key)
    }

    fn choice_description(&self) -> String {
        if self.ordered_keys.is_empty() {
            return "(no property keys defined; keep the original key)".to_string();
        }
        self.ordered_keys
            .iter()
            .map(|key| {
                let description = self
                    .definitions
                    .get(key)
                    .map(|def| def.description.as_str())
                    .filter(|text| !text.is_empty())
                    .unwrap_or("custom property");
                format!("- {key}: {description}")
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// One resolution input: a raw property key and its value.
#[derive(Debug, Clone)]
pub struct PropertyCandidate {
    pub key: String,
    pub value: Value,
}

impl NormalizationDomain for PropertyDomain {
    type Candidate = PropertyCandidate;

    fn name(&self) -> &'static str {
        "properties"
    }

    fn load_aliases(&mut self, raw: &Value) {
        let Some(entries) = raw.as_array() else {
            return;
        };
        for entry in entries {
            let Some(definition) = PropertyDefinition::from_json(entry) else {
                continue;
            };
            let key_alias = normalize_loose_label(&definition.key);
            if !key_alias.is_empty() {
                self.alias_map
                    .entry(key_alias)
                    .or_insert_with(|| definition.key.clone());
            }
            for alias in &definition.aliases {
                let normalized = normalize_loose_label(alias);
                if normalized.is_empty() {
                    continue;
                }
                self.alias_map
                    .entry(normalized)
                    .or_insert_with(|| definition.key.clone());
            }
            self.ordered_keys.push(definition.key.clone());
            self.definitions.insert(definition.key.clone(), definition);
        }
    }

    fn alias_entry_count(&self) -> usize {
        self.ordered_keys.len()
    }

    fn cache_key(&self, candidate: &PropertyCandidate) -> Option<String> {
        Some(normalize_loose_label(&candidate.key))
    }

    fn alias_lookup(&self, candidate: &PropertyCandidate) -> Option<AliasHit> {
        let key = normalize_loose_label(&candidate.key);
        self.alias_map.get(&key).map(|canonical| AliasHit {
            value: canonical.clone(),
            reason: format!("matched-alias:{}", candidate.key),
        })
    }

    fn cache_value_field(&self) -> &'static str {
        "canonicalKey"
    }

    fn classification_schema(&self) -> Value {
        let mut choices: Vec<&str> = self.ordered_keys.iter().map(String::as_str).collect();
        choices.push(OTHER_CHOICE);
        json!({
            "type": "object",
            "properties": {
                "key": {
                    "type": "string",
                    "description": "property key chosen from the candidate list, or Other",
                    "enum": choices,
                },
                "confidence": {
                    "type": "number",
                    "description": "confidence between 0 and 1; use 0.5 when unsure",
                },
                "reason": {
                    "type": "string",
                    "description": "brief explanation of the choice",
                },
            },
            "required": ["key"],
            "additionalProperties": false,
        })
    }

    fn prompt(&self, candidate: &PropertyCandidate, context: &str) -> String {
        let mut lines = vec![
            "You are the property normalizer for a knowledge graph.".to_string(),
            "Map the property key/value onto one of the candidate keys below; answer Other when none fits:"
                .to_string(),
            self.choice_description(),
            format!("Property key: {}", candidate.key),
            format!("Property value: {}", render_scalar(&candidate.value)),
        ];
        if !context.is_empty() {
            lines.push(format!("Context: {context}"));
        }
        lines.push(
            "Return JSON with fields key (candidate list or Other), confidence (0-1), and reason."
                .to_string(),
        );
        lines.join("\n")
    }

    fn parse_response(&self, response: &Value) -> Option<LlmHit> {
        let key = response.get("key").and_then(Value::as_str)?;
        if !self.definitions.contains_key(key) {
            // Unknown keys and the Other sentinel both degrade to fallback.
            return None;
        }
        Some(LlmHit {
            value: key.to_string(),
            reason: response
                .get("reason")
                .and_then(Value::as_str)
                .map(str::to_string),
        })
    }

    fn fallback_value(&self, candidate: &PropertyCandidate) -> String {
        candidate.key.clone()
    }

    fn describe(&self, candidate: &PropertyCandidate) -> Value {
        json!({ "key": candidate.key })
    }

    /// Without curated definitions there is no vocabulary to classify into.
    fn classifier_veto(&self) -> Option<String> {
        if self.ordered_keys.is_empty() {
            Some("missing-provider".to_string())
        } else {
            None
        }
    }
}

/// Where a property bag lives, for sample payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ContainerKind {
    Relationship,
    Entity,
}

/// Rewrites property keys and values in place across an extraction result.
pub struct PropertyNormalizer {
    resolver: Resolver<PropertyDomain>,
}

impl PropertyNormalizer {
    pub async fn init(
        options: ResolverOptions,
        classifier: Option<Arc<dyn Classifier>>,
    ) -> io::Result<Self> {
        let resolver = Resolver::init(PropertyDomain::default(), options, classifier).await?;
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
            let location = format!(
                "{} -> {} ({})",
                relationship.source.name, relationship.target.name, relationship.relation
            );
            let mut properties = std::mem::take(&mut relationship.properties);
            self.normalize_container(
                &mut properties,
                ContainerKind::Relationship,
                &location,
                &context,
            )
            .await;
            relationship.properties = properties;
        }

        for entity in &mut aggregation.entities {
            let location = entity.name.clone();
            let mut properties = std::mem::take(&mut entity.properties);
            self.normalize_container(&mut properties, ContainerKind::Entity, &location, &context)
                .await;
            entity.properties = properties;
        }

        NormalizeOutcome {
            total: self.resolver.stats.records.total,
            updated: self.resolver.stats.records.updated,
        }
    }

    async fn normalize_container(
        &mut self,
        properties: &mut Map<String, Value>,
        kind: ContainerKind,
        location: &str,
        context: &str,
    ) -> bool {
        if properties.is_empty() {
            return false;
        }
        let mut changed = false;
        let mut next = Map::new();

        for (raw_key, raw_value) in properties.iter() {
            let trimmed = raw_key.trim();
            if trimmed.is_empty() {
                continue;
            }
            let candidate = PropertyCandidate {
                key: trimmed.to_string(),
                value: raw_value.clone(),
            };
            let decision = self.resolver.resolve(&candidate, context).await;
            self.resolver.stats.records.total += 1;
            match kind {
                ContainerKind::Relationship => self.resolver.stats.records.relationships += 1,
                ContainerKind::Entity => self.resolver.stats.records.entities += 1,
            }

            let canonical = if decision.value.is_empty() {
                trimmed.to_string()
            } else {
                decision.value.clone()
            };
            let coerced = match self.resolver.domain().definition(&canonical) {
                Some(definition) => definition.coerce(raw_value),
                None => raw_value.clone(),
            };

            if canonical != trimmed || &coerced != raw_value {
                changed = true;
                self.resolver.stats.records.updated += 1;
                self.resolver.stats.samples.record(
                    SampleKind::Updates,
                    json!({
                        "key": canonical,
                        "previousKey": trimmed,
                        "previousValue": raw_value,
                        "nextValue": coerced,
                        "source": decision.source.as_str(),
                        "location": location,
                    }),
                );
            }
            next.insert(canonical, coerced);
        }

        if changed || next.len() != properties.len() {
            *properties = next;
            return true;
        }
        false
    }

    pub async fn persist_cache(&mut self) -> io::Result<Option<PathBuf>> {
        self.resolver.persist_cache().await
    }

    pub fn summary(&self) -> NormalizerSummary {
        self.resolver.summary()
    }
}
