//! The generic three-tier resolver.
//!
//! One algorithm serves entity types, relationship types, and property
//! keys; a [`NormalizationDomain`] supplies the parts that differ (alias
//! table shape, cache key derivation, classifier prompt, vocabulary).
//!
//! Resolution order: in-session memo → alias table → persistent cache →
//! classifier → fallback. Resolution never fails: when every tier is
//! unavailable the original value is kept and the reason recorded.

use crate::cache::CacheStore;
use crate::decision::{Decision, DecisionSource};
use crate::stats::{NormalizerStats, NormalizerSummary, SampleKind};
use chrono::Utc;
use graphloom_core::traits::Classifier;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Alias-table hit: canonical value plus a human-readable reason.
#[derive(Debug, Clone)]
pub struct AliasHit {
    pub value: String,
    pub reason: String,
}

/// Usable classifier output.
#[derive(Debug, Clone)]
pub struct LlmHit {
    pub value: String,
    pub reason: Option<String>,
}

/// Domain-specific half of the resolver.
pub trait NormalizationDomain: Send + Sync {
    /// Input for one resolution, owned so it can outlive the borrow that
    /// produced it.
    type Candidate: Send + Sync;

    /// Stats/guard domain name (`entities` / `relationships` / `properties`).
    fn name(&self) -> &'static str;

    /// Ingest the curated alias table (parsed JSON, usually an array).
    fn load_aliases(&mut self, raw: &Value);
    fn alias_entry_count(&self) -> usize;

    /// Memo/cache key for a candidate; empty or `None` disables caching
    /// and resolves straight to fallback.
    fn cache_key(&self, candidate: &Self::Candidate) -> Option<String>;

    /// Alias-table lookup. The lookup key may differ from the cache key
    /// (relationships key caches by endpoint pair but aliases by label).
    fn alias_lookup(&self, candidate: &Self::Candidate) -> Option<AliasHit>;

    /// Field the canonical value lives under in the cache file
    /// (`type` / `relation` / `canonicalKey`).
    fn cache_value_field(&self) -> &'static str;

    /// JSON schema constraining the classifier to the closed vocabulary.
    fn classification_schema(&self) -> Value;

    fn prompt(&self, candidate: &Self::Candidate, context: &str) -> String;

    /// Validate a classifier response; `None` means unusable (e.g. the
    /// `Other` sentinel) and degrades to fallback.
    fn parse_response(&self, response: &Value) -> Option<LlmHit>;

    /// Value kept when every tier fails.
    fn fallback_value(&self, candidate: &Self::Candidate) -> String;

    /// Candidate description merged into failure/fallback samples.
    fn describe(&self, candidate: &Self::Candidate) -> Value;

    /// Domain-level reason to skip the classifier entirely (e.g. the
    /// property domain without alias definitions has no vocabulary to
    /// classify into).
    fn classifier_veto(&self) -> Option<String> {
        None
    }
}

/// File locations and the enable switch for one resolver instance.
#[derive(Debug, Clone)]
pub struct ResolverOptions {
    pub enabled: bool,
    pub alias_path: PathBuf,
    pub cache_path: PathBuf,
}

/// Generic three-tier resolver; see module docs.
pub struct Resolver<D: NormalizationDomain> {
    domain: D,
    enabled: bool,
    cache: CacheStore,
    memo: HashMap<String, Decision>,
    classifier: Option<Arc<dyn Classifier>>,
    pub stats: NormalizerStats,
}

impl<D: NormalizationDomain> Resolver<D> {
    /// Load the alias table and persistent cache, wire the classifier.
    pub async fn init(
        mut domain: D,
        options: ResolverOptions,
        classifier: Option<Arc<dyn Classifier>>,
    ) -> io::Result<Self> {
        let raw_aliases = read_json_or(&options.alias_path, Value::Array(Vec::new())).await?;
        domain.load_aliases(&raw_aliases);

        let cache = CacheStore::load(&options.cache_path).await?;

        let mut stats = NormalizerStats {
            enabled: options.enabled,
            ..NormalizerStats::default()
        };
        stats.cache.path = Some(options.cache_path.display().to_string());
        stats.cache.size = cache.len();

        debug!(
            domain = domain.name(),
            aliases = domain.alias_entry_count(),
            cached = cache.len(),
            enabled = options.enabled,
            "normalizer initialized"
        );

        Ok(Self {
            domain,
            enabled: options.enabled,
            cache,
            memo: HashMap::new(),
            classifier,
            stats,
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn domain(&self) -> &D {
        &self.domain
    }

    /// Decision previously made for a normalized key in this session.
    pub fn memoized(&self, key: &str) -> Option<&Decision> {
        self.memo.get(key)
    }

    /// Resolve one candidate. Always terminates with a decision.
    pub async fn resolve(&mut self, candidate: &D::Candidate, context: &str) -> Decision {
        let key = match self.domain.cache_key(candidate) {
            Some(key) if !key.is_empty() => key,
            _ => {
                let decision =
                    Decision::fallback(self.domain.fallback_value(candidate), "empty-key");
                self.note(&decision, candidate);
                return decision;
            }
        };

        if let Some(previous) = self.memo.get(&key) {
            let mut decision = previous.clone();
            decision.reused = true;
            self.note(&decision, candidate);
            return decision;
        }

        if let Some(hit) = self.domain.alias_lookup(candidate) {
            let decision = Decision {
                value: hit.value,
                source: DecisionSource::Alias,
                reason: Some(hit.reason),
                provider: None,
                model: None,
                reused: false,
            };
            self.remember(key, &decision, candidate);
            return decision;
        }

        if let Some(entry) = self.cache.get(&key) {
            if let Some(value) = entry
                .get(self.domain.cache_value_field())
                .and_then(Value::as_str)
            {
                let decision = Decision {
                    value: value.to_string(),
                    source: DecisionSource::Cache,
                    reason: entry
                        .get("reason")
                        .and_then(Value::as_str)
                        .map(str::to_string)
                        .or_else(|| Some("cache-hit".to_string())),
                    provider: entry
                        .get("provider")
                        .and_then(Value::as_str)
                        .map(str::to_string),
                    model: entry.get("model").and_then(Value::as_str).map(str::to_string),
                    reused: false,
                };
                self.remember(key, &decision, candidate);
                return decision;
            }
        }

        if let Some(hit) = self.classify(candidate, context).await {
            let decision = Decision {
                value: hit.value,
                source: DecisionSource::Llm,
                reason: hit.reason.or_else(|| Some("llm".to_string())),
                provider: self.stats.llm.provider.clone(),
                model: self.stats.llm.model.clone(),
                reused: false,
            };
            let mut entry = serde_json::Map::new();
            entry.insert(
                self.domain.cache_value_field().to_string(),
                Value::String(decision.value.clone()),
            );
            entry.insert("source".into(), json!("llm"));
            entry.insert("decidedAt".into(), json!(Utc::now().to_rfc3339()));
            entry.insert("provider".into(), json!(decision.provider));
            entry.insert("model".into(), json!(decision.model));
            entry.insert("reason".into(), json!(decision.reason));
            self.cache.insert(key.clone(), Value::Object(entry));
            self.stats.cache.updated = true;
            self.stats.cache.size = self.cache.len();
            self.stats.cache.writes += 1;
            self.remember(key, &decision, candidate);
            return decision;
        }

        let reason = self
            .stats
            .llm
            .disabled_reason
            .clone()
            .unwrap_or_else(|| "llm-unavailable".to_string());
        let decision = Decision::fallback(self.domain.fallback_value(candidate), reason);
        self.remember(key, &decision, candidate);
        decision
    }

    async fn classify(&mut self, candidate: &D::Candidate, context: &str) -> Option<LlmHit> {
        if let Some(reason) = self.domain.classifier_veto() {
            self.stats.llm.disabled_reason.get_or_insert(reason);
            return None;
        }
        let classifier = match &self.classifier {
            Some(classifier) => classifier.clone(),
            None => {
                self.stats
                    .llm
                    .disabled_reason
                    .get_or_insert_with(|| "disabled".to_string());
                return None;
            }
        };

        let info = match classifier.ensure().await {
            Ok(info) => info,
            Err(unavailable) => {
                self.stats.llm.disabled_reason = Some(unavailable.reason);
                return None;
            }
        };
        self.stats.llm.provider = Some(info.provider);
        self.stats.llm.model = Some(info.model);

        let prompt = self.domain.prompt(candidate, context);
        let schema = self.domain.classification_schema();
        self.stats.llm.attempts += 1;
        match classifier.classify(&prompt, &schema).await {
            Ok(response) => {
                self.stats.llm.success += 1;
                self.domain.parse_response(&response)
            }
            Err(err) => {
                let message = err.to_string();
                self.stats.llm.failures += 1;
                self.stats.llm.errors.push(message.clone());
                let mut sample = self.domain.describe(candidate);
                if let Some(object) = sample.as_object_mut() {
                    object.insert("message".into(), Value::String(message));
                }
                self.stats.samples.record(SampleKind::Failures, sample);
                None
            }
        }
    }

    fn remember(&mut self, key: String, decision: &Decision, candidate: &D::Candidate) {
        self.memo.insert(key, decision.clone());
        self.note(decision, candidate);
    }

    fn note(&mut self, decision: &Decision, candidate: &D::Candidate) {
        self.stats.sources.bump(decision);
        if decision.source == DecisionSource::Fallback {
            let mut sample = self.domain.describe(candidate);
            if let Some(object) = sample.as_object_mut() {
                object.insert(
                    "reason".into(),
                    Value::String(
                        decision.reason.clone().unwrap_or_else(|| "unknown".to_string()),
                    ),
                );
            }
            self.stats.samples.record(SampleKind::Fallback, sample);
        }
    }

    /// Write the cache side-file if any LLM decision landed this session.
    pub async fn persist_cache(&mut self) -> io::Result<Option<PathBuf>> {
        self.cache.persist().await
    }

    /// Summary consumed by guards and telemetry.
    pub fn summary(&self) -> NormalizerSummary {
        NormalizerSummary {
            domain: self.domain.name().to_string(),
            enabled: self.enabled,
            records: self.stats.records.clone(),
            sources: self.stats.sources.clone(),
            cache: crate::stats::CacheStats {
                path: self.stats.cache.path.clone(),
                size: self.cache.len(),
                updated: self.stats.cache.updated,
                writes: self.stats.cache.writes,
            },
            llm: self.stats.llm.clone(),
            samples: self.stats.samples.clone(),
            alias_entries: self.domain.alias_entry_count(),
        }
    }
}

async fn read_json_or(path: &Path, fallback: Value) -> io::Result<Value> {
    match tokio::fs::read_to_string(path).await {
        Ok(raw) => serde_json::from_str(&raw).map_err(|err| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("malformed json file {}: {err}", path.display()),
            )
        }),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(fallback),
        Err(err) => Err(err),
    }
}
