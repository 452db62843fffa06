//! The ingest orchestrator.
//!
//! Coordinates collection, gating, extraction, normalization, payload
//! assembly, guard evaluation, and the batch write. This crate only
//! coordinates; every capability is injected through its trait, so the
//! pipeline runs identically over any store/extractor/classifier wiring.
//!
//! Per-document flow:
//! `collected → (skip: generated-path | hash unchanged | quality-fail) →
//! extracted → (skip: adapter-error) → normalized → payload-built →
//! written`. One document's failure never aborts the run; only a guard
//! breach in fail mode aborts the write phase.

use crate::cache::{IngestCache, DEFAULT_CACHE_FILE};
use crate::collect::{collect_documents, read_filter_file, CollectOptions};
use crate::extract::create_extractor;
use crate::metadata::normalize_document;
use crate::payload::{build_payload, PayloadOptions};
use crate::quality::QualityChecker;
use crate::sanitize::{sanitize_extraction, SanitizeLimits};
use anyhow::{Context, Result};
use chrono::Utc;
use graphloom_core::traits::{Extractor, GraphStore};
use graphloom_core::{NormalizedDoc, WritePayload};
use graphloom_graph::writer::WriteFailure;
use graphloom_graph::{default_schema, GraphWriter};
use graphloom_normalize::{
    EntityTypeNormalizer, NormalizerSummary, PropertyNormalizer, RelationshipTypeNormalizer,
};
use graphloom_telemetry::{
    evaluate_normalization_guards, AlertSeverity, GuardInput, GuardOptions, GuardReport,
    MetricsStore,
};
use serde::Serialize;
use serde_json::json;
use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

#[derive(Debug, Clone)]
pub struct IngestOptions {
    pub content_root: PathBuf,
    pub locale: Option<String>,
    pub include_drafts: bool,
    pub changed_only: bool,
    pub no_cache: bool,
    /// Skip the write phase entirely (still collects, gates, normalizes).
    pub dry_run: bool,
    pub skip_schema: bool,
    pub include_file: Option<PathBuf>,
    pub ignore_file: Option<PathBuf>,
    pub cache_path: PathBuf,
    pub payload: PayloadOptions,
    pub sanitize: SanitizeLimits,
    pub guard: GuardOptions,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            content_root: PathBuf::from("content"),
            locale: None,
            include_drafts: false,
            changed_only: false,
            no_cache: false,
            dry_run: false,
            skip_schema: false,
            include_file: None,
            ignore_file: None,
            cache_path: PathBuf::from(DEFAULT_CACHE_FILE),
            payload: PayloadOptions::default(),
            sanitize: SanitizeLimits::default(),
            guard: GuardOptions::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SkipRecord {
    pub doc_id: String,
    pub reason: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PhaseTimings {
    pub collect_ms: u64,
    pub extract_ms: u64,
    pub entity_types_ms: u64,
    pub relation_types_ms: u64,
    pub properties_ms: u64,
    pub write_ms: u64,
}

/// Machine-consumable run summary.
#[derive(Debug, Clone, Serialize)]
pub struct IngestSummary {
    pub total_documents: usize,
    pub normalized: usize,
    pub ready_for_write: usize,
    pub written: usize,
    pub skipped: Vec<SkipRecord>,
    pub skip_reasons: BTreeMap<String, usize>,
    pub guard: GuardReport,
    pub guard_failed: bool,
    pub normalizers: Vec<NormalizerSummary>,
    pub timings: PhaseTimings,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub write_failures: Vec<WriteFailure>,
}

/// See module docs. All dependencies are injected.
pub struct IngestPipeline {
    store: Arc<dyn GraphStore>,
    extractor: Box<dyn Extractor>,
    entity_types: EntityTypeNormalizer,
    relation_types: RelationshipTypeNormalizer,
    properties: PropertyNormalizer,
    quality: QualityChecker,
    metrics: Option<MetricsStore>,
    options: IngestOptions,
}

impl IngestPipeline {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<dyn GraphStore>,
        extractor: Box<dyn Extractor>,
        entity_types: EntityTypeNormalizer,
        relation_types: RelationshipTypeNormalizer,
        properties: PropertyNormalizer,
        quality: QualityChecker,
        metrics: Option<MetricsStore>,
        options: IngestOptions,
    ) -> Self {
        Self {
            store,
            extractor,
            entity_types,
            relation_types,
            properties,
            quality,
            metrics,
            options,
        }
    }

    /// Convenience constructor resolving the extraction adapter by name.
    #[allow(clippy::too_many_arguments)]
    pub fn with_adapter(
        store: Arc<dyn GraphStore>,
        adapter: &str,
        adapter_model: Option<&str>,
        entity_types: EntityTypeNormalizer,
        relation_types: RelationshipTypeNormalizer,
        properties: PropertyNormalizer,
        quality: QualityChecker,
        metrics: Option<MetricsStore>,
        options: IngestOptions,
    ) -> Result<Self> {
        let extractor =
            create_extractor(adapter, adapter_model).context("resolving extraction adapter")?;
        Ok(Self::new(
            store,
            extractor,
            entity_types,
            relation_types,
            properties,
            quality,
            metrics,
            options,
        ))
    }

    pub async fn run(&mut self) -> Result<IngestSummary> {
        let mut timings = PhaseTimings::default();

        let collect_started = Instant::now();
        let mut collect_options = CollectOptions {
            content_root: self.options.content_root.clone(),
            locale: self.options.locale.clone(),
            include_drafts: self.options.include_drafts,
            ..CollectOptions::default()
        };
        if let Some(path) = &self.options.include_file {
            collect_options.include = read_filter_file(path).await?;
        }
        if let Some(path) = &self.options.ignore_file {
            collect_options.ignore = read_filter_file(path).await?;
        }
        let raw_documents = collect_documents(&collect_options).await?;
        timings.collect_ms = collect_started.elapsed().as_millis() as u64;
        info!(count = raw_documents.len(), "documents collected");

        let mut cache = if self.options.no_cache {
            IngestCache::disabled()
        } else {
            IngestCache::load(&self.options.cache_path).await?
        };

        let total_documents = raw_documents.len();
        let mut skipped: Vec<SkipRecord> = Vec::new();
        let mut payloads: Vec<WritePayload> = Vec::new();
        let mut processed: Vec<NormalizedDoc> = Vec::new();

        for raw in raw_documents {
            let mut doc = normalize_document(raw);

            if doc.relative_path.contains("_generated/") {
                self.skip(&mut skipped, &doc.id, "generated-path", Vec::new());
                continue;
            }

            let decision = cache.should_process(&doc, self.options.changed_only);
            if !decision.process {
                let reason = decision.reason.unwrap_or_else(|| "hash unchanged".to_string());
                self.skip(&mut skipped, &doc.id, &reason, Vec::new());
                continue;
            }

            let quality = self.quality.check(&mut doc).await?;
            for warning in &quality.warnings {
                warn!(doc_id = %doc.id, kind = %warning.kind, "{}", warning.message);
            }
            if !quality.passed {
                let errors = quality.errors.iter().map(|e| e.message.clone()).collect();
                self.skip(&mut skipped, &doc.id, "quality-fail", errors);
                continue;
            }

            let extract_started = Instant::now();
            let extraction = self.extractor.extract(&doc).await;
            timings.extract_ms += extract_started.elapsed().as_millis() as u64;
            let extraction = match extraction {
                Ok(extraction) => extraction,
                Err(err) => {
                    warn!(doc_id = %doc.id, error = %err, "extraction adapter failed");
                    self.skip(&mut skipped, &doc.id, "adapter-error", vec![err.to_string()]);
                    continue;
                }
            };

            let mut aggregation = sanitize_extraction(extraction, &self.options.sanitize);

            let started = Instant::now();
            self.entity_types.normalize_aggregation(&doc, &mut aggregation).await;
            timings.entity_types_ms += started.elapsed().as_millis() as u64;

            let started = Instant::now();
            self.relation_types.normalize_aggregation(&doc, &mut aggregation).await;
            timings.relation_types_ms += started.elapsed().as_millis() as u64;

            let started = Instant::now();
            self.properties.normalize_aggregation(&doc, &mut aggregation).await;
            timings.properties_ms += started.elapsed().as_millis() as u64;

            info!(
                doc_id = %doc.id,
                entities = aggregation.entities.len(),
                relationships = aggregation.relationships.len(),
                "document normalized"
            );
            payloads.push(build_payload(&doc, aggregation, &self.options.payload));
            processed.push(doc);
        }

        let normalizers = vec![
            self.entity_types.summary(),
            self.relation_types.summary(),
            self.properties.summary(),
        ];
        let guard_inputs: Vec<GuardInput> = normalizers.iter().map(guard_input).collect();
        let guard = evaluate_normalization_guards(&guard_inputs, &self.options.guard);
        for alert in &guard.alerts {
            match alert.severity {
                AlertSeverity::Error => error!(scope = %alert.scope, "{}", alert.message),
                AlertSeverity::Warning => warn!(scope = %alert.scope, "{}", alert.message),
            }
        }
        let guard_failed = guard.should_fail;

        let mut written = 0;
        let mut write_failures = Vec::new();
        if guard_failed {
            error!("normalization guard breached in fail mode, write phase aborted");
        } else if self.options.dry_run {
            info!("dry-run mode, write phase skipped");
        } else if !payloads.is_empty() {
            let write_started = Instant::now();
            if !self.options.skip_schema {
                self.store
                    .ensure_schema(&default_schema())
                    .await
                    .context("ensuring graph schema")?;
            }
            let writer = GraphWriter::new(self.store.clone());
            let report = writer.write_batch(&payloads).await;
            written = report.written;
            write_failures = report.failures;
            timings.write_ms = write_started.elapsed().as_millis() as u64;
            info!(written, failed = write_failures.len(), "write phase complete");

            if written > 0 {
                let failed_ids: HashSet<&str> =
                    write_failures.iter().map(|f| f.doc_id.as_str()).collect();
                let written_at = Utc::now().to_rfc3339();
                for doc in &processed {
                    if !failed_ids.contains(doc.id.as_str()) {
                        cache.update(doc, &written_at);
                    }
                }
                if let Some(path) = cache.save().await? {
                    info!(path = %path.display(), "ingest cache updated");
                }
            }
        }

        // Normalizer caches persist regardless of guard/write outcome;
        // resolved decisions are valid either way.
        self.entity_types.persist_cache().await?;
        self.relation_types.persist_cache().await?;
        self.properties.persist_cache().await?;

        let mut skip_reasons = BTreeMap::new();
        for record in &skipped {
            *skip_reasons.entry(record.reason.clone()).or_insert(0usize) += 1;
        }

        let summary = IngestSummary {
            total_documents,
            normalized: payloads.len() + skipped.len(),
            ready_for_write: payloads.len(),
            written,
            skipped,
            skip_reasons,
            guard,
            guard_failed,
            normalizers,
            timings,
            write_failures,
        };

        if let Some(metrics) = &self.metrics {
            metrics
                .append(json!({
                    "kind": "ingest",
                    "locale": self.options.locale,
                    "totalDocuments": summary.total_documents,
                    "readyForWrite": summary.ready_for_write,
                    "written": summary.written,
                    "skipped": summary.skipped.len(),
                    "skipReasons": summary.skip_reasons,
                    "guardFailed": summary.guard_failed,
                    "normalizers": summary.normalizers,
                }))
                .await
                .context("appending run telemetry")?;
        }

        Ok(summary)
    }

    fn skip(&self, skipped: &mut Vec<SkipRecord>, doc_id: &str, reason: &str, errors: Vec<String>) {
        info!(doc_id, reason, "document skipped");
        skipped.push(SkipRecord {
            doc_id: doc_id.to_string(),
            reason: reason.to_string(),
            errors,
        });
    }
}

fn guard_input(summary: &NormalizerSummary) -> GuardInput {
    GuardInput {
        domain: summary.domain.clone(),
        llm_failures: summary.llm.failures,
        fallback_count: summary.sources.fallback,
        total: summary.records.total,
        updated: summary.records.updated,
    }
}
