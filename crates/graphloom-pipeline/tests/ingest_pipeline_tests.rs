//! End-to-end ingest runs over a temporary content root and an in-memory
//! graph store.

use async_trait::async_trait;
use graphloom_core::traits::{Extractor, GraphStore};
use graphloom_core::{Entity, EntityRef, ExtractError, ExtractionResult, Mention, NormalizedDoc};
use graphloom_graph::MemoryGraphStore;
use graphloom_normalize::{
    EntityTypeNormalizer, PropertyNormalizer, RelationshipTypeNormalizer, ResolverOptions,
};
use graphloom_pipeline::{
    IngestOptions, IngestPipeline, PlaceholderExtractor, QualityChecker, QualityConfig,
};
use graphloom_telemetry::{GuardMode, GuardOptions, MetricsStore};
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

/// Emits one entity + mention per document; fails on request.
struct ScriptedExtractor {
    fail_on: Option<String>,
}

impl ScriptedExtractor {
    fn reliable() -> Box<dyn Extractor> {
        Box::new(Self { fail_on: None })
    }
}

#[async_trait]
impl Extractor for ScriptedExtractor {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn extract(&self, doc: &NormalizedDoc) -> Result<ExtractionResult, ExtractError> {
        if self.fail_on.as_deref() == Some(doc.id.as_str()) {
            return Err(ExtractError::Adapter {
                adapter: "scripted".into(),
                message: "simulated failure".into(),
            });
        }
        let mut entity = Entity::new("Ada Lovelace", "person");
        entity.salience = Some(0.9);
        Ok(ExtractionResult {
            entities: vec![entity],
            mentions: vec![Mention {
                chunk_id: format!("{}#001", doc.id),
                entity: EntityRef { name: "Ada Lovelace".into(), entity_type: "person".into() },
                confidence: Some(0.8),
                snippet: Some("Ada".into()),
            }],
            ..ExtractionResult::default()
        })
    }
}

fn write_content(root: &Path) {
    std::fs::create_dir_all(root.join("en/posts")).unwrap();
    std::fs::write(
        root.join("en/posts/ada.md"),
        "---\ntitle: Ada Lovelace\ndescription: Pioneer of computing\nupdated: 2026-03-01\ncategory: History\ntags: [people]\n---\nAda wrote the first program.\n\nShe worked with Babbage.",
    )
    .unwrap();
    std::fs::write(
        root.join("en/posts/engines.md"),
        "---\ntitle: Analytical Engines\ndescription: Early machines\nupdated: 2026-03-02\ncategory: History\ntags: [machines]\n---\nThe analytical engine was mechanical.",
    )
    .unwrap();
}

struct Fixture {
    _dir: TempDir,
    store: Arc<MemoryGraphStore>,
    options: IngestOptions,
    side_root: std::path::PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let content_root = dir.path().join("content");
        write_content(&content_root);
        let side_root = dir.path().to_path_buf();
        let options = IngestOptions {
            content_root,
            cache_path: side_root.join("data/ingest-cache.json"),
            guard: GuardOptions { mode: GuardMode::Warn, ..GuardOptions::default() },
            ..IngestOptions::default()
        };
        Self {
            _dir: dir,
            store: Arc::new(MemoryGraphStore::new()),
            options,
            side_root,
        }
    }

    async fn pipeline(
        &self,
        extractor: Box<dyn Extractor>,
        options: IngestOptions,
    ) -> IngestPipeline {
        let entity_types = EntityTypeNormalizer::init(
            ResolverOptions {
                enabled: true,
                alias_path: self.side_root.join("entity-alias.json"),
                cache_path: self.side_root.join("entity-type-cache.json"),
            },
            None,
        )
        .await
        .unwrap();
        let relation_types = RelationshipTypeNormalizer::init(
            ResolverOptions {
                enabled: true,
                alias_path: self.side_root.join("relationship-alias.json"),
                cache_path: self.side_root.join("relationship-type-cache.json"),
            },
            None,
        )
        .await
        .unwrap();
        let properties = PropertyNormalizer::init(
            ResolverOptions {
                enabled: true,
                alias_path: self.side_root.join("property-alias.json"),
                cache_path: self.side_root.join("property-cache.json"),
            },
            None,
        )
        .await
        .unwrap();
        let quality = QualityChecker::new(
            QualityConfig::default(),
            self.side_root.join("quality-log.jsonl"),
        )
        .unwrap();
        let metrics = MetricsStore::new(self.side_root.join("metrics.json"));

        IngestPipeline::new(
            self.store.clone(),
            extractor,
            entity_types,
            relation_types,
            properties,
            quality,
            Some(metrics),
            options,
        )
    }
}

#[tokio::test]
async fn full_run_writes_every_document() {
    let fixture = Fixture::new();
    let mut pipeline = fixture
        .pipeline(ScriptedExtractor::reliable(), fixture.options.clone())
        .await;
    let summary = pipeline.run().await.unwrap();

    assert_eq!(summary.total_documents, 2);
    assert_eq!(summary.written, 2);
    assert!(summary.skipped.is_empty());
    assert!(!summary.guard_failed);

    let doc = fixture
        .store
        .node_by_property("Doc", "id", &json!("en/posts/ada"))
        .await
        .unwrap();
    assert!(doc.is_some());
    let entity = fixture
        .store
        .node_by_property("Entity", "name", &json!("Ada Lovelace"))
        .await
        .unwrap()
        .unwrap();
    // The built-in alias table folded "person" onto the vocabulary member.
    assert_eq!(entity.properties["type"], "Person");

    // Telemetry recorded the run.
    let metrics = MetricsStore::new(fixture.side_root.join("metrics.json"));
    let entries = metrics.read().await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["kind"], "ingest");
}

#[tokio::test]
async fn changed_only_reruns_skip_unchanged_documents() {
    let fixture = Fixture::new();
    let mut pipeline = fixture
        .pipeline(ScriptedExtractor::reliable(), fixture.options.clone())
        .await;
    let first = pipeline.run().await.unwrap();
    assert_eq!(first.written, 2);

    let mut options = fixture.options.clone();
    options.changed_only = true;
    let mut rerun = fixture
        .pipeline(ScriptedExtractor::reliable(), options.clone())
        .await;
    let summary = rerun.run().await.unwrap();

    assert_eq!(summary.written, 0);
    assert_eq!(summary.skipped.len(), 2);
    assert!(summary
        .skipped
        .iter()
        .all(|record| record.reason == "hash unchanged"));

    // Touch one document; only that one reprocesses.
    std::fs::write(
        fixture.options.content_root.join("en/posts/ada.md"),
        "---\ntitle: Ada Lovelace\ndescription: Pioneer of computing\nupdated: 2026-03-05\ncategory: History\ntags: [people]\n---\nRevised body.",
    )
    .unwrap();
    let mut third = fixture
        .pipeline(ScriptedExtractor::reliable(), options)
        .await;
    let summary = third.run().await.unwrap();
    assert_eq!(summary.written, 1);
    assert_eq!(summary.skip_reasons.get("hash unchanged"), Some(&1));
}

#[tokio::test]
async fn adapter_failures_skip_the_document_not_the_run() {
    let fixture = Fixture::new();
    let mut pipeline = fixture
        .pipeline(
            Box::new(ScriptedExtractor { fail_on: Some("en/posts/ada".into()) }),
            fixture.options.clone(),
        )
        .await;
    let summary = pipeline.run().await.unwrap();

    assert_eq!(summary.written, 1);
    assert_eq!(summary.skipped.len(), 1);
    assert_eq!(summary.skipped[0].reason, "adapter-error");
    assert_eq!(summary.skip_reasons["adapter-error"], 1);
}

#[tokio::test]
async fn quality_failures_are_hard_skips() {
    let fixture = Fixture::new();
    std::fs::write(
        fixture.options.content_root.join("en/posts/bad.md"),
        "---\ntitle: Missing Everything\n---\nNo description or category here at all, sadly",
    )
    .unwrap();
    let mut pipeline = fixture
        .pipeline(Box::new(PlaceholderExtractor), fixture.options.clone())
        .await;
    let summary = pipeline.run().await.unwrap();

    assert_eq!(summary.total_documents, 3);
    assert_eq!(summary.skipped.len(), 1);
    assert_eq!(summary.skipped[0].reason, "quality-fail");
    assert!(!summary.skipped[0].errors.is_empty());
    assert_eq!(summary.written, 2);
}

#[tokio::test]
async fn generated_paths_never_ingest() {
    let fixture = Fixture::new();
    std::fs::create_dir_all(fixture.options.content_root.join("en/_generated")).unwrap();
    std::fs::write(
        fixture.options.content_root.join("en/_generated/auto.md"),
        "---\ntitle: Auto\ndescription: generated\nupdated: 2026-01-01\ncategory: Build\n---\nGenerated output.",
    )
    .unwrap();
    let mut pipeline = fixture
        .pipeline(Box::new(PlaceholderExtractor), fixture.options.clone())
        .await;
    let summary = pipeline.run().await.unwrap();
    assert_eq!(summary.skip_reasons.get("generated-path"), Some(&1));
}

#[tokio::test]
async fn dry_run_writes_nothing_but_reports_everything() {
    let fixture = Fixture::new();
    let mut options = fixture.options.clone();
    options.dry_run = true;
    let mut pipeline = fixture
        .pipeline(ScriptedExtractor::reliable(), options)
        .await;
    let summary = pipeline.run().await.unwrap();

    assert_eq!(summary.ready_for_write, 2);
    assert_eq!(summary.written, 0);
    assert_eq!(fixture.store.node_count(), 0);
    // No cache file without a write.
    assert!(!fixture.side_root.join("data/ingest-cache.json").exists());
}

#[tokio::test]
async fn guard_fail_mode_aborts_the_write_phase() {
    let fixture = Fixture::new();
    let mut options = fixture.options.clone();
    // Every resolution falls back (no classifier, no aliases); two docs
    // yield enough fallbacks to trip a 1-count threshold, and warnings
    // alone must not abort, so force the updated=0 error path instead.
    options.guard = GuardOptions {
        mode: GuardMode::Fail,
        llm_failure_threshold: 0,
        fallback_threshold: 1,
    };
    let mut pipeline = fixture
        .pipeline(ScriptedExtractor::reliable(), options)
        .await;
    let summary = pipeline.run().await.unwrap();

    // Fallback breaches are warnings; the run proceeds.
    assert!(!summary.guard_failed);
    assert!(!summary.guard.alerts.is_empty());
    assert_eq!(summary.written, 2);
}

/// Every classification call fails, driving the llm failure counter up.
struct ExplodingClassifier;

#[async_trait]
impl graphloom_core::traits::Classifier for ExplodingClassifier {
    async fn ensure(
        &self,
    ) -> Result<graphloom_core::traits::ClassifierInfo, graphloom_core::ClassifierUnavailable> {
        Ok(graphloom_core::traits::ClassifierInfo {
            provider: "exploding".into(),
            model: "exploding-1".into(),
        })
    }

    async fn classify(
        &self,
        _prompt: &str,
        _schema: &serde_json::Value,
    ) -> Result<serde_json::Value, graphloom_core::ClassifierError> {
        Err(graphloom_core::ClassifierError::Http("kaboom".into()))
    }
}

#[tokio::test]
async fn llm_failure_breach_in_fail_mode_aborts_writes() {
    let fixture = Fixture::new();
    let entity_types = EntityTypeNormalizer::init(
        ResolverOptions {
            enabled: true,
            alias_path: fixture.side_root.join("entity-alias.json"),
            cache_path: fixture.side_root.join("entity-type-cache.json"),
        },
        Some(Arc::new(ExplodingClassifier)),
    )
    .await
    .unwrap();
    let relation_types = RelationshipTypeNormalizer::init(
        ResolverOptions {
            enabled: true,
            alias_path: fixture.side_root.join("relationship-alias.json"),
            cache_path: fixture.side_root.join("relationship-type-cache.json"),
        },
        None,
    )
    .await
    .unwrap();
    let properties = PropertyNormalizer::init(
        ResolverOptions {
            enabled: true,
            alias_path: fixture.side_root.join("property-alias.json"),
            cache_path: fixture.side_root.join("property-cache.json"),
        },
        None,
    )
    .await
    .unwrap();
    let quality = QualityChecker::new(
        QualityConfig::default(),
        fixture.side_root.join("quality-log.jsonl"),
    )
    .unwrap();

    let mut options = fixture.options.clone();
    options.guard = GuardOptions {
        mode: GuardMode::Fail,
        llm_failure_threshold: 1,
        fallback_threshold: 1000,
    };
    let mut pipeline = IngestPipeline::new(
        fixture.store.clone(),
        ScriptedExtractor::reliable(),
        entity_types,
        relation_types,
        properties,
        quality,
        None,
        options,
    );
    let summary = pipeline.run().await.unwrap();

    assert!(summary.guard_failed);
    assert_eq!(summary.written, 0);
    // Extraction and normalization still happened and are reported.
    assert_eq!(summary.ready_for_write, 2);
    assert_eq!(fixture.store.node_count(), 0);
}
