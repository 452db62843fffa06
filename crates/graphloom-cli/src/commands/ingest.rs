//! `graphloom ingest`

use crate::context;
use anyhow::{Context, Result};
use clap::Args;
use graphloom_pipeline::{
    IngestOptions, IngestPipeline, PayloadOptions, QualityChecker, SanitizeLimits,
};
use graphloom_telemetry::{GuardMode, GuardOptions, MetricsStore};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Args)]
pub struct IngestArgs {
    /// Directory containing the markdown documents.
    #[arg(long, default_value = "content")]
    content_root: PathBuf,

    /// Restrict collection to one locale (first path segment).
    #[arg(long)]
    locale: Option<String>,

    /// Extraction adapter name.
    #[arg(long, env = "GRAPHLOOM_ENTITY_ADAPTER", default_value = "placeholder")]
    adapter: String,

    /// Model override for adapters that load one.
    #[arg(long, env = "GRAPHLOOM_ENTITY_MODEL")]
    adapter_model: Option<String>,

    /// File listing relative paths to include (one per line).
    #[arg(long)]
    include_file: Option<PathBuf>,

    /// File listing relative paths to ignore (one per line).
    #[arg(long)]
    ignore_file: Option<PathBuf>,

    /// Collect documents marked `draft: true`.
    #[arg(long)]
    include_drafts: bool,

    /// Skip documents whose content hash matches the ingest cache.
    #[arg(long)]
    changed_only: bool,

    /// Neither read nor update the ingest cache.
    #[arg(long)]
    no_cache: bool,

    /// Run everything except the write phase.
    #[arg(long, alias = "no-write")]
    dry_run: bool,

    /// Do not (re)apply constraints and indexes before writing.
    #[arg(long)]
    skip_schema: bool,

    /// Print the run summary as JSON on stdout.
    #[arg(long)]
    json: bool,

    /// Exclude chunk nodes from the write payloads.
    #[arg(long)]
    no_chunks: bool,

    /// Exclude mention edges from the write payloads.
    #[arg(long)]
    no_mentions: bool,

    /// Copy unmodeled scalar front-matter fields onto Doc nodes.
    #[arg(long)]
    with_frontmatter: bool,

    /// Guard mode override (off / warn / fail).
    #[arg(long, value_parser = parse_guard_mode)]
    guard_mode: Option<GuardMode>,

    /// Classifier model override for the normalizers.
    #[arg(long, env = "GRAPHLOOM_NORMALIZER_MODEL")]
    normalizer_model: Option<String>,

    /// Quality gate config file.
    #[arg(long, default_value = "config/graphloom-quality.json")]
    quality_config: PathBuf,
}

fn parse_guard_mode(raw: &str) -> Result<GuardMode, String> {
    raw.parse()
}

/// Returns `Ok(false)` (exit code 1) on guard-triggered failure; skipped
/// documents alone never fail the run.
pub async fn run(store_path: &Path, data_root: &Path, args: &IngestArgs) -> Result<bool> {
    let store = context::open_store(store_path, !args.dry_run)?;
    let classifier = context::build_classifier(args.normalizer_model.as_deref());
    let normalizers = context::build_normalizers(data_root, classifier).await?;

    let quality = QualityChecker::load(
        &args.quality_config,
        data_root.join("data/graphloom/quality-log.jsonl"),
    )
    .await?;
    let metrics = MetricsStore::new(data_root.join("data/graphloom/metrics.json"));

    let mut guard = GuardOptions::from_env();
    if let Some(mode) = args.guard_mode {
        guard.mode = mode;
    }

    let options = IngestOptions {
        content_root: args.content_root.clone(),
        locale: args.locale.clone(),
        include_drafts: args.include_drafts,
        changed_only: args.changed_only,
        no_cache: args.no_cache,
        dry_run: args.dry_run,
        skip_schema: args.skip_schema,
        include_file: args.include_file.clone(),
        ignore_file: args.ignore_file.clone(),
        cache_path: data_root.join(graphloom_pipeline::cache::DEFAULT_CACHE_FILE),
        payload: PayloadOptions {
            include_chunks: !args.no_chunks,
            include_mentions: !args.no_mentions,
            include_frontmatter: args.with_frontmatter,
        },
        sanitize: SanitizeLimits::default(),
        guard,
    };

    info!(
        adapter = %args.adapter,
        locale = args.locale.as_deref().unwrap_or("all"),
        changed_only = args.changed_only,
        dry_run = args.dry_run,
        "ingest starting"
    );

    let mut pipeline = IngestPipeline::with_adapter(
        store.clone(),
        &args.adapter,
        args.adapter_model.as_deref(),
        normalizers.entity_types,
        normalizers.relation_types,
        normalizers.properties,
        quality,
        Some(metrics),
        options,
    )?;
    let summary = pipeline.run().await?;

    if !args.dry_run && !summary.guard_failed {
        store
            .save_snapshot(store_path)
            .with_context(|| format!("saving graph snapshot {}", store_path.display()))?;
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        info!(
            collected = summary.total_documents,
            written = summary.written,
            skipped = summary.skipped.len(),
            "ingest finished"
        );
    }

    Ok(!summary.guard_failed)
}
