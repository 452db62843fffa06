//! `graphloom retrieve`

use crate::context;
use anyhow::{bail, Context, Result};
use clap::Args;
use graphloom_retrieval::hybrid::HybridParams;
use graphloom_retrieval::path::PathParams;
use graphloom_retrieval::subgraph::SubgraphParams;
use graphloom_retrieval::topn::TopNParams;
use graphloom_retrieval::{
    fetch_shortest_path, fetch_subgraph, fetch_top_n, search_hybrid, IndexCache, VectorIndexConfig,
};
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::io::AsyncReadExt;
use tracing::info;

#[derive(Debug, Args)]
pub struct RetrieveArgs {
    /// Query shape: subgraph, path, topn, or hybrid.
    #[arg(long)]
    mode: String,

    /// JSON payload file, or `-` for stdin.
    #[arg(long, default_value = "-")]
    input: String,

    /// Write the result here instead of stdout.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Hop bound for subgraph/path queries.
    #[arg(long)]
    max_hops: Option<usize>,

    /// Result limit.
    #[arg(long)]
    limit: Option<usize>,

    /// Node-label allowlist for subgraph queries (repeatable).
    #[arg(long = "include-label")]
    include_labels: Vec<String>,

    /// Hybrid signal sources (repeatable; vector / structure).
    #[arg(long = "hybrid-source")]
    hybrid_sources: Vec<String>,

    /// Hybrid blend weights (repeatable; vector then structure).
    #[arg(long = "hybrid-alpha")]
    hybrid_alpha: Vec<f64>,

    /// Vector index name for hybrid queries.
    #[arg(long)]
    vector_index: Option<String>,

    /// Pretty-print the JSON result.
    #[arg(long)]
    pretty: bool,
}

/// Request payload fields, all optional; CLI flags override.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RequestPayload {
    doc_id: Option<String>,
    entity_names: Vec<String>,
    allowed_labels: Vec<String>,
    allowed_relations: Vec<String>,
    max_hops: Option<usize>,
    node_limit: Option<usize>,
    edge_limit: Option<usize>,
    limit: Option<usize>,
    source_entity: Option<String>,
    target_entity: Option<String>,
    max_length: Option<usize>,
    category: Option<String>,
    language: Option<String>,
    question: Option<String>,
    embedding: Option<Vec<f32>>,
    sources: Vec<String>,
    alpha: Vec<f64>,
    vector_index: Option<String>,
}

async fn read_payload(input: &str) -> Result<RequestPayload> {
    let raw = if input == "-" {
        let mut buffer = String::new();
        tokio::io::stdin()
            .read_to_string(&mut buffer)
            .await
            .context("reading request payload from stdin")?;
        buffer
    } else {
        tokio::fs::read_to_string(input)
            .await
            .with_context(|| format!("reading request payload {input}"))?
    };
    if raw.trim().is_empty() {
        return Ok(RequestPayload::default());
    }
    serde_json::from_str(&raw).context("request payload is not valid JSON")
}

pub async fn run(store_path: &Path, data_root: &Path, args: &RetrieveArgs) -> Result<bool> {
    let payload = read_payload(&args.input).await?;
    let store = context::open_store(store_path, false)?;

    let result: Value = match args.mode.as_str() {
        "subgraph" => {
            let params = SubgraphParams {
                doc_id: payload.doc_id.clone().unwrap_or_default(),
                entity_names: payload.entity_names.clone(),
                allowed_labels: if args.include_labels.is_empty() {
                    payload.allowed_labels.clone()
                } else {
                    args.include_labels.clone()
                },
                allowed_relations: payload.allowed_relations.clone(),
                max_hops: args.max_hops.or(payload.max_hops),
                node_limit: args.limit.or(payload.node_limit),
                edge_limit: payload.edge_limit,
            };
            serde_json::to_value(fetch_subgraph(store.as_ref(), &params).await?)?
        }
        "path" => {
            let params = PathParams {
                source_entity: payload.source_entity.clone().unwrap_or_default(),
                target_entity: payload.target_entity.clone().unwrap_or_default(),
                max_length: args.max_hops.or(payload.max_length),
            };
            serde_json::to_value(fetch_shortest_path(store.as_ref(), &params).await?)?
        }
        "topn" => {
            let params = TopNParams {
                entity_names: payload.entity_names.clone(),
                category: payload.category.clone(),
                language: payload.language.clone(),
                limit: args.limit.or(payload.limit),
            };
            serde_json::to_value(fetch_top_n(store.as_ref(), &params).await?)?
        }
        "hybrid" => {
            let config =
                VectorIndexConfig::load(&data_root.join(graphloom_retrieval::index::DEFAULT_CONFIG_FILE))
                    .await?;
            let mut cache = IndexCache::new(config);
            let index_name = args
                .vector_index
                .clone()
                .or(payload.vector_index.clone())
                .unwrap_or_else(|| cache.default_index_name().to_string());
            let index = cache.get(&index_name).await?.clone();
            let embedder = context::build_embedder();
            let params = HybridParams {
                question: payload.question.clone(),
                embedding: payload.embedding.clone(),
                limit: args.limit.or(payload.limit),
                sources: if args.hybrid_sources.is_empty() {
                    payload.sources.clone()
                } else {
                    args.hybrid_sources.clone()
                },
                alpha: if args.hybrid_alpha.is_empty() {
                    payload.alpha.clone()
                } else {
                    args.hybrid_alpha.clone()
                },
            };
            serde_json::to_value(
                search_hybrid(store.as_ref(), embedder.as_ref(), &index, &params).await?,
            )?
        }
        other => bail!("unknown mode: {other} (expected subgraph, path, topn, or hybrid)"),
    };

    let serialized = if args.pretty {
        serde_json::to_string_pretty(&result)?
    } else {
        serde_json::to_string(&result)?
    };
    match &args.output {
        Some(path) => {
            tokio::fs::write(path, format!("{serialized}\n"))
                .await
                .with_context(|| format!("writing result to {}", path.display()))?;
        }
        None => println!("{serialized}"),
    }

    info!(mode = %args.mode, "retrieval complete");
    Ok(true)
}
