//! `graphloom export` — dump a document's subgraph as JSON for external
//! rendering tools. Diagram generation stays out of the retrieval crate;
//! renderers consume this output.

use crate::context;
use anyhow::{Context, Result};
use clap::Args;
use graphloom_retrieval::fetch_subgraph;
use graphloom_retrieval::subgraph::SubgraphParams;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Args)]
pub struct ExportArgs {
    /// Document id to export.
    #[arg(long)]
    doc_id: String,

    /// Hop bound around the document.
    #[arg(long)]
    max_hops: Option<usize>,

    /// Node limit.
    #[arg(long)]
    node_limit: Option<usize>,

    /// Output file; stdout when omitted.
    #[arg(long)]
    output: Option<PathBuf>,
}

pub async fn run(store_path: &Path, args: &ExportArgs) -> Result<bool> {
    let store = context::open_store(store_path, false)?;
    let params = SubgraphParams {
        doc_id: args.doc_id.clone(),
        max_hops: args.max_hops,
        node_limit: args.node_limit,
        ..SubgraphParams::default()
    };
    let subgraph = fetch_subgraph(store.as_ref(), &params).await?;
    if subgraph.stats.nodes.truncated || subgraph.stats.edges.truncated {
        tracing::warn!(
            nodes_total = subgraph.stats.nodes.total,
            nodes_returned = subgraph.stats.nodes.returned,
            "export is truncated, raise --node-limit for the full neighborhood"
        );
    }

    let serialized = serde_json::to_string_pretty(&subgraph)?;
    match &args.output {
        Some(path) => {
            tokio::fs::write(path, format!("{serialized}\n"))
                .await
                .with_context(|| format!("writing export to {}", path.display()))?;
            info!(path = %path.display(), "subgraph exported");
        }
        None => println!("{serialized}"),
    }
    Ok(true)
}
