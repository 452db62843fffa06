//! `graphloom schema`

use crate::context;
use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use graphloom_core::traits::GraphStore;
use graphloom_graph::default_schema;
use std::path::Path;
use tracing::info;

#[derive(Debug, Args)]
pub struct SchemaArgs {
    #[command(subcommand)]
    action: SchemaAction,
}

#[derive(Debug, Subcommand)]
enum SchemaAction {
    /// Apply constraints and indexes (idempotent).
    Ensure,
    /// Drop all schema objects and managed nodes.
    Reset,
}

pub async fn run(store_path: &Path, args: &SchemaArgs) -> Result<bool> {
    let store = context::open_store(store_path, true)?;
    let schema = default_schema();
    match args.action {
        SchemaAction::Ensure => {
            store.ensure_schema(&schema).await?;
            info!(
                constraints = schema.constraints.len(),
                indexes = schema.indexes.len(),
                "schema ensured"
            );
        }
        SchemaAction::Reset => {
            store.reset_schema(&schema).await?;
            info!("schema and managed nodes dropped");
        }
    }
    store
        .save_snapshot(store_path)
        .with_context(|| format!("saving graph snapshot {}", store_path.display()))?;
    Ok(true)
}
