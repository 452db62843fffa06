//! graphloom: GraphRAG ingestion and retrieval over a property-graph
//! store.

mod commands;
mod context;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "graphloom", version, about = "GraphRAG ingestion and retrieval pipeline")]
struct Cli {
    /// Emit structured JSON log lines instead of human-readable output.
    #[arg(long, global = true)]
    log_json: bool,

    /// Graph store snapshot file.
    #[arg(
        long,
        global = true,
        env = "GRAPHLOOM_STORE_PATH",
        default_value = "data/graphloom/graph.json"
    )]
    store: PathBuf,

    /// Root directory for side-files (aliases, caches, telemetry).
    #[arg(long, global = true, env = "GRAPHLOOM_DATA_ROOT", default_value = ".")]
    data_root: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Collect, extract, normalize, and write documents into the graph.
    Ingest(commands::ingest::IngestArgs),
    /// Run a retrieval query (subgraph / path / topn / hybrid).
    Retrieve(commands::retrieve::RetrieveArgs),
    /// Ensure or reset the graph schema.
    Schema(commands::schema::SchemaArgs),
    /// Export a document's subgraph as JSON.
    Export(commands::export::ExportArgs),
}

fn init_tracing(json: bool) {
    use tracing_subscriber::EnvFilter;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .with_current_span(false)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn ingest_flags_parse() {
        let cli = Cli::parse_from([
            "graphloom",
            "ingest",
            "--content-root",
            "docs",
            "--locale",
            "zh",
            "--changed-only",
            "--dry-run",
            "--json",
        ]);
        assert!(matches!(cli.command, Command::Ingest(_)));
    }

    #[test]
    fn retrieve_collects_repeated_flags() {
        let cli = Cli::parse_from([
            "graphloom",
            "retrieve",
            "--mode",
            "hybrid",
            "--hybrid-source",
            "vector",
            "--hybrid-source",
            "structure",
            "--hybrid-alpha",
            "0.6",
            "--hybrid-alpha",
            "0.4",
        ]);
        assert!(matches!(cli.command, Command::Retrieve(_)));
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let result: Result<bool> = match &cli.command {
        Command::Ingest(args) => commands::ingest::run(&cli.store, &cli.data_root, args).await,
        Command::Retrieve(args) => commands::retrieve::run(&cli.store, &cli.data_root, args).await,
        Command::Schema(args) => commands::schema::run(&cli.store, args).await,
        Command::Export(args) => commands::export::run(&cli.store, args).await,
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            tracing::error!(error = format!("{err:#}"), "command failed");
            ExitCode::FAILURE
        }
    }
}
