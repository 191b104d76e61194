//! `intellipath sync`

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use intellipath_graph::{run_sync, GraphStore, MemoryStore, SyncOptions};
use intellipath_source::{RecordSource, SnapshotSource, SupabaseSource};

use super::{require, Neo4jArgs, SupabaseArgs};
use crate::output;

#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Delete every node and relationship before syncing
    #[arg(long)]
    pub clear: bool,

    /// Upserts in flight per stage
    #[arg(long, env = "SYNC_BATCH_SIZE", default_value_t = 100)]
    pub batch_size: usize,

    /// Read records from a JSON snapshot instead of Supabase
    #[arg(long)]
    pub snapshot: Option<PathBuf>,

    /// Sync into an in-memory graph; Neo4j is not contacted
    #[arg(long)]
    pub dry_run: bool,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn execute(args: SyncArgs, neo4j: &Neo4jArgs, supabase: &SupabaseArgs) -> Result<ExitCode> {
    let mut missing = Vec::new();
    if !args.dry_run {
        missing.extend(neo4j.missing());
    }
    if args.snapshot.is_none() {
        missing.extend(supabase.missing());
    }
    require(missing)?;

    let source: Box<dyn RecordSource> = match &args.snapshot {
        Some(path) => Box::new(
            SnapshotSource::load(path)
                .await
                .with_context(|| format!("Failed to load snapshot {}", path.display()))?,
        ),
        None => Box::new(SupabaseSource::new(&supabase.config()).context("Failed to build Supabase client")?),
    };

    let options = SyncOptions {
        clear_existing: args.clear,
        batch_size: args.batch_size,
    };

    if args.dry_run {
        let store = MemoryStore::new();
        sync_into(&store, source.as_ref(), &options, args.json).await
    } else {
        let store = neo4j.connect().await?;
        sync_into(&store, source.as_ref(), &options, args.json).await
    }
}

async fn sync_into<G: GraphStore>(
    store: &G,
    source: &dyn RecordSource,
    options: &SyncOptions,
    json: bool,
) -> Result<ExitCode> {
    if !json {
        println!("{}", "Syncing academic records to the graph...".bold());
    }

    let report = run_sync(store, source, options).await.context("Graph sync aborted")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        output::print_sync_report(&report);
    }

    Ok(if report.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
