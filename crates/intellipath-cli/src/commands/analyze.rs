//! `intellipath analyze`

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Args;

use intellipath_graph::run_analysis_only;

use super::Neo4jArgs;
use crate::output;

#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn execute(args: AnalyzeArgs, neo4j: &Neo4jArgs) -> Result<ExitCode> {
    let store = neo4j.connect().await?;
    let report = run_analysis_only(&store).await.context("Analysis aborted")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        output::print_analysis(&report);
    }
    Ok(ExitCode::SUCCESS)
}
