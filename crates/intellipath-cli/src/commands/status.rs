//! `intellipath status`

use std::process::ExitCode;

use anyhow::Result;

use intellipath_graph::{GraphSession, GraphStore, Stage};

use super::Neo4jArgs;
use crate::output;

pub async fn execute(neo4j: &Neo4jArgs) -> Result<ExitCode> {
    let store = neo4j.connect().await?;
    store.verify_connectivity().await?;

    let session = store.open_session(Stage::ConnectivityCheck).await?;
    let counts = session.counts().await?;

    output::print_counts(&counts);
    Ok(ExitCode::SUCCESS)
}
