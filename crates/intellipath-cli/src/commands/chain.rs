//! `intellipath chain <CODE>`

use std::process::ExitCode;

use anyhow::{bail, Result};

use intellipath_graph::{load_requires_graph, GraphStore, Stage};

use super::Neo4jArgs;
use crate::output;

pub async fn execute(code: &str, neo4j: &Neo4jArgs) -> Result<ExitCode> {
    let store = neo4j.connect().await?;
    store.verify_connectivity().await?;

    let session = store.open_session(Stage::Analyze).await?;
    let graph = load_requires_graph(&session).await?;
    drop(session);

    if !graph.contains(code) {
        bail!("Course '{}' not found in the graph", code);
    }

    output::print_chain(code, &graph.prerequisite_chain(code));
    Ok(ExitCode::SUCCESS)
}
