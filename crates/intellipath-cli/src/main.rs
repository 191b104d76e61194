//! IntelliPath CLI
//!
//! Syncs academic records into the curriculum graph and reports on it.

use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod output;

use commands::Cli;

/// Initialize tracing, optionally mirrored to a log file.
///
/// With `json_output` the console logs go to stderr without ANSI codes, so
/// stdout carries nothing but the JSON document.
///
/// The returned guard flushes the file writer on drop and must live until exit.
fn init_tracing(log_file: Option<&Path>, verbose: bool, json_output: bool) -> Result<Option<WorkerGuard>> {
    let default_filter = if verbose {
        "intellipath=debug,intellipath_graph=debug,intellipath_source=debug"
    } else {
        "intellipath=info,intellipath_graph=info"
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    let console = if json_output {
        tracing_subscriber::fmt::layer()
            .with_writer(BoxMakeWriter::new(std::io::stderr))
            .with_ansi(false)
    } else {
        tracing_subscriber::fmt::layer().with_writer(BoxMakeWriter::new(std::io::stdout))
    };

    let Some(path) = log_file else {
        tracing_subscriber::registry().with(env_filter).with(console).init();
        return Ok(None);
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
    let file_name = path
        .file_name()
        .with_context(|| format!("Invalid log file path {}", path.display()))?;

    let appender = tracing_appender::rolling::never(dir, file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    // Log to both the console and file
    tracing_subscriber::registry()
        .with(env_filter)
        .with(console)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false),
        )
        .init();
    Ok(Some(guard))
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Credentials may come from a local .env; a missing file is fine.
    let _ = dotenv::dotenv();

    let cli = Cli::parse();
    let _guard = init_tracing(cli.log_file.as_deref(), cli.verbose, cli.json_output())?;

    cli.execute().await
}
