//! CLI command definitions and handlers.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};

use intellipath_graph::{GraphConfig, Neo4jStore};
use intellipath_source::SupabaseConfig;

pub mod analyze;
pub mod chain;
pub mod status;
pub mod sync;

/// IntelliPath - curriculum graph sync and analytics
#[derive(Parser)]
#[command(name = "intellipath")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Also write logs to this file
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    #[command(flatten)]
    pub neo4j: Neo4jArgs,

    #[command(flatten)]
    pub supabase: SupabaseArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Sync records into the graph and recompute course analytics
    Sync(sync::SyncArgs),

    /// Recompute bottlenecks and critical path depths from the graph alone
    Analyze(analyze::AnalyzeArgs),

    /// Show every course transitively required by a course
    Chain {
        /// Course code
        code: String,
    },

    /// Show node and relationship counts
    Status,
}

/// Neo4j connection settings.
#[derive(Args, Debug, Clone)]
pub struct Neo4jArgs {
    /// Bolt URI of the graph store
    #[arg(long = "neo4j-uri", env = "NEO4J_URI", global = true)]
    pub uri: Option<String>,

    #[arg(long = "neo4j-user", env = "NEO4J_USERNAME", default_value = "neo4j", global = true)]
    pub user: String,

    #[arg(long = "neo4j-password", env = "NEO4J_PASSWORD", hide_env_values = true, global = true)]
    pub password: Option<String>,

    #[arg(long = "neo4j-database", env = "NEO4J_DATABASE", default_value = "neo4j", global = true)]
    pub database: String,
}

impl Neo4jArgs {
    pub fn missing(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if is_blank(&self.uri) {
            missing.push("NEO4J_URI");
        }
        if is_blank(&self.password) {
            missing.push("NEO4J_PASSWORD");
        }
        missing
    }

    pub fn config(&self) -> GraphConfig {
        GraphConfig {
            uri: self.uri.clone().unwrap_or_default(),
            user: self.user.clone(),
            password: self.password.clone().unwrap_or_default(),
            database: self.database.clone(),
            ..GraphConfig::default()
        }
    }

    /// Validate and connect.
    pub async fn connect(&self) -> Result<Neo4jStore> {
        require(self.missing())?;
        let config = self.config();
        Neo4jStore::connect(&config)
            .await
            .with_context(|| format!("Failed to connect to Neo4j at {}", config.uri))
    }
}

/// Supabase (PostgREST) settings.
#[derive(Args, Debug, Clone)]
pub struct SupabaseArgs {
    /// Project URL; falls back to VITE_SUPABASE_URL
    #[arg(long = "supabase-url", env = "SUPABASE_URL", global = true)]
    pub url: Option<String>,

    #[arg(
        long = "supabase-key",
        env = "SUPABASE_SERVICE_ROLE_KEY",
        hide_env_values = true,
        global = true
    )]
    pub service_key: Option<String>,
}

impl SupabaseArgs {
    fn url(&self) -> Option<String> {
        self.url
            .clone()
            .or_else(|| std::env::var("VITE_SUPABASE_URL").ok())
            .filter(|u| !u.trim().is_empty())
    }

    pub fn missing(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.url().is_none() {
            missing.push("SUPABASE_URL");
        }
        if is_blank(&self.service_key) {
            missing.push("SUPABASE_SERVICE_ROLE_KEY");
        }
        missing
    }

    pub fn config(&self) -> SupabaseConfig {
        SupabaseConfig {
            url: self.url().unwrap_or_default(),
            service_key: self.service_key.clone().unwrap_or_default(),
        }
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}

/// Fail with every missing variable listed at once.
pub fn require(missing: Vec<&'static str>) -> Result<()> {
    if !missing.is_empty() {
        bail!("Missing required configuration: {}", missing.join(", "));
    }
    Ok(())
}

impl Cli {
    /// Whether the command prints a machine-readable report on stdout.
    pub fn json_output(&self) -> bool {
        match &self.command {
            Commands::Sync(args) => args.json,
            Commands::Analyze(args) => args.json,
            Commands::Chain { .. } | Commands::Status => false,
        }
    }

    pub async fn execute(self) -> Result<ExitCode> {
        match self.command {
            Commands::Sync(args) => sync::execute(args, &self.neo4j, &self.supabase).await,
            Commands::Analyze(args) => analyze::execute(args, &self.neo4j).await,
            Commands::Chain { code } => chain::execute(&code, &self.neo4j).await,
            Commands::Status => status::execute(&self.neo4j).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_sync_flags() {
        let cli = Cli::try_parse_from([
            "intellipath",
            "sync",
            "--clear",
            "--batch-size",
            "25",
            "--snapshot",
            "records.json",
        ])
        .unwrap();

        match cli.command {
            Commands::Sync(args) => {
                assert!(args.clear);
                assert_eq!(args.batch_size, 25);
                assert_eq!(args.snapshot, Some(PathBuf::from("records.json")));
            }
            _ => panic!("expected sync"),
        }
    }

    #[test]
    fn test_json_flag_selects_machine_output() {
        let parse = |args: &[&str]| Cli::try_parse_from(args).unwrap().json_output();

        assert!(parse(&["intellipath", "sync", "--json"]));
        assert!(parse(&["intellipath", "analyze", "--json"]));
        assert!(!parse(&["intellipath", "sync"]));
        assert!(!parse(&["intellipath", "status"]));
        assert!(!parse(&["intellipath", "chain", "CS301"]));
    }

    #[test]
    fn test_missing_credentials_reported_together() {
        let neo4j = Neo4jArgs {
            uri: None,
            user: "neo4j".to_string(),
            password: Some("  ".to_string()),
            database: "neo4j".to_string(),
        };
        let supabase = SupabaseArgs {
            url: Some("https://example.supabase.co".to_string()),
            service_key: None,
        };

        let mut missing = neo4j.missing();
        missing.extend(supabase.missing());
        let err = require(missing).unwrap_err().to_string();

        assert_eq!(
            err,
            "Missing required configuration: NEO4J_URI, NEO4J_PASSWORD, SUPABASE_SERVICE_ROLE_KEY"
        );
    }

    #[test]
    fn test_graph_config_from_args() {
        let neo4j = Neo4jArgs {
            uri: Some("neo4j+s://graph.example.com".to_string()),
            user: "reader".to_string(),
            password: Some("secret".to_string()),
            database: "curriculum".to_string(),
        };
        let config = neo4j.config();
        assert_eq!(config.uri, "neo4j+s://graph.example.com");
        assert_eq!(config.database, "curriculum");
        assert_eq!(config.max_connections, GraphConfig::default().max_connections);
    }
}
