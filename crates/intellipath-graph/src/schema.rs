//! Neo4j schema initialization (constraints and indexes).

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::store::GraphSession;

/// One named, idempotent schema statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemaStatement {
    pub name: &'static str,
    pub cypher: &'static str,
}

/// Cypher statements for schema initialization.
pub const SCHEMA_STATEMENTS: &[SchemaStatement] = &[
    // Uniqueness constraints on natural keys
    SchemaStatement {
        name: "course_code",
        cypher: "CREATE CONSTRAINT course_code IF NOT EXISTS FOR (c:Course) REQUIRE c.code IS UNIQUE",
    },
    SchemaStatement {
        name: "major_name",
        cypher: "CREATE CONSTRAINT major_name IF NOT EXISTS FOR (m:Major) REQUIRE m.name IS UNIQUE",
    },
    SchemaStatement {
        name: "skill_name",
        cypher: "CREATE CONSTRAINT skill_name IF NOT EXISTS FOR (s:Skill) REQUIRE s.name IS UNIQUE",
    },
    SchemaStatement {
        name: "career_name",
        cypher: "CREATE CONSTRAINT career_name IF NOT EXISTS FOR (cp:CareerPath) REQUIRE cp.name IS UNIQUE",
    },
    // Lookup indexes
    SchemaStatement {
        name: "course_department",
        cypher: "CREATE INDEX course_department IF NOT EXISTS FOR (c:Course) ON (c.department)",
    },
    SchemaStatement {
        name: "course_year",
        cypher: "CREATE INDEX course_year IF NOT EXISTS FOR (c:Course) ON (c.year_level)",
    },
    // Full-text search index
    SchemaStatement {
        name: "course_search",
        cypher: "CREATE FULLTEXT INDEX course_search IF NOT EXISTS FOR (c:Course) ON EACH [c.name, c.name_ar, c.description_ar]",
    },
];

/// Outcome of a schema pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SchemaReport {
    pub applied: usize,
    pub already_present: usize,
    pub warnings: Vec<String>,
}

/// Ensure every constraint and index exists.
///
/// Never fails: an "already exists" response is counted and logged at debug,
/// anything else becomes a warning and the remaining statements still run.
pub async fn ensure_schema<S: GraphSession + ?Sized>(session: &S) -> SchemaReport {
    info!("Setting up graph constraints and indexes");
    let mut report = SchemaReport::default();

    for statement in SCHEMA_STATEMENTS {
        match session.apply_schema(statement).await {
            Ok(()) => report.applied += 1,
            Err(e) if e.is_already_exists() => {
                debug!(name = statement.name, "Schema element already exists");
                report.already_present += 1;
            }
            Err(e) => {
                warn!(name = statement.name, error = %e, "Schema warning");
                report.warnings.push(format!("{}: {}", statement.name, e));
            }
        }
    }

    info!(
        applied = report.applied,
        already_present = report.already_present,
        warnings = report.warnings.len(),
        "Graph schema ready"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use crate::pipeline::Stage;
    use crate::store::GraphStore;

    #[tokio::test]
    async fn test_schema_is_idempotent() {
        let store = MemoryStore::new();
        let session = store.open_session(Stage::SchemaSetup).await.unwrap();

        let first = ensure_schema(&session).await;
        let second = ensure_schema(&session).await;

        assert_eq!(first.applied, SCHEMA_STATEMENTS.len());
        assert_eq!(first, second);
        assert_eq!(store.schema_elements().await.len(), SCHEMA_STATEMENTS.len());
    }

    #[tokio::test]
    async fn test_failures_do_not_stop_remaining_statements() {
        let store = MemoryStore::new()
            .with_schema_error("course_code", "An equivalent constraint already exists")
            .with_schema_error("course_year", "Unsupported index provider");
        let session = store.open_session(Stage::SchemaSetup).await.unwrap();

        let report = ensure_schema(&session).await;

        assert_eq!(report.already_present, 1);
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].starts_with("course_year"));
        assert_eq!(report.applied, SCHEMA_STATEMENTS.len() - 2);
    }
}
