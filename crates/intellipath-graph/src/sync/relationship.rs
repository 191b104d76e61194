//! Keyed edge upsert between already-synced nodes.

use tracing::{debug, error, info, warn};

use intellipath_core::RelationRecord;

use super::{group_by_key, process_groups, RecordOutcome, StageStats};
use crate::store::{EdgeMerge, GraphSession};

/// Sync all records of one relationship kind.
///
/// Must only run once every entity kind has been synced for the run.
pub async fn sync_relationships<S, R>(session: &S, records: &[R], batch_size: usize) -> StageStats
where
    S: GraphSession + ?Sized,
    R: RelationRecord,
{
    let kind = R::KIND;
    info!(%kind, records = records.len(), "Syncing relationships");

    let groups = group_by_key(records, |r| {
        r.endpoints()
            .map(|(source, target)| (source.to_string(), target.to_string()))
    });
    let stats = process_groups(groups, batch_size, |record| upsert_relationship(session, record)).await;

    info!(
        %kind,
        created = stats.created,
        updated = stats.updated,
        skipped = stats.skipped,
        missing_endpoint = stats.missing_endpoint,
        errors = stats.errors,
        "Relationships synced"
    );
    stats
}

/// Merge one edge by `(kind, source, target)`.
pub async fn upsert_relationship<S, R>(session: &S, record: &R) -> RecordOutcome
where
    S: GraphSession + ?Sized,
    R: RelationRecord,
{
    let edge = match record.to_edge() {
        Ok(Some(edge)) => edge,
        Ok(None) => {
            warn!(kind = %R::KIND, "Skipping relation row with an incomplete key pair");
            return RecordOutcome::Skipped;
        }
        Err(e) => {
            error!(kind = %R::KIND, error = %e, "Malformed relation row");
            return RecordOutcome::Failed;
        }
    };

    match session.merge_edge(&edge).await {
        Ok(EdgeMerge::Created) => {
            debug!(kind = %edge.kind, source = %edge.source, target = %edge.target, "Edge created");
            RecordOutcome::Created
        }
        Ok(EdgeMerge::Updated) => {
            debug!(kind = %edge.kind, source = %edge.source, target = %edge.target, "Edge updated");
            RecordOutcome::Updated
        }
        Ok(EdgeMerge::MissingEndpoint) => {
            warn!(kind = %edge.kind, source = %edge.source, target = %edge.target, "Missing endpoint, edge skipped");
            RecordOutcome::MissingEndpoint
        }
        Err(e) => {
            error!(kind = %edge.kind, source = %edge.source, target = %edge.target, error = %e, "Failed to merge edge");
            RecordOutcome::Failed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use intellipath_core::{
        CourseSkillRow, EdgeKind, NodeKind, NodeRecord, PrerequisiteRow, Properties, PropertyValue, RowError,
        SourceRow,
    };

    use crate::memory::MemoryStore;
    use crate::pipeline::Stage;
    use crate::store::GraphStore;

    async fn seed(store: &MemoryStore, kind: NodeKind, keys: &[&str]) {
        let session = store.open_session(Stage::EntitySync(kind)).await.unwrap();
        for key in keys {
            session
                .merge_node(&NodeRecord {
                    kind,
                    key: key.to_string(),
                    properties: Properties::new(),
                })
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn test_missing_endpoint_counted_separately() {
        let store = MemoryStore::new();
        seed(&store, NodeKind::Course, &["CS101", "CS201"]).await;
        let session = store.open_session(Stage::RelationshipSync(EdgeKind::Requires)).await.unwrap();

        let rows = vec![
            PrerequisiteRow::new("CS201", "CS101"),
            PrerequisiteRow::new("CS201", "MATH999"),
            PrerequisiteRow {
                course_code: Some("CS201".to_string()),
                prerequisite_code: None,
            },
        ];
        let stats = sync_relationships(&session, &rows, 4).await;

        assert_eq!(stats.created, 1);
        assert_eq!(stats.missing_endpoint, 1);
        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.errors, 0);
        assert_eq!(store.edge_count(EdgeKind::Requires).await, 1);
        assert!(store.node(NodeKind::Course, "MATH999").await.is_none());
    }

    #[tokio::test]
    async fn test_edge_attributes_last_write_wins() {
        let store = MemoryStore::new();
        seed(&store, NodeKind::Course, &["CS101"]).await;
        seed(&store, NodeKind::Skill, &["SQL"]).await;
        let session = store.open_session(Stage::RelationshipSync(EdgeKind::Teaches)).await.unwrap();

        let row = |level: &str| CourseSkillRow {
            course_code: Some("CS101".to_string()),
            skill_name: Some("SQL".to_string()),
            level: Some(level.to_string()),
        };
        let stats = sync_relationships(&session, &[row("beginner"), row("advanced")], 4).await;

        assert_eq!(stats.created, 1);
        assert_eq!(stats.updated, 1);
        let edge = store.edge(EdgeKind::Teaches, "CS101", "SQL").await.unwrap();
        assert_eq!(edge.properties.get("level"), Some(&PropertyValue::from("advanced")));
        assert!(edge.synced_at >= edge.created_at);
    }

    #[tokio::test]
    async fn test_unreadable_row_is_an_error_beside_good_rows() {
        let store = MemoryStore::new();
        seed(&store, NodeKind::Course, &["CS101", "CS201", "CS301"]).await;
        let session = store.open_session(Stage::RelationshipSync(EdgeKind::Requires)).await.unwrap();

        let rows: Vec<SourceRow<PrerequisiteRow>> = vec![
            Ok(PrerequisiteRow::new("CS201", "CS101")),
            Err(RowError {
                key: Some("CS301".to_string()),
                reason: "invalid type: integer `7`, expected a string".to_string(),
            }),
            Ok(PrerequisiteRow::new("CS301", "CS201")),
        ];
        let stats = sync_relationships(&session, &rows, 2).await;

        assert_eq!(stats.created, 2);
        assert_eq!(stats.errors, 1);
        assert_eq!(stats.skipped, 0);
        assert_eq!(store.edge_count(EdgeKind::Requires).await, 2);
    }
}
