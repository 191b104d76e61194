//! Keyed node upsert, shared by every entity kind.

use tracing::{debug, error, info};

use intellipath_core::EntityRecord;

use super::{group_by_key, process_groups, RecordOutcome, StageStats};
use crate::store::GraphSession;

/// Sync all records of one entity kind.
///
/// Never fails as a whole: malformed rows and rejected merges are logged
/// with their natural key and counted as errors.
pub async fn sync_entities<S, R>(session: &S, records: &[R], batch_size: usize) -> StageStats
where
    S: GraphSession + ?Sized,
    R: EntityRecord,
{
    let kind = R::KIND;
    info!(%kind, records = records.len(), "Syncing entities");

    let groups = group_by_key(records, |r| r.natural_key().map(str::to_string));
    let stats = process_groups(groups, batch_size, |record| upsert_entity(session, record)).await;

    info!(
        %kind,
        created = stats.created,
        updated = stats.updated,
        errors = stats.errors,
        "Entities synced"
    );
    stats
}

/// Map one row and merge it by `(kind, natural key)`.
pub async fn upsert_entity<S, R>(session: &S, record: &R) -> RecordOutcome
where
    S: GraphSession + ?Sized,
    R: EntityRecord,
{
    let node = match record.to_node() {
        Ok(node) => node,
        Err(e) => {
            error!(kind = %R::KIND, key = record.natural_key().unwrap_or("<none>"), error = %e, "Malformed record");
            return RecordOutcome::Failed;
        }
    };

    match session.merge_node(&node).await {
        Ok(merge) => {
            debug!(kind = %node.kind, key = %node.key, node_id = %merge.node_id, created = merge.created, "Node merged");
            if merge.created {
                RecordOutcome::Created
            } else {
                RecordOutcome::Updated
            }
        }
        Err(e) => {
            error!(kind = %node.kind, key = %node.key, error = %e, "Failed to merge node");
            RecordOutcome::Failed
        }
    }
}
