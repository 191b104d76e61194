//! Record-to-graph synchronization.
//!
//! Both phases share one driver: records are grouped by merge identity,
//! groups run on a bounded pool (`buffer_unordered(batch_size)`), and each
//! group folds its outcomes into a [`StageStats`] value. Records with the
//! same identity stay in one group and are applied in source order, so the
//! last record for a key always wins.

mod entity;
mod relationship;

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;

use futures::stream::{self, StreamExt};
use serde::Serialize;

pub use entity::{sync_entities, upsert_entity};
pub use relationship::{sync_relationships, upsert_relationship};

/// What happened to one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    Created,
    Updated,
    /// Incomplete row; nothing was attempted.
    Skipped,
    /// Edge endpoint absent from the node set.
    MissingEndpoint,
    Failed,
}

/// Per-stage counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StageStats {
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    pub missing_endpoint: usize,
    pub errors: usize,
}

impl StageStats {
    pub fn record(&mut self, outcome: RecordOutcome) {
        match outcome {
            RecordOutcome::Created => self.created += 1,
            RecordOutcome::Updated => self.updated += 1,
            RecordOutcome::Skipped => self.skipped += 1,
            RecordOutcome::MissingEndpoint => self.missing_endpoint += 1,
            RecordOutcome::Failed => self.errors += 1,
        }
    }

    pub fn merge(&mut self, other: &StageStats) {
        self.created += other.created;
        self.updated += other.updated;
        self.skipped += other.skipped;
        self.missing_endpoint += other.missing_endpoint;
        self.errors += other.errors;
    }

    /// Records written to the store.
    pub fn synced(&self) -> usize {
        self.created + self.updated
    }

    /// Records seen, whatever their outcome.
    pub fn total(&self) -> usize {
        self.synced() + self.skipped + self.missing_endpoint + self.errors
    }
}

/// Group records by identity, keeping first-appearance order of groups and
/// source order within a group. Records without an identity each get their
/// own group.
pub(crate) fn group_by_key<T, K, F>(records: &[T], key: F) -> Vec<Vec<&T>>
where
    K: Eq + Hash,
    F: Fn(&T) -> Option<K>,
{
    let mut index: HashMap<K, usize> = HashMap::new();
    let mut groups: Vec<Vec<&T>> = Vec::new();

    for record in records {
        match key(record) {
            Some(k) => match index.get(&k) {
                Some(&i) => groups[i].push(record),
                None => {
                    index.insert(k, groups.len());
                    groups.push(vec![record]);
                }
            },
            None => groups.push(vec![record]),
        }
    }
    groups
}

/// Run `apply` over every record, at most `batch_size` groups in flight.
pub(crate) async fn process_groups<'a, T, F, Fut>(
    groups: Vec<Vec<&'a T>>,
    batch_size: usize,
    apply: F,
) -> StageStats
where
    F: Fn(&'a T) -> Fut,
    Fut: Future<Output = RecordOutcome>,
{
    let apply = &apply;
    stream::iter(groups)
        .map(|group| async move {
            let mut stats = StageStats::default();
            for record in group {
                stats.record(apply(record).await);
            }
            stats
        })
        .buffer_unordered(batch_size.max(1))
        .fold(StageStats::default(), |mut total, stats| async move {
            total.merge(&stats);
            total
        })
        .await
}
