//! # IntelliPath Source
//!
//! Read-only access to the relational academic records: four entity scans
//! and three joined relation scans, each returned as a finite list of flat
//! rows.

pub mod error;
pub mod snapshot;
pub mod supabase;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use intellipath_core::{
    CareerPathRow, CourseCareerRow, CourseRow, CourseSkillRow, MajorRow, PrerequisiteRow, RowError,
    SkillRow, SourceRow,
};

pub use error::{SourceError, SourceResult};
pub use snapshot::{Snapshot, SnapshotSource};
pub use supabase::{SupabaseConfig, SupabaseSource};

/// Deserialize raw rows one at a time.
///
/// A row that does not fit `R` becomes an `Err` carrying the string found at
/// `key_pointer` (a JSON pointer such as `/code` or `/course/code`), so it can
/// be reported by key without discarding the rest of the set.
pub(crate) fn parse_rows<R: DeserializeOwned>(values: Vec<Value>, key_pointer: &str) -> Vec<SourceRow<R>> {
    values
        .iter()
        .map(|value| {
            R::deserialize(value).map_err(|e| RowError {
                key: value.pointer(key_pointer).and_then(Value::as_str).map(str::to_string),
                reason: e.to_string(),
            })
        })
        .collect()
}

/// The relational source collaborator.
///
/// Each scan fails as a whole only when the source cannot be read at all.
/// Individual rows that do not parse come back as `Err` items.
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Check that the source answers at all. Sources without a remote end are always reachable.
    async fn ping(&self) -> SourceResult<()> {
        Ok(())
    }

    /// Courses flagged active.
    async fn active_courses(&self) -> SourceResult<Vec<SourceRow<CourseRow>>>;

    async fn majors(&self) -> SourceResult<Vec<SourceRow<MajorRow>>>;

    async fn skills(&self) -> SourceResult<Vec<SourceRow<SkillRow>>>;

    async fn career_paths(&self) -> SourceResult<Vec<SourceRow<CareerPathRow>>>;

    /// Course -> prerequisite pairs, by course code.
    async fn prerequisites(&self) -> SourceResult<Vec<SourceRow<PrerequisiteRow>>>;

    /// Course -> skill pairs with their `level`.
    async fn course_skills(&self) -> SourceResult<Vec<SourceRow<CourseSkillRow>>>;

    /// Course -> career path pairs with their `importance`.
    async fn course_careers(&self) -> SourceResult<Vec<SourceRow<CourseCareerRow>>>;
}
