//! Relational source rows and their graph projection.
//!
//! Every row type implements either [`EntityRecord`] (one node, merged by
//! natural key) or [`RelationRecord`] (one edge, merged by key pair). The
//! synchronizers are generic over these traits, so the per-kind knowledge
//! lives here and nowhere else.

mod entity;
mod relation;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult, RowError};
use crate::model::{EdgeKind, EdgeRecord, NodeKind, NodeRecord};

pub use entity::{CareerPathRow, CourseRow, MajorRow, SkillRow};
pub use relation::{CourseCareerRow, CourseSkillRow, PrerequisiteRow};

/// Opaque primary key of a row in the relational source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SourceId {
    Text(String),
    Number(i64),
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Number(n) => write!(f, "{}", n),
        }
    }
}

impl From<&str> for SourceId {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

/// A relational row that projects onto exactly one graph node.
pub trait EntityRecord: Send + Sync {
    const KIND: NodeKind;

    /// The natural key, if the row carries a usable one.
    fn natural_key(&self) -> Option<&str>;

    /// Map the row's columns onto node attributes.
    fn to_node(&self) -> CoreResult<NodeRecord>;
}

/// A relational row that projects onto exactly one graph edge.
pub trait RelationRecord: Send + Sync {
    const KIND: EdgeKind;

    /// `(source key, target key)`, or `None` when the join came back incomplete.
    fn endpoints(&self) -> Option<(&str, &str)>;

    /// Map the row onto an edge. `Ok(None)` when [`endpoints`](Self::endpoints) is `None`.
    fn to_edge(&self) -> CoreResult<Option<EdgeRecord>>;
}

/// One row as read from the source: parsed, or rejected on its own.
pub type SourceRow<R> = Result<R, RowError>;

impl<R: EntityRecord> EntityRecord for SourceRow<R> {
    const KIND: NodeKind = R::KIND;

    fn natural_key(&self) -> Option<&str> {
        match self {
            Ok(row) => row.natural_key(),
            Err(e) => e.key.as_deref(),
        }
    }

    fn to_node(&self) -> CoreResult<NodeRecord> {
        match self {
            Ok(row) => row.to_node(),
            Err(e) => Err(CoreError::Unreadable {
                record: R::KIND.label(),
                row: e.clone(),
            }),
        }
    }
}

impl<R: RelationRecord> RelationRecord for SourceRow<R> {
    const KIND: EdgeKind = R::KIND;

    fn endpoints(&self) -> Option<(&str, &str)> {
        self.as_ref().ok()?.endpoints()
    }

    fn to_edge(&self) -> CoreResult<Option<EdgeRecord>> {
        match self {
            Ok(row) => row.to_edge(),
            Err(e) => Err(CoreError::Unreadable {
                record: R::KIND.rel_type(),
                row: e.clone(),
            }),
        }
    }
}

/// Returns the trimmed-empty-as-missing view of an optional text column.
pub(crate) fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.trim().is_empty())
}

pub(crate) fn require<T>(
    kind: NodeKind,
    key: Option<&str>,
    field: &'static str,
    value: Option<T>,
) -> CoreResult<T> {
    value.ok_or_else(|| CoreError::missing(kind, key, field))
}
