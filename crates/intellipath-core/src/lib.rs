//! IntelliPath Core Library
//!
//! Academic record types (courses, majors, skills, career paths and their
//! relations) and the mapping that projects each relational row onto a
//! graph node or edge.

pub mod error;
pub mod model;
pub mod records;

pub use error::{CoreError, CoreResult, RowError};
pub use model::{EdgeKind, EdgeRecord, NodeKind, NodeRecord, Properties, PropertyValue};
pub use records::{
    CareerPathRow, CourseCareerRow, CourseRow, CourseSkillRow, EntityRecord, MajorRow,
    PrerequisiteRow, RelationRecord, SkillRow, SourceId, SourceRow,
};
