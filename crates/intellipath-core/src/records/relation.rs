//! Relation rows: prerequisites, course skills and course careers.

use serde::{Deserialize, Serialize};

use super::{present, RelationRecord};
use crate::error::CoreResult;
use crate::model::{EdgeKind, EdgeRecord, Properties};

const DEFAULT_SKILL_LEVEL: &str = "beginner";
const DEFAULT_IMPORTANCE: &str = "core";

/// `course_code` requires `prerequisite_code`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PrerequisiteRow {
    pub course_code: Option<String>,
    pub prerequisite_code: Option<String>,
}

impl PrerequisiteRow {
    pub fn new(course_code: &str, prerequisite_code: &str) -> Self {
        Self {
            course_code: Some(course_code.to_string()),
            prerequisite_code: Some(prerequisite_code.to_string()),
        }
    }
}

impl RelationRecord for PrerequisiteRow {
    const KIND: EdgeKind = EdgeKind::Requires;

    fn endpoints(&self) -> Option<(&str, &str)> {
        Some((present(&self.course_code)?, present(&self.prerequisite_code)?))
    }

    fn to_edge(&self) -> CoreResult<Option<EdgeRecord>> {
        let Some((source, target)) = self.endpoints() else {
            return Ok(None);
        };
        Ok(Some(EdgeRecord {
            kind: Self::KIND,
            source: source.to_string(),
            target: target.to_string(),
            properties: Properties::new(),
        }))
    }
}

/// `course_code` teaches `skill_name` at `level`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CourseSkillRow {
    pub course_code: Option<String>,
    pub skill_name: Option<String>,
    pub level: Option<String>,
}

impl RelationRecord for CourseSkillRow {
    const KIND: EdgeKind = EdgeKind::Teaches;

    fn endpoints(&self) -> Option<(&str, &str)> {
        Some((present(&self.course_code)?, present(&self.skill_name)?))
    }

    fn to_edge(&self) -> CoreResult<Option<EdgeRecord>> {
        let Some((source, target)) = self.endpoints() else {
            return Ok(None);
        };
        let level = present(&self.level).unwrap_or(DEFAULT_SKILL_LEVEL);
        Ok(Some(EdgeRecord {
            kind: Self::KIND,
            source: source.to_string(),
            target: target.to_string(),
            properties: Properties::new().with("level", level),
        }))
    }
}

/// `course_code` prepares for `career_name` with `importance`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CourseCareerRow {
    pub course_code: Option<String>,
    pub career_name: Option<String>,
    pub importance: Option<String>,
}

impl RelationRecord for CourseCareerRow {
    const KIND: EdgeKind = EdgeKind::PreparesFor;

    fn endpoints(&self) -> Option<(&str, &str)> {
        Some((present(&self.course_code)?, present(&self.career_name)?))
    }

    fn to_edge(&self) -> CoreResult<Option<EdgeRecord>> {
        let Some((source, target)) = self.endpoints() else {
            return Ok(None);
        };
        let importance = present(&self.importance).unwrap_or(DEFAULT_IMPORTANCE);
        Ok(Some(EdgeRecord {
            kind: Self::KIND,
            source: source.to_string(),
            target: target.to_string(),
            properties: Properties::new().with("importance", importance),
        }))
    }
}
