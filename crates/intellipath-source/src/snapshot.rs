//! JSON snapshot record source.
//!
//! A snapshot holds the seven record sets in one document, using the same
//! flat row shapes the synchronizers consume:
//!
//! ```json
//! {
//!   "courses": [{"id": 1, "code": "CS101", "name": "Intro", "credits": 3,
//!                "department": "CS", "year_level": 1}],
//!   "prerequisites": [{"course_code": "CS201", "prerequisite_code": "CS101"}]
//! }
//! ```
//!
//! Missing sections read as empty.

use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use intellipath_core::{
    CareerPathRow, CourseCareerRow, CourseRow, CourseSkillRow, MajorRow, PrerequisiteRow, SkillRow,
    SourceRow,
};

use crate::error::SourceResult;
use crate::{parse_rows, RecordSource};

/// All source records, in memory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Snapshot {
    pub courses: Vec<CourseRow>,
    pub majors: Vec<MajorRow>,
    pub skills: Vec<SkillRow>,
    pub career_paths: Vec<CareerPathRow>,
    pub prerequisites: Vec<PrerequisiteRow>,
    pub course_skills: Vec<CourseSkillRow>,
    pub course_careers: Vec<CourseCareerRow>,
}

/// The document as read from disk, before any row is parsed.
#[derive(Deserialize, Default)]
#[serde(default)]
struct RawSnapshot {
    courses: Vec<Value>,
    majors: Vec<Value>,
    skills: Vec<Value>,
    career_paths: Vec<Value>,
    prerequisites: Vec<Value>,
    course_skills: Vec<Value>,
    course_careers: Vec<Value>,
}

fn parsed<R>(rows: Vec<R>) -> Vec<SourceRow<R>> {
    rows.into_iter().map(Ok).collect()
}

fn is_inactive(course: &Value) -> bool {
    course.get("is_active").and_then(Value::as_bool) == Some(false)
}

/// [`RecordSource`] over a [`Snapshot`].
#[derive(Debug, Clone, Default)]
pub struct SnapshotSource {
    courses: Vec<SourceRow<CourseRow>>,
    majors: Vec<SourceRow<MajorRow>>,
    skills: Vec<SourceRow<SkillRow>>,
    career_paths: Vec<SourceRow<CareerPathRow>>,
    prerequisites: Vec<SourceRow<PrerequisiteRow>>,
    course_skills: Vec<SourceRow<CourseSkillRow>>,
    course_careers: Vec<SourceRow<CourseCareerRow>>,
}

impl SnapshotSource {
    pub fn new(snapshot: Snapshot) -> Self {
        Self {
            courses: parsed(snapshot.courses),
            majors: parsed(snapshot.majors),
            skills: parsed(snapshot.skills),
            career_paths: parsed(snapshot.career_paths),
            prerequisites: parsed(snapshot.prerequisites),
            course_skills: parsed(snapshot.course_skills),
            course_careers: parsed(snapshot.course_careers),
        }
    }

    /// Parse a snapshot from a JSON string.
    ///
    /// Only the document shape is checked up front. Rows are parsed one at a
    /// time and a row that does not fit is kept as an `Err` item.
    pub fn from_json(json: &str) -> SourceResult<Self> {
        let raw: RawSnapshot = serde_json::from_str(json)?;
        // Inactive courses are never synced, so they are never reported either.
        let courses = raw.courses.into_iter().filter(|c| !is_inactive(c)).collect();

        Ok(Self {
            courses: parse_rows(courses, "/code"),
            majors: parse_rows(raw.majors, "/name"),
            skills: parse_rows(raw.skills, "/name"),
            career_paths: parse_rows(raw.career_paths, "/name"),
            prerequisites: parse_rows(raw.prerequisites, "/course_code"),
            course_skills: parse_rows(raw.course_skills, "/course_code"),
            course_careers: parse_rows(raw.course_careers, "/course_code"),
        })
    }

    /// Load a snapshot from a JSON file.
    pub async fn load(path: &Path) -> SourceResult<Self> {
        let json = tokio::fs::read_to_string(path).await?;
        let source = Self::from_json(&json)?;
        info!(
            path = %path.display(),
            courses = source.courses.len(),
            prerequisites = source.prerequisites.len(),
            "Loaded record snapshot"
        );
        let unreadable = source.unreadable_rows();
        if unreadable > 0 {
            warn!(path = %path.display(), unreadable, "Some snapshot rows did not parse");
        }
        Ok(source)
    }

    /// Rows across all sections that failed to parse.
    pub fn unreadable_rows(&self) -> usize {
        fn count<R>(rows: &[SourceRow<R>]) -> usize {
            rows.iter().filter(|row| row.is_err()).count()
        }

        count(&self.courses)
            + count(&self.majors)
            + count(&self.skills)
            + count(&self.career_paths)
            + count(&self.prerequisites)
            + count(&self.course_skills)
            + count(&self.course_careers)
    }
}

#[async_trait]
impl RecordSource for SnapshotSource {
    async fn active_courses(&self) -> SourceResult<Vec<SourceRow<CourseRow>>> {
        Ok(self
            .courses
            .iter()
            .filter(|row| row.as_ref().map_or(true, |c| c.is_active.unwrap_or(true)))
            .cloned()
            .collect())
    }

    async fn majors(&self) -> SourceResult<Vec<SourceRow<MajorRow>>> {
        Ok(self.majors.clone())
    }

    async fn skills(&self) -> SourceResult<Vec<SourceRow<SkillRow>>> {
        Ok(self.skills.clone())
    }

    async fn career_paths(&self) -> SourceResult<Vec<SourceRow<CareerPathRow>>> {
        Ok(self.career_paths.clone())
    }

    async fn prerequisites(&self) -> SourceResult<Vec<SourceRow<PrerequisiteRow>>> {
        Ok(self.prerequisites.clone())
    }

    async fn course_skills(&self) -> SourceResult<Vec<SourceRow<CourseSkillRow>>> {
        Ok(self.course_skills.clone())
    }

    async fn course_careers(&self) -> SourceResult<Vec<SourceRow<CourseCareerRow>>> {
        Ok(self.course_careers.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_inactive_courses_filtered() {
        let source = SnapshotSource::from_json(
            r#"{
                "courses": [
                    {"id": 1, "code": "CS101", "is_active": true},
                    {"id": 2, "code": "CS102", "is_active": false},
                    {"id": 3, "code": "CS103"}
                ]
            }"#,
        )
        .unwrap();

        let codes: Vec<_> = source
            .active_courses()
            .await
            .unwrap()
            .into_iter()
            .filter_map(|c| c.ok()?.code)
            .collect();
        assert_eq!(codes, vec!["CS101", "CS103"]);
    }

    #[tokio::test]
    async fn test_wrong_typed_column_rejects_only_that_row() {
        let source = SnapshotSource::from_json(
            r#"{
                "courses": [
                    {"id": 1, "code": "CS101", "credits": 3},
                    {"id": 2, "code": "CS102", "credits": 3.5},
                    {"id": 3, "code": "CS103", "credits": "four", "is_active": false}
                ],
                "skills": [{"id": "s1", "name": "SQL"}, {"id": "s2", "name": 42}]
            }"#,
        )
        .unwrap();

        let courses = source.active_courses().await.unwrap();
        assert_eq!(courses.len(), 2);
        assert!(courses[0].is_ok());
        assert_eq!(courses[1].as_ref().unwrap_err().key.as_deref(), Some("CS102"));

        let skills = source.skills().await.unwrap();
        assert!(skills[0].is_ok());
        assert!(skills[1].as_ref().unwrap_err().key.is_none());
        assert_eq!(source.unreadable_rows(), 2);
    }

    #[tokio::test]
    async fn test_missing_sections_are_empty() {
        let source = SnapshotSource::from_json(r#"{"skills": [{"id": "s1", "name": "SQL"}]}"#).unwrap();
        assert!(source.majors().await.unwrap().is_empty());
        assert!(source.prerequisites().await.unwrap().is_empty());
        assert_eq!(source.skills().await.unwrap().len(), 1);
        assert!(source.ping().await.is_ok());
    }

    #[test]
    fn test_malformed_json_is_an_error() {
        assert!(SnapshotSource::from_json("{\"courses\": 3}").is_err());
    }
}
