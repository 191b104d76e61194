//! Entity rows: courses, majors, skills and career paths.

use serde::{Deserialize, Serialize};

use super::{present, require, EntityRecord, SourceId};
use crate::error::{CoreError, CoreResult};
use crate::model::{NodeKind, NodeRecord, Properties};

const DEFAULT_HOURS_THEORY: i64 = 2;
const DEFAULT_HOURS_LAB: i64 = 2;
const DEFAULT_DIFFICULTY: f64 = 3.0;
const DEFAULT_MAJOR_CREDITS: i64 = 171;
const DEFAULT_MAJOR_YEARS: i64 = 5;
/// "Medium" demand, as stored by the source system.
const DEFAULT_DEMAND: &str = "متوسط";

/// A row of the `courses` table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CourseRow {
    pub id: Option<SourceId>,
    pub code: Option<String>,
    pub name: Option<String>,
    pub name_ar: Option<String>,
    pub description: Option<String>,
    pub description_ar: Option<String>,
    pub credits: Option<i64>,
    pub department: Option<String>,
    pub year_level: Option<i64>,
    pub hours_theory: Option<i64>,
    pub hours_lab: Option<i64>,
    pub difficulty_rating: Option<f64>,
    pub is_active: Option<bool>,
}

impl EntityRecord for CourseRow {
    const KIND: NodeKind = NodeKind::Course;

    fn natural_key(&self) -> Option<&str> {
        present(&self.code)
    }

    fn to_node(&self) -> CoreResult<NodeRecord> {
        let kind = Self::KIND;
        let code = require(kind, None, "code", self.natural_key())?;
        let key = Some(code);
        let id = require(kind, key, "id", self.id.as_ref())?;
        let name = require(kind, key, "name", present(&self.name))?;
        let credits = non_negative(code, "credits", require(kind, key, "credits", self.credits)?)?;
        let department = require(kind, key, "department", present(&self.department))?;
        let year_level = require(kind, key, "year_level", self.year_level)?;
        let hours_theory = non_negative(code, "hours_theory", self.hours_theory.unwrap_or(DEFAULT_HOURS_THEORY))?;
        let hours_lab = non_negative(code, "hours_lab", self.hours_lab.unwrap_or(DEFAULT_HOURS_LAB))?;

        let properties = Properties::new()
            .with("name", name)
            .with("name_ar", self.name_ar.clone())
            .with("description", self.description.clone())
            .with("description_ar", self.description_ar.clone())
            .with("credits", credits)
            .with("department", department)
            .with("year_level", year_level)
            .with("hours_theory", hours_theory)
            .with("hours_lab", hours_lab)
            .with("difficulty_rating", self.difficulty_rating.unwrap_or(DEFAULT_DIFFICULTY))
            .with("source_id", id.to_string());

        Ok(NodeRecord {
            kind,
            key: code.to_string(),
            properties,
        })
    }
}

fn non_negative(code: &str, field: &'static str, value: i64) -> CoreResult<i64> {
    if value < 0 {
        return Err(CoreError::InvalidField {
            kind: NodeKind::Course,
            key: code.to_string(),
            field,
            reason: format!("expected a non-negative number, got {}", value),
        });
    }
    Ok(value)
}

/// A row of the `majors` table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MajorRow {
    pub id: Option<SourceId>,
    pub name: Option<String>,
    pub name_en: Option<String>,
    pub description: Option<String>,
    pub total_credits: Option<i64>,
    pub duration_years: Option<i64>,
}

impl EntityRecord for MajorRow {
    const KIND: NodeKind = NodeKind::Major;

    fn natural_key(&self) -> Option<&str> {
        present(&self.name)
    }

    fn to_node(&self) -> CoreResult<NodeRecord> {
        let name = require(Self::KIND, None, "name", self.natural_key())?;
        let id = require(Self::KIND, Some(name), "id", self.id.as_ref())?;

        let properties = Properties::new()
            .with("name_en", self.name_en.clone())
            .with("description", self.description.clone())
            .with("total_credits", self.total_credits.unwrap_or(DEFAULT_MAJOR_CREDITS))
            .with("duration_years", self.duration_years.unwrap_or(DEFAULT_MAJOR_YEARS))
            .with("source_id", id.to_string());

        Ok(NodeRecord {
            kind: Self::KIND,
            key: name.to_string(),
            properties,
        })
    }
}

/// A row of the `skills` table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SkillRow {
    pub id: Option<SourceId>,
    pub name: Option<String>,
    pub name_ar: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
}

impl EntityRecord for SkillRow {
    const KIND: NodeKind = NodeKind::Skill;

    fn natural_key(&self) -> Option<&str> {
        present(&self.name)
    }

    fn to_node(&self) -> CoreResult<NodeRecord> {
        let name = require(Self::KIND, None, "name", self.natural_key())?;
        let id = require(Self::KIND, Some(name), "id", self.id.as_ref())?;

        let properties = Properties::new()
            .with("name_ar", self.name_ar.clone())
            .with("category", self.category.clone())
            .with("description", self.description.clone())
            .with("source_id", id.to_string());

        Ok(NodeRecord {
            kind: Self::KIND,
            key: name.to_string(),
            properties,
        })
    }
}

/// A row of the `career_paths` table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CareerPathRow {
    pub id: Option<SourceId>,
    pub name: Option<String>,
    pub name_ar: Option<String>,
    pub description: Option<String>,
    pub description_ar: Option<String>,
    pub demand: Option<String>,
    pub salary_range_min: Option<i64>,
    pub salary_range_max: Option<i64>,
}

impl EntityRecord for CareerPathRow {
    const KIND: NodeKind = NodeKind::CareerPath;

    fn natural_key(&self) -> Option<&str> {
        present(&self.name)
    }

    fn to_node(&self) -> CoreResult<NodeRecord> {
        let name = require(Self::KIND, None, "name", self.natural_key())?;
        let id = require(Self::KIND, Some(name), "id", self.id.as_ref())?;
        let demand = present(&self.demand).unwrap_or(DEFAULT_DEMAND);

        let properties = Properties::new()
            .with("name_ar", self.name_ar.clone())
            .with("description", self.description.clone())
            .with("description_ar", self.description_ar.clone())
            .with("demand", demand)
            .with("salary_min", self.salary_range_min)
            .with("salary_max", self.salary_range_max)
            .with("source_id", id.to_string());

        Ok(NodeRecord {
            kind: Self::KIND,
            key: name.to_string(),
            properties,
        })
    }
}
