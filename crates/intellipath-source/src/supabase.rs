//! Supabase (PostgREST) record source.
//!
//! Reads each table through `GET {url}/rest/v1/{table}` with the service
//! role key, paging with `limit`/`offset` until a short page comes back.
//! Relation tables are fetched with embedded resources so each row already
//! carries the natural keys of both ends.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use intellipath_core::{
    CareerPathRow, CourseCareerRow, CourseRow, CourseSkillRow, MajorRow, PrerequisiteRow, SkillRow,
    SourceRow,
};

use crate::error::{SourceError, SourceResult};
use crate::{parse_rows, RecordSource};

/// Rows requested per page.
pub const PAGE_SIZE: usize = 1000;

/// A page shorter than [`PAGE_SIZE`] is the end of the table.
fn is_last_page(page_len: usize) -> bool {
    page_len < PAGE_SIZE
}

/// Connection settings for the Supabase REST endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct SupabaseConfig {
    pub url: String,
    pub service_key: String,
}

/// PostgREST-backed [`RecordSource`].
#[derive(Clone)]
pub struct SupabaseSource {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct CodeRef {
    code: Option<String>,
}

#[derive(Deserialize)]
struct NameRef {
    name: Option<String>,
}

#[derive(Deserialize)]
struct PrerequisiteJoin {
    course: Option<CodeRef>,
    prerequisite: Option<CodeRef>,
}

#[derive(Deserialize)]
struct CourseSkillJoin {
    level: Option<String>,
    course: Option<CodeRef>,
    skill: Option<NameRef>,
}

#[derive(Deserialize)]
struct CourseCareerJoin {
    importance: Option<String>,
    course: Option<CodeRef>,
    career: Option<NameRef>,
}

impl SupabaseSource {
    /// Create a new source from config.
    pub fn new(config: &SupabaseConfig) -> SourceResult<Self> {
        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(&config.service_key)
            .map_err(|_| SourceError::Config("service key is not a valid header value".to_string()))?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", config.service_key))
            .map_err(|_| SourceError::Config("service key is not a valid header value".to_string()))?;
        headers.insert("apikey", key);
        headers.insert(AUTHORIZATION, bearer);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            base_url: config.url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    /// Fetch every row of `table` matching `filters`, page by page.
    ///
    /// Pages are read as raw JSON and parsed row by row; `key_pointer` names
    /// the natural key used to report rows that fail to parse.
    async fn fetch_all<T: DeserializeOwned>(
        &self,
        table: &str,
        select: &str,
        filters: &[(&str, &str)],
        key_pointer: &str,
    ) -> SourceResult<Vec<SourceRow<T>>> {
        let mut rows = Vec::new();
        let limit = PAGE_SIZE.to_string();

        loop {
            let offset = rows.len().to_string();
            let response = self
                .client
                .get(self.table_url(table))
                .query(&[("select", select), ("order", "id"), ("limit", limit.as_str()), ("offset", offset.as_str())])
                .query(filters)
                .send()
                .await?;

            if !response.status().is_success() {
                let status = response.status().as_u16();
                let body = response.text().await.unwrap_or_default();
                return Err(SourceError::Api {
                    table: table.to_string(),
                    status,
                    body,
                });
            }

            let page: Vec<Value> = response.json().await?;
            let page_len = page.len();
            rows.extend(parse_rows::<T>(page, key_pointer));
            debug!(table, fetched = rows.len(), "Fetched page");

            if is_last_page(page_len) {
                break;
            }
        }

        let unreadable = rows.iter().filter(|row| row.is_err()).count();
        if unreadable > 0 {
            warn!(table, unreadable, "Some rows did not parse");
        }
        Ok(rows)
    }
}

#[async_trait]
impl RecordSource for SupabaseSource {
    async fn ping(&self) -> SourceResult<()> {
        let response = self
            .client
            .get(self.table_url("courses"))
            .query(&[("select", "id"), ("limit", "1")])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::Api {
                table: "courses".to_string(),
                status,
                body,
            });
        }
        Ok(())
    }

    async fn active_courses(&self) -> SourceResult<Vec<SourceRow<CourseRow>>> {
        self.fetch_all("courses", "*", &[("is_active", "eq.true")], "/code").await
    }

    async fn majors(&self) -> SourceResult<Vec<SourceRow<MajorRow>>> {
        self.fetch_all("majors", "*", &[], "/name").await
    }

    async fn skills(&self) -> SourceResult<Vec<SourceRow<SkillRow>>> {
        self.fetch_all("skills", "*", &[], "/name").await
    }

    async fn career_paths(&self) -> SourceResult<Vec<SourceRow<CareerPathRow>>> {
        self.fetch_all("career_paths", "*", &[], "/name").await
    }

    async fn prerequisites(&self) -> SourceResult<Vec<SourceRow<PrerequisiteRow>>> {
        let rows: Vec<SourceRow<PrerequisiteJoin>> = self
            .fetch_all(
                "course_prerequisites",
                "id,course:courses!course_prerequisites_course_id_fkey(code),\
                 prerequisite:courses!course_prerequisites_prerequisite_id_fkey(code)",
                &[],
                "/course/code",
            )
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                row.map(|row| PrerequisiteRow {
                    course_code: row.course.and_then(|c| c.code),
                    prerequisite_code: row.prerequisite.and_then(|p| p.code),
                })
            })
            .collect())
    }

    async fn course_skills(&self) -> SourceResult<Vec<SourceRow<CourseSkillRow>>> {
        let rows: Vec<SourceRow<CourseSkillJoin>> = self
            .fetch_all(
                "course_skills",
                "id,level,course:courses(code),skill:skills(name)",
                &[],
                "/course/code",
            )
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                row.map(|row| CourseSkillRow {
                    course_code: row.course.and_then(|c| c.code),
                    skill_name: row.skill.and_then(|s| s.name),
                    level: row.level,
                })
            })
            .collect())
    }

    async fn course_careers(&self) -> SourceResult<Vec<SourceRow<CourseCareerRow>>> {
        let rows: Vec<SourceRow<CourseCareerJoin>> = self
            .fetch_all(
                "course_career_paths",
                "id,importance,course:courses(code),career:career_paths(name)",
                &[],
                "/course/code",
            )
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                row.map(|row| CourseCareerRow {
                    course_code: row.course.and_then(|c| c.code),
                    career_name: row.career.and_then(|c| c.name),
                    importance: row.importance,
                })
            })
            .collect())
    }
}
