use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::info;

use crate::models::candidate::CandidateRow;
use crate::talent::fields::{normalize_skills, Availability, EnglishLevel};
use crate::talent::talent_id::format_talent_id;
use crate::talent::validation::CandidateSubmission;

/// Where a candidate's CV is in the external parsing flow.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ParseStatus {
    /// Stored, webhook not yet attempted.
    Pending,
    /// The parser accepted the webhook.
    Requested,
    Completed,
    Failed,
}

impl ParseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParseStatus::Pending => "pending",
            ParseStatus::Requested => "requested",
            ParseStatus::Completed => "completed",
            ParseStatus::Failed => "failed",
        }
    }
}

/// Structured fields returned by the CV parser.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ParseResult {
    #[serde(default)]
    pub skills: Vec<String>,
    pub years_experience: Option<i32>,
    pub summary: Option<String>,
}

/// SQL-side narrowing for the listing. Only plain column predicates live
/// here; derived-field filtering happens in `talent::filter`.
#[derive(Debug, Clone, Default)]
pub struct PoolQuery {
    pub location: Option<String>,
    pub english_level: Option<EnglishLevel>,
    pub availability: Option<Availability>,
    pub cap: i64,
}

pub async fn insert_candidate(
    pool: &PgPool,
    submission: &CandidateSubmission,
    cv_key: &str,
) -> Result<CandidateRow, sqlx::Error> {
    let row = sqlx::query_as::<_, CandidateRow>(
        r#"
        INSERT INTO candidates
            (full_name, email, phone, linkedin_url, location, title,
             years_experience, skills, english_level, availability,
             salary_expectation_usd, summary, cv_key, cv_file_name,
             consent_given_at, parse_status)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, NOW(), $15)
        RETURNING *
        "#,
    )
    .bind(&submission.full_name)
    .bind(&submission.email)
    .bind(&submission.phone)
    .bind(&submission.linkedin_url)
    .bind(&submission.location)
    .bind(&submission.title)
    .bind(submission.years_experience)
    .bind(&submission.skills)
    .bind(submission.english_level.as_str())
    .bind(submission.availability.as_str())
    .bind(submission.salary_expectation_usd)
    .bind(&submission.summary)
    .bind(cv_key)
    .bind(&submission.cv.file_name)
    .bind(ParseStatus::Pending.as_str())
    .fetch_one(pool)
    .await?;

    info!(talent_id = %format_talent_id(row.id), "Inserted candidate");
    Ok(row)
}

/// Escapes LIKE wildcards so user input matches literally.
fn like_pattern(raw: &str) -> String {
    let escaped = raw
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

pub fn build_pool_query(query: &PoolQuery) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM candidates WHERE is_visible = TRUE");

    if let Some(location) = &query.location {
        qb.push(" AND location ILIKE ")
            .push_bind(like_pattern(location));
    }
    if let Some(level) = query.english_level {
        qb.push(" AND english_level = ").push_bind(level.as_str());
    }
    if let Some(availability) = query.availability {
        qb.push(" AND availability = ")
            .push_bind(availability.as_str());
    }

    qb.push(" ORDER BY created_at DESC, id DESC LIMIT ")
        .push_bind(query.cap.max(1));
    qb
}

/// Visible candidates, newest first, at most `query.cap` rows.
pub async fn fetch_pool(pool: &PgPool, query: &PoolQuery) -> Result<Vec<CandidateRow>, sqlx::Error> {
    let mut qb = build_pool_query(query);
    qb.build_query_as::<CandidateRow>().fetch_all(pool).await
}

pub async fn find_visible(pool: &PgPool, id: i64) -> Result<Option<CandidateRow>, sqlx::Error> {
    sqlx::query_as::<_, CandidateRow>("SELECT * FROM candidates WHERE id = $1 AND is_visible = TRUE")
        .bind(id)
        .fetch_optional(pool)
        .await
}

fn build_status_update(
    id: i64,
    status: ParseStatus,
    error: Option<String>,
    only_from: Option<ParseStatus>,
) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::<Postgres>::new("UPDATE candidates SET parse_status = ");
    qb.push_bind(status.as_str())
        .push(", parse_error = ")
        .push_bind(error)
        .push(", updated_at = NOW() WHERE id = ")
        .push_bind(id);
    if let Some(expected) = only_from {
        qb.push(" AND parse_status = ").push_bind(expected.as_str());
    }
    qb
}

/// Returns `false` when no candidate has this id.
pub async fn set_parse_status(
    pool: &PgPool,
    id: i64,
    status: ParseStatus,
    error: Option<&str>,
) -> Result<bool, sqlx::Error> {
    let mut qb = build_status_update(id, status, error.map(str::to_string), None);
    let result = qb.build().execute(pool).await?;
    Ok(result.rows_affected() > 0)
}

/// Records the webhook outcome only while the candidate is still `pending`.
/// A parser that calls back before its webhook response arrives has already
/// moved the row on, and that state wins. Returns `false` in that case.
pub async fn record_dispatch_outcome(
    pool: &PgPool,
    id: i64,
    status: ParseStatus,
    error: Option<&str>,
) -> Result<bool, sqlx::Error> {
    let mut qb = build_status_update(
        id,
        status,
        error.map(str::to_string),
        Some(ParseStatus::Pending),
    );
    let result = qb.build().execute(pool).await?;
    Ok(result.rows_affected() > 0)
}

/// Skills the parser found are appended after the candidate's own.
pub fn merge_skills(existing: &[String], parsed: &[String]) -> Vec<String> {
    normalize_skills(existing.iter().chain(parsed.iter()))
}

const LOCK_CANDIDATE_SQL: &str = "SELECT * FROM candidates WHERE id = $1 FOR UPDATE";

const APPLY_PARSE_RESULT_SQL: &str = r#"
        UPDATE candidates
        SET skills = $2,
            years_experience = COALESCE(years_experience, $3),
            summary = COALESCE(NULLIF(summary, ''), $4),
            parse_status = $5,
            parse_error = NULL,
            updated_at = NOW()
        WHERE id = $1
        "#;

/// Folds parser output into the record. Candidate-entered values win;
/// the parser only fills gaps. The row is locked while skills are merged
/// so overlapping callbacks apply one after the other.
///
/// Returns `false` when no candidate has this id.
pub async fn apply_parse_result(
    pool: &PgPool,
    id: i64,
    result: &ParseResult,
) -> Result<bool, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let Some(row) = sqlx::query_as::<_, CandidateRow>(LOCK_CANDIDATE_SQL)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
    else {
        return Ok(false);
    };

    let skills = merge_skills(&row.skills, &result.skills);
    let years = result.years_experience.filter(|y| (0..=50).contains(y));
    let summary = result
        .summary
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());

    sqlx::query(APPLY_PARSE_RESULT_SQL)
        .bind(row.id)
        .bind(&skills)
        .bind(years)
        .bind(summary)
        .bind(ParseStatus::Completed.as_str())
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    info!(talent_id = %format_talent_id(row.id), skills = skills.len(), "Applied CV parse result");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("São Paulo"), "%São Paulo%");
        assert_eq!(like_pattern("100%_remote"), "%100\\%\\_remote%");
    }

    #[test]
    fn test_pool_query_without_filters() {
        let qb = build_pool_query(&PoolQuery {
            cap: 100,
            ..Default::default()
        });
        assert_eq!(
            qb.sql(),
            "SELECT * FROM candidates WHERE is_visible = TRUE ORDER BY created_at DESC, id DESC LIMIT $1"
        );
    }

    #[test]
    fn test_pool_query_pushes_column_predicates() {
        let qb = build_pool_query(&PoolQuery {
            location: Some("Lima".to_string()),
            english_level: Some(EnglishLevel::Fluent),
            availability: Some(Availability::Immediate),
            cap: 50,
        });
        assert_eq!(
            qb.sql(),
            "SELECT * FROM candidates WHERE is_visible = TRUE AND location ILIKE $1 \
             AND english_level = $2 AND availability = $3 \
             ORDER BY created_at DESC, id DESC LIMIT $4"
        );
    }

    #[test]
    fn test_status_update_is_unconditional_by_default() {
        let qb = build_status_update(7, ParseStatus::Failed, Some("encrypted pdf".into()), None);
        assert_eq!(
            qb.sql(),
            "UPDATE candidates SET parse_status = $1, parse_error = $2, \
             updated_at = NOW() WHERE id = $3"
        );
    }

    #[test]
    fn test_dispatch_outcome_only_moves_pending_rows() {
        let qb = build_status_update(7, ParseStatus::Requested, None, Some(ParseStatus::Pending));
        assert_eq!(
            qb.sql(),
            "UPDATE candidates SET parse_status = $1, parse_error = $2, \
             updated_at = NOW() WHERE id = $3 AND parse_status = $4"
        );
    }

    #[test]
    fn test_parse_result_only_fills_gaps() {
        let sql: String = APPLY_PARSE_RESULT_SQL.split_whitespace().collect::<Vec<_>>().join(" ");
        assert!(sql.contains("years_experience = COALESCE(years_experience, $3)"));
        assert!(sql.contains("summary = COALESCE(NULLIF(summary, ''), $4)"));
        assert!(sql.contains("parse_error = NULL"));
        assert!(sql.ends_with("WHERE id = $1"));
    }

    #[test]
    fn test_parse_result_locks_the_row() {
        assert!(LOCK_CANDIDATE_SQL.ends_with("FOR UPDATE"));
    }

    #[test]
    fn test_merge_skills_keeps_candidate_spelling_first() {
        let merged = merge_skills(
            &["Rust".to_string(), "Docker".to_string()],
            &["rust".to_string(), "Kubernetes".to_string(), "".to_string()],
        );
        assert_eq!(merged, vec!["Rust", "Docker", "Kubernetes"]);
    }

    #[test]
    fn test_parse_status_names() {
        assert_eq!(ParseStatus::Requested.as_str(), "requested");
        assert_eq!(
            serde_json::from_str::<ParseStatus>("\"failed\"").unwrap(),
            ParseStatus::Failed
        );
    }
}
