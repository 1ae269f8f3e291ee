use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A full candidate record, contact details included.
/// Never serialized to public responses; see `talent::anonymize`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CandidateRow {
    pub id: i64,
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub linkedin_url: Option<String>,
    pub location: String,
    pub title: String,
    pub years_experience: Option<i32>,
    pub skills: Vec<String>,
    pub english_level: String,
    pub availability: String,
    pub salary_expectation_usd: Option<i32>,
    pub summary: Option<String>,
    pub cv_key: String,
    pub cv_file_name: String,
    pub consent_given_at: DateTime<Utc>,
    pub parse_status: String,
    pub parse_error: Option<String>,
    pub is_visible: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
