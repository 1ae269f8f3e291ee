use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct HiringRequestRow {
    pub id: Uuid,
    pub company_name: String,
    pub contact_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub role_title: String,
    pub seniority: Option<String>,
    pub talent_ids: Vec<i64>,
    pub message: Option<String>,
    pub job_description_key: Option<String>,
    pub created_at: DateTime<Utc>,
}
