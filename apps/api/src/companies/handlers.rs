//! Axum route handlers for company hiring requests.

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::companies::validation::{validate_hiring_request, HiringRequestSubmission};
use crate::errors::AppError;
use crate::forms::FormData;
use crate::models::hiring_request::HiringRequestRow;
use crate::state::AppState;
use crate::storage;

#[derive(Debug, Serialize)]
pub struct HiringRequestResponse {
    pub request_id: Uuid,
    pub message: String,
}

pub async fn insert_hiring_request(
    pool: &PgPool,
    id: Uuid,
    submission: &HiringRequestSubmission,
    job_description_key: Option<&str>,
) -> Result<HiringRequestRow, sqlx::Error> {
    sqlx::query_as::<_, HiringRequestRow>(
        r#"
        INSERT INTO hiring_requests
            (id, company_name, contact_name, email, phone, website, role_title,
             seniority, talent_ids, message, job_description_key)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(&submission.company_name)
    .bind(&submission.contact_name)
    .bind(&submission.email)
    .bind(&submission.phone)
    .bind(&submission.website)
    .bind(&submission.role_title)
    .bind(submission.seniority.map(|s| s.as_str()))
    .bind(&submission.talent_ids)
    .bind(&submission.message)
    .bind(job_description_key)
    .fetch_one(pool)
    .await
}

/// POST /api/companies/requests
///
/// Multipart hiring request with an optional job description file.
pub async fn handle_create_request(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<HiringRequestResponse>), AppError> {
    let form = FormData::from_multipart(multipart, state.config.max_upload_bytes).await?;
    let submission = validate_hiring_request(&form)?;

    let request_id = Uuid::new_v4();
    let jd_key = match &submission.job_description {
        Some((file, kind)) => {
            let key = storage::jd_key(request_id, &file.file_name);
            storage::put_object(
                &state.s3,
                &state.config.s3_bucket,
                &key,
                file.bytes.clone(),
                kind.content_type(),
            )
            .await?;
            Some(key)
        }
        None => None,
    };

    let row = match insert_hiring_request(&state.db, request_id, &submission, jd_key.as_deref())
        .await
    {
        Ok(row) => row,
        Err(e) => {
            if let Some(key) = &jd_key {
                storage::discard_object(&state.s3, &state.config.s3_bucket, key).await;
            }
            return Err(e.into());
        }
    };
    info!(
        request_id = %row.id,
        company = %row.company_name,
        candidates = row.talent_ids.len(),
        "New hiring request"
    );

    Ok((
        StatusCode::CREATED,
        Json(HiringRequestResponse {
            request_id: row.id,
            message: "Thanks! Our team will reach out within two business days.".to_string(),
        }),
    ))
}
