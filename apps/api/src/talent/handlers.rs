//! Axum route handlers for the Talent Pool API.

use axum::{
    extract::{Multipart, Path, Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::forms::FormData;
use crate::models::candidate::CandidateRow;
use crate::parser_webhook::{self, PendingParse, SECRET_HEADER};
use crate::state::AppState;
use crate::storage;
use crate::talent::anonymize::{anonymize, AnonymizedProfile};
use crate::talent::filter::{self, Facets, ListParams, Pagination, TalentFilter};
use crate::talent::store::{self, ParseResult, ParseStatus, PoolQuery};
use crate::talent::talent_id::{format_talent_id, parse_talent_id};
use crate::talent::validation::validate_join_form;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct JoinResponse {
    pub talent_id: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub data: Vec<AnonymizedProfile>,
    pub pagination: Pagination,
    pub facets: Facets,
    pub applied: TalentFilter,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CallbackStatus {
    Completed,
    Failed,
}

#[derive(Debug, Deserialize)]
pub struct ParseCallback {
    pub status: CallbackStatus,
    #[serde(flatten)]
    pub result: ParseResult,
    pub error: Option<String>,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/talent-pool/join
///
/// Multipart Join form: validate → store CV → insert → notify parser.
/// The parser call runs in the background and never affects the response.
pub async fn handle_join(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<JoinResponse>), AppError> {
    let form = FormData::from_multipart(multipart, state.config.max_upload_bytes).await?;
    let submission = validate_join_form(&form)?;

    let cv_key = storage::cv_key(Uuid::new_v4(), &submission.cv.file_name);
    storage::put_object(
        &state.s3,
        &state.config.s3_bucket,
        &cv_key,
        submission.cv.bytes.clone(),
        submission.cv_kind.content_type(),
    )
    .await?;

    let row = match store::insert_candidate(&state.db, &submission, &cv_key).await {
        Ok(row) => row,
        Err(e) => {
            storage::discard_object(&state.s3, &state.config.s3_bucket, &cv_key).await;
            return Err(e.into());
        }
    };
    let talent_id = format_talent_id(row.id);
    info!(%talent_id, skills = row.skills.len(), "New talent pool submission");

    parser_webhook::dispatch(
        &state,
        PendingParse {
            candidate_id: row.id,
            talent_id: talent_id.clone(),
            cv_key,
            file_name: row.cv_file_name.clone(),
        },
    );

    Ok((
        StatusCode::CREATED,
        Json(JoinResponse {
            talent_id,
            message: "Thanks for joining the talent pool. Your anonymized profile is now visible to companies.".to_string(),
        }),
    ))
}

/// GET /api/talent-pool/list
///
/// Anonymized, filtered, sorted, paginated listing plus filter facets.
pub async fn handle_list(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<ListResponse>, AppError> {
    let filter = params.into_filter().map_err(AppError::InvalidFields)?;

    let rows = store::fetch_pool(
        &state.db,
        &PoolQuery {
            location: filter.location.clone(),
            english_level: filter.english_level,
            availability: filter.availability,
            cap: state.config.listing_fetch_cap,
        },
    )
    .await?;

    Ok(Json(list_page(filter, &rows)))
}

/// Anonymizes the fetched rows, counts facets over all of them, then runs
/// the filter pipeline for the requested page.
pub fn list_page(filter: TalentFilter, rows: &[CandidateRow]) -> ListResponse {
    let profiles: Vec<AnonymizedProfile> = rows.iter().map(anonymize).collect();
    let facets = filter::facets(&profiles);
    let page = filter::apply(&filter, profiles);

    ListResponse {
        data: page.data,
        pagination: page.pagination,
        facets,
        applied: filter,
    }
}

fn row_id_from_path(raw: &str) -> Result<i64, AppError> {
    parse_talent_id(raw)
        .ok_or_else(|| AppError::Validation(format!("'{raw}' is not a valid talent id")))
}

/// GET /api/talent-pool/:talent_id
pub async fn handle_get_talent(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Json<AnonymizedProfile>, AppError> {
    let id = row_id_from_path(&raw_id)?;
    let row = store::find_visible(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Talent {} not found", format_talent_id(id))))?;
    Ok(Json(anonymize(&row)))
}

fn secrets_match(expected: &str, given: &str) -> bool {
    expected.as_bytes().ct_eq(given.as_bytes()).into()
}

fn authorize_callback(state: &AppState, headers: &HeaderMap) -> Result<(), AppError> {
    let Some(expected) = state.config.cv_parser_webhook_secret.as_deref() else {
        warn!("Parser callback received but no webhook secret is configured");
        return Err(AppError::Unauthorized);
    };
    let given = headers
        .get(SECRET_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if secrets_match(expected, given) {
        Ok(())
    } else {
        Err(AppError::Unauthorized)
    }
}

/// POST /api/talent-pool/:talent_id/parsed
///
/// Callback from the CV parser. Authenticated by the shared webhook secret;
/// the body is only parsed once the secret checks out.
pub async fn handle_parse_callback(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, AppError> {
    authorize_callback(&state, &headers)?;
    let id = row_id_from_path(&raw_id)?;

    let callback: ParseCallback = serde_json::from_slice(&body)
        .map_err(|e| AppError::Validation(format!("Invalid callback body: {e}")))?;

    let found = match callback.status {
        CallbackStatus::Completed => {
            store::apply_parse_result(&state.db, id, &callback.result).await?
        }
        CallbackStatus::Failed => {
            let reason = callback.error.as_deref().unwrap_or("parser reported failure");
            warn!(talent_id = %format_talent_id(id), "CV parse failed: {reason}");
            store::set_parse_status(&state.db, id, ParseStatus::Failed, Some(reason)).await?
        }
    };
    if !found {
        return Err(AppError::NotFound(format!(
            "Talent {} not found",
            format_talent_id(id)
        )));
    }

    Ok(StatusCode::NO_CONTENT)
}
