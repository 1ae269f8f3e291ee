pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::companies::handlers as companies;
use crate::state::AppState;
use crate::talent::handlers as talent;

/// Headroom for the text fields that travel with an uploaded file.
const FORM_OVERHEAD_BYTES: usize = 64 * 1024;

pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes + FORM_OVERHEAD_BYTES;

    Router::new()
        .route("/health", get(health::health_handler))
        // Talent pool
        .route("/api/talent-pool/join", post(talent::handle_join))
        .route("/api/talent-pool/list", get(talent::handle_list))
        .route("/api/talent-pool/:talent_id", get(talent::handle_get_talent))
        .route(
            "/api/talent-pool/:talent_id/parsed",
            post(talent::handle_parse_callback),
        )
        // Companies
        .route(
            "/api/companies/requests",
            post(companies::handle_create_request),
        )
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}
