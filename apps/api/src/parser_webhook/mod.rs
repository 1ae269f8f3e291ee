//! Outbound notification to the external CV parser.
//!
//! Submissions never wait on the parser. `dispatch` hands the request to a
//! background task, and the outcome only shows up in the candidate's
//! `parse_status`. The parser later reports results through the callback
//! route in `talent::handlers`.
//!
//! `AppState` holds an `Arc<dyn ParseNotifier>`: `WebhookNotifier` when a
//! parser URL is configured, `DisabledNotifier` otherwise.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::state::AppState;
use crate::storage;
use crate::talent::store::{record_dispatch_outcome, ParseStatus};

pub const SECRET_HEADER: &str = "x-webhook-secret";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_ATTEMPTS: u32 = 3;
/// How long the parser's CV download link stays valid.
pub const CV_LINK_TTL: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Parser rejected webhook (status {status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("Parser unavailable after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: String },
}

/// Body POSTed to the parser for each new candidate.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ParseRequest {
    pub event: &'static str,
    pub candidate_id: i64,
    pub talent_id: String,
    pub cv_url: String,
    pub cv_key: String,
    pub file_name: String,
    pub callback_url: String,
}

impl ParseRequest {
    pub const EVENT: &'static str = "candidate.created";
}

#[async_trait]
pub trait ParseNotifier: Send + Sync {
    async fn notify(&self, request: &ParseRequest) -> Result<(), WebhookError>;

    /// `false` when no parser is configured; dispatch then leaves the
    /// candidate in `pending`.
    fn enabled(&self) -> bool {
        true
    }
}

/// Posts `ParseRequest` JSON to the configured parser URL.
pub struct WebhookNotifier {
    client: Client,
    url: String,
    secret: Option<String>,
}

impl WebhookNotifier {
    pub fn new(url: String, secret: Option<String>) -> Result<Self, WebhookError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            url,
            secret,
        })
    }
}

/// Transport errors, 429 and 5xx are worth another try.
fn is_retryable(status: reqwest::StatusCode) -> bool {
    status.as_u16() == 429 || status.is_server_error()
}

#[async_trait]
impl ParseNotifier for WebhookNotifier {
    async fn notify(&self, request: &ParseRequest) -> Result<(), WebhookError> {
        let mut last_error = String::new();

        for attempt in 0..MAX_ATTEMPTS {
            if attempt > 0 {
                // Exponential backoff: 500ms, 1s
                let delay = Duration::from_millis(500 * (1 << (attempt - 1)));
                warn!(
                    talent_id = %request.talent_id,
                    "Parser webhook attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let mut builder = self.client.post(&self.url).json(request);
            if let Some(secret) = &self.secret {
                builder = builder.header(SECRET_HEADER, secret);
            }

            let response = match builder.send().await {
                Ok(r) => r,
                Err(e) => {
                    last_error = e.to_string();
                    continue;
                }
            };

            let status = response.status();
            if status.is_success() {
                debug!(talent_id = %request.talent_id, %status, "Parser accepted webhook");
                return Ok(());
            }

            let body = response.text().await.unwrap_or_default();
            if is_retryable(status) {
                last_error = format!("status {status}: {body}");
                continue;
            }

            return Err(WebhookError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        Err(WebhookError::Exhausted {
            attempts: MAX_ATTEMPTS,
            last: last_error,
        })
    }
}

/// Stand-in when no parser URL is configured.
pub struct DisabledNotifier;

#[async_trait]
impl ParseNotifier for DisabledNotifier {
    async fn notify(&self, request: &ParseRequest) -> Result<(), WebhookError> {
        debug!(talent_id = %request.talent_id, "CV parser webhook disabled; skipping");
        Ok(())
    }

    fn enabled(&self) -> bool {
        false
    }
}

pub fn callback_url(public_base_url: &str, talent_id: &str) -> String {
    format!("{public_base_url}/api/talent-pool/{talent_id}/parsed")
}

/// A freshly stored candidate waiting to be handed to the parser.
#[derive(Debug, Clone)]
pub struct PendingParse {
    pub candidate_id: i64,
    pub talent_id: String,
    pub cv_key: String,
    pub file_name: String,
}

async fn request_parse(state: &AppState, pending: PendingParse) -> Result<(), String> {
    let cv_url = storage::presign_get(
        &state.s3,
        &state.config.s3_bucket,
        &pending.cv_key,
        CV_LINK_TTL,
    )
    .await
    .map_err(|e| e.to_string())?;

    let request = ParseRequest {
        event: ParseRequest::EVENT,
        candidate_id: pending.candidate_id,
        callback_url: callback_url(&state.config.public_base_url, &pending.talent_id),
        talent_id: pending.talent_id,
        cv_url,
        cv_key: pending.cv_key,
        file_name: pending.file_name,
    };

    state
        .parser
        .notify(&request)
        .await
        .map_err(|e| e.to_string())
}

/// Fire-and-forget: presigns the CV link, notifies the parser, and records
/// the outcome in `parse_status` unless a callback got there first.
/// Returns immediately.
pub fn dispatch(state: &AppState, pending: PendingParse) {
    if !state.parser.enabled() {
        return;
    }

    let state = state.clone();
    tokio::spawn(async move {
        let candidate_id = pending.candidate_id;
        let talent_id = pending.talent_id.clone();

        let outcome = request_parse(&state, pending).await;
        let (status, error) = match &outcome {
            Ok(()) => {
                info!(%talent_id, "CV parse requested");
                (ParseStatus::Requested, None)
            }
            Err(e) => {
                error!(%talent_id, "CV parse request failed: {e}");
                (ParseStatus::Failed, Some(e.as_str()))
            }
        };

        match record_dispatch_outcome(&state.db, candidate_id, status, error).await {
            Ok(true) => {}
            Ok(false) => debug!(%talent_id, "Parser already reported back; keeping its status"),
            Err(e) => error!(%talent_id, "Failed to record parse status: {e}"),
        }
    });
}
