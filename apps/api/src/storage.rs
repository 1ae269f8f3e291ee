//! Object storage for uploaded CVs and job descriptions (S3 / MinIO).

use std::time::Duration;

use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;

const MAX_FILE_NAME_LEN: usize = 100;

/// Reduces a client-supplied file name to `[A-Za-z0-9._-]`.
/// Other character runs collapse to a single `_`. The result never starts
/// with a dot or an underscore.
pub fn sanitize_file_name(name: &str) -> String {
    // Some browsers send the full client path.
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);

    let mut out = String::with_capacity(base.len());
    let mut last_was_sep = false;
    for c in base.chars() {
        if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
            out.push(c);
            last_was_sep = false;
        } else if !last_was_sep {
            out.push('_');
            last_was_sep = true;
        }
    }

    let trimmed = out.trim_start_matches(['.', '_']).trim_end_matches('_');
    let capped: String = if trimmed.len() > MAX_FILE_NAME_LEN {
        // Keep the extension when shortening.
        match trimmed.rsplit_once('.') {
            Some((stem, ext)) if ext.len() < 10 => {
                let keep = MAX_FILE_NAME_LEN - ext.len() - 1;
                format!("{}.{}", &stem[..keep.min(stem.len())], ext)
            }
            _ => trimmed[..MAX_FILE_NAME_LEN].to_string(),
        }
    } else {
        trimmed.to_string()
    };

    if capped.is_empty() {
        "file".to_string()
    } else {
        capped
    }
}

pub fn cv_key(upload_id: Uuid, file_name: &str) -> String {
    format!("cvs/{}/{}", upload_id, sanitize_file_name(file_name))
}

pub fn jd_key(upload_id: Uuid, file_name: &str) -> String {
    format!("job-descriptions/{}/{}", upload_id, sanitize_file_name(file_name))
}

pub async fn put_object(
    s3: &aws_sdk_s3::Client,
    bucket: &str,
    key: &str,
    body: Bytes,
    content_type: &str,
) -> Result<(), AppError> {
    let size = body.len();
    s3.put_object()
        .bucket(bucket)
        .key(key)
        .body(ByteStream::from(body))
        .content_type(content_type)
        .send()
        .await
        .map_err(|e| AppError::S3(format!("upload of {key} failed: {e}")))?;

    info!(bucket, key, size, "Uploaded object");
    Ok(())
}

/// Best-effort removal of an object whose database row was never written.
/// Failures are logged with the key so the orphan can be found later.
pub async fn discard_object(s3: &aws_sdk_s3::Client, bucket: &str, key: &str) -> bool {
    match s3.delete_object().bucket(bucket).key(key).send().await {
        Ok(_) => {
            info!(bucket, key, "Discarded orphaned upload");
            true
        }
        Err(e) => {
            warn!(bucket, key, "Could not discard orphaned upload: {e}");
            false
        }
    }
}

/// Time-limited GET link for a stored object.
pub async fn presign_get(
    s3: &aws_sdk_s3::Client,
    bucket: &str,
    key: &str,
    ttl: Duration,
) -> Result<String, AppError> {
    let config = PresigningConfig::expires_in(ttl)
        .map_err(|e| AppError::S3(format!("invalid presign ttl: {e}")))?;

    let request = s3
        .get_object()
        .bucket(bucket)
        .key(key)
        .presigned(config)
        .await
        .map_err(|e| AppError::S3(format!("presigning {key} failed: {e}")))?;

    Ok(request.uri().to_string())
}
