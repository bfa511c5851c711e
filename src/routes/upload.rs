/**
 * Upload Routes
 * Admin image upload into the blob store
 */
use axum::{
    body::Bytes,
    extract::{multipart::MultipartError, Multipart, Query, State},
    http::StatusCode,
    Json,
};
use rand::distr::{Alphanumeric, SampleString};
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::routes::auth::AdminSession;
use crate::routes::{non_empty, SuccessResponse};
use crate::state::AppState;

pub const MAX_FILE_SIZE: usize = 10 * 1024 * 1024; // 10MB
const ALLOWED_TYPES: &[&str] = &[
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/gif",
    "image/webp",
];
const UPLOAD_PREFIX: &str = "blog-images";
const TOO_LARGE: &str = "File too large. Maximum size is 10MB.";

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub url: String,
    pub filename: String,
    pub size: usize,
    #[serde(rename = "type")]
    pub mime_type: String,
}

#[derive(Debug, Deserialize)]
pub struct DeleteQuery {
    pub url: Option<String>,
}

fn validate_image_magic_bytes(bytes: &[u8]) -> Option<&'static str> {
    if bytes.len() < 4 {
        return None;
    }
    match bytes {
        // JPEG: FF D8 FF
        [0xFF, 0xD8, 0xFF, ..] => Some("image/jpeg"),
        // PNG: 89 50 4E 47
        [0x89, 0x50, 0x4E, 0x47, ..] => Some("image/png"),
        // GIF: 47 49 46 38
        [0x47, 0x49, 0x46, 0x38, ..] => Some("image/gif"),
        // WebP: 52 49 46 46 ... 57 45 42 50
        [0x52, 0x49, 0x46, 0x46, _, _, _, _, 0x57, 0x45, 0x42, 0x50, ..] => Some("image/webp"),
        _ => None,
    }
}

/// `image/jpg` is a common alias of `image/jpeg`.
fn canonical_mime(mime: &str) -> &str {
    match mime {
        "image/jpg" => "image/jpeg",
        other => other,
    }
}

fn extension_for(mime: &str) -> &'static str {
    match mime {
        "image/png" => "png",
        "image/gif" => "gif",
        "image/webp" => "webp",
        _ => "jpg",
    }
}

/// `blog-images/<unix-millis>-<random>.<ext>`
fn blob_pathname(mime: &str) -> String {
    let suffix = Alphanumeric
        .sample_string(&mut rand::rng(), 12)
        .to_lowercase();
    format!(
        "{}/{}-{}.{}",
        UPLOAD_PREFIX,
        chrono::Utc::now().timestamp_millis(),
        suffix,
        extension_for(mime)
    )
}

/// Body-limit overruns surface as multipart errors; report them as size errors.
fn multipart_error(e: MultipartError) -> ApiError {
    tracing::warn!(error = %e, "Multipart error");
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::bad_request(TOO_LARGE)
    } else {
        ApiError::bad_request("Invalid multipart data")
    }
}

/// Pull the `file` field out of the form, skipping any other fields.
async fn read_file_field(multipart: &mut Multipart) -> ApiResult<(String, Bytes)> {
    loop {
        let field = multipart.next_field().await.map_err(multipart_error)?;
        let Some(field) = field else {
            return Err(ApiError::bad_request("No file provided"));
        };
        if field.name() != Some("file") {
            continue;
        }

        let content_type = field.content_type().unwrap_or_default().to_lowercase();
        let bytes = field.bytes().await.map_err(multipart_error)?;
        return Ok((content_type, bytes));
    }
}

/// POST /api/upload/image
pub async fn upload_image(
    _admin: AdminSession,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<UploadResponse>> {
    let (content_type, bytes) = read_file_field(&mut multipart).await?;

    if !ALLOWED_TYPES.contains(&content_type.as_str()) {
        return Err(ApiError::bad_request(
            "Invalid file type. Only JPEG, PNG, GIF, and WebP are allowed.",
        ));
    }
    if bytes.len() > MAX_FILE_SIZE {
        return Err(ApiError::bad_request(TOO_LARGE));
    }
    if bytes.is_empty() {
        return Err(ApiError::bad_request("File is empty"));
    }
    match validate_image_magic_bytes(&bytes) {
        None => {
            return Err(ApiError::bad_request(
                "File content does not match an allowed image type",
            ))
        }
        Some(detected) if detected != canonical_mime(&content_type) => {
            tracing::warn!(declared = %content_type, detected, "Upload type mismatch");
            return Err(ApiError::bad_request(
                "File content does not match the declared type",
            ));
        }
        Some(_) => {}
    }

    let size = bytes.len();
    let pathname = blob_pathname(&content_type);
    let blob = state.blobs.put(&pathname, bytes, &content_type).await?;
    tracing::info!(pathname = %blob.pathname, size, "Image uploaded");

    Ok(Json(UploadResponse {
        url: blob.url,
        filename: pathname,
        size,
        mime_type: content_type,
    }))
}

/// DELETE /api/upload/image?url=
pub async fn delete_image(
    _admin: AdminSession,
    State(state): State<AppState>,
    Query(query): Query<DeleteQuery>,
) -> ApiResult<Json<SuccessResponse>> {
    let url = non_empty(query.url).ok_or_else(|| ApiError::bad_request("No URL provided"))?;
    state.blobs.delete(&url).await?;
    tracing::info!(url = %url, "Image deleted");
    Ok(Json(SuccessResponse { success: true }))
}
