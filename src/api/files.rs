//! Attachment uploads and file delivery (uploads and public QR images).

use axum::{
    Json,
    body::Body,
    extract::{Multipart, Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use std::sync::Arc;

use super::validation::validate_id;
use super::{ApiError, ApiResponse, AppState};
use crate::services::StorageError;

const QR_CACHE_CONTROL: &str = "public, max-age=86400";

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub message: &'static str,
    pub filename: String,
}

/// `POST /api/upload` with a multipart `file` field.
pub async fn upload_file(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::validation(format!("Invalid multipart body: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let original = field.file_name().unwrap_or_default().to_string();
        if original.is_empty() {
            return Err(ApiError::validation("No selected file"));
        }

        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::validation(format!("Failed to read upload: {e}")))?;

        let filename = state.storage().save_upload(&original, &bytes).await?;
        return Ok((
            StatusCode::CREATED,
            Json(ApiResponse::success(UploadResponse {
                message: "Upload successful",
                filename,
            })),
        ));
    }

    Err(ApiError::validation("No file part"))
}

/// `GET /api/uploads/{filename}`
pub async fn get_upload(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
) -> Result<Response, ApiError> {
    let path = state
        .storage()
        .resolve_upload(&filename)
        .await
        .map_err(not_found_on_bad_name)?;

    send_file(&path, None).await
}

/// `GET /api/qr/{filename}`, public.
pub async fn get_qr(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
) -> Result<Response, ApiError> {
    let path = state
        .storage()
        .resolve_qr(&filename)
        .await
        .map_err(not_found_on_bad_name)?;

    send_file(&path, Some(QR_CACHE_CONTROL)).await
}

/// `GET /api/qr/asset/{asset_id}`, public. 302 to the canonical file URL.
pub async fn get_qr_by_asset(
    State(state): State<Arc<AppState>>,
    Path(asset_id): Path<i32>,
) -> Result<Response, ApiError> {
    let asset_id = validate_id(asset_id, "asset")?;
    let filename = state.asset_service().qr_file(asset_id).await?;
    Ok((
        StatusCode::FOUND,
        [(header::LOCATION, format!("/api/qr/{filename}"))],
    )
        .into_response())
}

/// Rejected names are reported as missing files.
fn not_found_on_bad_name(err: StorageError) -> ApiError {
    match err {
        StorageError::InvalidName | StorageError::ExtensionNotAllowed => {
            ApiError::NotFound(StorageError::NotFound.to_string())
        }
        other => other.into(),
    }
}

async fn send_file(
    path: &std::path::Path,
    cache_control: Option<&'static str>,
) -> Result<Response, ApiError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to read file: {e}")))?;
    let mime = mime_guess::from_path(path).first_or_octet_stream();

    let mut response = (
        [(header::CONTENT_TYPE, mime.as_ref().to_string())],
        Body::from(bytes),
    )
        .into_response();

    if let Some(value) = cache_control {
        response.headers_mut().insert(
            header::CACHE_CONTROL,
            header::HeaderValue::from_static(value),
        );
    }
    Ok(response)
}
