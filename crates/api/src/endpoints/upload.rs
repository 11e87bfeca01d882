//! Image upload endpoint.

use axum::{
    Router,
    extract::{Multipart, State},
    routing::post,
};
use huddle_common::{AppError, AppResult, generate_storage_key};
use image::ImageFormat;
use serde::Serialize;

use crate::{extractors::AuthSession, middleware::AppState, response::ApiResponse};

const ACCEPTED_FORMATS: [ImageFormat; 4] = [
    ImageFormat::Png,
    ImageFormat::Jpeg,
    ImageFormat::Gif,
    ImageFormat::WebP,
];

/// Upload response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub url: String,
    pub content_type: String,
    pub md5: String,
}

/// Sniff the image format from its bytes; the client's content type is not trusted.
fn detect_format(data: &[u8]) -> AppResult<ImageFormat> {
    image::guess_format(data)
        .ok()
        .filter(|f| ACCEPTED_FORMATS.contains(f))
        .ok_or_else(|| AppError::BadRequest("Unsupported image format".to_string()))
}

/// Store an image and return its public URL.
async fn upload(
    AuthSession(session): AuthSession,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<ApiResponse<UploadResponse>> {
    let mut data: Option<Vec<u8>> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        if field.name() == Some("file") {
            data = Some(
                field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?
                    .to_vec(),
            );
        }
    }

    let data = data.ok_or_else(|| AppError::BadRequest("No file provided".to_string()))?;
    if data.is_empty() {
        return Err(AppError::BadRequest("Empty file".to_string()));
    }
    if data.len() > state.settings.max_upload_bytes {
        return Err(AppError::BadRequest(format!(
            "File exceeds {} bytes",
            state.settings.max_upload_bytes
        )));
    }

    let format = detect_format(&data)?;
    let extension = format.extensions_str().first().copied().unwrap_or("bin");
    let key = generate_storage_key(&session.user_id, &format!("upload.{extension}"));

    let stored = state
        .storage
        .upload(&key, &data, format.to_mime_type())
        .await?;

    tracing::info!(user_id = %session.user_id, key = %stored.key, size = stored.size, "Image uploaded");

    Ok(ApiResponse::ok(UploadResponse {
        url: stored.url,
        content_type: stored.content_type,
        md5: stored.md5,
    }))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/upload", post(upload))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_HEADER: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

    #[test]
    fn test_detect_png() {
        assert_eq!(detect_format(PNG_HEADER).ok(), Some(ImageFormat::Png));
    }

    #[test]
    fn test_detect_jpeg() {
        let jpeg = [0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10];
        assert_eq!(detect_format(&jpeg).ok(), Some(ImageFormat::Jpeg));
    }

    #[test]
    fn test_rejects_non_image() {
        assert!(matches!(
            detect_format(b"#!/bin/sh\necho hi"),
            Err(AppError::BadRequest(_))
        ));
    }
}
