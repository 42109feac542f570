// Extracts the uploaded image and its parameters from an upscale request.
// Two shapes are accepted: a multipart form with an "image" file field plus
// optional text fields, or a raw image body (parameters then come from the
// query string).

use axum::{
    body,
    extract::{FromRequest, Multipart, Request},
    http::header,
};
use tracing::debug;

use crate::error::AppError;

/// Raw upload plus whatever parameters travelled with it as form fields.
#[derive(Debug, Default)]
pub struct UpscalePayload {
    pub data: Vec<u8>,
    pub mode: Option<String>,
    pub method: Option<String>,
    pub scale_factor: Option<String>,
}

pub async fn extract_upscale_payload(request: Request) -> Result<UpscalePayload, AppError> {
    let content_type = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();

    if content_type.starts_with("multipart/form-data") {
        extract_multipart_payload(request).await
    } else {
        extract_direct_payload(request, &content_type).await
    }
}

async fn extract_multipart_payload(request: Request) -> Result<UpscalePayload, AppError> {
    let mut multipart = Multipart::from_request(request, &())
        .await
        .map_err(|e| AppError::BadRequest(format!("Failed to process multipart request: {}", e)))?;

    let mut payload = UpscalePayload::default();
    let mut found_image = false;

    while let Some(field) = multipart.next_field().await? {
        // The name is copied out first because reading the field consumes it.
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "image" => {
                debug!(
                    content_type = field.content_type().unwrap_or("unknown"),
                    "Received image field"
                );
                payload.data = field.bytes().await?.to_vec();
                found_image = true;
            }
            "mode" => payload.mode = Some(field.text().await?),
            "method" => payload.method = Some(field.text().await?),
            "scale_factor" => payload.scale_factor = Some(field.text().await?),
            other => {
                debug!(field = other, "Ignoring multipart field");
            }
        }
    }

    if !found_image {
        return Err(AppError::BadRequest(
            "Missing 'image' field in multipart request".to_string(),
        ));
    }

    Ok(payload)
}

async fn extract_direct_payload(
    request: Request,
    content_type: &str,
) -> Result<UpscalePayload, AppError> {
    let acceptable = content_type
        .parse::<mime::Mime>()
        .map(|m| m.type_() == mime::IMAGE || m == mime::APPLICATION_OCTET_STREAM)
        .unwrap_or(false);
    if !acceptable {
        return Err(AppError::BadRequest(format!(
            "Content-Type '{}' is not supported. Expected multipart/form-data, image/*, or application/octet-stream",
            content_type
        )));
    }

    let bytes = body::to_bytes(request.into_body(), usize::MAX)
        .await
        .map_err(|e| AppError::BadRequest(format!("Failed to read request body: {}", e)))?;

    Ok(UpscalePayload {
        data: bytes.to_vec(),
        ..UpscalePayload::default()
    })
}
