// Contains the Axum handler functions for each API endpoint.
// These handlers process requests, invoke the upscale pipeline, and
// generate responses.

use crate::{
    error::AppError,
    extract_request_data::{UpscalePayload, extract_upscale_payload},
    models::*,
    orchestrator::{BackendMode, UpscaleRequest, Upscaler},
    resampler::{Kernel, SCALE_FACTORS},
    validator::SUPPORTED_FORMATS,
};
use axum::{
    Json,
    extract::{Query, Request, State},
};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

pub type SharedUpscaler = Arc<Upscaler>;

// --- POST /upscale ---
// Accepts an uploaded image (multipart "image" field or raw body) and
// returns the upscaled result as a data-URI.
pub async fn upscale(
    State(upscaler): State<SharedUpscaler>,
    Query(query): Query<UpscaleQuery>,
    request: Request,
) -> Result<Json<UpscaleResponse>, AppError> {
    let request_id = Uuid::new_v4();

    let payload = extract_upscale_payload(request).await?;
    let params = resolve_request(&query, &payload)?;

    info!(
        %request_id,
        mode = params.mode.as_str(),
        method = params.kernel.as_str(),
        scale_factor = params.scale_factor,
        size = payload.data.len(),
        "Upscale request received"
    );

    let result = upscaler.upscale(payload.data, &params).await?;

    let processing_time = (result.elapsed.as_secs_f64() * 100.0).round() / 100.0;
    info!(
        %request_id,
        processing_time,
        original_size = result.original_size,
        result_size = result.result_size,
        "Upscale request completed"
    );

    let image = format!(
        "data:{};base64,{}",
        result.kind.mime(),
        BASE64.encode(&result.bytes)
    );

    let (method, scale_factor) = match params.mode {
        BackendMode::Local => (
            Some(params.kernel.as_str().to_string()),
            Some(params.scale_factor),
        ),
        BackendMode::Remote => (None, None),
    };

    Ok(Json(UpscaleResponse {
        success: true,
        image,
        processing_time,
        original_size: result.original_size,
        result_size: result.result_size,
        method,
        scale_factor,
    }))
}

// Merge form fields and query parameters into a typed request. Form fields
// win; defaults are local mode, lanczos, 2x.
fn resolve_request(
    query: &UpscaleQuery,
    payload: &UpscalePayload,
) -> Result<UpscaleRequest, AppError> {
    let mode = payload
        .mode
        .as_deref()
        .or(query.mode.as_deref())
        .unwrap_or("local")
        .trim()
        .to_ascii_lowercase()
        .parse::<BackendMode>()
        .map_err(AppError::BadRequest)?;

    let kernel = payload
        .method
        .as_deref()
        .or(query.method.as_deref())
        .unwrap_or("lanczos")
        .trim()
        .to_ascii_lowercase()
        .parse::<Kernel>()
        .map_err(AppError::BadRequest)?;

    let raw_scale = payload
        .scale_factor
        .as_deref()
        .or(query.scale_factor.as_deref())
        .unwrap_or("2");
    let scale_factor = raw_scale.trim().parse::<u32>().map_err(|_| {
        AppError::BadRequest(format!(
            "Invalid scale_factor '{}': must be an integer",
            raw_scale
        ))
    })?;

    Ok(UpscaleRequest {
        mode,
        kernel,
        scale_factor,
    })
}

// --- GET /health ---
pub async fn health(State(upscaler): State<SharedUpscaler>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        backend_token_configured: upscaler.config().backend_token_configured(),
    })
}

// --- GET /info ---
// Static description of configured limits and capabilities.
pub async fn info(State(upscaler): State<SharedUpscaler>) -> Json<InfoResponse> {
    let config = upscaler.config();
    Json(InfoResponse {
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        max_file_size_mb: config.max_file_size_mib(),
        max_dimension: config.max_dimension,
        supported_formats: SUPPORTED_FORMATS.to_vec(),
        methods: vec![Kernel::Lanczos.as_str(), Kernel::Bicubic.as_str()],
        scale_factors: SCALE_FACTORS.to_vec(),
        modes: vec![BackendMode::Local.as_str(), BackendMode::Remote.as_str()],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_local_lanczos_2x() {
        let request =
            resolve_request(&UpscaleQuery::default(), &UpscalePayload::default()).unwrap();
        assert_eq!(request.mode, BackendMode::Local);
        assert_eq!(request.kernel, Kernel::Lanczos);
        assert_eq!(request.scale_factor, 2);
    }

    #[test]
    fn form_fields_override_query() {
        let query = UpscaleQuery {
            method: Some("lanczos".to_string()),
            scale_factor: Some("2".to_string()),
            ..UpscaleQuery::default()
        };
        let payload = UpscalePayload {
            method: Some("bicubic".to_string()),
            scale_factor: Some("3".to_string()),
            ..UpscalePayload::default()
        };
        let request = resolve_request(&query, &payload).unwrap();
        assert_eq!(request.kernel, Kernel::Bicubic);
        assert_eq!(request.scale_factor, 3);
    }

    #[test]
    fn unknown_method_rejected() {
        let payload = UpscalePayload {
            method: Some("nearest".to_string()),
            ..UpscalePayload::default()
        };
        let err = resolve_request(&UpscaleQuery::default(), &payload).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn non_numeric_scale_factor_rejected() {
        let payload = UpscalePayload {
            scale_factor: Some("two".to_string()),
            ..UpscalePayload::default()
        };
        let err = resolve_request(&UpscaleQuery::default(), &payload).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn method_is_case_insensitive() {
        let payload = UpscalePayload {
            method: Some("Bicubic".to_string()),
            mode: Some("LOCAL".to_string()),
            ..UpscalePayload::default()
        };
        let request = resolve_request(&UpscaleQuery::default(), &payload).unwrap();
        assert_eq!(request.kernel, Kernel::Bicubic);
        assert_eq!(request.mode, BackendMode::Local);
    }
}
