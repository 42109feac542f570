// Defines the API-facing error type and its conversion into HTTP responses.
//
// Validation failures are always client-caused and map to 4xx with their
// specific message. Local processing failures map to 5xx with a sanitized
// message. Backend rejections pass the backend's status through; every
// other backend failure becomes a 502.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::orchestrator::RequestError;
use crate::remote::BackendError;
use crate::resampler::ProcessingError;
use crate::validator::ValidationError;

#[derive(Debug)]
pub enum AppError {
    // Malformed request surface: bad parameters, missing fields.
    BadRequest(String),
    Multipart(axum::extract::multipart::MultipartError),

    // Failures from the upscale pipeline.
    Request(RequestError),

    // Miscellaneous server issues. The message is logged, never returned.
    InternalServerError(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Multipart(e) => (
                StatusCode::BAD_REQUEST,
                format!("Invalid multipart request: {}", e),
            ),
            AppError::Request(err) => request_error_response(err),
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal server error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error, please retry later".to_string(),
                )
            }
        };

        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}

fn request_error_response(err: RequestError) -> (StatusCode, String) {
    match err {
        RequestError::Validation(e) => {
            let status = match e {
                ValidationError::FileTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
                _ => StatusCode::BAD_REQUEST,
            };
            (status, e.to_string())
        }
        RequestError::Processing(e) => match e {
            ProcessingError::InvalidParameter(msg) => (StatusCode::BAD_REQUEST, msg),
            // Decode/encode internals stay in the logs.
            other => {
                tracing::error!("Local processing failed: {}", other);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Image processing failed".to_string(),
                )
            }
        },
        RequestError::Backend(e) => match e {
            BackendError::NotConfigured => (StatusCode::BAD_REQUEST, e.to_string()),
            BackendError::Rejected { status, .. } => {
                let code =
                    StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY);
                (code, e.to_string())
            }
            BackendError::Exhausted { .. } | BackendError::EmptyResponse => {
                (StatusCode::BAD_GATEWAY, e.to_string())
            }
            BackendError::Transport(msg) => {
                tracing::error!("Backend transport failure: {}", msg);
                (
                    StatusCode::BAD_GATEWAY,
                    "Upscaling backend request failed".to_string(),
                )
            }
        },
    }
}

// From impls so handlers can use `?` on pipeline and extraction errors.

impl From<RequestError> for AppError {
    fn from(err: RequestError) -> Self {
        AppError::Request(err)
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::Request(RequestError::Validation(err))
    }
}

impl From<ProcessingError> for AppError {
    fn from(err: ProcessingError) -> Self {
        AppError::Request(RequestError::Processing(err))
    }
}

impl From<BackendError> for AppError {
    fn from(err: BackendError) -> Self {
        AppError::Request(RequestError::Backend(err))
    }
}

impl From<axum::extract::multipart::MultipartError> for AppError {
    fn from(err: axum::extract::multipart::MultipartError) -> Self {
        AppError::Multipart(err)
    }
}
