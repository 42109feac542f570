// Upscale orchestration: per-request backend selection, validation, timing,
// and result packaging. Retry responsibility lives entirely in the remote
// client; any backend failure surfaces here unchanged.

use crate::config::ServiceConfig;
use crate::remote::{BackendError, RemoteClient};
use crate::resampler::{self, Kernel, ProcessingError};
use crate::validator::{self, ImageKind, ValidationError};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Which component performs the actual upscaling for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendMode {
    Local,
    Remote,
}

impl BackendMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendMode::Local => "local",
            BackendMode::Remote => "remote",
        }
    }
}

impl FromStr for BackendMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "local" => Ok(BackendMode::Local),
            "remote" => Ok(BackendMode::Remote),
            other => Err(format!(
                "Unknown mode '{}'. Supported modes: local, remote",
                other
            )),
        }
    }
}

/// Parameters for one upscale request. Owned by a single in-flight request.
#[derive(Debug, Clone, Copy)]
pub struct UpscaleRequest {
    pub mode: BackendMode,
    pub kernel: Kernel,
    pub scale_factor: u32,
}

/// The finished product of one request.
#[derive(Debug)]
pub struct UpscaleResult {
    pub bytes: Vec<u8>,
    pub kind: ImageKind,
    pub elapsed: Duration,
    pub original_size: usize,
    pub result_size: usize,
}

#[derive(Debug)]
pub enum RequestError {
    Validation(ValidationError),
    Processing(ProcessingError),
    Backend(BackendError),
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestError::Validation(e) => e.fmt(f),
            RequestError::Processing(e) => e.fmt(f),
            RequestError::Backend(e) => e.fmt(f),
        }
    }
}

impl std::error::Error for RequestError {}

impl From<ValidationError> for RequestError {
    fn from(err: ValidationError) -> Self {
        RequestError::Validation(err)
    }
}

impl From<ProcessingError> for RequestError {
    fn from(err: ProcessingError) -> Self {
        RequestError::Processing(err)
    }
}

impl From<BackendError> for RequestError {
    fn from(err: BackendError) -> Self {
        RequestError::Backend(err)
    }
}

/// Drives a single upload through validation and the selected backend.
/// Holds no per-request state; one instance serves all requests.
pub struct Upscaler {
    config: Arc<ServiceConfig>,
    remote: RemoteClient,
}

impl Upscaler {
    pub fn new(config: Arc<ServiceConfig>) -> Result<Self, BackendError> {
        let remote = RemoteClient::new(config.clone())?;
        Ok(Upscaler { config, remote })
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Validate `raw` and upscale it with the backend named in `request`.
    ///
    /// The size ceiling is enforced before any decoding so oversized
    /// payloads are rejected without wasted decode effort. The elapsed
    /// duration covers validation plus the backend call.
    pub async fn upscale(
        &self,
        raw: Vec<u8>,
        request: &UpscaleRequest,
    ) -> Result<UpscaleResult, RequestError> {
        let original_size = raw.len();
        if original_size > self.config.max_file_size {
            return Err(ValidationError::FileTooLarge {
                size: original_size,
                limit: self.config.max_file_size,
            }
            .into());
        }

        let started = Instant::now();
        let image = validator::validate(raw, self.config.max_dimension)?;

        tracing::info!(
            format = image.kind().as_str(),
            width = image.width(),
            height = image.height(),
            size = original_size,
            mode = request.mode.as_str(),
            "Image validated, dispatching to backend"
        );

        let (bytes, kind) = match request.mode {
            BackendMode::Local => {
                let kernel = request.kernel;
                let scale_factor = request.scale_factor;
                // Resampling is CPU-bound; keep it off the async workers.
                tokio::task::spawn_blocking(move || {
                    resampler::resample(&image, kernel, scale_factor)
                })
                .await
                .map_err(|e| ProcessingError::Task(e.to_string()))??
            }
            BackendMode::Remote => {
                let bytes = self.remote.infer(&image).await?;
                // The reference inference backend answers with PNG data.
                (bytes, ImageKind::Png)
            }
        };

        let elapsed = started.elapsed();
        let result_size = bytes.len();

        Ok(UpscaleResult {
            bytes,
            kind,
            elapsed,
            original_size,
            result_size,
        })
    }
}
