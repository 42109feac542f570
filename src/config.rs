// Command line / environment configuration and the runtime service config
// handed to the upscale pipeline.

use clap::Parser;
use std::time::Duration;

/// Command line arguments for superres-server
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct AppConfig {
    /// Hostname/IP to bind the server to.
    /// If this option is specified without value, it will default to "*", meaning the server will listen on all interfaces.
    #[arg(long, env = "SUPERRES_HOST", default_value = "localhost", num_args = 0..=1, default_missing_value = "*")]
    pub host: String,

    /// Port number to listen on.
    #[arg(short, long, env = "SUPERRES_PORT", default_value_t = 5001)]
    pub port: u16,

    /// URL of the remote inference backend used in remote mode.
    #[arg(
        long,
        env = "SUPERRES_BACKEND_URL",
        default_value = "https://api-inference.huggingface.co/models/stabilityai/stable-diffusion-x4-upscaler"
    )]
    pub backend_url: String,

    /// Bearer token sent to the remote inference backend.
    /// Remote mode is rejected when this is empty.
    #[arg(long, env = "SUPERRES_BACKEND_TOKEN", default_value = "")]
    pub backend_token: String,

    /// Maximum accepted upload size in MiB.
    #[arg(long, env = "SUPERRES_MAX_FILE_SIZE_MIB", default_value_t = 5)]
    pub max_file_size_mib: usize,

    /// Maximum accepted image width/height in pixels.
    #[arg(long, env = "SUPERRES_MAX_DIMENSION", default_value_t = 4096)]
    pub max_dimension: u32,

    /// Maximum number of attempts against the remote backend per request.
    #[arg(long, env = "SUPERRES_MAX_RETRIES", default_value_t = 3)]
    pub max_retries: u32,

    /// Connect timeout for remote backend calls, in seconds.
    #[arg(long, env = "SUPERRES_CONNECT_TIMEOUT_SECS", default_value_t = 10)]
    pub connect_timeout_secs: u64,

    /// Total request timeout for remote backend calls, in seconds.
    /// Inference can be slow, so this is deliberately much longer than the connect timeout.
    #[arg(long, env = "SUPERRES_READ_TIMEOUT_SECS", default_value_t = 120)]
    pub read_timeout_secs: u64,
}

/// Immutable configuration for the upscale pipeline, fixed for the lifetime
/// of the process. Built once from [`AppConfig`] and shared by reference so
/// tests can inject fake endpoints and tokens without touching process
/// environment.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub backend_url: String,
    pub backend_token: String,
    pub max_file_size: usize,
    pub max_dimension: u32,
    pub max_retries: u32,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
}

impl AppConfig {
    pub fn service_config(&self) -> ServiceConfig {
        ServiceConfig {
            backend_url: self.backend_url.clone(),
            backend_token: self.backend_token.clone(),
            max_file_size: self.max_file_size_mib * 1024 * 1024,
            max_dimension: self.max_dimension,
            max_retries: self.max_retries,
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            read_timeout: Duration::from_secs(self.read_timeout_secs),
        }
    }
}

impl ServiceConfig {
    pub fn backend_token_configured(&self) -> bool {
        !self.backend_token.is_empty()
    }

    pub fn max_file_size_mib(&self) -> usize {
        self.max_file_size / (1024 * 1024)
    }
}
