// Defines data structures for API request and response bodies,
// using Serde for JSON serialization and deserialization.

use serde::{Deserialize, Serialize};

// Successful response for POST /upscale. `method` and `scale_factor` are
// only present for locally processed requests.
#[derive(Serialize, Debug)]
pub struct UpscaleResponse {
    pub success: bool,
    // data-URI with the upscaled image, e.g. "data:image/png;base64,...".
    pub image: String,
    // Wall-clock processing time in seconds, rounded to two decimals.
    pub processing_time: f64,
    pub original_size: usize,
    pub result_size: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale_factor: Option<u32>,
}

// Query parameters for POST /upscale. Used when the image arrives as a raw
// body; multipart form fields of the same names take precedence.
#[derive(Deserialize, Debug, Default)]
pub struct UpscaleQuery {
    pub mode: Option<String>,
    pub method: Option<String>,
    pub scale_factor: Option<String>,
}

// Response for GET /health.
#[derive(Serialize, Debug)]
pub struct HealthResponse {
    pub status: &'static str,
    pub backend_token_configured: bool,
}

// Response for GET /info, describing configured limits and capabilities.
#[derive(Serialize, Debug)]
pub struct InfoResponse {
    pub name: &'static str,
    pub version: &'static str,
    pub max_file_size_mb: usize,
    pub max_dimension: u32,
    pub supported_formats: Vec<&'static str>,
    pub methods: Vec<&'static str>,
    pub scale_factors: Vec<u32>,
    pub modes: Vec<&'static str>,
}
