// Local upscaling backend. Deterministic resampling with a selectable
// interpolation kernel, followed by a fixed sharpen and contrast pass,
// re-encoded according to the source format.

use crate::validator::{ImageBuffer, ImageKind};
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};
use std::fmt;
use std::io::Cursor;
use std::str::FromStr;

/// Interpolation kernels available for local resampling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kernel {
    /// Windowed-sinc interpolation. Higher quality, higher cost.
    Lanczos,
    /// Cubic-convolution interpolation. Cheaper than Lanczos.
    Bicubic,
}

impl Kernel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Kernel::Lanczos => "lanczos",
            Kernel::Bicubic => "bicubic",
        }
    }

    fn filter_type(&self) -> FilterType {
        match self {
            Kernel::Lanczos => FilterType::Lanczos3,
            Kernel::Bicubic => FilterType::CatmullRom,
        }
    }
}

impl FromStr for Kernel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "lanczos" => Ok(Kernel::Lanczos),
            "bicubic" => Ok(Kernel::Bicubic),
            other => Err(format!(
                "Unknown interpolation method '{}'. Supported methods: lanczos, bicubic",
                other
            )),
        }
    }
}

/// Integer scale factors accepted for local upscaling.
pub const SCALE_FACTORS: [u32; 3] = [2, 3, 4];

// Enhancement constants applied to every locally upscaled image.
const SHARPEN_SIGMA: f32 = 1.5;
const SHARPEN_THRESHOLD: i32 = 3;
const CONTRAST_BOOST: f32 = 5.0;

// JPEG sources are re-encoded at high quality; re-encoding at a lower
// setting compounds the artifacts already present in the input.
const JPEG_QUALITY: u8 = 95;

#[derive(Debug)]
pub enum ProcessingError {
    InvalidParameter(String),
    Image(String),
    Task(String),
}

impl fmt::Display for ProcessingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessingError::InvalidParameter(msg) => write!(f, "{}", msg),
            ProcessingError::Image(msg) => write!(f, "Image processing failed: {}", msg),
            ProcessingError::Task(msg) => write!(f, "Image processing task failed: {}", msg),
        }
    }
}

impl std::error::Error for ProcessingError {}

/// Upscale `image` by `scale_factor` using `kernel`, returning the encoded
/// output bytes and their format.
///
/// Output dimensions are exactly `(width * scale_factor, height * scale_factor)`.
/// Identical input and parameters always produce byte-identical output: the
/// kernel, the enhancement constants, and the encoders carry no randomness.
pub fn resample(
    image: &ImageBuffer,
    kernel: Kernel,
    scale_factor: u32,
) -> Result<(Vec<u8>, ImageKind), ProcessingError> {
    if !SCALE_FACTORS.contains(&scale_factor) {
        return Err(ProcessingError::InvalidParameter(format!(
            "Invalid scale factor {}: must be one of 2, 3, 4",
            scale_factor
        )));
    }

    let decoded = image::load_from_memory_with_format(image.bytes(), image.kind().image_format())
        .map_err(|e| ProcessingError::Image(format!("decode: {}", e)))?;

    let target_width = image.width() * scale_factor;
    let target_height = image.height() * scale_factor;

    let upscaled = decoded
        .resize_exact(target_width, target_height, kernel.filter_type())
        .unsharpen(SHARPEN_SIGMA, SHARPEN_THRESHOLD)
        .adjust_contrast(CONTRAST_BOOST);

    encode(&upscaled, image.kind())
}

// JPEG in, JPEG out at high quality; everything else becomes PNG, which is
// lossless regardless of the quality setting.
fn encode(image: &DynamicImage, source_kind: ImageKind) -> Result<(Vec<u8>, ImageKind), ProcessingError> {
    let mut buffer = Cursor::new(Vec::new());

    match source_kind {
        ImageKind::Jpeg => {
            // JPEG has no alpha channel; flatten to RGB before encoding.
            let rgb = image.to_rgb8();
            let mut encoder =
                image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buffer, JPEG_QUALITY);
            encoder
                .encode(
                    rgb.as_raw(),
                    rgb.width(),
                    rgb.height(),
                    image::ExtendedColorType::Rgb8,
                )
                .map_err(|e| ProcessingError::Image(format!("JPEG encode: {}", e)))?;
            Ok((buffer.into_inner(), ImageKind::Jpeg))
        }
        _ => {
            image
                .write_to(&mut buffer, ImageFormat::Png)
                .map_err(|e| ProcessingError::Image(format!("PNG encode: {}", e)))?;
            Ok((buffer.into_inner(), ImageKind::Png))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validator::validate;
    use image::RgbImage;

    fn test_image(width: u32, height: u32, format: ImageFormat) -> ImageBuffer {
        // Checkerboard so resampling has edges to work on.
        let img = RgbImage::from_fn(width, height, |x, y| {
            if (x + y) % 2 == 0 {
                image::Rgb([255, 0, 0])
            } else {
                image::Rgb([0, 255, 0])
            }
        });
        let mut buffer = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img).write_to(&mut buffer, format).unwrap();
        validate(buffer.into_inner(), 4096).unwrap()
    }

    #[test]
    fn output_dimensions_match_scale_factor() {
        let image = test_image(50, 30, ImageFormat::Png);
        for scale in SCALE_FACTORS {
            let (bytes, kind) = resample(&image, Kernel::Lanczos, scale).unwrap();
            assert_eq!(kind, ImageKind::Png);
            let decoded = image::load_from_memory(&bytes).unwrap();
            assert_eq!(decoded.width(), 50 * scale);
            assert_eq!(decoded.height(), 30 * scale);
        }
    }

    #[test]
    fn resampling_is_deterministic() {
        let image = test_image(40, 40, ImageFormat::Png);
        let (first, _) = resample(&image, Kernel::Lanczos, 2).unwrap();
        let (second, _) = resample(&image, Kernel::Lanczos, 2).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn kernels_produce_distinct_output() {
        let image = test_image(40, 40, ImageFormat::Png);
        let (lanczos, _) = resample(&image, Kernel::Lanczos, 2).unwrap();
        let (bicubic, _) = resample(&image, Kernel::Bicubic, 2).unwrap();
        assert_ne!(lanczos, bicubic);
    }

    #[test]
    fn jpeg_source_is_reencoded_as_jpeg() {
        let image = test_image(24, 24, ImageFormat::Jpeg);
        let (bytes, kind) = resample(&image, Kernel::Bicubic, 2).unwrap();
        assert_eq!(kind, ImageKind::Jpeg);
        assert_eq!(image::guess_format(&bytes).unwrap(), ImageFormat::Jpeg);
    }

    #[test]
    fn bmp_source_is_encoded_as_png() {
        let image = test_image(24, 24, ImageFormat::Bmp);
        let (bytes, kind) = resample(&image, Kernel::Lanczos, 2).unwrap();
        assert_eq!(kind, ImageKind::Png);
        assert_eq!(image::guess_format(&bytes).unwrap(), ImageFormat::Png);
    }

    #[test]
    fn rejected_scale_factor() {
        let image = test_image(10, 10, ImageFormat::Png);
        for scale in [0, 1, 5, 16] {
            let err = resample(&image, Kernel::Lanczos, scale).unwrap_err();
            assert!(matches!(err, ProcessingError::InvalidParameter(_)));
        }
    }
}
