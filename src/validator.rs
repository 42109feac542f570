// Upload validation. Turns an untrusted byte buffer into an ImageBuffer
// whose format and dimensions have been checked against the configured
// limits. Only the header is inspected here; the full pixel decode happens
// later in whichever backend processes the image.

use image::{ImageFormat, ImageReader};
use std::fmt;
use std::io::Cursor;

/// Input formats accepted by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Png,
    Jpeg,
    Gif,
    Bmp,
    Webp,
}

impl ImageKind {
    fn from_image_format(format: ImageFormat) -> Option<Self> {
        match format {
            ImageFormat::Png => Some(ImageKind::Png),
            ImageFormat::Jpeg => Some(ImageKind::Jpeg),
            ImageFormat::Gif => Some(ImageKind::Gif),
            ImageFormat::Bmp => Some(ImageKind::Bmp),
            ImageFormat::WebP => Some(ImageKind::Webp),
            _ => None,
        }
    }

    pub fn image_format(&self) -> ImageFormat {
        match self {
            ImageKind::Png => ImageFormat::Png,
            ImageKind::Jpeg => ImageFormat::Jpeg,
            ImageKind::Gif => ImageFormat::Gif,
            ImageKind::Bmp => ImageFormat::Bmp,
            ImageKind::Webp => ImageFormat::WebP,
        }
    }

    pub fn mime(&self) -> &'static str {
        match self {
            ImageKind::Png => "image/png",
            ImageKind::Jpeg => "image/jpeg",
            ImageKind::Gif => "image/gif",
            ImageKind::Bmp => "image/bmp",
            ImageKind::Webp => "image/webp",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ImageKind::Png => "png",
            ImageKind::Jpeg => "jpeg",
            ImageKind::Gif => "gif",
            ImageKind::Bmp => "bmp",
            ImageKind::Webp => "webp",
        }
    }
}

/// All formats the validator accepts, in the order reported by /info.
pub const SUPPORTED_FORMATS: [&str; 5] = ["png", "jpeg", "gif", "bmp", "webp"];

/// A validated uploaded image. Immutable once constructed; the only way to
/// obtain one is [`validate`].
#[derive(Debug, Clone, PartialEq)]
pub struct ImageBuffer {
    bytes: Vec<u8>,
    kind: ImageKind,
    width: u32,
    height: u32,
}

impl ImageBuffer {
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn kind(&self) -> ImageKind {
        self.kind
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum ValidationError {
    EmptyInput,
    UnsupportedFormat(String),
    InvalidDimensions {
        width: u32,
        height: u32,
        max: u32,
    },
    /// Raised by the caller before decoding, never by `validate` itself.
    FileTooLarge {
        size: usize,
        limit: usize,
    },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::EmptyInput => write!(f, "Uploaded image data is empty"),
            ValidationError::UnsupportedFormat(detail) => {
                write!(
                    f,
                    "Unsupported image format ({}). Supported formats: {}",
                    detail,
                    SUPPORTED_FORMATS.join(", ")
                )
            }
            ValidationError::InvalidDimensions { width, height, max } => {
                write!(
                    f,
                    "Invalid image dimensions {}x{}: both sides must be between 1 and {} pixels",
                    width, height, max
                )
            }
            ValidationError::FileTooLarge { size, limit } => {
                write!(
                    f,
                    "Image file of {} bytes exceeds the {} byte limit",
                    size, limit
                )
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Parse and sanity-check an uploaded byte buffer.
///
/// Checks, in order: non-empty input, recognized and allowed format, and
/// header dimensions within `(1..=max_dimension)` on both sides. The buffer
/// is taken by value and moved into the returned [`ImageBuffer`] unchanged.
pub fn validate(bytes: Vec<u8>, max_dimension: u32) -> Result<ImageBuffer, ValidationError> {
    if bytes.is_empty() {
        return Err(ValidationError::EmptyInput);
    }

    let format = image::guess_format(&bytes)
        .map_err(|_| ValidationError::UnsupportedFormat("unrecognized data".to_string()))?;

    let kind = ImageKind::from_image_format(format)
        .ok_or_else(|| ValidationError::UnsupportedFormat(format!("{:?}", format)))?;

    // Header-only dimension probe; a truncated or corrupt header surfaces
    // here as an unsupported-format failure.
    let (width, height) = ImageReader::with_format(Cursor::new(&bytes), format)
        .into_dimensions()
        .map_err(|e| ValidationError::UnsupportedFormat(format!("unreadable header: {}", e)))?;

    if width == 0 || height == 0 || width > max_dimension || height > max_dimension {
        return Err(ValidationError::InvalidDimensions {
            width,
            height,
            max: max_dimension,
        });
    }

    Ok(ImageBuffer {
        bytes,
        kind,
        width,
        height,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
        });
        let mut buffer = Cursor::new(Vec::new());
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut buffer, ImageFormat::Png)
            .unwrap();
        buffer.into_inner()
    }

    fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_pixel(width, height, image::Rgb([200, 30, 30]));
        let mut buffer = Cursor::new(Vec::new());
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut buffer, ImageFormat::Jpeg)
            .unwrap();
        buffer.into_inner()
    }

    #[test]
    fn valid_png_reports_exact_metadata() {
        let bytes = png_bytes(100, 60);
        let byte_len = bytes.len();

        let image = validate(bytes, 4096).unwrap();
        assert_eq!(image.kind(), ImageKind::Png);
        assert_eq!(image.width(), 100);
        assert_eq!(image.height(), 60);
        assert_eq!(image.len(), byte_len);
    }

    #[test]
    fn valid_jpeg_detected_by_content_not_name() {
        let image = validate(jpeg_bytes(32, 32), 4096).unwrap();
        assert_eq!(image.kind(), ImageKind::Jpeg);
    }

    #[test]
    fn empty_input_rejected() {
        assert_eq!(validate(Vec::new(), 4096), Err(ValidationError::EmptyInput));
    }

    #[test]
    fn non_image_bytes_rejected() {
        let err = validate(b"definitely not an image".to_vec(), 4096).unwrap_err();
        assert!(matches!(err, ValidationError::UnsupportedFormat(_)));
    }

    #[test]
    fn oversized_dimensions_rejected() {
        let err = validate(png_bytes(20, 10), 16).unwrap_err();
        assert_eq!(
            err,
            ValidationError::InvalidDimensions {
                width: 20,
                height: 10,
                max: 16,
            }
        );
    }

    #[test]
    fn dimension_at_limit_accepted() {
        let image = validate(png_bytes(16, 16), 16).unwrap();
        assert_eq!((image.width(), image.height()), (16, 16));
    }

    #[test]
    fn truncated_png_rejected() {
        let mut bytes = png_bytes(100, 100);
        bytes.truncate(12); // keeps the PNG magic, drops the IHDR chunk
        let err = validate(bytes, 4096).unwrap_err();
        assert!(matches!(err, ValidationError::UnsupportedFormat(_)));
    }
}
