//! Image normalization before upload.

use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, RgbImage};
use tracing::{debug, trace};

use crate::domain::entities::ImageBuffer;
use crate::domain::errors::AnalysisError;

/// Default bound on the longest image side, in pixels.
pub const DEFAULT_MAX_DIMENSION: u32 = 1600;

/// Default JPEG quality.
pub const DEFAULT_JPEG_QUALITY: u8 = 85;

/// Settings for [`ImagePreprocessor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreprocessConfig {
    /// Longest allowed side after normalization.
    pub max_dimension: u32,
    /// JPEG quality, 1-100.
    pub jpeg_quality: u8,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            max_dimension: DEFAULT_MAX_DIMENSION,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

/// Decodes arbitrary image bytes and re-encodes them as bounded RGB JPEG.
#[derive(Debug, Clone, Copy)]
pub struct ImagePreprocessor {
    config: PreprocessConfig,
}

impl ImagePreprocessor {
    /// Creates a preprocessor.
    ///
    /// # Errors
    /// Returns `AnalysisError::Configuration` for a zero dimension or a
    /// quality outside 1-100.
    pub fn new(config: PreprocessConfig) -> Result<Self, AnalysisError> {
        if config.max_dimension == 0 {
            return Err(AnalysisError::configuration(
                "image max_dimension must be at least 1",
            ));
        }
        if !(1..=100).contains(&config.jpeg_quality) {
            return Err(AnalysisError::configuration(format!(
                "jpeg_quality must be within 1-100, got {}",
                config.jpeg_quality
            )));
        }
        Ok(Self { config })
    }

    /// Returns the active settings.
    #[must_use]
    pub const fn config(&self) -> PreprocessConfig {
        self.config
    }

    /// Normalizes raw image bytes.
    ///
    /// # Errors
    /// Returns `AnalysisError::InvalidImage` if the bytes cannot be decoded
    /// or the result cannot be encoded.
    pub fn normalize(&self, raw: &[u8]) -> Result<ImageBuffer, AnalysisError> {
        let decoded = image::load_from_memory(raw)
            .map_err(|e| AnalysisError::invalid_image(format!("failed to decode image: {e}")))?;

        trace!(
            width = decoded.width(),
            height = decoded.height(),
            color = ?decoded.color(),
            "Decoded input image"
        );

        let rgb = self.fit(to_rgb(decoded));
        let (width, height) = rgb.dimensions();

        let mut encoded = Vec::new();
        JpegEncoder::new_with_quality(&mut encoded, self.config.jpeg_quality)
            .encode_image(&rgb)
            .map_err(|e| AnalysisError::invalid_image(format!("failed to encode image: {e}")))?;

        debug!(
            width,
            height,
            input_bytes = raw.len(),
            output_bytes = encoded.len(),
            "Normalized image"
        );

        Ok(ImageBuffer::new(Bytes::from(encoded), width, height))
    }

    /// Downscales so the longest side fits, preserving aspect ratio.
    fn fit(&self, image: RgbImage) -> RgbImage {
        let (width, height) = image.dimensions();
        match scaled_dimensions(width, height, self.config.max_dimension) {
            Some((new_width, new_height)) => {
                debug!(
                    from = ?(width, height),
                    to = ?(new_width, new_height),
                    "Downscaling image"
                );
                image::imageops::resize(&image, new_width, new_height, FilterType::Lanczos3)
            }
            None => image,
        }
    }
}

impl Default for ImagePreprocessor {
    fn default() -> Self {
        Self {
            config: PreprocessConfig::default(),
        }
    }
}

fn to_rgb(image: DynamicImage) -> RgbImage {
    match image {
        DynamicImage::ImageRgb8(rgb) => rgb,
        other => other.into_rgb8(),
    }
}

/// Target size when the longest side exceeds `max`, rounded to the nearest
/// pixel and never below 1. `None` when no resize is needed.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn scaled_dimensions(width: u32, height: u32, max: u32) -> Option<(u32, u32)> {
    let longest = width.max(height);
    if longest <= max {
        return None;
    }

    let ratio = f64::from(max) / f64::from(longest);
    let scale = |side: u32| ((f64::from(side) * ratio).round() as u32).clamp(1, max);
    Some((scale(width), scale(height)))
}
