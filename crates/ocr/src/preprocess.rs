use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::DynamicImage;
use scanlet_core::{NormalizeSettings, ProcessingOptions};
use std::sync::Arc;
use thiserror::Error;

use crate::types::InputFile;

#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("Unsupported file type: '{0}'")]
    UnsupportedType(String),
    #[error("Failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
    #[error("Failed to encode processed image: {0}")]
    Encode(String),
}

/// Image bytes ready for recognition.
#[derive(Debug, Clone)]
pub struct NormalizedImage {
    pub bytes: Arc<[u8]>,
    pub mime_type: String,
    /// Output dimensions; `None` when the original bytes were passed through.
    pub dimensions: Option<(u32, u32)>,
}

/// Downscales and recompresses receipt photos to bound OCR cost and memory.
#[derive(Debug, Clone, Copy)]
pub struct Normalizer {
    settings: NormalizeSettings,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(NormalizeSettings::default())
    }
}

impl Normalizer {
    pub fn new(settings: NormalizeSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> NormalizeSettings {
        self.settings
    }

    /// Normalize one file according to `options`. With `compress_image` off the
    /// original bytes are returned untouched.
    pub fn normalize(
        &self,
        file: &InputFile,
        options: &ProcessingOptions,
    ) -> Result<NormalizedImage, NormalizeError> {
        if !options.compress_image {
            return Ok(NormalizedImage {
                bytes: file.bytes.clone(),
                mime_type: file.mime_type.clone(),
                dimensions: None,
            });
        }
        if !file.mime_type.starts_with("image/") {
            return Err(NormalizeError::UnsupportedType(file.mime_type.clone()));
        }
        self.compress(&file.bytes)
    }

    /// Decode, downscale to fit the configured bounds, and re-encode as JPEG.
    pub fn compress(&self, data: &[u8]) -> Result<NormalizedImage, NormalizeError> {
        let img = image::load_from_memory(data)?;
        let (w, h) = target_dimensions(
            img.width(),
            img.height(),
            self.settings.max_width,
            self.settings.max_height,
        );
        let img = if (w, h) == (img.width(), img.height()) {
            img
        } else {
            img.resize_exact(w, h, FilterType::Triangle)
        };
        let bytes = self.encode_as_jpeg(&img)?;
        Ok(NormalizedImage {
            bytes: bytes.into(),
            mime_type: "image/jpeg".to_string(),
            dimensions: Some((w, h)),
        })
    }

    fn encode_as_jpeg(&self, img: &DynamicImage) -> Result<Vec<u8>, NormalizeError> {
        // JPEG has no alpha channel.
        let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
        let mut buf = Vec::new();
        let encoder = JpegEncoder::new_with_quality(&mut buf, self.settings.jpeg_quality);
        rgb.write_with_encoder(encoder)
            .map_err(|e| NormalizeError::Encode(e.to_string()))?;
        Ok(buf)
    }
}

/// Largest size fitting inside `max_w` × `max_h` with the same aspect ratio.
/// Never upscales.
pub fn target_dimensions(width: u32, height: u32, max_w: u32, max_h: u32) -> (u32, u32) {
    if width == 0 || height == 0 || (width <= max_w && height <= max_h) {
        return (width, height);
    }
    let scale = (max_w as f64 / width as f64).min(max_h as f64 / height as f64);
    let w = ((width as f64 * scale).round() as u32).clamp(1, max_w);
    let h = ((height as f64 * scale).round() as u32).clamp(1, max_h);
    (w, h)
}
