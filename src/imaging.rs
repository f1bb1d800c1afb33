//! Image transcoding for legacy displays
//!
//! Takes arbitrary fetched image bytes and produces something a 1-bit-era
//! client can show: alpha composited onto white, color collapsed to RGB,
//! downscaled (never upscaled) to the client's screen, and optionally
//! re-encoded with error-diffusion dithering for bilevel targets.
//!
//! Decode and encode are delegated entirely to the `image` crate; this
//! module owns only the normalization policy between them. Failures are
//! reported as [`TranscodeError::Decode`] / [`TranscodeError::Encode`] and
//! the resolver degrades to passing the original bytes through.

use std::io::Cursor;

use image::imageops::FilterType;
use image::imageops::colorops::{BiLevel, dither};
use image::{DynamicImage, ImageFormat, RgbImage};

use crate::error::TranscodeError;

/// Target encoding for transcoded images
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetFormat {
    Jpg,
    Jpeg,
    Png,
    Gif,
    WebP,
}

impl TargetFormat {
    /// File extension used in cache keys and references
    pub fn extension(self) -> &'static str {
        match self {
            TargetFormat::Jpg => "jpg",
            TargetFormat::Jpeg => "jpeg",
            TargetFormat::Png => "png",
            TargetFormat::Gif => "gif",
            TargetFormat::WebP => "webp",
        }
    }

    fn image_format(self) -> ImageFormat {
        match self {
            TargetFormat::Jpg | TargetFormat::Jpeg => ImageFormat::Jpeg,
            TargetFormat::Png => ImageFormat::Png,
            TargetFormat::Gif => ImageFormat::Gif,
            TargetFormat::WebP => ImageFormat::WebP,
        }
    }

    /// Whether the target implies reduced (1-bit) color depth
    fn is_bilevel(self) -> bool {
        matches!(self, TargetFormat::Gif)
    }
}

/// Dithering algorithm applied when quantizing to 1-bit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dithering {
    /// Error-diffusion dithering (default)
    #[default]
    FloydSteinberg,
    /// Plain threshold at mid-gray
    None,
}

/// Per-deployment image transcoding configuration
///
/// Defaults target a 512x342 1-bit display (the original Macintosh
/// screen) with dithered GIF output.
#[derive(Debug, Clone)]
pub struct ImageTranscodeConfig {
    pub resize: bool,
    pub max_width: u32,
    pub max_height: u32,
    pub convert: bool,
    pub target_format: TargetFormat,
    pub dithering: Dithering,
}

impl Default for ImageTranscodeConfig {
    fn default() -> Self {
        Self {
            resize: true,
            max_width: 512,
            max_height: 342,
            convert: true,
            target_format: TargetFormat::Gif,
            dithering: Dithering::FloydSteinberg,
        }
    }
}

impl ImageTranscodeConfig {
    /// Cache-key extension for this configuration
    ///
    /// Falls back to `gif` when conversion is disabled, for cache-key
    /// compatibility with historical deployments.
    pub fn cache_extension(&self) -> &'static str {
        if self.convert {
            self.target_format.extension()
        } else {
            "gif"
        }
    }

    /// Whether any pixel work is enabled at all
    pub fn wants_processing(&self) -> bool {
        self.convert || self.resize
    }
}

/// Decode, normalize, and re-encode image bytes per the configuration
///
/// Steps: decode -> composite alpha onto white -> force RGB -> downscale
/// within (max_width, max_height) preserving aspect ratio -> optional
/// 1-bit quantization with dithering -> encode to the target format.
///
/// Errors carry enough context for the operational log; the caller decides
/// whether to degrade to passthrough.
pub fn optimize_image(data: &[u8], config: &ImageTranscodeConfig) -> Result<Vec<u8>, TranscodeError> {
    let decoded = image::load_from_memory(data)
        .map_err(|e| TranscodeError::Decode(format!("not a decodable image: {}", e)))?;

    let mut img = flatten_to_rgb(decoded);

    if config.resize && config.max_width > 0 && config.max_height > 0 {
        let (width, height) = (img.width(), img.height());
        if width > config.max_width || height > config.max_height {
            // resize() computes the min-ratio fit itself; the size guard
            // above keeps it from upscaling smaller images
            img = img.resize(config.max_width, config.max_height, FilterType::Lanczos3);
        }
    }

    if config.convert && config.target_format.is_bilevel() {
        let mut gray = img.to_luma8();
        match config.dithering {
            Dithering::FloydSteinberg => dither(&mut gray, &BiLevel),
            Dithering::None => {
                for pixel in gray.pixels_mut() {
                    pixel.0[0] = if pixel.0[0] >= 128 { 255 } else { 0 };
                }
            }
        }
        // GIF encoding wants RGB; the bilevel data quantizes to a
        // two-entry palette on encode
        img = DynamicImage::ImageRgb8(DynamicImage::ImageLuma8(gray).to_rgb8());
    }

    let format = if config.convert {
        config.target_format.image_format()
    } else {
        // Resize-only: keep the source container when recognizable
        image::guess_format(data).unwrap_or(ImageFormat::Png)
    };

    let mut output = Vec::new();
    img.write_to(&mut Cursor::new(&mut output), format)
        .map_err(|e| TranscodeError::Encode(format!("{:?} encode failed: {}", format, e)))?;
    Ok(output)
}

/// Composite alpha onto a white background and force three-channel color
fn flatten_to_rgb(img: DynamicImage) -> DynamicImage {
    if img.color().has_alpha() {
        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();
        let mut rgb = RgbImage::new(width, height);
        for (out, src) in rgb.pixels_mut().zip(rgba.pixels()) {
            let alpha = src.0[3] as u32;
            for c in 0..3 {
                let v = src.0[c] as u32;
                out.0[c] = ((v * alpha + 255 * (255 - alpha)) / 255) as u8;
            }
        }
        DynamicImage::ImageRgb8(rgb)
    } else {
        DynamicImage::ImageRgb8(img.to_rgb8())
    }
}
