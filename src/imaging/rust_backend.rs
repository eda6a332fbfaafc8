//! Pure Rust codec built on the `image` crate.
//!
//! Everything is statically linked into the binary.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, TIFF, WebP) | `image::load_from_memory` (pure Rust decoders) |
//! | Resize | `DynamicImage::resize_exact` with `Lanczos3` filter |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` (RGB8, alpha dropped) |
//! | Encode → AVIF | `image::codecs::avif::AvifEncoder` (rav1e, speed 6) |

use super::backend::{CodecError, Dimensions, ImageCodec, Raster};
use super::params::{OutputFormat, Quality};
use image::imageops::FilterType;
use image::{DynamicImage, ImageEncoder, ImageFormat};
use std::sync::LazyLock;

/// rav1e speed preset (0 slowest, 10 fastest).
const AVIF_SPEED: u8 = 6;

/// Input formats whose decoders are compiled in and known to work.
///
/// AVIF is deliberately excluded: the `image` crate's `"avif"` feature only
/// enables the **encoder**, yet `ImageFormat::reading_enabled()` reports
/// `true` for it.
const INPUT_CANDIDATES: &[(&str, ImageFormat)] = &[
    ("jpeg", ImageFormat::Jpeg),
    ("png", ImageFormat::Png),
    ("tiff", ImageFormat::Tiff),
    ("webp", ImageFormat::WebP),
];

static SUPPORTED_INPUTS: LazyLock<Vec<&'static str>> = LazyLock::new(|| {
    INPUT_CANDIDATES
        .iter()
        .filter(|(_, fmt)| fmt.reading_enabled())
        .map(|(name, _)| *name)
        .collect()
});

/// Returns the input formats that have working decoders compiled in.
pub fn supported_input_formats() -> &'static [&'static str] {
    &SUPPORTED_INPUTS
}

impl Raster for DynamicImage {
    fn dimensions(&self) -> Dimensions {
        Dimensions {
            width: self.width(),
            height: self.height(),
        }
    }
}

/// Pure Rust codec using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
#[derive(Debug, Clone, Copy, Default)]
pub struct RustCodec {
    format: OutputFormat,
}

impl RustCodec {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }
}

fn encode_jpeg(img: &DynamicImage, quality: Quality) -> Result<Vec<u8>, CodecError> {
    let rgb = img.to_rgb8();
    let mut buf = Vec::new();
    image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buf, quality.value() as u8)
        .write_image(
            rgb.as_raw(),
            rgb.width(),
            rgb.height(),
            image::ExtendedColorType::Rgb8,
        )
        .map_err(|e| CodecError::ProcessingFailed(format!("JPEG encode failed: {}", e)))?;
    Ok(buf)
}

fn encode_avif(img: &DynamicImage, quality: Quality) -> Result<Vec<u8>, CodecError> {
    let mut buf = Vec::new();
    let encoder = image::codecs::avif::AvifEncoder::new_with_speed_quality(
        &mut buf,
        AVIF_SPEED,
        quality.value() as u8,
    );
    img.write_with_encoder(encoder)
        .map_err(|e| CodecError::ProcessingFailed(format!("AVIF encode failed: {}", e)))?;
    Ok(buf)
}

impl ImageCodec for RustCodec {
    type Raster = DynamicImage;

    fn decode(&self, bytes: &[u8]) -> Result<DynamicImage, CodecError> {
        if bytes.is_empty() {
            return Err(CodecError::ProcessingFailed("empty input".into()));
        }
        image::load_from_memory(bytes)
            .map_err(|e| CodecError::ProcessingFailed(format!("Failed to decode image: {}", e)))
    }

    fn resize(&self, raster: &DynamicImage, target: Dimensions) -> Result<DynamicImage, CodecError> {
        if target.width == 0 || target.height == 0 {
            return Err(CodecError::ProcessingFailed(format!(
                "Invalid resize target {target}"
            )));
        }
        Ok(raster.resize_exact(target.width, target.height, FilterType::Lanczos3))
    }

    fn encode(&self, raster: &DynamicImage, quality: Quality) -> Result<Vec<u8>, CodecError> {
        match self.format {
            OutputFormat::Jpeg => encode_jpeg(raster, quality),
            OutputFormat::Avif => encode_avif(raster, quality),
        }
    }
}
