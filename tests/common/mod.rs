//! Common test utilities for imgbudget integration tests.
//!
//! The crate's own mock codec lives behind `#[cfg(test)]` and is invisible
//! here, so this module carries a small counting codec plus synthetic image
//! generators for end-to-end runs through [`imgbudget::imaging::RustCodec`].

#![allow(dead_code)]

use image::{DynamicImage, ImageFormat, RgbImage};
use imgbudget::imaging::{CodecError, Dimensions, ImageCodec, Quality, Raster};
use std::io::Cursor;
use std::sync::Mutex;

/// Raster that only knows its size.
pub struct SizedRaster(pub Dimensions);

impl Raster for SizedRaster {
    fn dimensions(&self) -> Dimensions {
        self.0
    }
}

/// Codec whose "images" are `"{w}x{h}"` headers and whose encoded size is
/// `bytes_per_pixel * pixels * quality / 100`, or a fixed per-pixel cost when
/// `ignore_quality` is set (an incompressible source).
pub struct CountingCodec {
    bytes_per_pixel: usize,
    ignore_quality: bool,
    calls: Mutex<Calls>,
}

#[derive(Debug, Default, Clone)]
pub struct Calls {
    pub decodes: usize,
    pub resizes: Vec<Dimensions>,
    pub encodes: Vec<(Dimensions, u32)>,
}

impl CountingCodec {
    /// Encoded size shrinks with quality.
    pub fn compressible(bytes_per_pixel: usize) -> Self {
        Self {
            bytes_per_pixel,
            ignore_quality: false,
            calls: Mutex::new(Calls::default()),
        }
    }

    /// Encoded size is the same at every quality.
    pub fn incompressible(bytes_per_pixel: usize) -> Self {
        Self {
            bytes_per_pixel,
            ignore_quality: true,
            calls: Mutex::new(Calls::default()),
        }
    }

    pub fn calls(&self) -> Calls {
        self.calls.lock().unwrap().clone()
    }
}

impl ImageCodec for CountingCodec {
    type Raster = SizedRaster;

    fn decode(&self, bytes: &[u8]) -> Result<SizedRaster, CodecError> {
        self.calls.lock().unwrap().decodes += 1;
        let bad = || CodecError::ProcessingFailed("unrecognized header".into());
        let text = std::str::from_utf8(bytes).map_err(|_| bad())?;
        let (w, h) = text.split_once('x').ok_or_else(bad)?;
        let width: u32 = w.parse().map_err(|_| bad())?;
        let height: u32 = h.parse().map_err(|_| bad())?;
        if width == 0 || height == 0 {
            return Err(bad());
        }
        Ok(SizedRaster(Dimensions { width, height }))
    }

    fn resize(&self, _raster: &SizedRaster, target: Dimensions) -> Result<SizedRaster, CodecError> {
        self.calls.lock().unwrap().resizes.push(target);
        Ok(SizedRaster(target))
    }

    fn encode(&self, raster: &SizedRaster, quality: Quality) -> Result<Vec<u8>, CodecError> {
        self.calls
            .lock()
            .unwrap()
            .encodes
            .push((raster.0, quality.value()));
        let pixels = raster.0.width as usize * raster.0.height as usize;
        let len = if self.ignore_quality {
            pixels * self.bytes_per_pixel
        } else {
            pixels * self.bytes_per_pixel * quality.value() as usize / 100
        };
        Ok(vec![quality.value() as u8; len])
    }
}

/// Smooth RGB gradient encoded as `format`.
pub fn gradient(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([
            (x * 255 / width.max(1)) as u8,
            (y * 255 / height.max(1)) as u8,
            96,
        ])
    });
    encode(DynamicImage::ImageRgb8(img), format)
}

/// Deterministic RGB noise encoded as PNG.
pub fn noise_png(width: u32, height: u32, seed: u64) -> Vec<u8> {
    let mut state = seed | 1;
    let img = RgbImage::from_fn(width, height, |_, _| {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        image::Rgb([state as u8, (state >> 8) as u8, (state >> 16) as u8])
    });
    encode(DynamicImage::ImageRgb8(img), ImageFormat::Png)
}

fn encode(img: DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, format).unwrap();
    buf.into_inner()
}

/// `(width, height)` of encoded bytes, read back through the `image` crate.
#[track_caller]
pub fn dimensions_of(bytes: &[u8]) -> (u32, u32) {
    let img = image::load_from_memory(bytes).unwrap();
    (img.width(), img.height())
}
