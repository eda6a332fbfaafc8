//! Shared test utilities: synthetic images encoded to in-memory bytes.
//!
//! Gradients compress well and noise does not, which gives the engine tests
//! one input that fits easily and one that forces the search to its floors.
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let smooth = gradient_png(640, 480);
//! let harsh = noise_png(256, 256, 42);
//! ```

use image::{DynamicImage, ImageFormat, RgbImage};
use std::io::Cursor;

/// Smooth RGB gradient encoded as PNG.
pub fn gradient_png(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([
            (x * 255 / width.max(1)) as u8,
            (y * 255 / height.max(1)) as u8,
            128,
        ])
    });
    encode_png(DynamicImage::ImageRgb8(img))
}

/// Deterministic RGB noise encoded as PNG. Same seed, same bytes.
pub fn noise_png(width: u32, height: u32, seed: u64) -> Vec<u8> {
    let mut state = seed.wrapping_mul(0x9E37_79B9_7F4A_7C15) | 1;
    let mut next = move || {
        // xorshift64
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        state
    };
    let img = RgbImage::from_fn(width, height, |_, _| {
        let v = next();
        image::Rgb([v as u8, (v >> 8) as u8, (v >> 16) as u8])
    });
    encode_png(DynamicImage::ImageRgb8(img))
}

fn encode_png(img: DynamicImage) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png).unwrap();
    buf.into_inner()
}
