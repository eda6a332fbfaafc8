//! Image codec layer, pure Rust.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode** | `image::load_from_memory` |
//! | **Resize** | Lanczos3 via `resize_exact` |
//! | **Encode** | JPEG (`JpegEncoder`) or AVIF (`AvifEncoder`) |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math and the quality step policy
//! - **Parameters**: [`Quality`] and [`OutputFormat`]
//! - **Backend**: [`ImageCodec`] trait + [`RustCodec`]

pub mod backend;
mod calculations;
mod params;
pub mod rust_backend;

pub use backend::{CodecError, Dimensions, ImageCodec, Raster};
pub use calculations::{
    MIN_DIMENSION, clamp_dimensions, fit_long_edge, next_fallback_edge, next_quality,
    quality_schedule,
};
pub use params::{OutputFormat, Quality};
pub use rust_backend::{RustCodec, supported_input_formats};
