//! Codec capability trait and shared types.
//!
//! The [`ImageCodec`] trait defines the three operations the compression
//! engine needs from its host: decode, resize, and encode. The engine owns
//! the search; the codec owns the pixels.
//!
//! The production implementation is
//! [`RustCodec`](super::rust_backend::RustCodec), pure Rust on top of the
//! `image` crate. Tests use the recording mock in this module's `tests`.

use super::params::Quality;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// Width and height of a raster, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    /// The larger of width and height.
    pub fn long_edge(self) -> u32 {
        self.width.max(self.height)
    }
}

impl std::fmt::Display for Dimensions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// A decoded pixel buffer, as seen by the engine.
///
/// The engine never looks at pixel data; it only needs the size to plan
/// clamp and fallback steps.
pub trait Raster {
    fn dimensions(&self) -> Dimensions;
}

/// Trait for codec backends.
///
/// Every operation must be deterministic for fixed inputs: the engine's
/// byte-identical output guarantee depends on it. `Sync` so a single codec
/// can be shared by rayon workers in the batch driver.
pub trait ImageCodec: Sync {
    /// Decoded raster type handed back and forth between operations.
    type Raster: Raster;

    /// Decode raw image bytes into a raster.
    fn decode(&self, bytes: &[u8]) -> Result<Self::Raster, CodecError>;

    /// Resample to exactly `target`. The engine only asks for
    /// aspect-preserving targets no larger than the input.
    fn resize(&self, raster: &Self::Raster, target: Dimensions)
    -> Result<Self::Raster, CodecError>;

    /// Encode at the given lossy quality.
    fn encode(&self, raster: &Self::Raster, quality: Quality) -> Result<Vec<u8>, CodecError>;
}
